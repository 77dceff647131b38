//! The compilation unit. A module owns the node and region arenas, the
//! function roster, the read-only-data region, and the string table;
//! everything else in the crate reaches the IR through it.
//!
//! Graph edges are non-owning ids into the arenas, so every mutator
//! that touches the inputs/users lists lives here where both endpoints
//! are reachable. Removal detaches a node from its region; the arena
//! slot is reclaimed at module teardown.

use crate::core::ir::{extract_literal_value, Node, NodeId, Opcode};
use crate::core::region::{Region, RegionId};
use crate::core::strtab::{StringId, StringTable};
use crate::core::value::DataType;

pub struct Module {
    nodes: Vec<Node>,
    regions: Vec<Region>,
    fns: Vec<NodeId>,
    root: RegionId,
    rodata: RegionId,
    strtab: StringTable,
    name: StringId,
}

impl Module {
    /// Create a module with its `.__global` root and `.__rodata`
    /// regions. Both are parentless: a node whose region has no parent
    /// is in the global scope.
    pub fn new(name: &str) -> Module {
        let mut module = Module {
            nodes: Vec::new(),
            regions: Vec::new(),
            fns: Vec::new(),
            root: RegionId::new(0),
            rodata: RegionId::new(0),
            strtab: StringTable::new(),
            name: StringId::EMPTY,
        };
        module.name = module.strtab.intern(name);
        module.root = module.new_region(".__global", None);
        module.rodata = module.new_region(".__rodata", None);
        module
    }

    pub fn name(&self) -> &str {
        self.strtab.get(self.name).unwrap_or("")
    }

    pub fn root(&self) -> RegionId {
        self.root
    }

    pub fn rodata(&self) -> RegionId {
        self.rodata
    }

    pub fn strtab(&self) -> &StringTable {
        &self.strtab
    }

    pub fn intern(&mut self, s: &str) -> StringId {
        self.strtab.intern(s)
    }

    /// Create a region; the parent defaults to the root region.
    pub fn create_region(&mut self, name: &str, parent: Option<RegionId>) -> RegionId {
        let parent = parent.unwrap_or(self.root);
        self.new_region(name, Some(parent))
    }

    fn new_region(&mut self, name: &str, parent: Option<RegionId>) -> RegionId {
        let name = self.strtab.intern(name);
        let rid = RegionId::new(self.regions.len());
        self.regions.push(Region {
            name,
            parent,
            children: Vec::new(),
            nodes: Vec::new(),
            entry: NodeId::new(0),
        });
        let entry = self.alloc_node(Node::new(Opcode::Entry, DataType::Void));
        self.nodes[entry.index()].parent = Some(rid);
        let region = &mut self.regions[rid.index()];
        region.nodes.push(entry);
        region.entry = entry;
        if let Some(parent) = parent {
            self.regions[parent.index()].children.push(rid);
        }
        rid
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn region_name(&self, id: RegionId) -> &str {
        self.strtab.get(self.region(id).name_id()).unwrap_or("")
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region_ids(&self) -> impl Iterator<Item = RegionId> {
        (0..self.regions.len()).map(RegionId::new)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Distinct mutable borrows of two nodes. Panics if `a == b`.
    pub fn node_pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut Node, &mut Node) {
        assert_ne!(a, b, "node_pair_mut requires distinct nodes");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi.index());
        let lo = &mut head[lo.index()];
        let hi = &mut tail[0];
        if a < b {
            (lo, hi)
        } else {
            (hi, lo)
        }
    }

    pub(crate) fn alloc_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /////
    ///// Function roster.
    /////

    /// Register a function node. Anything but a `Function` node is
    /// ignored, as is a duplicate registration.
    pub fn add_fn(&mut self, func: NodeId) {
        if self.node(func).op != Opcode::Function {
            return;
        }
        if !self.fns.contains(&func) {
            self.fns.push(func);
        }
    }

    /// Find a registered function by name-id equality.
    pub fn find_fn(&self, name: &str) -> Option<NodeId> {
        let name_id = self.strtab.lookup(name)?;
        self.fns.iter().copied().find(|&f| self.node(f).name == name_id)
    }

    pub fn functions(&self) -> &[NodeId] {
        &self.fns
    }

    pub fn contains_fn(&self, func: NodeId) -> bool {
        self.fns.contains(&func)
    }

    /// Append a literal to the read-only data region.
    pub fn add_rodata(&mut self, node: NodeId) {
        self.append(self.rodata, node);
    }

    /////
    ///// Region mutation. Every operation keeps `Node::parent` and the
    ///// bidirectional edge lists consistent.
    /////

    pub fn append(&mut self, region: RegionId, node: NodeId) {
        self.nodes[node.index()].parent = Some(region);
        self.regions[region.index()].nodes.push(node);
    }

    /// Insert at the front of the region.
    pub fn insert(&mut self, region: RegionId, node: NodeId) {
        self.nodes[node.index()].parent = Some(region);
        self.regions[region.index()].nodes.insert(0, node);
    }

    /// Insert before `anchor`; appends when the anchor is not in the
    /// region.
    pub fn insert_before(&mut self, region: RegionId, anchor: NodeId, node: NodeId) {
        self.nodes[node.index()].parent = Some(region);
        let nodes = &mut self.regions[region.index()].nodes;
        match nodes.iter().position(|&n| n == anchor) {
            Some(pos) => nodes.insert(pos, node),
            None => nodes.push(node),
        }
    }

    /// Insert after `anchor`; appends when the anchor is not in the
    /// region.
    pub fn insert_after(&mut self, region: RegionId, anchor: NodeId, node: NodeId) {
        self.nodes[node.index()].parent = Some(region);
        let nodes = &mut self.regions[region.index()].nodes;
        match nodes.iter().position(|&n| n == anchor) {
            Some(pos) => nodes.insert(pos + 1, node),
            None => nodes.push(node),
        }
    }

    /// Detach a node from the region. Edge lists are the caller's
    /// responsibility: rewire the users or remove them too.
    pub fn remove(&mut self, region: RegionId, node: NodeId) {
        self.regions[region.index()].nodes.retain(|&n| n != node);
        self.nodes[node.index()].parent = None;
    }

    /// Bulk removal of nodes from one region.
    pub fn remove_bulk(&mut self, region: RegionId, nodes: &[NodeId]) {
        self.regions[region.index()]
            .nodes
            .retain(|n| !nodes.contains(n));
        for &node in nodes {
            self.nodes[node.index()].parent = None;
        }
    }

    /// Replace `old` with `new` in place. With `rewire`, every consumer
    /// of `old` is moved onto `new` first. `old` is fully unlinked from
    /// its producers either way, so the edge invariant holds for every
    /// node still attached to a region. Returns false when `old` is not
    /// in the region.
    pub fn replace(&mut self, region: RegionId, old: NodeId, new: NodeId, rewire: bool) -> bool {
        let Some(pos) = self.regions[region.index()]
            .nodes
            .iter()
            .position(|&n| n == old)
        else {
            return false;
        };
        if rewire {
            self.update_all_connections(old, new);
        }
        self.unlink_inputs(old);
        self.regions[region.index()].nodes[pos] = new;
        self.nodes[new.index()].parent = Some(region);
        self.nodes[old.index()].parent = None;
        true
    }

    /// Whether the region ends in a terminator.
    pub fn is_terminated(&self, region: RegionId) -> bool {
        match self.region(region).nodes().last() {
            Some(&last) => self.node(last).op.is_terminator(),
            None => false,
        }
    }

    /////
    ///// Edge maintenance.
    /////

    /// Swap one input slot of `user` from `old_input` to `new_input`,
    /// fixing both users lists. Returns false when `old_input` is not
    /// an input of `user`.
    pub fn update_connection(&mut self, user: NodeId, old_input: NodeId, new_input: NodeId) -> bool {
        let Some(slot) = self.nodes[user.index()]
            .inputs
            .iter()
            .position(|&i| i == old_input)
        else {
            return false;
        };
        self.nodes[old_input.index()].users.retain(|&u| u != user);
        self.nodes[user.index()].inputs[slot] = new_input;
        if !self.nodes[new_input.index()].users.contains(&user) {
            self.nodes[new_input.index()].users.push(user);
        }
        true
    }

    /// Rewire every consumer of `old` onto `new` and clear `old`'s
    /// users list. Returns the number of consumers moved.
    pub fn update_all_connections(&mut self, old: NodeId, new: NodeId) -> usize {
        let users = self.nodes[old.index()].users.clone();
        let mut updated = 0;
        for user in users {
            if self.update_connection(user, old, new) {
                updated += 1;
            }
        }
        self.nodes[old.index()].users.clear();
        updated
    }

    /// Drop `node` from the users list of each of its producers and
    /// clear its input list. Used when a node leaves the graph.
    pub fn unlink_inputs(&mut self, node: NodeId) {
        let inputs = std::mem::take(&mut self.nodes[node.index()].inputs);
        for input in inputs {
            self.nodes[input.index()].users.retain(|&u| u != node);
        }
    }

    /// Signed, widened value of an integer literal node; 0 for anything
    /// else.
    pub fn extract_literal_value(&self, node: NodeId) -> i64 {
        extract_literal_value(self.node(node))
    }

    /////
    ///// Dominance.
    /////

    /// Dominance by region-tree ancestry: `a` dominates `b` iff `a ==
    /// b` or `a` is an ancestor of `b`.
    pub fn dominates_via_tree(&self, a: RegionId, b: RegionId) -> bool {
        let mut cur = Some(b);
        while let Some(r) = cur {
            if r == a {
                return true;
            }
            cur = self.region(r).parent();
        }
        false
    }

    /// First jump or branch in `region` that targets the entry node of
    /// `target`, if any.
    pub fn has_unstructured_jumps_to(&self, region: RegionId, target: RegionId) -> Option<NodeId> {
        for &nid in self.region(region).nodes() {
            let node = self.node(nid);
            if !matches!(node.op, Opcode::Jump | Opcode::Branch) {
                continue;
            }
            for &input in &node.inputs {
                let candidate = self.node(input);
                if candidate.op == Opcode::Entry && candidate.parent == Some(target) {
                    return Some(nid);
                }
            }
        }
        None
    }

    /// Tree dominance refined by control flow: an unstructured jump
    /// into `b` from any region outside `a`'s subtree breaks the
    /// relation.
    pub fn dominates(&self, a: RegionId, b: RegionId) -> bool {
        if a == b {
            return true;
        }
        if !self.dominates_via_tree(a, b) {
            return false;
        }
        for r in self.region_ids() {
            if self.dominates_via_tree(a, r) {
                continue;
            }
            if self.has_unstructured_jumps_to(r, b).is_some() {
                return false;
            }
        }
        true
    }
}
