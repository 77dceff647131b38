//! Dependency-aware scheduling of passes. The task graph wires edges
//! from each pass's `require` list, validates acyclicity, and
//! topologically sorts the passes into batches of mutually independent
//! work (Kahn's algorithm). `build` flattens the batches into a
//! configured [`PassManager`].

use crate::core::pass::{ExecutionPolicy, PassKind};
use crate::core::pass_manager::PassManager;
use color_eyre::{eyre::bail, Report};
use std::collections::HashMap;
use std::collections::VecDeque;
use tracing::debug;

struct TaskNode {
    pass: Option<PassKind>,
    name: &'static str,
    requires: Vec<&'static str>,
    is_analysis: bool,
    depends_on: Vec<usize>,
    dependents: Vec<usize>,
    in_degree: usize,
    batch_id: usize,
}

#[derive(Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    names: HashMap<&'static str, usize>,
}

impl TaskGraph {
    pub fn new() -> TaskGraph {
        TaskGraph::default()
    }

    /// Register a pass with the graph.
    pub fn add(&mut self, pass: PassKind) -> &mut TaskGraph {
        let node = TaskNode {
            name: pass.name(),
            requires: pass.require(),
            is_analysis: pass.is_analysis(),
            pass: Some(pass),
            depends_on: Vec::new(),
            dependents: Vec::new(),
            in_degree: 0,
            batch_id: 0,
        };
        self.names.insert(node.name, self.nodes.len());
        self.nodes.push(node);
        self
    }

    pub fn pass_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check that every dependency names a registered pass and that
    /// the graph is acyclic.
    pub fn validate(&self) -> Result<(), Report> {
        for node in &self.nodes {
            for dep in &node.requires {
                if !self.names.contains_key(dep) {
                    bail!("pass '{}' depends on unknown pass '{}'", node.name, dep);
                }
            }
        }
        self.check_for_cycles()
    }

    fn check_for_cycles(&self) -> Result<(), Report> {
        let dependents = self.dependent_edges();
        let mut visited = vec![false; self.nodes.len()];
        let mut in_stack = vec![false; self.nodes.len()];
        for start in 0..self.nodes.len() {
            if !visited[start] {
                self.dfs_cycle_check(start, &dependents, &mut visited, &mut in_stack)?;
            }
        }
        Ok(())
    }

    fn dfs_cycle_check(
        &self,
        node: usize,
        dependents: &[Vec<usize>],
        visited: &mut Vec<bool>,
        in_stack: &mut Vec<bool>,
    ) -> Result<(), Report> {
        visited[node] = true;
        in_stack[node] = true;
        for &dependent in &dependents[node] {
            if in_stack[dependent] {
                bail!(
                    "circular dependency detected: '{}' -> '{}'",
                    self.nodes[node].name,
                    self.nodes[dependent].name
                );
            }
            if !visited[dependent] {
                self.dfs_cycle_check(dependent, dependents, visited, in_stack)?;
            }
        }
        in_stack[node] = false;
        Ok(())
    }

    fn dependent_edges(&self) -> Vec<Vec<usize>> {
        let mut dependents = vec![Vec::new(); self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for dep in &node.requires {
                if let Some(&dep_index) = self.names.get(dep) {
                    dependents[dep_index].push(index);
                }
            }
        }
        dependents
    }

    /// Wire `depends_on`/`dependents` edges from the declared
    /// `require` lists and initialize in-degrees.
    pub fn build_dependencies(&mut self) {
        for node in &mut self.nodes {
            node.depends_on.clear();
            node.dependents.clear();
            node.in_degree = 0;
        }
        for index in 0..self.nodes.len() {
            for dep in self.nodes[index].requires.clone() {
                if let Some(&dep_index) = self.names.get(dep) {
                    self.nodes[dep_index].dependents.push(index);
                    self.nodes[index].depends_on.push(dep_index);
                    self.nodes[index].in_degree += 1;
                }
            }
        }
    }

    /// Kahn's algorithm over the wired edges. Each batch holds the
    /// passes whose dependencies are all in earlier batches; within a
    /// batch analyses come before transforms, each group ordered by
    /// name. Fails when a cycle leaves nodes unemitted.
    pub fn compute_execution_batches(&mut self) -> Result<Vec<Vec<usize>>, Report> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.in_degree).collect();
        let mut ready: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();

        let mut batches = Vec::new();
        let mut processed = 0usize;
        let mut current_batch = 0usize;
        while !ready.is_empty() {
            let mut batch = Vec::with_capacity(ready.len());
            for _ in 0..ready.len() {
                let Some(index) = ready.pop_front() else {
                    break;
                };
                self.nodes[index].batch_id = current_batch;
                batch.push(index);
                processed += 1;
                for d in self.nodes[index].dependents.clone() {
                    in_degree[d] -= 1;
                    if in_degree[d] == 0 {
                        ready.push_back(d);
                    }
                }
            }

            // Analyses lead the batch: read-only work parallelizes
            // freely and transforms in later slots may consume it.
            batch.sort_by(|&a, &b| {
                let a = &self.nodes[a];
                let b = &self.nodes[b];
                b.is_analysis
                    .cmp(&a.is_analysis)
                    .then_with(|| a.name.cmp(b.name))
            });
            batches.push(batch);
            current_batch += 1;
        }

        if processed != self.nodes.len() {
            bail!("circular dependency detected in task graph");
        }
        Ok(batches)
    }

    /// Batch schedule as pass names, for inspection.
    pub fn execution_batches(&mut self) -> Result<Vec<Vec<String>>, Report> {
        self.build_dependencies();
        let batches = self.compute_execution_batches()?;
        Ok(batches
            .into_iter()
            .map(|batch| {
                batch
                    .into_iter()
                    .map(|i| self.nodes[i].name.to_owned())
                    .collect()
            })
            .collect())
    }

    /// Batch id assigned to a pass by the last schedule computation.
    pub fn batch_id(&self, name: &str) -> Option<usize> {
        self.names.get(name).map(|&i| self.nodes[i].batch_id)
    }

    /// Direct dependencies of a pass, as wired by
    /// [`build_dependencies`](Self::build_dependencies).
    pub fn depends_on(&self, name: &str) -> Vec<&'static str> {
        match self.names.get(name) {
            Some(&i) => self.nodes[i]
                .depends_on
                .iter()
                .map(|&d| self.nodes[d].name)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Consume the graph into a [`PassManager`] whose execution order
    /// is the flattened batch schedule.
    pub fn build(mut self, policy: ExecutionPolicy) -> Result<PassManager, Report> {
        self.validate()?;
        self.build_dependencies();
        let batches = self.compute_execution_batches()?;
        debug!(batches = batches.len(), passes = self.nodes.len(), "built pass schedule");
        let mut scheduled = Vec::with_capacity(batches.len());
        for batch in batches {
            let mut passes = Vec::with_capacity(batch.len());
            for index in batch {
                if let Some(pass) = self.nodes[index].pass.take() {
                    passes.push(pass);
                }
            }
            scheduled.push(passes);
        }
        Ok(PassManager::from_batches(scheduled, policy))
    }
}
