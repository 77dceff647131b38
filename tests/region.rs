use glint::{DataType, Module, NodeBuilder, Opcode, Value};

#[test]
fn hierarchy_management() {
    let mut module = Module::new("module");
    let parent = module.create_region("parent", None);
    let child = module.create_region("child", Some(parent));

    assert_eq!(module.region(child).parent(), Some(parent));
    assert!(module.region(parent).children().contains(&child));
    assert_eq!(module.region(parent).children().len(), 1);
}

#[test]
fn dominance_via_tree() {
    let mut module = Module::new("module");
    let root = module.create_region("test", None);
    let child = module.create_region("child", Some(root));
    let grandchild = module.create_region("grandchild", Some(child));

    // Parents always dominate children.
    assert!(module.dominates_via_tree(root, child));
    assert!(module.dominates_via_tree(root, grandchild));
    assert!(module.dominates_via_tree(child, grandchild));

    // Children never dominate their parents.
    assert!(!module.dominates_via_tree(child, root));
    assert!(!module.dominates_via_tree(grandchild, root));
    assert!(!module.dominates_via_tree(grandchild, child));

    // Self-dominance.
    assert!(module.dominates_via_tree(root, root));
}

#[test]
fn siblings_dont_dominate() {
    let mut module = Module::new("module");
    let root = module.create_region("test", None);
    let child1 = module.create_region("child1", Some(root));
    let child2 = module.create_region("child2", Some(root));

    assert!(!module.dominates_via_tree(child1, child2));
    assert!(!module.dominates_via_tree(child2, child1));
}

#[test]
fn termination_tracks_the_last_node() {
    let mut module = Module::new("module");
    let region = module.create_region("body", None);
    assert!(!module.is_terminated(region));

    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .build(&mut module, region);
    assert!(module.is_terminated(region));

    NodeBuilder::lit(Value::Int32(1)).build(&mut module, region);
    assert!(!module.is_terminated(region));
}

#[test]
fn insertion_order() {
    let mut module = Module::new("module");
    let region = module.create_region("body", None);
    let entry = module.region(region).entry();

    let a = NodeBuilder::lit(Value::Int32(1)).build(&mut module, region);
    let b = NodeBuilder::lit(Value::Int32(2)).build_detached(&mut module);
    let c = NodeBuilder::lit(Value::Int32(3)).build_detached(&mut module);
    let d = NodeBuilder::lit(Value::Int32(4)).build_detached(&mut module);

    module.insert_before(region, a, b);
    module.insert_after(region, b, c);
    module.insert(region, d);

    assert_eq!(module.region(region).nodes(), &[d, entry, b, c, a]);
    assert_eq!(module.node(b).parent, Some(region));
    assert_eq!(module.node(d).parent, Some(region));
}

#[test]
fn removal_detaches_nodes() {
    let mut module = Module::new("module");
    let region = module.create_region("body", None);
    let a = NodeBuilder::lit(Value::Int32(1)).build(&mut module, region);
    let b = NodeBuilder::lit(Value::Int32(2)).build(&mut module, region);
    let c = NodeBuilder::lit(Value::Int32(3)).build(&mut module, region);

    module.remove(region, a);
    assert_eq!(module.node(a).parent, None);
    assert!(!module.region(region).nodes().contains(&a));

    module.remove_bulk(region, &[b, c]);
    assert_eq!(module.node(b).parent, None);
    assert_eq!(module.node(c).parent, None);
    // Only the seeded entry remains.
    assert_eq!(module.region(region).nodes().len(), 1);
}

#[test]
fn update_connection_fixes_both_edge_lists() {
    let mut module = Module::new("module");
    let region = module.create_region("body", None);
    let old = NodeBuilder::lit(Value::Int32(1)).build(&mut module, region);
    let new = NodeBuilder::lit(Value::Int32(2)).build(&mut module, region);
    let user = NodeBuilder::new(Opcode::Bnot)
        .ty(DataType::Int32)
        .operand(old)
        .build(&mut module, region);

    assert!(module.node(old).users.contains(&user));

    assert!(module.update_connection(user, old, new));
    assert_eq!(module.node(user).inputs, vec![new]);
    assert!(!module.node(old).users.contains(&user));
    assert!(module.node(new).users.contains(&user));

    // A missing slot reports failure and changes nothing.
    assert!(!module.update_connection(user, old, new));
}

#[test]
fn replace_with_rewire_moves_all_users() {
    let mut module = Module::new("module");
    let region = module.create_region("body", None);
    let a = NodeBuilder::lit(Value::Int32(1)).build(&mut module, region);
    let b = NodeBuilder::lit(Value::Int32(2)).build(&mut module, region);
    let sum = NodeBuilder::new(Opcode::Add)
        .ty(DataType::Int32)
        .operands([a, b])
        .build(&mut module, region);
    let user = NodeBuilder::new(Opcode::Mul)
        .ty(DataType::Int32)
        .operands([sum, b])
        .build(&mut module, region);

    let replacement = NodeBuilder::lit(Value::Int32(3)).build_detached(&mut module);
    assert!(module.replace(region, sum, replacement, true));

    assert_eq!(module.node(user).inputs, vec![replacement, b]);
    assert!(module.node(replacement).users.contains(&user));
    assert_eq!(module.node(replacement).parent, Some(region));

    // The replaced node is fully unlinked.
    assert_eq!(module.node(sum).parent, None);
    assert!(module.node(sum).inputs.is_empty());
    assert!(module.node(sum).users.is_empty());
    assert!(!module.node(a).users.contains(&sum));
    assert!(!module.node(b).users.contains(&sum));
}

#[test]
fn replace_of_a_foreign_node_fails() {
    let mut module = Module::new("module");
    let region = module.create_region("body", None);
    let other = module.create_region("other", None);
    let stray = NodeBuilder::lit(Value::Int32(1)).build(&mut module, other);
    let replacement = NodeBuilder::lit(Value::Int32(2)).build_detached(&mut module);

    assert!(!module.replace(region, stray, replacement, true));
}

#[test]
fn unstructured_jump_detection() {
    let mut module = Module::new("module");
    let a = module.create_region("a", None);
    let b = module.create_region("b", None);
    let b_entry = module.region(b).entry();

    assert!(module.has_unstructured_jumps_to(a, b).is_none());

    let jump = NodeBuilder::new(Opcode::Jump)
        .ty(DataType::Void)
        .operand(b_entry)
        .build(&mut module, a);
    assert_eq!(module.has_unstructured_jumps_to(a, b), Some(jump));
}

#[test]
fn unstructured_jumps_refine_dominance() {
    let mut module = Module::new("module");
    let parent = module.create_region("parent", None);
    let inner = module.create_region("inner", Some(parent));
    let sibling = module.create_region("sibling", None);

    assert!(module.dominates(parent, inner));

    // A side entrance from a region the parent does not dominate
    // breaks the relation.
    let inner_entry = module.region(inner).entry();
    NodeBuilder::new(Opcode::Jump)
        .ty(DataType::Void)
        .operand(inner_entry)
        .build(&mut module, sibling);
    assert!(!module.dominates(parent, inner));
    assert!(module.dominates(parent, parent));
}
