use glint::{
    DataType, FunctionValue, Module, NodeBuilder, Opcode, Value,
};

#[test]
fn basic_properties() {
    let module = Module::new("test_module");
    assert_eq!(module.name(), "test_module");
    assert_ne!(module.root(), module.rodata());
    assert!(module.functions().is_empty());
}

#[test]
fn root_and_rodata_regions() {
    let module = Module::new("test_module");
    let root = module.root();
    let rodata = module.rodata();

    assert_eq!(module.region_name(root), ".__global");
    assert_eq!(module.region_name(rodata), ".__rodata");

    assert_eq!(module.region(root).parent(), None);
    assert_eq!(module.region(rodata).parent(), None);
}

#[test]
fn string_interning() {
    let mut module = Module::new("test_module");
    let h = module.intern("hello");
    let w = module.intern("world");
    let h2 = module.intern("hello");

    assert_eq!(h, h2);
    assert_ne!(h, w);

    assert_eq!(module.strtab().get(h).unwrap(), "hello");
    assert_eq!(module.strtab().get(w).unwrap(), "world");
    assert_eq!(module.strtab().get(glint::StringId::EMPTY).unwrap(), "");
}

#[test]
fn region_creation_defaults_to_root_parent() {
    let mut module = Module::new("module");
    let foo = module.create_region("foo", None);
    let bar = module.create_region("bar", None);

    assert_ne!(foo, bar);
    assert_eq!(module.region_name(foo), "foo");
    assert_eq!(module.region_name(bar), "bar");
    assert_eq!(module.region(foo).parent(), Some(module.root()));
    assert_eq!(module.region(bar).parent(), Some(module.root()));
}

#[test]
fn fresh_regions_are_seeded_with_an_entry_node() {
    let mut module = Module::new("module");
    let region = module.create_region("body", None);

    let nodes = module.region(region).nodes();
    assert_eq!(nodes.len(), 1);
    let entry = module.region(region).entry();
    assert_eq!(nodes[0], entry);
    assert_eq!(module.node(entry).op, Opcode::Entry);
    assert_eq!(module.node(entry).parent, Some(region));
}

fn function_node(module: &mut Module, name: &str) -> glint::NodeId {
    let root = module.root();
    NodeBuilder::new(Opcode::Function)
        .ty(DataType::Function)
        .value(Value::Function(FunctionValue {
            params: Vec::new(),
            return_type: Box::new(Value::Void),
        }))
        .named(name)
        .build(module, root)
}

#[test]
fn function_registration_is_unique() {
    let mut module = Module::new("module");
    let main = function_node(&mut module, "main");

    module.add_fn(main);
    module.add_fn(main);
    assert_eq!(module.functions().len(), 1);
    assert!(module.contains_fn(main));

    assert_eq!(module.find_fn("main"), Some(main));
    assert_eq!(module.find_fn("other"), None);
}

#[test]
fn non_function_nodes_are_not_registered() {
    let mut module = Module::new("module");
    let root = module.root();
    let lit = NodeBuilder::lit(Value::Int32(1)).build(&mut module, root);

    module.add_fn(lit);
    assert!(module.functions().is_empty());
}

#[test]
fn rodata_appends_to_the_rodata_region() {
    let mut module = Module::new("module");
    let rodata = module.rodata();
    let before = module.region(rodata).nodes().len();

    let root = module.root();
    let lit = NodeBuilder::lit(Value::Int64(42)).build(&mut module, root);
    module.remove(root, lit);
    module.add_rodata(lit);

    assert_eq!(module.region(rodata).nodes().len(), before + 1);
    assert_eq!(module.node(lit).parent, Some(rodata));
}

#[test]
fn function_signatures_deep_copy() {
    let signature = Value::Function(FunctionValue {
        params: vec![DataType::Int32, DataType::Pointer],
        return_type: Box::new(Value::Function(FunctionValue {
            params: Vec::new(),
            return_type: Box::new(Value::Int32(0)),
        })),
    });
    let copy = signature.clone();
    assert_eq!(signature, copy);
    assert_eq!(copy.ty(), DataType::Function);
}

#[test]
fn dump_mentions_module_and_regions() {
    glint::diagnostics_color_disable();
    let mut module = Module::new("dumped");
    let body = module.create_region("main", None);
    NodeBuilder::lit(Value::Int32(7)).build(&mut module, body);

    let text = format!("{}", module);
    assert!(text.contains("dumped"));
    assert!(text.contains(".__global"));
    assert!(text.contains("main"));
    assert!(text.contains("lit"));
}
