use glint::transform::ConstantFolding;
use glint::{
    AnalysisCache, DataType, Module, NodeBuilder, NodeId, Opcode, RegionId, TransformPass, Value,
};

fn run_fold(module: &mut Module) -> Vec<RegionId> {
    let cache = AnalysisCache::default();
    let mut pass = ConstantFolding::new();
    pass.run(module, &cache).unwrap()
}

fn find_lit(module: &Module, region: RegionId, value: &Value) -> Option<NodeId> {
    module.region(region).nodes().iter().copied().find(|&n| {
        let node = module.node(n);
        node.op == Opcode::Lit && node.value == *value
    })
}

#[test]
fn folding_cascades_through_users() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let l1 = NodeBuilder::lit(Value::Int32(3)).build(&mut module, body);
    let l2 = NodeBuilder::lit(Value::Int32(4)).build(&mut module, body);
    let sum = NodeBuilder::new(Opcode::Add)
        .ty(DataType::Int32)
        .operands([l1, l2])
        .build(&mut module, body);
    let product = NodeBuilder::new(Opcode::Mul)
        .ty(DataType::Int32)
        .operands([sum, l2])
        .build(&mut module, body);
    let ret = NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operand(product)
        .build(&mut module, body);

    let modified = run_fold(&mut module);
    assert_eq!(modified, vec![body]);

    // Both the sum and its user folded away.
    assert_eq!(module.node(sum).parent, None);
    assert_eq!(module.node(product).parent, None);
    assert!(!module.node(product).inputs.contains(&sum));

    assert!(find_lit(&module, body, &Value::Int32(7)).is_some());
    let folded = find_lit(&module, body, &Value::Int32(28)).unwrap();
    assert_eq!(module.node(ret).inputs, vec![folded]);
    assert!(module.node(folded).users.contains(&ret));
}

#[test]
fn division_by_zero_is_never_folded() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let l1 = NodeBuilder::lit(Value::Int32(10)).build(&mut module, body);
    let l2 = NodeBuilder::lit(Value::Int32(0)).build(&mut module, body);
    let div = NodeBuilder::new(Opcode::Div)
        .ty(DataType::Int32)
        .operands([l1, l2])
        .build(&mut module, body);
    let rem = NodeBuilder::new(Opcode::Mod)
        .ty(DataType::Int32)
        .operands([l1, l2])
        .build(&mut module, body);

    run_fold(&mut module);

    assert_eq!(module.node(div).parent, Some(body));
    assert_eq!(module.node(div).inputs, vec![l1, l2]);
    assert_eq!(module.node(rem).parent, Some(body));
}

#[test]
fn folding_reaches_a_fixed_point() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let l1 = NodeBuilder::lit(Value::Int32(3)).build(&mut module, body);
    let l2 = NodeBuilder::lit(Value::Int32(4)).build(&mut module, body);
    let sum = NodeBuilder::new(Opcode::Add)
        .ty(DataType::Int32)
        .operands([l1, l2])
        .build(&mut module, body);
    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operand(sum)
        .build(&mut module, body);

    let first = run_fold(&mut module);
    assert_eq!(first, vec![body]);
    let snapshot = module.region(body).nodes().to_vec();

    let second = run_fold(&mut module);
    assert!(second.is_empty());
    assert_eq!(module.region(body).nodes(), snapshot.as_slice());
}

#[test]
fn mixed_signedness_operands_are_promoted() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let lhs = NodeBuilder::lit(Value::Int32(-1)).build(&mut module, body);
    let rhs = NodeBuilder::lit(Value::Uint32(5)).build(&mut module, body);
    let sum = NodeBuilder::new(Opcode::Add)
        .ty(DataType::Int32)
        .operands([lhs, rhs])
        .build(&mut module, body);
    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operand(sum)
        .build(&mut module, body);

    run_fold(&mut module);

    // Operands were retyped in place and the result carries the
    // promoted type.
    assert_eq!(module.node(lhs).ty, DataType::Int64);
    assert_eq!(module.node(rhs).ty, DataType::Int64);
    assert!(find_lit(&module, body, &Value::Int64(4)).is_some());
}

#[test]
fn shift_amounts_are_masked_to_the_operand_width() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let value = NodeBuilder::lit(Value::Int32(1)).build(&mut module, body);
    let amount = NodeBuilder::lit(Value::Int32(33)).build(&mut module, body);
    let shift = NodeBuilder::new(Opcode::Bshl)
        .ty(DataType::Int32)
        .operands([value, amount])
        .build(&mut module, body);
    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operand(shift)
        .build(&mut module, body);

    run_fold(&mut module);

    // 33 & 31 == 1, so the result is 1 << 1.
    assert!(find_lit(&module, body, &Value::Int32(2)).is_some());
}

#[test]
fn comparisons_fold_to_bool_literals() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let l1 = NodeBuilder::lit(Value::Int32(3)).build(&mut module, body);
    let l2 = NodeBuilder::lit(Value::Int32(4)).build(&mut module, body);
    let lt = NodeBuilder::new(Opcode::Lt)
        .ty(DataType::Bool)
        .operands([l1, l2])
        .build(&mut module, body);
    let gte = NodeBuilder::new(Opcode::Gte)
        .ty(DataType::Bool)
        .operands([l1, l2])
        .build(&mut module, body);
    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operands([lt, gte])
        .build(&mut module, body);

    run_fold(&mut module);

    assert!(find_lit(&module, body, &Value::Bool(true)).is_some());
    assert!(find_lit(&module, body, &Value::Bool(false)).is_some());
}

#[test]
fn bitwise_not_preserves_the_operand_type() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let input = NodeBuilder::lit(Value::Uint8(0x0F)).build(&mut module, body);
    let not = NodeBuilder::new(Opcode::Bnot)
        .ty(DataType::Uint8)
        .operand(input)
        .build(&mut module, body);
    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operand(not)
        .build(&mut module, body);

    run_fold(&mut module);

    assert!(find_lit(&module, body, &Value::Uint8(0xF0)).is_some());
}

#[test]
fn branch_on_literal_condition_becomes_a_jump() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);
    let then_region = module.create_region("then", Some(body));
    let else_region = module.create_region("else", Some(body));
    let then_entry = module.region(then_region).entry();
    let else_entry = module.region(else_region).entry();

    let cond = NodeBuilder::lit(Value::Bool(true)).build(&mut module, body);
    let branch = NodeBuilder::new(Opcode::Branch)
        .ty(DataType::Void)
        .operands([cond, then_entry, else_entry])
        .build(&mut module, body);

    run_fold(&mut module);

    assert_eq!(module.node(branch).parent, None);
    let jump = module
        .region(body)
        .nodes()
        .iter()
        .copied()
        .find(|&n| module.node(n).op == Opcode::Jump)
        .unwrap();
    assert_eq!(module.node(jump).inputs, vec![then_entry]);
}

#[test]
fn casts_fold_by_value_conversion() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let input = NodeBuilder::lit(Value::Int32(7)).build(&mut module, body);
    let cast = NodeBuilder::new(Opcode::Cast)
        .ty(DataType::Int64)
        .operand(input)
        .build(&mut module, body);
    let reinterpret = NodeBuilder::new(Opcode::ReinterpretCast)
        .ty(DataType::Float32)
        .operand(input)
        .build(&mut module, body);
    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operands([cast, reinterpret])
        .build(&mut module, body);

    run_fold(&mut module);

    assert!(find_lit(&module, body, &Value::Int64(7)).is_some());
    // Bitwise reinterpretation is not value folding.
    assert_eq!(module.node(reinterpret).parent, Some(body));
}

#[test]
fn from_folds_only_identical_literals() {
    let mut module = Module::new("test");
    let body = module.create_region("main", None);

    let a = NodeBuilder::lit(Value::Int32(5)).build(&mut module, body);
    let b = NodeBuilder::lit(Value::Int32(5)).build(&mut module, body);
    let c = NodeBuilder::lit(Value::Int32(6)).build(&mut module, body);

    let same = NodeBuilder::new(Opcode::From)
        .ty(DataType::Int32)
        .operands([a, b])
        .build(&mut module, body);
    let differing = NodeBuilder::new(Opcode::From)
        .ty(DataType::Int32)
        .operands([a, c])
        .build(&mut module, body);
    NodeBuilder::new(Opcode::Ret)
        .ty(DataType::Void)
        .operands([same, differing])
        .build(&mut module, body);

    run_fold(&mut module);

    assert_eq!(module.node(same).parent, None);
    assert_eq!(module.node(differing).parent, Some(body));
}
