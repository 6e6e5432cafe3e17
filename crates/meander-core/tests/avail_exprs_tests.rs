use meander_core::analysis::{
    run, AvailableExpressions, DomainElement, DomainValue, Expression, MeetOp, Presence, Transfer,
    TransferCx,
};
use meander_core::ir::{parse_function, ArgId, BinaryOp, BlockId, Function, InstId, Operand};

fn expr(op: BinaryOp, lhs: Operand, rhs: Operand) -> Expression {
    Expression::new(op, lhs, rhs)
}

const A: Operand = Operand::Arg(ArgId(0));
const B: Operand = Operand::Arg(ArgId(1));

#[test]
fn recomputation_in_either_order_is_available() {
    let f = parse_function(
        "\
fn f(a, b) {
entry:
  %x = add a, b
  %y = add b, a
  ret %y
}
",
    )
    .unwrap();
    let result = run(&f, AvailableExpressions);

    let id = result.domain().id_of(&expr(BinaryOp::Add, A, B)).unwrap();
    // Present right after the first computation, and still at the second.
    assert_eq!(result.inst_value(InstId(0))[id], Presence(true));
    assert_eq!(result.inst_value(InstId(1))[id], Presence(true));
}

#[test]
fn available_at_join_only_when_all_paths_compute_it() {
    let both = parse_function(
        "\
fn g(a, b, c) {
entry:
  br c, left, right
left:
  %x = add a, b
  jmp join
right:
  %y = add a, b
  jmp join
join:
  %z = mul a, b
  ret %z
}
",
    )
    .unwrap();
    let result = run(&both, AvailableExpressions);
    let id = result.domain().id_of(&expr(BinaryOp::Add, A, B)).unwrap();
    let join = BlockId(3);
    assert_eq!(result.block_value(join)[id], Presence(true));

    let one_side = parse_function(
        "\
fn g(a, b, c) {
entry:
  br c, left, right
left:
  %x = add a, b
  jmp join
right:
  %y = sub a, b
  jmp join
join:
  %z = mul a, b
  ret %z
}
",
    )
    .unwrap();
    let result = run(&one_side, AvailableExpressions);
    let id = result.domain().id_of(&expr(BinaryOp::Add, A, B)).unwrap();
    assert_eq!(result.block_value(join)[id], Presence(false));
}

#[test]
fn loop_header_phi_kills_expressions_over_the_carried_value() {
    let f = parse_function(
        "\
fn h(n) {
entry:
  jmp head
head:
  %i = phi [entry: 0], [body: %next]
  %s = add %i, n
  %c = cmp.lt %i, n
  br %c, body, done
body:
  %next = add %i, 1
  jmp head
done:
  ret %s
}
",
    )
    .unwrap();
    let result = run(&f, AvailableExpressions);
    let i = Operand::Inst(InstId(1));
    let sum = result
        .domain()
        .id_of(&expr(BinaryOp::Add, i, Operand::Arg(ArgId(0))))
        .unwrap();

    // Available after its computation within the iteration...
    assert_eq!(result.inst_value(InstId(2))[sum], Presence(true));
    // ...but not across the back edge into the header.
    assert_eq!(result.block_value(BlockId(1))[sum], Presence(false));
    assert_eq!(result.inst_value(InstId(1))[sum], Presence(false));
}

/// Drives the transfer function directly: redefining an expression's
/// operand must kill the expression even if it flowed in as available.
#[test]
fn redefining_an_operand_kills_dependent_expressions() {
    let f: Function = parse_function(
        "\
fn k(a, b) {
entry:
  %x = add a, b
  %m = mul %x, a
  ret %m
}
",
    )
    .unwrap();
    let domain = Expression::collect(&f);
    let dependent = domain
        .id_of(&expr(BinaryOp::Mul, Operand::Inst(InstId(0)), A))
        .unwrap();

    let len = domain.len();
    let inst_values: Vec<DomainValue<Presence>> = (0..f.num_insts())
        .map(|_| DomainValue::top(len, MeetOp::Intersect))
        .collect();
    let mut input = DomainValue::top(len, MeetOp::Intersect);
    input.set(dependent, Presence(true));
    let mut output = DomainValue::top(len, MeetOp::Intersect);

    let cx = TransferCx {
        function: &f,
        domain: &domain,
        inst_values: &inst_values,
        block: BlockId::ENTRY,
    };
    // InstId(0) defines %x, which [mul %x, a] references.
    AvailableExpressions.transfer(&cx, InstId(0), &input, &mut output);
    assert_eq!(output[dependent], Presence(false));
}
