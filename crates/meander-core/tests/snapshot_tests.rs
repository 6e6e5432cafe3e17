//! Golden dumps of the per-instruction diagnostic renders.

use meander_core::analysis::{run, AvailableExpressions, ConstantPropagation, Liveness};
use meander_core::ir::parse_function;

#[test]
fn const_prop_folds_a_branch() {
    let f = parse_function(
        "\
fn select() {
entry:
  %c = cmp.lt 1, 2
  br %c, yes, no
yes:
  %a = add 10, 2
  jmp out
no:
  %b = mul 10, 2
  jmp out
out:
  %r = phi [yes: %a], [no: %b]
  ret %r
}
",
    )
    .unwrap();
    let dump = run(&f, ConstantPropagation::new()).render(&f);
    insta::assert_snapshot!("const_prop_folds_a_branch", dump);
}

#[test]
fn liveness_around_a_loop() {
    let f = parse_function(
        "\
fn count(n) {
entry:
  jmp head
head:
  %i = phi [entry: 0], [body: %next]
  %c = cmp.lt %i, n
  br %c, body, done
body:
  %next = add %i, 1
  jmp head
done:
  ret %i
}
",
    )
    .unwrap();
    let dump = run(&f, Liveness).render(&f);
    insta::assert_snapshot!("liveness_around_a_loop", dump);
}

#[test]
fn available_expressions_at_a_join() {
    let f = parse_function(
        "\
fn shared(a, b, c) {
entry:
  %p = add a, b
  br c, left, right
left:
  %q = add a, b
  jmp join
right:
  %r = mul a, b
  jmp join
join:
  %s = add a, b
  ret %s
}
",
    )
    .unwrap();
    let dump = run(&f, AvailableExpressions).render(&f);
    insta::assert_snapshot!("available_expressions_at_a_join", dump);
}
