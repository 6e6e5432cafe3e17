use criterion::{black_box, criterion_group, criterion_main, Criterion};

use meander_core::analysis::{run, AvailableExpressions, ConstantPropagation, Liveness};
use meander_core::ir::{BinaryOp, CmpOp, Function, FunctionBuilder};

/// A chain of `depth` diamonds, each merging its arms with a phi that
/// feeds the next diamond's condition.
fn diamond_chain(depth: usize) -> Function {
    let mut b = FunctionBuilder::new("chain", &["a", "b"]);
    let mut current = b.block("entry");
    let mut carried = b.arg(0);
    for i in 0..depth {
        let left = b.block(&format!("left{i}"));
        let right = b.block(&format!("right{i}"));
        let join = b.block(&format!("join{i}"));
        b.switch_to(current);
        let c = b.cmp(CmpOp::Lt, carried, b.arg(1));
        b.branch(c, left, right);
        b.switch_to(left);
        let l = b.binary(BinaryOp::Add, carried, b.arg(1));
        b.jump(join);
        b.switch_to(right);
        let r = b.binary(BinaryOp::Mul, carried, b.arg(1));
        b.jump(join);
        b.switch_to(join);
        carried = b.phi(vec![(left, l), (right, r)]);
        current = join;
    }
    b.switch_to(current);
    b.ret(Some(carried));
    b.finish()
}

fn bench_analyses(c: &mut Criterion) {
    let small = diamond_chain(8);
    let large = diamond_chain(128);

    let mut group = c.benchmark_group("fixed_point");
    group.bench_function("avail_exprs/8", |b| {
        b.iter(|| run(black_box(&small), AvailableExpressions))
    });
    group.bench_function("avail_exprs/128", |b| {
        b.iter(|| run(black_box(&large), AvailableExpressions))
    });
    group.bench_function("liveness/8", |b| {
        b.iter(|| run(black_box(&small), Liveness))
    });
    group.bench_function("liveness/128", |b| {
        b.iter(|| run(black_box(&large), Liveness))
    });
    group.bench_function("const_prop/8", |b| {
        b.iter(|| run(black_box(&small), ConstantPropagation::new()))
    });
    group.bench_function("const_prop/128", |b| {
        b.iter(|| run(black_box(&large), ConstantPropagation::new()))
    });
    group.finish();
}

criterion_group!(benches, bench_analyses);
criterion_main!(benches);
