//! Benchmark for the jump optimizer over synthetic function bodies.
//!
//! Measures the full four-pass pipeline on functions shaped like real
//! compiler output: chains of guarded branches with shared error tails,
//! and receive-style loops with cold exit stubs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tern_asm::asm::{Function, Instruction, LabelRef, Module, Operand, TestOp};
use tern_asm::opt::optimize_module;

/// Build a function of `n` guarded clauses, each branching to its own
/// error stub with an identical body. Tail sharing and exit sinking both
/// have plenty to do here.
fn build_guard_chain(n: u32) -> Function {
    let mut body = vec![
        Instruction::FuncInfo {
            module: "bench".into(),
            function: "guards".into(),
            arity: 1,
        },
        Instruction::Label(1),
    ];
    for i in 0..n {
        let fail = 2 + i * 2;
        let next = 3 + i * 2;
        body.push(Instruction::Test {
            op: TestOp::IsEq,
            fail: LabelRef(fail),
            args: vec![Operand::X(0), Operand::Int(i as i64)],
        });
        body.push(Instruction::Jump(LabelRef(next)));
        body.push(Instruction::Label(fail));
        body.push(Instruction::Badmatch(Operand::X(0)));
        body.push(Instruction::Label(next));
    }
    body.push(Instruction::Move {
        src: Operand::X(0),
        dst: Operand::X(1),
    });
    body.push(Instruction::Return);
    Function::new("guards", 1, 1, body)
}

/// Build a function of `n` duplicated return tails, the tail-sharing
/// worst case.
fn build_shared_tails(n: u32) -> Function {
    let mut body = vec![
        Instruction::FuncInfo {
            module: "bench".into(),
            function: "tails".into(),
            arity: 1,
        },
        Instruction::Label(1),
        Instruction::Jump(LabelRef(2)),
    ];
    for i in 0..n {
        body.push(Instruction::Label(2 + i));
        if i + 1 < n {
            body.push(Instruction::Test {
                op: TestOp::IsNil,
                fail: LabelRef(3 + i),
                args: vec![Operand::X(0)],
            });
        }
        body.push(Instruction::Move {
            src: Operand::X(0),
            dst: Operand::X(1),
        });
        body.push(Instruction::Return);
    }
    Function::new("tails", 1, 1, body)
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize_module");
    for size in [8u32, 64, 256] {
        let module = Module::new("bench")
            .with_function(build_guard_chain(size))
            .with_function(build_shared_tails(size));
        let instructions: usize = module.functions.iter().map(|f| f.body.len()).sum();
        group.throughput(Throughput::Elements(instructions as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &module, |b, module| {
            b.iter(|| optimize_module(black_box(module.clone())).expect("optimization failed"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_optimize);
criterion_main!(benches);
