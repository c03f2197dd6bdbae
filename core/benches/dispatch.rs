//! Benchmark: instruction dispatch strategies
//!
//! Compares the VM running the same bytecode with:
//! 1. Switch dispatch (opcode tag in each header, decoded by `match`)
//! 2. Threaded dispatch (handler address in each header)
//!
//! Run with: `cargo bench --bench dispatch`

use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use moth_core::api::{CompilationOptions, Engine, EngineOptions};
use moth_core::instruction::DispatchMode;
use moth_core::ir::{AluOp, FunctionBuilder, Module, ModuleBuilder};
use moth_core::runtime::Value;

// ============================================================================
// Workloads
// ============================================================================

/// `for (i = 0; i < n; i++) acc += i * i; return acc`
fn sum_of_squares(arena: &Bump) -> Module<'_> {
    let mut f = FunctionBuilder::new(arena, Some("squares"), &["n"], &[]);
    let entry = f.new_block();
    let header = f.new_block();
    let body = f.new_block();
    let exit = f.new_block();
    let acc = f.new_temp();
    let i = f.new_temp();
    let square = f.new_temp();

    f.mov(entry, f.temp(acc), f.number(0.0));
    f.mov(entry, f.temp(i), f.number(0.0));
    f.jump(entry, header);
    f.cjump(header, f.binop(AluOp::Lt, f.temp(i), f.arg(0)), body, exit);
    f.mov(body, f.temp(square), f.binop(AluOp::Mul, f.temp(i), f.temp(i)));
    f.inplace(body, AluOp::Add, f.temp(acc), f.temp(square));
    f.inplace(body, AluOp::Add, f.temp(i), f.number(1.0));
    f.jump(body, header);
    f.ret(exit, f.temp(acc));

    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    module.finish(root)
}

/// Naive `fib(n)`, dominated by call overhead.
fn fibonacci(arena: &Bump) -> Module<'_> {
    let mut module = ModuleBuilder::new();

    let mut f = FunctionBuilder::new(arena, Some("fib"), &["n"], &[]);
    let entry = f.new_block();
    let recurse = f.new_block();
    let base = f.new_block();
    let n1 = f.new_temp();
    let n2 = f.new_temp();
    let a = f.new_temp();
    let b = f.new_temp();
    let sum = f.new_temp();
    f.cjump(entry, f.binop(AluOp::Lt, f.arg(0), f.number(2.0)), base, recurse);
    f.mov(recurse, f.temp(n1), f.binop(AluOp::Sub, f.arg(0), f.number(1.0)));
    f.mov(recurse, f.temp(a), f.call(f.name("fib"), &[f.temp(n1)]));
    f.mov(recurse, f.temp(n2), f.binop(AluOp::Sub, f.arg(0), f.number(2.0)));
    f.mov(recurse, f.temp(b), f.call(f.name("fib"), &[f.temp(n2)]));
    f.mov(recurse, f.temp(sum), f.binop(AluOp::Add, f.temp(a), f.temp(b)));
    f.ret(recurse, f.temp(sum));
    f.ret(base, f.arg(0));
    let fib = module.add(f.build());

    let mut main = FunctionBuilder::new(arena, Some("main"), &["n"], &[]);
    let entry = main.new_block();
    let c = main.new_temp();
    let r = main.new_temp();
    main.mov(entry, main.temp(c), main.closure(fib));
    main.mov(entry, main.name("fib"), main.temp(c));
    main.mov(entry, main.temp(r), main.call(main.name("fib"), &[main.arg(0)]));
    main.ret(entry, main.temp(r));
    let root = module.add(main.build());
    module.finish(root)
}

// ============================================================================
// Benchmarks
// ============================================================================

const MODES: [(&str, DispatchMode); 2] = [
    ("switch", DispatchMode::Switch),
    ("threaded", DispatchMode::Threaded),
];

fn bench_workload(
    c: &mut Criterion,
    group_name: &str,
    build: for<'a> fn(&'a Bump) -> Module<'a>,
    n: f64,
) {
    let mut group = c.benchmark_group(group_name);
    for (label, dispatch) in MODES {
        let arena = Bump::new();
        let mut engine = Engine::new(EngineOptions::default());
        let options = CompilationOptions {
            dispatch,
            ..CompilationOptions::default()
        };
        let compiled = engine.compile_with(&build(&arena), &options);
        let args = [Value::Number(n)];

        group.bench_with_input(BenchmarkId::new(label, n), &args, |b, args| {
            b.iter(|| engine.run(&compiled, black_box(args)).unwrap())
        });
    }
    group.finish();
}

fn bench_loop(c: &mut Criterion) {
    bench_workload(c, "loop", sum_of_squares, 10_000.0);
}

fn bench_calls(c: &mut Criterion) {
    bench_workload(c, "calls", fibonacci, 18.0);
}

criterion_group!(benches, bench_loop, bench_calls);
criterion_main!(benches);
