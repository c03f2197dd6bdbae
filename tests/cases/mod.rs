#![allow(dead_code)]

use bumpalo::Bump;
use moth::ir::Module;
use moth::{CompilationOptions, DispatchMode, Engine, EngineOptions, Error, Value};

/// Every dispatch mode, with and without temp compression.
pub const MODES: [(DispatchMode, bool); 4] = [
    (DispatchMode::Switch, false),
    (DispatchMode::Switch, true),
    (DispatchMode::Threaded, false),
    (DispatchMode::Threaded, true),
];

pub type Build = for<'a> fn(&'a Bump) -> Module<'a>;

/// Compiles `build`'s module for one mode and runs it on `engine`.
pub fn run_on(
    engine: &mut Engine,
    build: Build,
    dispatch: DispatchMode,
    compress_temps: bool,
    args: &[Value],
) -> Result<Value, Error> {
    let arena = Bump::new();
    let module = build(&arena);
    let options = CompilationOptions {
        dispatch,
        compress_temps,
    };
    let compiled = engine.compile_with(&module, &options);
    engine.run(&compiled, args)
}

/// Runs `build`'s module in every mode on a fresh engine each time and
/// returns the per-mode results.
pub fn run_all(build: Build, args: &[Value]) -> Vec<Result<Value, Error>> {
    MODES
        .iter()
        .map(|&(dispatch, compress)| {
            let mut engine = Engine::new(EngineOptions::default());
            run_on(&mut engine, build, dispatch, compress, args)
        })
        .collect()
}

/// Message of an uncaught exception, panicking on any other outcome.
pub fn uncaught(result: &Result<Value, Error>) -> &str {
    match result {
        Err(Error::UncaughtException { message, .. }) => message,
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

/// Declares a test that runs an IR module in every mode and checks the
/// outcome of each run.
///
/// ```ignore
/// test_case!(
///     name,
///     build: some_module,
///     args: [Value::Number(1.0)],
///     value: Value::Number(2.0),
/// );
/// test_case!(
///     name,
///     build: some_module,
///     args: [],
///     uncaught: "TypeError: ...",
/// );
/// ```
#[macro_export]
macro_rules! test_case {
    (
        $name:ident,
        build: $build:expr,
        args: [$($arg:expr),* $(,)?],
        value: $expected:expr $(,)?
    ) => {
        #[test]
        fn $name() {
            let args: Vec<moth::Value> = vec![$($arg),*];
            for (mode, result) in cases::MODES.iter().zip(cases::run_all($build, &args)) {
                match result {
                    Ok(value) => pretty_assertions::assert_eq!(value, $expected, "mode {:?}", mode),
                    Err(err) => panic!("mode {:?} failed: {}", mode, err),
                }
            }
        }
    };
    (
        $name:ident,
        build: $build:expr,
        args: [$($arg:expr),* $(,)?],
        uncaught: $message:expr $(,)?
    ) => {
        #[test]
        fn $name() {
            let args: Vec<moth::Value> = vec![$($arg),*];
            for (mode, result) in cases::MODES.iter().zip(cases::run_all($build, &args)) {
                let message = cases::uncaught(&result);
                pretty_assertions::assert_eq!(message, $message, "mode {:?}", mode);
            }
        }
    };
}
