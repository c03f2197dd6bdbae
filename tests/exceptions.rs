mod cases;

use bumpalo::Bump;
use moth::ir::{AluOp, Builtin, FunctionBuilder, Module, ModuleBuilder};
use moth::{DispatchMode, Engine, EngineOptions, Error, Throw, Value};
use pretty_assertions::assert_eq;

/// ```text
/// var t = 1;
/// try { t += 1; throw "x" } catch (_) { return t }
/// ```
fn restore_temp(arena: &Bump) -> Module<'_> {
    let mut f = FunctionBuilder::new(arena, Some("main"), &[], &[]);
    let entry = f.new_block();
    let body = f.new_block();
    let catch = f.new_block();
    let t = f.new_temp();
    let installed = f.new_temp();

    f.mov(entry, f.temp(t), f.number(1.0));
    f.mov(entry, f.temp(installed), f.builtin(Builtin::CreateExceptionHandler, &[]));
    f.cjump(entry, f.temp(installed), catch, body);

    f.inplace(body, AluOp::Add, f.temp(t), f.number(1.0));
    f.exp(body, f.builtin(Builtin::Throw, &[f.string("x")]));
    f.exp(body, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.ret(body, f.temp(t));

    f.exp(catch, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.ret(catch, f.temp(t));

    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    module.finish(root)
}

test_case!(
    unwind_restores_temps_from_handler_creation,
    build: restore_temp,
    args: [],
    value: Value::Number(1.0),
);

/// ```text
/// try { missing } catch (e) { return e.name + "/" + e.message }
/// ```
fn reference_error(arena: &Bump) -> Module<'_> {
    let mut f = FunctionBuilder::new(arena, Some("main"), &[], &[]);
    let entry = f.new_block();
    let body = f.new_block();
    let catch = f.new_block();
    let installed = f.new_temp();
    let value = f.new_temp();
    let e = f.new_temp();
    let name = f.new_temp();
    let message = f.new_temp();
    let prefix = f.new_temp();
    let text = f.new_temp();

    f.mov(entry, f.temp(installed), f.builtin(Builtin::CreateExceptionHandler, &[]));
    f.cjump(entry, f.temp(installed), catch, body);

    f.mov(body, f.temp(value), f.name("missing"));
    f.exp(body, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.ret(body, f.temp(value));

    f.exp(catch, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.mov(catch, f.temp(e), f.builtin(Builtin::GetException, &[]));
    f.mov(catch, f.temp(name), f.member(f.temp(e), "name"));
    f.mov(catch, f.temp(message), f.member(f.temp(e), "message"));
    f.mov(catch, f.temp(prefix), f.binop(AluOp::Add, f.temp(name), f.string("/")));
    f.mov(catch, f.temp(text), f.binop(AluOp::Add, f.temp(prefix), f.temp(message)));
    f.ret(catch, f.temp(text));

    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    module.finish(root)
}

test_case!(
    engine_errors_are_catchable_objects,
    build: reference_error,
    args: [],
    value: Value::string("ReferenceError/missing is not defined"),
);

/// ```text
/// try { throw 3 } catch (e) { with-catch-scope e: return e * 2 }
/// ```
fn catch_scope(arena: &Bump) -> Module<'_> {
    let mut f = FunctionBuilder::new(arena, Some("main"), &[], &[]);
    let entry = f.new_block();
    let body = f.new_block();
    let catch = f.new_block();
    let installed = f.new_temp();
    let e = f.new_temp();
    let doubled = f.new_temp();

    f.mov(entry, f.temp(installed), f.builtin(Builtin::CreateExceptionHandler, &[]));
    f.cjump(entry, f.temp(installed), catch, body);

    f.exp(body, f.builtin(Builtin::Throw, &[f.number(3.0)]));
    f.exp(body, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.ret(body, f.undefined());

    f.exp(catch, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.exp(catch, f.builtin(Builtin::PushCatchScope, &[f.string("e")]));
    f.mov(catch, f.temp(e), f.name("e"));
    f.mov(catch, f.temp(doubled), f.binop(AluOp::Mul, f.temp(e), f.number(2.0)));
    f.exp(catch, f.builtin(Builtin::PopScope, &[]));
    f.ret(catch, f.temp(doubled));

    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    module.finish(root)
}

test_case!(
    catch_scope_binds_the_exception_by_name,
    build: catch_scope,
    args: [],
    value: Value::Number(6.0),
);

/// The handler is removed before the throw, so nothing catches it.
fn handler_already_removed(arena: &Bump) -> Module<'_> {
    let mut f = FunctionBuilder::new(arena, Some("main"), &[], &[]);
    let entry = f.new_block();
    let body = f.new_block();
    let catch = f.new_block();
    let installed = f.new_temp();

    f.mov(entry, f.temp(installed), f.builtin(Builtin::CreateExceptionHandler, &[]));
    f.cjump(entry, f.temp(installed), catch, body);

    f.exp(body, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.exp(body, f.builtin(Builtin::Throw, &[f.string("too late")]));
    f.ret(body, f.undefined());

    f.exp(catch, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.ret(catch, f.string("caught"));

    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    module.finish(root)
}

test_case!(
    removed_handler_does_not_catch,
    build: handler_already_removed,
    args: [],
    uncaught: "too late",
);

/// `inner` throws through `middle`, which has no handler, into `main`.
fn two_frames_up(arena: &Bump) -> Module<'_> {
    let mut module = ModuleBuilder::new();

    let mut inner = FunctionBuilder::new(arena, Some("inner"), &[], &[]);
    let entry = inner.new_block();
    inner.exp(entry, inner.builtin(Builtin::Throw, &[inner.number(9.0)]));
    inner.ret(entry, inner.undefined());
    let inner = module.add(inner.build());

    let mut middle = FunctionBuilder::new(arena, Some("middle"), &[], &[]);
    let entry = middle.new_block();
    let c = middle.new_temp();
    let r = middle.new_temp();
    middle.mov(entry, middle.temp(c), middle.closure(inner));
    middle.mov(entry, middle.temp(r), middle.call(middle.temp(c), &[]));
    middle.ret(entry, middle.string("unreachable"));
    let middle = module.add(middle.build());

    let mut f = FunctionBuilder::new(arena, Some("main"), &[], &[]);
    let entry = f.new_block();
    let body = f.new_block();
    let catch = f.new_block();
    let installed = f.new_temp();
    let c = f.new_temp();
    let e = f.new_temp();
    f.mov(entry, f.temp(c), f.closure(middle));
    f.mov(entry, f.temp(installed), f.builtin(Builtin::CreateExceptionHandler, &[]));
    f.cjump(entry, f.temp(installed), catch, body);
    f.exp(body, f.call(f.temp(c), &[]));
    f.exp(body, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.ret(body, f.undefined());
    f.exp(catch, f.builtin(Builtin::DeleteExceptionHandler, &[]));
    f.mov(catch, f.temp(e), f.builtin(Builtin::GetException, &[]));
    f.ret(catch, f.temp(e));
    let root = module.add(f.build());
    module.finish(root)
}

test_case!(
    throw_skips_frames_without_handlers,
    build: two_frames_up,
    args: [],
    value: Value::Number(9.0),
);

fn rethrow(engine: &mut Engine, _: &Value, args: &[Value]) -> Result<Value, Throw> {
    let value = args.first().cloned().unwrap_or_default();
    Err(engine.throw(value))
}

/// `fail(a)` with a native `fail` that throws its argument.
fn native_throw(arena: &Bump) -> Module<'_> {
    let mut f = FunctionBuilder::new(arena, Some("main"), &["a"], &[]);
    let entry = f.new_block();
    let r = f.new_temp();
    f.mov(entry, f.temp(r), f.call(f.name("fail"), &[f.arg(0)]));
    f.ret(entry, f.temp(r));
    let mut module = ModuleBuilder::new();
    let root = module.add(f.build());
    module.finish(root)
}

#[test]
fn uncaught_exception_carries_the_thrown_value() {
    for (dispatch, compress) in cases::MODES {
        let mut engine = Engine::new(EngineOptions::default());
        engine.register_function("fail", rethrow);
        let result = cases::run_on(
            &mut engine,
            native_throw,
            dispatch,
            compress,
            &[Value::Number(12.5)],
        );
        let err = result.unwrap_err();
        assert_eq!(err.value(), Some(&Value::Number(12.5)));
        assert_eq!(err.to_string(), "Uncaught exception: 12.5");
        assert_eq!(engine.exception(), &Value::Number(12.5));
    }
}

#[test]
fn engine_is_reusable_after_an_uncaught_exception() {
    let mut engine = Engine::new(EngineOptions::default());
    engine.register_function("fail", rethrow);

    let first = cases::run_on(
        &mut engine,
        native_throw,
        DispatchMode::Threaded,
        true,
        &[Value::string("first")],
    );
    assert!(matches!(first, Err(Error::UncaughtException { .. })));

    let second = cases::run_on(&mut engine, restore_temp, DispatchMode::Threaded, true, &[]);
    assert_eq!(second.unwrap(), Value::Number(1.0));
}
