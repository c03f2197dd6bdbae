//! The Moth execution engine.

use alloc::rc::{Rc, Weak};

use super::{CompilationOptions, EngineOptions, Error};
use crate::compiler;
use crate::context::{CallContext, Scope};
use crate::debugging::Debugger;
use crate::ir::Module;
use crate::runtime::{FunctionObject, NativeFn, ObjectKind, ObjectRef, Throw, Value, to_string};
use crate::vm::{self, CompiledFunction, CompiledModule};
use crate::{ToString, format};

/// Owns the global object, the pending exception and the optional debugger,
/// and drives compiled functions on the VM.
///
/// # Example
///
/// ```
/// use bumpalo::Bump;
/// use moth_core::api::{Engine, EngineOptions};
/// use moth_core::ir::{AluOp, FunctionBuilder, ModuleBuilder};
/// use moth_core::runtime::Value;
///
/// let arena = Bump::new();
/// let mut f = FunctionBuilder::new(&arena, Some("inc"), &["a"], &[]);
/// let entry = f.new_block();
/// let t = f.new_temp();
/// f.mov(entry, f.temp(t), f.binop(AluOp::Add, f.arg(0), f.number(1.0)));
/// f.ret(entry, f.temp(t));
/// let mut module = ModuleBuilder::new();
/// let root = module.add(f.build());
/// let module = module.finish(root);
///
/// let mut engine = Engine::new(EngineOptions::default());
/// let compiled = engine.compile(&module);
/// let result = engine.run(&compiled, &[Value::Number(41.0)]).unwrap();
/// assert_eq!(result, Value::Number(42.0));
/// ```
pub struct Engine {
    options: EngineOptions,
    global: ObjectRef,
    /// Value of the pending (or most recently caught) exception.
    exception: Value,
    pub(crate) debugger: Option<Debugger>,
    call_depth: usize,
    current_context: Option<Weak<CallContext>>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            global: ObjectRef::plain(),
            exception: Value::Undefined,
            debugger: None,
            call_depth: 0,
            current_context: None,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn global_object(&self) -> &ObjectRef {
        &self.global
    }

    pub fn global_scope(&self) -> Scope {
        Scope::Global(self.global.clone())
    }

    /// Installs a host function as a global.
    pub fn register_function(&mut self, name: &str, function: NativeFn) {
        let object = ObjectRef::native_function(name, function);
        self.global.put(name, Value::Object(object));
    }

    /// Compiles with the engine's default compilation options.
    pub fn compile(&self, module: &Module<'_>) -> CompiledModule {
        self.compile_with(module, &self.options.default_compilation_options)
    }

    /// Compiles an IR module. Temp compression rewrites temp indices inside
    /// `module` in place.
    pub fn compile_with(&self, module: &Module<'_>, options: &CompilationOptions) -> CompiledModule {
        compiler::compile_module(module, options)
    }

    /// Creates the root function of `module` as a closure over the global scope.
    pub fn instantiate(&self, module: &CompiledModule) -> Value {
        make_closure(module.root.clone(), self.global_scope())
    }

    /// Instantiates and calls the root function with the global object as
    /// `this`.
    pub fn run(&mut self, module: &CompiledModule, args: &[Value]) -> Result<Value, Error> {
        let function = self.instantiate(module);
        let this = Value::Object(self.global.clone());
        self.call(&function, this, args)
    }

    /// Calls a script or native function from the host.
    pub fn call(&mut self, function: &Value, this: Value, args: &[Value]) -> Result<Value, Error> {
        if function.as_object().and_then(ObjectRef::as_function).is_none() {
            return Err(Error::NotCallable(to_string(function).to_string()));
        }
        self.call_value(function, this, args).map_err(|Throw| {
            let value = self.exception.clone();
            let message = to_string(&value).to_string();
            tracing::debug!(%message, "uncaught exception");
            Error::UncaughtException { value, message }
        })
    }

    pub fn exception(&self) -> &Value {
        &self.exception
    }

    pub(crate) fn set_exception(&mut self, value: Value) {
        self.exception = value;
    }

    pub fn attach_debugger(&mut self, debugger: Debugger) {
        self.debugger = Some(debugger);
    }

    pub fn detach_debugger(&mut self) -> Option<Debugger> {
        self.debugger.take()
    }

    pub fn debugger(&self) -> Option<&Debugger> {
        self.debugger.as_ref()
    }

    /// Reports every value the engine keeps alive: globals, the pending
    /// exception and all values of the active call frames.
    pub fn mark_roots(&self, f: &mut dyn FnMut(&Value)) {
        self.global.borrow().mark(f);
        f(&self.exception);
        let mut context = self.current_context.as_ref().and_then(Weak::upgrade);
        while let Some(current) = context {
            current.mark(f);
            context = current.parent();
        }
    }

    // Throwing.

    /// Records `value` as the pending exception.
    pub fn throw(&mut self, value: Value) -> Throw {
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.about_to_throw(&value);
        }
        tracing::trace!(?value, "throw");
        self.exception = value;
        Throw
    }

    /// Throws a fresh error object with the given `name` and `message`.
    pub fn throw_error(&mut self, name: &str, message: &str) -> Throw {
        let error = ObjectRef::new(ObjectKind::Error);
        {
            let mut object = error.borrow_mut();
            object.define("name", Value::string(name), true);
            object.define("message", Value::string(message), true);
        }
        self.throw(Value::Object(error))
    }

    pub fn throw_type_error(&mut self, message: &str) -> Throw {
        self.throw_error("TypeError", message)
    }

    pub fn throw_reference_error(&mut self, message: &str) -> Throw {
        self.throw_error("ReferenceError", message)
    }

    pub fn throw_range_error(&mut self, message: &str) -> Throw {
        self.throw_error("RangeError", message)
    }

    // Calls.

    pub fn call_value(&mut self, callee: &Value, this: Value, args: &[Value]) -> Result<Value, Throw> {
        let Some(function) = callee.as_object().and_then(ObjectRef::as_function) else {
            let message = format!("{} is not a function", to_string(callee));
            return Err(self.throw_type_error(&message));
        };
        match function {
            FunctionObject::Native { function, .. } => function(self, &this, args),
            FunctionObject::Script { function, scope } => {
                self.call_script(&function, &scope, this, args)
            }
        }
    }

    /// `new callee(args)`: calls with a fresh object as `this` and returns
    /// it unless the call itself returned an object.
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> Result<Value, Throw> {
        let Some(constructor) = callee.as_object().filter(|o| o.as_function().is_some()) else {
            let message = format!("{} is not a constructor", to_string(callee));
            return Err(self.throw_type_error(&message));
        };
        let object = ObjectRef::plain();
        object.borrow_mut().set_constructor(constructor.clone());
        let result = self.call_value(callee, Value::Object(object.clone()), args)?;
        Ok(match result {
            Value::Object(_) => result,
            _ => Value::Object(object),
        })
    }

    fn call_script(
        &mut self,
        function: &Rc<CompiledFunction>,
        scope: &Scope,
        this: Value,
        args: &[Value],
    ) -> Result<Value, Throw> {
        if self.call_depth >= self.options.default_execution_options.max_call_depth {
            return Err(self.throw_range_error("Maximum call stack size exceeded"));
        }

        let context = CallContext::new(
            function.clone(),
            this,
            args,
            scope.clone(),
            self.current_context.clone(),
        );
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.about_to_call(function, &context);
        }

        self.call_depth += 1;
        let caller = self.current_context.replace(Rc::downgrade(&context));
        let result = vm::run(self, &context);
        self.current_context = caller;
        self.call_depth -= 1;

        if let Some(debugger) = self.debugger.as_mut() {
            debugger.just_left(&context);
        }
        context.release();
        result
    }
}

/// Creates a function object closed over `scope`.
pub fn make_closure(function: Rc<CompiledFunction>, scope: Scope) -> Value {
    Value::Object(ObjectRef::new(ObjectKind::Function(FunctionObject::Script {
        function,
        scope,
    })))
}
