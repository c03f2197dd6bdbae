use alloc::rc::Rc;

use smallvec::SmallVec;

use crate::api::{Engine, make_closure};
use crate::context::{self, CallContext, ExceptionHandler, Scope};
use crate::instruction::{DispatchMode, Instr, Opcode, Param, read_header};
use crate::runtime::{
    self, BinaryOp, Throw, Value, binary, to_boolean, to_number, unary,
};
use crate::vm::code::{Bytecode, CompiledFunction};
use crate::vm::dispatch;

pub(crate) enum Step {
    Next(usize),
    Return(Value),
}

/// Executes one activation of `context`'s function to completion.
///
/// A throw that no handler in this frame catches is returned as
/// `Err(Throw)`, with the thrown value left on the engine for the caller's
/// frame to pick up.
pub fn run(engine: &mut Engine, context: &Rc<CallContext>) -> Result<Value, Throw> {
    let function = context.function().clone();
    tracing::trace!(function = function.display_name(), "enter");
    if let Some(debugger) = engine.debugger.as_mut() {
        debugger.enter_function(context);
    }

    let result = {
        let mut interpreter = Interpreter {
            engine: &mut *engine,
            function: &function,
            context: context.clone(),
            scope: Scope::Call(context.clone()),
            local_count: function.locals.len() as i32,
        };
        match function.code.dispatch() {
            DispatchMode::Switch => interpreter.run_switch(),
            DispatchMode::Threaded => interpreter.run_threaded(),
        }
    };

    if let Some(debugger) = engine.debugger.as_mut() {
        debugger.leave_function(context);
    }
    tracing::trace!(function = function.display_name(), ok = result.is_ok(), "leave");
    result
}

pub(crate) struct Interpreter<'a> {
    engine: &'a mut Engine,
    function: &'a CompiledFunction,
    context: Rc<CallContext>,
    /// Current scope chain: the call scope plus any `with`/`catch` scopes
    /// pushed by this frame.
    scope: Scope,
    local_count: i32,
}

impl<'a> Interpreter<'a> {
    fn run_switch(&mut self) -> Result<Value, Throw> {
        let code = self.function.code.bytes();
        let mut ip = 0;
        loop {
            let header = read_header(&code[ip..]);
            let Some(opcode) = Opcode::from_tag(header) else {
                panic!("corrupted bytecode: unknown opcode {:#x} at {}", header, ip);
            };
            let instr = Instr::decode(opcode, &code[ip..]);
            ip = match self.execute(instr, ip, ip + opcode.size()) {
                Ok(Step::Next(next)) => next,
                Ok(Step::Return(value)) => return Ok(value),
                Err(Throw) => self.unwind()?,
            };
        }
    }

    fn run_threaded(&mut self) -> Result<Value, Throw> {
        let code = self.function.code.bytes();
        let mut ip = 0;
        loop {
            // SAFETY: `Bytecode::new` checked that every instruction header of
            // threaded code is a handler address and that every jump lands on
            // an instruction boundary, so `ip` always points at a header.
            let handler = unsafe { dispatch::handler_from_header(read_header(&code[ip..])) };
            ip = match handler(self, ip) {
                Ok(Step::Next(next)) => next,
                Ok(Step::Return(value)) => return Ok(value),
                Err(Throw) => self.unwind()?,
            };
        }
    }

    /// Transfers control to this frame's innermost exception handler, or
    /// propagates the throw when there is none.
    fn unwind(&mut self) -> Result<usize, Throw> {
        let Some(handler) = self.context.current_exception_handler() else {
            return Err(Throw);
        };
        tracing::trace!(resume = handler.resume_ip, "caught");
        self.context.restore_temps(&handler.temps);
        self.scope = handler.scope.clone();
        self.write(handler.result, Value::Boolean(true));
        Ok(handler.resume_ip)
    }

    #[inline(always)]
    pub(crate) fn execute_at(&mut self, opcode: Opcode, at: usize) -> Result<Step, Throw> {
        let code = self.function.code.bytes();
        let instr = Instr::decode(opcode, &code[at..]);
        self.execute(instr, at, at + opcode.size())
    }

    // Operand access.

    fn read(&self, param: Param) -> Value {
        match param {
            Param::Value(index) => self.function.constants[index as usize].clone(),
            Param::Temp(index) if index < 0 => self.context.argument((-index - 1) as usize),
            Param::Temp(index) if index < self.local_count => self.context.local(index as usize),
            Param::Temp(index) => self.context.temp((index - self.local_count) as usize),
        }
    }

    fn write(&self, param: Param, value: Value) {
        match param {
            Param::Value(_) => panic!("corrupted bytecode: result operand {:?} is a constant", param),
            Param::Temp(index) if index < 0 => self.context.set_argument((-index - 1) as usize, value),
            Param::Temp(index) if index < self.local_count => {
                self.context.set_local(index as usize, value)
            }
            Param::Temp(index) => self.context.set_temp((index - self.local_count) as usize, value),
        }
    }

    fn identifier(&self, index: u32) -> &'a str {
        let function: &'a CompiledFunction = self.function;
        &function.identifiers[index as usize]
    }

    fn arguments(&self, argc: u32, args: u32) -> SmallVec<[Value; 4]> {
        self.context.temp_range(args as usize, argc as usize)
    }

    /// Read-modify-write of a numeric slot for the post-increment and
    /// post-decrement builtins. Returns the old value as a number.
    fn post_update(
        &mut self,
        delta: f64,
        get: impl FnOnce(&mut Self) -> Result<Value, Throw>,
        set: impl FnOnce(&mut Self, Value) -> Result<(), Throw>,
    ) -> Result<Value, Throw> {
        let old = to_number(&get(self)?);
        set(self, Value::Number(old + delta))?;
        Ok(Value::Number(old))
    }

    fn inplace(
        &mut self,
        alu: BinaryOp,
        source: Param,
        get: impl FnOnce(&mut Self) -> Result<Value, Throw>,
        set: impl FnOnce(&mut Self, Value) -> Result<(), Throw>,
    ) -> Result<(), Throw> {
        let old = get(self)?;
        let rhs = self.read(source);
        let value = binary(self.engine, alu, &old, &rhs)?;
        set(self, value)
    }

    pub(crate) fn execute(&mut self, instr: Instr, at: usize, next: usize) -> Result<Step, Throw> {
        tracing::trace!(ip = at, ?instr, "execute");

        match instr {
            Instr::MoveTemp { source, result } => {
                let value = self.read(source);
                self.write(result, value);
            }
            Instr::LoadValue { value, result } => {
                let value = self.read(value);
                self.write(result, value);
            }
            Instr::LoadClosure { function, result } => {
                let compiled = self.function.closures[function as usize].clone();
                let closure = make_closure(compiled, self.scope.clone());
                self.write(result, closure);
            }
            Instr::LoadName { name, result } => {
                let name = self.identifier(name);
                let value = context::get_binding(self.engine, &self.scope, name)?;
                self.write(result, value);
            }
            Instr::StoreName { name, source } => {
                let name = self.identifier(name);
                let value = self.read(source);
                context::set_binding(self.engine, &self.scope, name, value)?;
            }
            Instr::LoadElement {
                base,
                index,
                result,
            } => {
                let (base, index) = (self.read(base), self.read(index));
                let value = runtime::get_element(self.engine, &base, &index)?;
                self.write(result, value);
            }
            Instr::StoreElement {
                base,
                index,
                source,
            } => {
                let (base, index, value) = (self.read(base), self.read(index), self.read(source));
                runtime::set_element(self.engine, &base, &index, value)?;
            }
            Instr::LoadProperty { base, name, result } => {
                let (base, name) = (self.read(base), self.identifier(name));
                let value = runtime::get_property(self.engine, &base, name)?;
                self.write(result, value);
            }
            Instr::StoreProperty { base, name, source } => {
                let (base, name, value) = (self.read(base), self.identifier(name), self.read(source));
                runtime::set_property(self.engine, &base, name, value)?;
            }
            Instr::Push { value } => {
                self.context.allocate_temps(value as usize);
            }

            // Calls.
            Instr::CallValue {
                dest,
                argc,
                args,
                result,
            } => {
                let callee = self.read(dest);
                let argv = self.arguments(argc, args);
                let value = self.engine.call_value(&callee, Value::Undefined, &argv)?;
                self.write(result, value);
            }
            Instr::CallProperty {
                base,
                name,
                argc,
                args,
                result,
            } => {
                let (base, name) = (self.read(base), self.identifier(name));
                let callee = runtime::get_property(self.engine, &base, name)?;
                let argv = self.arguments(argc, args);
                let value = self.engine.call_value(&callee, base, &argv)?;
                self.write(result, value);
            }
            Instr::CallElement {
                base,
                index,
                argc,
                args,
                result,
            } => {
                let (base, index) = (self.read(base), self.read(index));
                let callee = runtime::get_element(self.engine, &base, &index)?;
                let argv = self.arguments(argc, args);
                let value = self.engine.call_value(&callee, base, &argv)?;
                self.write(result, value);
            }
            Instr::CallActivationProperty {
                name,
                argc,
                args,
                result,
            } => {
                let name = self.identifier(name);
                let (callee, this) = context::get_binding_and_base(self.engine, &self.scope, name)?;
                let argv = self.arguments(argc, args);
                let value = self.engine.call_value(&callee, this, &argv)?;
                self.write(result, value);
            }

            // Exceptions.
            Instr::CallBuiltinThrow { arg } => {
                let value = self.read(arg);
                return Err(self.engine.throw(value));
            }
            Instr::CallBuiltinCreateExceptionHandler { result } => {
                self.engine.set_exception(Value::Undefined);
                self.write(result, Value::Boolean(false));
                self.context.push_exception_handler(ExceptionHandler {
                    resume_ip: next,
                    result,
                    scope: self.scope.clone(),
                    temps: self.context.snapshot_temps(),
                });
            }
            Instr::CallBuiltinDeleteExceptionHandler {} => {
                if self.context.pop_exception_handler().is_none() {
                    panic!("DeleteExceptionHandler at {} without an installed handler", at);
                }
            }
            Instr::CallBuiltinGetException { result } => {
                let exception = self.engine.exception().clone();
                self.write(result, exception);
            }

            // for-in.
            Instr::CallBuiltinForeachIteratorObject { arg, result } => {
                let iterator = runtime::foreach_iterator_object(&self.read(arg));
                self.write(result, iterator);
            }
            Instr::CallBuiltinForeachNextPropertyName { arg, result } => {
                let iterator = self.read(arg);
                let key = runtime::foreach_next_property_name(self.engine, &iterator)?;
                self.write(result, key);
            }

            // Scopes.
            Instr::CallBuiltinPushScope { arg } => {
                let object = match self.read(arg) {
                    Value::Object(object) => object,
                    Value::Undefined | Value::Null => {
                        return Err(self.engine.throw_type_error("Cannot use 'with' on null or undefined"));
                    }
                    _ => runtime::ObjectRef::plain(),
                };
                self.scope = self.scope.push_with(object);
            }
            Instr::CallBuiltinPushCatchScope { var_name } => {
                let name = self.function.identifiers[var_name as usize].clone();
                let exception = self.engine.exception().clone();
                self.scope = self.scope.push_catch(name, exception);
            }
            Instr::CallBuiltinPopScope {} => {
                self.scope = self.scope.pop();
            }

            // delete.
            Instr::CallBuiltinDeleteMember {
                base,
                member,
                result,
            } => {
                let (base, member) = (self.read(base), self.identifier(member));
                let deleted = runtime::delete_property(self.engine, &base, member)?;
                self.write(result, deleted);
            }
            Instr::CallBuiltinDeleteSubscript {
                base,
                index,
                result,
            } => {
                let (base, index) = (self.read(base), self.read(index));
                let deleted = runtime::delete_element(self.engine, &base, &index)?;
                self.write(result, deleted);
            }
            Instr::CallBuiltinDeleteName { name, result } => {
                let name = self.identifier(name);
                let deleted = context::delete_binding(self.engine, &self.scope, name)?;
                self.write(result, Value::Boolean(deleted));
            }

            // typeof.
            Instr::CallBuiltinTypeofMember {
                base,
                member,
                result,
            } => {
                let (base, member) = (self.read(base), self.identifier(member));
                let value = runtime::get_property(self.engine, &base, member)?;
                self.write(result, Value::string(value.type_of()));
            }
            Instr::CallBuiltinTypeofSubscript {
                base,
                index,
                result,
            } => {
                let (base, index) = (self.read(base), self.read(index));
                let value = runtime::get_element(self.engine, &base, &index)?;
                self.write(result, Value::string(value.type_of()));
            }
            Instr::CallBuiltinTypeofName { name, result } => {
                // Unresolvable names are "undefined" rather than a ReferenceError.
                let value = context::lookup_binding(&self.scope, self.identifier(name));
                self.write(result, Value::string(value.unwrap_or_default().type_of()));
            }
            Instr::CallBuiltinTypeofValue { value, result } => {
                let value = self.read(value);
                self.write(result, Value::string(value.type_of()));
            }

            // Post-increment and post-decrement.
            Instr::CallBuiltinPostIncMember {
                base,
                member,
                result,
            } => {
                let old = self.post_update_member(1.0, base, member)?;
                self.write(result, old);
            }
            Instr::CallBuiltinPostDecMember {
                base,
                member,
                result,
            } => {
                let old = self.post_update_member(-1.0, base, member)?;
                self.write(result, old);
            }
            Instr::CallBuiltinPostIncSubscript {
                base,
                index,
                result,
            } => {
                let old = self.post_update_subscript(1.0, base, index)?;
                self.write(result, old);
            }
            Instr::CallBuiltinPostDecSubscript {
                base,
                index,
                result,
            } => {
                let old = self.post_update_subscript(-1.0, base, index)?;
                self.write(result, old);
            }
            Instr::CallBuiltinPostIncName { name, result } => {
                let old = self.post_update_name(1.0, name)?;
                self.write(result, old);
            }
            Instr::CallBuiltinPostDecName { name, result } => {
                let old = self.post_update_name(-1.0, name)?;
                self.write(result, old);
            }
            Instr::CallBuiltinPostIncValue { value, result } => {
                let old = to_number(&self.read(value));
                self.write(value, Value::Number(old + 1.0));
                self.write(result, Value::Number(old));
            }
            Instr::CallBuiltinPostDecValue { value, result } => {
                let old = to_number(&self.read(value));
                self.write(value, Value::Number(old - 1.0));
                self.write(result, Value::Number(old));
            }

            // Declarations and literals.
            Instr::CallBuiltinDeclareVar {
                is_deletable,
                var_name,
            } => {
                context::create_mutable_binding(&self.scope, self.identifier(var_name), is_deletable);
            }
            Instr::CallBuiltinDefineProperty {
                object,
                name,
                value,
            } => {
                let (object, value) = (self.read(object), self.read(value));
                runtime::define_property(&object, self.identifier(name), value);
            }
            Instr::CallBuiltinDefineArrayProperty {
                object,
                index,
                value,
            } => {
                let (object, value) = (self.read(object), self.read(value));
                runtime::define_array_property(&object, index as usize, value);
            }

            // new.
            Instr::CreateValue {
                func,
                argc,
                args,
                result,
            } => {
                let callee = self.read(func);
                let argv = self.arguments(argc, args);
                let object = self.engine.construct(&callee, &argv)?;
                self.write(result, object);
            }
            Instr::CreateProperty {
                base,
                name,
                argc,
                args,
                result,
            } => {
                let (base, name) = (self.read(base), self.identifier(name));
                let callee = runtime::get_property(self.engine, &base, name)?;
                let argv = self.arguments(argc, args);
                let object = self.engine.construct(&callee, &argv)?;
                self.write(result, object);
            }
            Instr::CreateActivationProperty {
                name,
                argc,
                args,
                result,
            } => {
                let name = self.identifier(name);
                let callee = context::get_binding(self.engine, &self.scope, name)?;
                let argv = self.arguments(argc, args);
                let object = self.engine.construct(&callee, &argv)?;
                self.write(result, object);
            }

            // Control flow.
            Instr::Jump { offset } => {
                return Ok(Step::Next(Bytecode::jump_target(at, offset)));
            }
            Instr::CJump { offset, condition } => {
                if to_boolean(&self.read(condition)) {
                    return Ok(Step::Next(Bytecode::jump_target(at, offset)));
                }
            }
            Instr::Ret { result } => {
                return Ok(Step::Return(self.read(result)));
            }

            // Arithmetic.
            Instr::Unop {
                alu,
                source,
                result,
            } => {
                let value = unary(alu, &self.read(source));
                self.write(result, value);
            }
            Instr::Binop {
                alu,
                lhs,
                rhs,
                result,
            } => {
                let (lhs, rhs) = (self.read(lhs), self.read(rhs));
                let value = binary(self.engine, alu, &lhs, &rhs)?;
                self.write(result, value);
            }
            Instr::LoadThis { result } => {
                let this = self.scope.this_value();
                self.write(result, this);
            }
            Instr::InplaceElementOp {
                alu,
                base,
                index,
                source,
            } => {
                let (base, index) = (self.read(base), self.read(index));
                self.inplace(
                    alu,
                    source,
                    |vm| runtime::get_element(vm.engine, &base, &index),
                    |vm, value| runtime::set_element(vm.engine, &base, &index, value),
                )?;
            }
            Instr::InplaceMemberOp {
                alu,
                base,
                member,
                source,
            } => {
                let base = self.read(base);
                let member = self.identifier(member);
                self.inplace(
                    alu,
                    source,
                    |vm| runtime::get_property(vm.engine, &base, member),
                    |vm, value| runtime::set_property(vm.engine, &base, member, value),
                )?;
            }
            Instr::InplaceNameOp { alu, name, source } => {
                let name = self.identifier(name);
                self.inplace(
                    alu,
                    source,
                    |vm| context::get_binding(vm.engine, &vm.scope, name),
                    |vm, value| context::set_binding(vm.engine, &vm.scope, name, value),
                )?;
            }
        }

        Ok(Step::Next(next))
    }

    fn post_update_member(&mut self, delta: f64, base: Param, member: u32) -> Result<Value, Throw> {
        let base = self.read(base);
        let member = self.identifier(member);
        self.post_update(
            delta,
            |vm| runtime::get_property(vm.engine, &base, member),
            |vm, value| runtime::set_property(vm.engine, &base, member, value),
        )
    }

    fn post_update_subscript(&mut self, delta: f64, base: Param, index: Param) -> Result<Value, Throw> {
        let (base, index) = (self.read(base), self.read(index));
        self.post_update(
            delta,
            |vm| runtime::get_element(vm.engine, &base, &index),
            |vm, value| runtime::set_element(vm.engine, &base, &index, value),
        )
    }

    fn post_update_name(&mut self, delta: f64, name: u32) -> Result<Value, Throw> {
        let name = self.identifier(name);
        self.post_update(
            delta,
            |vm| context::get_binding(vm.engine, &vm.scope, name),
            |vm, value| context::set_binding(vm.engine, &vm.scope, name, value),
        )
    }
}
