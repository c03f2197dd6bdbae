//! Identifier resolution along a scope chain.
//!
//! Each link is searched in turn:
//! - a `with` scope matches when its object has the property
//! - a `catch` scope matches its single bound name
//! - a call scope checks its locals, then its formals (the last formal
//!   with a given name wins), then its activation object
//! - the global scope checks the global object.

use alloc::rc::Rc;

use crate::api::Engine;
use crate::context::call_context::CallContext;
use crate::context::scope::{CatchScope, Scope};
use crate::format;
use crate::runtime::{ObjectRef, Throw, Value};

enum Binding {
    Local(Rc<CallContext>, usize),
    Argument(Rc<CallContext>, usize),
    Catch(Rc<CatchScope>),
    /// Property of a `with` object, an activation object or the global object.
    Property { object: ObjectRef, with: bool },
}

impl Binding {
    fn read(&self, name: &str) -> Value {
        match self {
            Binding::Local(context, index) => context.local(*index),
            Binding::Argument(context, index) => context.argument(*index),
            Binding::Catch(catch) => catch.value.borrow().clone(),
            Binding::Property { object, .. } => object.get(name).unwrap_or_default(),
        }
    }

    fn write(&self, name: &str, value: Value) {
        match self {
            Binding::Local(context, index) => context.set_local(*index, value),
            Binding::Argument(context, index) => context.set_argument(*index, value),
            Binding::Catch(catch) => *catch.value.borrow_mut() = value,
            Binding::Property { object, .. } => object.put(name, value),
        }
    }
}

fn find(scope: &Scope, name: &str) -> Option<Binding> {
    for link in scope.chain() {
        match link {
            Scope::With(with) => {
                if with.object.borrow().has_own(name) {
                    return Some(Binding::Property {
                        object: with.object.clone(),
                        with: true,
                    });
                }
            }
            Scope::Catch(catch) => {
                if &*catch.name == name {
                    return Some(Binding::Catch(catch.clone()));
                }
            }
            Scope::Call(context) => {
                if let Some(index) = context.local_index(name) {
                    return Some(Binding::Local(context.clone(), index));
                }
                if let Some(index) = context.formal_index(name) {
                    return Some(Binding::Argument(context.clone(), index));
                }
                if let Some(activation) = context.activation() {
                    if activation.borrow().has_own(name) {
                        return Some(Binding::Property {
                            object: activation,
                            with: false,
                        });
                    }
                }
            }
            Scope::Global(global) => {
                if global.borrow().has_own(name) {
                    return Some(Binding::Property {
                        object: global.clone(),
                        with: false,
                    });
                }
            }
        }
    }
    None
}

fn not_defined(engine: &mut Engine, name: &str) -> Throw {
    engine.throw_reference_error(&format!("{} is not defined", name))
}

/// Reads `name`, throwing a `ReferenceError` if nothing binds it.
pub fn get_binding(engine: &mut Engine, scope: &Scope, name: &str) -> Result<Value, Throw> {
    if name == "this" {
        return Ok(scope.this_value());
    }
    match find(scope, name) {
        Some(binding) => Ok(binding.read(name)),
        None => Err(not_defined(engine, name)),
    }
}

/// Like [`get_binding`], also returning the `this` value for a call through
/// the name: the `with` object when the name resolved inside one, otherwise
/// `undefined`.
pub fn get_binding_and_base(
    engine: &mut Engine,
    scope: &Scope,
    name: &str,
) -> Result<(Value, Value), Throw> {
    match find(scope, name) {
        Some(binding) => {
            let base = match &binding {
                Binding::Property { object, with: true } => Value::Object(object.clone()),
                _ => Value::Undefined,
            };
            Ok((binding.read(name), base))
        }
        None => Err(not_defined(engine, name)),
    }
}

/// Reads `name` without throwing; unresolved names are `None`.
pub fn lookup_binding(scope: &Scope, name: &str) -> Option<Value> {
    if name == "this" {
        return Some(scope.this_value());
    }
    find(scope, name).map(|b| b.read(name))
}

/// Assigns `name`. Unresolved names become global properties, except in
/// strict code where they throw a `ReferenceError`.
pub fn set_binding(engine: &mut Engine, scope: &Scope, name: &str, value: Value) -> Result<(), Throw> {
    match find(scope, name) {
        Some(binding) => binding.write(name, value),
        None if scope.is_strict() => return Err(not_defined(engine, name)),
        None => scope.global().put(name, value),
    }
    Ok(())
}

/// Declares `name` in the innermost function (or the global object at top
/// level). Existing bindings are left untouched.
pub fn create_mutable_binding(scope: &Scope, name: &str, deletable: bool) {
    let target = match scope.call_context() {
        Some(context) => {
            if context.local_index(name).is_some() || context.formal_index(name).is_some() {
                return;
            }
            context.activation_or_create()
        }
        None => scope.global().clone(),
    };
    let mut object = target.borrow_mut();
    if !object.has_own(name) {
        object.define(name, Value::Undefined, deletable);
    }
}

/// `delete name`. Declared locals and formals cannot be deleted. Names that
/// resolve nowhere report success, except in strict code where they throw a
/// `SyntaxError`.
pub fn delete_binding(engine: &mut Engine, scope: &Scope, name: &str) -> Result<bool, Throw> {
    match find(scope, name) {
        None if scope.is_strict() => {
            let message = format!("Can't delete property {}", name);
            Err(engine.throw_error("SyntaxError", &message))
        }
        None => Ok(true),
        Some(Binding::Local(..) | Binding::Argument(..) | Binding::Catch(_)) => Ok(false),
        Some(Binding::Property { object, .. }) => Ok(object.borrow_mut().delete(name)),
    }
}
