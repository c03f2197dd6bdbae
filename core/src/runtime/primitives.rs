//! Property access primitives shared by the load/store, call, delete and
//! in-place instructions.

use alloc::rc::Rc;

use crate::api::Engine;
use crate::format;
use crate::runtime::Throw;
use crate::runtime::object::{ForeachIterator, ObjectKind, ObjectRef, array_index};
use crate::runtime::operators::to_string;
use crate::runtime::value::Value;
use crate::vec;

fn cannot(engine: &mut Engine, action: &str, name: &str, base: &Value) -> Throw {
    engine.throw_type_error(&format!(
        "Cannot {} property '{}' of {}",
        action,
        name,
        to_string(base)
    ))
}

pub fn get_property(engine: &mut Engine, base: &Value, name: &str) -> Result<Value, Throw> {
    match base {
        Value::Undefined | Value::Null => Err(cannot(engine, "read", name, base)),
        Value::Object(object) => Ok(object.get(name).unwrap_or_default()),
        Value::String(s) => Ok(match name {
            "length" => Value::Number(s.chars().count() as f64),
            _ => match array_index(name).and_then(|i| s.chars().nth(i)) {
                Some(c) => {
                    let mut buf = [0; 4];
                    Value::string(c.encode_utf8(&mut buf))
                }
                None => Value::Undefined,
            },
        }),
        Value::Boolean(_) | Value::Number(_) => Ok(Value::Undefined),
    }
}

/// Stores on primitives are silently dropped.
pub fn set_property(engine: &mut Engine, base: &Value, name: &str, value: Value) -> Result<(), Throw> {
    match base {
        Value::Undefined | Value::Null => Err(cannot(engine, "set", name, base)),
        Value::Object(object) => {
            object.put(name, value);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Whole non-negative numbers address array slots directly.
fn element_index(index: &Value) -> Option<usize> {
    match index {
        Value::Number(n) if *n >= 0.0 && *n == (*n as u32) as f64 => Some(*n as usize),
        _ => None,
    }
}

pub fn get_element(engine: &mut Engine, base: &Value, index: &Value) -> Result<Value, Throw> {
    if let (Value::Object(object), Some(i)) = (base, element_index(index)) {
        if matches!(object.borrow().kind(), ObjectKind::Array(_)) {
            return Ok(object.borrow().get_index(i).unwrap_or_default());
        }
    }
    get_property(engine, base, &to_string(index))
}

pub fn set_element(engine: &mut Engine, base: &Value, index: &Value, value: Value) -> Result<(), Throw> {
    if let (Value::Object(object), Some(i)) = (base, element_index(index)) {
        if matches!(object.borrow().kind(), ObjectKind::Array(_)) {
            object.borrow_mut().set_index(i, value);
            return Ok(());
        }
    }
    set_property(engine, base, &to_string(index), value)
}

pub fn delete_property(engine: &mut Engine, base: &Value, name: &str) -> Result<Value, Throw> {
    match base {
        Value::Undefined | Value::Null => Err(cannot(engine, "delete", name, base)),
        Value::Object(object) => Ok(Value::Boolean(object.borrow_mut().delete(name))),
        _ => Ok(Value::Boolean(true)),
    }
}

pub fn delete_element(engine: &mut Engine, base: &Value, index: &Value) -> Result<Value, Throw> {
    if let (Value::Object(object), Some(i)) = (base, element_index(index)) {
        if matches!(object.borrow().kind(), ObjectKind::Array(_)) {
            return Ok(Value::Boolean(object.borrow_mut().delete_index(i)));
        }
    }
    delete_property(engine, base, &to_string(index))
}

/// Defines an own property on an object literal under construction.
pub fn define_property(object: &Value, name: &str, value: Value) {
    if let Value::Object(object) = object {
        object.borrow_mut().define(name, value, true);
    }
}

pub fn define_array_property(object: &Value, index: usize, value: Value) {
    if let Value::Object(object) = object {
        object.borrow_mut().set_index(index, value);
    }
}

/// Snapshot of the enumerable keys of `value`. `null` and `undefined`
/// enumerate nothing.
pub fn foreach_iterator_object(value: &Value) -> Value {
    let keys = match value {
        Value::Object(object) => object.borrow().keys(),
        Value::String(s) => (0..s.chars().count())
            .map(|i| Rc::from(format!("{}", i).as_str()))
            .collect(),
        _ => vec![],
    };
    Value::Object(ObjectRef::new(ObjectKind::ForeachIterator(ForeachIterator::new(keys))))
}

/// Next key of a `for-in` iterator, or `null` when it is exhausted.
pub fn foreach_next_property_name(engine: &mut Engine, iterator: &Value) -> Result<Value, Throw> {
    if let Value::Object(object) = iterator {
        if let ObjectKind::ForeachIterator(it) = object.borrow_mut().kind_mut() {
            return Ok(it.next_key().map_or(Value::Null, Value::String));
        }
    }
    Err(engine.throw_type_error("value is not a for-in iterator"))
}
