//! Conversions and the operators behind `Unop`, `Binop` and in-place
//! instructions.

use alloc::rc::Rc;

use crate::api::Engine;
use crate::runtime::Throw;
use crate::runtime::object::{ObjectKind, ObjectRef};
use crate::runtime::value::{Value, number_to_string};
use crate::{String, ToString, format};

macro_rules! tagged_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        $vis enum $name {
            $($variant),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub fn from_tag(tag: u8) -> Option<Self> {
                Self::ALL.get(tag as usize).copied()
            }

            pub fn tag(self) -> u8 {
                self as u8
            }
        }
    };
}

tagged_enum! {
    /// Binary operators with a dedicated runtime entry point.
    pub enum BinaryOp {
        BitAnd, BitOr, BitXor,
        Add, Sub, Mul, Div, Mod,
        LShift, RShift, URShift,
        Gt, Lt, Ge, Le,
        Equal, NotEqual, StrictEqual, StrictNotEqual,
        InstanceOf, In,
    }
}

tagged_enum! {
    pub enum UnaryOp {
        Not, UMinus, UPlus, Compl, Increment, Decrement,
    }
}

impl BinaryOp {
    /// Whether the operator may appear in an in-place assignment.
    pub fn is_compound_assignable(self) -> bool {
        !matches!(
            self,
            BinaryOp::Gt
                | BinaryOp::Lt
                | BinaryOp::Ge
                | BinaryOp::Le
                | BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::StrictEqual
                | BinaryOp::StrictNotEqual
                | BinaryOp::InstanceOf
                | BinaryOp::In
        )
    }
}

// Conversions.

pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !(n.is_nan() || *n == 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) => true,
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Object(_) => to_number(&to_primitive(value)),
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s.trim_start_matches(['+', '-']) {
        "Infinity" => return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY },
        // Rust also accepts spellings like "inf" and "nan" that scripts do not.
        rest if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => return f64::NAN,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Objects convert to their string form; there are no user `valueOf` hooks.
pub fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(o) => Value::String(object_to_string(o)),
        other => other.clone(),
    }
}

fn object_to_string(object: &ObjectRef) -> Rc<str> {
    let object = object.borrow();
    let text: String = match object.kind() {
        ObjectKind::Array(elements) => {
            let parts: crate::Vec<String> = elements
                .iter()
                .map(|e| match e {
                    Value::Undefined | Value::Null => String::new(),
                    other => to_string(other).to_string(),
                })
                .collect();
            parts.join(",")
        }
        ObjectKind::Function(f) => format!("function {}() {{ [code] }}", f.name().unwrap_or("")),
        ObjectKind::Error => {
            let name = object.get_own("name").map(|v| to_string(&v)).unwrap_or_else(|| "Error".into());
            match object.get_own("message").map(|v| to_string(&v)) {
                Some(message) if !message.is_empty() => format!("{}: {}", name, message),
                _ => name.to_string(),
            }
        }
        ObjectKind::Plain | ObjectKind::ForeachIterator(_) => "[object Object]".to_string(),
    };
    Rc::from(text)
}

pub fn to_string(value: &Value) -> Rc<str> {
    match value {
        Value::Undefined => "undefined".into(),
        Value::Null => "null".into(),
        Value::Boolean(true) => "true".into(),
        Value::Boolean(false) => "false".into(),
        Value::Number(n) => number_to_string(*n).into(),
        Value::String(s) => s.clone(),
        Value::Object(o) => object_to_string(o),
    }
}

pub fn to_int32(value: &Value) -> i32 {
    to_uint32(value) as i32
}

pub fn to_uint32(value: &Value) -> u32 {
    let n = to_number(value);
    if !n.is_finite() {
        return 0;
    }
    // `as` truncates toward zero and saturates; reduce modulo 2^32 first.
    let truncated = n % 4_294_967_296.0;
    (truncated as i64) as u32
}

// Equality and comparison.

pub fn strict_equal(left: &Value, right: &Value) -> bool {
    left == right
}

pub fn loose_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(left) == to_number(right)
        }
        (Value::Boolean(_), _) => loose_equal(&Value::Number(to_number(left)), right),
        (_, Value::Boolean(_)) => loose_equal(left, &Value::Number(to_number(right))),
        (Value::Object(_), Value::Number(_) | Value::String(_)) => {
            loose_equal(&to_primitive(left), right)
        }
        (Value::Number(_) | Value::String(_), Value::Object(_)) => {
            loose_equal(left, &to_primitive(right))
        }
        _ => strict_equal(left, right),
    }
}

/// `left < right`; `None` when either side is NaN.
fn less_than(left: &Value, right: &Value) -> Option<bool> {
    let left = to_primitive(left);
    let right = to_primitive(right);
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Some(a < b);
    }
    let (a, b) = (to_number(&left), to_number(&right));
    if a.is_nan() || b.is_nan() {
        None
    } else {
        Some(a < b)
    }
}

pub fn unary(op: UnaryOp, value: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Boolean(!to_boolean(value)),
        UnaryOp::UMinus => Value::Number(-to_number(value)),
        UnaryOp::UPlus => Value::Number(to_number(value)),
        UnaryOp::Compl => Value::Number(f64::from(!to_int32(value))),
        UnaryOp::Increment => Value::Number(to_number(value) + 1.0),
        UnaryOp::Decrement => Value::Number(to_number(value) - 1.0),
    }
}

pub fn binary(engine: &mut Engine, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, Throw> {
    let number = |f: fn(f64, f64) -> f64| Value::Number(f(to_number(left), to_number(right)));
    let int = |f: fn(i32, i32) -> i32| Value::Number(f64::from(f(to_int32(left), to_int32(right))));
    let shift = to_uint32(right) & 0x1f;

    Ok(match op {
        BinaryOp::BitAnd => int(|a, b| a & b),
        BinaryOp::BitOr => int(|a, b| a | b),
        BinaryOp::BitXor => int(|a, b| a ^ b),
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => number(|a, b| a - b),
        BinaryOp::Mul => number(|a, b| a * b),
        BinaryOp::Div => number(|a, b| a / b),
        BinaryOp::Mod => number(|a, b| a % b),
        BinaryOp::LShift => Value::Number(f64::from(to_int32(left).wrapping_shl(shift))),
        BinaryOp::RShift => Value::Number(f64::from(to_int32(left).wrapping_shr(shift))),
        BinaryOp::URShift => Value::Number(f64::from(to_uint32(left).wrapping_shr(shift))),
        BinaryOp::Lt => Value::Boolean(less_than(left, right).unwrap_or(false)),
        BinaryOp::Gt => Value::Boolean(less_than(right, left).unwrap_or(false)),
        BinaryOp::Le => Value::Boolean(less_than(right, left).is_some_and(|gt| !gt)),
        BinaryOp::Ge => Value::Boolean(less_than(left, right).is_some_and(|lt| !lt)),
        BinaryOp::Equal => Value::Boolean(loose_equal(left, right)),
        BinaryOp::NotEqual => Value::Boolean(!loose_equal(left, right)),
        BinaryOp::StrictEqual => Value::Boolean(strict_equal(left, right)),
        BinaryOp::StrictNotEqual => Value::Boolean(!strict_equal(left, right)),
        BinaryOp::InstanceOf => return instance_of(engine, left, right),
        BinaryOp::In => return has_property_in(engine, left, right),
    })
}

fn add(left: &Value, right: &Value) -> Value {
    if let (Value::Number(a), Value::Number(b)) = (left, right) {
        return Value::Number(a + b);
    }
    let left = to_primitive(left);
    let right = to_primitive(right);
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        let mut text = String::from(&*to_string(&left));
        text.push_str(&to_string(&right));
        Value::String(Rc::from(text))
    } else {
        Value::Number(to_number(&left) + to_number(&right))
    }
}

fn instance_of(engine: &mut Engine, left: &Value, right: &Value) -> Result<Value, Throw> {
    let Some(constructor) = right.as_object().filter(|o| o.as_function().is_some()) else {
        return Err(engine.throw_type_error("right-hand side of 'instanceof' is not callable"));
    };
    let result = match left {
        Value::Object(object) => object
            .borrow()
            .constructor()
            .is_some_and(|c| c.ptr_eq(constructor)),
        _ => false,
    };
    Ok(Value::Boolean(result))
}

fn has_property_in(engine: &mut Engine, left: &Value, right: &Value) -> Result<Value, Throw> {
    let Value::Object(object) = right else {
        return Err(engine.throw_type_error("cannot use 'in' operator on a non-object"));
    };
    let key = to_string(left);
    Ok(Value::Boolean(object.borrow().has_own(&key)))
}

#[cfg(test)]
#[path = "operators_test.rs"]
mod operators_test;
