//! Object model the VM calls into: values, heap objects, conversions,
//! operators and the property/call primitives behind each instruction.

mod object;
mod operators;
mod primitives;
mod value;

pub use object::{ForeachIterator, FunctionObject, NativeFn, Object, ObjectKind, ObjectRef, Property};
pub use operators::{
    BinaryOp, UnaryOp, binary, loose_equal, strict_equal, to_boolean, to_int32, to_number,
    to_primitive, to_string, to_uint32, unary,
};
pub use primitives::{
    define_array_property, define_property, delete_element, delete_property,
    foreach_iterator_object, foreach_next_property_name, get_element, get_property,
    set_element, set_property,
};
pub use value::{Value, number_to_string};

/// Marker for a pending script exception.
///
/// The thrown value itself is stored on the [`Engine`](crate::api::Engine)
/// (see `Engine::exception`); every fallible runtime operation returns
/// `Result<_, Throw>` and propagates with `?` until a frame with an
/// installed exception handler catches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throw;
