//! The bytecode interpreter.
//!
//! [`run`] executes one call frame. Each script call gets its own
//! [`CallContext`](crate::context::CallContext); calls made by the
//! bytecode go back through the engine, which recurses into [`run`] for the
//! callee. Exceptions travel as `Err(Throw)`: a frame with an installed
//! handler resumes at it, any other frame returns the error to its caller.

mod code;
mod dispatch;
mod interpreter;


pub use code::{Bytecode, CompiledFunction, CompiledModule};
pub use interpreter::run;

pub(crate) use dispatch::handler_address;
