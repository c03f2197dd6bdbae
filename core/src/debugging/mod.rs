//! Debugger hooks and frame introspection.

mod debugger;


pub use debugger::{CallInfo, Debugger, FunctionState};
