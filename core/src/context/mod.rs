//! Execution contexts: call frames, the scope chain and name resolution.

mod call_context;
mod resolve;
mod scope;


pub use call_context::{CallContext, ExceptionHandler};
pub use resolve::{
    create_mutable_binding, delete_binding, get_binding, get_binding_and_base, lookup_binding,
    set_binding,
};
pub use scope::{CatchScope, Scope, WithScope};
