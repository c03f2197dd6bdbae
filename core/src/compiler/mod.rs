//! Instruction selection for IR modules.
//!
//! [`compile_module`] turns an [`ir::Module`](crate::ir::Module) into
//! [`CompiledModule`](crate::vm::CompiledModule): temps are optionally
//! compressed with [`compress_temps`], then every function is lowered to a
//! bytecode stream in the dispatch mode chosen by
//! [`CompilationOptions`](crate::api::CompilationOptions).

mod buffer;
mod compress_temps;
mod selector;

#[cfg(test)]
mod selector_test;

pub use buffer::CodeBuffer;
pub use compress_temps::compress_temps;
pub use selector::{compile_module, select_function, single_arg_fast_path};
