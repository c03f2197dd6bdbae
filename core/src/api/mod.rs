//! Public API for the Moth bytecode VM.
//!
//! IR modules are compiled with [`Engine::compile`] and executed with
//! [`Engine::run`] or [`Engine::call`]. Script exceptions that escape the
//! outermost frame surface as [`Error::UncaughtException`].
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use moth_core::api::{Engine, EngineOptions};
//! use moth_core::ir::{FunctionBuilder, ModuleBuilder};
//! use moth_core::runtime::Value;
//!
//! let arena = Bump::new();
//! let mut f = FunctionBuilder::new(&arena, Some("answer"), &[], &[]);
//! let entry = f.new_block();
//! f.ret(entry, f.number(42.0));
//! let mut module = ModuleBuilder::new();
//! let root = module.add(f.build());
//!
//! let mut engine = Engine::new(EngineOptions::default());
//! let compiled = engine.compile(&module.finish(root));
//! assert_eq!(engine.run(&compiled, &[]).unwrap(), Value::Number(42.0));
//! ```

pub mod engine;
pub mod error;
pub mod options;

pub use engine::{Engine, make_closure};
pub use error::Error;
pub use options::{CompilationOptions, EngineOptions, ExecutionOptions};
