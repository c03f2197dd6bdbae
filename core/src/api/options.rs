//! Configuration options for the Moth engine.

use crate::instruction::DispatchMode;

/// Configuration options for compilation.
///
/// These options control instruction selection.
///
/// # Example
///
/// ```
/// use moth_core::api::CompilationOptions;
/// use moth_core::instruction::DispatchMode;
///
/// let options = CompilationOptions {
///     dispatch: DispatchMode::Threaded,
///     ..CompilationOptions::default()
/// };
/// assert!(options.compress_temps);
/// ```
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    /// What the instruction header stores, and so how the VM dispatches.
    ///
    /// Default: `DispatchMode::Switch`
    pub dispatch: DispatchMode,

    /// Renumber temps by liveness before selection to shrink frames.
    ///
    /// Default: true
    pub compress_temps: bool,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::default(),
            compress_temps: true,
        }
    }
}

/// Configuration options for script execution.
///
/// # Example
///
/// ```
/// use moth_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions { max_call_depth: 200 };
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum number of nested script calls. Exceeding it throws a
    /// catchable `RangeError`.
    ///
    /// Default: 1000
    pub max_call_depth: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
        }
    }
}

/// Configuration options for the Moth engine.
///
/// These options set the defaults for compilation and execution.
///
/// # Example
///
/// ```
/// use moth_core::api::{EngineOptions, CompilationOptions, ExecutionOptions};
///
/// let options = EngineOptions {
///     default_compilation_options: CompilationOptions::default(),
///     default_execution_options: ExecutionOptions { max_call_depth: 64 },
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Default options for compilation.
    ///
    /// These can be overridden when calling `Engine::compile_with()`.
    pub default_compilation_options: CompilationOptions,

    /// Default options for execution.
    pub default_execution_options: ExecutionOptions,
}
