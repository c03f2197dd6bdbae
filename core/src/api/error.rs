//! Public error types for the Moth API.
//!
//! Inside the VM a pending exception is just the [`Throw`] marker plus the
//! value stored on the engine. At the API boundary the value is copied
//! into [`Error`] and stays readable through `Engine::exception` until a
//! later throw or exception handler replaces it.
//!
//! [`Throw`]: crate::runtime::Throw

use crate::String;
use crate::runtime::Value;

/// Public error type for all Moth operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A script exception no frame caught.
    #[error("Uncaught exception: {message}")]
    UncaughtException {
        /// The thrown value.
        value: Value,
        /// String conversion of the thrown value.
        message: String,
    },

    /// The value passed to `Engine::call` is not a function.
    #[error("Not callable: {0}")]
    NotCallable(String),
}

impl Error {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Error::UncaughtException { value, .. } => Some(value),
            Error::NotCallable(_) => None,
        }
    }
}
