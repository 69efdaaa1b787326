//! Error types for the Courier framework.

use thiserror::Error;

pub use courier_core::BoxError;

/// Errors raised while turning a resolved argument into a handler parameter.
///
/// An argument that cannot be resolved at all is not an error: the binder
/// skips the call instead. These errors mean a value *was* resolved but could
/// not be used.
#[derive(Debug, Error)]
pub enum BindError {
    /// The resolved value has the wrong shape for the parameter.
    #[error("parameter '{param}' cannot be built from a {got} argument")]
    Mismatch {
        /// Parameter name.
        param: &'static str,
        /// Kind of the argument that was resolved.
        got: &'static str,
    },

    /// The resolved JSON value does not decode into the parameter type.
    #[error("parameter '{param}' does not decode: {source}")]
    Decode {
        /// Parameter name.
        param: &'static str,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// Fewer arguments were supplied than the handler declares.
    #[error("handler expects {expected} arguments, got {got}")]
    Arity {
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },
}

/// A handler, listener or middleware panicked while running.
#[derive(Debug, Error)]
#[error("handler panicked: {message}")]
pub struct HandlerPanic {
    /// The panic payload, when it was a string.
    pub message: String,
}

impl HandlerPanic {
    pub(crate) fn from_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&'static str>()
                .map_or_else(|| "non-string panic payload".to_owned(), |s| (*s).to_owned()),
        };
        Self { message }
    }
}

/// Result type for extraction.
pub type BindResult<T> = Result<T, BindError>;

/// Renders an error and its source chain on one line.
pub(crate) struct ErrorChain<'a>(pub &'a (dyn std::error::Error + 'static));

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}
