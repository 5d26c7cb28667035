use thiserror::Error;

/// Errors raised by an operator while it runs.
#[derive(Debug, Error)]
pub enum OperatorError {
  /// A positional argument was not supplied.
  #[error("missing argument {index} ({name})")]
  MissingArgument { index: usize, name: &'static str },

  /// A positional argument had the wrong shape or value.
  #[error("invalid argument {index} ({name}): {message}")]
  InvalidArgument {
    index: usize,
    name: &'static str,
    message: String,
  },

  /// Reading or writing external data failed.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Any other failure reported by the operator body.
  #[error("{0}")]
  Failed(String),
}

impl OperatorError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed(message.into())
  }
}

/// Errors that can occur while building an operator registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
  /// Two operators share a name.
  #[error("operator already registered: {name}")]
  Duplicate { name: String },
}
