use thiserror::Error;

/// Failures surfaced to the host. Inside the evaluator errors are ordinary
/// values; they only become an `Error` at the library boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{}", .0.join("\n"))]
  Syntax(Vec<String>),
  #[error("{0}")]
  Runtime(String),
  #[error("{0}")]
  Conversion(String),
}

pub type Result<T> = std::result::Result<T, Error>;
