//! Error types for the `triage` command line.

use thiserror::Error;
use triage::error::TriageError;

/// Error type alias used for the command line.
pub type Result<T> = core::result::Result<T, TriagedError>;

/// Errors that can end a command.
#[derive(Error, Debug)]
pub enum TriagedError {
  /// Validation, storage or configuration failed in the library.
  #[error(transparent)]
  Triage(#[from] TriageError),

  /// Reading input or writing output failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// An input or output file is not the JSON the command expects.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The pattern given to `collect` is not a valid glob.
  #[error(transparent)]
  Glob(#[from] glob::PatternError),

  /// A file matched by `collect` could not be read.
  #[error(transparent)]
  GlobEntry(#[from] glob::GlobError),

  /// The interactive prompt failed.
  #[error(transparent)]
  Dialog(#[from] dialoguer::Error),

  /// The arguments parse but cannot be acted on.
  #[error("{0}")]
  Usage(String),
}
