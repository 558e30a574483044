//! Error types for the triage library.
//!
//! Two of the variants carry the pipeline's own failure semantics:
//! - [`TriageError::MalformedResponse`]: raw model output that could not be parsed at all, which
//!   fails the whole batch because there is nothing to partition
//! - [`TriageError::Validation`]: an item that was rejected while running under
//!   [`ErrorPolicy::Strict`](crate::split::ErrorPolicy::Strict), which aborts the rest of the batch
//!
//! The remaining variants wrap storage, serialization and configuration failures.
//!
//! # Examples
//!
//! ```
//! use triage::{prelude::*, response::parse_response};
//!
//! match parse_response("the model had nothing useful to say") {
//!   Err(TriageError::MalformedResponse { reason }) => println!("retry the call: {reason}"),
//!   Err(e) => println!("Other error: {e}"),
//!   Ok(items) => println!("{} items", items.len()),
//! }
//! ```

use thiserror::Error;

use crate::{stage::Stage, validate::Rejection};

/// Error type alias used for the [`triage`](crate) crate.
pub type Result<T> = core::result::Result<T, TriageError>;

/// Errors that can occur when validating, storing or writing triage batches.
#[derive(Error, Debug)]
pub enum TriageError {
  /// The raw model response could not be parsed into an object or an array of objects.
  ///
  /// This occurs when:
  /// - The response is empty or pure prose
  /// - The JSON inside the code fence is broken
  /// - The top-level value is a scalar, or an array holds non-object elements
  ///
  /// This is always a whole-batch failure.
  #[error("malformed model response: {reason}")]
  MalformedResponse {
    /// What the normalizer found instead of a usable structure.
    reason: String,
  },

  /// An item was rejected while validating under the strict policy.
  ///
  /// The key identifies the offending item (its merge key, or its position in the batch when
  /// no key could be read) so the failure is traceable in logs.
  #[error("{stage} validation failed for {key}: {reason}")]
  Validation {
    /// The stage whose shape the item was validated against.
    stage:  Stage,
    /// Identifying key of the offending item.
    key:    String,
    /// Why the item was rejected.
    reason: Rejection,
  },

  /// The provided stage name is not one of `metadata`, `screening`, `priority`, `import` or
  /// `export`.
  #[error("Invalid stage \"{0}\", see `triage::stage::Stage`")]
  InvalidStage(String),

  /// Responses of this stage cannot be merged onto articles, or records of this stage were
  /// handed to the response pipeline.
  ///
  /// Record stages (`import`, `export`) validate articles directly, while model stages
  /// (`metadata`, `screening`, `priority`) need a batch of articles to attribute responses to.
  #[error("{0} items cannot be processed this way, see `triage::stage::Stage::is_response`")]
  NotMergeable(Stage),

  /// The provided priority is not one of `high`, `medium` or `low`.
  ///
  /// This typically occurs when reading a stored priority back out of the database.
  #[error("Invalid priority \"{0}\", see `triage::stage::Priority`")]
  InvalidPriority(String),

  /// A SQLite operation failed.
  ///
  /// This wraps errors from the `rusqlite` crate, covering:
  /// - SQL syntax errors
  /// - Constraint violations
  /// - Type conversion errors
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// A file system operation failed.
  ///
  /// This occurs when:
  /// - Creating the database or output directories fails
  /// - Reading/writing pass and fail files fails
  /// - Permission errors occur
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// Serializing or deserializing an interchange file failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// The configuration could not be serialized.
  #[error(transparent)]
  TomlSer(#[from] toml::ser::Error),

  /// The configuration holds an unusable value.
  #[error("{0}")]
  Config(String),
}

impl TriageError {
  /// Shorthand for a [`TriageError::MalformedResponse`].
  pub(crate) fn malformed(reason: impl Into<String>) -> Self {
    Self::MalformedResponse { reason: reason.into() }
  }
}
