//! Validation and retry layer for LLM-driven literature triage.
//!
//! `triage` sits between every language-model call of a literature pipeline and the rest of
//! that pipeline. It decides item by item whether a model's structured output is usable,
//! quarantines the items that are not, and lets the caller re-run the quarantined items
//! through a second, strict attempt.
//!
//! # Features
//!
//! - **Response normalization**: strip prose and code fences from raw model output
//! - **Schema validation**: per-stage shapes with loose boolean, enum and `NULL` coercion
//! - **Pass/fail splitting**: complete, order-preserving partitions under an explicit
//!   [`ErrorPolicy`](split::ErrorPolicy)
//! - **Author normalization**: classify free-form author entries into people and institutions
//! - **Persistence**: idempotent article storage and deterministic pass/fail output files
//!
//! # Getting Started
//!
//! ```no_run
//! use triage::{
//!   article::Item,
//!   output::write_split,
//!   prelude::*,
//!   response::parse_response,
//!   split::{merge, split, ErrorPolicy},
//!   stage::Stage,
//!   validate::Validator,
//! };
//!
//! # fn example(articles: Vec<Item>, raw: &str) -> Result<()> {
//! let stage = Stage::Screening;
//! let responses = parse_response(raw)?;
//! let validator = Validator::for_batch(stage, &articles);
//!
//! // First attempt: quarantine anything unusable
//! let checked = split(responses, &validator, ErrorPolicy::Lenient)?;
//! let merged = merge(articles, &checked, ErrorPolicy::Lenient)?;
//! write_split(".", &merged)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`article`]: the [`Article`](article::Article) record and generic items
//! - [`author`]: author variants and the author normalizer
//! - [`stage`]: stage identifiers, field tables and typed stage records
//! - [`response`]: raw model output normalization
//! - [`validate`]: field coercion and the per-item validator
//! - [`split`]: pass/fail partitioning, error policy and merging
//! - [`output`]: pass/fail file writer
//! - [`enrich`]: bibliographic enrichment and reference-manager items
//! - [`database`]: the persistent article store
//! - [`config`]: user configuration for the command line
//! - [`prelude`]: common traits and types for ergonomic imports

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
};

use chrono::{DateTime, Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument, trace, warn};
use url::Url;
#[cfg(test)]
use {serde_json::json, tracing_test::traced_test};

pub mod article;
pub mod author;
pub mod config;
pub mod database;
pub mod enrich;
pub mod error;
pub mod output;
pub mod response;
pub mod split;
pub mod stage;
pub mod validate;

use crate::{
  article::{Article, Item},
  author::Author,
  error::*,
  stage::{Priority, Stage},
};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use triage::{database::Database, prelude::*};
///
/// fn example() -> Result<()> {
///   let mut db = Database::open(Database::default_path())?;
///   let stored = triage::database::Unprocessed::new(Vec::new()).execute(&mut db)?;
///   assert!(stored.is_empty());
///   Ok(())
/// }
/// ```
pub mod prelude {
  pub use crate::{
    database::DatabaseInstruction,
    error::{Result, TriageError},
    split::ErrorPolicy,
  };
}
