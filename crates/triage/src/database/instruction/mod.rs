use super::*;

pub mod insert;
pub mod query;
pub mod sources;
pub mod update;

use rusqlite::params;

pub use self::{insert::*, query::*, sources::*, update::*};

/// An operation against the article store.
pub trait DatabaseInstruction {
  /// What the operation yields
  type Output;

  /// Runs the operation.
  fn execute(&self, db: &mut Database) -> Result<Self::Output>;
}
