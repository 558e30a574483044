use super::*;

pub mod batch;
pub mod collect;
pub mod enrich;
pub mod init;
pub mod model;
pub mod reference;
pub mod store;
pub mod validate;

pub use batch::{batch, BatchOptions};
pub use collect::{collect, CollectOptions};
pub use enrich::{enrich, EnrichOptions};
pub use init::{init, InitOptions};
pub use model::{model, ModelOptions};
pub use reference::{reference, ReferenceOptions};
pub use store::{store, StoreCommands};
pub use validate::{validate, ValidateOptions};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Write a configuration file and create the article store
  Init(InitOptions),

  /// Validate one stage's output into pass/fail files
  Validate(ValidateOptions),

  /// Split an article file into numbered batch files
  Batch(BatchOptions),

  /// Concatenate stage files matched by a glob pattern
  Collect(CollectOptions),

  /// Fill in authors, journal abbreviation, volume and issue from Crossref records
  Enrich(EnrichOptions),

  /// Maintain the article store
  Store {
    /// The store operation to run
    #[command(subcommand)]
    cmd: StoreCommands,
  },

  /// Turn exported articles into reference-manager items
  Reference(ReferenceOptions),

  /// Print the model configured for a stage and attempt
  Model(ModelOptions),
}

/// Writes `items` as a pretty JSON array, creating parent directories as needed.
pub fn write_json<T: serde::Serialize>(path: &Path, items: &T) -> Result<()> {
  if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }
  fs::write(path, serde_json::to_string_pretty(items)?)?;
  Ok(())
}

/// Reads articles out of a stage file, skipping items that are not articles.
pub fn read_articles(path: &Path) -> Result<Vec<(Item, Option<Article>)>> {
  Ok(
    read_items(path)?
      .into_iter()
      .map(|item| {
        let article = Article::from_item(&item)
          .map_err(|e| warn!(error = %e, "Skipping item that is not an article"))
          .ok();
        (item, article)
      })
      .collect(),
  )
}
