//! Module for the `validate` command, the heart of a triage run.
//!
//! Model stages read the articles a batch was generated from and the raw model response,
//! normalize the response, split it, and merge the accepted responses onto the articles. Record
//! stages validate the article file on its own. Either way the outcome lands in the stage's
//! pass/fail files; a `--strict` retry adds to the first attempt's pass file rather than
//! replacing it.

use std::io::Read;

use serde::Serialize;
use triage::{
  database::{InsertArticles, RecordDecisions},
  output::{write_retry, Written},
  split::{process_records, process_response, ErrorPolicy, Split},
};

use super::*;

/// Options for [`Commands::Validate`].
#[derive(Args, Clone)]
pub struct ValidateOptions {
  /// Stage to validate: metadata, screening, priority, import or export
  pub stage:    Stage,
  /// Articles of the batch, or the records themselves for import and export
  #[arg(long)]
  pub articles: PathBuf,
  /// Raw model response; read from stdin when omitted
  #[arg(long)]
  pub response: Option<PathBuf>,
  /// Final attempt: abort on the first unusable item instead of quarantining it
  #[arg(long)]
  pub strict:   bool,
  /// Directory for the pass/fail files, overriding the configured one
  #[arg(long)]
  pub out_dir:  Option<PathBuf>,
  /// Write accepted import/export records to the article store
  #[arg(long)]
  pub store:    bool,
}

/// Reads the raw model response from `path`, or stdin.
fn read_response(path: Option<&Path>) -> Result<String> {
  match path {
    Some(path) => Ok(fs::read_to_string(path)?),
    None => {
      let mut raw = String::new();
      std::io::stdin().read_to_string(&mut raw)?;
      Ok(raw)
    },
  }
}

/// Writes a split the way its attempt calls for.
fn write_attempt<T: Serialize>(dir: &Path, split: &Split<T>, policy: ErrorPolicy) -> Result<Written> {
  let written = match policy {
    ErrorPolicy::Lenient => write_split(dir, split)?,
    ErrorPolicy::Strict => write_retry(dir, split)?,
  };
  Ok(written)
}

/// Function for the [`Commands::Validate`] in the CLI.
pub fn validate(cli: &Cli, config: &Config, options: ValidateOptions) -> Result<()> {
  let ValidateOptions { stage, articles, response, strict, out_dir, store } = options;
  let policy = ErrorPolicy::from_strict(strict);
  let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());
  let items: Vec<Item> = read_items(&articles)?;
  debug!(%stage, ?policy, items = items.len(), "Validating batch");

  if stage.is_response() {
    if store {
      return Err(TriagedError::Usage(format!("--store only applies to import and export, not {stage}")));
    }
    let raw = read_response(response.as_deref())?;
    let merged = process_response(stage, items, &raw, policy)?;
    let written = write_attempt(&out_dir, &merged, policy)?;
    return cli.reply(ResponseContent::Split {
      stage,
      accepted: merged.accepted.len(),
      rejected: merged.rejected.len(),
      written: &written,
    });
  }

  if response.is_some() {
    cli.reply(ResponseContent::Warning(&format!("{stage} validates records only, ignoring --response")))?;
  }
  let records = process_records(stage, items, policy)?;
  let written = write_attempt(&out_dir, &records, policy)?;
  cli.reply(ResponseContent::Split {
    stage,
    accepted: records.accepted.len(),
    rejected: records.rejected.len(),
    written: &written,
  })?;

  if store {
    let mut db = Database::open(&config.database_path)?;
    let articles = records.articles();
    let message = match stage {
      Stage::Import => format!("Stored {} new articles", InsertArticles::new(articles).execute(&mut db)?),
      _ => format!("Recorded decisions for {} articles", RecordDecisions::new(articles).execute(&mut db)?),
    };
    cli.reply(ResponseContent::Success(&message))?;
  }
  Ok(())
}
