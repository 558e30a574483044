//! Prompts and styled replies.

use dialoguer::Confirm;
use triage::output::Written;

use super::*;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for warning messages
pub static WARNING_PREFIX: &str = "! ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for user prompts
pub static PROMPT_PREFIX: &str = "❯ ";
/// Branch of a file listing
pub static ITEM_PREFIX: &str = "├─";
/// Last branch of a file listing
pub static LAST_ITEM_PREFIX: &str = "└─";

/// Something to tell the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// The command did what it was asked
  Success(&'a str),
  /// Neutral information
  Info(&'a str),
  /// Something the user should look at
  Warning(&'a str),
  /// Outcome of validating one batch
  Split {
    /// Stage the batch was validated for
    stage:    Stage,
    /// Items in the pass file
    accepted: usize,
    /// Items in the fail file
    rejected: usize,
    /// Files that were written
    written:  &'a Written,
  },
}

/// How commands talk to the user.
pub trait UserInteraction {
  /// Asks a yes/no question.
  fn confirm(&self, message: &str) -> Result<bool>;
  /// Prints a message.
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

impl UserInteraction for Cli {
  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      return Ok(true);
    }
    let answer = Confirm::new()
      .with_prompt(format!("{}{message}", style(PROMPT_PREFIX).yellow()))
      .default(false)
      .interact()?;
    Ok(answer)
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Success(message) => println!("{} {message}", style(SUCCESS_PREFIX).green()),
      ResponseContent::Info(message) => println!("{} {message}", style(INFO_PREFIX).cyan()),
      ResponseContent::Warning(message) => println!("{} {message}", style(WARNING_PREFIX).yellow()),
      ResponseContent::Split { stage, accepted, rejected, written } => {
        let prefix =
          if rejected == 0 { style(SUCCESS_PREFIX).green() } else { style(WARNING_PREFIX).yellow() };
        println!(
          "{prefix} {}: {} accepted, {} rejected",
          style(stage).bold(),
          style(accepted).green(),
          style(rejected).red()
        );
        let files: Vec<&PathBuf> = written.pass.iter().chain(written.fail.iter()).collect();
        for (i, file) in files.iter().enumerate() {
          let branch = if i + 1 == files.len() { LAST_ITEM_PREFIX } else { ITEM_PREFIX };
          println!("   {} {}", style(branch).dim(), file.display());
        }
      },
    }
    Ok(())
  }
}
