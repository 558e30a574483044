//! User configuration for the command line.
//!
//! The validation core never reads configuration: it receives a [`Stage`] and an
//! [`ErrorPolicy`](crate::split::ErrorPolicy) from its caller. This module holds the values the
//! caller resolves those from, plus the values the out-of-scope model calls need, stored as TOML.
//!
//! ```toml
//! database_path = "/home/me/.local/share/triage/triage.db"
//! output_dir = "."
//! batch_size = 10
//! research_interests_path = "/home/me/interests.md"
//!
//! [models]
//! metadata = "llama3.1:8b"
//! screening = "llama3.1:70b"
//! priority = "llama3.1:70b"
//! fallback = "qwen2.5:72b"
//! ```

use std::fs;

use super::*;

/// Default number of articles per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Model identifiers per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Models {
  /// Model for metadata extraction
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata:  Option<String>,
  /// Model for screening
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub screening: Option<String>,
  /// Model for prioritization
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority:  Option<String>,
  /// Model for the strict second attempt of any stage
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fallback:  Option<String>,
}

impl Models {
  /// The model configured for `stage` on the given attempt (1 or 2).
  ///
  /// The second attempt uses the fallback model when one is configured.
  pub fn for_stage(&self, stage: Stage, attempt: u8) -> Option<&str> {
    let primary = match stage {
      Stage::Metadata => self.metadata.as_deref(),
      Stage::Screening => self.screening.as_deref(),
      Stage::Priority => self.priority.as_deref(),
      Stage::Import | Stage::Export => return None,
    };
    if attempt > 1 {
      self.fallback.as_deref().or(primary)
    } else {
      primary
    }
  }
}

/// Persisted configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  /// Location of the article store
  #[serde(default = "Config::default_database_path")]
  pub database_path:           PathBuf,
  /// Directory pass/fail files are written to
  #[serde(default = "Config::default_output_dir")]
  pub output_dir:              PathBuf,
  /// Maximum number of articles per batch
  #[serde(default = "Config::default_batch_size")]
  pub batch_size:              usize,
  /// Research-interest description handed verbatim to the model prompt
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub research_interests_path: Option<PathBuf>,
  /// Model identifiers
  #[serde(default)]
  pub models:                  Models,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_path:           Self::default_database_path(),
      output_dir:              Self::default_output_dir(),
      batch_size:              DEFAULT_BATCH_SIZE,
      research_interests_path: None,
      models:                  Models::default(),
    }
  }
}

impl Config {
  /// Returns the default path of the configuration file.
  ///
  /// - On Unix: `~/.config/triage/config.toml`
  /// - On macOS: `~/Library/Application Support/triage/config.toml`
  /// - On Windows: `%APPDATA%\triage\config.toml`
  /// - Fallback: `./triage/config.toml`
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("triage").join("config.toml")
  }

  /// Default location of the article store, see [`Database::default_path`](crate::database::Database::default_path).
  fn default_database_path() -> PathBuf { database::Database::default_path() }

  /// Pass/fail files go to the working directory unless configured otherwise.
  fn default_output_dir() -> PathBuf { PathBuf::from(".") }

  /// Serde default for [`Config::batch_size`].
  fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }

  /// Sets the article store location.
  pub fn with_database_path(mut self, path: &Path) -> Self {
    self.database_path = path.to_path_buf();
    self
  }

  /// Sets the output directory.
  pub fn with_output_dir(mut self, path: &Path) -> Self {
    self.output_dir = path.to_path_buf();
    self
  }

  /// Sets the batch size.
  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size;
    self
  }

  /// Sets the research-interest description.
  pub fn with_research_interests(mut self, path: &Path) -> Self {
    self.research_interests_path = Some(path.to_path_buf());
    self
  }

  /// Sets the model identifiers.
  pub fn with_models(mut self, models: Models) -> Self {
    self.models = models;
    self
  }

  /// Checks the values that cannot be expressed in the types.
  pub fn validate(&self) -> Result<()> {
    if self.batch_size == 0 {
      return Err(TriageError::Config("batch_size must be at least 1".to_string()));
    }
    if let Some(path) = &self.research_interests_path {
      if !path.is_file() {
        return Err(TriageError::Config(format!(
          "research interests file {} does not exist",
          path.display()
        )));
      }
    }
    Ok(())
  }

  /// Loads and validates a configuration file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading configuration");
    let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
    config.validate()?;
    Ok(config)
  }

  /// Loads the configuration at `path`, falling back to defaults when the file does not exist.
  pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if path.exists() {
      Self::load(path)
    } else {
      trace!(path = %path.display(), "No configuration file, using defaults");
      Ok(Self::default())
    }
  }

  /// Writes the configuration, creating parent directories as needed.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(self)?)?;
    Ok(())
  }
}
