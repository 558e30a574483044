//! Module for setting up a `triage` environment

use super::*;

/// Options for [`Commands::Init`].
#[derive(Args, Clone)]
pub struct InitOptions {
  /// Directory pass/fail files are written to
  #[arg(long)]
  pub output_dir:         Option<PathBuf>,
  /// Maximum number of articles per batch
  #[arg(long)]
  pub batch_size:         Option<usize>,
  /// Research-interest description handed to the screening and priority prompts
  #[arg(long)]
  pub research_interests: Option<PathBuf>,
}

/// Function for the [`Commands::Init`] in the CLI.
pub fn init(cli: &Cli, options: InitOptions) -> Result<()> {
  let InitOptions { output_dir, batch_size, research_interests } = options;
  let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

  if config_path.exists()
    && !cli.confirm(&format!(
      "Configuration already exists at {}, do you want to overwrite it?",
      config_path.display()
    ))?
  {
    cli.reply(ResponseContent::Info("Keeping the existing configuration, pass --config to write elsewhere"))?;
    return Ok(());
  }

  let mut config = Config::default();
  if let Some(path) = &cli.path {
    config = config.with_database_path(path);
  }
  if let Some(dir) = &output_dir {
    config = config.with_output_dir(dir);
  }
  if let Some(size) = batch_size {
    config = config.with_batch_size(size);
  }
  if let Some(path) = &research_interests {
    config = config.with_research_interests(path);
  }
  config.validate()?;

  config.save(&config_path)?;
  Database::open(&config.database_path)?;
  cli.reply(ResponseContent::Success(&format!(
    "Initialized triage with\nConfig path: {}\nDatabase path: {}\nOutput directory: {}",
    config_path.display(),
    config.database_path.display(),
    config.output_dir.display(),
  )))
}
