use super::*;

/// Options for [`Commands::Model`].
#[derive(Args, Clone)]
pub struct ModelOptions {
  /// Stage the model call is for
  pub stage:   Stage,
  /// Attempt number; attempts after the first use the fallback model when one is configured
  #[arg(long, default_value_t = 1)]
  pub attempt: u8,
}

/// Function for the [`Commands::Model`] in the CLI.
///
/// Prints the bare identifier so scripts can capture it.
pub fn model(cli: &Cli, config: &Config, options: ModelOptions) -> Result<()> {
  let ModelOptions { stage, attempt } = options;
  if !stage.is_response() {
    return Err(TriagedError::Usage(format!("{stage} is not a model stage")));
  }
  match config.models.for_stage(stage, attempt) {
    Some(model) => {
      println!("{model}");
      Ok(())
    },
    None => {
      cli.reply(ResponseContent::Warning(&format!("No model configured for {stage}")))?;
      Err(TriagedError::Usage(format!("set `models.{stage}` in the configuration")))
    },
  }
}
