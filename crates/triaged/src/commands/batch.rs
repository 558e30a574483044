use super::*;

/// Options for [`Commands::Batch`].
#[derive(Args, Clone)]
pub struct BatchOptions {
  /// Article file to split
  #[arg(long)]
  pub articles: PathBuf,
  /// Articles per batch, overriding the configured batch size
  #[arg(long)]
  pub size:     Option<usize>,
  /// Directory for the batch files, overriding the configured output directory
  #[arg(long)]
  pub out_dir:  Option<PathBuf>,
}

/// Name of the `index`-th batch file, counting from 1.
pub fn batch_file(index: usize) -> String { format!("batch_{index:03}.json") }

/// Function for the [`Commands::Batch`] in the CLI.
///
/// Writes `batch_001.json`, `batch_002.json`, ... each holding at most `size` articles, in input
/// order. An empty article file produces no batches.
pub fn batch(cli: &Cli, config: &Config, options: BatchOptions) -> Result<()> {
  let BatchOptions { articles, size, out_dir } = options;
  let size = size.unwrap_or(config.batch_size);
  if size == 0 {
    return Err(TriagedError::Usage("--size must be at least 1".to_string()));
  }
  let out_dir = out_dir.unwrap_or_else(|| config.output_dir.clone());

  let items = read_items(&articles)?;
  let batches: Vec<&[Item]> = items.chunks(size).collect();
  for (i, chunk) in batches.iter().enumerate() {
    let path = out_dir.join(batch_file(i + 1));
    trace!(path = %path.display(), items = chunk.len(), "Writing batch");
    write_json(&path, chunk)?;
  }

  cli.reply(ResponseContent::Success(&format!(
    "Split {} articles into {} batches of up to {size} in {}",
    items.len(),
    batches.len(),
    out_dir.display()
  )))
}
