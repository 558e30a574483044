use super::*;

/// Options for [`Commands::Collect`].
#[derive(Args, Clone)]
pub struct CollectOptions {
  /// Glob pattern of the files to concatenate, e.g. `runs/*/screening_pass.json`
  pub pattern: String,
  /// File to write the concatenated items to
  #[arg(long)]
  pub out:     PathBuf,
}

/// Function for the [`Commands::Collect`] in the CLI.
///
/// Files are read in path order, so collecting numbered batch outputs keeps batch order. The
/// output file itself is skipped if the pattern matches it.
pub fn collect(cli: &Cli, options: CollectOptions) -> Result<()> {
  let CollectOptions { pattern, out } = options;

  let mut paths = glob::glob(&pattern)?.collect::<std::result::Result<Vec<_>, _>>()?;
  paths.sort();
  paths.retain(|path| path != &out);

  let mut items = Vec::new();
  for path in &paths {
    let batch = read_items(path)?;
    debug!(path = %path.display(), items = batch.len(), "Collected file");
    items.extend(batch);
  }
  if paths.is_empty() {
    cli.reply(ResponseContent::Warning(&format!("No files match {pattern}")))?;
  }

  write_json(&out, &items)?;
  cli.reply(ResponseContent::Success(&format!(
    "Collected {} items from {} files into {}",
    items.len(),
    paths.len(),
    out.display()
  )))
}
