use super::*;

/// Options for [`Commands::Reference`].
#[derive(Args, Clone)]
pub struct ReferenceOptions {
  /// Exported article file
  #[arg(long)]
  pub articles:   PathBuf,
  /// Collection key the items are filed under
  #[arg(long)]
  pub collection: Option<String>,
  /// Where to write the reference-manager items
  #[arg(long)]
  pub out:        PathBuf,
  /// Where to write the reasoning notes; defaults to `<out>_notes.json` next to `--out`
  #[arg(long)]
  pub notes:      Option<PathBuf>,
}

/// Default location of the notes file for an items file.
fn notes_path(out: &Path) -> PathBuf {
  let stem = out.file_stem().map_or_else(|| "reference".into(), |stem| stem.to_string_lossy());
  out.with_file_name(format!("{stem}_notes.json"))
}

/// Function for the [`Commands::Reference`] in the CLI.
pub fn reference(cli: &Cli, options: ReferenceOptions) -> Result<()> {
  let ReferenceOptions { articles, collection, out, notes } = options;
  let notes = notes.unwrap_or_else(|| notes_path(&out));

  let articles: Vec<Article> =
    read_articles(&articles)?.into_iter().filter_map(|(_, article)| article).collect();
  let items: Vec<ReferenceItem> = articles
    .iter()
    .map(|article| ReferenceItem::from_article(article, collection.as_deref()))
    .collect();
  let reasoning: Vec<ReferenceNote> = articles.iter().filter_map(ReferenceNote::from_article).collect();

  write_json(&out, &items)?;
  write_json(&notes, &reasoning)?;
  cli.reply(ResponseContent::Success(&format!(
    "Wrote {} reference items to {} and {} notes to {}",
    items.len(),
    out.display(),
    reasoning.len(),
    notes.display()
  )))
}
