use super::*;

/// Options for [`Commands::Enrich`].
#[derive(Args, Clone)]
pub struct EnrichOptions {
  /// Article file to enrich
  #[arg(long)]
  pub articles: PathBuf,
  /// Crossref work records, as an array or an object keyed by DOI
  #[arg(long)]
  pub crossref: PathBuf,
  /// Where to write the enriched articles; defaults to overwriting the article file
  #[arg(long)]
  pub out:      Option<PathBuf>,
}

/// Fields a Crossref record can fill in.
const ENRICHED_FIELDS: [&str; 4] = ["authors", "journal_short_name", "volume", "issue"];

/// Function for the [`Commands::Enrich`] in the CLI.
///
/// Items keep every field they had; only the enriched fields are added or replaced. Items
/// without a DOI or without a Crossref record pass through unchanged.
pub fn enrich(cli: &Cli, options: EnrichOptions) -> Result<()> {
  let EnrichOptions { articles, crossref, out } = options;
  let records: Value = serde_json::from_str(&fs::read_to_string(&crossref)?)?;
  let index = Enrichment::index_by_doi(&records);
  debug!(records = index.len(), "Indexed Crossref records");

  let mut enriched = 0;
  let mut items = Vec::new();
  for (mut item, article) in read_articles(&articles)? {
    let found = article.and_then(|article| {
      let doi = article.doi.as_deref()?.to_lowercase();
      index.get(&doi).map(|enrichment| (article, enrichment))
    });
    if let Some((mut article, enrichment)) = found {
      enrichment.apply(&mut article);
      let updated = article.to_item()?;
      for field in ENRICHED_FIELDS {
        if let Some(value) = updated.get(field) {
          item.insert(field.to_string(), value.clone());
        }
      }
      enriched += 1;
    }
    items.push(item);
  }

  let out = out.unwrap_or(articles);
  write_json(&out, &items)?;
  if enriched < items.len() {
    cli.reply(ResponseContent::Warning(&format!(
      "{} articles have no Crossref record",
      items.len() - enriched
    )))?;
  }
  cli.reply(ResponseContent::Success(&format!(
    "Enriched {enriched} of {} articles into {}",
    items.len(),
    out.display()
  )))
}
