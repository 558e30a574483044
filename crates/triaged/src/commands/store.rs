//! Module for maintaining the article store.

use chrono::{Local, NaiveDate};
use triage::database::{InsertArticles, ListSources, RecordDecisions, RegisterSources, Source, Unprocessed};

use super::*;

/// Store operations
#[derive(Subcommand, Clone)]
pub enum StoreCommands {
  /// Store the articles of a file, skipping those already stored
  Insert {
    /// Article file
    #[arg(long)]
    articles: PathBuf,
  },

  /// Keep only the articles that are not stored yet
  Unprocessed {
    /// Candidate article file
    #[arg(long)]
    articles: PathBuf,
    /// Where to write the articles that still need processing
    #[arg(long)]
    out:      PathBuf,
  },

  /// Record screening, priority and DOI decisions of exported articles
  Record {
    /// Exported article file
    #[arg(long)]
    articles: PathBuf,
  },

  /// Register feed sources from a `name<TAB>feed_url` listing, or list them
  Sources {
    /// Listing to register; lists registered sources when omitted
    #[arg(long)]
    register: Option<PathBuf>,
    /// Articles published before this date count as seen (YYYY-MM-DD, default today)
    #[arg(long)]
    cutoff:   Option<NaiveDate>,
  },
}

/// Function for the [`Commands::Store`] in the CLI.
pub fn store(cli: &Cli, config: &Config, cmd: StoreCommands) -> Result<()> {
  let mut db = Database::open(&config.database_path)?;

  match cmd {
    StoreCommands::Insert { articles } => {
      let articles: Vec<Article> =
        read_articles(&articles)?.into_iter().filter_map(|(_, article)| article).collect();
      let total = articles.len();
      let inserted = InsertArticles::new(articles).execute(&mut db)?;
      cli.reply(ResponseContent::Success(&format!(
        "Stored {inserted} new articles, {} already stored",
        total - inserted
      )))
    },
    StoreCommands::Unprocessed { articles, out } => {
      let candidates = read_items(&articles)?;
      let total = candidates.len();
      let fresh = Unprocessed::new(candidates).execute(&mut db)?;
      write_json(&out, &fresh)?;
      cli.reply(ResponseContent::Success(&format!(
        "{} of {total} articles still need processing, written to {}",
        fresh.len(),
        out.display()
      )))
    },
    StoreCommands::Record { articles } => {
      let articles: Vec<Article> =
        read_articles(&articles)?.into_iter().filter_map(|(_, article)| article).collect();
      let updated = RecordDecisions::new(articles).execute(&mut db)?;
      cli.reply(ResponseContent::Success(&format!("Recorded decisions for {updated} articles")))
    },
    StoreCommands::Sources { register: Some(listing), cutoff } => {
      let cutoff = cutoff.unwrap_or_else(|| Local::now().date_naive());
      let sources = Source::parse_tsv(&fs::read_to_string(&listing)?, cutoff)?;
      let total = sources.len();
      let registered = RegisterSources::new(sources).execute(&mut db)?;
      cli.reply(ResponseContent::Success(&format!(
        "Registered {registered} new sources, {} already registered",
        total - registered
      )))
    },
    StoreCommands::Sources { register: None, .. } => {
      let sources = ListSources.execute(&mut db)?;
      if sources.is_empty() {
        return cli.reply(ResponseContent::Info("No sources registered"));
      }
      for source in sources {
        println!(
          "{} {}  {}  {}",
          style(ITEM_PREFIX).dim(),
          style(&source.name).bold(),
          source.feed_url,
          style(source.last_checked).dim()
        );
      }
      Ok(())
    },
  }
}
