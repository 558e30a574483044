//! Feed sources articles are fetched from.

use super::*;

/// A feed the fetch stage polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  /// Journal name, unique
  pub name:         String,
  /// RSS/Atom feed URL
  pub feed_url:     String,
  /// Articles published before this date have been seen
  pub last_checked: NaiveDate,
}

impl Source {
  /// Parses a `name<TAB>feed_url` listing, one source per line, stamping every source with
  /// `cutoff`. Blank lines are skipped.
  ///
  /// # Errors
  ///
  /// Returns [`TriageError::Config`] naming the first line that does not have exactly two
  /// non-empty columns.
  pub fn parse_tsv(listing: &str, cutoff: NaiveDate) -> Result<Vec<Self>> {
    listing
      .lines()
      .enumerate()
      .filter(|(_, line)| !line.trim().is_empty())
      .map(|(number, line)| {
        let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
        match columns.as_slice() {
          [name, feed_url] if !name.is_empty() && !feed_url.is_empty() => Ok(Self {
            name:         (*name).to_owned(),
            feed_url:     (*feed_url).to_owned(),
            last_checked: cutoff,
          }),
          _ => Err(TriageError::Config(format!(
            "source line {} must be `name<TAB>feed_url`: {line:?}",
            number + 1
          ))),
        }
      })
      .collect()
  }
}

/// Registers feed sources; sources already registered keep their state.
pub struct RegisterSources {
  /// Sources to register
  sources: Vec<Source>,
}

impl RegisterSources {
  /// Creates a registration for `sources`.
  pub fn new(sources: Vec<Source>) -> Self { Self { sources } }
}

impl DatabaseInstruction for RegisterSources {
  /// Number of newly registered sources
  type Output = usize;

  fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let tx = db.conn.transaction()?;
    let registered = {
      let mut stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO sources (name, feed_url, last_checked) VALUES (?1, ?2, ?3)",
      )?;
      let mut registered = 0;
      for source in &self.sources {
        registered += stmt.execute(params![source.name, source.feed_url, source.last_checked])?;
      }
      registered
    };
    tx.commit()?;
    debug!(registered, "Registered sources");
    Ok(registered)
  }
}

/// Lists registered sources by name.
pub struct ListSources;

impl DatabaseInstruction for ListSources {
  type Output = Vec<Source>;

  fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let mut stmt =
      db.conn.prepare_cached("SELECT name, feed_url, last_checked FROM sources ORDER BY name")?;
    let sources = stmt
      .query_map([], |row| {
        Ok(Source { name: row.get(0)?, feed_url: row.get(1)?, last_checked: row.get(2)? })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sources)
  }
}
