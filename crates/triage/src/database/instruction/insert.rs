use super::*;

/// Stores articles that are not stored yet.
///
/// Articles whose `link` is already present are skipped, so the same batch can be inserted any
/// number of times.
pub struct InsertArticles {
  /// Articles to store
  articles: Vec<Article>,
}

impl InsertArticles {
  /// Creates an insert for `articles`.
  pub fn new(articles: Vec<Article>) -> Self { Self { articles } }
}

impl DatabaseInstruction for InsertArticles {
  /// Number of rows actually inserted
  type Output = usize;

  fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let tx = db.conn.transaction()?;

    let inserted = {
      let mut stmt = tx.prepare_cached(
        "INSERT OR IGNORE INTO articles (
                    link, title, journal_name, summary, date,
                    doi, screened, priority, access_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      )?;

      let mut inserted = 0;
      for article in &self.articles {
        let changed = stmt.execute(params![
          article.link,
          article.title,
          article.journal_name,
          article.summary,
          article.date,
          article.doi,
          article.screening_decision,
          article.priority_decision,
          article.access_date,
        ])?;
        if changed == 0 {
          trace!(link = %article.link, "Article already stored");
        }
        inserted += changed;
      }
      inserted
    };

    tx.commit()?;
    debug!(inserted, skipped = self.articles.len() - inserted, "Inserted articles");
    Ok(inserted)
  }
}
