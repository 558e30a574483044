use super::*;

/// Records the pipeline's decisions on stored articles.
///
/// Only the values an article carries are written: a missing DOI, screening decision, priority
/// or access date leaves the stored value alone. Articles that are not stored are skipped.
pub struct RecordDecisions {
  /// Articles carrying decisions
  articles: Vec<Article>,
}

impl RecordDecisions {
  /// Creates an update from `articles`.
  pub fn new(articles: Vec<Article>) -> Self { Self { articles } }
}

impl DatabaseInstruction for RecordDecisions {
  /// Number of stored articles that were updated
  type Output = usize;

  fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let tx = db.conn.transaction()?;

    let updated = {
      let mut stmt = tx.prepare_cached(
        "UPDATE articles SET
                    doi = COALESCE(?2, doi),
                    screened = COALESCE(?3, screened),
                    priority = COALESCE(?4, priority),
                    access_date = COALESCE(?5, access_date)
                WHERE link = ?1",
      )?;

      let mut updated = 0;
      for article in &self.articles {
        let changed = stmt.execute(params![
          article.link,
          article.doi,
          article.screening_decision,
          article.priority_decision,
          article.access_date,
        ])?;
        if changed == 0 {
          warn!(link = %article.link, "Cannot record decisions for an article that is not stored");
        }
        updated += changed;
      }
      updated
    };

    tx.commit()?;
    debug!(updated, "Recorded decisions");
    Ok(updated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[traced_test]
  #[test]
  fn test_missing_article_is_skipped() {
    let mut db = Database::open_in_memory().unwrap();
    InsertArticles::new(vec![Article::new("https://journal.example/a1", "Stored")])
      .execute(&mut db)
      .unwrap();

    let mut stored = Article::new("https://journal.example/a1", "Stored");
    stored.priority_decision = Some(Priority::Low);
    let missing = Article::new("https://journal.example/a2", "Missing");

    assert_eq!(RecordDecisions::new(vec![stored, missing]).execute(&mut db).unwrap(), 1);
    assert!(logs_contain("not stored"));

    let row = ArticleByLink::new("https://journal.example/a1").execute(&mut db).unwrap().unwrap();
    assert_eq!(row.priority, Some(Priority::Low));
  }
}
