//! Read-side instructions.

use super::*;

/// An article row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArticle {
  /// Row id
  pub id:           i64,
  /// Identity key
  pub link:         String,
  /// Title
  pub title:        String,
  /// Journal or feed name
  pub journal_name: Option<String>,
  /// Summary
  pub summary:      Option<String>,
  /// Publication date
  pub date:         Option<NaiveDate>,
  /// DOI, once known
  pub doi:          Option<String>,
  /// Screening decision, once made
  pub screened:     Option<bool>,
  /// Priority, once assigned
  pub priority:     Option<Priority>,
  /// Date of the last export
  pub access_date:  Option<NaiveDate>,
}

/// Looks up one article by its link.
pub struct ArticleByLink<'a> {
  /// Link to look up
  link: &'a str,
}

impl<'a> ArticleByLink<'a> {
  /// Creates a lookup for `link`.
  pub fn new(link: &'a str) -> Self { Self { link } }
}

impl DatabaseInstruction for ArticleByLink<'_> {
  type Output = Option<StoredArticle>;

  fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let mut stmt = db.conn.prepare_cached(
      "SELECT id, link, title, journal_name, summary, date, doi, screened, priority, access_date
       FROM articles WHERE link = ?1",
    )?;
    let mut rows = stmt.query(params![self.link])?;
    let Some(row) = rows.next()? else {
      return Ok(None);
    };
    Ok(Some(StoredArticle {
      id:           row.get(0)?,
      link:         row.get(1)?,
      title:        row.get(2)?,
      journal_name: row.get(3)?,
      summary:      row.get(4)?,
      date:         row.get(5)?,
      doi:          row.get(6)?,
      screened:     row.get(7)?,
      priority:     row.get(8)?,
      access_date:  row.get(9)?,
    }))
  }
}

/// Filters a batch down to the articles that are not stored yet, keeping batch order.
///
/// Items without a readable `link` are kept; the import stage rejects them with a reason.
pub struct Unprocessed {
  /// Candidate articles
  articles: Vec<Item>,
}

impl Unprocessed {
  /// Creates a filter over `articles`.
  pub fn new(articles: Vec<Item>) -> Self { Self { articles } }
}

impl DatabaseInstruction for Unprocessed {
  type Output = Vec<Item>;

  fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let mut stmt = db.conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM articles WHERE link = ?1)")?;

    let mut fresh = Vec::with_capacity(self.articles.len());
    for article in &self.articles {
      let stored = match article::item_str(article, "link") {
        Some(link) => stmt.query_row(params![link], |row| row.get::<_, bool>(0))?,
        None => false,
      };
      if !stored {
        fresh.push(article.clone());
      }
    }

    debug!(fresh = fresh.len(), processed = self.articles.len() - fresh.len(), "Filtered batch");
    Ok(fresh)
  }
}
