//! The [`Article`] record and the generic [`Item`] mapping that flows between pipeline stages.
//!
//! Upstream processes (feed fetching, model calls) hand the core loosely typed JSON mappings.
//! Those mappings stay [`Item`]s while they are being validated and merged, and become typed
//! [`Article`]s once a record stage (`import` or `export`) has accepted them.
//!
//! # Examples
//!
//! ```
//! use triage::article::{parse_publication_date, Article};
//!
//! let mut article = Article::new("https://journal.example/a1", "Protein folding at scale");
//! article.date = Some(parse_publication_date("2024-03").unwrap());
//! assert_eq!(article.date.unwrap().to_string(), "2024-03-01");
//! ```

use super::*;

/// A loosely typed record: one JSON object from an upstream file or a model response.
pub type Item = BTreeMap<String, Value>;

/// The unit flowing through the triage pipeline.
///
/// The identity key is [`link`](Article::link), which never changes once set. The
/// [`doi`](Article::doi) is a secondary identifier that is usually filled in by the metadata
/// stage. Stage decisions are attached as the article progresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Article {
  /// Landing page of the article, unique across the corpus
  pub link:                String,
  /// Title as published
  pub title:               String,
  /// Free-text summary or abstract, possibly empty
  #[serde(default)]
  pub summary:             Option<String>,
  /// Name of the journal or feed the article came from
  #[serde(default)]
  pub journal_name:        Option<String>,
  /// Publication date
  #[serde(default)]
  pub date:                Option<NaiveDate>,
  /// Digital Object Identifier
  #[serde(default)]
  pub doi:                 Option<String>,
  /// Ordered author list; `None` means no author information
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub authors:             Option<Vec<Author>>,
  /// Abbreviated journal title
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub journal_short_name:  Option<String>,
  /// Journal volume
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub volume:              Option<String>,
  /// Journal issue
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub issue:               Option<String>,
  /// Language of the article text
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language:            Option<String>,
  /// Raw feed entry the article was built from
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub raw_contents:        Option<String>,
  /// Whether the screening stage kept the article
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub screening_decision:  Option<bool>,
  /// Model reasoning behind the screening decision
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub screening_reasoning: Option<String>,
  /// Priority assigned by the priority stage
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority_decision:   Option<Priority>,
  /// Model reasoning behind the priority decision
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub priority_reasoning:  Option<String>,
  /// Date the article was last exported
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub access_date:         Option<NaiveDate>,
}

impl Article {
  /// Creates an article with only its identity and title set.
  pub fn new(link: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      link:                link.into(),
      title:               title.into(),
      summary:             None,
      journal_name:        None,
      date:                None,
      doi:                 None,
      authors:             None,
      journal_short_name:  None,
      volume:              None,
      issue:               None,
      language:            None,
      raw_contents:        None,
      screening_decision:  None,
      screening_reasoning: None,
      priority_decision:   None,
      priority_reasoning:  None,
      access_date:         None,
    }
  }

  /// Reads an article out of a pipeline item, such as an entry of a stage's pass file.
  ///
  /// A `metadata_doi` attached by the metadata stage stands in for a missing `doi`.
  pub fn from_item(item: &Item) -> Result<Self> {
    let mut article: Self = serde_json::from_value(serde_json::to_value(item)?)?;
    if article.doi.is_none() {
      article.doi = item_str(item, "metadata_doi").map(str::to_owned);
    }
    Ok(article)
  }

  /// Converts the article back into a generic [`Item`].
  pub fn to_item(&self) -> Result<Item> {
    Ok(serde_json::from_value(serde_json::to_value(self)?)?)
  }
}

/// Reads a string field from an item, trimming whitespace and treating the `NULL` sentinel and
/// empty strings as absent.
pub fn item_str<'a>(item: &'a Item, field: &str) -> Option<&'a str> {
  match item.get(field) {
    Some(Value::String(s)) => {
      let s = s.trim();
      (!s.is_empty() && s != validate::NULL_SENTINEL).then_some(s)
    },
    _ => None,
  }
}

/// Parses a publication date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM` (the day defaults to `01`) and RFC 3339 timestamps (the
/// date part is kept).
pub fn parse_publication_date(input: &str) -> Option<NaiveDate> {
  let input = input.trim();
  if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
    return Some(date);
  }
  if let Ok(date) = NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d") {
    return Some(date);
  }
  DateTime::parse_from_rfc3339(input).ok().map(|timestamp| timestamp.date_naive())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_publication_date_formats() {
    let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    assert_eq!(parse_publication_date("2024-03-15"), Some(expected));
    assert_eq!(parse_publication_date(" 2024-03-15 "), Some(expected));
    assert_eq!(parse_publication_date("2024-03-15T09:30:00Z"), Some(expected));
    assert_eq!(parse_publication_date("2024-03"), NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(parse_publication_date("March 2024"), None);
    assert_eq!(parse_publication_date("2024-13"), None);
  }

  #[test]
  fn test_item_str_skips_sentinel_and_blank() {
    let item: Item = [
      ("doi".to_string(), json!("NULL")),
      ("title".to_string(), json!("  ")),
      ("link".to_string(), json!(" https://journal.example/a1 ")),
      ("volume".to_string(), json!(12)),
    ]
    .into_iter()
    .collect();

    assert_eq!(item_str(&item, "doi"), None);
    assert_eq!(item_str(&item, "title"), None);
    assert_eq!(item_str(&item, "link"), Some("https://journal.example/a1"));
    assert_eq!(item_str(&item, "volume"), None);
    assert_eq!(item_str(&item, "missing"), None);
  }

  #[test]
  fn test_article_item_conversion() {
    let mut article = Article::new("https://journal.example/a1", "Title");
    article.priority_decision = Some(Priority::High);
    let item = article.to_item().unwrap();

    assert_eq!(item["link"], json!("https://journal.example/a1"));
    assert_eq!(item["priority_decision"], json!("high"));
    assert_eq!(item["doi"], Value::Null);
    assert!(!item.contains_key("authors"));
  }

  #[test]
  fn test_article_from_pipeline_item() {
    let item: Item = serde_json::from_value(json!({
      "link": "https://journal.example/a1",
      "title": "Title",
      "metadata_doi": "10.1000/a1",
      "metadata_title": "Title",
      "screening_decision": true,
      "screening_reasoning": "Relevant",
    }))
    .unwrap();
    let article = Article::from_item(&item).unwrap();
    assert_eq!(article.doi.as_deref(), Some("10.1000/a1"));
    assert_eq!(article.screening_decision, Some(true));

    let no_title: Item = serde_json::from_value(json!({"link": "https://journal.example/a1"})).unwrap();
    assert!(matches!(Article::from_item(&no_title), Err(TriageError::Json(_))));
  }
}
