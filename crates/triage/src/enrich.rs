//! Bibliographic enrichment and reference-manager items.
//!
//! After the model stages, articles with a DOI are enriched from Crossref work records: the
//! author list goes through the [author normalizer](crate::author), and the journal
//! abbreviation, volume and issue are copied over. Finished articles are then turned into the
//! journal-article payload a reference manager accepts, plus a child note with the model's
//! reasoning.
//!
//! Fetching the Crossref records and talking to the reference manager happen elsewhere; this
//! module only maps data.

use super::*;

/// Metadata taken from one Crossref work record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
  /// Normalized author list, `None` when the record has no usable authors
  pub authors:            Option<Vec<Author>>,
  /// Abbreviated journal title
  pub journal_short_name: Option<String>,
  /// Journal volume
  pub volume:             Option<String>,
  /// Journal issue
  pub issue:              Option<String>,
}

impl Enrichment {
  /// Reads a Crossref work record, either the bare `message` or the full API envelope.
  pub fn from_crossref(record: &Value) -> Self {
    let message = record.get("message").unwrap_or(record);
    let authors = match message.get("author") {
      Some(Value::Array(raw)) => author::normalize_authors(raw),
      _ => None,
    };
    let journal_short_name = message
      .get("short-container-title")
      .and_then(|titles| titles.get(0))
      .and_then(validate::coerce_text)
      .filter(|title| !title.is_empty());
    let text = |field: &str| {
      message.get(field).and_then(validate::coerce_text).filter(|text| !text.is_empty())
    };

    Self { authors, journal_short_name, volume: text("volume"), issue: text("issue") }
  }

  /// Indexes Crossref work records by lowercase DOI.
  ///
  /// Accepts either an object mapping DOIs to records, or an array of records that carry their
  /// own `DOI` field. Records without a DOI are skipped.
  pub fn index_by_doi(records: &Value) -> HashMap<String, Self> {
    let pairs: Vec<(String, &Value)> = match records {
      Value::Object(map) => map.iter().map(|(doi, record)| (doi.clone(), record)).collect(),
      Value::Array(records) => records
        .iter()
        .filter_map(|record| {
          let message = record.get("message").unwrap_or(record);
          let doi = message.get("DOI")?.as_str()?;
          Some((doi.to_owned(), record))
        })
        .collect(),
      _ => Vec::new(),
    };
    pairs
      .into_iter()
      .map(|(doi, record)| (doi.trim().to_lowercase(), Self::from_crossref(record)))
      .collect()
  }

  /// Fills the article with whatever this record provides, leaving other fields untouched.
  pub fn apply(&self, article: &mut Article) {
    if self.authors.is_some() {
      article.authors.clone_from(&self.authors);
    }
    if self.journal_short_name.is_some() {
      article.journal_short_name.clone_from(&self.journal_short_name);
    }
    if self.volume.is_some() {
      article.volume.clone_from(&self.volume);
    }
    if self.issue.is_some() {
      article.issue.clone_from(&self.issue);
    }
  }
}

/// One creator of a [`ReferenceItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Creator {
  /// A person
  #[serde(rename_all = "camelCase")]
  Person {
    /// Always `author`
    creator_type: &'static str,
    /// Given name
    first_name:   String,
    /// Family name
    last_name:    String,
  },
  /// An organization
  #[serde(rename_all = "camelCase")]
  Organization {
    /// Always `author`
    creator_type: &'static str,
    /// Organization name
    name:         String,
  },
}

impl From<&Author> for Creator {
  fn from(author: &Author) -> Self {
    match author {
      Author::Individual { first_name, last_name } => Creator::Person {
        creator_type: "author",
        first_name:   first_name.clone(),
        last_name:    last_name.clone(),
      },
      Author::Institutional { name } =>
        Creator::Organization { creator_type: "author", name: name.clone() },
    }
  }
}

/// A tag on a [`ReferenceItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
  /// Tag text
  pub tag:  String,
  /// Tag type, `0` for user tags
  #[serde(rename = "type")]
  pub kind: u8,
}

/// The journal-article payload a reference manager stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceItem {
  /// Always `journalArticle`
  pub item_type:            &'static str,
  /// Title
  pub title:                String,
  /// Summary
  pub abstract_note:        String,
  /// Journal name
  pub publication_title:    String,
  /// Journal abbreviation
  pub journal_abbreviation: String,
  /// Volume
  pub volume:               String,
  /// Issue
  pub issue:                String,
  /// ISO publication date
  pub date:                 String,
  /// DOI
  #[serde(rename = "DOI")]
  pub doi:                  String,
  /// Landing page
  pub url:                  String,
  /// ISO access date
  pub access_date:          String,
  /// Authors in source order
  pub creators:             Vec<Creator>,
  /// Tags, including the assigned priority
  pub tags:                 Vec<Tag>,
  /// Collections the item is filed under
  pub collections:          Vec<String>,
}

impl ReferenceItem {
  /// Builds the payload for an article, filing it under `collection` when given.
  ///
  /// Absent values become empty strings, which reference managers treat as unset.
  pub fn from_article(article: &Article, collection: Option<&str>) -> Self {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let date = |value: &Option<NaiveDate>| value.map(|date| date.to_string()).unwrap_or_default();

    Self {
      item_type:            "journalArticle",
      title:                article.title.clone(),
      abstract_note:        text(&article.summary),
      publication_title:    text(&article.journal_name),
      journal_abbreviation: text(&article.journal_short_name),
      volume:               text(&article.volume),
      issue:                text(&article.issue),
      date:                 date(&article.date),
      doi:                  text(&article.doi),
      url:                  article.link.clone(),
      access_date:          date(&article.access_date),
      creators:             article.authors.iter().flatten().map(Creator::from).collect(),
      tags:                 article
        .priority_decision
        .iter()
        .map(|priority| Tag { tag: format!("llm_priority-{priority}"), kind: 0 })
        .collect(),
      collections:          collection.map(str::to_owned).into_iter().collect(),
    }
  }
}

/// A child note holding the model's reasoning, filed under the [`ReferenceItem`] with the same
/// DOI once the parent has been created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceNote {
  /// Always `note`
  pub item_type:  &'static str,
  /// DOI of the parent item
  #[serde(rename = "parentDOI")]
  pub parent_doi: String,
  /// Note body in Markdown
  pub note:       String,
}

impl ReferenceNote {
  /// Builds the note for an article.
  ///
  /// Returns `None` when the article has no DOI to attach the note to, or no reasoning to
  /// carry.
  pub fn from_article(article: &Article) -> Option<Self> {
    let parent_doi = article.doi.clone()?;
    let sections: Vec<String> = [
      ("Screening reasoning", &article.screening_reasoning),
      ("Priority reasoning", &article.priority_reasoning),
    ]
    .into_iter()
    .filter_map(|(heading, reasoning)| Some(format!("**{heading}:** {}", reasoning.as_deref()?)))
    .collect();
    if sections.is_empty() {
      return None;
    }
    Some(Self { item_type: "note", parent_doi, note: sections.join("\n\n") })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn crossref_record() -> Value {
    json!({
      "status": "ok",
      "message": {
        "DOI": "10.1038/S41586-020-2649-2",
        "author": [
          {"given": "Charles R.", "family": "Harris", "sequence": "first", "affiliation": []},
          {"name": "NumPy Developers", "sequence": "additional"},
          {"family": "Anonymous"}
        ],
        "short-container-title": ["Nature"],
        "volume": "585",
        "issue": 7825
      }
    })
  }

  #[traced_test]
  #[test]
  fn test_from_crossref() {
    let enrichment = Enrichment::from_crossref(&crossref_record());
    assert_eq!(
      enrichment.authors,
      Some(vec![
        Author::individual("Charles R.", "Harris"),
        Author::institutional("NumPy Developers")
      ])
    );
    assert_eq!(enrichment.journal_short_name.as_deref(), Some("Nature"));
    assert_eq!(enrichment.volume.as_deref(), Some("585"));
    assert_eq!(enrichment.issue.as_deref(), Some("7825"));
    assert!(logs_contain("Dropping unclassifiable author entry"));
  }

  #[test]
  fn test_sparse_record_leaves_article_alone() {
    let mut article = Article::new("https://journal.example/a1", "Title");
    article.volume = Some("12".into());
    article.authors = Some(vec![Author::institutional("CERN")]);

    Enrichment::from_crossref(&json!({"author": [], "short-container-title": []})).apply(&mut article);
    assert_eq!(article.volume.as_deref(), Some("12"));
    assert_eq!(article.authors, Some(vec![Author::institutional("CERN")]));
  }

  #[test]
  fn test_index_by_doi() {
    let from_array = Enrichment::index_by_doi(&json!([crossref_record(), {"message": {}}]));
    assert_eq!(from_array.len(), 1);
    assert!(from_array.contains_key("10.1038/s41586-020-2649-2"));

    let from_map = Enrichment::index_by_doi(&json!({"10.1000/ABC": {"volume": "3"}}));
    assert_eq!(from_map["10.1000/abc"].volume.as_deref(), Some("3"));
  }

  #[test]
  fn test_reference_item() {
    let mut article = Article::new("https://journal.example/a1", "Title");
    article.doi = Some("10.1000/a1".into());
    article.date = NaiveDate::from_ymd_opt(2024, 3, 1);
    article.priority_decision = Some(Priority::High);
    article.authors = Some(vec![Author::individual("Ada", "Lovelace"), Author::institutional("WHO")]);

    let item = serde_json::to_value(ReferenceItem::from_article(&article, Some("ABCD1234"))).unwrap();
    assert_eq!(item["itemType"], json!("journalArticle"));
    assert_eq!(item["DOI"], json!("10.1000/a1"));
    assert_eq!(item["date"], json!("2024-03-01"));
    assert_eq!(item["abstractNote"], json!(""));
    assert_eq!(item["creators"], json!([
      {"creatorType": "author", "firstName": "Ada", "lastName": "Lovelace"},
      {"creatorType": "author", "name": "WHO"}
    ]));
    assert_eq!(item["tags"], json!([{"tag": "llm_priority-high", "type": 0}]));
    assert_eq!(item["collections"], json!(["ABCD1234"]));

    let bare = ReferenceItem::from_article(&Article::new("https://journal.example/a2", "T"), None);
    assert!(bare.creators.is_empty() && bare.tags.is_empty() && bare.collections.is_empty());
  }

  #[test]
  fn test_reference_note() {
    let mut article = Article::new("https://journal.example/a1", "Title");
    article.screening_reasoning = Some("Matches the interest in sleep".into());
    assert_eq!(ReferenceNote::from_article(&article), None);

    article.doi = Some("10.1000/a1".into());
    article.priority_reasoning = Some("Directly relevant".into());
    let note = serde_json::to_value(ReferenceNote::from_article(&article).unwrap()).unwrap();
    assert_eq!(note, json!({
      "itemType": "note",
      "parentDOI": "10.1000/a1",
      "note": "**Screening reasoning:** Matches the interest in sleep\n\n**Priority reasoning:** Directly relevant"
    }));

    article.screening_reasoning = None;
    article.priority_reasoning = None;
    assert_eq!(ReferenceNote::from_article(&article), None);
  }
}
