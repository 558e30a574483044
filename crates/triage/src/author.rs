//! Author variants and the author normalizer.
//!
//! Bibliographic sources describe authors in free-form objects: Crossref uses `given`/`family`
//! for people and `name` for consortia, other sources use `first_name`/`last_name` or an
//! `organization` field. None of them carry a type tag, so [`classify`] decides the shape from
//! which fields are populated, and [`normalize_authors`] builds the ordered author list.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use triage::author::{normalize_authors, Author};
//!
//! let raw = vec![
//!   json!({"given": "Ada", "family": "Lovelace"}),
//!   json!({"organization": "World Health Organization"}),
//! ];
//! let authors = normalize_authors(&raw).unwrap();
//! assert_eq!(authors[0], Author::individual("Ada", "Lovelace"));
//! assert_eq!(authors[1], Author::institutional("World Health Organization"));
//!
//! assert_eq!(normalize_authors(&[]), None);
//! ```

use super::*;

/// Field names that carry a person's given name.
const GIVEN_FIELDS: &[&str] = &["given", "given_name", "first_name", "firstName"];
/// Field names that carry a person's family name.
const FAMILY_FIELDS: &[&str] = &["family", "family_name", "last_name", "lastName"];
/// Field names that carry an organization's name.
const ORGANIZATION_FIELDS: &[&str] = &["name", "organization", "institution", "affiliation_name"];

/// A single author, either a person or an institution.
///
/// Serialized without a tag: individuals as `{"first_name", "last_name"}` and institutions as
/// `{"name"}`, which the normalizer reads back into the same variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum Author {
  /// A person with a given and a family name.
  Individual {
    /// Given name(s)
    first_name: String,
    /// Family name(s)
    last_name:  String,
  },
  /// An organization credited as an author.
  Institutional {
    /// Name of the organization
    name: String,
  },
}

impl Author {
  /// Creates an [`Author::Individual`].
  pub fn individual(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
    Self::Individual { first_name: first_name.into(), last_name: last_name.into() }
  }

  /// Creates an [`Author::Institutional`].
  pub fn institutional(name: impl Into<String>) -> Self { Self::Institutional { name: name.into() } }

  /// The name as it should appear in a citation.
  pub fn display_name(&self) -> String {
    match self {
      Self::Individual { first_name, last_name } => format!("{first_name} {last_name}"),
      Self::Institutional { name } => name.clone(),
    }
  }
}

/// Result of classifying one raw author entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorClass {
  /// Both a given and a family name are populated.
  Individual(Author),
  /// Only an organization name is populated.
  Institutional(Author),
  /// Neither shape fits; the string says why.
  Unclassifiable(&'static str),
}

/// First non-empty trimmed string among `fields`.
fn first_populated<'a>(entry: &'a serde_json::Map<String, Value>, fields: &[&str]) -> Option<&'a str> {
  fields.iter().find_map(|field| match entry.get(*field) {
    Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
    _ => None,
  })
}

/// Classifies one raw author entry by which of its fields are populated.
///
/// A partial personal name (only a given or only a family name) is never promoted to an
/// institution, even when an organization field is present alongside it.
pub fn classify(raw: &Value) -> AuthorClass {
  let Some(entry) = raw.as_object() else {
    return AuthorClass::Unclassifiable("entry is not an object");
  };

  let given = first_populated(entry, GIVEN_FIELDS);
  let family = first_populated(entry, FAMILY_FIELDS);
  let organization = first_populated(entry, ORGANIZATION_FIELDS);

  match (given, family, organization) {
    (Some(given), Some(family), _) => AuthorClass::Individual(Author::individual(given, family)),
    (None, None, Some(name)) => AuthorClass::Institutional(Author::institutional(name)),
    (None, None, None) => AuthorClass::Unclassifiable("no name fields populated"),
    _ => AuthorClass::Unclassifiable("partial personal name"),
  }
}

/// Builds an ordered author list from raw source entries in a single pass.
///
/// Entries that cannot be classified are dropped with a logged reason. Returns `None` when the
/// source has no usable author information, so a present list is never empty.
pub fn normalize_authors(raw: &[Value]) -> Option<Vec<Author>> {
  let mut authors = Vec::with_capacity(raw.len());
  for (position, entry) in raw.iter().enumerate() {
    match classify(entry) {
      AuthorClass::Individual(author) | AuthorClass::Institutional(author) => authors.push(author),
      AuthorClass::Unclassifiable(reason) => {
        warn!(position, reason, entry = %entry, "Dropping unclassifiable author entry");
      },
    }
  }
  trace!(kept = authors.len(), total = raw.len(), "Normalized author list");
  (!authors.is_empty()).then_some(authors)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_classify_person_and_institution() {
    let raw = vec![
      json!({"given": "Ada", "family": "Lovelace"}),
      json!({"organization": "World Health Organization"}),
    ];
    let authors = normalize_authors(&raw).unwrap();
    assert_eq!(authors, vec![
      Author::individual("Ada", "Lovelace"),
      Author::institutional("World Health Organization"),
    ]);
  }

  #[test]
  fn test_empty_list_is_absent() {
    assert_eq!(normalize_authors(&[]), None);
  }

  #[traced_test]
  #[test]
  fn test_unclassifiable_entries_are_dropped_and_logged() {
    let raw = vec![
      json!({"given": "Grace"}),
      json!({}),
      json!("Hopper, Grace"),
      json!({"given": "  ", "family": "Hopper", "name": "US Navy"}),
      json!({"family": "Hopper", "given": "Grace"}),
    ];
    let authors = normalize_authors(&raw).unwrap();
    assert_eq!(authors, vec![Author::individual("Grace", "Hopper")]);
    assert!(logs_contain("partial personal name"));
    assert!(logs_contain("no name fields populated"));
    assert!(logs_contain("entry is not an object"));
  }

  #[test]
  fn test_all_dropped_is_absent() {
    assert_eq!(normalize_authors(&[json!({"given": ""}), json!(null)]), None);
  }

  #[test]
  fn test_tolerates_unusual_names() {
    let long_name = "Consortium for ".repeat(200) + "Open Science";
    let raw = vec![
      json!({"given": "Jean-Luc", "family": "O'Brien-Łukasiewicz"}),
      json!({"given": "明", "family": "李"}),
      json!({"first_name": "X", "last_name": "Y"}),
      json!({"name": long_name}),
      json!({"firstName": "Ngũgĩ", "lastName": "wa Thiong'o"}),
    ];
    let authors = normalize_authors(&raw).unwrap();
    assert_eq!(authors.len(), 5);
    assert_eq!(authors[0], Author::individual("Jean-Luc", "O'Brien-Łukasiewicz"));
    assert_eq!(authors[1].display_name(), "明 李");
    assert_eq!(authors[2], Author::individual("X", "Y"));
    assert_eq!(authors[3], Author::institutional(long_name));
    assert_eq!(authors[4], Author::individual("Ngũgĩ", "wa Thiong'o"));
  }

  #[test]
  fn test_large_list_preserves_order() {
    let raw: Vec<Value> = (0..500)
      .map(|i| {
        if i % 2 == 0 {
          json!({"given": format!("Given{i}"), "family": format!("Family{i}")})
        } else {
          json!({"name": format!("Lab {i}")})
        }
      })
      .collect();
    let authors = normalize_authors(&raw).unwrap();
    assert_eq!(authors.len(), 500);
    assert_eq!(authors[0], Author::individual("Given0", "Family0"));
    assert_eq!(authors[499], Author::institutional("Lab 499"));
  }

  #[test]
  fn test_serialized_authors_read_back() {
    let authors =
      vec![Author::individual("Ada", "Lovelace"), Author::institutional("CERN")];
    let raw = match serde_json::to_value(&authors).unwrap() {
      Value::Array(raw) => raw,
      other => panic!("expected array, got {other}"),
    };
    assert_eq!(normalize_authors(&raw), Some(authors));
  }
}
