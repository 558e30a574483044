//! Field coercion and the per-item schema validator.
//!
//! Model output is stringly typed: booleans arrive as `"True"`, priorities as `"HIGH"`, and
//! "nothing found" as the sentinel string `"NULL"`. Each [`FieldKind`] has exactly one coercion
//! function in this module, and [`Validator::validate`] applies them by walking a stage's field
//! table. Validation is total: every item yields a [`ValidationOutcome`], never an error.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use triage::{
//!   article::Item,
//!   stage::Stage,
//!   validate::{Rejection, ValidationOutcome, Validator},
//! };
//!
//! let validator = Validator::with_keys(Stage::Screening, ["10.1000/abc".to_string()]);
//! let item: Item = serde_json::from_value(json!({
//!   "doi": "10.1000/abc",
//!   "decision": "True",
//!   "reasoning": "Directly on topic",
//! }))
//! .unwrap();
//! assert!(matches!(validator.validate(&item), ValidationOutcome::Accepted(_)));
//!
//! let orphan: Item = serde_json::from_value(json!({
//!   "doi": "10.1000/zzz",
//!   "decision": "false",
//!   "reasoning": "Off topic",
//! }))
//! .unwrap();
//! match validator.validate(&orphan) {
//!   ValidationOutcome::Rejected { reason, .. } => assert_eq!(reason.to_string(), "unmatched_key"),
//!   _ => unreachable!(),
//! }
//! ```

use super::*;
use crate::stage::{
  FieldKind, FieldSpec, MetadataResponse, PriorityResponse, ScreeningResponse, StageRecord,
};

/// The literal a model uses to say a nullable field is intentionally absent.
pub const NULL_SENTINEL: &str = "NULL";

lazy_static! {
  /// Crossref's recommended pattern for modern DOIs.
  static ref DOI: Regex = Regex::new(r"^10\.\d{4,9}/[-._;()/:\w\[\]]+$").unwrap();
}

/// Why an item was rejected.
///
/// The [`Display`] form is the machine-readable reason written next to rejected items, e.g.
/// `missing_field:title` or `invalid_boolean`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
  /// A required field is absent, empty, or `NULL` where that is not allowed.
  MissingField(&'static str),
  /// A boolean field holds something other than a recognized boolean.
  InvalidBoolean(&'static str),
  /// An enum field holds a value outside its allowed set.
  InvalidEnum(&'static str),
  /// A field is present but malformed (bad DOI, URL, date, ...).
  InvalidValue(&'static str),
  /// The merge key does not belong to any article of the batch.
  UnmatchedKey(String),
  /// More than one response claims the same article.
  DuplicateKey(String),
}

impl Rejection {
  /// The field the rejection is about, if it is about a single field.
  pub fn field(&self) -> Option<&'static str> {
    match self {
      Rejection::MissingField(field)
      | Rejection::InvalidBoolean(field)
      | Rejection::InvalidEnum(field)
      | Rejection::InvalidValue(field) => Some(*field),
      Rejection::UnmatchedKey(_) | Rejection::DuplicateKey(_) => None,
    }
  }
}

impl Display for Rejection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Rejection::MissingField(field) => write!(f, "missing_field:{field}"),
      Rejection::InvalidBoolean(_) => write!(f, "invalid_boolean"),
      Rejection::InvalidEnum(_) => write!(f, "invalid_enum"),
      Rejection::InvalidValue(field) => write!(f, "invalid_value:{field}"),
      Rejection::UnmatchedKey(_) => write!(f, "unmatched_key"),
      Rejection::DuplicateKey(_) => write!(f, "duplicate_key"),
    }
  }
}

/// Result of validating one item.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
  /// The item fits the stage shape; carries the coerced record.
  Accepted(StageRecord),
  /// The item does not fit; carries the original item untouched.
  Rejected {
    /// The item exactly as it was received
    item:   Item,
    /// Why it was rejected
    reason: Rejection,
  },
}

/// Normalizes a boolean-like value.
///
/// Accepts JSON booleans and the strings `true`, `True`, `TRUE`, `false`, `False`, `FALSE`.
pub fn coerce_bool(value: &Value) -> Option<bool> {
  match value {
    Value::Bool(b) => Some(*b),
    Value::String(s) => match s.as_str() {
      "true" | "True" | "TRUE" => Some(true),
      "false" | "False" | "FALSE" => Some(false),
      _ => None,
    },
    _ => None,
  }
}

/// Normalizes an enum-like value by parsing its trimmed string form case-insensitively.
pub fn coerce_enum<T: FromStr>(value: &Value) -> Option<T> {
  value.as_str().and_then(|s| s.trim().parse().ok())
}

/// Applies the `NULL` sentinel: returns `None` for JSON `null` and the exact string `NULL`.
///
/// The check is case-sensitive, so `"null"` or `"Null"` pass through as ordinary values.
pub fn coerce_nullable(value: &Value) -> Option<&Value> {
  match value {
    Value::Null => None,
    Value::String(s) if s == NULL_SENTINEL => None,
    other => Some(other),
  }
}

/// Normalizes a text value, trimming surrounding whitespace.
///
/// Numbers are accepted and rendered as text; volumes and issues often arrive that way.
pub fn coerce_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.trim().to_owned()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Normalizes a DOI, stripping a `doi:` or resolver prefix.
pub fn coerce_doi(value: &Value) -> Option<String> {
  let text = coerce_text(value)?;
  let bare = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "doi:"]
    .iter()
    .find_map(|prefix| text.strip_prefix(prefix))
    .unwrap_or(&text);
  DOI.is_match(bare).then(|| bare.to_owned())
}

/// Checks that a value is an absolute `http(s)` URL, returning it trimmed but otherwise as given.
///
/// The original spelling is kept because links are join keys.
pub fn coerce_link(value: &Value) -> Option<String> {
  let text = coerce_text(value)?;
  let url = Url::parse(&text).ok()?;
  matches!(url.scheme(), "http" | "https").then_some(text)
}

/// Normalizes a date value; see [`article::parse_publication_date`].
pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
  value.as_str().and_then(article::parse_publication_date)
}

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
enum Coerced {
  /// Absent, or explicitly `NULL`
  Null,
  /// Text of any text-like kind
  Text(String),
  /// A boolean
  Bool(bool),
  /// A priority
  Priority(Priority),
  /// A date
  Date(NaiveDate),
  /// An author list
  Authors(Option<Vec<Author>>),
}

/// Coerces one present, non-null value according to its field kind.
fn coerce(spec: &FieldSpec, value: &Value) -> core::result::Result<Coerced, Rejection> {
  let field = spec.name;
  match spec.kind {
    FieldKind::Text => match coerce_text(value) {
      Some(text) if text.is_empty() => Err(Rejection::MissingField(field)),
      Some(text) => Ok(Coerced::Text(text)),
      None => Err(Rejection::InvalidValue(field)),
    },
    FieldKind::FreeText => coerce_text(value).map(Coerced::Text).ok_or(Rejection::InvalidValue(field)),
    FieldKind::Doi => match coerce_text(value) {
      Some(text) if text.is_empty() => Err(Rejection::MissingField(field)),
      _ => coerce_doi(value).map(Coerced::Text).ok_or(Rejection::InvalidValue(field)),
    },
    FieldKind::Link => match coerce_text(value) {
      Some(text) if text.is_empty() => Err(Rejection::MissingField(field)),
      _ => coerce_link(value).map(Coerced::Text).ok_or(Rejection::InvalidValue(field)),
    },
    FieldKind::Boolean => coerce_bool(value).map(Coerced::Bool).ok_or(Rejection::InvalidBoolean(field)),
    FieldKind::Priority =>
      coerce_enum::<Priority>(value).map(Coerced::Priority).ok_or(Rejection::InvalidEnum(field)),
    FieldKind::Date => coerce_date(value).map(Coerced::Date).ok_or(Rejection::InvalidValue(field)),
    FieldKind::Authors => match value {
      Value::Array(raw) => Ok(Coerced::Authors(author::normalize_authors(raw))),
      _ => Err(Rejection::InvalidValue(field)),
    },
  }
}

/// Field values of one item, coerced in field-table order.
struct Fields(BTreeMap<&'static str, Coerced>);

impl Fields {
  /// Takes a text field.
  fn text(&mut self, field: &str) -> Option<String> {
    match self.0.remove(field) {
      Some(Coerced::Text(text)) => Some(text),
      _ => None,
    }
  }

  /// Takes a required text field.
  fn required_text(&mut self, field: &'static str) -> core::result::Result<String, Rejection> {
    self.text(field).ok_or(Rejection::MissingField(field))
  }

  /// Takes a boolean field.
  fn bool(&mut self, field: &'static str) -> core::result::Result<bool, Rejection> {
    match self.0.remove(field) {
      Some(Coerced::Bool(b)) => Ok(b),
      _ => Err(Rejection::MissingField(field)),
    }
  }

  /// Takes a priority field.
  fn priority(&mut self, field: &'static str) -> Option<Priority> {
    match self.0.remove(field) {
      Some(Coerced::Priority(priority)) => Some(priority),
      _ => None,
    }
  }

  /// Takes a date field.
  fn date(&mut self, field: &str) -> Option<NaiveDate> {
    match self.0.remove(field) {
      Some(Coerced::Date(date)) => Some(date),
      _ => None,
    }
  }

  /// Takes an author list field.
  fn authors(&mut self, field: &str) -> Option<Vec<Author>> {
    match self.0.remove(field) {
      Some(Coerced::Authors(authors)) => authors,
      _ => None,
    }
  }
}

/// Validates items against one stage's shape.
///
/// For response stages the validator knows the merge keys of the batch the responses were
/// generated for, and rejects responses that claim any other article.
#[derive(Debug, Clone)]
pub struct Validator {
  /// Shape items are validated against
  stage: Stage,
  /// Merge keys of the batch, when attribution is checked
  keys:  Option<HashSet<String>>,
  /// Date stamped into exported records
  today: NaiveDate,
}

impl Validator {
  /// A validator that does not check attribution, for record stages.
  pub fn new(stage: Stage) -> Self { Self { stage, keys: None, today: Local::now().date_naive() } }

  /// A validator that only accepts responses claiming one of `keys`.
  pub fn with_keys(stage: Stage, keys: impl IntoIterator<Item = String>) -> Self {
    Self { keys: Some(keys.into_iter().collect()), ..Self::new(stage) }
  }

  /// A validator for responses generated from `articles`.
  ///
  /// The keys are read from the article field the stage's responses refer to and normalized
  /// like response keys; articles without a usable key (for example a `NULL` DOI) cannot be
  /// claimed by any response. Record stages get a validator without attribution checks.
  pub fn for_batch(stage: Stage, articles: &[Item]) -> Self {
    if stage.is_response() {
      Self::with_keys(stage, articles.iter().filter_map(|article| stage.article_key(article)))
    } else {
      Self::new(stage)
    }
  }

  /// Overrides the date stamped into exported records.
  pub fn with_today(mut self, today: NaiveDate) -> Self {
    self.today = today;
    self
  }

  /// The stage this validator checks.
  pub fn stage(&self) -> Stage { self.stage }

  /// Validates one item.
  ///
  /// Fields are checked in the stage's declared order and the first failure wins, so the key
  /// field (always first) is attributed before anything else is looked at. Unknown fields are
  /// ignored.
  pub fn validate(&self, item: &Item) -> ValidationOutcome {
    match self.check(item) {
      Ok(record) => ValidationOutcome::Accepted(record),
      Err(reason) => ValidationOutcome::Rejected { item: item.clone(), reason },
    }
  }

  /// Coerces every declared field and builds the typed record.
  fn check(&self, item: &Item) -> core::result::Result<StageRecord, Rejection> {
    let key_field = self.stage.key().field;
    let mut fields = BTreeMap::new();

    for spec in self.stage.fields() {
      // First non-null spelling wins, so `doi: null` does not hide a `metadata_doi`
      let present: Vec<&Value> = spec.names().filter_map(|name| item.get(name)).collect();
      let value =
        present.iter().copied().find(|value| coerce_nullable(value).is_some()).or(present.first().copied());
      let coerced = match value.map(coerce_nullable) {
        None => None,
        Some(None) => Some(Coerced::Null),
        Some(Some(value)) => match coerce(spec, value) {
          Err(Rejection::MissingField(_)) if !spec.required => None,
          result => Some(result?),
        },
      };

      match coerced {
        None if spec.required => return Err(Rejection::MissingField(spec.name)),
        Some(Coerced::Null) if !spec.nullable => return Err(Rejection::MissingField(spec.name)),
        None => continue,
        Some(coerced) => {
          if spec.name == key_field {
            self.attribute(&coerced)?;
          }
          fields.insert(spec.name, coerced);
        },
      }
    }

    self.build(Fields(fields))
  }

  /// Checks that a coerced key belongs to the batch.
  fn attribute(&self, key: &Coerced) -> core::result::Result<(), Rejection> {
    match (&self.keys, key) {
      (Some(keys), Coerced::Text(key)) if !keys.contains(key) =>
        Err(Rejection::UnmatchedKey(key.clone())),
      _ => Ok(()),
    }
  }

  /// Assembles the typed record for the stage from coerced fields.
  fn build(&self, mut fields: Fields) -> core::result::Result<StageRecord, Rejection> {
    let record = match self.stage {
      Stage::Metadata => StageRecord::Metadata(MetadataResponse {
        url:     fields.required_text("url")?,
        title:   fields.text("title"),
        summary: fields.text("summary"),
        doi:     fields.text("doi"),
      }),
      Stage::Screening => StageRecord::Screening(ScreeningResponse {
        doi:       fields.required_text("doi")?,
        decision:  fields.bool("decision")?,
        reasoning: fields.required_text("reasoning")?,
      }),
      Stage::Priority => StageRecord::Priority(PriorityResponse {
        doi:       fields.required_text("doi")?,
        decision:  fields.priority("decision").ok_or(Rejection::MissingField("decision"))?,
        reasoning: fields.required_text("reasoning")?,
      }),
      Stage::Import => StageRecord::Import(self.article(&mut fields)?),
      Stage::Export => {
        let mut article = self.article(&mut fields)?;
        article.screening_decision = Some(fields.bool("screening_decision")?);
        article.screening_reasoning = Some(fields.required_text("screening_reasoning")?);
        article.priority_decision = Some(
          fields.priority("priority_decision").ok_or(Rejection::MissingField("priority_decision"))?,
        );
        article.priority_reasoning = Some(fields.required_text("priority_reasoning")?);
        article.access_date = Some(self.today);
        StageRecord::Export(article)
      },
    };
    Ok(record)
  }

  /// Assembles the bibliographic part of an article record.
  fn article(&self, fields: &mut Fields) -> core::result::Result<Article, Rejection> {
    let mut article = Article::new(fields.required_text("link")?, fields.required_text("title")?);
    article.summary = fields.text("summary");
    article.journal_name = fields.text("journal_name");
    article.date = fields.date("date");
    article.doi = fields.text("doi");
    article.authors = fields.authors("authors");
    article.journal_short_name = fields.text("journal_short_name");
    article.volume = fields.text("volume");
    article.issue = fields.text("issue");
    article.language = fields.text("language");
    article.raw_contents = fields.text("raw_contents");
    Ok(article)
  }
}
