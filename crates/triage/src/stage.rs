//! Stage identifiers, the field table of each stage, and the typed records a stage produces.
//!
//! There are two families of stages:
//! - **Response stages** ([`Stage::Metadata`], [`Stage::Screening`], [`Stage::Priority`]) validate
//!   structured model output. Every response item carries a merge key that attributes it to an
//!   article of the batch it was generated for.
//! - **Record stages** ([`Stage::Import`], [`Stage::Export`]) validate article records before and
//!   after the model stages.
//!
//! Each stage declares its shape as a static table of [`FieldSpec`]s. The validator walks the
//! table and dispatches every field to the coercion function of its [`FieldKind`], so the rules
//! live in one place and are testable on their own.

use super::*;

/// A pipeline stage, selecting the shape items are validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  /// Metadata extraction (title, summary, DOI) from a feed entry.
  Metadata,
  /// Relevance screening against the research interests.
  Screening,
  /// Priority assignment for screened-in articles.
  Priority,
  /// Raw article records entering the pipeline.
  Import,
  /// Finished article records leaving the pipeline.
  Export,
}

impl Stage {
  /// All stages in pipeline order.
  pub const ALL: [Stage; 5] =
    [Stage::Import, Stage::Metadata, Stage::Screening, Stage::Priority, Stage::Export];

  /// Whether items of this stage are model responses that merge back onto articles.
  pub fn is_response(&self) -> bool {
    matches!(self, Stage::Metadata | Stage::Screening | Stage::Priority)
  }

  /// The declared field table for this stage.
  pub fn fields(&self) -> &'static [FieldSpec] {
    match self {
      Stage::Metadata => METADATA_FIELDS,
      Stage::Screening => SCREENING_FIELDS,
      Stage::Priority => PRIORITY_FIELDS,
      Stage::Import => IMPORT_FIELDS,
      Stage::Export => EXPORT_FIELDS,
    }
  }

  /// How items of this stage are identified and attributed.
  pub fn key(&self) -> KeySpec {
    match self {
      Stage::Metadata => KeySpec { field: "url", article_field: Some("link") },
      Stage::Screening | Stage::Priority =>
        KeySpec { field: "doi", article_field: Some("metadata_doi") },
      Stage::Import | Stage::Export => KeySpec { field: "link", article_field: None },
    }
  }

  /// Reads the raw identifying key of an item, following the key field's aliases.
  pub fn read_key<'a>(&self, item: &'a Item) -> Option<&'a str> {
    let spec = self.fields().iter().find(|spec| spec.name == self.key().field)?;
    spec.names().find_map(|name| article::item_str(item, name))
  }

  /// Normalizes a raw key the way the validator normalizes this stage's key field.
  ///
  /// DOI keys lose their `doi:` or resolver prefix; links are compared as given.
  pub fn normalize_key(&self, raw: &str) -> String {
    let field = self.key().field;
    let doi_keyed =
      self.fields().iter().any(|spec| spec.name == field && spec.kind == FieldKind::Doi);
    if doi_keyed {
      validate::coerce_doi(&Value::from(raw)).unwrap_or_else(|| raw.to_owned())
    } else {
      raw.to_owned()
    }
  }

  /// The normalized key a batch article is claimed by, `None` for record stages and for
  /// articles without a usable key.
  pub fn article_key(&self, article: &Item) -> Option<String> {
    let raw = article::item_str(article, self.key().article_field?)?;
    Some(self.normalize_key(raw))
  }

  /// Name of the field rejected items carry their reason in, e.g. `screening_error`.
  pub fn error_field(&self) -> String { format!("{self}_error") }

  /// File name of the accepted bucket, e.g. `screening_pass.json`.
  pub fn pass_file(&self) -> String { format!("{self}_pass.json") }

  /// File name of the rejected bucket, e.g. `screening_fail.json`.
  pub fn fail_file(&self) -> String { format!("{self}_fail.json") }
}

impl Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Stage::Metadata => "metadata",
      Stage::Screening => "screening",
      Stage::Priority => "priority",
      Stage::Import => "import",
      Stage::Export => "export",
    };
    write!(f, "{name}")
  }
}

impl FromStr for Stage {
  type Err = TriageError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "metadata" => Ok(Stage::Metadata),
      "screening" => Ok(Stage::Screening),
      "priority" => Ok(Stage::Priority),
      "import" => Ok(Stage::Import),
      "export" => Ok(Stage::Export),
      _ => Err(TriageError::InvalidStage(s.to_owned())),
    }
  }
}

/// The priority levels the priority stage may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  /// Read soon.
  High,
  /// Read eventually.
  Medium,
  /// Keep for reference.
  Low,
}

impl Priority {
  /// Canonical lowercase name.
  pub fn as_str(&self) -> &'static str {
    match self {
      Priority::High => "high",
      Priority::Medium => "medium",
      Priority::Low => "low",
    }
  }
}

impl Display for Priority {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Priority {
  type Err = TriageError;

  fn from_str(s: &str) -> Result<Self> {
    let trimmed = s.trim();
    [Priority::High, Priority::Medium, Priority::Low]
      .into_iter()
      .find(|priority| priority.as_str().eq_ignore_ascii_case(trimmed))
      .ok_or_else(|| TriageError::InvalidPriority(s.to_owned()))
  }
}

/// The kinds of field a stage can declare, each with its own coercion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  /// Non-empty text after trimming.
  Text,
  /// Text that may be empty.
  FreeText,
  /// A DOI such as `10.1000/xyz123`.
  Doi,
  /// An absolute `http(s)` URL.
  Link,
  /// A boolean, also accepted as `true`/`True`/`TRUE` and `false`/`False`/`FALSE`.
  Boolean,
  /// A [`Priority`], matched case-insensitively.
  Priority,
  /// A publication or access date.
  Date,
  /// A list of raw author entries.
  Authors,
}

/// Declaration of one field of a stage shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  /// Canonical field name
  pub name:     &'static str,
  /// Alternative names accepted on input, tried after `name`
  pub aliases:  &'static [&'static str],
  /// How the value is coerced
  pub kind:     FieldKind,
  /// Whether the field must be present
  pub required: bool,
  /// Whether `NULL` (or JSON `null`) is an acceptable value
  pub nullable: bool,
}

impl FieldSpec {
  /// A required, non-nullable field.
  pub const fn required(name: &'static str, kind: FieldKind) -> Self {
    Self { name, aliases: &[], kind, required: true, nullable: false }
  }

  /// An optional, nullable field.
  pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
    Self { name, aliases: &[], kind, required: false, nullable: true }
  }

  /// Allows `NULL` for this field.
  pub const fn nullable(self) -> Self { Self { nullable: true, ..self } }

  /// Accepts alternative input names for this field.
  pub const fn aliases(self, aliases: &'static [&'static str]) -> Self { Self { aliases, ..self } }

  /// The canonical name followed by its aliases.
  pub fn names(&self) -> impl Iterator<Item = &'static str> {
    std::iter::once(self.name).chain(self.aliases.iter().copied())
  }
}

/// How the items of a stage are identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
  /// Field of the item holding its key
  pub field:         &'static str,
  /// Field of the article the key refers to, for response stages
  pub article_field: Option<&'static str>,
}

/// Shape of a metadata extraction response.
const METADATA_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("url", FieldKind::Link).aliases(&["link"]),
  FieldSpec::required("title", FieldKind::Text).nullable(),
  FieldSpec::required("summary", FieldKind::FreeText).nullable(),
  FieldSpec::required("doi", FieldKind::Doi).nullable(),
];

/// Shape of a screening response.
const SCREENING_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("doi", FieldKind::Doi),
  FieldSpec::required("decision", FieldKind::Boolean),
  FieldSpec::required("reasoning", FieldKind::Text),
];

/// Shape of a priority response.
const PRIORITY_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("doi", FieldKind::Doi),
  FieldSpec::required("decision", FieldKind::Priority),
  FieldSpec::required("reasoning", FieldKind::Text),
];

/// Shape of an article record entering the pipeline.
const IMPORT_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("link", FieldKind::Link).aliases(&["url"]),
  FieldSpec::required("title", FieldKind::Text),
  FieldSpec::optional("summary", FieldKind::FreeText),
  FieldSpec::optional("journal_name", FieldKind::Text),
  FieldSpec::optional("date", FieldKind::Date),
  FieldSpec::optional("doi", FieldKind::Doi),
  FieldSpec::optional("authors", FieldKind::Authors),
  FieldSpec::optional("journal_short_name", FieldKind::Text),
  FieldSpec::optional("volume", FieldKind::Text),
  FieldSpec::optional("issue", FieldKind::Text),
  FieldSpec::optional("language", FieldKind::Text),
  FieldSpec::optional("raw_contents", FieldKind::FreeText),
];

/// Shape of a finished article record leaving the pipeline.
const EXPORT_FIELDS: &[FieldSpec] = &[
  FieldSpec::required("link", FieldKind::Link).aliases(&["url"]),
  FieldSpec::required("title", FieldKind::Text),
  FieldSpec::required("summary", FieldKind::FreeText).nullable(),
  FieldSpec::required("journal_name", FieldKind::Text),
  FieldSpec::required("date", FieldKind::Date),
  FieldSpec::required("doi", FieldKind::Doi).nullable().aliases(&["metadata_doi"]),
  FieldSpec::required("screening_decision", FieldKind::Boolean),
  FieldSpec::required("screening_reasoning", FieldKind::Text),
  FieldSpec::required("priority_decision", FieldKind::Priority),
  FieldSpec::required("priority_reasoning", FieldKind::Text),
  FieldSpec::optional("authors", FieldKind::Authors),
  FieldSpec::optional("journal_short_name", FieldKind::Text),
  FieldSpec::optional("volume", FieldKind::Text),
  FieldSpec::optional("issue", FieldKind::Text),
  FieldSpec::optional("language", FieldKind::Text),
  FieldSpec::optional("raw_contents", FieldKind::FreeText),
];

/// A validated metadata extraction response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataResponse {
  /// Link of the article the response belongs to
  pub url:     String,
  /// Extracted title, `None` when the model could not find one
  pub title:   Option<String>,
  /// Extracted summary, `None` when the model could not find one
  pub summary: Option<String>,
  /// Extracted DOI, `None` when the model could not find one
  pub doi:     Option<String>,
}

/// A validated screening response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreeningResponse {
  /// DOI of the article the response belongs to
  pub doi:       String,
  /// Whether the article matches the research interests
  pub decision:  bool,
  /// Short justification
  pub reasoning: String,
}

/// A validated priority response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityResponse {
  /// DOI of the article the response belongs to
  pub doi:       String,
  /// Assigned priority
  pub decision:  Priority,
  /// Short justification
  pub reasoning: String,
}

/// The coerced, typed record an accepted item turns into.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StageRecord {
  /// Accepted by [`Stage::Metadata`].
  Metadata(MetadataResponse),
  /// Accepted by [`Stage::Screening`].
  Screening(ScreeningResponse),
  /// Accepted by [`Stage::Priority`].
  Priority(PriorityResponse),
  /// Accepted by [`Stage::Import`].
  Import(Article),
  /// Accepted by [`Stage::Export`].
  Export(Article),
}

impl StageRecord {
  /// The stage that produced this record.
  pub fn stage(&self) -> Stage {
    match self {
      StageRecord::Metadata(_) => Stage::Metadata,
      StageRecord::Screening(_) => Stage::Screening,
      StageRecord::Priority(_) => Stage::Priority,
      StageRecord::Import(_) => Stage::Import,
      StageRecord::Export(_) => Stage::Export,
    }
  }

  /// The identifying key of the record.
  pub fn key(&self) -> &str {
    match self {
      StageRecord::Metadata(response) => &response.url,
      StageRecord::Screening(response) => &response.doi,
      StageRecord::Priority(response) => &response.doi,
      StageRecord::Import(article) | StageRecord::Export(article) => &article.link,
    }
  }

  /// The fields a response attaches to its article, named `<stage>_<field>`.
  ///
  /// Record stages attach nothing.
  pub fn attachments(&self) -> Vec<(String, Value)> {
    let stage = self.stage();
    let fields = match self {
      StageRecord::Metadata(response) => vec![
        ("title", response.title.clone().map_or(Value::Null, Value::String)),
        ("summary", response.summary.clone().map_or(Value::Null, Value::String)),
        ("doi", response.doi.clone().map_or(Value::Null, Value::String)),
      ],
      StageRecord::Screening(response) => vec![
        ("decision", Value::Bool(response.decision)),
        ("reasoning", Value::String(response.reasoning.clone())),
      ],
      StageRecord::Priority(response) => vec![
        ("decision", Value::String(response.decision.to_string())),
        ("reasoning", Value::String(response.reasoning.clone())),
      ],
      StageRecord::Import(_) | StageRecord::Export(_) => Vec::new(),
    };
    fields.into_iter().map(|(field, value)| (format!("{stage}_{field}"), value)).collect()
  }

  /// The accepted article, for record stages.
  pub fn into_article(self) -> Option<Article> {
    match self {
      StageRecord::Import(article) | StageRecord::Export(article) => Some(article),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stage_names_round_trip() {
    for stage in Stage::ALL {
      assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
    }
    assert_eq!(" Screening ".parse::<Stage>().unwrap(), Stage::Screening);
    assert!(matches!("triage".parse::<Stage>(), Err(TriageError::InvalidStage(s)) if s == "triage"));
  }

  #[test]
  fn test_output_names() {
    assert_eq!(Stage::Screening.pass_file(), "screening_pass.json");
    assert_eq!(Stage::Priority.fail_file(), "priority_fail.json");
    assert_eq!(Stage::Metadata.error_field(), "metadata_error");
  }

  #[test]
  fn test_priority_parsing() {
    for input in ["HIGH", "High", "high", " high "] {
      assert_eq!(input.parse::<Priority>().unwrap(), Priority::High);
    }
    assert_eq!("mEdIuM".parse::<Priority>().unwrap(), Priority::Medium);
    assert!("urgent".parse::<Priority>().is_err());
  }

  #[test]
  fn test_every_stage_declares_its_key() {
    for stage in Stage::ALL {
      let key = stage.key();
      let spec = stage.fields().iter().find(|spec| spec.name == key.field).unwrap();
      assert!(spec.required && !spec.nullable, "{stage} key must be required");
      assert_eq!(key.article_field.is_some(), stage.is_response());
    }
  }

  #[test]
  fn test_read_key_follows_aliases() {
    let item: Item = [("link".to_string(), json!("https://journal.example/a1"))].into_iter().collect();
    assert_eq!(Stage::Metadata.read_key(&item), Some("https://journal.example/a1"));
    assert_eq!(Stage::Import.read_key(&item), Some("https://journal.example/a1"));
    assert_eq!(Stage::Screening.read_key(&item), None);
  }

  #[test]
  fn test_article_keys_are_normalized() {
    let article: Item = [
      ("link".to_string(), json!("https://doi.org/10.1000/a1")),
      ("metadata_doi".to_string(), json!(" doi:10.1000/a1")),
    ]
    .into_iter()
    .collect();
    assert_eq!(Stage::Screening.article_key(&article).as_deref(), Some("10.1000/a1"));
    assert_eq!(Stage::Metadata.article_key(&article).as_deref(), Some("https://doi.org/10.1000/a1"));
    assert_eq!(Stage::Import.article_key(&article), None);
  }

  #[test]
  fn test_attachments_are_prefixed() {
    let record = StageRecord::Screening(ScreeningResponse {
      doi:       "10.1000/xyz".into(),
      decision:  true,
      reasoning: "on topic".into(),
    });
    assert_eq!(record.attachments(), vec![
      ("screening_decision".to_string(), json!(true)),
      ("screening_reasoning".to_string(), json!("on topic")),
    ]);

    let record = StageRecord::Metadata(MetadataResponse {
      url:     "https://journal.example/a1".into(),
      title:   Some("Title".into()),
      summary: None,
      doi:     None,
    });
    let attachments = record.attachments();
    assert_eq!(attachments[0], ("metadata_title".to_string(), json!("Title")));
    assert_eq!(attachments[2], ("metadata_doi".to_string(), Value::Null));
  }
}
