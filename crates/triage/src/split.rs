//! Pass/fail partitioning of a batch under an explicit [`ErrorPolicy`].
//!
//! A batch is always split into two disjoint, order-preserving buckets, accepted and rejected,
//! with nothing lost or duplicated. What happens on the first rejection depends on the policy:
//! - [`ErrorPolicy::Lenient`] (first attempt): the item is quarantined in the rejected bucket and
//!   the rest of the batch is still evaluated, so it can be retried.
//! - [`ErrorPolicy::Strict`] (final attempt): the batch aborts with
//!   [`TriageError::Validation`], since nothing downstream could recover the item.
//!
//! Splitting happens twice for a model stage. [`split`] partitions the model's responses, then
//! [`merge`] attaches the accepted responses to the batch's articles and partitions the articles.
//! The article partition is what the next stage consumes.

use super::*;
use crate::{
  stage::StageRecord,
  validate::{Rejection, ValidationOutcome, Validator},
};

/// What to do when an item is rejected.
///
/// Passed explicitly on every call so the same validation logic serves both attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
  /// Quarantine rejected items and keep going.
  #[default]
  Lenient,
  /// Abort the batch on the first rejected item.
  Strict,
}

impl ErrorPolicy {
  /// The policy for a strictness flag.
  pub fn from_strict(strict: bool) -> Self { if strict { Self::Strict } else { Self::Lenient } }
}

/// An item that did not make it into the accepted bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
  /// The item exactly as it was received
  pub item:   Item,
  /// Why it was rejected
  pub reason: Rejection,
}

impl Rejected {
  /// The item with its reason attached under `<stage>_error`, as written to fail files.
  pub fn annotated(&self, stage: Stage) -> Item {
    let mut item = self.item.clone();
    item.insert(stage.error_field(), Value::String(self.reason.to_string()));
    item
  }
}

/// The two buckets of a processed batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<T> {
  /// Stage the batch was validated for
  pub stage:    Stage,
  /// Items that passed, in input order
  pub accepted: Vec<T>,
  /// Items that need another attempt, in input order
  pub rejected: Vec<Rejected>,
}

impl<T> Split<T> {
  /// An empty split for `stage`.
  pub fn new(stage: Stage) -> Self { Self { stage, accepted: Vec::new(), rejected: Vec::new() } }

  /// Total number of items across both buckets.
  pub fn len(&self) -> usize { self.accepted.len() + self.rejected.len() }

  /// Whether both buckets are empty.
  pub fn is_empty(&self) -> bool { self.accepted.is_empty() && self.rejected.is_empty() }

  /// Places a rejected item according to `policy`.
  fn reject(&mut self, item: Item, key: String, reason: Rejection, policy: ErrorPolicy) -> Result<()> {
    let stage = self.stage;
    match policy {
      ErrorPolicy::Lenient => {
        warn!(%stage, %key, %reason, "Quarantined item for retry");
        self.rejected.push(Rejected { item, reason });
        Ok(())
      },
      ErrorPolicy::Strict => {
        error!(%stage, %key, %reason, "Rejected item on final attempt, aborting batch");
        Err(TriageError::Validation { stage, key, reason })
      },
    }
  }
}

impl Split<StageRecord> {
  /// The accepted articles of a record stage.
  pub fn articles(&self) -> Vec<Article> {
    self.accepted.iter().cloned().filter_map(StageRecord::into_article).collect()
  }
}

/// The key an item claims, normalized the way the validator normalizes keys.
fn claimed_key(stage: Stage, item: &Item) -> Option<String> {
  stage.read_key(item).map(|raw| stage.normalize_key(raw))
}

/// Identifying key used in logs and errors: the item's key, or its position in the batch.
fn describe(stage: Stage, item: &Item, position: usize) -> String {
  stage.read_key(item).map_or_else(|| format!("item #{position}"), str::to_owned)
}

/// Partitions `items` with `validator` under `policy`.
///
/// Each item is validated independently. When several items claim the same key, all of them
/// are rejected as [`Rejection::DuplicateKey`]: the batch cannot say which one to trust.
///
/// # Errors
///
/// Under [`ErrorPolicy::Strict`], returns [`TriageError::Validation`] for the first rejected
/// item; items after it are not evaluated.
#[instrument(skip_all, fields(stage = %validator.stage(), items = items.len(), ?policy))]
pub fn split(items: Vec<Item>, validator: &Validator, policy: ErrorPolicy) -> Result<Split<StageRecord>> {
  let stage = validator.stage();

  let mut claims: HashMap<String, usize> = HashMap::new();
  for key in items.iter().filter_map(|item| claimed_key(stage, item)) {
    *claims.entry(key).or_default() += 1;
  }

  let mut split = Split::new(stage);
  for (position, item) in items.into_iter().enumerate() {
    let key = describe(stage, &item, position);
    match validator.validate(&item) {
      ValidationOutcome::Accepted(record) if claims.get(record.key()).is_some_and(|n| *n > 1) => {
        let reason = Rejection::DuplicateKey(record.key().to_owned());
        split.reject(item, key, reason, policy)?;
      },
      ValidationOutcome::Accepted(record) => {
        trace!(%key, "Accepted item");
        split.accepted.push(record);
      },
      ValidationOutcome::Rejected { item, reason } => split.reject(item, key, reason, policy)?,
    }
  }

  debug!(accepted = split.accepted.len(), rejected = split.rejected.len(), "Split batch");
  Ok(split)
}

/// Attaches accepted responses to the articles they were generated for and partitions the
/// articles.
///
/// An article is accepted when exactly one accepted response claims it; the response fields
/// are attached as `<stage>_<field>`. Otherwise the article is rejected unmodified, with the
/// reason its response was rejected for, or [`Rejection::UnmatchedKey`] when the model said
/// nothing about it. Articles sharing a key are all rejected as [`Rejection::DuplicateKey`],
/// since a response cannot be attributed to one of them.
///
/// A `<stage>_error` left by an earlier attempt is dropped from every article first.
///
/// # Errors
///
/// Returns [`TriageError::NotMergeable`] for record stages, and under [`ErrorPolicy::Strict`]
/// returns [`TriageError::Validation`] for the first article left without a response.
#[instrument(skip_all, fields(stage = %responses.stage, articles = articles.len(), ?policy))]
pub fn merge(
  articles: Vec<Item>,
  responses: &Split<StageRecord>,
  policy: ErrorPolicy,
) -> Result<Split<Item>> {
  let stage = responses.stage;
  if !stage.is_response() {
    return Err(TriageError::NotMergeable(stage));
  }

  let mut owners: HashMap<String, usize> = HashMap::new();
  for key in articles.iter().filter_map(|article| stage.article_key(article)) {
    *owners.entry(key).or_default() += 1;
  }

  let accepted: HashMap<&str, &StageRecord> =
    responses.accepted.iter().map(|record| (record.key(), record)).collect();
  let mut failures: HashMap<String, &Rejection> = HashMap::new();
  for rejected in &responses.rejected {
    if let Some(key) = claimed_key(stage, &rejected.item) {
      failures.entry(key).or_insert(&rejected.reason);
    }
  }

  let error_field = stage.error_field();
  let mut merged = Split::new(stage);
  for (position, mut article) in articles.into_iter().enumerate() {
    article.remove(&error_field);
    let key = stage.article_key(&article);
    if let Some(shared) = key.as_deref().filter(|key| owners.get(*key).is_some_and(|n| *n > 1)) {
      let reason = Rejection::DuplicateKey(shared.to_owned());
      merged.reject(article, shared.to_owned(), reason, policy)?;
      continue;
    }
    match key.as_deref().and_then(|key| accepted.get(key)) {
      Some(record) => {
        for (field, value) in record.attachments() {
          article.insert(field, value);
        }
        merged.accepted.push(article);
      },
      None => {
        let reason = key
          .as_deref()
          .and_then(|key| failures.get(key))
          .map(|reason| (*reason).clone())
          .unwrap_or_else(|| Rejection::UnmatchedKey(key.clone().unwrap_or_default()));
        let key = key.unwrap_or_else(|| format!("article #{position}"));
        merged.reject(article, key, reason, policy)?;
      },
    }
  }

  debug!(accepted = merged.accepted.len(), rejected = merged.rejected.len(), "Merged batch");
  Ok(merged)
}

/// Runs one model stage end to end: normalize the raw response, split it against the batch's
/// articles, and merge the accepted responses back onto the articles.
///
/// # Errors
///
/// Returns [`TriageError::MalformedResponse`] when the response has no usable structure, and
/// the errors of [`split`] and [`merge`] otherwise.
pub fn process_response(
  stage: Stage,
  articles: Vec<Item>,
  raw: &str,
  policy: ErrorPolicy,
) -> Result<Split<Item>> {
  let responses = response::parse_response(raw)?;
  let validator = Validator::for_batch(stage, &articles);
  let checked = split(responses, &validator, policy)?;
  merge(articles, &checked, policy)
}

/// Validates article records for a record stage.
///
/// # Errors
///
/// Returns [`TriageError::NotMergeable`] when `stage` is a model stage, and the errors of
/// [`split`] otherwise.
pub fn process_records(
  stage: Stage,
  records: Vec<Item>,
  policy: ErrorPolicy,
) -> Result<Split<StageRecord>> {
  if stage.is_response() {
    return Err(TriageError::NotMergeable(stage));
  }
  split(records, &Validator::new(stage), policy)
}
