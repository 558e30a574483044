//! Writer for the pass/fail files handed to the next pipeline stage.
//!
//! Each invocation produces at most two JSON arrays in the output directory:
//! `<stage>_pass.json` with the accepted items and `<stage>_fail.json` with the rejected items,
//! each annotated with `<stage>_error`. A bucket that is empty produces no file, and a missing
//! file means "nothing in this bucket".
//!
//! A strict retry is fed the first attempt's fail file and goes through [`write_retry`] instead,
//! which adds its accepted items to the first attempt's pass file.

use std::fs;

use super::*;
use crate::split::Split;

/// Paths of the files a [`write_split`] call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Written {
  /// The accepted bucket, if it was non-empty
  pub pass: Option<PathBuf>,
  /// The rejected bucket, if it was non-empty
  pub fail: Option<PathBuf>,
}

/// Writes the buckets of `split` into `dir`.
///
/// Stale files from an earlier run of the same stage are removed first, so the directory always
/// reflects this run alone.
///
/// # Errors
///
/// Returns an error when the directory cannot be created or a file cannot be written.
#[instrument(skip_all, fields(stage = %split.stage, dir = %dir.as_ref().display()))]
pub fn write_split<T: Serialize>(dir: impl AsRef<Path>, split: &Split<T>) -> Result<Written> {
  let dir = dir.as_ref();
  fs::create_dir_all(dir)?;
  let stage = split.stage;

  let pass = dir.join(stage.pass_file());
  let fail = dir.join(stage.fail_file());
  for stale in [&pass, &fail] {
    if stale.exists() {
      debug!(path = %stale.display(), "Removing output of a previous run");
      fs::remove_file(stale)?;
    }
  }

  let mut written = Written::default();
  if !split.accepted.is_empty() {
    fs::write(&pass, serde_json::to_string_pretty(&split.accepted)?)?;
    written.pass = Some(pass);
  }
  if !split.rejected.is_empty() {
    let annotated: Vec<Item> = split.rejected.iter().map(|r| r.annotated(stage)).collect();
    fs::write(&fail, serde_json::to_string_pretty(&annotated)?)?;
    written.fail = Some(fail);
  }

  debug!(accepted = split.accepted.len(), rejected = split.rejected.len(), "Wrote split");
  Ok(written)
}

/// Writes the outcome of a retry into `dir`, on top of the first attempt's files.
///
/// Accepted items are added to the existing pass file; an entry with the same `link` is
/// replaced, so repeating a retry does not duplicate articles. The fail file is rewritten with
/// whatever is still rejected, and removed when nothing is.
///
/// # Errors
///
/// Returns an error when the existing pass file cannot be read, or a file cannot be written.
#[instrument(skip_all, fields(stage = %split.stage, dir = %dir.as_ref().display()))]
pub fn write_retry<T: Serialize>(dir: impl AsRef<Path>, split: &Split<T>) -> Result<Written> {
  let dir = dir.as_ref();
  fs::create_dir_all(dir)?;
  let stage = split.stage;

  let pass = dir.join(stage.pass_file());
  let fail = dir.join(stage.fail_file());
  let mut passed = read_items(&pass)?;
  let earlier = passed.len();
  for accepted in &split.accepted {
    let item: Item = serde_json::from_value(serde_json::to_value(accepted)?)?;
    if let Some(link) = article::item_str(&item, "link") {
      passed.retain(|kept| article::item_str(kept, "link") != Some(link));
    }
    passed.push(item);
  }

  let mut written = Written::default();
  if !passed.is_empty() {
    fs::write(&pass, serde_json::to_string_pretty(&passed)?)?;
    written.pass = Some(pass);
  }
  if split.rejected.is_empty() {
    if fail.exists() {
      debug!(path = %fail.display(), "Retry left nothing rejected, removing fail file");
      fs::remove_file(&fail)?;
    }
  } else {
    let annotated: Vec<Item> = split.rejected.iter().map(|r| r.annotated(stage)).collect();
    fs::write(&fail, serde_json::to_string_pretty(&annotated)?)?;
    written.fail = Some(fail);
  }

  debug!(earlier, retried = split.accepted.len(), total = passed.len(), "Wrote retry");
  Ok(written)
}

/// Reads a JSON array of items, e.g. an earlier stage's pass file.
///
/// A missing file is an empty batch.
pub fn read_items(path: impl AsRef<Path>) -> Result<Vec<Item>> {
  let path = path.as_ref();
  if !path.exists() {
    trace!(path = %path.display(), "No file, treating as empty batch");
    return Ok(Vec::new());
  }
  let contents = fs::read_to_string(path)?;
  Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;
  use crate::{
    split::{ErrorPolicy, Rejected},
    validate::Rejection,
  };

  fn item(value: Value) -> Item { serde_json::from_value(value).unwrap() }

  #[test]
  fn test_writes_both_buckets() {
    let dir = tempdir().unwrap();
    let mut split = Split::new(Stage::Screening);
    split.accepted.push(item(json!({"link": "https://journal.example/a1"})));
    split.rejected.push(Rejected {
      item:   item(json!({"link": "https://journal.example/a2"})),
      reason: Rejection::UnmatchedKey("10.1000/a2".into()),
    });

    let written = write_split(dir.path(), &split).unwrap();
    assert_eq!(written.pass, Some(dir.path().join("screening_pass.json")));

    let passed = read_items(dir.path().join("screening_pass.json")).unwrap();
    assert_eq!(passed, split.accepted);

    let failed = read_items(written.fail.unwrap()).unwrap();
    assert_eq!(failed[0]["link"], json!("https://journal.example/a2"));
    assert_eq!(failed[0]["screening_error"], json!("unmatched_key"));
  }

  #[test]
  fn test_empty_buckets_write_nothing() {
    let dir = tempdir().unwrap();
    let records = crate::split::process_records(
      Stage::Import,
      vec![item(json!({"link": "https://journal.example/a1", "title": "One"}))],
      ErrorPolicy::Lenient,
    )
    .unwrap();

    let written = write_split(dir.path(), &records).unwrap();
    assert!(written.pass.is_some());
    assert_eq!(written.fail, None);
    assert!(!dir.path().join("import_fail.json").exists());
    assert!(read_items(dir.path().join("import_fail.json")).unwrap().is_empty());
  }

  #[test]
  fn test_retry_keeps_first_attempt() {
    let dir = tempdir().unwrap();
    let mut first = Split::new(Stage::Screening);
    first.accepted.push(item(json!({"link": "https://journal.example/a1"})));
    first.rejected.push(Rejected {
      item:   item(json!({"link": "https://journal.example/a2"})),
      reason: Rejection::InvalidBoolean("decision"),
    });
    write_split(dir.path(), &first).unwrap();

    let mut retry = Split::new(Stage::Screening);
    retry.accepted.push(item(json!({"link": "https://journal.example/a2", "screening_decision": false})));
    let written = write_retry(dir.path(), &retry).unwrap();
    assert_eq!(written.fail, None);
    assert!(!dir.path().join("screening_fail.json").exists());

    // Repeating the retry replaces the entry instead of adding another
    write_retry(dir.path(), &retry).unwrap();
    let passed = read_items(written.pass.unwrap()).unwrap();
    let links: Vec<&Value> = passed.iter().map(|item| &item["link"]).collect();
    assert_eq!(links, vec![&json!("https://journal.example/a1"), &json!("https://journal.example/a2")]);
    assert_eq!(passed[1]["screening_decision"], json!(false));
  }

  #[test]
  fn test_rerun_replaces_stale_files() {
    let dir = tempdir().unwrap();
    let mut split: Split<Item> = Split::new(Stage::Priority);
    split.rejected.push(Rejected {
      item:   item(json!({"link": "https://journal.example/a1"})),
      reason: Rejection::InvalidEnum("decision"),
    });
    write_split(dir.path(), &split).unwrap();
    assert!(dir.path().join("priority_fail.json").exists());

    split.accepted.push(split.rejected.remove(0).item);
    write_split(dir.path(), &split).unwrap();
    assert!(dir.path().join("priority_pass.json").exists());
    assert!(!dir.path().join("priority_fail.json").exists());
  }
}
