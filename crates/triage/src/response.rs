//! Normalization of raw model output into generic items.
//!
//! Models rarely return bare JSON. Typical responses wrap the payload in a code fence, prefix
//! it with a sentence of narration, or trail off with an explanation. [`parse_response`] peels
//! that wrapping away and returns the payload as a list of [`Item`]s, so a single object and an
//! array of objects look the same to the validator.
//!
//! # Examples
//!
//! ````
//! use triage::response::parse_response;
//!
//! let raw = r#"Here are the screening results:
//! ```json
//! [{"doi": "10.1000/abc", "decision": "True", "reasoning": "On topic"}]
//! ```
//! Let me know if you need anything else."#;
//!
//! let items = parse_response(raw).unwrap();
//! assert_eq!(items.len(), 1);
//! assert_eq!(items[0]["decision"], "True");
//! ````

use super::*;

/// Marker opening and closing a fenced code block.
const FENCE: &str = "```";

/// Parses raw model output into a list of items.
///
/// # Errors
///
/// Returns [`TriageError::MalformedResponse`] when no JSON object or array can be recovered, or
/// when the recovered value is not an object or an array of objects.
#[instrument(skip_all, fields(len = raw.len()))]
pub fn parse_response(raw: &str) -> Result<Vec<Item>> {
  // Valid JSON is used as is; fences are only looked for otherwise.
  if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
    let items = into_items(value)?;
    trace!(count = items.len(), "Parsed bare response items");
    return Ok(items);
  }

  let payload = strip_wrapping(raw);
  if payload.is_empty() {
    return Err(TriageError::malformed("response is empty"));
  }

  let value = match serde_json::from_str::<Value>(payload) {
    Ok(value) => value,
    Err(e) => {
      debug!(error = %e, "Payload is not bare JSON, searching for an embedded structure");
      extract_embedded(payload)
        .ok_or_else(|| TriageError::malformed(format!("no JSON structure found: {e}")))?
    },
  };

  let items = into_items(value)?;
  trace!(count = items.len(), "Parsed response items");
  Ok(items)
}

/// Removes code fences (with or without a language tag) or a pair of inline backticks, along
/// with any prose outside them.
fn strip_wrapping(raw: &str) -> &str {
  let trimmed = raw.trim();

  if let Some(start) = trimmed.find(FENCE) {
    let after_fence = &trimmed[start + FENCE.len()..];
    // The rest of the opening line is the language tag, if any.
    let body = match after_fence.find('\n') {
      Some(newline) if !after_fence[..newline].trim_start().starts_with(['{', '[']) =>
        &after_fence[newline + 1..],
      _ => after_fence,
    };
    let body = match body.find(FENCE) {
      Some(end) => &body[..end],
      None => body,
    };
    return body.trim();
  }

  trimmed
    .strip_prefix('`')
    .and_then(|inner| inner.strip_suffix('`'))
    .map_or(trimmed, str::trim)
}

/// Looks for a JSON object or array embedded in surrounding prose.
///
/// Tries the span from the first opening bracket to the last matching closing bracket, for
/// whichever bracket type appears first, then the other type. A span only counts when it holds
/// an object or an array of objects, so a citation like `[1]` in the prose is passed over.
fn extract_embedded(text: &str) -> Option<Value> {
  let mut candidates = [('[', ']'), ('{', '}')]
    .into_iter()
    .filter_map(|(open, close)| {
      let start = text.find(open)?;
      let end = text.rfind(close)?;
      (end > start).then(|| (start, &text[start..=end]))
    })
    .collect::<Vec<_>>();
  candidates.sort_by_key(|(start, _)| *start);

  candidates
    .into_iter()
    .filter_map(|(_, span)| serde_json::from_str::<Value>(span).ok())
    .find(is_item_shaped)
}

/// Whether a value is an object or an array of objects.
fn is_item_shaped(value: &Value) -> bool {
  match value {
    Value::Object(_) => true,
    Value::Array(values) => values.iter().all(Value::is_object),
    _ => false,
  }
}

/// Flattens a parsed value into a list of object items.
fn into_items(value: Value) -> Result<Vec<Item>> {
  match value {
    Value::Object(map) => Ok(vec![map.into_iter().collect()]),
    Value::Array(values) => values
      .into_iter()
      .enumerate()
      .map(|(position, value)| match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(TriageError::malformed(format!(
          "array element {position} is not an object: {other}"
        ))),
      })
      .collect(),
    other => Err(TriageError::malformed(format!("expected an object or array, found {other}"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reason(result: Result<Vec<Item>>) -> String {
    match result {
      Err(TriageError::MalformedResponse { reason }) => reason,
      other => panic!("expected a malformed response, got {other:?}"),
    }
  }

  #[test]
  fn test_bare_object_becomes_one_item() {
    let items = parse_response(r#"{"doi": "10.1000/abc", "decision": true}"#).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["decision"], json!(true));
  }

  #[test]
  fn test_array_of_objects() {
    let items = parse_response(r#"[{"a": 1}, {"a": 2}, {"a": 3}]"#).unwrap();
    assert_eq!(items.iter().map(|item| item["a"].clone()).collect::<Vec<_>>(), vec![
      json!(1),
      json!(2),
      json!(3)
    ]);
    assert!(parse_response("[]").unwrap().is_empty());
  }

  #[test]
  fn test_code_fences() {
    let tagged = "```json\n{\"a\": 1}\n```";
    let untagged = "```\n[{\"a\": 1}]\n```";
    let inline = "```{\"a\": 1}```";
    let backticks = "`{\"a\": 1}`";
    for raw in [tagged, untagged, inline, backticks] {
      let items = parse_response(raw).unwrap();
      assert_eq!(items[0]["a"], json!(1), "failed on {raw:?}");
    }
  }

  #[test]
  fn test_narration_is_stripped() {
    let fenced = "Sure! Here is the JSON you asked for:\n```JSON\n{\"a\": 1}\n```\nHope this helps.";
    assert_eq!(parse_response(fenced).unwrap()[0]["a"], json!(1));

    let unfenced = "Result: [{\"a\": 1}, {\"a\": 2}] -- both entries checked.";
    assert_eq!(parse_response(unfenced).unwrap().len(), 2);

    let object_in_prose = "The answer is {\"a\": {\"b\": [1, 2]}} as requested.";
    assert_eq!(parse_response(object_in_prose).unwrap()[0]["a"]["b"], json!([1, 2]));
  }

  #[test]
  fn test_backticks_inside_bare_json() {
    let raw = r#"[{"doi": "10.1000/a1", "decision": true, "reasoning": "uses ```rust``` snippets"}]"#;
    let items = parse_response(raw).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["reasoning"], json!("uses ```rust``` snippets"));
  }

  #[test]
  fn test_citation_in_prose_is_skipped() {
    let raw = "As noted in [1], here is the result: {\"doi\": \"10.1000/a1\", \"decision\": false}";
    let items = parse_response(raw).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["doi"], json!("10.1000/a1"));

    let numbers_only = "Articles [1, 2] were already screened.";
    assert!(reason(parse_response(numbers_only)).starts_with("no JSON"));
  }

  #[test]
  fn test_unterminated_fence() {
    let raw = "```json\n[{\"a\": 1}]";
    assert_eq!(parse_response(raw).unwrap().len(), 1);
  }

  #[traced_test]
  #[test]
  fn test_malformed_responses() {
    assert_eq!(reason(parse_response("")), "response is empty");
    assert_eq!(reason(parse_response("```json\n```")), "response is empty");
    assert!(reason(parse_response("I could not find any articles.")).starts_with("no JSON"));
    assert!(reason(parse_response("```json\n{\"a\": 1,,}\n```")).starts_with("no JSON"));
    assert!(reason(parse_response("42")).starts_with("expected an object or array"));
    assert!(reason(parse_response(r#"[{"a": 1}, "b"]"#)).starts_with("array element 1"));
    assert!(logs_contain("searching for an embedded structure"));
  }
}
