use super::*;

/// Runs one model stage with a quarantine attempt followed by a strict retry of the failures.
fn run_stage(
  dir: &Path,
  stage: Stage,
  articles: Vec<Item>,
  first: &str,
  retry: Option<&str>,
) -> TestResult<Vec<Item>> {
  let checked = process_response(stage, articles, first, ErrorPolicy::Lenient)?;
  write_split(dir, &checked)?;

  if let Some(retry) = retry {
    let quarantined = read_stage(dir, stage.fail_file())?;
    let retried = process_response(stage, quarantined, retry, ErrorPolicy::Strict)?;
    assert!(retried.rejected.is_empty());
    write_retry(dir, &retried)?;
    assert!(!dir.join(stage.fail_file()).exists());
  }
  read_stage(dir, stage.pass_file())
}

#[traced_test]
#[test]
fn test_full_pipeline_through_files() -> TestResult<()> {
  let dir = tempdir()?;
  let (mut db, _db_dir) = setup_test_db()?;

  // Import: one feed entry lost its title
  let mut untitled = feed_item(4);
  untitled.insert("title".into(), Value::String("  ".into()));
  let feed = vec![feed_item(1), feed_item(2), feed_item(3), untitled];

  let fresh = Unprocessed::new(feed).execute(&mut db)?;
  let imported = process_records(Stage::Import, fresh, ErrorPolicy::Lenient)?;
  let written = write_split(dir.path(), &imported)?;
  assert!(written.pass.is_some() && written.fail.is_some());
  let import_fail = read_stage(dir.path(), Stage::Import.fail_file())?;
  assert_eq!(import_fail.len(), 1);
  assert_eq!(import_fail[0]["import_error"], json!("missing_field:title"));

  let articles: Vec<Article> = imported.accepted.into_iter().filter_map(|r| r.into_article()).collect();
  assert_eq!(InsertArticles::new(articles).execute(&mut db)?, 3);
  let batch = read_stage(dir.path(), Stage::Import.pass_file())?;

  // Metadata: the model forgets the third article on the first attempt
  let metadata = r#"Here is the extracted metadata:
```json
[
  {"url": "https://journal.example/a1", "title": "Article 1", "summary": "NULL", "doi": "https://doi.org/10.1000/A1"},
  {"url": "https://journal.example/a2", "title": "Article 2", "summary": "Second.", "doi": "doi:10.1000/a2"}
]
```"#;
  let metadata_retry =
    r#"{"url": "https://journal.example/a3", "title": "Article 3", "summary": "Third.", "doi": "10.1000/a3"}"#;
  let batch = run_stage(dir.path(), Stage::Metadata, batch, metadata, Some(metadata_retry))?;
  assert_eq!(batch.len(), 3);
  assert_eq!(batch[0]["metadata_doi"], json!("10.1000/A1"));
  assert_eq!(batch[0]["metadata_summary"], Value::Null);

  // Screening: a loose boolean the validator refuses, fixed on retry
  let screening = r#"[
    {"doi": "10.1000/A1", "decision": "True", "reasoning": "On topic."},
    {"doi": "10.1000/a2", "decision": "yes", "reasoning": "Probably."},
    {"doi": "10.1000/a3", "decision": false, "reasoning": "Off topic."}
  ]"#;
  let screening_retry = r#"[{"doi": "10.1000/a2", "decision": "TRUE", "reasoning": "On topic."}]"#;
  let batch = run_stage(dir.path(), Stage::Screening, batch, screening, Some(screening_retry))?;
  let screening_fail = read_stage(dir.path(), Stage::Screening.fail_file())?;
  assert_eq!(screening_fail[0]["screening_error"], json!("invalid_boolean"));

  let kept: Vec<Item> =
    batch.into_iter().filter(|item| item["screening_decision"] == json!(true)).collect();
  assert_eq!(kept.len(), 2);

  // Priority: accepted on the first attempt
  let priority = r#"```
[{"doi": "10.1000/A1", "decision": " HIGH ", "reasoning": "Core interest."},
 {"doi": "10.1000/a2", "decision": "low", "reasoning": "Tangential."}]
```"#;
  let batch = run_stage(dir.path(), Stage::Priority, kept, priority, None)?;
  assert!(!dir.path().join(Stage::Priority.fail_file()).exists());

  // Export and record the decisions
  let exported = process_records(Stage::Export, batch, ErrorPolicy::Strict)?;
  let articles: Vec<Article> = exported.accepted.into_iter().filter_map(|r| r.into_article()).collect();
  assert_eq!(articles.len(), 2);
  assert!(articles.iter().all(|article| article.access_date.is_some()));
  assert_eq!(RecordDecisions::new(articles).execute(&mut db)?, 2);

  let stored = ArticleByLink::new("https://journal.example/a1").execute(&mut db)?.unwrap();
  assert_eq!(stored.doi.as_deref(), Some("10.1000/A1"));
  assert_eq!(stored.screened, Some(true));
  assert_eq!(stored.priority, Some(Priority::High));
  Ok(())
}

#[traced_test]
#[test]
fn test_unusable_response_fails_the_batch() -> TestResult<()> {
  let batch = vec![feed_item(1)];
  let result = process_response(Stage::Metadata, batch, "I could not find any metadata.", ErrorPolicy::Lenient);
  assert!(matches!(result, Err(TriageError::MalformedResponse { .. })));
  Ok(())
}

#[traced_test]
#[test]
fn test_strict_attempt_names_the_article() -> TestResult<()> {
  let batch = vec![feed_item(1), feed_item(2)];
  let response = r#"[{"url": "https://journal.example/a1", "title": "Article 1", "summary": "One.", "doi": "10.1000/a1"}]"#;
  let err = process_response(Stage::Metadata, batch, response, ErrorPolicy::Strict).unwrap_err();
  assert!(err.to_string().contains("https://journal.example/a2"));
  Ok(())
}
