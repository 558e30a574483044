use super::*;

fn article(i: usize) -> Article { Article::from_item(&feed_item(i)).unwrap() }

#[traced_test]
#[test]
fn test_insert_is_idempotent() -> TestResult<()> {
  let (mut db, _dir) = setup_test_db()?;
  let batch: Vec<Article> = (1..=3).map(article).collect();

  assert_eq!(InsertArticles::new(batch.clone()).execute(&mut db)?, 3);
  assert_eq!(InsertArticles::new(batch).execute(&mut db)?, 0);

  let stored = ArticleByLink::new("https://journal.example/a2").execute(&mut db)?.unwrap();
  assert_eq!(stored.title, "Article 2");
  assert_eq!(stored.journal_name.as_deref(), Some("Journal of Examples"));
  assert_eq!(stored.date.map(|d| d.to_string()).as_deref(), Some("2024-03-05"));
  assert_eq!(stored.screened, None);
  assert!(ArticleByLink::new("https://journal.example/a9").execute(&mut db)?.is_none());
  Ok(())
}

#[traced_test]
#[test]
fn test_unprocessed_keeps_order() -> TestResult<()> {
  let (mut db, _dir) = setup_test_db()?;
  InsertArticles::new(vec![article(2)]).execute(&mut db)?;

  let mut linkless = feed_item(4);
  linkless.remove("link");
  let batch = vec![feed_item(1), feed_item(2), feed_item(3), linkless.clone()];

  let fresh = Unprocessed::new(batch).execute(&mut db)?;
  assert_eq!(fresh, vec![feed_item(1), feed_item(3), linkless]);
  Ok(())
}

#[traced_test]
#[test]
fn test_record_decisions() -> TestResult<()> {
  let (mut db, _dir) = setup_test_db()?;
  InsertArticles::new(vec![article(1)]).execute(&mut db)?;

  let mut screened = article(1);
  screened.doi = Some("10.1000/a1".into());
  screened.screening_decision = Some(true);
  assert_eq!(RecordDecisions::new(vec![screened]).execute(&mut db)?, 1);

  // A later update without a DOI keeps the stored one
  let mut prioritized = article(1);
  prioritized.priority_decision = Some(Priority::Medium);
  let missing = article(7);
  assert_eq!(RecordDecisions::new(vec![prioritized, missing]).execute(&mut db)?, 1);

  let stored = ArticleByLink::new("https://journal.example/a1").execute(&mut db)?.unwrap();
  assert_eq!(stored.doi.as_deref(), Some("10.1000/a1"));
  assert_eq!(stored.screened, Some(true));
  assert_eq!(stored.priority, Some(Priority::Medium));
  Ok(())
}

#[traced_test]
#[test]
fn test_register_sources() -> TestResult<()> {
  let (mut db, _dir) = setup_test_db()?;
  let cutoff = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
  let listing = "Nature\thttps://www.nature.com/nature.rss\n\nCell\thttps://www.cell.com/cell/current.rss\n";

  let sources = Source::parse_tsv(listing, cutoff)?;
  assert_eq!(RegisterSources::new(sources.clone()).execute(&mut db)?, 2);
  assert_eq!(RegisterSources::new(sources).execute(&mut db)?, 0);

  let listed = ListSources.execute(&mut db)?;
  assert_eq!(listed.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["Cell", "Nature"]);
  assert!(listed.iter().all(|s| s.last_checked == cutoff));

  let bad = Source::parse_tsv("Nature\n", cutoff);
  assert!(matches!(bad, Err(TriageError::Config(msg)) if msg.contains("line 1")));
  Ok(())
}

#[test]
fn test_rejects_unknown_priority() -> TestResult<()> {
  let (mut db, dir) = setup_test_db()?;
  InsertArticles::new(vec![article(1)]).execute(&mut db)?;
  drop(db);

  let conn = rusqlite::Connection::open(dir.path().join("nested").join("triage.db"))?;
  let result =
    conn.execute("UPDATE articles SET priority = 'urgent' WHERE link = 'https://journal.example/a1'", []);
  assert!(result.is_err());
  Ok(())
}
