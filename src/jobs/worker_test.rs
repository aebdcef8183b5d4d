use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::actions::test_support::{StubProvider, isbndb_book, test_context};
use crate::books::{BookRecord, ProviderKind, transform};
use crate::db::{BookRepository, Database};
use crate::jobs::{Job, JobWorker};

fn record(isbn13: &str, title: &str) -> BookRecord {
    transform(ProviderKind::Isbndb, &isbndb_book(isbn13, title)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_books_skips_failing_records() {
    let t = test_context(StubProvider::new()).await;
    let ctx = t.ctx.clone();
    let worker = JobWorker::new(t.ctx, t.jobs, CancellationToken::new());

    let mut broken = record("9780441172719", "Broken");
    broken.identifier = String::new();

    worker
        .process(Job::ImportBooks(vec![
            record("9780441013593", "Dune"),
            broken,
            record("9780441104024", "Children of Dune"),
        ]))
        .await;

    let stored = ctx
        .db()
        .books()
        .existing_identifiers(&[
            "9780441013593".to_string(),
            "9780441104024".to_string(),
        ])
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_additional_pages_are_imported() {
    let provider = StubProvider::new()
        .with_page(1, 60, vec![isbndb_book("9780441013593", "Dune")])
        .with_page(2, 60, vec![isbndb_book("9780441172719", "Dune Messiah")]);
    let t = test_context(provider).await;
    let ctx = t.ctx.clone();
    let worker = JobWorker::new(t.ctx, t.jobs, CancellationToken::new());

    worker
        .process(Job::ImportAdditionalBooks {
            query: Some("dune".to_string()),
            author: None,
            subject: None,
        })
        .await;

    let pages: Vec<u32> = ctx.provider().searches().iter().map(|p| p.page).collect();
    assert_eq!(pages, vec![2]);
    assert!(
        ctx.db()
            .books()
            .find_by_identifier("9780441172719")
            .await
            .unwrap()
            .is_some()
    );
    assert!(
        ctx.db()
            .books()
            .find_by_identifier("9780441013593")
            .await
            .unwrap()
            .is_none(),
        "the first page is imported by the search itself"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_additional_pages_stop_at_an_empty_page() {
    let provider =
        StubProvider::new().with_page(2, 60, vec![isbndb_book("9780441172719", "Dune Messiah")]);
    let t = test_context(provider).await;
    let ctx = t.ctx.clone();
    let worker =
        JobWorker::new(t.ctx, t.jobs, CancellationToken::new()).with_additional_pages(5);

    worker
        .process(Job::ImportAdditionalBooks {
            query: None,
            author: Some("Frank Herbert".to_string()),
            subject: None,
        })
        .await;

    let searches = ctx.provider().searches();
    let pages: Vec<u32> = searches.iter().map(|p| p.page).collect();
    assert_eq!(pages, vec![2, 3]);
    assert_eq!(searches[0].author.as_deref(), Some("Frank Herbert"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_chain_member_stops_the_chain() {
    let t = test_context(StubProvider::new()).await;
    let ctx = t.ctx.clone();
    let worker = JobWorker::new(t.ctx, t.jobs, CancellationToken::new()).with_max_attempts(2);

    worker
        .process(Job::Chain(vec![
            Job::ImportCover {
                book_id: "missing1".to_string(),
                url: "https://images.test/missing.jpg".to_string(),
            },
            Job::ImportBooks(vec![record("9780441013593", "Dune")]),
        ]))
        .await;

    assert!(
        ctx.db()
            .books()
            .find_by_identifier("9780441013593")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_drains_queue_until_cancelled() {
    let t = test_context(StubProvider::new()).await;
    let ctx = t.ctx.clone();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(JobWorker::new(t.ctx, t.jobs, cancel.clone()).run());

    let mut dune = record("9780441013593", "Dune");
    dune.cover = None;
    dune.cover_large = None;
    ctx.jobs.dispatch(Job::ImportBooks(vec![dune]));

    let mut imported = false;
    for _ in 0..50 {
        if ctx
            .db()
            .books()
            .find_by_identifier("9780441013593")
            .await
            .unwrap()
            .is_some()
        {
            imported = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(imported, "worker imported the dispatched job");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("worker stops after cancellation")
        .unwrap();
}
