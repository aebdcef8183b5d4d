//! Tests for SqliteLibraryRepository.

use crate::db::{
    Book, BookRepository, CatalogRepository, Database, DbError, LibraryQuery, LibraryRepository,
    NewUser, PageSort, SqliteDatabase, UserBookStatus, UserRepository,
};

async fn setup_db() -> SqliteDatabase {
    let db = SqliteDatabase::in_memory()
        .await
        .expect("Failed to create in-memory database");
    db.migrate().await.expect("Migration should succeed");
    db
}

async fn create_user(db: &SqliteDatabase, email: &str) -> String {
    db.users()
        .create(&NewUser {
            name: "Reader".to_string(),
            email: email.to_string(),
            plan: None,
        })
        .await
        .unwrap()
        .id
}

async fn create_book(db: &SqliteDatabase, identifier: &str, title: &str) -> String {
    db.books()
        .create(&Book {
            id: String::new(),
            identifier: identifier.to_string(),
            title: Some(title.to_string()),
            page_count: None,
            edition: None,
            binding: None,
            language: None,
            published_date: None,
            description: None,
            description_clean: None,
            codes: vec![],
            service: None,
            publisher_id: None,
            colour: None,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test(flavor = "multi_thread")]
async fn attach_entry_and_count() {
    let db = setup_db().await;
    let user = create_user(&db, "a@example.com").await;
    let book = create_book(&db, "1000000000001", "Emma").await;
    let library = db.library();

    assert!(library.entry(&user, &book).await.unwrap().is_none());
    assert_eq!(library.count(&user).await.unwrap(), 0);

    library
        .attach(&user, &book, UserBookStatus::Reading)
        .await
        .expect("Attach should succeed");

    let entry = library.entry(&user, &book).await.unwrap().unwrap();
    assert_eq!(entry.status, UserBookStatus::Reading);
    assert_eq!(entry.book.title.as_deref(), Some("Emma"));
    assert_eq!(library.count(&user).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn attach_twice_reports_already_exists() {
    let db = setup_db().await;
    let user = create_user(&db, "a@example.com").await;
    let book = create_book(&db, "1000000000001", "Emma").await;
    let library = db.library();

    library
        .attach(&user, &book, UserBookStatus::PlanToRead)
        .await
        .unwrap();
    let err = library
        .attach(&user, &book, UserBookStatus::PlanToRead)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::AlreadyExists { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn set_status_and_detach_report_missing_rows() {
    let db = setup_db().await;
    let user = create_user(&db, "a@example.com").await;
    let book = create_book(&db, "1000000000001", "Emma").await;
    let library = db.library();

    assert!(
        !library
            .set_status(&user, &book, UserBookStatus::Completed)
            .await
            .unwrap()
    );
    assert!(!library.detach(&user, &book).await.unwrap());

    library
        .attach(&user, &book, UserBookStatus::PlanToRead)
        .await
        .unwrap();
    assert!(
        library
            .set_status(&user, &book, UserBookStatus::Completed)
            .await
            .unwrap()
    );
    assert_eq!(
        library.entry(&user, &book).await.unwrap().unwrap().status,
        UserBookStatus::Completed
    );
    assert!(library.detach(&user, &book).await.unwrap());
    assert_eq!(library.count(&user).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_status_and_pages_newest_first() {
    let db = setup_db().await;
    let user = create_user(&db, "a@example.com").await;
    let other = create_user(&db, "b@example.com").await;
    let library = db.library();

    let b1 = create_book(&db, "1000000000001", "First").await;
    let b2 = create_book(&db, "1000000000002", "Second").await;
    let b3 = create_book(&db, "1000000000003", "Third").await;
    library.attach(&user, &b1, UserBookStatus::Reading).await.unwrap();
    library.attach(&user, &b2, UserBookStatus::Completed).await.unwrap();
    library.attach(&user, &b3, UserBookStatus::Reading).await.unwrap();
    library.attach(&other, &b1, UserBookStatus::Reading).await.unwrap();

    let all = library.list(&user, &LibraryQuery::default()).await.unwrap();
    assert_eq!(all.total, 3);
    let titles: Vec<_> = all
        .items
        .iter()
        .map(|e| e.book.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["Third", "Second", "First"]);

    let reading = library
        .list(
            &user,
            &LibraryQuery {
                page: PageSort::page(1, 1),
                status: Some(UserBookStatus::Reading),
            },
        )
        .await
        .unwrap();
    assert_eq!(reading.total, 2);
    assert_eq!(reading.items.len(), 1);
    assert_eq!(reading.items[0].book.title.as_deref(), Some("Third"));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_counts_and_top_rankings() {
    let db = setup_db().await;
    let user = create_user(&db, "a@example.com").await;
    let library = db.library();
    let catalog = db.catalog();
    let books = db.books();

    let b1 = create_book(&db, "1000000000001", "One").await;
    let b2 = create_book(&db, "1000000000002", "Two").await;
    let b3 = create_book(&db, "1000000000003", "Three").await;

    let austen = catalog.author_first_or_create("Jane Austen").await.unwrap();
    let bronte = catalog.author_first_or_create("Charlotte Bronte").await.unwrap();
    books.replace_authors(&b1, &[austen.id.clone()]).await.unwrap();
    books.replace_authors(&b2, &[austen.id.clone()]).await.unwrap();
    books.replace_authors(&b3, &[bronte.id.clone()]).await.unwrap();

    let classics = catalog.tag_first_or_create("Classics").await.unwrap();
    let romance = catalog.tag_first_or_create("Romance").await.unwrap();
    books
        .replace_tags(&b1, &[classics.id.clone(), romance.id.clone()])
        .await
        .unwrap();
    books.replace_tags(&b2, &[classics.id.clone()]).await.unwrap();
    books.replace_tags(&b3, &[classics.id.clone()]).await.unwrap();

    library.attach(&user, &b1, UserBookStatus::Completed).await.unwrap();
    library.attach(&user, &b2, UserBookStatus::Completed).await.unwrap();
    library.attach(&user, &b3, UserBookStatus::Reading).await.unwrap();

    let counts = library.status_counts(&user).await.unwrap();
    assert_eq!(counts.get(&UserBookStatus::Completed), Some(&2));
    assert_eq!(counts.get(&UserBookStatus::Reading), Some(&1));
    assert_eq!(counts.get(&UserBookStatus::Dropped), None);

    let tags = library.top_tags(&user, 10).await.unwrap();
    assert_eq!(tags[0].name, "Classics");
    assert_eq!(tags[0].count, 3);
    assert_eq!(tags[1].name, "Romance");

    let authors = library.top_completed_authors(&user, 5).await.unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].name, "Jane Austen");
    assert_eq!(authors[0].count, 2);
}
