//! SQLite BookRepository implementation.

use std::collections::HashSet;

use sqlx::{Row, SqliteConnection, SqlitePool};

use super::cover::SqliteCoverRepository;
use super::helpers::{BOOK_COLUMNS, book_from_row, placeholders};
use crate::db::utils::{current_timestamp, generate_entity_id};
use crate::db::{
    Author, Book, BookDetails, BookRepository, CoverRepository, DbError, DbResult, Publisher, Tag,
};

/// SQLx-backed book repository.
pub struct SqliteBookRepository<'a> {
    pub(crate) pool: &'a SqlitePool,
}

fn codes_json(book: &Book) -> DbResult<String> {
    serde_json::to_string(&book.codes).map_err(|e| DbError::Database {
        message: format!("Failed to serialize codes: {}", e),
    })
}

async fn insert_book(conn: &mut SqliteConnection, book: &Book) -> DbResult<Book> {
    let id = if book.id.is_empty() {
        generate_entity_id()
    } else {
        book.id.clone()
    };
    let now = current_timestamp();
    let codes = codes_json(book)?;

    sqlx::query(
        r#"
        INSERT INTO book (id, identifier, title, page_count, edition, binding, language,
            published_date, description, description_clean, codes, service, publisher_id,
            colour, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&book.identifier)
    .bind(&book.title)
    .bind(book.page_count)
    .bind(&book.edition)
    .bind(&book.binding)
    .bind(&book.language)
    .bind(&book.published_date)
    .bind(&book.description)
    .bind(&book.description_clean)
    .bind(&codes)
    .bind(&book.service)
    .bind(&book.publisher_id)
    .bind(&book.colour)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::Constraint { message } if message.contains("book.identifier") => {
            DbError::AlreadyExists {
                entity_type: "Book".to_string(),
                id: book.identifier.clone(),
            }
        }
        other => other,
    })?;

    Ok(Book {
        id,
        created_at: now.clone(),
        updated_at: now,
        ..book.clone()
    })
}

async fn update_book(conn: &mut SqliteConnection, book: &Book) -> DbResult<Book> {
    let now = current_timestamp();
    let codes = codes_json(book)?;

    let result = sqlx::query(
        r#"
        UPDATE book SET identifier = ?, title = ?, page_count = ?, edition = ?, binding = ?,
            language = ?, published_date = ?, description = ?, description_clean = ?,
            codes = ?, service = ?, publisher_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&book.identifier)
    .bind(&book.title)
    .bind(book.page_count)
    .bind(&book.edition)
    .bind(&book.binding)
    .bind(&book.language)
    .bind(&book.published_date)
    .bind(&book.description)
    .bind(&book.description_clean)
    .bind(&codes)
    .bind(&book.service)
    .bind(&book.publisher_id)
    .bind(&now)
    .bind(&book.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound {
            entity_type: "Book".to_string(),
            id: book.id.clone(),
        });
    }

    Ok(Book {
        updated_at: now,
        ..book.clone()
    })
}

async fn write_authors(
    conn: &mut SqliteConnection,
    book_id: &str,
    author_ids: &[String],
) -> DbResult<()> {
    sqlx::query("DELETE FROM author_book WHERE book_id = ?")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    for (position, author_id) in author_ids.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO author_book (author_id, book_id, position) VALUES (?, ?, ?)",
        )
        .bind(author_id)
        .bind(book_id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_tags(conn: &mut SqliteConnection, book_id: &str, tag_ids: &[String]) -> DbResult<()> {
    sqlx::query("DELETE FROM book_tag WHERE book_id = ?")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO book_tag (book_id, tag_id) VALUES (?, ?)")
            .bind(book_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

impl<'a> BookRepository for SqliteBookRepository<'a> {
    async fn find_by_identifier(&self, identifier: &str) -> DbResult<Option<Book>> {
        let sql = format!("SELECT {} FROM book b WHERE b.identifier = ?", BOOK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(identifier)
            .fetch_optional(self.pool)
            .await?;

        row.as_ref().map(book_from_row).transpose()
    }

    async fn get(&self, id: &str) -> DbResult<Book> {
        let sql = format!("SELECT {} FROM book b WHERE b.id = ?", BOOK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let row = row.ok_or(DbError::NotFound {
            entity_type: "Book".to_string(),
            id: id.to_string(),
        })?;

        book_from_row(&row)
    }

    async fn details(&self, id: &str) -> DbResult<BookDetails> {
        let book = self.get(id).await?;

        let authors = sqlx::query(
            "SELECT a.id, a.name FROM author a JOIN author_book ab ON ab.author_id = a.id \
             WHERE ab.book_id = ? ORDER BY ab.position, a.name",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| Author {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect();

        let tags = sqlx::query(
            "SELECT t.id, t.name FROM tag t JOIN book_tag bt ON bt.tag_id = t.id \
             WHERE bt.book_id = ? ORDER BY t.name",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(|row| Tag {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect();

        let publisher = match &book.publisher_id {
            Some(publisher_id) => sqlx::query("SELECT id, name FROM publisher WHERE id = ?")
                .bind(publisher_id)
                .fetch_optional(self.pool)
                .await?
                .map(|row| Publisher {
                    id: row.get("id"),
                    name: row.get("name"),
                }),
            None => None,
        };

        let primary_cover = SqliteCoverRepository { pool: self.pool }
            .primary(id)
            .await?;

        Ok(BookDetails {
            book,
            authors,
            tags,
            publisher,
            primary_cover,
        })
    }

    async fn create(&self, book: &Book) -> DbResult<Book> {
        let mut conn = self.pool.acquire().await?;
        insert_book(&mut conn, book).await
    }

    async fn update(&self, book: &Book) -> DbResult<Book> {
        let mut conn = self.pool.acquire().await?;
        update_book(&mut conn, book).await
    }

    async fn store(&self, book: &Book, author_ids: &[String], tag_ids: &[String]) -> DbResult<Book> {
        let mut tx = self.pool.begin().await?;

        let stored = if book.id.is_empty() {
            insert_book(&mut tx, book).await?
        } else {
            update_book(&mut tx, book).await?
        };
        write_authors(&mut tx, &stored.id, author_ids).await?;
        write_tags(&mut tx, &stored.id, tag_ids).await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn set_colour(&self, id: &str, colour: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE book SET colour = ?, updated_at = ? WHERE id = ?")
            .bind(colour)
            .bind(current_timestamp())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity_type: "Book".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn replace_authors(&self, book_id: &str, author_ids: &[String]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        write_authors(&mut tx, book_id, author_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_tags(&self, book_id: &str, tag_ids: &[String]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        write_tags(&mut tx, book_id, tag_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn existing_identifiers(&self, identifiers: &[String]) -> DbResult<HashSet<String>> {
        if identifiers.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            "SELECT identifier FROM book WHERE identifier IN ({})",
            placeholders(identifiers.len())
        );
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for identifier in identifiers {
            query = query.bind(identifier);
        }

        Ok(query.fetch_all(self.pool).await?.into_iter().collect())
    }
}
