//! Note persistence. Every statement here is scoped by `user_id`, so a
//! caller can only ever see or mutate their own rows - a foreign note id is
//! indistinguishable from a missing one.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Row, params};

use crate::context::RequestContext;
use crate::db::{Database, StorageError};
use crate::models::{Note, SortDirection};

fn row_to_note(row: &Row<'_>) -> Result<Note, rusqlite::Error> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;

    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_timestamp(&created_at, 3)?,
        updated_at: parse_timestamp(&updated_at, 4)?,
    })
}

fn parse_timestamp(raw: &str, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl Database {
    pub async fn save_note(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        title: &str,
        content: Option<&str>,
    ) -> Result<i64, StorageError> {
        debug_assert!(!title.trim().is_empty(), "title validated at the controller");

        let title = title.to_string();
        let content = content.map(str::to_string);

        self.run_query(ctx, move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO notes (user_id, title, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![user_id, title, content, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn get_note(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        note_id: i64,
    ) -> Result<Note, StorageError> {
        self.run_query(ctx, move |conn| {
            conn.query_row(
                "SELECT id, title, content, created_at, updated_at
                 FROM notes WHERE id = ?1 AND user_id = ?2",
                params![note_id, user_id],
                row_to_note,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::NoteNotFound,
                other => other.into(),
            })
        })
        .await
    }

    /// List a page of the user's notes ordered by creation time.
    ///
    /// The sort direction arrives as an enum, never caller text, so the
    /// interpolated ORDER BY clause can only ever be ASC or DESC. An empty
    /// page is only an error when the user has no notes at all.
    pub async fn get_notes(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        limit: i64,
        offset: i64,
        sort: SortDirection,
    ) -> Result<Vec<Note>, StorageError> {
        self.run_query(ctx, move |conn| {
            let query = format!(
                "SELECT id, title, content, created_at, updated_at
                 FROM notes WHERE user_id = ?1
                 ORDER BY created_at {} LIMIT ?2 OFFSET ?3",
                sort.as_sql()
            );

            let mut stmt = conn.prepare(&query)?;
            let notes = stmt
                .query_map(params![user_id, limit, offset], row_to_note)?
                .collect::<Result<Vec<_>, _>>()?;

            if notes.is_empty() {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM notes WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )?;
                if total == 0 {
                    return Err(StorageError::NoNotes);
                }
            }

            Ok(notes)
        })
        .await
    }

    pub async fn update_note(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        note_id: i64,
        title: &str,
        content: Option<&str>,
    ) -> Result<i64, StorageError> {
        debug_assert!(!title.trim().is_empty(), "title validated at the controller");

        let title = title.to_string();
        let content = content.map(str::to_string);

        self.run_query(ctx, move |conn| {
            let changed = conn.execute(
                "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3
                 WHERE id = ?4 AND user_id = ?5",
                params![title, content, Utc::now().to_rfc3339(), note_id, user_id],
            )?;

            if changed == 0 {
                return Err(StorageError::NoteNotFound);
            }
            Ok(note_id)
        })
        .await
    }

    pub async fn delete_note(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        note_id: i64,
    ) -> Result<i64, StorageError> {
        self.run_query(ctx, move |conn| {
            let changed = conn.execute(
                "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
                params![note_id, user_id],
            )?;

            if changed == 0 {
                return Err(StorageError::NoteNotFound);
            }
            Ok(note_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn seeded_db(dir: &tempfile::TempDir) -> (Database, RequestContext, i64, i64) {
        let db = Database::new(
            dir.path().join("notes.db").to_str().unwrap(),
            Duration::from_secs(2),
        )
        .unwrap();
        let ctx = RequestContext::new();
        let alice = db.save_user(&ctx, "alice").await.unwrap();
        let bob = db.save_user(&ctx, "bob").await.unwrap();
        (db, ctx, alice, bob)
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        let id = db
            .save_note(&ctx, alice, "groceries", Some("milk, eggs"))
            .await
            .unwrap();
        let note = db.get_note(&ctx, alice, id).await.unwrap();

        assert_eq!(note.id, id);
        assert_eq!(note.title, "groceries");
        assert_eq!(note.content.as_deref(), Some("milk, eggs"));
        assert_eq!(note.created_at, note.updated_at);
    }

    #[tokio::test]
    async fn note_without_content_round_trips_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        let id = db.save_note(&ctx, alice, "just a title", None).await.unwrap();
        let note = db.get_note(&ctx, alice, id).await.unwrap();
        assert_eq!(note.content, None);
    }

    #[tokio::test]
    async fn foreign_notes_are_invisible_and_immutable() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, bob) = seeded_db(&dir).await;

        let id = db.save_note(&ctx, alice, "secret", None).await.unwrap();

        assert!(matches!(
            db.get_note(&ctx, bob, id).await.unwrap_err(),
            StorageError::NoteNotFound
        ));
        assert!(matches!(
            db.update_note(&ctx, bob, id, "stolen", None).await.unwrap_err(),
            StorageError::NoteNotFound
        ));
        assert!(matches!(
            db.delete_note(&ctx, bob, id).await.unwrap_err(),
            StorageError::NoteNotFound
        ));

        // the note survives untouched
        let note = db.get_note(&ctx, alice, id).await.unwrap();
        assert_eq!(note.title, "secret");
    }

    #[tokio::test]
    async fn listing_orders_by_creation_time() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        for title in ["first", "second", "third"] {
            db.save_note(&ctx, alice, title, None).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let asc = db
            .get_notes(&ctx, alice, 10, 0, SortDirection::Ascending)
            .await
            .unwrap();
        let titles: Vec<&str> = asc.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);

        let desc = db
            .get_notes(&ctx, alice, 10, 0, SortDirection::Descending)
            .await
            .unwrap();
        let titles: Vec<&str> = desc.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["third", "second", "first"]);
    }

    #[tokio::test]
    async fn limit_and_offset_slice_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        for title in ["a", "b", "c", "d"] {
            db.save_note(&ctx, alice, title, None).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let page = db
            .get_notes(&ctx, alice, 2, 1, SortDirection::Ascending)
            .await
            .unwrap();
        let titles: Vec<&str> = page.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["b", "c"]);
    }

    #[tokio::test]
    async fn empty_window_differs_from_no_notes() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        // no notes at all
        assert!(matches!(
            db.get_notes(&ctx, alice, 10, 0, SortDirection::Ascending)
                .await
                .unwrap_err(),
            StorageError::NoNotes
        ));

        // notes exist, the requested window is just past them
        db.save_note(&ctx, alice, "only one", None).await.unwrap();
        let page = db
            .get_notes(&ctx, alice, 10, 50, SortDirection::Ascending)
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn update_advances_updated_at_only() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        let id = db.save_note(&ctx, alice, "before", None).await.unwrap();
        let original = db.get_note(&ctx, alice, id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let updated_id = db
            .update_note(&ctx, alice, id, "after", Some("body"))
            .await
            .unwrap();
        assert_eq!(updated_id, id);

        let updated = db.get_note(&ctx, alice, id).await.unwrap();
        assert_eq!(updated.title, "after");
        assert_eq!(updated.content.as_deref(), Some("body"));
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
    }

    #[tokio::test]
    async fn delete_removes_the_note() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        let id = db.save_note(&ctx, alice, "ephemeral", None).await.unwrap();
        assert_eq!(db.delete_note(&ctx, alice, id).await.unwrap(), id);

        assert!(matches!(
            db.get_note(&ctx, alice, id).await.unwrap_err(),
            StorageError::NoteNotFound
        ));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        ctx.cancel();
        assert!(matches!(
            db.get_notes(&ctx, alice, 10, 0, SortDirection::Ascending)
                .await
                .unwrap_err(),
            StorageError::Cancelled
        ));
    }

    #[tokio::test]
    async fn cancelled_write_leaves_no_row_behind() {
        let dir = tempfile::tempdir().unwrap();
        let (db, ctx, alice, _) = seeded_db(&dir).await;

        ctx.cancel();
        assert!(matches!(
            db.save_note(&ctx, alice, "ghost", None).await.unwrap_err(),
            StorageError::Cancelled
        ));

        // give any stray worker time to finish before checking the table
        tokio::time::sleep(Duration::from_millis(20)).await;

        let fresh = RequestContext::new();
        assert!(matches!(
            db.get_notes(&fresh, alice, 10, 0, SortDirection::Ascending)
                .await
                .unwrap_err(),
            StorageError::NoNotes
        ));
    }
}
