use chrono::Utc;
use rusqlite::{ffi, params};

use crate::context::RequestContext;
use crate::db::{Database, StorageError};

impl Database {
    /// Insert a new user and return its id. Usernames are unique; a
    /// duplicate maps to [`StorageError::UserExists`].
    pub async fn save_user(
        &self,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<i64, StorageError> {
        let username = username.to_string();

        self.run_query(ctx, move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
                params![username, Utc::now().to_rfc3339()],
            );

            match inserted {
                Ok(_) => Ok(conn.last_insert_rowid()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Err(StorageError::UserExists)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}
