use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};

/// A note owned by exactly one user. Ownership is fixed at creation and
/// enforced by the store on every access.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Closed sort axis for note listings. The store only ever receives this
/// enum, and the ORDER BY clause is chosen by a match over it - request
/// text can never reach the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}
