//! Database row types: these map directly to SQLite rows.
//! Distinct from folio-types API models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use rusqlite::Row;

#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PhotoRow {
    pub id: i64,
    pub document_id: Option<i64>,
    pub image_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const DOCUMENT_COLUMNS: &str = "id, title, body, created_at, updated_at";
pub(crate) const PHOTO_COLUMNS: &str = "id, document_id, image_data, created_at, updated_at";

impl DocumentRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl PhotoRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            document_id: row.get(1)?,
            image_data: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

/// Next value for an `updated_at` column: now, unless the clock is behind
/// the stored value, in which case the stored value is kept.
pub fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}
