use chrono::Utc;
use rusqlite::{Connection, params};

use crate::models::{DOCUMENT_COLUMNS, DocumentRow, touch};
use crate::{DbError, OptionalExt, Result};

/// Insert a document and return its new id. Both timestamps start equal.
pub fn insert_document(conn: &Connection, title: Option<&str>, body: Option<&str>) -> Result<i64> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO documents (title, body, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![title, body, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_document(conn: &Connection, id: i64) -> Result<Option<DocumentRow>> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS);
    let row = conn
        .query_row(&sql, [id], DocumentRow::from_row)
        .optional()?;
    Ok(row)
}

/// Like [`get_document`], but a missing row is an error.
pub fn require_document(conn: &Connection, id: i64) -> Result<DocumentRow> {
    get_document(conn, id)?.ok_or(DbError::NotFound {
        entity: "document",
        id,
    })
}

pub fn document_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// All documents in creation order.
pub fn list_documents(conn: &Connection) -> Result<Vec<DocumentRow>> {
    let sql = format!("SELECT {} FROM documents ORDER BY id", DOCUMENT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], DocumentRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Overwrite title and body and bump `updated_at`. Returns the stored row.
pub fn update_document(
    conn: &Connection,
    current: &DocumentRow,
    title: Option<&str>,
    body: Option<&str>,
) -> Result<DocumentRow> {
    let updated_at = touch(current.updated_at);
    let changed = conn.execute(
        "UPDATE documents SET title = ?1, body = ?2, updated_at = ?3 WHERE id = ?4",
        params![title, body, updated_at, current.id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound {
            entity: "document",
            id: current.id,
        });
    }

    Ok(DocumentRow {
        title: title.map(str::to_owned),
        body: body.map(str::to_owned),
        updated_at,
        ..current.clone()
    })
}

pub fn delete_document(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(DbError::NotFound {
            entity: "document",
            id,
        });
    }
    Ok(())
}

pub fn count_documents(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
    Ok(count)
}
