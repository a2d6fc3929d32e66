use chrono::Utc;
use rusqlite::{Connection, params};

use crate::models::{PHOTO_COLUMNS, PhotoRow, touch};
use crate::{DbError, OptionalExt, Result};

/// Insert a photo for `document_id`. The foreign key rejects unknown
/// documents with [`DbError::ForeignKey`].
pub fn insert_photo(conn: &Connection, document_id: i64, image_data: Option<&str>) -> Result<PhotoRow> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO photos (document_id, image_data, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![document_id, image_data, now],
    )?;

    Ok(PhotoRow {
        id: conn.last_insert_rowid(),
        document_id: Some(document_id),
        image_data: image_data.map(str::to_owned),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_photo(conn: &Connection, id: i64) -> Result<Option<PhotoRow>> {
    let sql = format!("SELECT {} FROM photos WHERE id = ?1", PHOTO_COLUMNS);
    let row = conn.query_row(&sql, [id], PhotoRow::from_row).optional()?;
    Ok(row)
}

pub fn require_photo(conn: &Connection, id: i64) -> Result<PhotoRow> {
    get_photo(conn, id)?.ok_or(DbError::NotFound { entity: "photo", id })
}

/// Photos owned by one document, oldest first.
pub fn list_photos_for_document(conn: &Connection, document_id: i64) -> Result<Vec<PhotoRow>> {
    let sql = format!(
        "SELECT {} FROM photos WHERE document_id = ?1 ORDER BY id",
        PHOTO_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([document_id], PhotoRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Batch-fetch photos for a set of document ids, ordered by id.
pub fn list_photos_for_documents(conn: &Connection, document_ids: &[i64]) -> Result<Vec<PhotoRow>> {
    if document_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=document_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {} FROM photos WHERE document_id IN ({}) ORDER BY id",
        PHOTO_COLUMNS,
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = document_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), PhotoRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Swap the stored image reference and bump `updated_at`.
pub fn update_photo_image(
    conn: &Connection,
    current: &PhotoRow,
    image_data: Option<&str>,
) -> Result<PhotoRow> {
    let updated_at = touch(current.updated_at);
    let changed = conn.execute(
        "UPDATE photos SET image_data = ?1, updated_at = ?2 WHERE id = ?3",
        params![image_data, updated_at, current.id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound {
            entity: "photo",
            id: current.id,
        });
    }

    Ok(PhotoRow {
        image_data: image_data.map(str::to_owned),
        updated_at,
        ..current.clone()
    })
}

pub fn delete_photo(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM photos WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(DbError::NotFound { entity: "photo", id });
    }
    Ok(())
}

/// Delete every photo of a document and return the removed rows.
pub fn delete_photos_for_document(conn: &Connection, document_id: i64) -> Result<Vec<PhotoRow>> {
    let rows = list_photos_for_document(conn, document_id)?;
    conn.execute("DELETE FROM photos WHERE document_id = ?1", [document_id])?;
    Ok(rows)
}

pub fn count_photos(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::documents::{delete_document, insert_document};
    use chrono::Duration;

    #[test]
    fn insert_and_list_for_document() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let doc = insert_document(conn, Some("Report"), None)?;
            let other = insert_document(conn, Some("Other"), None)?;
            let a = insert_photo(conn, doc, Some("a"))?;
            insert_photo(conn, other, Some("x"))?;
            let b = insert_photo(conn, doc, Some("b"))?;

            let ids: Vec<_> = list_photos_for_document(conn, doc)?.iter().map(|p| p.id).collect();
            assert_eq!(ids, [a.id, b.id]);
            assert_eq!(require_photo(conn, a.id)?.document_id, Some(doc));
            Ok::<_, DbError>(())
        })
        .unwrap();
    }

    #[test]
    fn foreign_key_rejects_unknown_document() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| insert_photo(conn, 404, Some("a")));
        assert!(matches!(result, Err(DbError::ForeignKey(_))));
        assert_eq!(db.with_conn(|conn| count_photos(conn)).unwrap(), 0);
    }

    #[test]
    fn batch_fetch_spans_documents() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let d1 = insert_document(conn, None, None)?;
            let d2 = insert_document(conn, None, None)?;
            let d3 = insert_document(conn, None, None)?;
            insert_photo(conn, d1, Some("1"))?;
            insert_photo(conn, d2, Some("2"))?;
            insert_photo(conn, d3, Some("3"))?;

            let rows = list_photos_for_documents(conn, &[d1, d3])?;
            let owners: Vec<_> = rows.iter().filter_map(|p| p.document_id).collect();
            assert_eq!(owners, [d1, d3]);
            assert!(list_photos_for_documents(conn, &[])?.is_empty());
            Ok::<_, DbError>(())
        })
        .unwrap();
    }

    #[test]
    fn update_image_bumps_timestamp() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let doc = insert_document(conn, None, None)?;
            let photo = insert_photo(conn, doc, Some("old"))?;
            let updated = update_photo_image(conn, &photo, Some("new"))?;

            assert_eq!(updated.image_data.as_deref(), Some("new"));
            assert!(updated.updated_at >= photo.updated_at);
            assert_eq!(updated.created_at, photo.created_at);
            assert_eq!(require_photo(conn, photo.id)?.image_data.as_deref(), Some("new"));
            Ok::<_, DbError>(())
        })
        .unwrap();
    }

    #[test]
    fn delete_for_document_returns_removed_rows() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let doc = insert_document(conn, None, None)?;
            insert_photo(conn, doc, Some("a"))?;
            insert_photo(conn, doc, Some("b"))?;

            let removed = delete_photos_for_document(conn, doc)?;
            assert_eq!(removed.len(), 2);
            assert_eq!(count_photos(conn)?, 0);
            Ok::<_, DbError>(())
        })
        .unwrap();
    }

    #[test]
    fn cascade_backstop_on_document_delete() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let doc = insert_document(conn, None, None)?;
            let photo = insert_photo(conn, doc, Some("a"))?;
            delete_document(conn, doc)?;
            assert!(get_photo(conn, photo.id)?.is_none());
            Ok::<_, DbError>(())
        })
        .unwrap();
    }

    #[test]
    fn image_swap_keeps_updated_at_from_the_future() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let doc = insert_document(conn, None, None)?;
            let photo = insert_photo(conn, doc, Some("old"))?;
            let ahead = Utc::now() + Duration::hours(1);
            conn.execute(
                "UPDATE photos SET updated_at = ?1 WHERE id = ?2",
                params![ahead, photo.id],
            )?;

            let current = require_photo(conn, photo.id)?;
            let updated = update_photo_image(conn, &current, Some("new"))?;
            assert_eq!(updated.updated_at, ahead);
            assert_eq!(require_photo(conn, photo.id)?.updated_at, ahead);
            assert_eq!(updated.image_data.as_deref(), Some("new"));
            Ok::<_, DbError>(())
        })
        .unwrap();
    }
}
