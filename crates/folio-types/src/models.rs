use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A title/body document. Owns its photos: destroying the document
/// destroys every photo that references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` when the caller asked for the document without its photos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<Photo>>,
}

/// One uploaded image. Only the reference is persisted; the bytes live
/// with whichever image store produced the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub document_id: Option<i64>,
    pub image_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    /// Decode `image_data`. Returns `None` when the column is empty or
    /// does not hold a reference this crate understands.
    pub fn image(&self) -> Option<ImageReference> {
        self.image_data
            .as_deref()
            .and_then(|raw| ImageReference::decode(raw).ok())
    }
}

/// Pointer to externally stored image bytes.
///
/// Persisted as JSON in `photos.image_data`:
/// `{"id":"<key>","storage":"<backend>","metadata":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub id: String,
    pub storage: String,
    pub metadata: ImageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub size: u64,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub sha256: String,
}

impl ImageReference {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ImageReference {
        ImageReference {
            id: "4f1c.png".into(),
            storage: "fs".into(),
            metadata: ImageMetadata {
                size: 12,
                filename: Some("cat.png".into()),
                mime_type: Some("image/png".into()),
                sha256: "ab".repeat(32),
            },
        }
    }

    #[test]
    fn photo_image_decodes_column() {
        let photo = Photo {
            id: 1,
            document_id: Some(7),
            image_data: Some(reference().encode().unwrap()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(photo.image(), Some(reference()));
    }

    #[test]
    fn photo_image_ignores_garbage() {
        let photo = Photo {
            id: 1,
            document_id: Some(7),
            image_data: Some("uploads/cat.png".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(photo.image(), None);
    }

    #[test]
    fn unloaded_photos_are_not_serialized() {
        let doc = Document {
            id: 3,
            title: Some("Report".into()),
            body: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            photos: None,
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("photos").is_none());
        assert_eq!(json["title"], "Report");
    }
}
