use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::rust::double_option;

// -- Images --

/// Raw image bytes handed over by the request layer.
/// On the wire `data` is standard base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagePayload {
    #[serde(serialize_with = "encode_b64", deserialize_with = "decode_b64")]
    pub data: Bytes,
    #[serde(default)]
    pub filename: Option<String>,
}

impl ImagePayload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

fn encode_b64<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&B64.encode(data))
}

fn decode_b64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    B64.decode(encoded.as_bytes())
        .map(Bytes::from)
        .map_err(serde::de::Error::custom)
}

// -- Documents --

/// One entry of a nested photo list.
///
/// - no `id`: create a photo from `image`
/// - `id`: update that photo (replacing the image when one is given)
/// - `id` with `_destroy: true`: remove that photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestedPhoto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
    #[serde(default, rename = "_destroy")]
    pub destroy: bool,
}

impl NestedPhoto {
    pub fn create(image: ImagePayload) -> Self {
        Self {
            id: None,
            image: Some(image),
            destroy: false,
        }
    }

    pub fn replace(id: i64, image: ImagePayload) -> Self {
        Self {
            id: Some(id),
            image: Some(image),
            destroy: false,
        }
    }

    pub fn destroy(id: i64) -> Self {
        Self {
            id: Some(id),
            image: None,
            destroy: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, rename = "photos_attributes")]
    pub photos: Vec<NestedPhoto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateDocumentRequest {
    /// `None` leaves the column as is, `Some(None)` clears it.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub body: Option<Option<String>>,
    /// `None` leaves the document's photos untouched.
    #[serde(default, rename = "photos_attributes")]
    pub photos: Option<Vec<NestedPhoto>>,
}

impl UpdateDocumentRequest {
    pub fn changes_fields(&self) -> bool {
        self.title.is_some() || self.body.is_some()
    }
}
