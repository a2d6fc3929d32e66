//! Records and request payloads shared by the Folio crates.

pub mod api;
pub mod models;

pub use api::{CreateDocumentRequest, ImagePayload, NestedPhoto, UpdateDocumentRequest};
pub use models::{Document, ImageMetadata, ImageReference, Photo};
