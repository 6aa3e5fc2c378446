mod document;
mod error;
mod media;

pub mod filesystem;
pub mod memory;

pub use document::{
    Document, DocumentId, DocumentStore, Filter, LiveQuery, LiveQuerySender, OrderBy,
    OrderDirection, SnapshotEvent,
};
pub use error::{MediaError, StoreError};
pub use media::{MediaKey, MediaStore};
