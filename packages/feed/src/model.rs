use chrono::{DateTime, Utc};
use common::identity::UserId;
use common::store::{Document, DocumentId, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::FeedError;

/// Collection holding review documents.
pub const REVIEWS: &str = "reviews";
/// Collection holding like records.
pub const LIKES: &str = "likes";

/// A published book review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Store-assigned id, embedded in the document at creation and equal
    /// to the key the document lives under.
    pub id: DocumentId,
    pub title: String,
    /// Review body text.
    pub review: String,
    pub genre: String,
    /// Durable URL of the uploaded image; never empty once published.
    #[serde(rename = "imageURL")]
    pub image_url: String,
    /// Creation time; stable across edits.
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Last successful edit; equals `created_at` until the first edit.
    #[serde(rename = "updatedAt", with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// Author identifier; immutable.
    pub email: UserId,
}

/// Input for a new review. Validated before any store traffic.
#[derive(Clone, Debug)]
pub struct ReviewDraft {
    pub title: String,
    pub genre: String,
    pub review: String,
    /// Raw image bytes, uploaded before the document is written.
    pub image: Vec<u8>,
}

impl ReviewDraft {
    pub(crate) fn validate(&self) -> Result<(), FeedError> {
        require_text("title", &self.title)?;
        require_text("genre", &self.genre)?;
        require_text("review", &self.review)?;
        if self.image.is_empty() {
            return Err(FeedError::Validation("image must not be empty".into()));
        }
        Ok(())
    }
}

/// Input for editing an existing review.
///
/// Fields replace the stored ones wholesale; a `None` image keeps the
/// current one.
#[derive(Clone, Debug)]
pub struct ReviewEdit {
    pub title: String,
    pub genre: String,
    pub review: String,
    pub image: Option<Vec<u8>>,
}

impl ReviewEdit {
    pub(crate) fn validate(&self) -> Result<(), FeedError> {
        require_text("title", &self.title)?;
        require_text("genre", &self.genre)?;
        require_text("review", &self.review)?;
        if matches!(&self.image, Some(bytes) if bytes.is_empty()) {
            return Err(FeedError::Validation("image must not be empty".into()));
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), FeedError> {
    if value.trim().is_empty() {
        return Err(FeedError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// A like relationship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Like {
    #[serde(rename = "userEmail")]
    pub user_email: UserId,
    #[serde(rename = "postId")]
    pub post_id: DocumentId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Deterministic like document id.
///
/// Key equality is what makes a second like for the same pair a
/// store-level conflict instead of a racy pre-check.
pub fn like_key(user: &UserId, review: &DocumentId) -> DocumentId {
    DocumentId::new(format!("{user}:{review}"))
}

/// Decode a stored review document. Documents that do not parse are
/// skipped with a warning, never surfaced half-formed.
pub(crate) fn decode_review(doc: &Document) -> Option<Review> {
    match serde_json::from_value(doc.fields.clone()) {
        Ok(review) => Some(review),
        Err(err) => {
            warn!(id = %doc.id, %err, "skipping undecodable review document");
            None
        }
    }
}

pub(crate) fn decode_like(doc: &Document) -> Option<Like> {
    match serde_json::from_value(doc.fields.clone()) {
        Ok(like) => Some(like),
        Err(err) => {
            warn!(id = %doc.id, %err, "skipping undecodable like document");
            None
        }
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|err| StoreError::InvalidDocument(err.to_string()))
}
