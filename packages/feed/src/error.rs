use common::store::{MediaError, StoreError};
use thiserror::Error;

/// Service-level failures surfaced to callers.
///
/// No operation retries automatically; messaging is the caller's job.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("sign-in required")]
    AuthRequired,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("only the author may modify a review")]
    PermissionDenied,

    #[error("authors cannot like their own review")]
    SelfLike,

    #[error("review is already liked")]
    DuplicateLike,

    /// Phase 1 of a publish failed; no document was written.
    #[error("image upload failed: {0}")]
    MediaUpload(#[source] MediaError),

    /// Phase 2 of a publish failed after a successful upload; the
    /// uploaded object is reclaimed best-effort.
    #[error("review write failed: {0}")]
    MetadataWrite(#[source] StoreError),

    #[error("document store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl From<StoreError> for FeedError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => FeedError::NotFound(what),
            other => FeedError::StoreUnavailable(other),
        }
    }
}
