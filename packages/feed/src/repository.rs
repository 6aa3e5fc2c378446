use std::sync::Arc;

use chrono::Utc;
use common::identity::{IdentityProvider, UserId};
use common::store::{
    Document, DocumentId, DocumentStore, Filter, LiveQuery, MediaKey, MediaStore, OrderBy,
    StoreError,
};
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::model::{self, Review, ReviewDraft, ReviewEdit};
use crate::projection::SearchSession;

/// Owns the review lifecycle: two-phase publish, author-gated edit and
/// delete, point reads, and live feed subscriptions.
///
/// All collaborators are injected; the repository holds no state of its
/// own and the document store stays the single source of truth.
#[derive(Clone)]
pub struct ReviewRepository {
    documents: Arc<dyn DocumentStore>,
    media: Arc<dyn MediaStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl ReviewRepository {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        media: Arc<dyn MediaStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            documents,
            media,
            identity,
        }
    }

    fn acting_user(&self) -> Result<UserId, FeedError> {
        self.identity.current_user().ok_or(FeedError::AuthRequired)
    }

    /// Upload the image, then publish the review document.
    ///
    /// The document is only written once the image is durable and its URL
    /// resolved, so no read path can ever observe a half-published
    /// review. An upload failure leaves no document behind; a document
    /// write failure after a successful upload reclaims the uploaded
    /// object best-effort.
    pub async fn publish(&self, draft: ReviewDraft) -> Result<DocumentId, FeedError> {
        let author = self.acting_user()?;
        draft.validate()?;

        let key = MediaKey::fresh_image();
        self.media
            .put(&key, &draft.image)
            .await
            .map_err(FeedError::MediaUpload)?;
        let image_url = self
            .media
            .resolve_url(&key)
            .await
            .map_err(FeedError::MediaUpload)?;

        let id = self.documents.allocate_id();
        let now = Utc::now();
        let review = Review {
            id: id.clone(),
            title: draft.title,
            review: draft.review,
            genre: draft.genre,
            image_url,
            created_at: now,
            updated_at: now,
            email: author,
        };

        let write = match model::encode(&review) {
            Ok(fields) => self.documents.insert(model::REVIEWS, &id, fields).await,
            Err(err) => Err(err),
        };
        if let Err(err) = write {
            self.reclaim_upload(&key).await;
            return Err(FeedError::MetadataWrite(err));
        }

        debug!(id = %id, "review published");
        Ok(id)
    }

    /// Replace a review's fields wholesale.
    ///
    /// A supplied image repeats the upload-then-swap sequence under a
    /// fresh key; without one the stored URL is kept. `created_at` and
    /// the author never change; `updated_at` is refreshed.
    pub async fn update(&self, id: &DocumentId, edit: ReviewEdit) -> Result<(), FeedError> {
        let editor = self.acting_user()?;
        edit.validate()?;

        let current = self.get(id).await?;
        if current.email != editor {
            return Err(FeedError::PermissionDenied);
        }

        let (image_url, uploaded) = match &edit.image {
            Some(bytes) => {
                let key = MediaKey::fresh_image();
                self.media
                    .put(&key, bytes)
                    .await
                    .map_err(FeedError::MediaUpload)?;
                let url = self
                    .media
                    .resolve_url(&key)
                    .await
                    .map_err(FeedError::MediaUpload)?;
                (url, Some(key))
            }
            None => (current.image_url.clone(), None),
        };

        let review = Review {
            id: current.id.clone(),
            title: edit.title,
            review: edit.review,
            genre: edit.genre,
            image_url,
            created_at: current.created_at,
            updated_at: Utc::now(),
            email: current.email.clone(),
        };

        let write = match model::encode(&review) {
            Ok(fields) => self.documents.update(model::REVIEWS, id, fields).await,
            Err(err) => Err(err),
        };
        if let Err(err) = write {
            if let Some(key) = &uploaded {
                self.reclaim_upload(key).await;
            }
            return Err(match err {
                // Deleted out from under the edit.
                StoreError::NotFound(what) => FeedError::NotFound(what),
                other => FeedError::MetadataWrite(other),
            });
        }

        debug!(id = %id, "review updated");
        Ok(())
    }

    /// Delete a review and, best-effort, every like referencing it.
    pub async fn remove(&self, id: &DocumentId) -> Result<(), FeedError> {
        let requester = self.acting_user()?;
        let current = self.get(id).await?;
        if current.email != requester {
            return Err(FeedError::PermissionDenied);
        }

        self.documents.delete(model::REVIEWS, id).await?;
        self.cascade_likes(id).await;
        debug!(id = %id, "review removed");
        Ok(())
    }

    pub async fn get(&self, id: &DocumentId) -> Result<Review, FeedError> {
        fetch_review(self.documents.as_ref(), id).await
    }

    /// Live feed of all reviews, newest first. Every emission is the full
    /// authoritative snapshot.
    pub async fn list_feed(&self) -> Result<ReviewFeed, FeedError> {
        let query = self
            .documents
            .watch(model::REVIEWS, Vec::new(), Some(OrderBy::desc("createdAt")))
            .await?;
        Ok(ReviewFeed { inner: query })
    }

    /// Filtered feed of one author's reviews, newest first.
    pub async fn list_by_author(&self, author: &UserId) -> Result<ReviewFeed, FeedError> {
        let filters = vec![Filter::eq("email", author.as_str())];
        let query = self
            .documents
            .watch(model::REVIEWS, filters, Some(OrderBy::desc("createdAt")))
            .await?;
        Ok(ReviewFeed { inner: query })
    }

    /// Client-side search over the most recently observed feed snapshot.
    pub async fn search(&self) -> Result<SearchSession, FeedError> {
        Ok(SearchSession::new(self.list_feed().await?))
    }

    /// Best-effort removal of an uploaded object whose document write
    /// never landed.
    async fn reclaim_upload(&self, key: &MediaKey) {
        match self.media.delete(key).await {
            Ok(_) => warn!(%key, "review write failed; uploaded image reclaimed"),
            Err(err) => {
                warn!(%key, %err, "review write failed and uploaded image could not be reclaimed")
            }
        }
    }

    /// Fire-and-forget cascade: failures are logged, never surfaced.
    /// Readers treat likes on deleted reviews as absent, so stragglers
    /// are benign.
    async fn cascade_likes(&self, review_id: &DocumentId) {
        let filter = [Filter::eq("postId", review_id.as_str())];
        let likes = match self.documents.query(model::LIKES, &filter, None).await {
            Ok(likes) => likes,
            Err(err) => {
                warn!(review = %review_id, %err, "could not enumerate likes for cascade delete");
                return;
            }
        };
        for like in likes {
            if let Err(err) = self.documents.delete(model::LIKES, &like.id).await {
                warn!(review = %review_id, like = %like.id, %err, "cascade delete of like failed");
            }
        }
    }
}

/// Point read shared by the repository and the like ledger.
pub(crate) async fn fetch_review(
    documents: &dyn DocumentStore,
    id: &DocumentId,
) -> Result<Review, FeedError> {
    let fields = documents
        .get(model::REVIEWS, id)
        .await?
        .ok_or_else(|| FeedError::NotFound(format!("review {id}")))?;
    let doc = Document {
        id: id.clone(),
        fields,
    };
    model::decode_review(&doc).ok_or_else(|| FeedError::NotFound(format!("review {id}")))
}

/// Typed live view over review documents.
pub struct ReviewFeed {
    inner: LiveQuery,
}

/// One full-snapshot emission of a review feed.
#[derive(Clone, Debug)]
pub struct ReviewSnapshot {
    /// Strictly increases across emissions of one subscription.
    pub revision: u64,
    /// The complete view, in feed order. Replaces any prior snapshot.
    pub reviews: Vec<Review>,
}

impl ReviewFeed {
    /// Next full snapshot. `None` once the subscription is cancelled or
    /// the store is gone.
    pub async fn next(&mut self) -> Option<ReviewSnapshot> {
        let event = self.inner.next().await?;
        Some(ReviewSnapshot {
            revision: event.revision,
            reviews: event.documents.iter().filter_map(model::decode_review).collect(),
        })
    }

    /// Stop the subscription; pending emissions are discarded.
    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}
