use std::sync::Arc;

use chrono::Utc;
use common::identity::{IdentityProvider, UserId};
use common::store::{Document, DocumentId, DocumentStore, Filter, LiveQuery, OrderBy, StoreError};
use tracing::{debug, warn};

use crate::error::FeedError;
use crate::model::{self, Like};
use crate::repository::{ReviewSnapshot, fetch_review};

/// Owns like relationships: at most one per (user, review), never on the
/// user's own review.
#[derive(Clone)]
pub struct LikeLedger {
    documents: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl LikeLedger {
    pub fn new(documents: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            documents,
            identity,
        }
    }

    fn acting_user(&self) -> Result<UserId, FeedError> {
        self.identity.current_user().ok_or(FeedError::AuthRequired)
    }

    /// Record a like by the acting user.
    ///
    /// Uniqueness lives in the like key itself: a concurrent second like
    /// for the same pair loses the insert with a store conflict, so
    /// exactly one record can ever persist.
    pub async fn like(&self, review_id: &DocumentId) -> Result<(), FeedError> {
        let user = self.acting_user()?;
        let review = fetch_review(self.documents.as_ref(), review_id).await?;
        if review.email == user {
            return Err(FeedError::SelfLike);
        }

        let like = Like {
            user_email: user.clone(),
            post_id: review_id.clone(),
            timestamp: Utc::now(),
        };
        let fields = model::encode(&like)?;
        let key = model::like_key(&user, review_id);
        match self.documents.insert(model::LIKES, &key, fields).await {
            Ok(()) => {
                debug!(%key, "like recorded");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => Err(FeedError::DuplicateLike),
            Err(other) => Err(other.into()),
        }
    }

    /// Remove the acting user's like. Succeeds as a no-op if none exists.
    pub async fn unlike(&self, review_id: &DocumentId) -> Result<(), FeedError> {
        let user = self.acting_user()?;
        let key = model::like_key(&user, review_id);
        self.documents.delete(model::LIKES, &key).await?;
        Ok(())
    }

    /// Point-in-time: has `user` liked `review_id`?
    pub async fn has_liked(&self, user: &UserId, review_id: &DocumentId) -> Result<bool, FeedError> {
        let key = model::like_key(user, review_id);
        Ok(self.documents.get(model::LIKES, &key).await?.is_some())
    }

    /// Live view of the reviews the acting user has liked, most recently
    /// liked first.
    pub async fn list_liked(&self) -> Result<LikedFeed, FeedError> {
        let user = self.acting_user()?;
        let filters = vec![Filter::eq("userEmail", user.as_str())];
        let query = self
            .documents
            .watch(model::LIKES, filters, Some(OrderBy::desc("timestamp")))
            .await?;
        Ok(LikedFeed {
            inner: query,
            documents: Arc::clone(&self.documents),
        })
    }
}

/// Live join of a user's likes to their reviews.
///
/// Each emission batch-resolves the referenced reviews and yields them in
/// like-time order; likes pointing at deleted reviews drop out of the
/// join.
pub struct LikedFeed {
    inner: LiveQuery,
    documents: Arc<dyn DocumentStore>,
}

impl LikedFeed {
    /// Next snapshot of liked reviews. `None` once the subscription is
    /// cancelled or the store is gone.
    pub async fn next(&mut self) -> Option<ReviewSnapshot> {
        let event = self.inner.next().await?;
        let likes: Vec<Like> = event.documents.iter().filter_map(model::decode_like).collect();

        let mut reviews = Vec::with_capacity(likes.len());
        for like in likes {
            match self.documents.get(model::REVIEWS, &like.post_id).await {
                Ok(Some(fields)) => {
                    let doc = Document {
                        id: like.post_id.clone(),
                        fields,
                    };
                    if let Some(review) = model::decode_review(&doc) {
                        reviews.push(review);
                    }
                }
                // Review deleted since the like; dangling, skip.
                Ok(None) => {}
                Err(err) => {
                    warn!(review = %like.post_id, %err, "liked review could not be resolved")
                }
            }
        }

        Some(ReviewSnapshot {
            revision: event.revision,
            reviews,
        })
    }

    /// Stop the subscription; pending emissions are discarded.
    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}
