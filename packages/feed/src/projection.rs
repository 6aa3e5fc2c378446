use std::sync::Arc;

use common::identity::{IdentityProvider, UserId};

use crate::error::FeedError;
use crate::ledger::LikeLedger;
use crate::model::Review;
use crate::repository::{ReviewFeed, ReviewRepository};

/// Like-button rendering state for one feed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeButton {
    /// The viewer authored this review; no button is shown.
    Hidden,
    /// No signed-in viewer; the button is shown disabled.
    SignedOut,
    /// The viewer may like this review.
    Ready,
    /// The viewer has already liked this review.
    AlreadyLiked,
}

/// View-ready feed record.
#[derive(Clone, Debug)]
pub struct FeedItem {
    pub review: Review,
    pub viewer_has_liked: bool,
    pub is_own_review: bool,
    pub like_button: LikeButton,
}

/// Stateless composition of review snapshots with the viewer's like
/// state. The viewer is resolved per projection, so a sign-in or
/// sign-out between emissions takes effect on the next one.
#[derive(Clone)]
pub struct FeedProjection {
    repository: ReviewRepository,
    ledger: LikeLedger,
    identity: Arc<dyn IdentityProvider>,
}

impl FeedProjection {
    pub fn new(
        repository: ReviewRepository,
        ledger: LikeLedger,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            repository,
            ledger,
            identity,
        }
    }

    /// Project one snapshot for the current viewer.
    pub async fn project(&self, reviews: Vec<Review>) -> Result<Vec<FeedItem>, FeedError> {
        let viewer = self.identity.current_user();
        let mut items = Vec::with_capacity(reviews.len());
        for review in reviews {
            items.push(self.item_for(&viewer, review).await?);
        }
        Ok(items)
    }

    /// Live feed with every emission pre-projected for the viewer.
    pub async fn subscribe(&self) -> Result<ProjectedFeed, FeedError> {
        Ok(ProjectedFeed {
            feed: self.repository.list_feed().await?,
            projection: self.clone(),
        })
    }

    async fn item_for(
        &self,
        viewer: &Option<UserId>,
        review: Review,
    ) -> Result<FeedItem, FeedError> {
        let is_own_review = viewer.as_ref().is_some_and(|v| *v == review.email);
        let viewer_has_liked = match viewer {
            // Own reviews can never carry the viewer's like.
            Some(v) if !is_own_review => self.ledger.has_liked(v, &review.id).await?,
            _ => false,
        };
        Ok(FeedItem {
            like_button: button_state(is_own_review, viewer.is_some(), viewer_has_liked),
            review,
            viewer_has_liked,
            is_own_review,
        })
    }
}

fn button_state(is_own_review: bool, signed_in: bool, has_liked: bool) -> LikeButton {
    if is_own_review {
        LikeButton::Hidden
    } else if !signed_in {
        LikeButton::SignedOut
    } else if has_liked {
        LikeButton::AlreadyLiked
    } else {
        LikeButton::Ready
    }
}

/// Live feed whose emissions arrive pre-projected.
pub struct ProjectedFeed {
    feed: ReviewFeed,
    projection: FeedProjection,
}

impl ProjectedFeed {
    pub async fn next(&mut self) -> Option<Result<Vec<FeedItem>, FeedError>> {
        let snapshot = self.feed.next().await?;
        Some(self.projection.project(snapshot.reviews).await)
    }

    pub fn cancel(&mut self) {
        self.feed.cancel();
    }
}

/// Holds the latest observed feed snapshot and answers substring queries
/// against it. `query` is cheap and meant to be re-run per keystroke.
pub struct SearchSession {
    feed: ReviewFeed,
    snapshot: Vec<Review>,
}

impl SearchSession {
    pub(crate) fn new(feed: ReviewFeed) -> Self {
        Self {
            feed,
            snapshot: Vec::new(),
        }
    }

    /// Replace the held snapshot with the next feed emission. Returns
    /// `false` once the subscription has ended.
    pub async fn sync(&mut self) -> bool {
        match self.feed.next().await {
            Some(snapshot) => {
                self.snapshot = snapshot.reviews;
                true
            }
            None => false,
        }
    }

    /// Case-insensitive substring match on title or genre. The empty
    /// query returns the full snapshot.
    pub fn query(&self, text: &str) -> Vec<Review> {
        if text.is_empty() {
            return self.snapshot.clone();
        }
        let needle = text.to_lowercase();
        self.snapshot
            .iter()
            .filter(|review| matches_query(review, &needle))
            .cloned()
            .collect()
    }

    pub fn cancel(&mut self) {
        self.feed.cancel();
    }
}

/// `needle` must already be lowercased.
fn matches_query(review: &Review, needle: &str) -> bool {
    review.title.to_lowercase().contains(needle) || review.genre.to_lowercase().contains(needle)
}
