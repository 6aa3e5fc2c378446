use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use super::error::StoreError;

/// Identifier of a document within a collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A document together with the id it is stored under.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Value,
}

/// Field-equality filter.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, fields: &Value) -> bool {
        match self {
            Self::Eq { field, value } => fields.get(field) == Some(value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

/// Single-field ordering. Backends break ties on the document id so that
/// query order is deterministic.
#[derive(Clone, Debug)]
pub struct OrderBy {
    pub field: String,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Descending,
        }
    }
}

/// One full-snapshot emission of a live query.
#[derive(Clone, Debug)]
pub struct SnapshotEvent {
    /// Store-global revision; strictly increases across emissions of one
    /// subscription.
    pub revision: u64,
    /// The complete matching set, in query order. Replaces any prior view.
    pub documents: Vec<Document>,
}

/// Push-updated subscription over a filtered, ordered collection view.
///
/// Each event carries the full matching snapshot. After [`cancel`], no
/// further events are yielded; events already buffered in flight are
/// discarded. Dropping the handle cancels it.
///
/// [`cancel`]: LiveQuery::cancel
pub struct LiveQuery {
    rx: mpsc::UnboundedReceiver<SnapshotEvent>,
    cancelled: Arc<AtomicBool>,
}

impl LiveQuery {
    /// A linked producer/subscription pair for store backends.
    pub fn channel() -> (LiveQuerySender, LiveQuery) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        (
            LiveQuerySender {
                tx,
                cancelled: Arc::clone(&cancelled),
            },
            LiveQuery { rx, cancelled },
        )
    }

    /// Wait for the next snapshot. Returns `None` once the subscription is
    /// cancelled or the producer is gone.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        if self.is_cancelled() {
            return None;
        }
        let event = self.rx.recv().await?;
        if self.is_cancelled() {
            return None;
        }
        Some(event)
    }

    /// Stop the subscription. Buffered events are discarded.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Stream for LiveQuery {
    type Item = SnapshotEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SnapshotEvent>> {
        let this = self.get_mut();
        if this.is_cancelled() {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

/// Producer half handed to a store backend.
pub struct LiveQuerySender {
    tx: mpsc::UnboundedSender<SnapshotEvent>,
    cancelled: Arc<AtomicBool>,
}

impl LiveQuerySender {
    /// Deliver a snapshot. Returns `false` once the subscription is gone.
    pub fn send(&self, event: SnapshotEvent) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// Key-value document database with filtered, ordered, push-updated
/// queries. The single source of truth for all coordination state.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Allocate a fresh store-assigned document id.
    fn allocate_id(&self) -> DocumentId;

    /// Insert `fields` under a caller-chosen id.
    ///
    /// Fails with [`StoreError::Conflict`] if the id already holds a
    /// document; the check and the write are one atomic step.
    async fn insert(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Value,
    ) -> Result<(), StoreError>;

    /// Insert under a fresh store-assigned id and return it.
    async fn create(&self, collection: &str, fields: Value) -> Result<DocumentId, StoreError> {
        let id = self.allocate_id();
        self.insert(collection, &id, fields).await?;
        Ok(id)
    }

    /// Point read.
    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Value>, StoreError>;

    /// Replace the document under `id` wholesale.
    ///
    /// Fails with [`StoreError::NotFound`] if absent.
    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Value,
    ) -> Result<(), StoreError>;

    /// Delete the document under `id`. Deleting an absent id is a no-op.
    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError>;

    /// Point-in-time filtered, ordered read of a collection.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Subscribe to a filtered, ordered collection view.
    ///
    /// The current snapshot is delivered immediately; every subsequent
    /// mutation of the collection delivers a fresh full snapshot.
    async fn watch(
        &self,
        collection: &str,
        filters: Vec<Filter>,
        order: Option<OrderBy>,
    ) -> Result<LiveQuery, StoreError>;
}
