use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::document::{
    Document, DocumentId, DocumentStore, Filter, LiveQuery, LiveQuerySender, OrderBy,
    OrderDirection, SnapshotEvent,
};
use super::error::StoreError;

/// In-memory reference document store with live queries.
///
/// Every mutation bumps a store-global revision and fans a fresh full
/// snapshot out to each live query on the touched collection, so snapshot
/// revisions strictly increase per subscription.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<DocumentId, Value>>,
    revision: u64,
    watchers: Vec<Watcher>,
}

struct Watcher {
    collection: String,
    filters: Vec<Filter>,
    order: Option<OrderBy>,
    sender: LiveQuerySender,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    /// Notify every live query on `collection`, pruning dead ones.
    fn notify(&mut self, collection: &str) {
        self.revision += 1;
        let revision = self.revision;
        let collections = &self.collections;
        self.watchers.retain(|w| {
            if w.sender.is_cancelled() {
                return false;
            }
            if w.collection != collection {
                return true;
            }
            let documents = snapshot_of(collections, collection, &w.filters, w.order.as_ref());
            w.sender.send(SnapshotEvent {
                revision,
                documents,
            })
        });
    }
}

fn snapshot_of(
    collections: &HashMap<String, BTreeMap<DocumentId, Value>>,
    collection: &str,
    filters: &[Filter],
    order: Option<&OrderBy>,
) -> Vec<Document> {
    let mut documents: Vec<Document> = collections
        .get(collection)
        .into_iter()
        .flatten()
        .filter(|(_, fields)| filters.iter().all(|f| f.matches(fields)))
        .map(|(id, fields)| Document {
            id: id.clone(),
            fields: fields.clone(),
        })
        .collect();

    if let Some(order) = order {
        documents.sort_by(|a, b| compare(order, a, b));
    }
    documents
}

fn compare(order: &OrderBy, a: &Document, b: &Document) -> Ordering {
    let ord = value_cmp(a.fields.get(&order.field), b.fields.get(&order.field))
        .then_with(|| a.id.cmp(&b.id));
    match order.direction {
        OrderDirection::Ascending => ord,
        OrderDirection::Descending => ord.reverse(),
    }
}

fn value_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => json_cmp(a, b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Total order over scalar JSON values; mixed types order by type rank.
fn json_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn allocate_id(&self) -> DocumentId {
        // Time-ordered so that id tie-breaks follow creation order.
        DocumentId::new(Uuid::now_v7().to_string())
    }

    async fn insert(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        {
            let documents = inner.collections.entry(collection.to_string()).or_default();
            if documents.contains_key(id) {
                return Err(StoreError::Conflict(format!("{collection}/{id}")));
            }
            documents.insert(id.clone(), fields);
        }
        inner.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        {
            let slot = inner
                .collections
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
            *slot = fields;
        }
        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .is_some();
        if removed {
            inner.notify(collection);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(snapshot_of(&inner.collections, collection, filters, order))
    }

    async fn watch(
        &self,
        collection: &str,
        filters: Vec<Filter>,
        order: Option<OrderBy>,
    ) -> Result<LiveQuery, StoreError> {
        let mut inner = self.inner.write().await;
        let (sender, query) = LiveQuery::channel();

        let documents = snapshot_of(&inner.collections, collection, &filters, order.as_ref());
        sender.send(SnapshotEvent {
            revision: inner.revision,
            documents,
        });

        inner.watchers.push(Watcher {
            collection: collection.to_string(),
            filters,
            order,
            sender,
        });
        Ok(query)
    }
}
