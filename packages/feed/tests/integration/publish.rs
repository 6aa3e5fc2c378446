use std::sync::Arc;

use async_trait::async_trait;
use common::store::{
    Document, DocumentId, DocumentStore, Filter, LiveQuery, OrderBy, StoreError,
};
use common::store::MediaStore;
use common::store::filesystem::FilesystemMediaStore;
use common::store::memory::MemoryDocumentStore;
use feed::FeedError;
use feed::model::REVIEWS;
use feed::repository::ReviewRepository;
use serde_json::Value;

use crate::common::TestApp;

mod publish_flow {
    use super::*;

    #[tokio::test]
    async fn published_review_is_retrievable_under_its_id() {
        let app = TestApp::spawn().await;
        app.sign_in("a@x.com");

        let id = app
            .repo
            .publish(TestApp::draft("Dune", "에세이"))
            .await
            .unwrap();

        let review = app.repo.get(&id).await.unwrap();
        assert_eq!(review.id, id);
        assert_eq!(review.title, "Dune");
        assert_eq!(review.genre, "에세이");
        assert_eq!(review.email.as_str(), "a@x.com");
        assert_eq!(review.created_at, review.updated_at);
    }

    #[tokio::test]
    async fn image_url_points_at_the_uploaded_object() {
        let app = TestApp::spawn().await;
        app.sign_in("a@x.com");

        let id = app
            .repo
            .publish(TestApp::draft("Dune", "에세이"))
            .await
            .unwrap();

        let review = app.repo.get(&id).await.unwrap();
        assert!(
            review
                .image_url
                .starts_with("http://localhost:3000/media/images/"),
            "unexpected image URL: {}",
            review.image_url
        );
        assert!(review.image_url.ends_with(".jpg"));

        // The URL resolves back to a durable object in the media store.
        let key = review
            .image_url
            .strip_prefix("http://localhost:3000/media/")
            .unwrap();
        let key = common::store::MediaKey::new(key).unwrap();
        assert_eq!(app.media.resolve_url(&key).await.unwrap(), review.image_url);
    }

    #[tokio::test]
    async fn publish_requires_sign_in() {
        let app = TestApp::spawn().await;

        let result = app.repo.publish(TestApp::draft("Dune", "에세이")).await;
        assert!(matches!(result, Err(FeedError::AuthRequired)));
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_before_any_store_traffic() {
        let app = TestApp::spawn().await;
        app.sign_in("a@x.com");

        let mut draft = TestApp::draft("", "에세이");
        let result = app.repo.publish(draft.clone()).await;
        assert!(matches!(result, Err(FeedError::Validation(_))));

        draft.title = "Dune".into();
        draft.image = Vec::new();
        let result = app.repo.publish(draft).await;
        assert!(matches!(result, Err(FeedError::Validation(_))));

        // Nothing was uploaded or written.
        let reviews = app.documents.query(REVIEWS, &[], None).await.unwrap();
        assert!(reviews.is_empty());
    }
}

mod publish_failures {
    use super::*;

    #[tokio::test]
    async fn upload_failure_leaves_no_document() {
        let media_dir = tempfile::tempdir().unwrap();
        let documents = Arc::new(MemoryDocumentStore::new());
        // Limit far below the draft image size.
        let media = Arc::new(
            FilesystemMediaStore::new(media_dir.path().join("objects"), "http://x/media", 2)
                .await
                .unwrap(),
        );
        let identity = Arc::new(common::identity::SessionIdentity::signed_in(
            common::identity::UserId::new("a@x.com"),
        ));
        let repo = ReviewRepository::new(documents.clone(), media, identity);

        let result = repo.publish(TestApp::draft("Dune", "에세이")).await;
        assert!(matches!(result, Err(FeedError::MediaUpload(_))));

        let reviews = documents.query(REVIEWS, &[], None).await.unwrap();
        assert!(reviews.is_empty());
    }

    #[tokio::test]
    async fn metadata_failure_reclaims_the_uploaded_object() {
        let media_dir = tempfile::tempdir().unwrap();
        let documents = Arc::new(InsertFailure {
            inner: MemoryDocumentStore::new(),
            collection: REVIEWS,
        });
        let media = Arc::new(
            FilesystemMediaStore::new(
                media_dir.path().join("objects"),
                "http://x/media",
                1024 * 1024,
            )
            .await
            .unwrap(),
        );
        let identity = Arc::new(common::identity::SessionIdentity::signed_in(
            common::identity::UserId::new("a@x.com"),
        ));
        let repo = ReviewRepository::new(documents, media, identity);

        let result = repo.publish(TestApp::draft("Dune", "에세이")).await;
        assert!(matches!(result, Err(FeedError::MetadataWrite(_))));

        // The orphaned upload was reclaimed.
        assert_eq!(object_count(&media_dir.path().join("objects")), 0);
    }

    fn object_count(root: &std::path::Path) -> usize {
        let mut count = 0;
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            if dir.file_name().is_some_and(|n| n == ".tmp") {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    count += 1;
                }
            }
        }
        count
    }

    /// Delegates to an inner store but fails every insert into one
    /// collection.
    struct InsertFailure {
        inner: MemoryDocumentStore,
        collection: &'static str,
    }

    #[async_trait]
    impl DocumentStore for InsertFailure {
        fn allocate_id(&self) -> DocumentId {
            self.inner.allocate_id()
        }

        async fn insert(
            &self,
            collection: &str,
            id: &DocumentId,
            fields: Value,
        ) -> Result<(), StoreError> {
            if collection == self.collection {
                return Err(StoreError::Unavailable("injected insert failure".into()));
            }
            self.inner.insert(collection, id, fields).await
        }

        async fn get(
            &self,
            collection: &str,
            id: &DocumentId,
        ) -> Result<Option<Value>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn update(
            &self,
            collection: &str,
            id: &DocumentId,
            fields: Value,
        ) -> Result<(), StoreError> {
            self.inner.update(collection, id, fields).await
        }

        async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
            self.inner.delete(collection, id).await
        }

        async fn query(
            &self,
            collection: &str,
            filters: &[Filter],
            order: Option<&OrderBy>,
        ) -> Result<Vec<Document>, StoreError> {
            self.inner.query(collection, filters, order).await
        }

        async fn watch(
            &self,
            collection: &str,
            filters: Vec<Filter>,
            order: Option<OrderBy>,
        ) -> Result<LiveQuery, StoreError> {
            self.inner.watch(collection, filters, order).await
        }
    }
}
