use common::identity::UserId;
use common::store::DocumentStore;
use feed::model::REVIEWS;
use feed::projection::LikeButton;

use crate::common::{TestApp, settle};

mod feed_snapshots {
    use super::*;

    #[tokio::test]
    async fn feed_lists_reviews_newest_first() {
        let app = TestApp::spawn().await;
        app.publish_as("a@x.com", "Dune", "에세이").await;
        settle().await;
        app.publish_as("b@x.com", "Foundation", "문학 소설").await;

        let mut feed = app.repo.list_feed().await.unwrap();
        let snapshot = feed.next().await.unwrap();
        let titles: Vec<_> = snapshot.reviews.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Foundation", "Dune"]);
    }

    #[tokio::test]
    async fn feed_pushes_a_snapshot_per_mutation() {
        let app = TestApp::spawn().await;
        let mut feed = app.repo.list_feed().await.unwrap();
        let initial = feed.next().await.unwrap();
        assert!(initial.reviews.is_empty());

        let id = app.publish_as("a@x.com", "Dune", "에세이").await;

        let after_publish = feed.next().await.unwrap();
        assert_eq!(after_publish.reviews.len(), 1);
        assert_eq!(after_publish.reviews[0].id, id);
        assert!(after_publish.revision > initial.revision);

        app.repo.remove(&id).await.unwrap();
        let after_remove = feed.next().await.unwrap();
        assert!(after_remove.reviews.is_empty());
    }

    #[tokio::test]
    async fn cancelled_feed_yields_nothing_more() {
        let app = TestApp::spawn().await;
        let mut feed = app.repo.list_feed().await.unwrap();
        feed.next().await.unwrap();

        // Buffered after subscription, discarded by the cancel.
        app.publish_as("a@x.com", "Dune", "에세이").await;
        feed.cancel();

        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn author_feed_only_lists_their_reviews() {
        let app = TestApp::spawn().await;
        app.publish_as("a@x.com", "Dune", "에세이").await;
        settle().await;
        app.publish_as("b@x.com", "Foundation", "문학 소설").await;
        settle().await;
        app.publish_as("a@x.com", "Hyperion", "기타").await;

        let mut mine = app
            .repo
            .list_by_author(&UserId::new("a@x.com"))
            .await
            .unwrap();
        let snapshot = mine.next().await.unwrap();
        let titles: Vec<_> = snapshot.reviews.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Hyperion", "Dune"]);
    }

    #[tokio::test]
    async fn undecodable_documents_never_surface() {
        let app = TestApp::spawn().await;
        app.publish_as("a@x.com", "Dune", "에세이").await;
        app.documents
            .insert(
                REVIEWS,
                &common::store::DocumentId::new("corrupt"),
                serde_json::json!({"title": 42}),
            )
            .await
            .unwrap();

        let mut feed = app.repo.list_feed().await.unwrap();
        let snapshot = feed.next().await.unwrap();
        assert_eq!(snapshot.reviews.len(), 1);
        assert_eq!(snapshot.reviews[0].title, "Dune");
    }
}

mod liked_feed {
    use super::*;

    #[tokio::test]
    async fn liked_reviews_arrive_in_like_order() {
        let app = TestApp::spawn().await;
        let dune = app.publish_as("a@x.com", "Dune", "에세이").await;
        let foundation = app.publish_as("a@x.com", "Foundation", "문학 소설").await;

        app.sign_in("b@x.com");
        app.ledger.like(&dune).await.unwrap();
        settle().await;
        app.ledger.like(&foundation).await.unwrap();

        let mut liked = app.ledger.list_liked().await.unwrap();
        let snapshot = liked.next().await.unwrap();
        let titles: Vec<_> = snapshot.reviews.iter().map(|r| r.title.as_str()).collect();
        // Most recently liked first, regardless of publish order.
        assert_eq!(titles, ["Foundation", "Dune"]);
    }

    #[tokio::test]
    async fn liked_feed_updates_live() {
        let app = TestApp::spawn().await;
        let dune = app.publish_as("a@x.com", "Dune", "에세이").await;

        app.sign_in("b@x.com");
        let mut liked = app.ledger.list_liked().await.unwrap();
        assert!(liked.next().await.unwrap().reviews.is_empty());

        app.ledger.like(&dune).await.unwrap();
        let snapshot = liked.next().await.unwrap();
        assert_eq!(snapshot.reviews.len(), 1);
        assert_eq!(snapshot.reviews[0].id, dune);
    }

    #[tokio::test]
    async fn likes_of_other_users_stay_invisible() {
        let app = TestApp::spawn().await;
        let dune = app.publish_as("a@x.com", "Dune", "에세이").await;

        app.sign_in("c@x.com");
        app.ledger.like(&dune).await.unwrap();

        app.sign_in("b@x.com");
        let mut liked = app.ledger.list_liked().await.unwrap();
        assert!(liked.next().await.unwrap().reviews.is_empty());
    }

    #[tokio::test]
    async fn dangling_likes_are_skipped() {
        let app = TestApp::spawn().await;
        let dune = app.publish_as("a@x.com", "Dune", "에세이").await;

        app.sign_in("b@x.com");
        app.ledger.like(&dune).await.unwrap();

        // Delete the review out from under the like, bypassing the
        // repository cascade, to leave a dangling reference.
        app.documents.delete(REVIEWS, &dune).await.unwrap();

        let mut liked = app.ledger.list_liked().await.unwrap();
        let snapshot = liked.next().await.unwrap();
        assert!(snapshot.reviews.is_empty());
    }
}

mod search {
    use super::*;

    #[tokio::test]
    async fn search_matches_title_and_genre_case_insensitively() {
        let app = TestApp::spawn().await;
        app.publish_as("a@x.com", "Dune", "에세이").await;
        settle().await;
        app.publish_as("b@x.com", "Foo", "SF").await;

        let mut session = app.repo.search().await.unwrap();
        assert!(session.sync().await);

        let hits = session.query("dune");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Dune");

        let hits = session.query("에세이");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Dune");

        let hits = session.query("sf");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Foo");

        assert_eq!(session.query("").len(), 2);
        assert!(session.query("zzz").is_empty());
    }

    #[tokio::test]
    async fn search_sees_reviews_published_after_subscribing() {
        let app = TestApp::spawn().await;
        let mut session = app.repo.search().await.unwrap();
        assert!(session.sync().await);
        assert!(session.query("dune").is_empty());

        app.publish_as("a@x.com", "Dune", "에세이").await;
        assert!(session.sync().await);
        assert_eq!(session.query("dune").len(), 1);
    }
}

mod projection {
    use super::*;

    #[tokio::test]
    async fn like_button_follows_viewer_relationship() {
        let app = TestApp::spawn().await;
        let id = app.publish_as("a@x.com", "Dune", "에세이").await;
        let review = app.repo.get(&id).await.unwrap();

        // Author sees no button on their own review.
        let items = app.projection.project(vec![review.clone()]).await.unwrap();
        assert!(items[0].is_own_review);
        assert!(!items[0].viewer_has_liked);
        assert_eq!(items[0].like_button, LikeButton::Hidden);

        // Signed-out viewers get a disabled button.
        app.sign_out();
        let items = app.projection.project(vec![review.clone()]).await.unwrap();
        assert!(!items[0].is_own_review);
        assert_eq!(items[0].like_button, LikeButton::SignedOut);

        // A stranger may like; after liking, the state flips.
        app.sign_in("b@x.com");
        let items = app.projection.project(vec![review.clone()]).await.unwrap();
        assert_eq!(items[0].like_button, LikeButton::Ready);

        app.ledger.like(&id).await.unwrap();
        let items = app.projection.project(vec![review]).await.unwrap();
        assert!(items[0].viewer_has_liked);
        assert_eq!(items[0].like_button, LikeButton::AlreadyLiked);
    }

    #[tokio::test]
    async fn subscribed_feed_arrives_pre_projected() {
        let app = TestApp::spawn().await;
        let id = app.publish_as("a@x.com", "Dune", "에세이").await;

        app.sign_in("b@x.com");
        app.ledger.like(&id).await.unwrap();

        let mut projected = app.projection.subscribe().await.unwrap();
        let items = projected.next().await.unwrap().unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].viewer_has_liked);
        assert_eq!(items[0].like_button, LikeButton::AlreadyLiked);

        projected.cancel();
        assert!(projected.next().await.is_none());
    }
}
