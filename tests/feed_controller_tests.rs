//! Behaviour of the playlist feed controller against scripted collaborators.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

use common::{entries, entry, ids, MemoryBookmarks, MockSource};
use tubefeed::error::{ErrorKind, FeedError};
use tubefeed::feed::controller::PageFetch;
use tubefeed::model::{BookmarkRecord, PlaylistDescriptor, PlaylistKind, SortKey, SortOrder};
use tubefeed::options::ActionOutcome;
use tubefeed::store::BookmarkStore;
use tubefeed::{FeedEvent, PlaylistFeedController};

fn controller(
    kind: PlaylistKind,
    source: Arc<MockSource>,
    bookmarks: Arc<MemoryBookmarks>,
) -> PlaylistFeedController {
    PlaylistFeedController::new(
        PlaylistDescriptor::new("PL1", kind),
        source,
        bookmarks,
        SortOrder::ARRIVAL,
    )
}

fn paged_source() -> MockSource {
    MockSource::new(entries(&["A", "B", "C"]), Some("p2")).with_page(
        "p2",
        entries(&["D", "E"]),
        None,
    )
}

fn drain(rx: &mut broadcast::Receiver<FeedEvent>) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn wait_until_loading(controller: &PlaylistFeedController) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !controller.is_loading() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("request never started");
}

mod pagination {
    use super::*;

    #[tokio::test]
    async fn test_pages_append_in_order_until_exhausted() {
        let source = Arc::new(paged_source());
        let controller = controller(PlaylistKind::Public, source.clone(), Arc::default());

        let (details, feed) = assert_ok!(controller.load().await);
        assert_eq!(details.name, "Mix");
        assert_eq!(ids(feed.entries()), vec!["A", "B", "C"]);
        assert!(feed.has_more());

        let fetched = assert_ok!(controller.fetch_next_page().await);
        assert_eq!(fetched, PageFetch::Appended(2));
        assert_eq!(ids(controller.feed().entries()), vec!["A", "B", "C", "D", "E"]);

        let fetched = assert_ok!(controller.fetch_next_page().await);
        assert_eq!(fetched, PageFetch::NoOp);
        assert_eq!(source.next_page_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.feed().len(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_fetch_is_rejected() {
        let source = Arc::new(paged_source());
        let controller = Arc::new(controller(
            PlaylistKind::Public,
            source.clone(),
            Arc::default(),
        ));
        controller.load().await.unwrap();

        let gate = source.gate();
        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.fetch_next_page().await }
        });
        wait_until_loading(&controller).await;

        let second = controller.fetch_next_page().await;
        assert!(matches!(second, Err(FeedError::ReentrancyRejected)));

        source.open_gate();
        gate.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first.unwrap(), PageFetch::Appended(2));

        // exactly one request reached the source and the page landed once
        assert_eq!(source.next_page_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ids(controller.feed().entries()), vec!["A", "B", "C", "D", "E"]);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_failed_page_leaves_feed_unchanged() {
        let source = Arc::new(paged_source());
        let controller = controller(PlaylistKind::Public, source.clone(), Arc::default());
        controller.load().await.unwrap();
        let before = controller.feed();
        let mut rx = controller.subscribe();

        source.fail_next_page.store(true, Ordering::SeqCst);
        let err = assert_err!(controller.fetch_next_page().await);
        assert!(err.is_retryable());
        assert_eq!(controller.feed(), before);
        assert_eq!(controller.feed().next_cursor(), Some("p2"));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedEvent::Error { kind: ErrorKind::Network, .. })));

        // the same cursor is retried
        source.fail_next_page.store(false, Ordering::SeqCst);
        assert_eq!(controller.fetch_next_page().await.unwrap(), PageFetch::Appended(2));
    }

    #[tokio::test]
    async fn test_close_discards_in_flight_page() {
        let source = Arc::new(paged_source());
        let controller = Arc::new(controller(
            PlaylistKind::Public,
            source.clone(),
            Arc::default(),
        ));
        controller.load().await.unwrap();
        let mut rx = controller.subscribe();
        let _gate = source.gate();

        let fetch = tokio::spawn({
            let controller = controller.clone();
            async move { controller.fetch_next_page().await }
        });
        wait_until_loading(&controller).await;

        controller.close();
        let result = fetch.await.unwrap();
        assert!(matches!(result, Err(FeedError::Cancelled)));
        assert_eq!(ids(controller.feed().entries()), vec!["A", "B", "C"]);
        assert_eq!(controller.feed().next_cursor(), Some("p2"));
        assert!(!controller.is_loading());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_private_load_drains_every_page() {
        let source = Arc::new(
            MockSource::new(vec![entry("A", 1)], Some("c1"))
                .with_page("c1", vec![entry("B", 2)], Some("c2"))
                .with_page("c2", vec![entry("C", 3)], None),
        );
        let controller = controller(PlaylistKind::Private, source.clone(), Arc::default());

        let (_, feed) = controller.load().await.unwrap();
        assert_eq!(ids(feed.entries()), vec!["A", "B", "C"]);
        assert!(!feed.has_more());
        assert_eq!(
            controller.fetch_next_page().await.unwrap(),
            PageFetch::NoOp
        );
    }
}

mod loading {
    use super::*;

    #[tokio::test]
    async fn test_load_failure_keeps_controller_unloaded() {
        let source = Arc::new(paged_source());
        source.fail_playlist.store(true, Ordering::SeqCst);
        let controller = controller(PlaylistKind::Public, source.clone(), Arc::default());
        let mut rx = controller.subscribe();

        assert!(controller.load().await.is_err());
        assert!(!controller.is_loaded());
        assert!(controller.feed().is_empty());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            FeedEvent::Error {
                kind: ErrorKind::Network,
                ..
            }
        ));

        // a later retry succeeds normally
        source.fail_playlist.store(false, Ordering::SeqCst);
        assert_ok!(controller.load().await);
        assert!(controller.is_loaded());
    }

    #[tokio::test]
    async fn test_load_emits_header_view_and_summary() {
        let controller = controller(
            PlaylistKind::Public,
            Arc::new(paged_source()),
            Arc::default(),
        );
        let mut rx = controller.subscribe();
        controller.load().await.unwrap();

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedEvent::DetailsChanged(d) if d.name == "Mix")));
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedEvent::FeedChanged(view) if view.len() == 3)));
        assert!(events.contains(&FeedEvent::SummaryChanged(
            "Uploader • 3 videos".to_string()
        )));
        assert_eq!(controller.summary(), "Uploader • 3 videos");
        assert_eq!(controller.video_count_summary(None), "3 videos");
    }

    #[tokio::test]
    async fn test_close_discards_in_flight_load() {
        let source = Arc::new(paged_source());
        let controller = Arc::new(controller(
            PlaylistKind::Public,
            source.clone(),
            Arc::default(),
        ));
        let _gate = source.gate();

        let load = tokio::spawn({
            let controller = controller.clone();
            async move { controller.load().await }
        });
        wait_until_loading(&controller).await;

        controller.close();
        let result = load.await.unwrap();
        assert!(matches!(result, Err(FeedError::Cancelled)));
        assert!(!controller.is_loaded());
        assert!(controller.feed().is_empty());
        assert!(!controller.is_loading());

        assert!(matches!(
            controller.fetch_next_page().await,
            Err(FeedError::Cancelled)
        ));
    }
}

mod sorting {
    use super::*;

    #[tokio::test]
    async fn test_sort_changes_view_not_feed() {
        let source = Arc::new(MockSource::new(
            vec![entry("A", 30), entry("B", 10), entry("C", 20)],
            Some("p2"),
        )
        .with_page("p2", vec![entry("D", 5)], None));
        let controller = controller(PlaylistKind::Public, source, Arc::default());
        controller.load().await.unwrap();

        let view = controller.set_sort_key(SortKey::Duration, true);
        assert_eq!(view.titles(), vec!["B", "C", "A"]);
        assert_eq!(view.canonical_index(0), Some(1));

        let view = controller.set_sort_key(SortKey::Duration, false);
        assert_eq!(view.titles(), vec!["A", "C", "B"]);
        assert_eq!(ids(controller.feed().entries()), vec!["A", "B", "C"]);

        // the chosen order applies to appended pages too
        controller.fetch_next_page().await.unwrap();
        assert_eq!(controller.view().titles(), vec!["A", "C", "B", "D"]);
        assert_eq!(
            controller.sort_order(),
            SortOrder::new(SortKey::Duration, false)
        );
    }

    #[tokio::test]
    async fn test_shuffle_leaves_feed_alone() {
        let videos: Vec<_> = (0..20).map(|i| entry(&format!("v{}", i), i)).collect();
        let controller = controller(
            PlaylistKind::Public,
            Arc::new(MockSource::new(videos, None)),
            Arc::default(),
        );
        controller.load().await.unwrap();
        let before = controller.feed();

        let queue = controller.shuffled_queue();
        assert_eq!(queue.len(), 20);
        assert_eq!(controller.feed(), before);

        let mut shuffled = ids(&queue);
        let mut canonical = ids(before.entries());
        shuffled.sort_unstable();
        canonical.sort_unstable();
        assert_eq!(shuffled, canonical);
    }
}

mod removal {
    use super::*;

    #[tokio::test]
    async fn test_remove_from_private_playlist() {
        let source = Arc::new(MockSource::new(entries(&["A", "B", "C"]), None));
        let controller = controller(PlaylistKind::Private, source.clone(), Arc::default());
        controller.load().await.unwrap();
        let mut rx = controller.subscribe();

        let removed = assert_ok!(controller.remove_at(1).await);
        assert_eq!(removed.id, "B");
        assert_eq!(ids(controller.feed().entries()), vec!["A", "C"]);
        assert_eq!(*source.removed.lock().unwrap(), vec![("B".to_string(), 1)]);

        let events = drain(&mut rx);
        assert!(events.contains(&FeedEvent::SummaryChanged(
            "Uploader • 2 videos".to_string()
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, FeedEvent::ThumbnailChanged(_))));
    }

    #[tokio::test]
    async fn test_rejected_removal_restores_entry() {
        let source = Arc::new(MockSource::new(entries(&["A", "B", "C"]), None));
        source.fail_remove.store(true, Ordering::SeqCst);
        let controller = controller(PlaylistKind::Private, source.clone(), Arc::default());
        controller.load().await.unwrap();
        let before = controller.feed();
        let mut rx = controller.subscribe();

        let err = assert_err!(controller.remove_at(2).await);
        assert!(matches!(err, FeedError::Server { .. }));
        assert_eq!(controller.feed(), before);
        assert_eq!(controller.summary(), "Uploader • 3 videos");

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            FeedEvent::Error { kind: ErrorKind::Server, message } if message.contains("not owned")
        )));
    }

    #[tokio::test]
    async fn test_overlapping_removal_is_rejected() {
        let source = Arc::new(MockSource::new(entries(&["A", "B", "C"]), None));
        source.fail_remove.store(true, Ordering::SeqCst);
        let controller = Arc::new(controller(
            PlaylistKind::Private,
            source.clone(),
            Arc::default(),
        ));
        controller.load().await.unwrap();
        let before = controller.feed();

        let gate = source.gate();
        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.remove_at(0).await }
        });
        wait_until_loading(&controller).await;
        assert_eq!(ids(controller.feed().entries()), vec!["B", "C"]);

        // a second removal must not run against the shortened feed
        assert!(matches!(
            controller.remove_at(0).await,
            Err(FeedError::ReentrancyRejected)
        ));
        assert_eq!(ids(controller.feed().entries()), vec!["B", "C"]);

        source.open_gate();
        gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first, Err(FeedError::Server { .. })));

        assert_eq!(controller.feed(), before);
        assert!(source.removed.lock().unwrap().is_empty());
        assert!(!controller.is_loading());

        // serialized removals work again once the first one settled
        source.fail_remove.store(false, Ordering::SeqCst);
        assert_eq!(controller.remove_at(1).await.unwrap().id, "B");
        assert_eq!(ids(controller.feed().entries()), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_close_during_removal_restores_quietly() {
        let source = Arc::new(MockSource::new(entries(&["A", "B", "C"]), None));
        let controller = Arc::new(controller(
            PlaylistKind::Private,
            source.clone(),
            Arc::default(),
        ));
        controller.load().await.unwrap();
        let before = controller.feed();
        let _gate = source.gate();

        let removal = tokio::spawn({
            let controller = controller.clone();
            async move { controller.remove_at(1).await }
        });
        wait_until_loading(&controller).await;
        let mut rx = controller.subscribe();

        controller.close();
        let result = removal.await.unwrap();
        assert!(matches!(result, Err(FeedError::Cancelled)));
        assert_eq!(controller.feed(), before);
        assert!(!controller.is_loading());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_removing_first_entry_updates_thumbnail() {
        let source = Arc::new(MockSource::new(entries(&["A", "B"]), None));
        let controller = controller(PlaylistKind::Private, source, Arc::default());
        controller.load().await.unwrap();
        let mut rx = controller.subscribe();

        controller.remove_at(0).await.unwrap();

        let events = drain(&mut rx);
        assert!(events.contains(&FeedEvent::ThumbnailChanged(
            "https://img.example.com/B.jpg".to_string()
        )));
        assert_eq!(
            controller.thumbnail_url().as_deref(),
            Some("https://img.example.com/B.jpg")
        );
    }

    #[tokio::test]
    async fn test_invalid_removals_are_rejected() {
        let public = controller(
            PlaylistKind::Public,
            Arc::new(MockSource::new(entries(&["A"]), None)),
            Arc::default(),
        );
        public.load().await.unwrap();
        assert!(matches!(
            public.remove_at(0).await,
            Err(FeedError::Unsupported(_))
        ));
        assert_eq!(public.feed().len(), 1);

        let private = controller(
            PlaylistKind::Private,
            Arc::new(MockSource::new(entries(&["A"]), None)),
            Arc::default(),
        );
        private.load().await.unwrap();
        assert!(matches!(
            private.remove_at(1).await,
            Err(FeedError::InvalidIndex { index: 1, len: 1 })
        ));
        assert_eq!(private.feed().len(), 1);
    }

    #[tokio::test]
    async fn test_summary_tracks_feed_length_after_edits() {
        let source = Arc::new(MockSource::new(entries(&["A", "B", "C", "D"]), None));
        let controller = controller(PlaylistKind::Private, source, Arc::default());
        controller.load().await.unwrap();

        controller.remove_at(3).await.unwrap();
        controller.remove_at(0).await.unwrap();
        assert_eq!(controller.feed().len(), 2);
        assert_eq!(controller.summary(), "Uploader • 2 videos");
        assert_eq!(controller.view().len(), controller.feed().len());
    }
}

mod bookmarks {
    use super::*;
    use tubefeed::model::PlaylistDetails;

    fn mix_details() -> PlaylistDetails {
        common::details("Mix")
    }

    #[tokio::test]
    async fn test_diverged_bookmark_is_refreshed() {
        let bookmarks = Arc::new(MemoryBookmarks::default());
        let stored = BookmarkRecord::from_parts("PL1", &mix_details(), &entries(&["X", "Y"]));
        bookmarks.insert(&stored).await.unwrap();

        let source = Arc::new(MockSource::new(entries(&["X", "Y", "Z"]), None));
        let controller = controller(PlaylistKind::Public, source, bookmarks.clone());
        controller.load().await.unwrap();

        let refreshed = bookmarks.get("PL1").await.unwrap().unwrap();
        assert_eq!(ids(&refreshed.videos), vec!["X", "Y", "Z"]);
        assert_eq!(refreshed.saved_at, stored.saved_at);
        assert_eq!(bookmarks.updates.load(Ordering::SeqCst), 1);

        // nothing drifted the second time around
        controller.load().await.unwrap();
        assert_eq!(bookmarks.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbookmarked_playlist_is_not_written() {
        let bookmarks = Arc::new(MemoryBookmarks::default());
        let controller = controller(
            PlaylistKind::Public,
            Arc::new(MockSource::new(entries(&["X"]), None)),
            bookmarks.clone(),
        );
        controller.load().await.unwrap();
        // a missing record is enough, no separate existence check
        assert_eq!(bookmarks.contains_calls.load(Ordering::SeqCst), 0);

        assert!(!bookmarks.contains("PL1").await.unwrap());
        assert_eq!(bookmarks.updates.load(Ordering::SeqCst), 0);
        assert!(!controller.refresh_bookmark().await.unwrap());
    }

    #[tokio::test]
    async fn test_bookmark_write_failure_does_not_fail_load() {
        let bookmarks = Arc::new(MemoryBookmarks::default());
        bookmarks
            .insert(&BookmarkRecord::from_parts("PL1", &mix_details(), &[]))
            .await
            .unwrap();
        bookmarks.fail_writes.store(true, Ordering::SeqCst);

        let controller = controller(
            PlaylistKind::Public,
            Arc::new(MockSource::new(entries(&["X"]), None)),
            bookmarks.clone(),
        );
        assert_ok!(controller.load().await);
        assert!(controller.is_loaded());
        assert!(controller.refresh_bookmark().await.is_err());
    }
}

mod outcomes {
    use super::*;

    #[tokio::test]
    async fn test_rename_and_description_update_header() {
        let controller = controller(
            PlaylistKind::Private,
            Arc::new(MockSource::new(entries(&["A"]), None)),
            Arc::default(),
        );
        controller.load().await.unwrap();
        let mut rx = controller.subscribe();

        controller.apply_outcome(&ActionOutcome::Renamed("Road trip".to_string()));
        controller.apply_outcome(&ActionOutcome::DescriptionChanged("Summer".to_string()));

        let details = controller.details().unwrap();
        assert_eq!(details.name, "Road trip");
        assert_eq!(details.description.as_deref(), Some("Summer"));
        assert_eq!(
            drain(&mut rx)
                .iter()
                .filter(|e| matches!(e, FeedEvent::DetailsChanged(_)))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_successful_delete_closes_controller() {
        let controller = controller(
            PlaylistKind::Private,
            Arc::new(MockSource::new(entries(&["A"]), None)),
            Arc::default(),
        );
        controller.load().await.unwrap();

        controller.apply_outcome(&ActionOutcome::Deleted { success: false });
        assert!(!controller.is_closed());

        controller.apply_outcome(&ActionOutcome::Deleted { success: true });
        assert!(controller.is_closed());
        assert!(matches!(controller.load().await, Err(FeedError::Cancelled)));
    }
}
