use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{sort_view, PlaylistFeed, SortedView};
use crate::error::{ErrorKind, FeedError, Result};
use crate::model::{
    BookmarkRecord, PlaylistDescriptor, PlaylistDetails, PlaylistKind, SortKey, SortOrder,
    VideoEntry,
};
use crate::options::ActionOutcome;
use crate::source::RemotePlaylistSource;
use crate::store::BookmarkStore;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications for the display layer
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The displayed order or its contents changed
    FeedChanged(SortedView),
    /// The "uploader • n videos" line changed
    SummaryChanged(String),
    /// The first entry changed, so did the header thumbnail
    ThumbnailChanged(String),
    DetailsChanged(PlaylistDetails),
    Error { kind: ErrorKind, message: String },
}

/// Result of a successful [`PlaylistFeedController::fetch_next_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFetch {
    /// This many entries were appended to the canonical feed
    Appended(usize),
    /// The feed is exhausted, nothing was requested
    NoOp,
}

#[derive(Debug, Default)]
struct FeedState {
    feed: PlaylistFeed,
    details: Option<PlaylistDetails>,
    order: SortOrder,
}

/// Clears the in-flight flag when the request finishes or its future is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the materialized feed of one playlist for the lifetime of a screen
///
/// Remote calls happen without holding the state lock; every mutation of the
/// feed is applied in a single locked section once the call has completed, so
/// a result is either fully applied or discarded.
pub struct PlaylistFeedController {
    descriptor: PlaylistDescriptor,
    source: Arc<dyn RemotePlaylistSource>,
    bookmarks: Arc<dyn BookmarkStore>,
    state: Mutex<FeedState>,
    in_flight: AtomicBool,
    cancel: CancellationToken,
    events: broadcast::Sender<FeedEvent>,
}

impl PlaylistFeedController {
    pub fn new(
        descriptor: PlaylistDescriptor,
        source: Arc<dyn RemotePlaylistSource>,
        bookmarks: Arc<dyn BookmarkStore>,
        order: SortOrder,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            descriptor,
            source,
            bookmarks,
            state: Mutex::new(FeedState {
                order,
                ..Default::default()
            }),
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            events,
        }
    }

    pub fn descriptor(&self) -> &PlaylistDescriptor {
        &self.descriptor
    }

    /// Receive display notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: FeedEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_error(&self, err: &FeedError) {
        self.emit(FeedEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    fn emit_view(&self, state: &FeedState) {
        self.emit(FeedEvent::FeedChanged(sort_view(&state.feed, state.order)));
        self.emit(FeedEvent::SummaryChanged(summary_text(
            state.details.as_ref().and_then(|d| d.uploader.as_deref()),
            state.feed.len(),
        )));
    }

    fn begin_request(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FeedError::ReentrancyRejected)?;
        Ok(InFlight(&self.in_flight))
    }

    /// Await `fut` unless the controller gets closed first
    async fn cancellable<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FeedError::Cancelled),
            result = fut => result,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(FeedError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Fetch the playlist and replace the feed with its first page
    ///
    /// Private playlists are drained page by page here so their feed is
    /// complete once this returns. On failure nothing is changed.
    pub async fn load(&self) -> Result<(PlaylistDetails, PlaylistFeed)> {
        self.ensure_open()?;
        let _guard = self.begin_request()?;
        let id = self.descriptor.id.as_str();
        let kind = self.descriptor.kind;

        info!(playlist_id = %id, kind = %kind, "Loading playlist");

        let result = async {
            let page = self.cancellable(self.source.get_playlist(id, kind)).await?;
            let mut videos = page.videos;
            let mut cursor = page.next_cursor;

            if kind == PlaylistKind::Private {
                while let Some(next) = cursor.take() {
                    let more = self
                        .cancellable(self.source.get_next_page(id, kind, &next))
                        .await?;
                    videos.extend(more.videos);
                    cursor = more.next_cursor;
                }
            }

            Ok::<_, FeedError>((page.details, PlaylistFeed::new(videos, cursor)))
        }
        .await;

        let (details, feed) = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(playlist_id = %id, error = %err, "Failed to load playlist");
                if !matches!(err, FeedError::Cancelled) {
                    self.emit_error(&err);
                }
                return Err(err);
            }
        };

        {
            let mut state = self.state();
            self.ensure_open()?;
            state.feed = feed.clone();
            state.details = Some(details.clone());
            self.emit(FeedEvent::DetailsChanged(details.clone()));
            self.emit(FeedEvent::ThumbnailChanged(details.thumbnail_url.clone()));
            self.emit_view(&state);
        }

        debug!(playlist_id = %id, videos = feed.len(), has_more = feed.has_more(), "Playlist loaded");

        if kind == PlaylistKind::Public {
            // a stale snapshot is not worth failing the load over
            if let Err(err) = self.refresh_bookmark().await {
                warn!(playlist_id = %id, error = %err, "Failed to refresh bookmark");
            }
        }

        Ok((details, feed))
    }

    /// Append the next page, if any
    ///
    /// Returns [`FeedError::ReentrancyRejected`] while another load or page
    /// request is in flight. On failure the feed and cursor are unchanged.
    pub async fn fetch_next_page(&self) -> Result<PageFetch> {
        self.ensure_open()?;
        let cursor = match self.state().feed.next_cursor() {
            Some(cursor) => cursor.to_string(),
            None => return Ok(PageFetch::NoOp),
        };
        let _guard = self.begin_request()?;
        let id = self.descriptor.id.as_str();

        debug!(playlist_id = %id, cursor = %cursor, "Fetching next page");

        let page = match self
            .cancellable(self.source.get_next_page(id, self.descriptor.kind, &cursor))
            .await
        {
            Ok(page) => page,
            Err(err) => {
                warn!(playlist_id = %id, error = %err, "Failed to fetch next page");
                if !matches!(err, FeedError::Cancelled) {
                    self.emit_error(&err);
                }
                return Err(err);
            }
        };

        let appended = page.videos.len();
        {
            let mut state = self.state();
            self.ensure_open()?;
            state.feed.append_page(page.videos, page.next_cursor);
            self.emit_view(&state);
        }

        debug!(playlist_id = %id, appended, "Next page appended");
        Ok(PageFetch::Appended(appended))
    }

    /// Change the display order. Nothing is refetched.
    pub fn set_sort_key(&self, key: SortKey, ascending: bool) -> SortedView {
        let mut state = self.state();
        state.order = SortOrder::new(key, ascending);
        let view = sort_view(&state.feed, state.order);
        self.emit(FeedEvent::FeedChanged(view.clone()));
        view
    }

    /// Current display order over the current feed snapshot
    pub fn view(&self) -> SortedView {
        let state = self.state();
        sort_view(&state.feed, state.order)
    }

    pub fn sort_order(&self) -> SortOrder {
        self.state().order
    }

    /// Remove the entry at canonical position `index`
    ///
    /// Only private playlists can be edited. The entry disappears immediately
    /// and is put back at its position if the remote rejects the removal.
    /// Shares the in-flight guard with paging, so a second removal (or a page
    /// request) during the remote call gets [`FeedError::ReentrancyRejected`].
    pub async fn remove_at(&self, index: usize) -> Result<VideoEntry> {
        self.ensure_open()?;
        if self.descriptor.kind != PlaylistKind::Private {
            return Err(FeedError::Unsupported(
                "videos can only be removed from private playlists".to_string(),
            ));
        }
        let _guard = self.begin_request()?;

        let removed = {
            let mut state = self.state();
            let len = state.feed.len();
            let removed = state
                .feed
                .remove(index)
                .ok_or(FeedError::InvalidIndex { index, len })?;
            self.emit_removal_effects(&state, index);
            removed
        };

        let id = self.descriptor.id.as_str();
        let result = self
            .cancellable(self.source.remove_video(id, &removed.id, index))
            .await;

        match result {
            Ok(()) => {
                info!(playlist_id = %id, video_id = %removed.id, index, "Removed video");
                Ok(removed)
            }
            Err(err) => {
                warn!(playlist_id = %id, video_id = %removed.id, error = %err, "Removal rejected, restoring");
                // restored even after close so the feed keeps matching the remote
                let mut state = self.state();
                state.feed.restore(index, removed);
                if !self.is_closed() {
                    self.emit_removal_effects(&state, index);
                    drop(state);
                    self.emit_error(&err);
                }
                Err(err)
            }
        }
    }

    fn emit_removal_effects(&self, state: &FeedState, index: usize) {
        if index == 0 {
            let thumbnail = state
                .feed
                .first()
                .map(|e| e.thumbnail_url.clone())
                .unwrap_or_default();
            self.emit(FeedEvent::ThumbnailChanged(thumbnail));
        }
        self.emit_view(state);
    }

    /// Randomly ordered copy of the feed for an external play queue
    pub fn shuffled_queue(&self) -> Vec<VideoEntry> {
        self.state().feed.shuffled()
    }

    /// Summary line for the given uploader and the current feed length
    pub fn video_count_summary(&self, uploader: Option<&str>) -> String {
        summary_text(uploader, self.state().feed.len())
    }

    /// Summary line using the loaded uploader name
    pub fn summary(&self) -> String {
        let state = self.state();
        summary_text(
            state.details.as_ref().and_then(|d| d.uploader.as_deref()),
            state.feed.len(),
        )
    }

    /// Header thumbnail: the first entry's, falling back to the playlist's own
    pub fn thumbnail_url(&self) -> Option<String> {
        let state = self.state();
        state
            .feed
            .first()
            .map(|e| e.thumbnail_url.clone())
            .or_else(|| state.details.as_ref().map(|d| d.thumbnail_url.clone()))
    }

    pub fn feed(&self) -> PlaylistFeed {
        self.state().feed.clone()
    }

    pub fn details(&self) -> Option<PlaylistDetails> {
        self.state().details.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state().details.is_some()
    }

    /// A load, page request or removal is waiting on the remote
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Update the stored bookmark if the loaded playlist drifted from it
    ///
    /// Returns whether the snapshot was rewritten.
    pub async fn refresh_bookmark(&self) -> Result<bool> {
        let id = self.descriptor.id.as_str();
        let Some(stored) = self.bookmarks.get(id).await? else {
            return Ok(false);
        };

        let live = {
            let state = self.state();
            let Some(details) = state.details.as_ref() else {
                return Ok(false);
            };
            if !stored.diverges_from(details, state.feed.entries()) {
                return Ok(false);
            }
            let mut record = BookmarkRecord::from_parts(id, details, state.feed.entries());
            record.saved_at = stored.saved_at;
            record
        };

        self.ensure_open()?;
        self.bookmarks.update(&live).await?;
        info!(playlist_id = %id, videos = live.videos.len(), "Bookmark snapshot updated");
        Ok(true)
    }

    /// Reflect an accepted option result into the header
    pub fn apply_outcome(&self, outcome: &ActionOutcome) {
        if let ActionOutcome::Deleted { success: true } = outcome {
            self.close();
            return;
        }

        let details = {
            let mut state = self.state();
            let Some(details) = state.details.as_mut() else {
                return;
            };
            match outcome {
                ActionOutcome::Renamed(name) => details.name = name.clone(),
                ActionOutcome::DescriptionChanged(description) => {
                    details.description = Some(description.clone())
                }
                _ => return,
            }
            details.clone()
        };

        self.emit(FeedEvent::DetailsChanged(details));
    }

    /// Tear down: in-flight requests are abandoned and their results dropped
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!(playlist_id = %self.descriptor.id, "Closing feed controller");
            self.cancel.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PlaylistFeedController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn summary_text(uploader: Option<&str>, count: usize) -> String {
    match uploader.filter(|u| !u.is_empty()) {
        Some(uploader) => format!("{} • {} videos", uploader, count),
        None => format!("{} videos", count),
    }
}
