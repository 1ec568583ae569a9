//! Canonical playlist feed and the sorted views derived from it.

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::model::{SortKey, SortOrder, VideoEntry};

pub mod controller;

pub use controller::{FeedEvent, PlaylistFeedController};

/// Arrival-ordered materialization of a playlist plus the cursor of the next page
///
/// Pagination only ever appends. Removal and rollback are the only operations
/// that touch existing positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistFeed {
    entries: Vec<VideoEntry>,
    next_cursor: Option<String>,
}

impl PlaylistFeed {
    pub fn new(entries: Vec<VideoEntry>, next_cursor: Option<String>) -> Self {
        Self {
            entries,
            next_cursor,
        }
    }

    pub fn entries(&self) -> &[VideoEntry] {
        &self.entries
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&VideoEntry> {
        self.entries.first()
    }

    /// Append a page at the tail and move the cursor
    pub(crate) fn append_page(&mut self, videos: Vec<VideoEntry>, next_cursor: Option<String>) {
        self.entries.extend(videos);
        self.next_cursor = next_cursor;
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<VideoEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Put a removed entry back, clamped to the current tail
    pub(crate) fn restore(&mut self, index: usize, entry: VideoEntry) {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
    }

    /// Randomly permuted copy of the entries; the feed itself is untouched
    pub fn shuffled(&self) -> Vec<VideoEntry> {
        let mut queue = self.entries.clone();
        queue.shuffle(&mut thread_rng());
        queue
    }
}

/// Display order over a feed snapshot
///
/// Holds the canonical index of every displayed row so that a position picked
/// in the view can be mapped back before editing the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedView {
    order: SortOrder,
    indices: Vec<usize>,
    entries: Vec<VideoEntry>,
}

impl SortedView {
    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn entries(&self) -> &[VideoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, display_index: usize) -> Option<&VideoEntry> {
        self.entries.get(display_index)
    }

    /// Canonical feed position of the row shown at `display_index`
    pub fn canonical_index(&self, display_index: usize) -> Option<usize> {
        self.indices.get(display_index).copied()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.title.as_str()).collect()
    }
}

/// Compute the displayed order of `feed`
///
/// Ascending uses a stable sort on the key; descending is the exact reverse of
/// the ascending result, ties included.
pub fn sort_view(feed: &PlaylistFeed, order: SortOrder) -> SortedView {
    let entries = feed.entries();
    let mut indices: Vec<usize> = (0..entries.len()).collect();

    match order.key {
        SortKey::Arrival => {}
        SortKey::Duration => indices.sort_by_key(|&i| entries[i].duration_seconds),
        SortKey::Title => indices.sort_by(|&a, &b| entries[a].title.cmp(&entries[b].title)),
    }

    if !order.ascending {
        indices.reverse();
    }

    let sorted = indices.iter().map(|&i| entries[i].clone()).collect();
    SortedView {
        order,
        indices,
        entries: sorted,
    }
}
