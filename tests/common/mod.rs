//! In-memory doubles for the remote source, bookmark store and play queue.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use tubefeed::error::{FeedError, Result};
use tubefeed::model::{
    BookmarkRecord, NextPage, PlaylistDetails, PlaylistKind, PlaylistPage, VideoEntry,
};
use tubefeed::options::PlayQueue;
use tubefeed::source::RemotePlaylistSource;
use tubefeed::store::BookmarkStore;

pub fn entry(id: &str, duration: u64) -> VideoEntry {
    VideoEntry::from_url(
        format!("/watch?v={}", id),
        id,
        format!("https://img.example.com/{}.jpg", id),
        duration,
    )
}

pub fn entries(ids: &[&str]) -> Vec<VideoEntry> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| entry(id, 10 * (i as u64 + 1)))
        .collect()
}

pub fn ids(entries: &[VideoEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.id.as_str()).collect()
}

pub fn details(name: &str) -> PlaylistDetails {
    PlaylistDetails {
        name: name.to_string(),
        thumbnail_url: "https://img.example.com/playlist.jpg".to_string(),
        uploader: Some("Uploader".to_string()),
        ..Default::default()
    }
}

/// Scripted remote: a first page plus continuation pages keyed by cursor
#[derive(Default)]
pub struct MockSource {
    first: Mutex<Option<PlaylistPage>>,
    pages: Mutex<HashMap<String, NextPage>>,
    gate: Mutex<Option<Arc<Notify>>>,
    pub fail_playlist: AtomicBool,
    pub fail_next_page: AtomicBool,
    pub fail_remove: AtomicBool,
    pub refuse_delete: AtomicBool,
    pub playlist_calls: AtomicUsize,
    pub next_page_calls: AtomicUsize,
    pub removed: Mutex<Vec<(String, usize)>>,
    pub renamed: Mutex<Vec<String>>,
    pub descriptions: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new(videos: Vec<VideoEntry>, next_cursor: Option<&str>) -> Self {
        let source = Self::default();
        source.set_first_page(videos, next_cursor);
        source
    }

    pub fn set_first_page(&self, videos: Vec<VideoEntry>, next_cursor: Option<&str>) {
        *self.first.lock().unwrap() = Some(PlaylistPage {
            details: details("Mix"),
            videos,
            next_cursor: next_cursor.map(str::to_string),
        });
    }

    pub fn with_page(self, cursor: &str, videos: Vec<VideoEntry>, next_cursor: Option<&str>) -> Self {
        self.pages.lock().unwrap().insert(
            cursor.to_string(),
            NextPage {
                videos,
                next_cursor: next_cursor.map(str::to_string),
            },
        );
        self
    }

    /// Hold every following request until the returned handle is notified
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn open_gate(&self) {
        *self.gate.lock().unwrap() = None;
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl RemotePlaylistSource for MockSource {
    async fn get_playlist(&self, _id: &str, _kind: PlaylistKind) -> Result<PlaylistPage> {
        self.playlist_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.fail_playlist.load(Ordering::SeqCst) {
            return Err(FeedError::Network("connection reset".to_string()));
        }
        self.first.lock().unwrap().clone().ok_or(FeedError::NotFound)
    }

    async fn get_next_page(&self, _id: &str, _kind: PlaylistKind, cursor: &str) -> Result<NextPage> {
        self.next_page_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if self.fail_next_page.load(Ordering::SeqCst) {
            return Err(FeedError::Network("timeout".to_string()));
        }
        self.pages
            .lock()
            .unwrap()
            .get(cursor)
            .cloned()
            .ok_or(FeedError::NotFound)
    }

    async fn delete_playlist(&self, id: &str, _kind: PlaylistKind) -> Result<bool> {
        if self.refuse_delete.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(true)
    }

    async fn clone_playlist(&self, id: &str) -> Result<String> {
        Ok(format!("{}-copy", id))
    }

    async fn rename_playlist(&self, _id: &str, new_name: &str) -> Result<()> {
        self.renamed.lock().unwrap().push(new_name.to_string());
        Ok(())
    }

    async fn update_description(&self, _id: &str, new_description: &str) -> Result<()> {
        self.descriptions
            .lock()
            .unwrap()
            .push(new_description.to_string());
        Ok(())
    }

    async fn remove_video(&self, _id: &str, video_id: &str, index: usize) -> Result<()> {
        self.wait_for_gate().await;
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(FeedError::server("Playlist not owned by user"));
        }
        self.removed
            .lock()
            .unwrap()
            .push((video_id.to_string(), index));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBookmarks {
    records: Mutex<HashMap<String, BookmarkRecord>>,
    pub fail_writes: AtomicBool,
    pub updates: AtomicUsize,
    pub contains_calls: AtomicUsize,
}

impl MemoryBookmarks {
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(FeedError::Storage("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BookmarkStore for MemoryBookmarks {
    async fn contains(&self, playlist_id: &str) -> Result<bool> {
        self.contains_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().contains_key(playlist_id))
    }

    async fn insert(&self, record: &BookmarkRecord) -> Result<()> {
        self.check_writable()?;
        self.records
            .lock()
            .unwrap()
            .insert(record.playlist_id.clone(), record.clone());
        Ok(())
    }

    async fn delete_by_id(&self, playlist_id: &str) -> Result<bool> {
        self.check_writable()?;
        Ok(self.records.lock().unwrap().remove(playlist_id).is_some())
    }

    async fn get_all(&self) -> Result<Vec<BookmarkRecord>> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn update(&self, record: &BookmarkRecord) -> Result<()> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&record.playlist_id) {
            Some(existing) => {
                *existing = record.clone();
                self.updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(FeedError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    pub preloaded: bool,
    pub playing: Mutex<Option<(String, String)>>,
    pub queued: Mutex<Vec<VideoEntry>>,
}

impl PlayQueue for RecordingQueue {
    fn has_items(&self) -> bool {
        self.preloaded || !self.queued.lock().unwrap().is_empty()
    }

    fn play_in_background(&self, video_id: &str, playlist_id: &str) {
        *self.playing.lock().unwrap() = Some((video_id.to_string(), playlist_id.to_string()));
    }

    fn enqueue(&self, _playlist_id: &str, entries: Vec<VideoEntry>) {
        self.queued.lock().unwrap().extend(entries);
    }
}
