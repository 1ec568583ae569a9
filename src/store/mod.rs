use async_trait::async_trait;

use crate::error::Result;
use crate::model::BookmarkRecord;

pub mod sqlite;

pub use sqlite::SqliteBookmarkStore;

/// Persistence for bookmarked public playlists
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Check whether a playlist is bookmarked
    async fn contains(&self, playlist_id: &str) -> Result<bool>;

    /// Store a new bookmark, replacing any previous snapshot with the same id
    async fn insert(&self, record: &BookmarkRecord) -> Result<()>;

    /// Remove a bookmark. Returns whether a record was removed.
    async fn delete_by_id(&self, playlist_id: &str) -> Result<bool>;

    /// Get all bookmarks, most recently saved first
    async fn get_all(&self) -> Result<Vec<BookmarkRecord>>;

    /// Overwrite the snapshot of an existing bookmark
    async fn update(&self, record: &BookmarkRecord) -> Result<()>;

    /// Get a single bookmark
    async fn get(&self, playlist_id: &str) -> Result<Option<BookmarkRecord>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|record| record.playlist_id == playlist_id))
    }
}
