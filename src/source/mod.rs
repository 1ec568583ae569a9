use async_trait::async_trait;

use crate::error::Result;
use crate::model::{NextPage, PlaylistKind, PlaylistPage, Segment, StreamInfo};

pub mod piped;

pub use piped::PipedClient;

/// Remote playlist operations the controllers depend on
#[async_trait]
pub trait RemotePlaylistSource: Send + Sync {
    /// Fetch a playlist header and its first page of videos
    async fn get_playlist(&self, id: &str, kind: PlaylistKind) -> Result<PlaylistPage>;

    /// Fetch the page identified by `cursor`
    async fn get_next_page(&self, id: &str, kind: PlaylistKind, cursor: &str) -> Result<NextPage>;

    /// Delete a playlist. `Ok(false)` means the remote refused.
    async fn delete_playlist(&self, id: &str, kind: PlaylistKind) -> Result<bool>;

    /// Copy a public playlist into the user's account, returning the new id
    async fn clone_playlist(&self, id: &str) -> Result<String>;

    async fn rename_playlist(&self, id: &str, new_name: &str) -> Result<()>;

    async fn update_description(&self, id: &str, new_description: &str) -> Result<()>;

    /// Remove the video at canonical position `index` from a private playlist
    async fn remove_video(&self, id: &str, video_id: &str, index: usize) -> Result<()>;
}

/// Per-video stream lookups used by the player session
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn get_streams(&self, video_id: &str) -> Result<StreamInfo>;

    async fn get_segments(&self, video_id: &str, categories: &[String]) -> Result<Vec<Segment>>;
}
