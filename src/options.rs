//! Playlist option menu: a fixed set of commands dispatched on a tagged enum.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FeedError, Result};
use crate::model::{BookmarkRecord, PlaylistDescriptor, PlaylistKind, VideoEntry};
use crate::source::RemotePlaylistSource;
use crate::store::BookmarkStore;

/// External play queue the options hand their results to
pub trait PlayQueue: Send + Sync {
    /// Whether anything is queued (enables "add to queue")
    fn has_items(&self) -> bool;

    /// Start background playback of `video_id` within `playlist_id`
    fn play_in_background(&self, video_id: &str, playlist_id: &str);

    /// Append entries to the end of the queue
    fn enqueue(&self, playlist_id: &str, entries: Vec<VideoEntry>);
}

/// A user-selectable playlist option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistAction {
    PlayInBackground,
    AddToQueue,
    Share,
    Clone,
    AddBookmark,
    RemoveBookmark,
    Rename(String),
    ChangeDescription(String),
    Delete,
}

impl PlaylistAction {
    /// Whether the action applies to playlists of `kind`
    pub fn applies_to(&self, kind: PlaylistKind) -> bool {
        match self {
            PlaylistAction::PlayInBackground | PlaylistAction::AddToQueue => true,
            PlaylistAction::Share
            | PlaylistAction::Clone
            | PlaylistAction::AddBookmark
            | PlaylistAction::RemoveBookmark => kind == PlaylistKind::Public,
            PlaylistAction::Rename(_)
            | PlaylistAction::ChangeDescription(_)
            | PlaylistAction::Delete => kind == PlaylistKind::Private,
        }
    }
}

impl fmt::Display for PlaylistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaylistAction::PlayInBackground => "Play in background",
            PlaylistAction::AddToQueue => "Add to queue",
            PlaylistAction::Share => "Share",
            PlaylistAction::Clone => "Clone playlist",
            PlaylistAction::AddBookmark => "Add to bookmarks",
            PlaylistAction::RemoveBookmark => "Remove bookmark",
            PlaylistAction::Rename(_) => "Rename playlist",
            PlaylistAction::ChangeDescription(_) => "Change description",
            PlaylistAction::Delete => "Delete playlist",
        };
        f.write_str(label)
    }
}

/// What an executed action did, for the caller to reflect on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    PlaybackStarted { video_id: String },
    /// The playlist had no entries to play
    NothingToPlay,
    Enqueued(usize),
    ShareLink(String),
    Cloned { playlist_id: String },
    BookmarkChanged { bookmarked: bool },
    Renamed(String),
    DescriptionChanged(String),
    /// The caller navigates away when `success` is set
    Deleted { success: bool },
}

/// Menu entries for a playlist, in display order
pub fn available_actions(
    kind: PlaylistKind,
    queue_has_items: bool,
    is_bookmarked: bool,
) -> Vec<PlaylistAction> {
    let mut actions = vec![PlaylistAction::PlayInBackground];

    if queue_has_items {
        actions.push(PlaylistAction::AddToQueue);
    }

    match kind {
        PlaylistKind::Public => {
            actions.push(PlaylistAction::Share);
            actions.push(PlaylistAction::Clone);
            actions.push(if is_bookmarked {
                PlaylistAction::RemoveBookmark
            } else {
                PlaylistAction::AddBookmark
            });
        }
        PlaylistKind::Private => {
            actions.push(PlaylistAction::Rename(String::new()));
            actions.push(PlaylistAction::ChangeDescription(String::new()));
            actions.push(PlaylistAction::Delete);
        }
    }

    actions
}

/// Executes playlist options against the remote source and bookmark store
///
/// Every call is independent; the controller keeps no state between them.
pub struct PlaylistOptionsController {
    descriptor: PlaylistDescriptor,
    source: Arc<dyn RemotePlaylistSource>,
    bookmarks: Arc<dyn BookmarkStore>,
    queue: Arc<dyn PlayQueue>,
    share_base_url: String,
}

impl PlaylistOptionsController {
    pub fn new(
        descriptor: PlaylistDescriptor,
        source: Arc<dyn RemotePlaylistSource>,
        bookmarks: Arc<dyn BookmarkStore>,
        queue: Arc<dyn PlayQueue>,
        share_base_url: impl Into<String>,
    ) -> Self {
        Self {
            descriptor,
            source,
            bookmarks,
            queue,
            share_base_url: share_base_url.into(),
        }
    }

    /// Menu for the current queue and bookmark state
    pub async fn actions(&self) -> Result<Vec<PlaylistAction>> {
        let is_bookmarked = match self.descriptor.kind {
            PlaylistKind::Public => self.bookmarks.contains(&self.descriptor.id).await?,
            PlaylistKind::Private => false,
        };
        Ok(available_actions(
            self.descriptor.kind,
            self.queue.has_items(),
            is_bookmarked,
        ))
    }

    /// Run one action
    pub async fn execute(&self, action: PlaylistAction) -> Result<ActionOutcome> {
        if !action.applies_to(self.descriptor.kind) {
            return Err(FeedError::Unsupported(format!(
                "{} is not available for {} playlists",
                action, self.descriptor.kind
            )));
        }

        debug!(playlist_id = %self.descriptor.id, action = %action, "Executing playlist option");

        let result = match action {
            PlaylistAction::PlayInBackground => self.play_in_background().await,
            PlaylistAction::AddToQueue => self.enqueue_all().await,
            PlaylistAction::Share => Ok(ActionOutcome::ShareLink(self.share_link())),
            PlaylistAction::Clone => self.clone_playlist().await,
            PlaylistAction::AddBookmark | PlaylistAction::RemoveBookmark => {
                self.toggle_bookmark().await
            }
            PlaylistAction::Rename(name) => self.rename(&name).await,
            PlaylistAction::ChangeDescription(description) => {
                self.change_description(&description).await
            }
            PlaylistAction::Delete => self.delete().await,
        };

        if let Err(err) = &result {
            warn!(playlist_id = %self.descriptor.id, error = %err, "Playlist option failed");
        }
        result
    }

    pub async fn play_in_background(&self) -> Result<ActionOutcome> {
        let page = self
            .source
            .get_playlist(&self.descriptor.id, self.descriptor.kind)
            .await?;

        match page.videos.first() {
            Some(first) => {
                self.queue.play_in_background(&first.id, &self.descriptor.id);
                Ok(ActionOutcome::PlaybackStarted {
                    video_id: first.id.clone(),
                })
            }
            None => Ok(ActionOutcome::NothingToPlay),
        }
    }

    /// Fetch every page and append all entries to the play queue
    pub async fn enqueue_all(&self) -> Result<ActionOutcome> {
        let id = self.descriptor.id.as_str();
        let kind = self.descriptor.kind;

        let page = self.source.get_playlist(id, kind).await?;
        let mut entries = page.videos;
        let mut cursor = page.next_cursor;
        while let Some(next) = cursor.take() {
            let more = self.source.get_next_page(id, kind, &next).await?;
            entries.extend(more.videos);
            cursor = more.next_cursor;
        }

        let count = entries.len();
        if count > 0 {
            self.queue.enqueue(id, entries);
        }
        Ok(ActionOutcome::Enqueued(count))
    }

    pub fn share_link(&self) -> String {
        format!(
            "{}/playlist?list={}",
            self.share_base_url.trim_end_matches('/'),
            self.descriptor.id
        )
    }

    pub async fn clone_playlist(&self) -> Result<ActionOutcome> {
        let playlist_id = self
            .source
            .clone_playlist(&self.descriptor.id)
            .await
            .map_err(|err| match err {
                FeedError::Network(_) | FeedError::Server { .. } => err,
                other => FeedError::server(other.to_string()),
            })?;

        info!(source_id = %self.descriptor.id, playlist_id = %playlist_id, "Playlist cloned");
        Ok(ActionOutcome::Cloned { playlist_id })
    }

    /// Remove the bookmark if present, otherwise snapshot the playlist into one
    pub async fn toggle_bookmark(&self) -> Result<ActionOutcome> {
        let id = self.descriptor.id.as_str();

        if self.bookmarks.contains(id).await? {
            self.bookmarks.delete_by_id(id).await?;
            info!(playlist_id = %id, "Bookmark removed");
            return Ok(ActionOutcome::BookmarkChanged { bookmarked: false });
        }

        let page = self.source.get_playlist(id, self.descriptor.kind).await?;
        self.bookmarks
            .insert(&BookmarkRecord::from_page(id, &page))
            .await?;
        info!(playlist_id = %id, videos = page.videos.len(), "Bookmark added");
        Ok(ActionOutcome::BookmarkChanged { bookmarked: true })
    }

    pub async fn rename(&self, new_name: &str) -> Result<ActionOutcome> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(FeedError::Unsupported(
                "playlist name cannot be empty".to_string(),
            ));
        }

        self.source
            .rename_playlist(&self.descriptor.id, new_name)
            .await?;
        info!(playlist_id = %self.descriptor.id, name = %new_name, "Playlist renamed");
        Ok(ActionOutcome::Renamed(new_name.to_string()))
    }

    pub async fn change_description(&self, new_description: &str) -> Result<ActionOutcome> {
        self.source
            .update_description(&self.descriptor.id, new_description)
            .await?;
        info!(playlist_id = %self.descriptor.id, "Playlist description changed");
        Ok(ActionOutcome::DescriptionChanged(new_description.to_string()))
    }

    pub async fn delete(&self) -> Result<ActionOutcome> {
        let success = self
            .source
            .delete_playlist(&self.descriptor.id, self.descriptor.kind)
            .await?;
        info!(playlist_id = %self.descriptor.id, success, "Playlist delete requested");
        Ok(ActionOutcome::Deleted { success })
    }
}
