pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod model;
pub mod options;
pub mod player;
pub mod source;
pub mod store;

pub use error::{FeedError, Result};
pub use feed::{FeedEvent, PlaylistFeedController};
pub use options::{ActionOutcome, PlayQueue, PlaylistAction, PlaylistOptionsController};

pub mod context {
    use crate::{
        config::AppConfig,
        error::Result,
        feed::PlaylistFeedController,
        model::PlaylistDescriptor,
        options::{PlayQueue, PlaylistOptionsController},
        player::PlayerSession,
        source::{PipedClient, RemotePlaylistSource, StreamSource},
        store::{BookmarkStore, SqliteBookmarkStore},
    };
    use std::sync::Arc;

    /// Collaborators built once at startup and handed to every screen
    #[derive(Clone)]
    pub struct AppContext {
        pub config: Arc<AppConfig>,
        pub playlists: Arc<dyn RemotePlaylistSource>,
        pub streams: Arc<dyn StreamSource>,
        pub bookmarks: Arc<dyn BookmarkStore>,
    }

    impl AppContext {
        /// Connect the HTTP client and open the bookmark database
        pub async fn new(config: AppConfig) -> Result<Self> {
            let client = Arc::new(PipedClient::new(&config.api)?);
            let bookmarks = SqliteBookmarkStore::open(config.get_database_path()).await?;

            Ok(Self {
                config: Arc::new(config),
                playlists: client.clone(),
                streams: client,
                bookmarks: Arc::new(bookmarks),
            })
        }

        pub fn feed_controller(&self, descriptor: PlaylistDescriptor) -> PlaylistFeedController {
            PlaylistFeedController::new(
                descriptor,
                self.playlists.clone(),
                self.bookmarks.clone(),
                self.config.sort_order(),
            )
        }

        pub fn options_controller(
            &self,
            descriptor: PlaylistDescriptor,
            queue: Arc<dyn PlayQueue>,
        ) -> PlaylistOptionsController {
            PlaylistOptionsController::new(
                descriptor,
                self.playlists.clone(),
                self.bookmarks.clone(),
                queue,
                self.config.share.frontend_url.clone(),
            )
        }

        pub fn player_session(&self) -> PlayerSession {
            PlayerSession::new(
                self.streams.clone(),
                self.config.player.segment_categories.clone(),
            )
        }
    }
}
