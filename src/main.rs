use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

use tubefeed::{
    config::AppConfig,
    context::AppContext,
    feed::controller::PageFetch,
    logging,
    model::{PlaylistDescriptor, PlaylistKind, SortOrder, VideoEntry},
    options::{ActionOutcome, PlayQueue, PlaylistAction},
    player,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and manage video playlists from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API instance URL (overrides config)
    #[arg(long)]
    instance: Option<String>,

    /// Account token for private playlists (overrides config)
    #[arg(long)]
    token: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Target {
    /// Playlist id
    id: String,

    /// Treat the playlist as one owned by the logged in account
    #[arg(short, long)]
    private: bool,
}

impl Target {
    fn descriptor(&self) -> PlaylistDescriptor {
        let kind = if self.private {
            PlaylistKind::Private
        } else {
            PlaylistKind::Public
        };
        PlaylistDescriptor::new(&self.id, kind)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a playlist
    Show {
        #[command(flatten)]
        target: Target,
        /// Display order, e.g. `duration-desc` (defaults to the saved preference)
        #[arg(short, long)]
        sort: Option<SortOrder>,
        /// Remember the given sort order
        #[arg(long, requires = "sort")]
        save_sort: bool,
        /// Additional pages to fetch after the first one
        #[arg(long, default_value_t = 0)]
        pages: usize,
        /// Print a shuffled play order instead of the sorted view
        #[arg(long)]
        shuffle: bool,
    },
    /// List the menu entries available for a playlist
    Menu {
        #[command(flatten)]
        target: Target,
    },
    /// Start playing the first video in the background
    Play {
        #[command(flatten)]
        target: Target,
    },
    /// Add every video of the playlist to the play queue
    Enqueue {
        #[command(flatten)]
        target: Target,
    },
    /// Print a share link
    Share { id: String },
    /// Copy a public playlist into the account
    Clone { id: String },
    /// Add or remove a bookmark
    Bookmark { id: String },
    /// List bookmarked playlists
    Bookmarks,
    /// Rename a private playlist
    Rename { id: String, name: String },
    /// Change the description of a private playlist
    Describe { id: String, description: String },
    /// Delete a private playlist
    Delete { id: String },
    /// Remove the video at a position from a private playlist
    Remove { id: String, index: usize },
    /// Show stream info and skippable segments of a video
    Streams { video_id: String },
}

/// Play queue that reports what it was handed
#[derive(Default)]
struct ConsoleQueue {
    items: Mutex<Vec<VideoEntry>>,
}

impl PlayQueue for ConsoleQueue {
    fn has_items(&self) -> bool {
        !self
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn play_in_background(&self, video_id: &str, playlist_id: &str) {
        println!("Playing {} from playlist {}", video_id, playlist_id);
    }

    fn enqueue(&self, playlist_id: &str, entries: Vec<VideoEntry>) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        println!("Queued {} videos from playlist {}", entries.len(), playlist_id);
        items.extend(entries);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<(AppConfig, PathBuf)> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let mut config = AppConfig::load_or_create(&path)?;

    // Apply command line overrides
    if let Some(instance) = &cli.instance {
        config.api.instance_url = instance.clone();
    }
    if let Some(token) = &cli.token {
        config.api.auth_token = Some(token.clone());
    }

    Ok((config, path))
}

fn print_entries(entries: &[VideoEntry]) {
    for (position, entry) in entries.iter().enumerate() {
        println!(
            "{:>4}  {:<12} {:>6}  {}",
            position,
            entry.id,
            format_duration(entry.duration_seconds),
            entry.title
        );
    }
}

fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn print_outcome(outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::PlaybackStarted { .. } | ActionOutcome::Enqueued(_) => {}
        ActionOutcome::NothingToPlay => println!("Playlist is empty"),
        ActionOutcome::ShareLink(link) => println!("{}", link),
        ActionOutcome::Cloned { playlist_id } => println!("Cloned as {}", playlist_id),
        ActionOutcome::BookmarkChanged { bookmarked } => {
            println!("{}", if *bookmarked { "Bookmarked" } else { "Bookmark removed" })
        }
        ActionOutcome::Renamed(name) => println!("Renamed to {}", name),
        ActionOutcome::DescriptionChanged(_) => println!("Description updated"),
        ActionOutcome::Deleted { success } => {
            println!("{}", if *success { "Deleted" } else { "Delete was refused" })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging_with_options(cli.log_level.as_deref(), cli.debug)?;

    let (config, config_path) = load_config(&cli)?;
    logging::log_startup_info(&config);

    let ctx = AppContext::new(config)
        .await
        .context("Failed to initialize application context")?;
    let queue: Arc<dyn PlayQueue> = Arc::new(ConsoleQueue::default());

    match cli.command {
        Commands::Show {
            target,
            sort,
            save_sort,
            pages,
            shuffle,
        } => {
            let controller = ctx.feed_controller(target.descriptor());
            let (details, _) = controller.load().await?;

            for _ in 0..pages {
                match controller.fetch_next_page().await? {
                    PageFetch::Appended(_) => {}
                    PageFetch::NoOp => break,
                }
            }

            if let Some(order) = sort {
                controller.set_sort_key(order.key, order.ascending);
                if save_sort {
                    // reread so command line overrides are not persisted
                    let mut stored = AppConfig::load_from_file(&config_path)?;
                    stored.set_sort_order(order);
                    stored.save_to_file(&config_path)?;
                    info!("Saved sort order {}", order);
                }
            }

            println!("{}", details.name);
            if let Some(description) = details.description.as_deref().filter(|d| !d.is_empty()) {
                println!("{}", description);
            }
            println!("{}", controller.summary());
            if controller.feed().has_more() {
                println!("(more pages available)");
            }
            println!();

            if shuffle {
                print_entries(&controller.shuffled_queue());
            } else {
                print_entries(controller.view().entries());
            }
        }
        Commands::Menu { target } => {
            let options = ctx.options_controller(target.descriptor(), queue);
            for action in options.actions().await? {
                println!("{}", action);
            }
        }
        Commands::Play { target } => {
            let options = ctx.options_controller(target.descriptor(), queue);
            print_outcome(&options.execute(PlaylistAction::PlayInBackground).await?);
        }
        Commands::Enqueue { target } => {
            let options = ctx.options_controller(target.descriptor(), queue);
            if let ActionOutcome::Enqueued(0) = options.enqueue_all().await? {
                println!("Playlist is empty");
            }
        }
        Commands::Share { id } => {
            let descriptor = PlaylistDescriptor::new(id, PlaylistKind::Public);
            let options = ctx.options_controller(descriptor, queue);
            print_outcome(&options.execute(PlaylistAction::Share).await?);
        }
        Commands::Clone { id } => {
            let descriptor = PlaylistDescriptor::new(id, PlaylistKind::Public);
            let options = ctx.options_controller(descriptor, queue);
            print_outcome(&options.execute(PlaylistAction::Clone).await?);
        }
        Commands::Bookmark { id } => {
            let descriptor = PlaylistDescriptor::new(id, PlaylistKind::Public);
            let options = ctx.options_controller(descriptor, queue);
            print_outcome(&options.toggle_bookmark().await?);
        }
        Commands::Bookmarks => {
            let bookmarks = ctx.bookmarks.get_all().await?;
            if bookmarks.is_empty() {
                println!("No bookmarks");
            }
            for bookmark in bookmarks {
                println!(
                    "{:<36} {} ({} videos)",
                    bookmark.playlist_id, bookmark.playlist_name, bookmark.total_videos
                );
            }
        }
        Commands::Rename { id, name } => {
            let descriptor = PlaylistDescriptor::new(id, PlaylistKind::Private);
            let options = ctx.options_controller(descriptor, queue);
            print_outcome(&options.execute(PlaylistAction::Rename(name)).await?);
        }
        Commands::Describe { id, description } => {
            let descriptor = PlaylistDescriptor::new(id, PlaylistKind::Private);
            let options = ctx.options_controller(descriptor, queue);
            print_outcome(
                &options
                    .execute(PlaylistAction::ChangeDescription(description))
                    .await?,
            );
        }
        Commands::Delete { id } => {
            let descriptor = PlaylistDescriptor::new(id, PlaylistKind::Private);
            let options = ctx.options_controller(descriptor, queue);
            print_outcome(&options.execute(PlaylistAction::Delete).await?);
        }
        Commands::Remove { id, index } => {
            let controller =
                ctx.feed_controller(PlaylistDescriptor::new(id, PlaylistKind::Private));
            controller.load().await?;
            let removed = controller.remove_at(index).await?;
            println!("Removed {} ({})", removed.title, removed.id);
            println!("{}", controller.summary());
        }
        Commands::Streams { video_id } => {
            let mut session = ctx.player_session();
            let info = match session.fetch_video_info(&video_id).await {
                Ok(info) => info,
                Err(err) => {
                    warn!(video_id = %video_id, error = %err, "Stream lookup failed");
                    anyhow::bail!(player::error_message(&err));
                }
            };
            session.fetch_segments(&video_id).await;

            println!("{} - {}", info.title, info.uploader);
            println!("Duration: {}", format_duration(info.duration_seconds));
            if let Some(hls) = &info.hls_url {
                println!("HLS: {}", hls);
            }
            for segment in session.segments() {
                println!(
                    "Skip {}: {:.1}s - {:.1}s",
                    segment.category, segment.start, segment.end
                );
            }
        }
    }

    Ok(())
}
