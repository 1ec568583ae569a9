use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a playlist is hosted by the platform or owned by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    /// Platform-hosted, fetched page by page, read/clone/bookmark only
    Public,
    /// User-owned, fully materialized in one fetch
    Private,
}

impl fmt::Display for PlaylistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistKind::Public => write!(f, "public"),
            PlaylistKind::Private => write!(f, "private"),
        }
    }
}

/// Identity of a playlist as known before it is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistDescriptor {
    pub id: String,
    pub kind: PlaylistKind,
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
    pub uploader_url: Option<String>,
}

impl PlaylistDescriptor {
    pub fn new(id: impl Into<String>, kind: PlaylistKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: String::new(),
            description: None,
            thumbnail_url: String::new(),
            uploader_url: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_private(&self) -> bool {
        self.kind == PlaylistKind::Private
    }
}

/// One video of a playlist. Never modified after it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
    pub duration_seconds: u64,
    #[serde(default)]
    pub uploader_name: Option<String>,
}

impl VideoEntry {
    /// Build an entry whose id is taken from a `/watch?v=<id>` style url
    pub fn from_url(
        url: impl Into<String>,
        title: impl Into<String>,
        thumbnail_url: impl Into<String>,
        duration_seconds: u64,
    ) -> Self {
        let url = url.into();
        Self {
            id: video_id_from_url(&url),
            title: title.into(),
            url,
            thumbnail_url: thumbnail_url.into(),
            duration_seconds,
            uploader_name: None,
        }
    }
}

/// Extract the video id from a watch url, falling back to the last path segment
pub fn video_id_from_url(url: &str) -> String {
    if let Some((_, query)) = url.split_once('?') {
        for pair in query.split('&') {
            if let Some(id) = pair.strip_prefix("v=") {
                return id.to_string();
            }
        }
    }

    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

/// Header information of a loaded playlist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistDetails {
    pub name: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub uploader_avatar: Option<String>,
    /// Count reported by the remote, may exceed what has been paged in
    pub total_videos: u64,
}

/// First page of a playlist as returned by the remote source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistPage {
    pub details: PlaylistDetails,
    pub videos: Vec<VideoEntry>,
    pub next_cursor: Option<String>,
}

/// A continuation page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPage {
    pub videos: Vec<VideoEntry>,
    pub next_cursor: Option<String>,
}

/// Locally persisted snapshot of a bookmarked public playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub playlist_id: String,
    pub playlist_name: String,
    pub thumbnail_url: String,
    pub uploader: Option<String>,
    pub uploader_url: Option<String>,
    pub total_videos: u64,
    pub videos: Vec<VideoEntry>,
    pub saved_at: i64,
}

impl BookmarkRecord {
    pub fn from_page(playlist_id: &str, page: &PlaylistPage) -> Self {
        Self::from_parts(playlist_id, &page.details, &page.videos)
    }

    pub fn from_parts(playlist_id: &str, details: &PlaylistDetails, videos: &[VideoEntry]) -> Self {
        Self {
            playlist_id: playlist_id.to_string(),
            playlist_name: details.name.clone(),
            thumbnail_url: details.thumbnail_url.clone(),
            uploader: details.uploader.clone(),
            uploader_url: details.uploader_url.clone(),
            total_videos: details.total_videos,
            videos: videos.to_vec(),
            saved_at: chrono::Utc::now().timestamp(),
        }
    }

    /// True when the live playlist no longer matches this snapshot
    pub fn diverges_from(&self, details: &PlaylistDetails, videos: &[VideoEntry]) -> bool {
        self.thumbnail_url != details.thumbnail_url
            || self.playlist_name != details.name
            || self.videos != videos
    }
}

/// Key the displayed view is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Arrival,
    Duration,
    Title,
}

/// Sort key plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortOrder {
    pub key: SortKey,
    pub ascending: bool,
}

impl SortOrder {
    pub const ARRIVAL: SortOrder = SortOrder {
        key: SortKey::Arrival,
        ascending: true,
    };

    pub fn new(key: SortKey, ascending: bool) -> Self {
        Self { key, ascending }
    }

    /// Index in the persisted 0..=5 range: pairs of ascending/descending per key
    pub fn to_index(self) -> u8 {
        let base = match self.key {
            SortKey::Arrival => 0,
            SortKey::Duration => 2,
            SortKey::Title => 4,
        };
        if self.ascending {
            base
        } else {
            base + 1
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        let key = match index / 2 {
            0 => SortKey::Arrival,
            1 => SortKey::Duration,
            2 => SortKey::Title,
            _ => return None,
        };
        Some(Self::new(key, index % 2 == 0))
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::ARRIVAL
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self.key {
            SortKey::Arrival => "arrival",
            SortKey::Duration => "duration",
            SortKey::Title => "title",
        };
        let direction = if self.ascending { "asc" } else { "desc" };
        write!(f, "{}-{}", key, direction)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    /// Accepts `duration`, `duration-asc` or `duration-desc` style values
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, direction) = s.split_once('-').unwrap_or((s, "asc"));
        let key = match key.to_ascii_lowercase().as_str() {
            "arrival" | "default" => SortKey::Arrival,
            "duration" => SortKey::Duration,
            "title" => SortKey::Title,
            other => return Err(format!("unknown sort key: {}", other)),
        };
        let ascending = match direction.to_ascii_lowercase().as_str() {
            "asc" => true,
            "desc" => false,
            other => return Err(format!("unknown sort direction: {}", other)),
        };
        Ok(Self::new(key, ascending))
    }
}

/// Stream information for a single video, as much as playback setup needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub title: String,
    pub uploader: String,
    pub duration_seconds: u64,
    pub hls_url: Option<String>,
    pub related: Vec<VideoEntry>,
}

/// A skippable segment of a video (sponsor, intro, ...)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Segment {
    pub category: String,
    pub start: f64,
    pub end: f64,
}
