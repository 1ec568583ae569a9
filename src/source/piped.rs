//! HTTP implementation of the remote sources against a Piped-compatible API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{FeedError, Result};
use crate::model::{
    video_id_from_url, NextPage, PlaylistDetails, PlaylistKind, PlaylistPage, Segment, StreamInfo,
    VideoEntry,
};
use crate::source::{RemotePlaylistSource, StreamSource};

const DEFAULT_SERVER_ERROR: &str = "Server error";

/// Item of a `relatedStreams` array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamItem {
    url: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    uploader_name: Option<String>,
    #[serde(default)]
    duration: i64,
}

impl StreamItem {
    fn into_entry(self) -> VideoEntry {
        let url = self.url.unwrap_or_default();
        VideoEntry {
            id: video_id_from_url(&url),
            title: self.title.unwrap_or_default(),
            url,
            thumbnail_url: self.thumbnail.unwrap_or_default(),
            // live streams report -1
            duration_seconds: self.duration.max(0) as u64,
            uploader_name: self.uploader_name,
        }
    }
}

/// Map every item to an entry, one per remote position
///
/// Removal addresses videos by index, so items without a url are kept as
/// placeholders instead of shifting the positions after them.
fn into_entries(items: Vec<StreamItem>) -> Vec<VideoEntry> {
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            if item.url.is_none() {
                warn!(position, title = ?item.title, "Stream item without url, keeping placeholder");
            }
            item.into_entry()
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    uploader_url: Option<String>,
    #[serde(default)]
    uploader_avatar: Option<String>,
    #[serde(default)]
    videos: u64,
    #[serde(default)]
    nextpage: Option<String>,
    #[serde(default)]
    related_streams: Vec<StreamItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextPageResponse {
    #[serde(default)]
    nextpage: Option<String>,
    #[serde(default)]
    related_streams: Vec<StreamItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamsResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    uploader: String,
    #[serde(default)]
    duration: i64,
    #[serde(default)]
    hls: Option<String>,
    #[serde(default)]
    related_streams: Vec<StreamItem>,
}

#[derive(Debug, Deserialize)]
struct SegmentItem {
    category: String,
    segment: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct SegmentsResponse {
    #[serde(default)]
    segments: Vec<SegmentItem>,
}

/// Body of both acknowledgements (`{"message": "ok"}`) and errors
#[derive(Debug, Default, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloneResponse {
    playlist_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveRequest<'a> {
    playlist_id: &'a str,
    index: usize,
}

/// Client for the public and authenticated Piped endpoints
pub struct PipedClient {
    http: Client,
    api_url: String,
    auth_url: String,
    auth_token: Option<String>,
}

impl PipedClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_url = normalize_url(&config.instance_url)?;
        let auth_url = match &config.auth_instance_url {
            Some(url) => normalize_url(url)?,
            None => api_url.clone(),
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("tubefeed/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_url,
            auth_url,
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn base_for(&self, kind: PlaylistKind) -> &str {
        match kind {
            PlaylistKind::Public => &self.api_url,
            PlaylistKind::Private => &self.auth_url,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .auth_token
            .as_deref()
            .ok_or_else(|| FeedError::Unsupported("login required".to_string()))?;
        Ok(request.header("Authorization", token))
    }

    fn get_for(&self, kind: PlaylistKind, url: &str) -> Result<RequestBuilder> {
        let request = self.http.get(url);
        match kind {
            PlaylistKind::Public => Ok(request),
            PlaylistKind::Private => self.authorized(request),
        }
    }

    /// Send an authenticated mutation and require a `{"message": "ok"}` reply
    async fn acknowledged(&self, request: RequestBuilder) -> Result<bool> {
        let response = check_status(self.authorized(request)?.send().await?).await?;
        let body: MessageResponse = response.json().await?;
        Ok(body.message.as_deref() == Some("ok"))
    }
}

fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(FeedError::Unsupported("instance URL cannot be empty".into()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(FeedError::Unsupported(
            "instance URL must start with http:// or https://".into(),
        ));
    }
    Ok(url.to_string())
}

/// Map non-success statuses to the error taxonomy
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 404 {
        return Err(FeedError::NotFound);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageResponse>(&body)
        .ok()
        .and_then(|m| m.message.or(m.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER_ERROR.to_string());

    warn!(status = status.as_u16(), message = %message, "Remote rejected request");
    Err(FeedError::Server { message })
}

#[async_trait]
impl RemotePlaylistSource for PipedClient {
    async fn get_playlist(&self, id: &str, kind: PlaylistKind) -> Result<PlaylistPage> {
        let url = format!("{}/playlists/{}", self.base_for(kind), id);
        debug!(url = %url, kind = %kind, "Fetching playlist");

        let response = check_status(self.get_for(kind, &url)?.send().await?).await?;
        let playlist: PlaylistResponse = response.json().await?;

        let videos = into_entries(playlist.related_streams);
        debug!(
            playlist_id = %id,
            videos = videos.len(),
            has_next = playlist.nextpage.is_some(),
            "Fetched playlist"
        );

        Ok(PlaylistPage {
            details: PlaylistDetails {
                name: playlist.name.unwrap_or_default(),
                description: playlist.description,
                thumbnail_url: playlist.thumbnail_url.unwrap_or_default(),
                uploader: playlist.uploader,
                uploader_url: playlist.uploader_url,
                uploader_avatar: playlist.uploader_avatar,
                total_videos: playlist.videos,
            },
            videos,
            next_cursor: playlist.nextpage,
        })
    }

    async fn get_next_page(&self, id: &str, kind: PlaylistKind, cursor: &str) -> Result<NextPage> {
        let url = format!("{}/nextpage/playlists/{}", self.base_for(kind), id);
        debug!(url = %url, "Fetching next playlist page");

        let request = self.get_for(kind, &url)?.query(&[("nextpage", cursor)]);
        let response = check_status(request.send().await?).await?;
        let page: NextPageResponse = response.json().await?;

        Ok(NextPage {
            videos: into_entries(page.related_streams),
            next_cursor: page.nextpage,
        })
    }

    async fn delete_playlist(&self, id: &str, kind: PlaylistKind) -> Result<bool> {
        if kind == PlaylistKind::Public {
            return Err(FeedError::Unsupported(
                "public playlists cannot be deleted".to_string(),
            ));
        }

        let url = format!("{}/user/playlists/delete", self.auth_url);
        let ok = self
            .acknowledged(self.http.post(&url).json(&json!({ "playlistId": id })))
            .await?;
        info!(playlist_id = %id, success = ok, "Delete playlist");
        Ok(ok)
    }

    async fn clone_playlist(&self, id: &str) -> Result<String> {
        let url = format!("{}/import/playlist", self.auth_url);
        let request = self.authorized(self.http.post(&url).json(&json!({ "playlistId": id })))?;
        let response = check_status(request.send().await?).await?;
        let body: CloneResponse = response.json().await?;

        body.playlist_id
            .ok_or_else(|| FeedError::server(DEFAULT_SERVER_ERROR))
    }

    async fn rename_playlist(&self, id: &str, new_name: &str) -> Result<()> {
        let url = format!("{}/user/playlists/rename", self.auth_url);
        let body = json!({ "playlistId": id, "newName": new_name });
        if self.acknowledged(self.http.post(&url).json(&body)).await? {
            Ok(())
        } else {
            Err(FeedError::server(DEFAULT_SERVER_ERROR))
        }
    }

    async fn update_description(&self, id: &str, new_description: &str) -> Result<()> {
        let url = format!("{}/user/playlists/description", self.auth_url);
        let body = json!({ "playlistId": id, "description": new_description });
        if self.acknowledged(self.http.patch(&url).json(&body)).await? {
            Ok(())
        } else {
            Err(FeedError::server(DEFAULT_SERVER_ERROR))
        }
    }

    async fn remove_video(&self, id: &str, video_id: &str, index: usize) -> Result<()> {
        let url = format!("{}/user/playlists/remove", self.auth_url);
        debug!(playlist_id = %id, video_id = %video_id, index, "Removing video");

        let body = RemoveRequest {
            playlist_id: id,
            index,
        };
        if self.acknowledged(self.http.post(&url).json(&body)).await? {
            Ok(())
        } else {
            Err(FeedError::server(DEFAULT_SERVER_ERROR))
        }
    }
}

#[async_trait]
impl StreamSource for PipedClient {
    async fn get_streams(&self, video_id: &str) -> Result<StreamInfo> {
        let url = format!("{}/streams/{}", self.api_url, video_id);
        debug!(url = %url, "Fetching streams");

        let response = check_status(self.http.get(&url).send().await?).await?;
        let streams: StreamsResponse = response.json().await?;

        Ok(StreamInfo {
            title: streams.title,
            uploader: streams.uploader,
            duration_seconds: streams.duration.max(0) as u64,
            hls_url: streams.hls,
            related: into_entries(streams.related_streams),
        })
    }

    async fn get_segments(&self, video_id: &str, categories: &[String]) -> Result<Vec<Segment>> {
        let url = format!("{}/sponsors/{}", self.api_url, video_id);
        let categories = serde_json::to_string(categories)?;

        let request = self.http.get(&url).query(&[("category", categories.as_str())]);
        let response = check_status(request.send().await?).await?;
        let body: SegmentsResponse = response.json().await?;

        Ok(body
            .segments
            .into_iter()
            .map(|s| Segment {
                category: s.category,
                start: s.segment[0],
                end: s.segment[1],
            })
            .collect())
    }
}
