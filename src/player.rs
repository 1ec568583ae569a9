//! Stream information holder that outlives a re-created player screen.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FeedError, Result};
use crate::model::{Segment, StreamInfo};
use crate::source::StreamSource;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Keeps the last fetched stream info and segments so a re-created player can
/// pick them up again instead of hitting the network
pub struct PlayerSession {
    source: Arc<dyn StreamSource>,
    segment_categories: Vec<String>,
    keep_existing: bool,
    streams: Option<(String, StreamInfo)>,
    segments: Vec<Segment>,
}

impl PlayerSession {
    pub fn new(source: Arc<dyn StreamSource>, segment_categories: Vec<String>) -> Self {
        Self {
            source,
            segment_categories,
            keep_existing: false,
            streams: None,
            segments: Vec::new(),
        }
    }

    /// Set before the player is re-created so cached data gets reused
    pub fn keep_existing(&mut self, keep: bool) {
        self.keep_existing = keep;
    }

    pub fn is_keeping_existing(&self) -> bool {
        self.keep_existing
    }

    /// Stream info for `video_id`, from cache when reusing the session
    pub async fn fetch_video_info(&mut self, video_id: &str) -> Result<StreamInfo> {
        if self.keep_existing {
            if let Some((cached_id, info)) = &self.streams {
                if cached_id == video_id {
                    debug!(video_id = %video_id, "Reusing cached stream info");
                    return Ok(info.clone());
                }
            }
        }

        let info = self.source.get_streams(video_id).await?;
        self.streams = Some((video_id.to_string(), info.clone()));
        Ok(info)
    }

    /// Refresh skippable segments; failures leave the previous list in place
    pub async fn fetch_segments(&mut self, video_id: &str) {
        if self.segment_categories.is_empty() || self.keep_existing {
            return;
        }

        match self
            .source
            .get_segments(video_id, &self.segment_categories)
            .await
        {
            Ok(segments) => self.segments = segments,
            Err(err) => warn!(video_id = %video_id, error = %err, "Failed to fetch segments"),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn cached_streams(&self) -> Option<&StreamInfo> {
        self.streams.as_ref().map(|(_, info)| info)
    }
}

/// Text to show for a failed stream lookup
pub fn error_message(err: &FeedError) -> String {
    match err {
        FeedError::Server { message } => message.clone(),
        FeedError::NotFound => "Video not found".to_string(),
        _ => UNKNOWN_ERROR.to_string(),
    }
}
