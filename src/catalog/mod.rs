//! Video Catalog Client
//!
//! Lists the videos and playlists of a channel so the user has something to
//! select from. The catalog only feeds selections; the queue never calls it.

pub mod format;
mod youtube;

pub use youtube::YouTubeCatalog;

use crate::error::Result;
use crate::types::{ChannelInfo, Playlist, Quality, VideoPage};
use async_trait::async_trait;

/// Qualities offered for every catalog video
pub fn default_qualities() -> Vec<Quality> {
    ["1080p", "720p", "480p", "360p"]
        .into_iter()
        .map(Quality::from)
        .collect()
}

/// Source of channel and video listings
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    /// Resolve a channel URL (`/@handle`, `/channel/<id>`, `/user/<name>`) or bare reference
    async fn resolve_channel(&self, channel_ref: &str) -> Result<ChannelInfo>;

    /// Playlists published by a channel
    async fn list_playlists(&self, channel_id: &str) -> Result<Vec<Playlist>>;

    /// One page of a playlist, starting at `cursor` (first page when `None`)
    async fn fetch_page(&self, playlist_id: &str, cursor: Option<&str>) -> Result<VideoPage>;

    /// Get the name of this catalog implementation
    fn name(&self) -> &'static str;
}
