//! Channel and video listings from the catalog.

use crate::catalog::VideoCatalog;
use crate::error::{CatalogError, Result};
use crate::types::{ChannelInfo, Playlist, VideoPage};
use std::sync::Arc;

use super::TubeDownloader;

/// A resolved channel together with its playlists
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct ChannelOverview {
    /// The channel
    pub channel: ChannelInfo,
    /// Playlists published by the channel
    pub playlists: Vec<Playlist>,
}

impl TubeDownloader {
    fn catalog(&self) -> Result<&Arc<dyn VideoCatalog>> {
        self.catalog
            .as_ref()
            .ok_or_else(|| CatalogError::NotConfigured.into())
    }

    fn channel_ref(&self, channel: Option<&str>) -> Result<String> {
        channel
            .or(self.config.catalog.channel_url.as_deref())
            .map(str::to_string)
            .ok_or_else(|| CatalogError::InvalidChannelUrl("no channel given or configured".to_string()).into())
    }

    /// Resolve a channel (the configured one when `channel` is `None`) and list its playlists
    pub async fn channel_overview(&self, channel: Option<&str>) -> Result<ChannelOverview> {
        let catalog = self.catalog()?;
        let channel = catalog.resolve_channel(&self.channel_ref(channel)?).await?;
        let playlists = catalog.list_playlists(&channel.id).await?;
        Ok(ChannelOverview { channel, playlists })
    }

    /// One page of videos
    ///
    /// Without a playlist, the uploads of the configured channel are listed.
    pub async fn videos(&self, playlist_id: Option<&str>, cursor: Option<&str>) -> Result<VideoPage> {
        let catalog = self.catalog()?;
        let playlist_id = match playlist_id {
            Some(id) => id.to_string(),
            None => {
                catalog
                    .resolve_channel(&self.channel_ref(None)?)
                    .await?
                    .uploads_playlist_id
            }
        };
        catalog.fetch_page(&playlist_id, cursor).await
    }
}
