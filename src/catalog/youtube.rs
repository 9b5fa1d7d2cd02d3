//! YouTube Data API v3 catalog

use super::format::{duration_label, extract_channel_handle, format_upload_date, format_view_count};
use super::{VideoCatalog, default_qualities};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::types::{ChannelInfo, Playlist, Video, VideoId, VideoPage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const VIDEO_PLACEHOLDER: &str = "https://placehold.co/600x400.png?text=Video";
const PLAYLIST_PLACEHOLDER: &str = "https://placehold.co/320x180.png?text=Playlist";

/// Catalog backed by the YouTube Data API
pub struct YouTubeCatalog {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    page_size: u32,
}

impl YouTubeCatalog {
    /// Create a catalog client, failing if no API key is configured
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CatalogError::NotConfigured)?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.clamp(1, 50),
        })
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, resource))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("request to {} failed with status {}", resource, status.as_u16()));
            tracing::warn!(resource, status = status.as_u16(), error = %message, "Catalog API error");
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorMessage>,
}

#[derive(Deserialize)]
struct ApiErrorMessage {
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
    prev_page_token: Option<String>,
    page_info: Option<PageInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    total_results: Option<u32>,
    results_per_page: Option<u32>,
}

#[derive(Default, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(&self) -> Option<String> {
        self.medium
            .as_ref()
            .and_then(|t| t.url.clone())
            .or_else(|| self.default.as_ref().and_then(|t| t.url.clone()))
    }
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    published_at: Option<String>,
    live_broadcast_content: Option<String>,
    playlist_id: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    content_details: Option<PlaylistContentDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    item_count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    #[serde(default)]
    snippet: Snippet,
    content_details: Option<PlaylistItemDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    #[serde(default)]
    snippet: Snippet,
    content_details: Option<VideoContentDetails>,
    statistics: Option<Statistics>,
}

#[derive(Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
}

fn to_video(resource: VideoResource, playlist_ids: &HashMap<String, String>, now: DateTime<Utc>) -> Video {
    let snippet = resource.snippet;
    let duration = resource.content_details.and_then(|d| d.duration);
    let views = resource.statistics.and_then(|s| s.view_count);

    Video {
        title: snippet.title.clone().unwrap_or_else(|| "Untitled Video".to_string()),
        thumbnail_url: snippet
            .thumbnails
            .best()
            .unwrap_or_else(|| VIDEO_PLACEHOLDER.to_string()),
        duration_label: duration_label(duration.as_deref(), snippet.live_broadcast_content.as_deref()),
        upload_date_label: format_upload_date(snippet.published_at.as_deref(), now),
        view_count_label: format_view_count(views.as_deref()),
        channel_name: snippet
            .channel_title
            .clone()
            .unwrap_or_else(|| "Unknown Channel".to_string()),
        available_qualities: default_qualities(),
        playlist_id: playlist_ids.get(&resource.id).cloned(),
        published_at: snippet
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc)),
        id: VideoId::new(resource.id),
    }
}

#[async_trait]
impl VideoCatalog for YouTubeCatalog {
    async fn resolve_channel(&self, channel_ref: &str) -> Result<ChannelInfo> {
        let channel_ref = channel_ref.trim();
        let handle = if channel_ref.contains("://") {
            extract_channel_handle(channel_ref)
                .ok_or_else(|| CatalogError::InvalidChannelUrl(channel_ref.to_string()))?
        } else if channel_ref.is_empty() {
            return Err(CatalogError::InvalidChannelUrl(String::new()).into());
        } else {
            channel_ref.to_string()
        };

        let (param, value) = if let Some(h) = handle.strip_prefix('@') {
            ("forHandle", h)
        } else if handle.starts_with("UC") {
            ("id", handle.as_str())
        } else {
            ("forUsername", handle.as_str())
        };

        let response: ListResponse<ChannelItem> = self
            .get("channels", &[("part", "snippet,contentDetails"), (param, value)])
            .await?;

        let channel = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::ChannelNotFound(handle.clone()))?;

        let uploads = channel
            .content_details
            .and_then(|d| d.related_playlists)
            .and_then(|p| p.uploads)
            .ok_or_else(|| CatalogError::Api {
                status: 200,
                message: format!("channel {} has no uploads playlist", channel.id),
            })?;

        tracing::debug!(channel_id = %channel.id, handle = %handle, "Resolved channel");

        Ok(ChannelInfo {
            title: channel.snippet.title.unwrap_or_default(),
            id: channel.id,
            uploads_playlist_id: uploads,
        })
    }

    async fn list_playlists(&self, channel_id: &str) -> Result<Vec<Playlist>> {
        let response: ListResponse<PlaylistResource> = self
            .get(
                "playlists",
                &[
                    ("part", "snippet,contentDetails"),
                    ("channelId", channel_id),
                    ("maxResults", "50"),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| Playlist {
                id: item.id,
                title: item
                    .snippet
                    .title
                    .clone()
                    .unwrap_or_else(|| "Untitled Playlist".to_string()),
                thumbnail_url: item
                    .snippet
                    .thumbnails
                    .best()
                    .unwrap_or_else(|| PLAYLIST_PLACEHOLDER.to_string()),
                item_count: item.content_details.and_then(|d| d.item_count).unwrap_or(0),
            })
            .collect())
    }

    async fn fetch_page(&self, playlist_id: &str, cursor: Option<&str>) -> Result<VideoPage> {
        let page_size = self.page_size.to_string();
        let mut query = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = cursor {
            query.push(("pageToken", token));
        }

        let items: ListResponse<PlaylistItem> = self.get("playlistItems", &query).await?;

        let mut playlist_ids = HashMap::new();
        let mut video_ids = Vec::new();
        for item in &items.items {
            if let Some(id) = item.content_details.as_ref().and_then(|d| d.video_id.clone()) {
                if let Some(pid) = &item.snippet.playlist_id {
                    playlist_ids.insert(id.clone(), pid.clone());
                }
                video_ids.push(id);
            }
        }

        let (total, page_size) = items
            .page_info
            .map(|p| (p.total_results, p.results_per_page))
            .unwrap_or((None, None));

        let mut page = VideoPage {
            videos: Vec::new(),
            next_cursor: items.next_page_token,
            prev_cursor: items.prev_page_token,
            total,
            page_size,
        };

        if video_ids.is_empty() {
            return Ok(page);
        }

        let joined = video_ids.join(",");
        let details: ListResponse<VideoResource> = self
            .get(
                "videos",
                &[("part", "snippet,contentDetails,statistics"), ("id", joined.as_str())],
            )
            .await?;

        let now = Utc::now();
        page.videos = details
            .items
            .into_iter()
            .map(|v| to_video(v, &playlist_ids, now))
            .collect();

        tracing::debug!(playlist_id, videos = page.videos.len(), "Fetched catalog page");
        Ok(page)
    }

    fn name(&self) -> &'static str {
        "youtube"
    }
}
