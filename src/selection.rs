//! Task construction from a user selection

use crate::types::{Quality, Video, VideoId, VideoRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

/// The fields of a catalog record needed to create a task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    /// Video identifier
    pub id: VideoId,
    /// Video title
    pub title: String,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: String,
}

impl From<&Video> for CatalogEntry {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.clone(),
            title: video.title.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
        }
    }
}

/// An "add to queue" gesture: which videos, from which listing, at which quality
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Selection {
    /// Selected video ids
    pub selected: Vec<VideoId>,
    /// The listing the ids were picked from
    #[serde(alias = "videos")]
    pub catalog: Vec<CatalogEntry>,
    /// Per-video quality overrides
    #[serde(default)]
    pub video_qualities: HashMap<VideoId, Quality>,
    /// Quality for videos without an override (falls back to the configured default)
    #[serde(default)]
    pub global_quality: Option<Quality>,
}

impl Selection {
    /// Resolve into enqueue inputs, using `default_quality` when no global quality was given
    pub fn resolve(&self, default_quality: &Quality) -> Vec<VideoRef> {
        let global = self.global_quality.as_ref().unwrap_or(default_quality);
        build_video_refs(&self.selected, &self.catalog, &self.video_qualities, global)
    }
}

/// Turn selected ids into [`VideoRef`]s with their quality resolved
///
/// Output follows catalog order. Selected ids missing from the catalog are
/// dropped since there is no title to show for them.
pub fn build_video_refs(
    selected: &[VideoId],
    catalog: &[CatalogEntry],
    per_video_quality: &HashMap<VideoId, Quality>,
    global_quality: &Quality,
) -> Vec<VideoRef> {
    let selected: HashSet<&VideoId> = selected.iter().collect();
    catalog
        .iter()
        .filter(|entry| selected.contains(&entry.id))
        .map(|entry| VideoRef {
            id: entry.id.clone(),
            title: entry.title.clone(),
            thumbnail_url: entry.thumbnail_url.clone(),
            quality: per_video_quality
                .get(&entry.id)
                .cloned()
                .unwrap_or_else(|| global_quality.clone()),
        })
        .collect()
}
