//! Core data types for discovered media and the output manifest.

use serde::{Deserialize, Serialize};

use crate::dedupe::Accumulator;

/// Which kind of element an asset was discovered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// One discovered asset.
///
/// `src` is already normalized (scheme, host and path only). Dimensions are the
/// intrinsic pixel size reported by the element, present only when non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireItem", from = "WireItem")]
pub struct MediaItem {
    pub kind: MediaKind,
    pub src: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Poster frame URL. Only ever set on videos.
    pub poster: Option<String>,
}

impl MediaItem {
    /// Build an image item. Zero dimensions are treated as unknown.
    pub fn image(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Image,
            src: src.into(),
            width: positive(width),
            height: positive(height),
            poster: None,
        }
    }

    /// Build a video item. Zero dimensions are treated as unknown.
    pub fn video(src: impl Into<String>, poster: Option<String>, width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Video,
            src: src.into(),
            width: positive(width),
            height: positive(height),
            poster: poster.filter(|p| !p.is_empty()),
        }
    }

    /// The deduplication key for this item.
    pub fn key(&self) -> MediaKey {
        MediaKey {
            kind: self.kind,
            src: self.src.clone(),
        }
    }
}

fn positive(v: u32) -> Option<u32> {
    (v > 0).then_some(v)
}

/// Identity of an asset within one run: `(kind, normalized src)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaKey {
    pub kind: MediaKind,
    pub src: String,
}

/// On-disk shape of a [`MediaItem`].
///
/// Images carry no `poster` key at all; videos always carry one, `null` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireItem {
    #[serde(rename = "type")]
    kind: MediaKind,
    src: String,
    #[serde(default)]
    w: Option<u32>,
    #[serde(default)]
    h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poster: Option<Option<String>>,
}

impl From<MediaItem> for WireItem {
    fn from(item: MediaItem) -> Self {
        let poster = match item.kind {
            MediaKind::Video => Some(item.poster),
            MediaKind::Image => None,
        };
        Self {
            kind: item.kind,
            src: item.src,
            w: item.width,
            h: item.height,
            poster,
        }
    }
}

impl From<WireItem> for MediaItem {
    fn from(wire: WireItem) -> Self {
        let poster = match wire.kind {
            MediaKind::Video => wire.poster.flatten(),
            MediaKind::Image => None,
        };
        Self {
            kind: wire.kind,
            src: wire.src,
            width: wire.w,
            height: wire.h,
            poster,
        }
    }
}

/// The output record of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub ok: bool,
    pub source: String,
    pub count: usize,
    pub items: Vec<MediaItem>,
}

impl Manifest {
    /// Build a successful manifest. Items are deduplicated and `count` reflects the result.
    pub fn from_items(source: impl Into<String>, items: Vec<MediaItem>) -> Self {
        let items = crate::dedupe::deduplicate(items);
        Self {
            ok: true,
            source: source.into(),
            count: items.len(),
            items,
        }
    }

    /// Number of image entries.
    pub fn image_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.kind == MediaKind::Image)
            .count()
    }

    /// Number of video entries.
    pub fn video_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.kind == MediaKind::Video)
            .count()
    }

    /// Check that `count` matches and that no `(kind, src)` pair repeats.
    pub fn validate(&self) -> SweepResult<()> {
        if self.count != self.items.len() {
            return Err(SweepError::InvalidManifest(format!(
                "count is {} but {} items are listed",
                self.count,
                self.items.len()
            )));
        }

        let mut seen = Accumulator::new();
        for item in &self.items {
            if seen.merge([item.clone()]) == 0 {
                return Err(SweepError::InvalidManifest(format!(
                    "duplicate {} entry: {}",
                    item.kind, item.src
                )));
            }
        }

        Ok(())
    }
}

/// Errors that can occur while collecting media.
#[derive(thiserror::Error, Debug)]
pub enum SweepError {
    #[error("Page error: {0}")]
    Page(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Convenience result type.
pub type SweepResult<T> = Result<T, SweepError>;
