//! Rendered-DOM snapshot model and the page abstraction the collector drives.
//!
//! A browser backend implements [`PageHandle`]; the collector only ever sees
//! snapshots of `<img>` and `<video>` elements plus a handful of scroll and
//! wait primitives.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::SweepResult;

/// JavaScript expression producing a [`DomSnapshot`] as JSON.
pub const SNAPSHOT_SCRIPT: &str = r#"(() => {
  const images = Array.from(document.querySelectorAll("img")).map(img => ({
    currentSrc: img.currentSrc || null,
    src: img.src || null,
    naturalWidth: img.naturalWidth || 0,
    naturalHeight: img.naturalHeight || 0
  }));
  const videos = Array.from(document.querySelectorAll("video")).map(v => {
    const source = v.querySelector("source");
    return {
      currentSrc: v.currentSrc || null,
      src: v.src || null,
      sourceSrc: source ? (source.src || null) : null,
      poster: v.poster || null,
      videoWidth: v.videoWidth || 0,
      videoHeight: v.videoHeight || 0
    };
  });
  return { location: location.href, images, videos };
})()"#;

/// One read of the rendered DOM, elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSnapshot {
    /// `location.href` at the time of the read.
    pub location: String,
    pub images: Vec<ImageElement>,
    pub videos: Vec<VideoElement>,
}

/// An `<img>` element as the browser sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageElement {
    /// Browser-resolved source, which follows `srcset` swaps.
    pub current_src: Option<String>,
    /// Declared `src`.
    pub src: Option<String>,
    pub natural_width: u32,
    pub natural_height: u32,
}

impl ImageElement {
    /// The currently loaded source, preferring `currentSrc` over `src`.
    pub fn resolved_src(&self) -> Option<&str> {
        first_present([self.current_src.as_deref(), self.src.as_deref()])
    }
}

/// A `<video>` element as the browser sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoElement {
    pub current_src: Option<String>,
    pub src: Option<String>,
    /// `src` of the first child `<source>`.
    pub source_src: Option<String>,
    pub poster: Option<String>,
    pub video_width: u32,
    pub video_height: u32,
}

impl VideoElement {
    /// `currentSrc`, then `src`, then the first `<source>` child.
    pub fn resolved_src(&self) -> Option<&str> {
        first_present([
            self.current_src.as_deref(),
            self.src.as_deref(),
            self.source_src.as_deref(),
        ])
    }
}

fn first_present<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates.into_iter().flatten().find(|s| !s.is_empty())
}

/// Outcome of waiting for network activity to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleOutcome {
    Settled,
    TimedOut,
}

/// A live, scrollable rendered page.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Read the current `<img>`/`<video>` state of the DOM.
    async fn snapshot(&self) -> SweepResult<DomSnapshot>;
    /// Scroll down by `fraction` of one viewport height.
    async fn scroll_by_viewport(&self, fraction: f64) -> SweepResult<()>;
    /// Scroll back to the top of the document.
    async fn scroll_to_top(&self) -> SweepResult<()>;
    /// Wait until no new network fetches start, bounded by `timeout`.
    async fn wait_for_network_idle(&self, timeout: Duration) -> SweepResult<IdleOutcome>;
}
