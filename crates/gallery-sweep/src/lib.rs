//! GallerySweep — harvest lazily loaded images and videos from infinite-scroll galleries.

pub mod collector;
pub mod dedupe;
pub mod dom;
pub mod extract;
pub mod manifest;
pub mod normalize;
pub mod scripted;
pub mod types;

pub use collector::{
    collect_with_scrolling, CollectConfig, CollectReport, HaltPolicy, HaltReason, LoopProgress,
};
pub use dedupe::{deduplicate, Accumulator};
pub use dom::{DomSnapshot, IdleOutcome, ImageElement, PageHandle, VideoElement, SNAPSHOT_SCRIPT};
pub use extract::{extract_from_snapshot, extract_visible};
pub use manifest::{ManifestReader, ManifestWriter};
pub use normalize::{is_image_src, is_video_src, normalize_src};
pub use scripted::ScriptedPage;
pub use types::*;
