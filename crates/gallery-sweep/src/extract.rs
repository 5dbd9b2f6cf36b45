//! Media extraction from a single DOM snapshot.

use crate::dom::{DomSnapshot, PageHandle};
use crate::normalize::{is_image_src, is_video_src, normalize_src};
use crate::types::{MediaItem, SweepResult};

/// Extract image and video candidates from a snapshot.
///
/// Images come first, then videos, each in document order. Elements without a
/// source or with an unrecognized extension are skipped.
pub fn extract_from_snapshot(snapshot: &DomSnapshot) -> Vec<MediaItem> {
    let base = snapshot.location.as_str();
    let mut out = Vec::with_capacity(snapshot.images.len() + snapshot.videos.len());

    for img in &snapshot.images {
        let Some(src) = img.resolved_src() else {
            continue;
        };
        if !is_image_src(src, base) {
            continue;
        }
        out.push(MediaItem::image(
            normalize_src(src, base),
            img.natural_width,
            img.natural_height,
        ));
    }

    for video in &snapshot.videos {
        let Some(src) = video.resolved_src() else {
            continue;
        };
        if !is_video_src(src, base) {
            continue;
        }
        out.push(MediaItem::video(
            normalize_src(src, base),
            video.poster.clone(),
            video.video_width,
            video.video_height,
        ));
    }

    out
}

/// Snapshot the page and extract every currently visible media candidate.
pub async fn extract_visible<P>(page: &P) -> SweepResult<Vec<MediaItem>>
where
    P: PageHandle + ?Sized,
{
    let snapshot = page.snapshot().await?;
    Ok(extract_from_snapshot(&snapshot))
}
