//! URL normalization and media extension filters.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn image_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.(jpe?g|png|webp|gif|avif)(\?|$)").expect("valid regex"))
}

fn video_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.(mp4|webm|m4v|mov)(\?|$)").expect("valid regex"))
}

/// Whether `src`, resolved against `base`, points at a raster image
/// (jpg, jpeg, png, webp, gif, avif).
///
/// Only the URL path is checked, so `render?file=a.jpg` is not an image.
pub fn is_image_src(src: &str, base: &str) -> bool {
    image_pattern().is_match(&extension_target(src, base))
}

/// Whether `src`, resolved against `base`, points at a video file (mp4, webm, m4v, mov).
pub fn is_video_src(src: &str, base: &str) -> bool {
    video_pattern().is_match(&extension_target(src, base))
}

/// The part of a source that must carry the media extension: the path of a
/// hierarchical URL, or the raw string when it cannot be resolved.
fn extension_target(src: &str, base: &str) -> String {
    match resolve(src, base) {
        Some(url) if !url.cannot_be_a_base() => url.path().to_string(),
        _ => src.to_string(),
    }
}

fn resolve(raw: &str, base: &str) -> Option<Url> {
    Url::parse(base)
        .and_then(|b| b.join(raw))
        .or_else(|_| Url::parse(raw))
        .ok()
}

/// Resolve `raw` against the page location and keep only scheme, host and path.
///
/// Query strings and fragments are CDN noise and are dropped. Anything that
/// cannot be resolved to a hierarchical URL is returned unchanged.
pub fn normalize_src(raw: &str, base: &str) -> String {
    let Some(resolved) = resolve(raw, base) else {
        tracing::debug!("passing through unresolvable src {raw:?}");
        return raw.to_string();
    };

    if resolved.cannot_be_a_base() || !resolved.has_host() {
        return raw.to_string();
    }

    let mut url = resolved;
    url.set_query(None);
    url.set_fragment(None);
    // Origin never carries credentials.
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.to_string()
}
