//! First-occurrence deduplication keyed on `(kind, src)`.

use std::collections::HashSet;

use crate::types::{MediaItem, MediaKey};

/// Insertion-ordered, first-write-wins collection of media items.
///
/// Grows monotonically across extraction passes. A later observation of an
/// existing key is dropped, so the first-seen dimensions and poster stick.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    seen: HashSet<MediaKey>,
    items: Vec<MediaItem>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of candidates. Returns how many new keys were added.
    pub fn merge<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = MediaItem>,
    {
        let before = self.items.len();
        for item in items {
            if self.seen.insert(item.key()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Items in first-observed order.
    pub fn into_items(self) -> Vec<MediaItem> {
        self.items
    }
}

/// Keep the first occurrence of each `(kind, src)` pair, preserving order.
pub fn deduplicate<I>(items: I) -> Vec<MediaItem>
where
    I: IntoIterator<Item = MediaItem>,
{
    let mut acc = Accumulator::new();
    acc.merge(items);
    acc.into_items()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaKind;

    fn image(src: &str, w: u32) -> MediaItem {
        MediaItem::image(src, w, w)
    }

    #[test]
    fn test_keeps_first_occurrence_in_order() {
        let items = vec![
            image("https://x/a.jpg", 1),
            image("https://x/b.jpg", 2),
            image("https://x/a.jpg", 3),
            image("https://x/c.jpg", 4),
            image("https://x/b.jpg", 5),
        ];
        let out = deduplicate(items);
        let srcs: Vec<_> = out.iter().map(|i| i.src.as_str()).collect();
        assert_eq!(srcs, ["https://x/a.jpg", "https://x/b.jpg", "https://x/c.jpg"]);
        assert_eq!(out[0].width, Some(1));
    }

    #[test]
    fn test_kind_is_part_of_key() {
        let items = vec![
            image("https://x/a.mp4", 0),
            MediaItem::video("https://x/a.mp4", None, 0, 0),
        ];
        let out = deduplicate(items);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].kind, MediaKind::Video);
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate(Vec::new()).is_empty());
    }

    #[test]
    fn test_output_unique_and_bounded() {
        let srcs = ["a", "b", "a", "a", "c", "b", "d", "c"];
        let items: Vec<_> = srcs
            .iter()
            .enumerate()
            .map(|(i, s)| image(&format!("https://x/{s}.png"), i as u32 + 1))
            .collect();
        let out = deduplicate(items.clone());
        assert!(out.len() <= items.len());

        let keys: HashSet<_> = out.iter().map(MediaItem::key).collect();
        assert_eq!(keys.len(), out.len());

        // Each retained item is the first input item with its key.
        for kept in &out {
            let first = items.iter().find(|i| i.key() == kept.key()).unwrap();
            assert_eq!(first, kept);
        }
    }

    #[test]
    fn test_idempotent() {
        let items = vec![image("https://x/a.jpg", 1), image("https://x/a.jpg", 2)];
        let once = deduplicate(items);
        assert_eq!(deduplicate(once.clone()), once);
    }

    #[test]
    fn test_accumulator_merge_reports_new_keys() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.merge([image("https://x/a.jpg", 1), image("https://x/b.jpg", 1)]), 2);
        assert_eq!(acc.merge([image("https://x/a.jpg", 9)]), 0);
        assert_eq!(acc.merge([image("https://x/c.jpg", 1)]), 1);
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.items()[0].width, Some(1));
    }
}
