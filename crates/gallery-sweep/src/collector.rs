//! Scroll-and-extract loop that harvests lazily attached media.
//!
//! Masonry galleries virtualize: an element visible at one scroll position may
//! be detached or have its source cleared further down. Every pass is merged
//! into an [`Accumulator`] so nothing seen once is lost.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};

use crate::dedupe::Accumulator;
use crate::dom::{IdleOutcome, PageHandle};
use crate::extract::extract_visible;
use crate::types::{MediaItem, SweepResult};

/// Default number of scroll steps.
pub const DEFAULT_SCROLL_ITERATIONS: u32 = 40;

/// Default pause after each scroll step.
pub const DEFAULT_WAIT_BETWEEN_SCROLLS: Duration = Duration::from_millis(600);

/// Default pause after navigation before the first scroll.
pub const DEFAULT_INITIAL_SETTLE_WAIT: Duration = Duration::from_secs(3);

/// Fraction of a viewport height scrolled per step.
pub const DEFAULT_SCROLL_FRACTION: f64 = 0.85;

/// Tunables for [`collect_with_scrolling`].
#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub scroll_iterations: u32,
    pub wait_between_scrolls: Duration,
    pub initial_settle_wait: Duration,
    pub scroll_fraction: f64,
    /// Scroll back to the top once the loop ends.
    pub return_to_top: bool,
    pub top_settle_wait: Duration,
    /// Wait for network activity to settle after the loop. `None` skips the wait.
    pub network_idle_timeout: Option<Duration>,
    pub halt: HaltPolicy,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            scroll_iterations: DEFAULT_SCROLL_ITERATIONS,
            wait_between_scrolls: DEFAULT_WAIT_BETWEEN_SCROLLS,
            initial_settle_wait: DEFAULT_INITIAL_SETTLE_WAIT,
            scroll_fraction: DEFAULT_SCROLL_FRACTION,
            return_to_top: true,
            top_settle_wait: Duration::from_millis(200),
            network_idle_timeout: Some(Duration::from_secs(5)),
            halt: HaltPolicy::default(),
        }
    }
}

impl CollectConfig {
    /// A config with every wait set to zero. Handy for replays.
    pub fn immediate(scroll_iterations: u32) -> Self {
        Self {
            scroll_iterations,
            wait_between_scrolls: Duration::ZERO,
            initial_settle_wait: Duration::ZERO,
            top_settle_wait: Duration::ZERO,
            network_idle_timeout: None,
            ..Self::default()
        }
    }
}

/// When to stop scrolling before `scroll_iterations` is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HaltPolicy {
    /// Stop after this many consecutive passes that add no new key.
    pub stable_passes: Option<u32>,
    /// Stop once the scroll loop has run this long.
    pub deadline: Option<Duration>,
}

/// Why the scroll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    IterationsExhausted,
    Stable,
    Deadline,
}

/// Loop state handed to [`HaltPolicy::check`] before each scroll step.
#[derive(Debug, Clone, Copy)]
pub struct LoopProgress {
    /// Scroll steps completed so far.
    pub completed: u32,
    pub max_iterations: u32,
    /// Consecutive passes that added nothing new.
    pub stale_passes: u32,
    pub elapsed: Duration,
}

impl HaltPolicy {
    /// Decide whether the loop should stop before the next step.
    pub fn check(&self, progress: &LoopProgress) -> Option<HaltReason> {
        if progress.completed >= progress.max_iterations {
            return Some(HaltReason::IterationsExhausted);
        }
        if let Some(needed) = self.stable_passes {
            if needed > 0 && progress.stale_passes >= needed {
                return Some(HaltReason::Stable);
            }
        }
        if let Some(deadline) = self.deadline {
            if progress.elapsed >= deadline {
                return Some(HaltReason::Deadline);
            }
        }
        None
    }
}

/// Result of a collection run.
#[derive(Debug, Clone)]
pub struct CollectReport {
    /// Unique items in first-observed order.
    pub items: Vec<MediaItem>,
    /// Extraction passes performed, including the closing ones.
    pub passes: u32,
    pub halted: HaltReason,
    /// Network-idle outcome, when the wait was requested.
    pub network: Option<IdleOutcome>,
}

/// Scroll through the page, merging every extraction pass.
pub async fn collect_with_scrolling<P>(page: &P, config: &CollectConfig) -> SweepResult<CollectReport>
where
    P: PageHandle + ?Sized,
{
    pause(config.initial_settle_wait).await;

    let started = Instant::now();
    let mut acc = Accumulator::new();
    let mut passes = 0u32;
    let mut completed = 0u32;
    let mut stale_passes = 0u32;

    let halted = loop {
        let progress = LoopProgress {
            completed,
            max_iterations: config.scroll_iterations,
            stale_passes,
            elapsed: started.elapsed(),
        };
        if let Some(reason) = config.halt.check(&progress) {
            break reason;
        }

        let added = acc.merge(extract_visible(page).await?);
        passes += 1;
        stale_passes = if added == 0 { stale_passes + 1 } else { 0 };
        tracing::debug!(
            "pass {passes}: {added} new, {} total ({stale_passes} stale)",
            acc.len()
        );

        page.scroll_by_viewport(config.scroll_fraction).await?;
        pause(config.wait_between_scrolls).await;
        completed += 1;
    };

    // The last scroll position may have attached media not yet captured.
    let added = acc.merge(extract_visible(page).await?);
    passes += 1;
    tracing::debug!("final pass: {added} new, {} total", acc.len());

    if config.return_to_top {
        page.scroll_to_top().await?;
        pause(config.top_settle_wait).await;
    }

    let network = match config.network_idle_timeout {
        Some(timeout) => {
            let outcome = page.wait_for_network_idle(timeout).await?;
            if outcome == IdleOutcome::TimedOut {
                tracing::warn!(
                    "network did not settle within {}ms, keeping what was gathered",
                    timeout.as_millis()
                );
            }
            Some(outcome)
        }
        None => None,
    };

    if config.return_to_top || network.is_some() {
        let added = acc.merge(extract_visible(page).await?);
        passes += 1;
        tracing::debug!("closing pass: {added} new, {} total", acc.len());
    }

    tracing::info!(
        "collected {} items in {passes} passes ({halted:?})",
        acc.len()
    );

    Ok(CollectReport {
        items: acc.into_items(),
        passes,
        halted,
        network,
    })
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomSnapshot, ImageElement, VideoElement};
    use crate::scripted::ScriptedPage;
    use crate::types::MediaKind;

    fn img(src: &str, w: u32) -> ImageElement {
        ImageElement {
            current_src: Some(src.to_string()),
            src: Some(src.to_string()),
            natural_width: w,
            natural_height: w,
        }
    }

    fn frame(images: Vec<ImageElement>, videos: Vec<VideoElement>) -> DomSnapshot {
        DomSnapshot {
            location: "https://www.example.com/gallery".into(),
            images,
            videos,
        }
    }

    #[tokio::test]
    async fn test_single_iteration_end_to_end() {
        let page = ScriptedPage::new(vec![frame(
            vec![
                img("https://cdn.example.com/a.jpg?w=400", 400),
                img("https://cdn.example.com/a.jpg?w=800", 800),
                img("https://cdn.example.com/b.webp", 300),
            ],
            vec![VideoElement {
                current_src: Some("https://cdn.example.com/clip.mp4".into()),
                poster: Some("https://cdn.example.com/clip.jpg".into()),
                ..Default::default()
            }],
        )]);

        let report = collect_with_scrolling(&page, &CollectConfig::immediate(1))
            .await
            .unwrap();

        assert_eq!(report.items.len(), 3);
        assert_eq!(report.items[0].src, "https://cdn.example.com/a.jpg");
        assert_eq!(report.items[0].width, Some(400));
        assert_eq!(report.items[2].kind, MediaKind::Video);
        assert_eq!(report.halted, HaltReason::IterationsExhausted);
        assert_eq!(page.scrolls(), 1);
    }

    #[tokio::test]
    async fn test_variants_collapse_to_one_entry() {
        let page = ScriptedPage::new(vec![
            frame(vec![img("https://cdn.example.com/a.jpg?w=400", 400)], vec![]),
            frame(vec![img("https://cdn.example.com/a.jpg?w=1200", 1200)], vec![]),
        ]);

        let report = collect_with_scrolling(&page, &CollectConfig::immediate(2))
            .await
            .unwrap();

        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].width, Some(400));
    }

    #[tokio::test]
    async fn test_keeps_items_that_detach() {
        // a.jpg is only present in the first frame, c.jpg only in the last.
        let page = ScriptedPage::new(vec![
            frame(vec![img("https://x/a.jpg", 1), img("https://x/b.jpg", 1)], vec![]),
            frame(vec![img("https://x/b.jpg", 1)], vec![]),
            frame(vec![img("https://x/c.jpg", 1)], vec![]),
        ]);
        let config = CollectConfig {
            return_to_top: false,
            ..CollectConfig::immediate(2)
        };

        let report = collect_with_scrolling(&page, &config).await.unwrap();

        let srcs: Vec<_> = report.items.iter().map(|i| i.src.as_str()).collect();
        assert_eq!(srcs, ["https://x/a.jpg", "https://x/b.jpg", "https://x/c.jpg"]);
        // Two loop passes plus the final one.
        assert_eq!(report.passes, 3);
        assert_eq!(page.position(), 2);
    }

    #[tokio::test]
    async fn test_zero_iterations_still_extracts_once() {
        let page = ScriptedPage::new(vec![frame(vec![img("https://x/a.png", 1)], vec![])]);
        let config = CollectConfig {
            return_to_top: false,
            ..CollectConfig::immediate(0)
        };

        let report = collect_with_scrolling(&page, &config).await.unwrap();

        assert_eq!(report.items.len(), 1);
        assert_eq!(report.passes, 1);
        assert_eq!(page.scrolls(), 0);
    }

    #[tokio::test]
    async fn test_stable_policy_stops_early() {
        let mut frames = vec![frame(vec![img("https://x/a.jpg", 1)], vec![])];
        frames.extend((0..10).map(|_| frame(vec![img("https://x/a.jpg", 1)], vec![])));
        let page = ScriptedPage::new(frames);
        let config = CollectConfig {
            halt: HaltPolicy {
                stable_passes: Some(2),
                deadline: None,
            },
            return_to_top: false,
            ..CollectConfig::immediate(10)
        };

        let report = collect_with_scrolling(&page, &config).await.unwrap();

        assert_eq!(report.halted, HaltReason::Stable);
        // One productive pass, two stale ones.
        assert_eq!(page.scrolls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_loop() {
        let page = ScriptedPage::new(vec![frame(vec![img("https://x/a.jpg", 1)], vec![])]);
        let config = CollectConfig {
            wait_between_scrolls: Duration::from_secs(1),
            halt: HaltPolicy {
                stable_passes: None,
                deadline: Some(Duration::from_millis(2500)),
            },
            return_to_top: false,
            ..CollectConfig::immediate(100)
        };

        let report = collect_with_scrolling(&page, &config).await.unwrap();

        assert_eq!(report.halted, HaltReason::Deadline);
        assert_eq!(page.scrolls(), 3);
    }

    #[tokio::test]
    async fn test_network_idle_outcome_reported() {
        let page = ScriptedPage::new(vec![frame(vec![], vec![])])
            .with_idle_outcome(IdleOutcome::TimedOut);
        let config = CollectConfig {
            network_idle_timeout: Some(Duration::from_millis(10)),
            ..CollectConfig::immediate(1)
        };

        let report = collect_with_scrolling(&page, &config).await.unwrap();

        assert_eq!(report.network, Some(IdleOutcome::TimedOut));
        assert!(report.items.is_empty());
    }

    #[tokio::test]
    async fn test_return_to_top_adds_closing_pass() {
        let page = ScriptedPage::new(vec![
            frame(vec![img("https://x/a.jpg", 1)], vec![]),
            frame(vec![img("https://x/b.jpg", 1)], vec![]),
        ]);

        let report = collect_with_scrolling(&page, &CollectConfig::immediate(1))
            .await
            .unwrap();

        assert_eq!(report.passes, 3);
        assert_eq!(page.position(), 0);
        assert_eq!(page.snapshots_taken(), 3);
        assert_eq!(report.items.len(), 2);
    }

    #[test]
    fn test_halt_policy_iteration_bound_wins() {
        let policy = HaltPolicy {
            stable_passes: Some(1),
            deadline: Some(Duration::ZERO),
        };
        let progress = LoopProgress {
            completed: 5,
            max_iterations: 5,
            stale_passes: 3,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(policy.check(&progress), Some(HaltReason::IterationsExhausted));
    }

    #[test]
    fn test_halt_policy_zero_stable_passes_disabled() {
        let policy = HaltPolicy {
            stable_passes: Some(0),
            deadline: None,
        };
        let progress = LoopProgress {
            completed: 0,
            max_iterations: 5,
            stale_passes: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(policy.check(&progress), None);
    }
}
