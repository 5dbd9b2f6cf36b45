//! Configuration loading and resolution.
//!
//! Every setting resolves as: command-line flag, then environment variable,
//! then built-in default. Resolution happens once at startup; nothing below
//! this module reads the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use gallery_sweep::{CollectConfig, HaltPolicy};

/// Gallery scraped when no URL is given.
pub const DEFAULT_URL: &str = "https://www.cosmos.so/rlphoto/swim";

/// Manifest path used when no output path is given.
pub const DEFAULT_OUT_FILE: &str = "public/gallery.json";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome Safari";

const DEFAULT_VIEWPORT_WIDTH: u32 = 1600;
const DEFAULT_VIEWPORT_HEIGHT: u32 = 2000;
const DEFAULT_NAV_TIMEOUT_SECS: u64 = 120;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5000;

/// Browser command timeout used when no configured wait needs longer.
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Headroom over the idle wait for the in-page script to return.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Command-line overrides. Unset fields fall through to the environment and defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct SweepOverrides {
    /// Gallery page to scrape [env: SWEEP_URL].
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Manifest output path [env: SWEEP_OUT_FILE].
    #[arg(short, long, global = true)]
    pub out: Option<PathBuf>,

    /// Number of scroll steps [env: SWEEP_SCROLLS].
    #[arg(long, global = true)]
    pub scrolls: Option<u32>,

    /// Pause after each scroll step, in milliseconds [env: SWEEP_SCROLL_WAIT_MS].
    #[arg(long, global = true)]
    pub scroll_wait_ms: Option<u64>,

    /// Pause after page load before the first scroll, in milliseconds [env: SWEEP_SETTLE_MS].
    #[arg(long, global = true)]
    pub settle_ms: Option<u64>,

    /// Browser viewport width.
    #[arg(long, global = true)]
    pub viewport_width: Option<u32>,

    /// Browser viewport height.
    #[arg(long, global = true)]
    pub viewport_height: Option<u32>,

    /// Stop scrolling after this many passes find nothing new.
    #[arg(long, global = true)]
    pub stable_passes: Option<u32>,

    /// Stop scrolling after this many seconds.
    #[arg(long, global = true)]
    pub deadline_secs: Option<u64>,

    /// Hard timeout for the initial navigation, in seconds.
    #[arg(long, global = true)]
    pub nav_timeout_secs: Option<u64>,

    /// Network-idle wait after scrolling, in milliseconds (0 disables).
    #[arg(long, global = true)]
    pub idle_timeout_ms: Option<u64>,

    /// Chromium executable [env: SWEEP_CHROMIUM_PATH].
    #[arg(long, global = true)]
    pub chromium: Option<PathBuf>,
}

/// Browser viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub url: String,
    pub out_file: PathBuf,
    pub viewport: Viewport,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    pub chromium_path: Option<PathBuf>,
    pub collect: CollectConfig,
}

impl SweepConfig {
    /// Resolve against the process environment.
    pub fn resolve(overrides: SweepOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(overrides: SweepOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = overrides
            .url
            .or_else(|| env("SWEEP_URL"))
            .or_else(|| env("COSMOS_URL"))
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let out_file = overrides
            .out
            .or_else(|| env("SWEEP_OUT_FILE").map(PathBuf::from))
            .or_else(|| env("OUT_FILE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_FILE));

        let defaults = CollectConfig::default();

        let scroll_iterations = match overrides.scrolls {
            Some(n) => n,
            None => env_number(&env, "SWEEP_SCROLLS")?.unwrap_or(defaults.scroll_iterations),
        };
        let wait_between_scrolls = match overrides.scroll_wait_ms {
            Some(ms) => Duration::from_millis(ms),
            None => env_number(&env, "SWEEP_SCROLL_WAIT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.wait_between_scrolls),
        };
        let initial_settle_wait = match overrides.settle_ms {
            Some(ms) => Duration::from_millis(ms),
            None => env_number(&env, "SWEEP_SETTLE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_settle_wait),
        };

        let idle_ms = overrides.idle_timeout_ms.unwrap_or(DEFAULT_IDLE_TIMEOUT_MS);
        let network_idle_timeout = (idle_ms > 0).then(|| Duration::from_millis(idle_ms));

        let collect = CollectConfig {
            scroll_iterations,
            wait_between_scrolls,
            initial_settle_wait,
            network_idle_timeout,
            halt: HaltPolicy {
                stable_passes: overrides.stable_passes,
                deadline: overrides.deadline_secs.map(Duration::from_secs),
            },
            ..defaults
        };

        let viewport = Viewport {
            width: overrides.viewport_width.unwrap_or(DEFAULT_VIEWPORT_WIDTH),
            height: overrides.viewport_height.unwrap_or(DEFAULT_VIEWPORT_HEIGHT),
        };
        if viewport.width == 0 || viewport.height == 0 {
            anyhow::bail!("viewport must be non-zero, got {}x{}", viewport.width, viewport.height);
        }

        let chromium_path = overrides
            .chromium
            .or_else(|| env("SWEEP_CHROMIUM_PATH").map(PathBuf::from));

        Ok(Self {
            url,
            out_file,
            viewport,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(
                overrides.nav_timeout_secs.unwrap_or(DEFAULT_NAV_TIMEOUT_SECS),
            ),
            chromium_path,
            collect,
        })
    }
}

impl SweepConfig {
    /// Per-command timeout for the browser connection.
    ///
    /// Navigation and the in-page network-idle script each run as a single
    /// browser command, so this must outlast both configured waits.
    pub fn browser_request_timeout(&self) -> Duration {
        let idle = self
            .collect
            .network_idle_timeout
            .map(|t| t + REQUEST_TIMEOUT_SLACK)
            .unwrap_or_default();
        MIN_REQUEST_TIMEOUT.max(self.navigation_timeout).max(idle)
    }
}

fn env_number<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SweepConfig::resolve_with(SweepOverrides::default(), lookup(&[])).unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.out_file, PathBuf::from(DEFAULT_OUT_FILE));
        assert_eq!(config.collect.scroll_iterations, 40);
        assert_eq!(config.collect.wait_between_scrolls, Duration::from_millis(600));
        assert_eq!(config.collect.initial_settle_wait, Duration::from_secs(3));
        assert_eq!(config.navigation_timeout, Duration::from_secs(120));
        assert_eq!(config.collect.network_idle_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.collect.halt, HaltPolicy::default());
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env = lookup(&[
            ("SWEEP_URL", "https://example.com/g"),
            ("SWEEP_OUT_FILE", "/tmp/out.json"),
            ("SWEEP_SCROLLS", "12"),
            ("SWEEP_SCROLL_WAIT_MS", "250"),
            ("SWEEP_SETTLE_MS", " 1000 "),
        ]);
        let config = SweepConfig::resolve_with(SweepOverrides::default(), env).unwrap();
        assert_eq!(config.url, "https://example.com/g");
        assert_eq!(config.out_file, PathBuf::from("/tmp/out.json"));
        assert_eq!(config.collect.scroll_iterations, 12);
        assert_eq!(config.collect.wait_between_scrolls, Duration::from_millis(250));
        assert_eq!(config.collect.initial_settle_wait, Duration::from_secs(1));
    }

    #[test]
    fn test_legacy_env_names() {
        let env = lookup(&[("COSMOS_URL", "https://example.com/legacy"), ("OUT_FILE", "g.json")]);
        let config = SweepConfig::resolve_with(SweepOverrides::default(), env).unwrap();
        assert_eq!(config.url, "https://example.com/legacy");
        assert_eq!(config.out_file, PathBuf::from("g.json"));
    }

    #[test]
    fn test_flags_beat_env() {
        let env = lookup(&[("SWEEP_URL", "https://example.com/env"), ("SWEEP_SCROLLS", "not-a-number")]);
        let overrides = SweepOverrides {
            url: Some("https://example.com/flag".into()),
            scrolls: Some(3),
            ..Default::default()
        };
        let config = SweepConfig::resolve_with(overrides, env).unwrap();
        assert_eq!(config.url, "https://example.com/flag");
        assert_eq!(config.collect.scroll_iterations, 3);
    }

    #[test]
    fn test_bad_env_number_is_error() {
        let env = lookup(&[("SWEEP_SCROLL_WAIT_MS", "soon")]);
        let err = SweepConfig::resolve_with(SweepOverrides::default(), env).unwrap_err();
        assert!(err.to_string().contains("SWEEP_SCROLL_WAIT_MS"));
    }

    #[test]
    fn test_halt_and_idle_flags() {
        let overrides = SweepOverrides {
            stable_passes: Some(4),
            deadline_secs: Some(90),
            idle_timeout_ms: Some(0),
            ..Default::default()
        };
        let config = SweepConfig::resolve_with(overrides, lookup(&[])).unwrap();
        assert_eq!(config.collect.halt.stable_passes, Some(4));
        assert_eq!(config.collect.halt.deadline, Some(Duration::from_secs(90)));
        assert_eq!(config.collect.network_idle_timeout, None);
    }

    #[test]
    fn test_request_timeout_covers_navigation() {
        let config = SweepConfig::resolve_with(SweepOverrides::default(), lookup(&[])).unwrap();
        assert_eq!(config.browser_request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_request_timeout_covers_long_idle_wait() {
        let overrides = SweepOverrides {
            nav_timeout_secs: Some(10),
            idle_timeout_ms: Some(45_000),
            ..Default::default()
        };
        let config = SweepConfig::resolve_with(overrides, lookup(&[])).unwrap();
        assert_eq!(config.browser_request_timeout(), Duration::from_secs(50));
    }

    #[test]
    fn test_request_timeout_floor() {
        let overrides = SweepOverrides {
            nav_timeout_secs: Some(5),
            idle_timeout_ms: Some(0),
            ..Default::default()
        };
        let config = SweepConfig::resolve_with(overrides, lookup(&[])).unwrap();
        assert_eq!(config.browser_request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_viewport_rejected() {
        let overrides = SweepOverrides {
            viewport_width: Some(0),
            ..Default::default()
        };
        assert!(SweepConfig::resolve_with(overrides, lookup(&[])).is_err());
    }
}
