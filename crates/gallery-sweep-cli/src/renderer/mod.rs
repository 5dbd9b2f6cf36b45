//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderedPage` traits that abstract over the
//! browser engine (currently Chromium via chromiumoxide). A `RenderedPage` is
//! also a [`PageHandle`], so the collector can drive it directly.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gallery_sweep::PageHandle;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can open pages.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new blank page (tab).
    async fn open_page(&self) -> Result<Box<dyn RenderedPage>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
}

/// A single browser page.
#[async_trait]
pub trait RenderedPage: PageHandle {
    /// Navigate to a URL. Callers bound this with their own timeout.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult>;
    /// Get the current URL.
    async fn current_url(&self) -> Result<String>;
    /// Close this page.
    async fn close(self: Box<Self>) -> Result<()>;
}
