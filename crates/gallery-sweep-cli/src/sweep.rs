//! End-to-end sweep: open a page, navigate, collect, write the manifest.
//!
//! The manifest is written only after collection completes. A navigation
//! failure or timeout aborts the run with nothing on disk.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use gallery_sweep::{
    collect_with_scrolling, CollectConfig, CollectReport, DomSnapshot, Manifest, ManifestWriter,
    ScriptedPage,
};

use crate::config::SweepConfig;
use crate::renderer::{NavigationResult, RenderedPage, Renderer};

/// Navigate with a hard deadline.
pub async fn navigate_with_timeout(
    page: &mut dyn RenderedPage,
    url: &str,
    timeout: Duration,
) -> Result<NavigationResult> {
    match tokio::time::timeout(timeout, page.navigate(url)).await {
        Ok(Ok(nav)) => Ok(nav),
        Ok(Err(e)) => Err(e.context(format!("navigation to {url} failed"))),
        Err(_) => bail!(
            "navigation to {url} timed out after {}ms",
            timeout.as_millis()
        ),
    }
}

/// Run a full sweep against `renderer` and write the manifest to `config.out_file`.
pub async fn run_sweep(renderer: &dyn Renderer, config: &SweepConfig) -> Result<Manifest> {
    let mut page = renderer.open_page().await.context("failed to open page")?;

    let outcome = navigate_and_collect(page.as_mut(), config).await;
    if let Err(e) = page.close().await {
        tracing::warn!("failed to close page: {e:#}");
    }
    let report = outcome?;

    write_manifest(&config.url, report, &config.out_file)
}

async fn navigate_and_collect(
    page: &mut dyn RenderedPage,
    config: &SweepConfig,
) -> Result<CollectReport> {
    tracing::info!("loading {}", config.url);
    let nav = navigate_with_timeout(page, &config.url, config.navigation_timeout).await?;
    tracing::info!("loaded {} in {}ms", nav.final_url, nav.load_time_ms);

    collect_with_scrolling(&*page, &config.collect)
        .await
        .context("media collection failed")
}

/// Replay recorded DOM snapshots through the collector and write the manifest.
///
/// Each recorded frame stands for one scroll position. Waits are skipped.
pub async fn run_replay(frames_path: &Path, config: &SweepConfig) -> Result<Manifest> {
    let raw = std::fs::read_to_string(frames_path)
        .with_context(|| format!("failed to read {}", frames_path.display()))?;
    let frames: Vec<DomSnapshot> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a list of DOM snapshots", frames_path.display()))?;
    if frames.is_empty() {
        bail!("{} contains no snapshots", frames_path.display());
    }

    let source = frames
        .first()
        .map(|f| f.location.clone())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| config.url.clone());

    let collect = CollectConfig {
        halt: config.collect.halt.clone(),
        ..CollectConfig::immediate(config.collect.scroll_iterations)
    };
    let page = ScriptedPage::new(frames);
    let report = collect_with_scrolling(&page, &collect)
        .await
        .context("replay failed")?;

    write_manifest(&source, report, &config.out_file)
}

fn write_manifest(source: &str, report: CollectReport, out_file: &Path) -> Result<Manifest> {
    let manifest = Manifest::from_items(source, report.items);
    ManifestWriter::write_to_file(&manifest, out_file)
        .with_context(|| format!("failed to write {}", out_file.display()))?;

    tracing::info!(
        "wrote {} ({} images, {} videos, halted: {:?}, network: {:?})",
        out_file.display(),
        manifest.image_count(),
        manifest.video_count(),
        report.halted,
        report.network
    );
    Ok(manifest)
}
