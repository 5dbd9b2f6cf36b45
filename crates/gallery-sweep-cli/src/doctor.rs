//! Environment readiness check.

use anyhow::Result;

use crate::config::SweepConfig;
use crate::renderer::chromium::find_chromium;

/// Report whether a sweep with `config` could run here. Returns readiness.
pub fn run(config: &SweepConfig) -> Result<bool> {
    println!("GallerySweep Doctor");
    println!("===================");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = find_chromium(config.chromium_path.as_deref());
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Install Chrome/Chromium or pass --chromium <path>."),
    }

    let out_dir = config
        .out_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    if out_dir.exists() {
        println!("[OK] Output directory exists: {}", out_dir.display());
    } else {
        println!("[..] Output directory will be created: {}", out_dir.display());
    }

    println!();
    println!("Target:    {}", config.url);
    println!("Output:    {}", config.out_file.display());
    println!(
        "Scrolling: {} steps, {}ms apart, {}ms settle",
        config.collect.scroll_iterations,
        config.collect.wait_between_scrolls.as_millis(),
        config.collect.initial_settle_wait.as_millis()
    );
    println!(
        "Viewport:  {}x{}",
        config.viewport.width, config.viewport.height
    );

    println!();
    let ready = chromium.is_some();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(ready)
}
