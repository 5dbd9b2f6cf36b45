//! GallerySweep — entry point.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use gallery_sweep::{Manifest, ManifestReader};
use gallery_sweep_cli::config::{SweepConfig, SweepOverrides};
use gallery_sweep_cli::renderer::chromium::{ChromiumRenderer, LaunchOptions};
use gallery_sweep_cli::renderer::Renderer;
use gallery_sweep_cli::{doctor, run_replay, run_sweep};

#[derive(Parser)]
#[command(
    name = "gallery-sweep",
    about = "GallerySweep — scroll an infinite gallery in headless Chromium and write a media manifest",
    version
)]
struct Cli {
    #[command(flatten)]
    sweep: SweepOverrides,

    /// Also print the manifest as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the gallery and write the manifest (default).
    Run,

    /// Run the collector over recorded DOM snapshots instead of a live browser.
    Replay {
        /// JSON array of DOM snapshots, one per scroll position.
        frames: PathBuf,
    },

    /// Check a manifest for duplicate entries and a consistent count.
    Validate {
        /// Manifest to check (defaults to the configured output path).
        path: Option<PathBuf>,
    },

    /// Check that Chromium is available and show the resolved settings.
    Doctor,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   gallery-sweep completions bash > ~/.local/share/bash-completion/completions/gallery-sweep
    ///   gallery-sweep completions zsh > ~/.zfunc/_gallery-sweep
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = SweepConfig::resolve(cli.sweep)?;
            let renderer = ChromiumRenderer::launch(&LaunchOptions {
                executable: config.chromium_path.clone(),
                viewport: config.viewport,
                user_agent: config.user_agent.clone(),
                request_timeout: config.browser_request_timeout(),
            })
            .await?;

            let result = run_sweep(&renderer, &config).await;
            if let Err(e) = renderer.shutdown().await {
                tracing::warn!("browser shutdown failed: {e:#}");
            }
            print_summary(&result?, &config.out_file, cli.json)?;
        }

        Commands::Replay { frames } => {
            let config = SweepConfig::resolve(cli.sweep)?;
            let manifest = run_replay(&frames, &config).await?;
            print_summary(&manifest, &config.out_file, cli.json)?;
        }

        Commands::Validate { path } => {
            let path = match path {
                Some(p) => p,
                None => SweepConfig::resolve(cli.sweep)?.out_file,
            };
            match ManifestReader::read_from_file(&path).and_then(|m| m.validate().map(|_| m)) {
                Ok(manifest) => {
                    println!("Valid manifest: {}", path.display());
                    println!("  Source: {}", manifest.source);
                    println!("  Items:  {}", manifest.count);
                    println!("  Images: {}", manifest.image_count());
                    println!("  Videos: {}", manifest.video_count());
                }
                Err(e) => {
                    eprintln!("Invalid manifest {}: {e}", path.display());
                    std::process::exit(1);
                }
            }
        }

        Commands::Doctor => {
            let config = SweepConfig::resolve(cli.sweep)?;
            if !doctor::run(&config)? {
                std::process::exit(1);
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gallery-sweep", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn print_summary(manifest: &Manifest, out_file: &Path, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
    }
    println!("Wrote {} with {} items", out_file.display(), manifest.count);
    Ok(())
}
