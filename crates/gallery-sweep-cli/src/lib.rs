//! GallerySweep command-line front end — drive headless Chromium through a gallery and write its manifest.

pub mod config;
pub mod doctor;
pub mod renderer;
pub mod sweep;

pub use config::{SweepConfig, SweepOverrides};
pub use renderer::{NavigationResult, RenderedPage, Renderer};
pub use sweep::{navigate_with_timeout, run_replay, run_sweep};
