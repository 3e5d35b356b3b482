#![warn(missing_docs)]
//! # cropscope-app binary
//!
//! Headless smoke entry point: reports configuration and runs one
//! deterministic capture-and-normalize cycle against the synthetic camera
//! backend so the pipeline can be exercised on any platform without
//! hardware.

use std::sync::Arc;

use cropscope_app::{AnalysisCoordinator, analyze_endpoint_from_env, capture_enabled_from_env};
use cropscope_camera::{DeviceStream, PreviewSink, SyntheticCameraDevice};
use cropscope_core::{PipelinePhase, PreviewRegistry};

struct HeadlessSink;

impl PreviewSink for HeadlessSink {
    fn is_mounted(&self) -> bool {
        true
    }

    fn attach(&self, stream: &DeviceStream) {
        println!("preview bound to stream {}", stream.id());
    }

    fn detach(&self) {}
}

/// CLI entry point.
fn main() {
    println!("cropscope-app {}", cropscope_app::app_version());
    println!("analyze_endpoint={}", analyze_endpoint_from_env());
    println!(
        "capture_enabled={} (CROPSCOPE_CAPTURE_ENABLED)",
        capture_enabled_from_env()
    );

    if !capture_enabled_from_env() {
        return;
    }

    if let Err(error) = run_smoke_cycle() {
        eprintln!("smoke cycle failed: {error}");
        std::process::exit(1);
    }
}

fn run_smoke_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let device = Arc::new(SyntheticCameraDevice::new(8, 8));
    let previews = PreviewRegistry::new();
    let mut coordinator = AnalysisCoordinator::new(device, previews.clone());

    coordinator.start_camera()?;
    coordinator.mount_preview(&HeadlessSink)?;
    coordinator.take_photo()?;

    match coordinator.current_asset() {
        Some(asset) => println!(
            "captured {} ({} canonical bytes)",
            asset.display_name,
            asset.jpeg_bytes.len()
        ),
        None => return Err("capture produced no asset".into()),
    }

    coordinator.reset();
    if coordinator.phase() != PipelinePhase::Idle {
        return Err("pipeline did not return to idle".into());
    }
    if previews.live_count() != 0 {
        return Err("preview handles leaked across reset".into());
    }
    println!("pipeline reset clean");
    Ok(())
}
