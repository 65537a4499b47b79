// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! Real depth hardware needs a vendor driver this crate deliberately
//! does not carry, so the CLI runs the full pipeline over a synthetic
//! rig: a wall with a drifting sphere marker, rendered by each backend
//! in its native units. `list` describes the rig, `run` processes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use depthmark::backends::enumeration::{spawn_discovery, CameraBuilder};
use depthmark::backends::source::{FailingSource, SceneUnits, SyntheticScene};
use depthmark::backends::stereo::StereoCamera;
use depthmark::backends::structured_light::StructuredLightCamera;
use depthmark::backends::types::DeviceInfo;
use depthmark::backends::{BackendKind, DepthCamera};
use depthmark::config::Config;
use depthmark::constants::{BASE_HEIGHT, BASE_WIDTH};
use depthmark::errors::AcquisitionError;
use depthmark::output::LogSink;
use depthmark::pipeline::PipelineDriver;

pub struct RunOptions {
    pub cameras: usize,
    pub structured_light: bool,
    pub inject_failure: bool,
    pub ticks: Option<u64>,
    pub edges: bool,
    pub normals: bool,
    pub smoothing: Option<usize>,
}

/// List the cameras the demo rig provides
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    println!("Demo rig cameras:");
    println!();
    println!(
        "  [0] synthetic-stereo      {}  {}x{}  u16 metric depth",
        BackendKind::Stereo,
        BASE_WIDTH,
        BASE_HEIGHT
    );
    println!(
        "  [1] synthetic-kinect      {}  {}x{}  11-bit disparity",
        BackendKind::StructuredLight,
        BASE_WIDTH,
        BASE_HEIGHT
    );
    println!();
    println!("Use 'run --cameras N [--structured-light]' to process them.");
    Ok(())
}

fn stereo_builder(index: usize) -> CameraBuilder {
    Box::new(move || {
        let scene = SyntheticScene::new(BASE_WIDTH, BASE_HEIGHT, SceneUnits::Millimeters, 2000, 1000, 14.0)
            .with_color();
        Ok(Box::new(StereoCamera::with_default_calibration(
            format!("synthetic-stereo-{index}"),
            Box::new(scene),
            DeviceInfo {
                model: "Synthetic Stereo".into(),
                serial: format!("SYN{index:04}"),
                port: None,
            },
        )) as Box<dyn DepthCamera>)
    })
}

fn structured_light_builder() -> CameraBuilder {
    Box::new(|| {
        let scene = SyntheticScene::new(BASE_WIDTH, BASE_HEIGHT, SceneUnits::Disparity, 2000, 1000, 14.0);
        Ok(Box::new(StructuredLightCamera::with_default_calibration(
            "synthetic-kinect",
            Box::new(scene),
            DeviceInfo {
                model: "Synthetic Kinect".into(),
                serial: "SYNSL0001".into(),
                port: None,
            },
        )) as Box<dyn DepthCamera>)
    })
}

fn failing_builder() -> CameraBuilder {
    Box::new(|| {
        let source = FailingSource::new(BASE_WIDTH, BASE_HEIGHT, AcquisitionError::Timeout);
        Ok(Box::new(StereoCamera::with_default_calibration(
            "synthetic-faulty",
            Box::new(source),
            DeviceInfo::default(),
        )) as Box<dyn DepthCamera>)
    })
}

/// Run the processing loop over the demo rig until the tick budget is
/// spent, every camera is disabled, or Ctrl-C
pub fn run_pipeline(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match Config::default_path() {
        Some(path) if path.exists() => Config::load(&path)?,
        _ => Config::default(),
    };
    config.display_edges |= options.edges;
    config.calculate_normals |= options.normals;
    if let Some(window) = options.smoothing {
        config.set_smoothing_window(window)?;
        config.smoothing.enabled = true;
    }

    let mut builders: Vec<CameraBuilder> = Vec::new();
    for index in 0..options.cameras.max(1) {
        builders.push(stereo_builder(index));
    }
    if options.structured_light {
        builders.push(structured_light_builder());
    }
    if options.inject_failure {
        builders.push(failing_builder());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();
    let discovery = spawn_discovery(builders);
    let mut driver = PipelineDriver::new(config).with_discovery(discovery);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let mut sink = LogSink;
    let mut ticks = 0u64;
    while running.load(Ordering::SeqCst) && driver.is_active() {
        driver.tick(&mut sink);
        ticks += 1;
        if options.ticks.is_some_and(|budget| ticks >= budget) {
            break;
        }
        std::thread::sleep(Duration::from_millis(33));
    }

    let enabled = driver.cameras().iter().filter(|c| c.enabled).count();
    println!(
        "Processed {} ticks over {} cameras ({} still enabled).",
        ticks,
        driver.cameras().len(),
        enabled
    );
    Ok(())
}
