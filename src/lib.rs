// SPDX-License-Identifier: GPL-3.0-only

//! Depthmark - depth-camera sphere marker detection
//!
//! This library processes depth-camera streams: it normalizes frames
//! from heterogeneous backends, smooths them over time, derives edge
//! maps, finds spherical markers validated against scene depth, and
//! estimates surface normals.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Depth camera abstraction and device discovery
//! - [`pipeline`]: Per-tick frame processing stages and the driver
//! - [`output`]: Sink seam between the pipeline and display/recording
//! - [`config`]: Validated pipeline parameters, persisted as JSON
//! - [`errors`]: Structured pipeline error types
//!
//! # Example
//!
//! ```no_run
//! use depthmark::backends::source::{SceneUnits, SyntheticScene};
//! use depthmark::backends::stereo::StereoCamera;
//! use depthmark::backends::types::DeviceInfo;
//! use depthmark::config::Config;
//! use depthmark::output::LogSink;
//! use depthmark::pipeline::PipelineDriver;
//!
//! let scene = SyntheticScene::new(640, 480, SceneUnits::Millimeters, 2000, 1000, 14.0);
//! let camera = StereoCamera::with_default_calibration(
//!     "demo",
//!     Box::new(scene),
//!     DeviceInfo::default(),
//! );
//!
//! let mut driver = PipelineDriver::new(Config::default());
//! driver.add_camera(Box::new(camera));
//!
//! let mut sink = LogSink;
//! while driver.is_active() {
//!     driver.tick(&mut sink);
//! }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod output;
pub mod pipeline;

// Re-export commonly used types
pub use backends::{DepthCamera, DepthFrame};
pub use pipeline::{Detection, PipelineDriver};
