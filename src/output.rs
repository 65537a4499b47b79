// SPDX-License-Identifier: GPL-3.0-only

//! Output seam between the pipeline and whatever displays or records
//! its results
//!
//! The driver never draws; it hands each camera's processed tick to a
//! [`FrameSink`]. The CLI uses the logging sink, tests use the
//! recording sink.

use image::{GrayImage, RgbImage};
use tracing::{debug, info};

use crate::backends::{ColorFrame, DepthFrame};
use crate::constants::MAX_DISPLAY_DETECTIONS;
use crate::pipeline::spheres::Detection;

/// Everything one camera produced in one tick
pub struct TickOutput {
    /// Depth frame after optional smoothing
    pub depth: DepthFrame,
    /// Color frame, when the camera has a color stream and it is shown
    pub color: Option<ColorFrame>,
    /// Edge frame, when edge display is on
    pub edges: Option<GrayImage>,
    /// Normal map, when normal estimation is on
    pub normals: Option<RgbImage>,
    /// All detections, strongest first
    pub detections: Vec<Detection>,
}

impl TickOutput {
    /// The leading detections a display should annotate. The full list
    /// stays available in `detections`; only presentation is capped.
    pub fn display_detections(&self) -> &[Detection] {
        let n = self.detections.len().min(MAX_DISPLAY_DETECTIONS);
        &self.detections[..n]
    }
}

pub trait FrameSink {
    fn present(&mut self, camera_id: u32, output: &TickOutput);
}

/// Sink that reports tick results through `tracing`
#[derive(Debug, Default)]
pub struct LogSink;

impl FrameSink for LogSink {
    fn present(&mut self, camera_id: u32, output: &TickOutput) {
        debug!(
            camera_id,
            width = output.depth.width(),
            height = output.depth.height(),
            edges = output.edges.is_some(),
            normals = output.normals.is_some(),
            "Tick frame"
        );
        for detection in output.display_detections() {
            info!(
                camera_id,
                center_x = detection.center.0,
                center_y = detection.center.1,
                radius_px = detection.radius_px,
                depth_m = detection.depth_m,
                x = detection.position.x,
                y = detection.position.y,
                z = detection.position.z,
                "Sphere detected"
            );
        }
    }
}

/// Sink that records per-tick summaries, for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub ticks: Vec<TickRecord>,
}

#[derive(Debug, Clone)]
pub struct TickRecord {
    pub camera_id: u32,
    pub detections: usize,
    pub had_edges: bool,
    pub had_normals: bool,
}

impl FrameSink for RecordingSink {
    fn present(&mut self, camera_id: u32, output: &TickOutput) {
        self.ticks.push(TickRecord {
            camera_id,
            detections: output.detections.len(),
            had_edges: output.edges.is_some(),
            had_normals: output.normals.is_some(),
        });
    }
}
