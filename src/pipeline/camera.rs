// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-side camera unit
//!
//! Wraps an owned backend with the per-camera processing state the
//! driver needs: enable and feature toggles, the temporal buffers for
//! depth and edge smoothing, and the degrade bookkeeping. The driver
//! owns the collection and hands out ids; nothing outside the pipeline
//! holds a reference to a backend.

use image::GrayImage;
use tracing::warn;

use crate::backends::{BackendKind, CameraIntrinsics, ColorFrame, DepthCamera, DepthFrame};
use crate::config::SmoothingSettings;
use crate::errors::PipelineResult;
use crate::pipeline::temporal::TemporalBuffer;

/// What the degrade policy did in response to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradeAction {
    /// Sphere detection was switched off, the camera stays enabled
    SpheresOff,
    /// The camera was disabled outright
    Disabled,
}

pub struct Camera {
    id: u32,
    backend: Box<dyn DepthCamera>,
    /// Disabled cameras are skipped each tick and never re-enabled by
    /// the driver
    pub enabled: bool,
    pub detect_spheres: bool,
    pub show_color: bool,
    pub smoothing: bool,
    depth_buffer: TemporalBuffer,
    edge_buffer: TemporalBuffer,
}

impl Camera {
    pub fn new(id: u32, backend: Box<dyn DepthCamera>, smoothing: &SmoothingSettings) -> Self {
        Self {
            id,
            backend,
            enabled: true,
            detect_spheres: true,
            show_color: false,
            smoothing: smoothing.enabled,
            depth_buffer: TemporalBuffer::new(smoothing.window),
            edge_buffer: TemporalBuffer::new(smoothing.window),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Human-readable per-camera label, stable for a session
    pub fn display_name(&self) -> String {
        format!("{} [{}] #{}", self.backend.name(), self.backend.kind(), self.id)
    }

    pub fn intrinsics(&self) -> CameraIntrinsics {
        self.backend.intrinsics()
    }

    pub fn has_color_stream(&self) -> bool {
        self.backend.has_color_stream()
    }

    pub fn color_frame(&mut self) -> Option<ColorFrame> {
        self.backend.color_frame()
    }

    /// Acquire the next frame from the backend
    pub fn acquire(&mut self) -> PipelineResult<DepthFrame> {
        self.backend.depth_frame()
    }

    /// Run a freshly acquired frame through the depth temporal buffer.
    ///
    /// With smoothing off this is a pass-through. A frame that fails to
    /// rebuild from the averaged plane falls back to the raw frame,
    /// which cannot happen for fixed-dimension sessions.
    pub fn smooth_depth(&mut self, frame: DepthFrame) -> DepthFrame {
        if !self.smoothing {
            return frame;
        }
        self.depth_buffer.enqueue(frame.to_plane_f32());
        match self.depth_buffer.value() {
            Some(plane) => DepthFrame::from_plane_f32(
                frame.width(),
                frame.height(),
                &plane,
                frame.depth_scale(),
            )
            .unwrap_or(frame),
            None => frame,
        }
    }

    /// Average the edge image with its recent history
    pub fn smooth_edges(&mut self, edges: GrayImage) -> GrayImage {
        if !self.smoothing {
            return edges;
        }
        let (width, height) = edges.dimensions();
        self.edge_buffer
            .enqueue(edges.as_raw().iter().map(|&v| f32::from(v)).collect());
        match self.edge_buffer.value() {
            Some(plane) => {
                let data = plane
                    .iter()
                    .map(|&v| v.round().clamp(0.0, 255.0) as u8)
                    .collect();
                GrayImage::from_raw(width, height, data).unwrap_or(edges)
            }
            None => edges,
        }
    }

    /// Resize both temporal buffers; a changed window drops history
    pub fn set_smoothing_window(&mut self, window: usize) {
        self.depth_buffer.set_capacity(window);
        self.edge_buffer.set_capacity(window);
    }

    /// Apply the degrade policy after a processing error: sphere
    /// detection goes first, the camera itself second. Monotonic, the
    /// driver never walks this back.
    pub fn degrade(&mut self) -> DegradeAction {
        if self.detect_spheres {
            self.detect_spheres = false;
            warn!(
                camera = self.display_name(),
                "Degrading camera: sphere detection disabled"
            );
            DegradeAction::SpheresOff
        } else {
            self.enabled = false;
            warn!(camera = self.display_name(), "Camera disabled after repeated errors");
            DegradeAction::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::source::{SceneUnits, SyntheticScene};
    use crate::backends::stereo::StereoCamera;
    use crate::backends::types::DeviceInfo;

    fn test_camera(id: u32) -> Camera {
        let source = SyntheticScene::new(64, 48, SceneUnits::Millimeters, 2000, 1000, 8.0);
        let backend = StereoCamera::with_default_calibration(
            "synthetic",
            Box::new(source),
            DeviceInfo::default(),
        );
        Camera::new(id, Box::new(backend), &SmoothingSettings::default())
    }

    #[test]
    fn degrade_steps_through_spheres_then_disable() {
        let mut camera = test_camera(0);
        assert!(camera.enabled && camera.detect_spheres);

        assert_eq!(camera.degrade(), DegradeAction::SpheresOff);
        assert!(camera.enabled);
        assert!(!camera.detect_spheres);

        assert_eq!(camera.degrade(), DegradeAction::Disabled);
        assert!(!camera.enabled);
    }

    #[test]
    fn smoothing_disabled_passes_frames_through() {
        let mut camera = test_camera(0);
        camera.smoothing = false;
        let frame = camera.acquire().unwrap();
        let smoothed = camera.smooth_depth(frame.clone());
        assert_eq!(smoothed.depth_at(10, 10), frame.depth_at(10, 10));
    }

    #[test]
    fn smoothing_averages_consecutive_frames() {
        let mut camera = test_camera(0);
        camera.smoothing = true;

        let first = camera.acquire().unwrap();
        let second = camera.acquire().unwrap();
        let a = camera.smooth_depth(first);
        let b = camera.smooth_depth(second.clone());

        // the second smoothed frame is the mean of two inputs, so on
        // the static wall it matches both raw frames
        assert_eq!(a.width(), b.width());
        assert_eq!(b.depth_at(1, 1), second.depth_at(1, 1));
    }

    #[test]
    fn display_name_carries_id_and_kind() {
        let camera = test_camera(3);
        let label = camera.display_name();
        assert!(label.contains("#3"));
        assert!(label.contains("synthetic"));
    }
}
