// SPDX-License-Identifier: GPL-3.0-only

//! Raw frame source abstraction
//!
//! Backends read raw byte planes from a [`RawDepthSource`] and normalize
//! them into [`DepthFrame`]s. Keeping the source behind a trait isolates
//! the normalization logic from how bytes arrive (hardware capture loop,
//! replay, or the synthetic scene used by the demo and tests). Driver
//! implementation itself stays out of scope.

use super::types::ColorFrame;
use crate::constants::structured_light::{DEPTH_COEFF_A, DEPTH_COEFF_B, MAX_RAW_DISPARITY};
use crate::errors::AcquisitionError;
use std::sync::Arc;

/// A raw frame as delivered by a capture source
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Raw little-endian sample bytes (2 bytes per pixel)
    pub data: Arc<[u8]>,
    /// Optional registered color frame
    pub color: Option<ColorFrame>,
    /// Source sequence number
    pub sequence: u32,
}

/// Source of raw depth frames
///
/// `next_frame` may block up to the source's own timeout; a source that
/// has no new frame within that window reports
/// [`AcquisitionError::Timeout`], a lost device reports
/// [`AcquisitionError::Disconnected`].
pub trait RawDepthSource: Send {
    /// Fixed stream dimensions for this session
    fn dimensions(&self) -> (u32, u32);

    /// Whether the source also delivers a registered color stream
    fn has_color(&self) -> bool {
        false
    }

    /// Block until the next raw frame is available
    fn next_frame(&mut self) -> Result<RawFrame, AcquisitionError>;
}

/// Units the synthetic scene encodes its samples in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneUnits {
    /// Metric millimeters (stereo-style sources)
    Millimeters,
    /// Raw 11-bit disparity (structured-light-style sources)
    Disparity,
}

/// Synthetic depth scene: a flat wall with one spherical marker.
///
/// The marker drifts horizontally a little each frame so temporal
/// behavior is visible in the demo. Used by the CLI demo rig and by the
/// integration tests; not a camera driver.
pub struct SyntheticScene {
    width: u32,
    height: u32,
    units: SceneUnits,
    /// Wall depth (millimeters)
    wall_mm: u16,
    /// Marker center depth (millimeters)
    marker_mm: u16,
    /// Marker radius (pixels)
    marker_radius: f32,
    with_color: bool,
    sequence: u32,
}

impl SyntheticScene {
    /// Scene with a wall at `wall_mm` and a marker at `marker_mm`
    pub fn new(
        width: u32,
        height: u32,
        units: SceneUnits,
        wall_mm: u16,
        marker_mm: u16,
        marker_radius: f32,
    ) -> Self {
        Self {
            width,
            height,
            units,
            wall_mm,
            marker_mm,
            marker_radius,
            with_color: false,
            sequence: 0,
        }
    }

    /// Enable the registered color stream
    pub fn with_color(mut self) -> Self {
        self.with_color = true;
        self
    }

    /// Encode a metric depth for the configured units
    fn encode_mm(&self, depth_mm: u16) -> u16 {
        match self.units {
            SceneUnits::Millimeters => depth_mm,
            SceneUnits::Disparity => mm_to_disparity(depth_mm),
        }
    }
}

impl RawDepthSource for SyntheticScene {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn has_color(&self) -> bool {
        self.with_color
    }

    fn next_frame(&mut self) -> Result<RawFrame, AcquisitionError> {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        // drift the marker center slowly along x
        let drift = (sequence % 16) as f32 - 8.0;
        let cx = self.width as f32 / 2.0 + drift;
        let cy = self.height as f32 / 2.0;
        let r2 = self.marker_radius * self.marker_radius;

        let wall = self.encode_mm(self.wall_mm);
        let marker = self.encode_mm(self.marker_mm);

        let mut samples = vec![wall; (self.width * self.height) as usize];
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= r2 {
                    samples[(y * self.width + x) as usize] = marker;
                }
            }
        }

        let color = self.with_color.then(|| {
            let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
            for &sample in &samples {
                let v = (sample >> 4) as u8;
                rgb.extend_from_slice(&[v, v, 64]);
            }
            ColorFrame {
                width: self.width,
                height: self.height,
                data: rgb.into(),
            }
        });

        let data: Arc<[u8]> = bytemuck::cast_slice::<u16, u8>(&samples).into();
        Ok(RawFrame {
            width: self.width,
            height: self.height,
            data,
            color,
            sequence,
        })
    }
}

/// Convert a metric depth to the raw 11-bit disparity a
/// structured-light sensor would report for it.
///
/// Inverse of the reciprocal model in the structured-light backend.
pub fn mm_to_disparity(depth_mm: u16) -> u16 {
    if depth_mm == 0 {
        return MAX_RAW_DISPARITY; // no return saturates the sensor
    }
    let depth_m = f32::from(depth_mm) / 1000.0;
    let raw = (1.0 / depth_m - DEPTH_COEFF_B) / DEPTH_COEFF_A;
    raw.round().clamp(0.0, f32::from(MAX_RAW_DISPARITY)) as u16
}

/// A source that fails every read; exercises the degrade policy in tests
/// and the `run --inject-failure` demo flag.
pub struct FailingSource {
    width: u32,
    height: u32,
    error: AcquisitionError,
}

impl FailingSource {
    pub fn new(width: u32, height: u32, error: AcquisitionError) -> Self {
        Self {
            width,
            height,
            error,
        }
    }
}

impl RawDepthSource for FailingSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<RawFrame, AcquisitionError> {
        Err(self.error.clone())
    }
}
