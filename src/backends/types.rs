// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for depth camera backends
//!
//! Frames from both backend families are normalized into [`DepthFrame`]
//! at this boundary: dense u16 samples in a backend-defined unit plus a
//! uniform scale factor to meters. Downstream pipeline stages never see
//! backend-specific bit depths or units.

use crate::errors::MalformedFrameError;
use image::GrayImage;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Camera backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BackendKind {
    /// Stereo-based depth sensing (disparity matching on the device)
    #[default]
    Stereo,
    /// Structured-light depth sensing (projected pattern)
    StructuredLight,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Stereo => write!(f, "Stereo"),
            BackendKind::StructuredLight => write!(f, "Structured Light"),
        }
    }
}

/// Device information reported at initialization
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Product/model name
    pub model: String,
    /// Serial number
    pub serial: String,
    /// Physical port or bus location, when known
    pub port: Option<String>,
}

/// Camera calibration intrinsics
///
/// Fixed after session start; maps pixel + depth into 3-D camera-space
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length X (pixels)
    pub fx: f32,
    /// Focal length Y (pixels)
    pub fy: f32,
    /// Principal point X (pixels)
    pub cx: f32,
    /// Principal point Y (pixels)
    pub cy: f32,
}

impl CameraIntrinsics {
    /// Back-project a pixel coordinate and metric depth into a 3-D
    /// camera-space point (meters, +z into the scene).
    pub fn back_project(&self, x: f32, y: f32, depth_m: f32) -> Point3<f32> {
        Point3::new(
            (x - self.cx) * depth_m / self.fx,
            (y - self.cy) * depth_m / self.fy,
            depth_m,
        )
    }
}

/// A normalized dense depth frame
///
/// Samples are u16 in a backend-defined unit; `depth_scale` converts a
/// sample to meters. A sample of 0 marks invalid depth (no return).
/// Dimensions are fixed per camera session.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    width: u32,
    height: u32,
    data: Arc<[u16]>,
    depth_scale: f32,
}

impl DepthFrame {
    /// Build a frame, validating that the sample count matches the
    /// dimensions and is non-empty.
    pub fn new(
        width: u32,
        height: u32,
        data: Arc<[u16]>,
        depth_scale: f32,
    ) -> Result<Self, MalformedFrameError> {
        if width == 0 || height == 0 || data.is_empty() {
            return Err(MalformedFrameError::Empty);
        }
        if data.len() != (width as usize) * (height as usize) {
            return Err(MalformedFrameError::DimensionMismatch {
                width,
                height,
                samples: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            depth_scale,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Meters per raw depth unit
    pub fn depth_scale(&self) -> f32 {
        self.depth_scale
    }

    /// Raw samples, row-major
    pub fn samples(&self) -> &[u16] {
        &self.data
    }

    /// Raw depth at a pixel, 0 when invalid or out of bounds
    pub fn depth_at(&self, x: u32, y: u32) -> u16 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[(y * self.width + x) as usize]
    }

    /// Metric depth at a pixel (meters), 0.0 when invalid
    pub fn depth_m_at(&self, x: u32, y: u32) -> f32 {
        f32::from(self.depth_at(x, y)) * self.depth_scale
    }

    /// Min-max normalize the frame into an 8-bit intensity image.
    ///
    /// Invalid (zero) samples map to 0; the valid range is stretched
    /// over 1..=255 so detection stages see full contrast regardless of
    /// the scene's absolute depth range.
    pub fn to_gray(&self) -> GrayImage {
        let mut lo = u16::MAX;
        let mut hi = u16::MIN;
        for &sample in self.data.iter() {
            if sample == 0 {
                continue;
            }
            lo = lo.min(sample);
            hi = hi.max(sample);
        }

        let mut image = GrayImage::new(self.width, self.height);
        if lo > hi {
            // no valid samples at all
            return image;
        }
        let range = f32::from(hi.saturating_sub(lo)).max(1.0);
        for (pixel, &sample) in image.pixels_mut().zip(self.data.iter()) {
            if sample != 0 {
                let t = f32::from(sample - lo) / range;
                pixel.0[0] = (1.0 + t * 254.0).round() as u8;
            }
        }
        image
    }

    /// Copy the samples into an f32 plane for temporal averaging
    pub fn to_plane_f32(&self) -> Vec<f32> {
        self.data.iter().map(|&sample| f32::from(sample)).collect()
    }

    /// Rebuild a frame from an averaged f32 plane
    pub fn from_plane_f32(
        width: u32,
        height: u32,
        plane: &[f32],
        depth_scale: f32,
    ) -> Result<Self, MalformedFrameError> {
        let data: Arc<[u16]> = plane
            .iter()
            .map(|&v| v.round().clamp(0.0, f32::from(u16::MAX)) as u16)
            .collect();
        Self::new(width, height, data, depth_scale)
    }
}

/// An optional color frame accompanying the depth stream (RGB24)
#[derive(Debug, Clone)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB bytes, row-major, 3 bytes per pixel
    pub data: Arc<[u8]>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn frame_rejects_mismatched_sample_count() {
        let data: Arc<[u16]> = vec![1u16; 10].into();
        let err = DepthFrame::new(4, 4, data, 0.001).unwrap_err();
        assert_eq!(
            err,
            MalformedFrameError::DimensionMismatch {
                width: 4,
                height: 4,
                samples: 10
            }
        );
    }

    #[test]
    fn frame_rejects_empty() {
        let data: Arc<[u16]> = Vec::new().into();
        assert_eq!(
            DepthFrame::new(0, 0, data, 0.001).unwrap_err(),
            MalformedFrameError::Empty
        );
    }

    #[test]
    fn metric_depth_uses_scale() {
        let data: Arc<[u16]> = vec![1500u16; 4].into();
        let frame = DepthFrame::new(2, 2, data, 0.001).unwrap();
        assert_relative_eq!(frame.depth_m_at(1, 1), 1.5);
    }

    #[test]
    fn back_projection_at_principal_point_is_on_axis() {
        let intrinsics = CameraIntrinsics {
            fx: 100.0,
            fy: 100.0,
            cx: 80.0,
            cy: 60.0,
        };
        let p = intrinsics.back_project(80.0, 60.0, 2.0);
        assert_relative_eq!(p.x, 0.0);
        assert_relative_eq!(p.y, 0.0);
        assert_relative_eq!(p.z, 2.0);
    }

    #[test]
    fn gray_normalization_stretches_valid_range() {
        // 0 is invalid, 100 is nearest, 300 is farthest
        let data: Arc<[u16]> = vec![0u16, 100, 200, 300].into();
        let frame = DepthFrame::new(2, 2, data, 0.001).unwrap();
        let gray = frame.to_gray();
        assert_eq!(gray.get_pixel(0, 0).0[0], 0); // invalid stays 0
        assert_eq!(gray.get_pixel(1, 0).0[0], 1); // nearest -> bottom of range
        assert_eq!(gray.get_pixel(1, 1).0[0], 255); // farthest -> top
    }
}
