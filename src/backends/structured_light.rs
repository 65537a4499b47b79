// SPDX-License-Identifier: GPL-3.0-only

//! Structured-light depth camera backend
//!
//! Structured-light sensors report raw 11-bit disparity values, not
//! metric depth. Normalization converts each sample to millimeters with
//! the reciprocal model
//!
//! ```text
//! depth_m = 1.0 / (raw * DEPTH_COEFF_A + DEPTH_COEFF_B)
//! ```
//!
//! Saturated or out-of-range samples become 0 (invalid), so downstream
//! stages see the same invalid marker as for the stereo family.

use super::source::RawDepthSource;
use super::types::{BackendKind, CameraIntrinsics, ColorFrame, DepthFrame, DeviceInfo};
use super::DepthCamera;
use crate::constants::structured_light::{
    CX, CY, DEPTH_COEFF_A, DEPTH_COEFF_B, FX, FY, MAX_RAW_DISPARITY,
};
use crate::errors::{MalformedFrameError, PipelineResult};
use tracing::info;

/// A structured-light depth camera
pub struct StructuredLightCamera {
    name: String,
    source: Box<dyn RawDepthSource>,
    intrinsics: CameraIntrinsics,
    device_info: DeviceInfo,
    last_color: Option<ColorFrame>,
}

impl StructuredLightCamera {
    /// Open a structured-light camera over the given raw source
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn RawDepthSource>,
        intrinsics: CameraIntrinsics,
        device_info: DeviceInfo,
    ) -> Self {
        let name = name.into();
        let (width, height) = source.dimensions();
        info!(
            name = %name,
            model = %device_info.model,
            serial = %device_info.serial,
            width,
            height,
            "Initialised structured-light camera"
        );
        Self {
            name,
            source,
            intrinsics,
            device_info,
            last_color: None,
        }
    }

    /// Structured-light camera with the default 640x480 calibration
    pub fn with_default_calibration(
        name: impl Into<String>,
        source: Box<dyn RawDepthSource>,
        device_info: DeviceInfo,
    ) -> Self {
        let intrinsics = CameraIntrinsics {
            fx: FX,
            fy: FY,
            cx: CX,
            cy: CY,
        };
        Self::new(name, source, intrinsics, device_info)
    }
}

/// Convert one raw 11-bit disparity sample to millimeters.
///
/// Returns 0 for saturated or physically impossible values.
pub fn disparity_to_mm(raw: u16) -> u16 {
    if raw == 0 || raw >= MAX_RAW_DISPARITY {
        return 0;
    }
    let denom = f32::from(raw) * DEPTH_COEFF_A + DEPTH_COEFF_B;
    if denom <= 0.0 {
        return 0;
    }
    let depth_m = 1.0 / denom;
    if !(0.0..=65.0).contains(&depth_m) {
        return 0;
    }
    (depth_m * 1000.0).round() as u16
}

impl DepthCamera for StructuredLightCamera {
    fn depth_frame(&mut self) -> PipelineResult<DepthFrame> {
        let raw = self.source.next_frame()?;
        self.last_color = raw.color;

        if raw.data.len() % 2 != 0 {
            return Err(MalformedFrameError::DimensionMismatch {
                width: raw.width,
                height: raw.height,
                samples: raw.data.len() / 2,
            }
            .into());
        }
        let disparity: Vec<u16> = bytemuck::pod_collect_to_vec(&raw.data);
        let samples: Vec<u16> = disparity.into_iter().map(disparity_to_mm).collect();
        Ok(DepthFrame::new(
            raw.width,
            raw.height,
            samples.into(),
            0.001,
        )?)
    }

    fn color_frame(&mut self) -> Option<ColorFrame> {
        self.last_color.take()
    }

    fn has_color_stream(&self) -> bool {
        self.source.has_color()
    }

    fn intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics
    }

    fn kind(&self) -> BackendKind {
        BackendKind::StructuredLight
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }
}
