// SPDX-License-Identifier: GPL-3.0-only

//! Stereo depth camera backend
//!
//! Stereo sensors compute disparity on the device and deliver metric
//! depth directly, as little-endian u16 millimeters with a per-device
//! scale factor. Normalization here is a validated reinterpretation of
//! the raw byte plane.

use super::source::RawDepthSource;
use super::types::{BackendKind, CameraIntrinsics, ColorFrame, DepthFrame, DeviceInfo};
use super::DepthCamera;
use crate::constants::stereo;
use crate::errors::{MalformedFrameError, PipelineResult};
use tracing::info;

/// A stereo-based depth camera
pub struct StereoCamera {
    name: String,
    source: Box<dyn RawDepthSource>,
    intrinsics: CameraIntrinsics,
    depth_scale: f32,
    device_info: DeviceInfo,
    last_color: Option<ColorFrame>,
}

impl StereoCamera {
    /// Open a stereo camera over the given raw source
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn RawDepthSource>,
        intrinsics: CameraIntrinsics,
        depth_scale: f32,
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
            depth_scale,
            "Initialised stereo camera"
        );
        Self {
            name,
            source,
            intrinsics,
            depth_scale,
            device_info,
            last_color: None,
        }
    }

    /// Stereo camera with the default 640x480 calibration
    pub fn with_default_calibration(
        name: impl Into<String>,
        source: Box<dyn RawDepthSource>,
        device_info: DeviceInfo,
    ) -> Self {
        let intrinsics = CameraIntrinsics {
            fx: stereo::FX,
            fy: stereo::FY,
            cx: stereo::CX,
            cy: stereo::CY,
        };
        Self::new(name, source, intrinsics, stereo::DEPTH_SCALE, device_info)
    }
}

impl DepthCamera for StereoCamera {
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
        let samples: Vec<u16> = bytemuck::pod_collect_to_vec(&raw.data);
        Ok(DepthFrame::new(
            raw.width,
            raw.height,
            samples.into(),
            self.depth_scale,
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
        BackendKind::Stereo
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }
}
