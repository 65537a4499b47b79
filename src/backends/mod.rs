// SPDX-License-Identifier: GPL-3.0-only

//! Depth camera backend abstraction
//!
//! One trait unifies both backend families so the pipeline stages stay
//! backend-agnostic:
//!
//! ```text
//! ┌──────────────────────┐
//! │   Pipeline driver    │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │   DepthCamera trait  │  ← normalized frames + intrinsics
//! └──────────┬───────────┘
//!            │
//!     ┌──────┴────────┐
//!     ▼               ▼
//! ┌────────┐  ┌────────────────┐
//! │ Stereo │  │StructuredLight │
//! └────────┘  └────────────────┘
//! ```
//!
//! Frame formats (bit depth, units) are normalized inside the concrete
//! backends; everything past this boundary works on [`DepthFrame`].

pub mod enumeration;
pub mod source;
pub mod stereo;
pub mod structured_light;
pub mod types;

pub use types::{BackendKind, CameraIntrinsics, ColorFrame, DepthFrame, DeviceInfo};

use crate::errors::PipelineResult;

/// The camera abstraction contract
///
/// One implementation per backend family. Acquisition may block up to
/// the backend's own timeout and reports an error when no new frame is
/// available or the device disconnected; the driver converts those
/// errors into its per-camera degrade policy.
pub trait DepthCamera: Send {
    /// Acquire the next normalized depth frame
    fn depth_frame(&mut self) -> PipelineResult<DepthFrame>;

    /// Color frame paired with the most recent depth frame, when the
    /// backend has a color stream
    fn color_frame(&mut self) -> Option<ColorFrame>;

    /// Whether this camera delivers a color stream
    fn has_color_stream(&self) -> bool;

    /// Calibration intrinsics, fixed after session start
    fn intrinsics(&self) -> CameraIntrinsics;

    /// Backend family of this camera
    fn kind(&self) -> BackendKind;

    /// Human-readable camera name
    fn name(&self) -> &str;

    /// Device information reported at initialization
    fn device_info(&self) -> &DeviceInfo;
}
