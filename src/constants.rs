// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Default calibration values for the two supported backend families and
//! the fixed display limits of the pipeline output.

/// Maximum number of sphere detections surfaced to the display layer.
///
/// The detector computes the full candidate list; only the strongest
/// candidates (largest pixel radius) are handed to the sink for overlay.
pub const MAX_DISPLAY_DETECTIONS: usize = 5;

/// Default temporal smoothing window length (frames).
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Default depth stream resolution for both backend families.
pub const BASE_WIDTH: u32 = 640;
/// Default depth stream resolution for both backend families.
pub const BASE_HEIGHT: u32 = 480;

/// Structured-light default intrinsics at 640x480.
///
/// These are the widely used factory calibration values for consumer
/// structured-light sensors; per-device calibration overrides them when
/// the backend can provide it.
pub mod structured_light {
    /// Focal length X (pixels) at 640x480 base resolution
    pub const FX: f32 = 594.21;
    /// Focal length Y (pixels) at 640x480 base resolution
    pub const FY: f32 = 591.04;
    /// Principal point X (pixels) at 640x480 base resolution
    pub const CX: f32 = 339.5;
    /// Principal point Y (pixels) at 640x480 base resolution
    pub const CY: f32 = 242.7;

    /// Disparity-to-depth coefficient A
    /// Used in formula: depth_m = 1.0 / (raw * DEPTH_COEFF_A + DEPTH_COEFF_B)
    pub const DEPTH_COEFF_A: f32 = -0.0030711;
    /// Disparity-to-depth coefficient B
    /// Used in formula: depth_m = 1.0 / (raw * DEPTH_COEFF_A + DEPTH_COEFF_B)
    pub const DEPTH_COEFF_B: f32 = 3.3309495;

    /// Largest valid raw disparity value (11-bit sensor range).
    pub const MAX_RAW_DISPARITY: u16 = 2047;
}

/// Stereo backend default intrinsics at 640x480.
pub mod stereo {
    /// Focal length X (pixels) at 640x480 base resolution
    pub const FX: f32 = 383.47;
    /// Focal length Y (pixels) at 640x480 base resolution
    pub const FY: f32 = 383.47;
    /// Principal point X (pixels) at 640x480 base resolution
    pub const CX: f32 = 318.39;
    /// Principal point Y (pixels) at 640x480 base resolution
    pub const CY: f32 = 240.87;

    /// Depth unit scale (meters per raw unit). Stereo sensors report
    /// depth in millimeters by default.
    pub const DEPTH_SCALE: f32 = 0.001;
}
