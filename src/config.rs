// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline configuration
//!
//! All parameters the external control layer may adjust at runtime.
//! Every mutation goes through [`Config::validate`] (or a validated
//! setter); invalid values are rejected with a [`ConfigError`] instead of
//! being silently clamped, so a bad slider value never reaches the
//! pipeline.

use crate::constants::DEFAULT_SMOOTHING_WINDOW;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Adaptive threshold neighborhood weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdaptiveThresholdKind {
    /// Plain mean of the block neighborhood
    #[default]
    Mean,
    /// Gaussian-weighted mean of the block neighborhood
    Gaussian,
}

impl AdaptiveThresholdKind {
    /// All variants, for control surfaces that iterate options
    pub const ALL: [AdaptiveThresholdKind; 2] =
        [AdaptiveThresholdKind::Mean, AdaptiveThresholdKind::Gaussian];

    /// Display name for the variant
    pub fn display_name(&self) -> &'static str {
        match self {
            AdaptiveThresholdKind::Mean => "Mean",
            AdaptiveThresholdKind::Gaussian => "Gaussian",
        }
    }
}

/// Global binarization mode applied after the adaptive pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdKind {
    /// Above threshold becomes max, else zero
    #[default]
    Binary,
    /// Above threshold becomes zero, else max
    BinaryInverted,
    /// Above threshold is clamped to the threshold value
    Truncate,
    /// Below threshold becomes zero, above is kept
    ToZero,
    /// Above threshold becomes zero, below is kept
    ToZeroInverted,
    /// Pass-through mask mode (no binarization applied)
    Mask,
    /// Binary with the level chosen by Otsu's method
    Otsu,
    /// Binary with the level chosen by the triangle method
    Triangle,
}

impl ThresholdKind {
    /// All variants, for control surfaces that iterate options
    pub const ALL: [ThresholdKind; 8] = [
        ThresholdKind::Binary,
        ThresholdKind::BinaryInverted,
        ThresholdKind::Truncate,
        ThresholdKind::ToZero,
        ThresholdKind::ToZeroInverted,
        ThresholdKind::Mask,
        ThresholdKind::Otsu,
        ThresholdKind::Triangle,
    ];

    /// Display name for the variant
    pub fn display_name(&self) -> &'static str {
        match self {
            ThresholdKind::Binary => "Binary",
            ThresholdKind::BinaryInverted => "Binary Inverted",
            ThresholdKind::Truncate => "Truncate",
            ThresholdKind::ToZero => "To Zero",
            ThresholdKind::ToZeroInverted => "To Zero Inverted",
            ThresholdKind::Mask => "Mask",
            ThresholdKind::Otsu => "Otsu",
            ThresholdKind::Triangle => "Triangle",
        }
    }
}

/// Up-axis selector for the surface-normal upness filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

/// Sphere detection configuration
///
/// Mutated only by the external control layer; the pipeline reads it
/// once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereDetectionParameters {
    /// Expected physical sphere radius (meters)
    pub sphere_radius: f32,
    /// Minimum candidate radius (pixels)
    pub min_radius: u32,
    /// Maximum candidate radius (pixels)
    pub max_radius: u32,
    /// Edge strength threshold for the circular search
    pub param1: f32,
    /// Accumulator confidence threshold for the circular search
    pub param2: f32,
    /// Adaptive threshold neighborhood weighting
    pub adaptive_threshold: AdaptiveThresholdKind,
    /// Global binarization mode
    pub threshold: ThresholdKind,
    /// Adaptive threshold block size (odd, >= 3)
    pub block_size: u32,
    /// Accepted relative error between estimated and expected
    /// physical radius, in (0, 1]
    pub radius_tolerance: f32,
}

impl Default for SphereDetectionParameters {
    fn default() -> Self {
        Self {
            sphere_radius: 0.05,
            min_radius: 4,
            max_radius: 32,
            param1: 10.0,
            param2: 10.0,
            adaptive_threshold: AdaptiveThresholdKind::default(),
            threshold: ThresholdKind::default(),
            block_size: 11,
            radius_tolerance: 0.25,
        }
    }
}

impl SphereDetectionParameters {
    /// Validate all fields, returning the first violation found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sphere_radius <= 0.0 {
            return Err(ConfigError::NonPositive("sphere_radius"));
        }
        if self.min_radius > self.max_radius {
            return Err(ConfigError::InvalidRadiusRange {
                min: self.min_radius,
                max: self.max_radius,
            });
        }
        if self.max_radius == 0 {
            return Err(ConfigError::NonPositive("max_radius"));
        }
        if self.param1 <= 0.0 {
            return Err(ConfigError::NonPositive("param1"));
        }
        if self.param2 <= 0.0 {
            return Err(ConfigError::NonPositive("param2"));
        }
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(ConfigError::InvalidBlockSize(self.block_size));
        }
        if self.radius_tolerance <= 0.0 || self.radius_tolerance > 1.0 {
            return Err(ConfigError::InvalidTolerance(self.radius_tolerance));
        }
        Ok(())
    }
}

/// Surface-normal estimation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalEstimationParameters {
    /// Reference axis the upness filter compares against
    pub up_axis: UpAxis,
    /// Maximum angle (radians) between a normal and the up axis
    /// before the normal is suppressed
    pub upness_filter: f32,
    /// Sampling density: 0 estimates every pixel, otherwise roughly
    /// `num_samples` estimates over the whole frame
    pub num_samples: u32,
    /// Depth difference (millimeters) above which a neighbor is
    /// treated as a discontinuity and excluded from tangents
    pub edge_cutoff: f32,
}

impl Default for NormalEstimationParameters {
    fn default() -> Self {
        Self {
            up_axis: UpAxis::default(),
            upness_filter: std::f32::consts::PI,
            num_samples: 0,
            edge_cutoff: 10.0,
        }
    }
}

impl NormalEstimationParameters {
    /// Validate all fields, returning the first violation found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upness_filter < 0.0 {
            return Err(ConfigError::NonPositive("upness_filter"));
        }
        if self.edge_cutoff <= 0.0 {
            return Err(ConfigError::NonPositive("edge_cutoff"));
        }
        Ok(())
    }
}

/// Temporal smoothing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    /// Whether the running average replaces raw frames
    pub enabled: bool,
    /// Window length K in frames
    pub window: usize,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            window: DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

impl SmoothingSettings {
    /// Validate all fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::InvalidWindow(self.window));
        }
        Ok(())
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sphere detector parameters
    pub spheres: SphereDetectionParameters,
    /// Surface-normal estimator parameters
    pub normals: NormalEstimationParameters,
    /// Temporal smoothing settings
    pub smoothing: SmoothingSettings,
    /// Derive an edge map from the depth stream each tick
    pub display_edges: bool,
    /// Estimate surface normals each tick
    pub calculate_normals: bool,
}

impl Config {
    /// Validate every section, returning the first violation found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spheres.validate()?;
        self.normals.validate()?;
        self.smoothing.validate()?;
        Ok(())
    }

    /// Default path of the persisted config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("depthmark").join("config.json"))
    }

    /// Load configuration from a JSON file, validating it before use
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Persist configuration to a JSON file
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        info!(path = %path.display(), "Saved pipeline configuration");
        Ok(())
    }

    /// Change the smoothing window length.
    ///
    /// Returns true when the length actually changed, in which case the
    /// caller must reset any temporal buffers built on the old window.
    pub fn set_smoothing_window(&mut self, window: usize) -> Result<bool, ConfigError> {
        if window == 0 {
            return Err(ConfigError::InvalidWindow(window));
        }
        let changed = self.smoothing.window != window;
        self.smoothing.window = window;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn inverted_radius_range_is_rejected() {
        let mut config = Config::default();
        config.spheres.min_radius = 40;
        config.spheres.max_radius = 10;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRadiusRange { min: 40, max: 10 })
        );
    }

    #[test]
    fn even_block_size_is_rejected() {
        let mut params = SphereDetectionParameters::default();
        params.block_size = 8;
        assert_eq!(params.validate(), Err(ConfigError::InvalidBlockSize(8)));
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = Config::default();
        assert!(config.set_smoothing_window(0).is_err());
        // a rejected set leaves the old value untouched
        assert_eq!(config.smoothing.window, DEFAULT_SMOOTHING_WINDOW);
    }

    #[test]
    fn window_change_is_reported() {
        let mut config = Config::default();
        assert!(!config.set_smoothing_window(DEFAULT_SMOOTHING_WINDOW).unwrap());
        assert!(config.set_smoothing_window(9).unwrap());
    }
}
