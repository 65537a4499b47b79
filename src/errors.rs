// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the depth pipeline
//!
//! Every failure the pipeline can see is an explicit kind, so the
//! per-camera degrade policy in the driver can match on it instead of
//! catching opaque errors. Acquisition and frame errors are handled at
//! the per-camera tick boundary; configuration errors are rejected
//! synchronously at the configuration boundary and never reach the
//! pipeline.

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Top-level pipeline error type
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Backend read failure or disconnect
    Acquisition(AcquisitionError),
    /// Frame with unexpected dimensions or empty data
    MalformedFrame(MalformedFrameError),
    /// Invalid parameter rejected at the configuration boundary
    Config(ConfigError),
}

/// Frame acquisition errors reported by camera backends
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// No new frame arrived within the backend's blocking timeout
    Timeout,
    /// Device disconnected during operation
    Disconnected,
    /// Backend-specific failure
    Backend(String),
}

/// Malformed frame errors detected at the normalization boundary
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedFrameError {
    /// Frame contained no samples
    Empty,
    /// Sample count does not match the session dimensions
    DimensionMismatch {
        width: u32,
        height: u32,
        samples: usize,
    },
}

/// Configuration errors rejected when a parameter is set
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Pixel radius search range is inverted or degenerate
    InvalidRadiusRange { min: u32, max: u32 },
    /// A parameter that must be strictly positive was zero or negative
    NonPositive(&'static str),
    /// Adaptive threshold block size must be odd and at least 3
    InvalidBlockSize(u32),
    /// Smoothing window length must be at least one frame
    InvalidWindow(usize),
    /// Physical radius tolerance must lie in (0, 1]
    InvalidTolerance(f32),
    /// Failed to read or write the config file
    Io(String),
    /// Failed to parse the config file
    Parse(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Acquisition(e) => write!(f, "Acquisition error: {}", e),
            PipelineError::MalformedFrame(e) => write!(f, "Malformed frame: {}", e),
            PipelineError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::Timeout => write!(f, "No frame available within timeout"),
            AcquisitionError::Disconnected => write!(f, "Device disconnected"),
            AcquisitionError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl fmt::Display for MalformedFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedFrameError::Empty => write!(f, "Frame contains no samples"),
            MalformedFrameError::DimensionMismatch {
                width,
                height,
                samples,
            } => write!(
                f,
                "Expected {}x{} samples, got {}",
                width, height, samples
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRadiusRange { min, max } => {
                write!(f, "Invalid pixel radius range: min {} > max {}", min, max)
            }
            ConfigError::NonPositive(name) => {
                write!(f, "Parameter '{}' must be positive", name)
            }
            ConfigError::InvalidBlockSize(size) => {
                write!(f, "Block size must be odd and >= 3, got {}", size)
            }
            ConfigError::InvalidWindow(len) => {
                write!(f, "Smoothing window must hold at least 1 frame, got {}", len)
            }
            ConfigError::InvalidTolerance(t) => {
                write!(f, "Radius tolerance must lie in (0, 1], got {}", t)
            }
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for AcquisitionError {}
impl std::error::Error for MalformedFrameError {}
impl std::error::Error for ConfigError {}

impl From<AcquisitionError> for PipelineError {
    fn from(err: AcquisitionError) -> Self {
        PipelineError::Acquisition(err)
    }
}

impl From<MalformedFrameError> for PipelineError {
    fn from(err: MalformedFrameError) -> Self {
        PipelineError::MalformedFrame(err)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
