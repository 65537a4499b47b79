// SPDX-License-Identifier: GPL-3.0-only

//! Edge detection on depth frames
//!
//! Pure functions, no shared state. The depth frame is normalized to an
//! 8-bit intensity image, binarized with an adaptive local threshold
//! (mean or gaussian-weighted neighborhood), then passed through one of
//! the eight global binarization modes.

use crate::backends::DepthFrame;
use crate::config::{AdaptiveThresholdKind, SphereDetectionParameters, ThresholdKind};
use image::GrayImage;
use imageproc::contrast::otsu_level;
use imageproc::filter::{box_filter, gaussian_blur_f32};

/// Constant subtracted from the local mean before comparison
const ADAPTIVE_C: i16 = 2;

/// Fixed level for the threshold modes that do not compute their own
const DEFAULT_LEVEL: u8 = 127;

/// Derive a binary edge map from a depth frame
pub fn detect_edges(frame: &DepthFrame, params: &SphereDetectionParameters) -> GrayImage {
    let gray = frame.to_gray();
    let local = adaptive_threshold(&gray, params.adaptive_threshold, params.block_size);
    apply_threshold(&local, params.threshold)
}

/// Adaptive local-threshold binarization.
///
/// A pixel becomes 255 when it exceeds its neighborhood mean minus a
/// small constant, 0 otherwise. The neighborhood is `block_size` wide,
/// weighted uniformly (mean) or by a gaussian.
pub fn adaptive_threshold(
    gray: &GrayImage,
    kind: AdaptiveThresholdKind,
    block_size: u32,
) -> GrayImage {
    let radius = (block_size / 2).max(1);
    let local_mean = match kind {
        AdaptiveThresholdKind::Mean => box_filter(gray, radius, radius),
        AdaptiveThresholdKind::Gaussian => {
            // OpenCV's sigma-for-kernel-size rule
            let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            gaussian_blur_f32(gray, sigma.max(0.1))
        }
    };

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (dst, (src, mean)) in out
        .pixels_mut()
        .zip(gray.pixels().zip(local_mean.pixels()))
    {
        let value = i16::from(src.0[0]);
        let mean = i16::from(mean.0[0]);
        dst.0[0] = if value > mean - ADAPTIVE_C { 255 } else { 0 };
    }
    out
}

/// Apply one of the eight global binarization modes
pub fn apply_threshold(gray: &GrayImage, kind: ThresholdKind) -> GrayImage {
    let level = match kind {
        ThresholdKind::Otsu => otsu_level(gray),
        ThresholdKind::Triangle => triangle_level(gray),
        _ => DEFAULT_LEVEL,
    };

    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        let v = pixel.0[0];
        pixel.0[0] = match kind {
            ThresholdKind::Binary | ThresholdKind::Otsu | ThresholdKind::Triangle => {
                if v > level { 255 } else { 0 }
            }
            ThresholdKind::BinaryInverted => {
                if v > level {
                    0
                } else {
                    255
                }
            }
            ThresholdKind::Truncate => v.min(level),
            ThresholdKind::ToZero => {
                if v > level {
                    v
                } else {
                    0
                }
            }
            ThresholdKind::ToZeroInverted => {
                if v > level {
                    0
                } else {
                    v
                }
            }
            ThresholdKind::Mask => v,
        };
    }
    out
}

/// Triangle threshold level.
///
/// Draws a line from the histogram peak to the far end of the occupied
/// range and picks the bin with the largest perpendicular distance to
/// that line.
fn triangle_level(gray: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let Some(first) = histogram.iter().position(|&c| c > 0) else {
        return DEFAULT_LEVEL;
    };
    let last = histogram.iter().rposition(|&c| c > 0).unwrap_or(first);
    let (peak, peak_count) = histogram
        .iter()
        .enumerate()
        .max_by_key(|&(_, &c)| c)
        .map(|(i, &c)| (i, c))
        .unwrap_or((first, 0));

    // far end is whichever occupied extreme lies further from the peak
    let far = if peak - first > last - peak { first } else { last };
    if far == peak || peak_count == 0 {
        return peak as u8;
    }

    let dx = far as f32 - peak as f32;
    let dy = -(peak_count as f32);
    let norm = (dx * dx + dy * dy).sqrt();

    let (lo, hi) = if far < peak { (far, peak) } else { (peak, far) };
    let mut best = peak;
    let mut best_dist = 0.0f32;
    for bin in lo..=hi {
        let px = bin as f32 - peak as f32;
        let py = histogram[bin] as f32 - peak_count as f32;
        let dist = (px * dy - py * dx).abs() / norm;
        if dist > best_dist {
            best_dist = dist;
            best = bin;
        }
    }
    best as u8
}
