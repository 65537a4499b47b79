// SPDX-License-Identifier: GPL-3.0-only

//! Depth-aware sphere detection
//!
//! A circular-Hough-style search finds circle candidates in pixel space,
//! then each candidate is validated against the physics of the scene:
//! the depth sampled at its center and the camera intrinsics give the
//! candidate's real-world radius, and only candidates whose radius
//! matches the configured marker size survive. A pixel-space transform
//! alone cannot tell a sphere marker from an arbitrary circular edge;
//! the depth validation is what makes the detector selective.
//!
//! Detection is best-effort: an empty or malformed frame yields an
//! empty list, never an error.

use crate::backends::{CameraIntrinsics, DepthFrame};
use crate::config::SphereDetectionParameters;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_scharr, vertical_scharr};
use nalgebra::Point3;
use tracing::trace;

/// Minimum number of edge pixels that must support a candidate's ring
const MIN_RING_SUPPORT: usize = 6;

/// Fraction of the modal-radius circumference the ring support must
/// cover; distance coincidences alone cannot reach it
const MIN_RING_COVERAGE: f32 = 0.25;

/// Minimum |cosine| between an edge gradient and the radial direction
/// for the edge point to count toward a candidate's ring
const RADIAL_ALIGNMENT: f32 = 0.8;

/// Upper bound on accumulator peaks examined per frame
const MAX_PEAKS: usize = 32;

/// Gaussian sigma for accumulator smoothing before peak extraction
const ACCUM_SIGMA: f32 = 1.5;

type AccumImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// One sphere candidate, recomputed every tick
#[derive(Debug, Clone)]
pub struct Detection {
    /// Pixel center of the circle
    pub center: (u32, u32),
    /// Circle radius in pixels
    pub radius_px: f32,
    /// Depth sampled at the center (meters)
    pub depth_m: f32,
    /// Back-projected 3-D position (camera space, meters)
    pub position: Point3<f32>,
    /// Absolute error between the estimated and expected physical
    /// radius (meters)
    pub radius_error_m: f32,
}

/// An edge pixel with its unit gradient direction
struct EdgePoint {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
}

/// Detect sphere markers in a depth frame.
///
/// When an edge frame is supplied (the smoothed edge stream), the
/// circular search runs on it; otherwise the normalized depth frame is
/// searched directly. The returned list is ordered by descending pixel
/// radius with ties broken by smaller physical-radius error; it is not
/// capped here, the display cap is applied at the sink boundary.
pub fn detect(
    frame: &DepthFrame,
    edge_frame: Option<&GrayImage>,
    params: &SphereDetectionParameters,
    intrinsics: &CameraIntrinsics,
) -> Vec<Detection> {
    let width = frame.width();
    let height = frame.height();
    if width < 8 || height < 8 || params.max_radius == 0 || params.min_radius > params.max_radius {
        return Vec::new();
    }

    let gray;
    let search: &GrayImage = match edge_frame {
        Some(edges) if edges.dimensions() == (width, height) => edges,
        _ => {
            gray = frame.to_gray();
            &gray
        }
    };

    let edges = edge_points(search, params.param1);
    if edges.len() < MIN_RING_SUPPORT {
        return Vec::new();
    }

    let accum = vote_centers(&edges, width, height, params);
    let peaks = find_peaks(&accum, params);
    trace!(
        edge_pixels = edges.len(),
        peaks = peaks.len(),
        "Circular search complete"
    );

    let mut detections: Vec<Detection> = Vec::new();
    for (px, py) in peaks {
        let Some(radius_px) = estimate_radius(&edges, px as f32, py as f32, params) else {
            continue;
        };

        // candidates too close to an accepted one are duplicates of the
        // same circle; the peak list is strongest-first
        if detections.iter().any(|d| {
            let dx = d.center.0 as f32 - px as f32;
            let dy = d.center.1 as f32 - py as f32;
            (dx * dx + dy * dy).sqrt() < params.min_radius.max(2) as f32
        }) {
            continue;
        }

        let depth_m = frame.depth_m_at(px, py);
        if depth_m <= 0.0 {
            continue; // invalid center depth, reject
        }

        let physical_radius = radius_px * depth_m / intrinsics.fx;
        let radius_error_m = (physical_radius - params.sphere_radius).abs();
        if radius_error_m > params.radius_tolerance * params.sphere_radius {
            continue; // circular edge of the wrong physical size
        }

        detections.push(Detection {
            center: (px, py),
            radius_px,
            depth_m,
            position: intrinsics.back_project(px as f32, py as f32, depth_m),
            radius_error_m,
        });
    }

    detections.sort_by(|a, b| {
        b.radius_px
            .partial_cmp(&a.radius_px)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.radius_error_m
                    .partial_cmp(&b.radius_error_m)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    detections
}

/// Collect pixels whose Scharr gradient magnitude exceeds `param1`
fn edge_points(gray: &GrayImage, param1: f32) -> Vec<EdgePoint> {
    let gx = horizontal_scharr(gray);
    let gy = vertical_scharr(gray);
    let threshold = param1.max(1.0);

    let mut points = Vec::new();
    for (x, y, pixel) in gx.enumerate_pixels() {
        let dx = f32::from(pixel.0[0]);
        let dy = f32::from(gy.get_pixel(x, y).0[0]);
        // Scharr kernels sum to 16x the underlying derivative
        let mag = (dx * dx + dy * dy).sqrt() / 16.0;
        if mag >= threshold {
            let norm = (dx * dx + dy * dy).sqrt();
            points.push(EdgePoint {
                x: x as f32,
                y: y as f32,
                dx: dx / norm,
                dy: dy / norm,
            });
        }
    }
    points
}

/// Cast center votes along each edge pixel's gradient line.
///
/// Votes go both ways because the marker may be nearer or farther than
/// its background; the boundary gradient flips accordingly.
fn vote_centers(
    edges: &[EdgePoint],
    width: u32,
    height: u32,
    params: &SphereDetectionParameters,
) -> AccumImage {
    let mut accum = AccumImage::new(width, height);
    for point in edges {
        for r in params.min_radius..=params.max_radius {
            let r = r as f32;
            for sign in [1.0f32, -1.0] {
                let cx = point.x + sign * r * point.dx;
                let cy = point.y + sign * r * point.dy;
                bilinear_add(&mut accum, cx, cy, 1.0);
            }
        }
    }
    accum
}

/// Deposit a weighted vote with bilinear interpolation
fn bilinear_add(accum: &mut AccumImage, x: f32, y: f32, weight: f32) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (width, height) = accum.dimensions();
    let x0 = x as u32;
    let y0 = y as u32;
    if x0 + 1 >= width || y0 + 1 >= height {
        return;
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    accum.get_pixel_mut(x0, y0).0[0] += weight * (1.0 - fx) * (1.0 - fy);
    accum.get_pixel_mut(x0 + 1, y0).0[0] += weight * fx * (1.0 - fy);
    accum.get_pixel_mut(x0, y0 + 1).0[0] += weight * (1.0 - fx) * fy;
    accum.get_pixel_mut(x0 + 1, y0 + 1).0[0] += weight * fx * fy;
}

/// Extract accumulator peaks above the `param2` confidence threshold.
///
/// Peaks are located on a smoothed copy of the accumulator, scored by
/// the raw vote mass in a 5x5 window, and suppressed within a small
/// radius of a stronger peak. Returned strongest-first.
fn find_peaks(accum: &AccumImage, params: &SphereDetectionParameters) -> Vec<(u32, u32)> {
    let (width, height) = accum.dimensions();
    let smoothed = gaussian_blur_f32(accum, ACCUM_SIGMA);

    let mut maxima: Vec<(u32, u32, f32)> = Vec::new();
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let v = smoothed.get_pixel(x, y).0[0];
            if v <= 0.0 {
                continue;
            }
            let mut is_max = true;
            'window: for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    if (nx, ny) != (x, y) && smoothed.get_pixel(nx, ny).0[0] > v {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if !is_max {
                continue;
            }

            let score = window_sum(accum, x, y, 2);
            if score >= params.param2 {
                maxima.push((x, y, score));
            }
        }
    }

    maxima.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    // non-maximum suppression over the peak list
    let nms_radius = (params.min_radius.max(4)) as f32;
    let mut peaks: Vec<(u32, u32)> = Vec::new();
    for (x, y, _) in maxima {
        let suppressed = peaks.iter().any(|&(kx, ky)| {
            let dx = kx as f32 - x as f32;
            let dy = ky as f32 - y as f32;
            (dx * dx + dy * dy).sqrt() < nms_radius
        });
        if !suppressed {
            peaks.push((x, y));
            if peaks.len() >= MAX_PEAKS {
                break;
            }
        }
    }
    peaks
}

/// Sum of raw accumulator votes in a (2r+1)^2 window
fn window_sum(accum: &AccumImage, x: u32, y: u32, radius: u32) -> f32 {
    let (width, height) = accum.dimensions();
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = (x + radius).min(width - 1);
    let y1 = (y + radius).min(height - 1);
    let mut sum = 0.0;
    for ny in y0..=y1 {
        for nx in x0..=x1 {
            sum += accum.get_pixel(nx, ny).0[0];
        }
    }
    sum
}

/// Estimate the circle radius at a candidate center.
///
/// Only edge points whose gradient is radially aligned with the center
/// belong to its ring; a point at the right distance with a tangential
/// gradient is an unrelated edge. Builds a histogram of the aligned
/// distances within the configured radius range, takes the modal bin,
/// and refines it with the mean of distances within one pixel of the
/// mode. Returns None when the ring support falls short of a fraction
/// of the modal circumference, which rejects the phantom centers the
/// outward accumulator votes create around real circles.
fn estimate_radius(
    edges: &[EdgePoint],
    cx: f32,
    cy: f32,
    params: &SphereDetectionParameters,
) -> Option<f32> {
    let mut aligned: Vec<f32> = Vec::new();
    for point in edges {
        let dx = point.x - cx;
        let dy = point.y - cy;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist <= f32::EPSILON {
            continue;
        }
        // gradient may point inward or outward depending on contrast
        let cosine = (dx * point.dx + dy * point.dy) / dist;
        if cosine.abs() >= RADIAL_ALIGNMENT {
            aligned.push(dist);
        }
    }

    let bins = (params.max_radius - params.min_radius + 1) as usize;
    let mut histogram = vec![0usize; bins];
    for &dist in &aligned {
        let bin = (dist - params.min_radius as f32).round();
        if bin >= 0.0 && (bin as usize) < bins {
            histogram[bin as usize] += 1;
        }
    }

    let (mode, support) = histogram
        .iter()
        .enumerate()
        .max_by_key(|&(_, &count)| count)
        .map(|(i, &count)| (i, count))?;
    let modal_radius = params.min_radius as f32 + mode as f32;
    let required = (MIN_RING_SUPPORT as f32)
        .max(std::f32::consts::TAU * modal_radius * MIN_RING_COVERAGE);
    if (support as f32) < required {
        return None;
    }

    let mut sum = 0.0f32;
    let mut n = 0usize;
    for &dist in &aligned {
        if (dist - modal_radius).abs() <= 1.0 {
            sum += dist;
            n += 1;
        }
    }
    Some(if n > 0 { sum / n as f32 } else { modal_radius })
}
