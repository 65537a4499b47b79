// SPDX-License-Identifier: GPL-3.0-only

//! Surface-normal estimation from depth
//!
//! Normals come from central differences of back-projected neighbors:
//! the cross product of the horizontal and vertical 3-D tangents at a
//! pixel. Pixels straddling a depth discontinuity are skipped rather
//! than blended, a normal computed across an object boundary points
//! nowhere meaningful. The result is the usual normal-map encoding,
//! each component mapped from [-1, 1] to [0, 255].

use crate::backends::{CameraIntrinsics, DepthFrame};
use crate::config::{NormalEstimationParameters, UpAxis};
use image::{Rgb, RgbImage};
use nalgebra::Vector3;

/// Camera-space direction treated as "up" for the given axis.
///
/// Image y grows downward and z grows away from the camera, so the
/// conventional up directions are the negated Y and Z axes.
fn up_vector(axis: UpAxis) -> Vector3<f32> {
    match axis {
        UpAxis::X => Vector3::new(1.0, 0.0, 0.0),
        UpAxis::Y => Vector3::new(0.0, -1.0, 0.0),
        UpAxis::Z => Vector3::new(0.0, 0.0, -1.0),
    }
}

fn encode(normal: &Vector3<f32>) -> Rgb<u8> {
    let component = |v: f32| (((v + 1.0) * 0.5) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([
        component(normal.x),
        component(normal.y),
        component(normal.z),
    ])
}

/// Estimate surface normals over a depth frame as a normal map.
///
/// `num_samples` of zero means every interior pixel; otherwise pixels
/// are visited on a square stride chosen so roughly that many samples
/// are produced. Samples at invalid depth, across a discontinuity
/// larger than `edge_cutoff` millimeters, or whose normal deviates
/// from the up axis by more than `upness_filter` radians stay black.
pub fn estimate(
    frame: &DepthFrame,
    params: &NormalEstimationParameters,
    intrinsics: &CameraIntrinsics,
) -> RgbImage {
    let width = frame.width();
    let height = frame.height();
    let mut map = RgbImage::new(width, height);
    if width < 3 || height < 3 {
        return map;
    }

    let stride = if params.num_samples == 0 {
        1
    } else {
        let pixels = (width * height) as f32;
        ((pixels / params.num_samples as f32).sqrt() as u32).max(1)
    };

    let up = up_vector(params.up_axis);
    let cutoff_m = params.edge_cutoff / 1000.0;

    let mut y = 1;
    while y < height - 1 {
        let mut x = 1;
        while x < width - 1 {
            if let Some(normal) = normal_at(frame, intrinsics, x, y, cutoff_m)
                && normal.angle(&up) <= params.upness_filter
            {
                map.put_pixel(x, y, encode(&normal));
            }
            x += stride;
        }
        y += stride;
    }
    map
}

/// Unit normal at one interior pixel, oriented toward the camera, or
/// None at invalid depth or across a discontinuity. Callers must stay
/// off the frame border, which `estimate`'s loop bounds guarantee.
fn normal_at(
    frame: &DepthFrame,
    intrinsics: &CameraIntrinsics,
    x: u32,
    y: u32,
    cutoff_m: f32,
) -> Option<Vector3<f32>> {
    let center = frame.depth_m_at(x, y);
    let left = frame.depth_m_at(x - 1, y);
    let right = frame.depth_m_at(x + 1, y);
    let above = frame.depth_m_at(x, y - 1);
    let below = frame.depth_m_at(x, y + 1);
    if center <= 0.0 || left <= 0.0 || right <= 0.0 || above <= 0.0 || below <= 0.0 {
        return None;
    }
    if (right - left).abs() > cutoff_m || (below - above).abs() > cutoff_m {
        return None;
    }

    let horizontal = intrinsics.back_project((x + 1) as f32, y as f32, right)
        - intrinsics.back_project((x - 1) as f32, y as f32, left);
    let vertical = intrinsics.back_project(x as f32, (y + 1) as f32, below)
        - intrinsics.back_project(x as f32, (y - 1) as f32, above);

    let mut normal = horizontal.cross(&vertical);
    if normal.norm() <= f32::EPSILON {
        return None;
    }
    normal.normalize_mut();
    // orient toward the camera
    if normal.z > 0.0 {
        normal = -normal;
    }
    Some(normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;
    use std::sync::Arc;

    fn test_intrinsics() -> CameraIntrinsics {
        CameraIntrinsics {
            fx: 100.0,
            fy: 100.0,
            cx: 32.0,
            cy: 24.0,
        }
    }

    fn wall_frame(depth_mm: u16) -> DepthFrame {
        let data: Arc<[u16]> = vec![depth_mm; 64 * 48].into();
        DepthFrame::new(64, 48, data, 0.001).unwrap()
    }

    /// pixel value a camera-facing normal (0, 0, -1) encodes to
    const FACING: Rgb<u8> = Rgb([128, 128, 0]);

    #[test]
    fn flat_wall_faces_the_camera() {
        let frame = wall_frame(1500);
        let params = NormalEstimationParameters::default();
        let map = estimate(&frame, &params, &test_intrinsics());
        assert_eq!(*map.get_pixel(32, 24), FACING);
        assert_eq!(*map.get_pixel(10, 10), FACING);
    }

    #[test]
    fn wall_normal_is_unit_length() {
        let frame = wall_frame(1500);
        let normal = normal_at(&frame, &test_intrinsics(), 32, 24, 0.01).unwrap();
        assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(normal.z, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn sampling_stride_leaves_gaps() {
        let frame = wall_frame(1500);
        let params = NormalEstimationParameters {
            num_samples: 100,
            ..NormalEstimationParameters::default()
        };
        let map = estimate(&frame, &params, &test_intrinsics());
        let colored = map.pixels().filter(|p| p.0 != [0, 0, 0]).count();
        assert!(colored > 0);
        assert!(colored <= 200, "got {colored} samples");
    }

    #[test]
    fn discontinuity_pixels_are_skipped() {
        // left half 1000mm, right half 2000mm; default cutoff is 10mm
        let (width, height) = (64u32, 48u32);
        let mut samples = vec![1000u16; (width * height) as usize];
        for y in 0..height {
            for x in width / 2..width {
                samples[(y * width + x) as usize] = 2000;
            }
        }
        let data: Arc<[u16]> = samples.into();
        let frame = DepthFrame::new(width, height, data, 0.001).unwrap();

        let params = NormalEstimationParameters::default();
        let map = estimate(&frame, &params, &test_intrinsics());
        // pixels straddling the seam yield no normal instead of a
        // blend of the two planes
        assert_eq!(*map.get_pixel(width / 2 - 1, 20), Rgb([0, 0, 0]));
        assert_eq!(*map.get_pixel(width / 2, 20), Rgb([0, 0, 0]));
        // both planes away from the seam still face the camera
        assert_eq!(*map.get_pixel(10, 20), FACING);
        assert_eq!(*map.get_pixel(width - 10, 20), FACING);
    }

    #[test]
    fn smallest_frames_stay_on_the_interior() {
        let params = NormalEstimationParameters::default();

        // 3x3 has exactly one interior pixel
        let data: Arc<[u16]> = vec![1500u16; 9].into();
        let frame = DepthFrame::new(3, 3, data, 0.001).unwrap();
        let map = estimate(&frame, &params, &test_intrinsics());
        assert_eq!(*map.get_pixel(1, 1), FACING);

        // below 3x3 there is no interior at all
        let data: Arc<[u16]> = vec![1500u16; 4].into();
        let frame = DepthFrame::new(2, 2, data, 0.001).unwrap();
        let map = estimate(&frame, &params, &test_intrinsics());
        assert!(map.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn invalid_depth_yields_black_map() {
        let data: Arc<[u16]> = vec![0u16; 64 * 48].into();
        let frame = DepthFrame::new(64, 48, data, 0.001).unwrap();
        let params = NormalEstimationParameters::default();
        let map = estimate(&frame, &params, &test_intrinsics());
        assert!(map.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn upness_filter_rejects_perpendicular_normals() {
        let frame = wall_frame(1500);
        // wall normals are perpendicular to the Y up axis; a filter
        // tighter than a quarter turn rejects them all
        let params = NormalEstimationParameters {
            upness_filter: PI / 4.0,
            ..NormalEstimationParameters::default()
        };
        let map = estimate(&frame, &params, &test_intrinsics());
        assert!(map.pixels().all(|p| p.0 == [0, 0, 0]));

        let open = NormalEstimationParameters {
            upness_filter: PI,
            ..NormalEstimationParameters::default()
        };
        let map = estimate(&frame, &open, &test_intrinsics());
        assert_eq!(*map.get_pixel(32, 24), FACING);
    }
}
