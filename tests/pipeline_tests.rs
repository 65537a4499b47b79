// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end pipeline tests: synthetic scenes through the driver

use std::sync::Arc;

use depthmark::backends::enumeration::{spawn_discovery, CameraBuilder};
use depthmark::backends::source::{
    FailingSource, RawDepthSource, RawFrame, SceneUnits, SyntheticScene,
};
use depthmark::backends::stereo::StereoCamera;
use depthmark::backends::structured_light::StructuredLightCamera;
use depthmark::backends::types::{CameraIntrinsics, DeviceInfo};
use depthmark::backends::DepthCamera;
use depthmark::config::Config;
use depthmark::errors::AcquisitionError;
use depthmark::output::{FrameSink, TickOutput};
use depthmark::pipeline::{Detection, PipelineDriver};

/// Sink that keeps full detection lists for assertions
#[derive(Default)]
struct CaptureSink {
    outputs: Vec<(u32, Vec<Detection>)>,
}

impl FrameSink for CaptureSink {
    fn present(&mut self, camera_id: u32, output: &TickOutput) {
        self.outputs.push((camera_id, output.detections.clone()));
    }
}

/// Stereo camera over a 160x120 synthetic scene with round-number
/// intrinsics: fx = 100 makes a 14 px marker at 1 m exactly 0.14 m
fn marker_camera() -> Box<dyn DepthCamera> {
    let scene = SyntheticScene::new(160, 120, SceneUnits::Millimeters, 2000, 1000, 14.0);
    let intrinsics = CameraIntrinsics {
        fx: 100.0,
        fy: 100.0,
        cx: 80.0,
        cy: 60.0,
    };
    Box::new(StereoCamera::new(
        "marker-cam",
        Box::new(scene),
        intrinsics,
        0.001,
        DeviceInfo::default(),
    ))
}

fn marker_config() -> Config {
    let mut config = Config::default();
    config.spheres.sphere_radius = 0.14;
    config.spheres.min_radius = 6;
    config.spheres.max_radius = 24;
    config.spheres.param1 = 5.0;
    config.spheres.param2 = 20.0;
    config
}

#[test]
fn marker_is_found_where_the_scene_put_it() {
    let mut driver = PipelineDriver::new(marker_config());
    driver.add_camera(marker_camera());
    let mut sink = CaptureSink::default();

    driver.tick(&mut sink);

    let (_, detections) = &sink.outputs[0];
    assert_eq!(detections.len(), 1, "expected exactly one marker");
    let d = &detections[0];
    // the scene places the marker at (width/2 - 8, height/2) on the
    // first frame
    assert!((d.center.0 as f32 - 72.0).abs() <= 1.0, "center x {}", d.center.0);
    assert!((d.center.1 as f32 - 60.0).abs() <= 1.0, "center y {}", d.center.1);
    assert!((d.radius_px - 14.0).abs() <= 2.0, "radius {}", d.radius_px);
    assert!((d.depth_m - 1.0).abs() < 0.01);
}

#[test]
fn marker_tracks_its_drift_across_ticks() {
    let mut driver = PipelineDriver::new(marker_config());
    driver.add_camera(marker_camera());
    let mut sink = CaptureSink::default();

    for _ in 0..3 {
        driver.tick(&mut sink);
    }

    // the marker drifts one pixel right per frame
    let xs: Vec<u32> = sink
        .outputs
        .iter()
        .map(|(_, detections)| detections[0].center.0)
        .collect();
    for (tick, &x) in xs.iter().enumerate() {
        let expected = 72.0 + tick as f32;
        assert!((x as f32 - expected).abs() <= 1.0, "tick {tick}: x {x}");
    }
}

#[test]
fn both_backend_families_process_the_same_scene() {
    let mut config = marker_config();
    // disparity quantization shifts the apparent depth slightly
    config.spheres.radius_tolerance = 0.3;
    let mut driver = PipelineDriver::new(config);

    driver.add_camera(marker_camera());
    let scene = SyntheticScene::new(160, 120, SceneUnits::Disparity, 2000, 1000, 14.0);
    let intrinsics = CameraIntrinsics {
        fx: 100.0,
        fy: 100.0,
        cx: 80.0,
        cy: 60.0,
    };
    driver.add_camera(Box::new(StructuredLightCamera::new(
        "disparity-cam",
        Box::new(scene),
        intrinsics,
        DeviceInfo::default(),
    )));

    let mut sink = CaptureSink::default();
    driver.tick(&mut sink);

    assert_eq!(sink.outputs.len(), 2);
    for (camera_id, detections) in &sink.outputs {
        assert_eq!(detections.len(), 1, "camera {camera_id} missed the marker");
        assert!((detections[0].depth_m - 1.0).abs() < 0.05);
    }
}

/// Source that delivers a truncated byte plane
struct TruncatedSource {
    width: u32,
    height: u32,
}

impl RawDepthSource for TruncatedSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<RawFrame, AcquisitionError> {
        let data: Arc<[u8]> = vec![0u8; 7].into();
        Ok(RawFrame {
            width: self.width,
            height: self.height,
            data,
            color: None,
            sequence: 0,
        })
    }
}

#[test]
fn acquisition_and_frame_errors_degrade_the_same_way() {
    let mut driver = PipelineDriver::new(Config::default());
    let timeout = driver.add_camera(Box::new(StereoCamera::with_default_calibration(
        "timeout-cam",
        Box::new(FailingSource::new(64, 48, AcquisitionError::Timeout)),
        DeviceInfo::default(),
    )));
    let malformed = driver.add_camera(Box::new(StereoCamera::with_default_calibration(
        "truncated-cam",
        Box::new(TruncatedSource {
            width: 64,
            height: 48,
        }),
        DeviceInfo::default(),
    )));
    let healthy = driver.add_camera(marker_camera());
    let mut sink = CaptureSink::default();

    driver.tick(&mut sink);
    driver.tick(&mut sink);

    for id in [timeout, malformed] {
        let camera = driver.camera_mut(id).unwrap();
        assert!(!camera.enabled, "camera {id} should be disabled");
        assert!(!camera.detect_spheres);
    }
    let camera = driver.camera_mut(healthy).unwrap();
    assert!(camera.enabled);
    assert!(camera.detect_spheres);
    assert!(sink.outputs.iter().all(|(id, _)| *id == healthy));
}

#[test]
fn smoothing_keeps_a_static_marker_detectable() {
    let mut config = marker_config();
    config.smoothing.enabled = true;
    config.smoothing.window = 3;
    let mut driver = PipelineDriver::new(config);
    driver.add_camera(marker_camera());
    let mut sink = CaptureSink::default();

    for _ in 0..4 {
        driver.tick(&mut sink);
    }
    // averaging a slow drift softens the boundary but must not lose
    // the marker
    for (tick, (_, detections)) in sink.outputs.iter().enumerate() {
        assert!(!detections.is_empty(), "tick {tick} lost the marker");
    }
}

#[tokio::test]
async fn discovered_cameras_join_the_running_loop() {
    let builders: Vec<CameraBuilder> = vec![
        Box::new(|| Ok(marker_camera())),
        Box::new(|| Ok(marker_camera())),
    ];
    let receiver = spawn_discovery(builders);
    let mut driver = PipelineDriver::new(marker_config()).with_discovery(receiver);
    let mut sink = CaptureSink::default();

    // the loop starts before discovery finishes and picks cameras up
    // as they arrive
    for _ in 0..50 {
        driver.tick(&mut sink);
        if driver.cameras().len() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(driver.cameras().len(), 2);

    driver.tick(&mut sink);
    let last_tick: Vec<u32> = sink
        .outputs
        .iter()
        .rev()
        .take(2)
        .map(|(id, _)| *id)
        .collect();
    assert!(last_tick.contains(&0) && last_tick.contains(&1));
}
