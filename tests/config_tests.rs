// SPDX-License-Identifier: GPL-3.0-only

//! Configuration persistence and validation round trips

use depthmark::config::{
    AdaptiveThresholdKind, Config, NormalEstimationParameters, SphereDetectionParameters,
    ThresholdKind,
};
use depthmark::errors::ConfigError;

#[test]
fn save_and_load_round_trip() {
    let dir = std::env::temp_dir().join(format!("depthmark-test-{}", std::process::id()));
    let path = dir.join("config.json");

    let mut config = Config::default();
    config.spheres.sphere_radius = 0.035;
    config.spheres.min_radius = 8;
    config.spheres.max_radius = 48;
    config.spheres.adaptive_threshold = AdaptiveThresholdKind::Gaussian;
    config.spheres.threshold = ThresholdKind::Otsu;
    config.display_edges = true;
    config.set_smoothing_window(7).unwrap();

    config.save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn loading_an_invalid_file_is_rejected() {
    let dir = std::env::temp_dir().join(format!("depthmark-bad-{}", std::process::id()));
    let path = dir.join("config.json");

    // persist a config whose radius range is inverted, bypassing the
    // validated setters by editing the JSON directly
    let mut config = Config::default();
    config.save(&path).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    let patched = raw
        .replace("\"min_radius\": 4", "\"min_radius\": 64")
        .replace("\"max_radius\": 32", "\"max_radius\": 16");
    std::fs::write(&path, patched).unwrap();

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err, ConfigError::InvalidRadiusRange { min: 64, max: 16 });

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_file_surfaces_an_io_error() {
    let path = std::env::temp_dir().join("depthmark-nonexistent/config.json");
    assert!(matches!(
        Config::load(&path),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn unknown_fields_are_ignored_on_load() {
    let dir = std::env::temp_dir().join(format!("depthmark-fwd-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");

    // a config written by a newer version still loads
    std::fs::write(&path, r#"{"display_edges": true, "future_knob": 3}"#).unwrap();
    let loaded = Config::load(&path).unwrap();
    assert!(loaded.display_edges);
    assert_eq!(loaded.spheres, SphereDetectionParameters::default());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn sphere_parameter_boundaries() {
    let mut params = SphereDetectionParameters::default();
    params.sphere_radius = 0.0;
    assert!(params.validate().is_err());

    let mut params = SphereDetectionParameters::default();
    params.block_size = 3;
    assert!(params.validate().is_ok(), "smallest odd block size is legal");

    let mut params = SphereDetectionParameters::default();
    params.min_radius = params.max_radius;
    assert!(params.validate().is_ok(), "degenerate range of one radius is legal");
}

#[test]
fn normal_parameter_boundaries() {
    let mut params = NormalEstimationParameters::default();
    params.edge_cutoff = -1.0;
    assert!(params.validate().is_err());

    let mut params = NormalEstimationParameters::default();
    params.upness_filter = 0.0;
    assert!(params.validate().is_ok(), "zero filter passes only exact up normals");
}
