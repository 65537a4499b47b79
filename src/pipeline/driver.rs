// SPDX-License-Identifier: GPL-3.0-only

//! Per-tick pipeline orchestration
//!
//! The driver owns the camera collection and walks it once per tick:
//! acquire, smooth, edge-detect, sphere-detect, estimate normals, then
//! hand the result to the sink. Stages after acquisition are gated by
//! config and per-camera toggles.
//!
//! Errors are isolated per camera and degrade it monotonically: the
//! first error turns sphere detection off, a later one disables the
//! camera. A camera disabled this way is never re-enabled by the
//! driver. The loop is done when every camera is disabled.

use tracing::{debug, warn};

use crate::backends::enumeration::DiscoveryReceiver;
use crate::backends::DepthCamera;
use crate::config::Config;
use crate::errors::PipelineResult;
use crate::output::{FrameSink, TickOutput};
use crate::pipeline::camera::Camera;
use crate::pipeline::{edges, normals, spheres};

pub struct PipelineDriver {
    config: Config,
    cameras: Vec<Camera>,
    next_id: u32,
    discovery: Option<DiscoveryReceiver>,
}

impl PipelineDriver {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cameras: Vec::new(),
            next_id: 0,
            discovery: None,
        }
    }

    /// Attach a discovery channel; it is polled at the start of every
    /// tick until it closes
    pub fn with_discovery(mut self, receiver: DiscoveryReceiver) -> Self {
        self.discovery = Some(receiver);
        self
    }

    /// Adopt a backend into the collection, returning its id.
    /// Ids are dense and never reused within a session.
    pub fn add_camera(&mut self, backend: Box<dyn DepthCamera>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let camera = Camera::new(id, backend, &self.config.smoothing);
        debug!(id, name = camera.display_name(), "Camera joined the pipeline");
        self.cameras.push(camera);
        id
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn camera_mut(&mut self, id: u32) -> Option<&mut Camera> {
        self.cameras.iter_mut().find(|c| c.id() == id)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Update the smoothing window on the config and every camera
    pub fn set_smoothing_window(&mut self, window: usize) -> PipelineResult<()> {
        if self.config.set_smoothing_window(window)? {
            for camera in &mut self.cameras {
                camera.set_smoothing_window(window);
            }
        }
        Ok(())
    }

    /// True while at least one camera is enabled or discovery may
    /// still deliver one
    pub fn is_active(&self) -> bool {
        self.discovery.is_some() || self.cameras.iter().any(|c| c.enabled)
    }

    /// Drain any cameras discovery has delivered since the last tick.
    /// The collection is append-only; a closed channel detaches it.
    fn poll_discovery(&mut self) {
        let Some(receiver) = &mut self.discovery else {
            return;
        };
        // drain into a local first; adopting a camera mutates the
        // collection and must not overlap the channel borrow
        let mut adopted = Vec::new();
        let closed = loop {
            match receiver.try_next() {
                Ok(Some(discovered)) => adopted.push(discovered.backend),
                Ok(None) => break true,
                Err(_) => break false, // nothing pending yet
            }
        };
        if closed {
            debug!("Discovery channel closed");
            self.discovery = None;
        }
        for backend in adopted {
            self.add_camera(backend);
        }
    }

    /// Run one tick over every enabled camera
    pub fn tick(&mut self, sink: &mut dyn FrameSink) {
        self.poll_discovery();
        for camera in &mut self.cameras {
            if !camera.enabled {
                continue;
            }
            match process(camera, &self.config) {
                Ok(output) => sink.present(camera.id(), &output),
                Err(err) => {
                    warn!(
                        camera = camera.display_name(),
                        error = %err,
                        "Tick failed for camera"
                    );
                    camera.degrade();
                }
            }
        }
    }
}

/// One camera's tick: every stage runs sequentially, any error aborts
/// the tick for this camera only
fn process(camera: &mut Camera, config: &Config) -> PipelineResult<TickOutput> {
    let raw = camera.acquire()?;
    let depth = camera.smooth_depth(raw);
    let intrinsics = camera.intrinsics();

    let want_edges = config.display_edges || camera.detect_spheres;
    let edge_frame = want_edges.then(|| {
        let detected = edges::detect_edges(&depth, &config.spheres);
        camera.smooth_edges(detected)
    });

    let detections = if camera.detect_spheres {
        spheres::detect(&depth, edge_frame.as_ref(), &config.spheres, &intrinsics)
    } else {
        Vec::new()
    };

    let normal_map = config
        .calculate_normals
        .then(|| normals::estimate(&depth, &config.normals, &intrinsics));

    let color = if camera.show_color && camera.has_color_stream() {
        camera.color_frame()
    } else {
        None
    };

    Ok(TickOutput {
        depth,
        color,
        edges: if config.display_edges { edge_frame } else { None },
        normals: normal_map,
        detections,
    })
}
