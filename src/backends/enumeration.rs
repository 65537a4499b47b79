// SPDX-License-Identifier: GPL-3.0-only

//! Background device discovery
//!
//! Device initialization can take seconds per unit, so it runs as a
//! detached task while the tick loop starts immediately. Discovery
//! results arrive over an explicit channel the driver polls each tick;
//! the camera collection is append-only during this phase and stable
//! afterwards. A builder that fails is logged and skipped, it never
//! aborts discovery of the remaining devices.

use super::DepthCamera;
use crate::errors::PipelineResult;
use futures::channel::mpsc;
use tracing::{info, warn};

/// A camera produced by discovery, ready for the pipeline to adopt
pub struct DiscoveredCamera {
    pub backend: Box<dyn DepthCamera>,
}

/// Deferred camera construction, run inside the discovery task
pub type CameraBuilder = Box<dyn FnOnce() -> PipelineResult<Box<dyn DepthCamera>> + Send>;

/// Receiver half of the discovery channel
pub type DiscoveryReceiver = mpsc::Receiver<DiscoveredCamera>;

/// Spawn the discovery task on the current tokio runtime.
///
/// Each builder is run in order; successes are sent over the returned
/// channel. The channel closing signals that discovery is complete.
pub fn spawn_discovery(builders: Vec<CameraBuilder>) -> DiscoveryReceiver {
    let (mut sender, receiver) = mpsc::channel(builders.len().max(1));

    tokio::spawn(async move {
        let total = builders.len();
        info!(total, "Starting device discovery");

        let results = tokio::task::spawn_blocking(move || {
            let mut cameras = Vec::new();
            for (index, builder) in builders.into_iter().enumerate() {
                match builder() {
                    Ok(backend) => {
                        info!(
                            index,
                            name = backend.name(),
                            kind = %backend.kind(),
                            "Discovered camera"
                        );
                        cameras.push(DiscoveredCamera { backend });
                    }
                    Err(err) => {
                        warn!(index, error = %err, "Device initialization failed, skipping");
                    }
                }
            }
            cameras
        })
        .await;

        match results {
            Ok(cameras) => {
                let found = cameras.len();
                for camera in cameras {
                    if sender.try_send(camera).is_err() {
                        warn!("Discovery receiver dropped, abandoning remaining devices");
                        return;
                    }
                }
                info!(found, total, "Device discovery finished");
            }
            Err(err) => warn!(error = %err, "Discovery task panicked"),
        }
    });

    receiver
}
