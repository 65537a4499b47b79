// SPDX-License-Identifier: GPL-3.0-only

//! Frame-processing pipeline
//!
//! ```text
//!             ┌→ edges ─→ spheres ─┐
//! acquire ─→ smooth               ├─→ TickOutput ─→ FrameSink
//!             └→ normals ─────────┘
//! ```
//!
//! [`driver::PipelineDriver`] runs the stages once per tick per
//! enabled camera; the stage modules themselves are pure functions
//! over frames and parameters.

pub mod camera;
pub mod driver;
pub mod edges;
pub mod normals;
pub mod spheres;
pub mod temporal;

pub use camera::{Camera, DegradeAction};
pub use driver::PipelineDriver;
pub use spheres::Detection;
pub use temporal::TemporalBuffer;
