//! # Frame Graph Demos
//!
//! Demo frames showcasing the frame graph scheduler.
//!
//! ## Available Demos
//!
//! - `frame_demo` - A deferred renderer's frames (ray-traced G-buffer,
//!   compositing, TAA, luminance reduction, final pass and GUI) executed on the
//!   dummy backend

pub mod renderer;

pub use renderer::{DemoRenderer, FrameOutput, RenderSettings};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
