//! Profiling support via Tracy.
//!
//! Re-exports the CPU profiling macros of [`framegraph_core::profiling`]. The
//! frame graph itself opens spans for building, barrier synthesis, every
//! recorded pass and submission, and names its recording threads.
//!
//! # Enabling Profiling
//!
//! ```bash
//! cargo run -p framegraph-demos --features profiling
//! ```
//!
//! ```ignore
//! use framegraph::profiling::{frame_mark, profile_scope};
//!
//! loop {
//!     {
//!         profile_scope!("declare_passes");
//!         // ... register passes ...
//!     }
//!     // ... build and execute ...
//!     frame_mark!();
//! }
//! ```

pub use framegraph_core::profiling::*;
