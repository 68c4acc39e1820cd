//! # Frame Graph Core
//!
//! Basic utilities shared by the frame graph crates: stable path hashing
//! for resource identifiers and optional Tracy instrumentation.

pub mod path;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the core library version.
pub fn init() {
    log::info!("Frame Graph Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
