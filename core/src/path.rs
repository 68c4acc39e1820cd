//! Stable path hashing.
//!
//! Renderer objects are addressed by slash-separated paths such as
//! `"Renderer/GBuffer/Depth"`. [`PathId`] is the 64-bit FNV-1a hash of such a
//! path. Hashing is a `const fn`, so identifiers can be computed at compile time
//! and stored in constants:
//!
//! ```
//! use framegraph_core::path::PathId;
//!
//! const DEPTH: PathId = PathId::new("Renderer/GBuffer/Depth");
//! assert_eq!(DEPTH, PathId::new("Renderer/GBuffer/Depth"));
//! assert_ne!(DEPTH, PathId::new("Renderer/GBuffer/Normal"));
//! ```

use std::fmt;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a byte string with 64-bit FNV-1a.
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    fnv1a_64_continue(FNV_OFFSET_BASIS, bytes)
}

/// Continue an FNV-1a hash from a previous state.
pub const fn fnv1a_64_continue(mut hash: u64, bytes: &[u8]) -> u64 {
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Hash of a slash-separated object path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(u64);

impl PathId {
    /// Hash `path`.
    pub const fn new(path: &str) -> Self {
        Self(fnv1a_64(path.as_bytes()))
    }

    /// Wrap a raw, already hashed value.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw hash value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Hash `self` joined with a child segment, as if the full path
    /// `"{parent}/{segment}"` had been hashed.
    pub const fn join(self, segment: &str) -> Self {
        let hash = fnv1a_64_continue(self.0, b"/");
        Self(fnv1a_64_continue(hash, segment.as_bytes()))
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl From<&str> for PathId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a_64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a_64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_64(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_path_id_const() {
        const ID: PathId = PathId::new("Renderer/TAA/OutputA");
        assert_eq!(ID, PathId::from("Renderer/TAA/OutputA"));
        assert_eq!(ID.value(), fnv1a_64(b"Renderer/TAA/OutputA"));
    }

    #[test]
    fn test_join_matches_full_path() {
        let parent = PathId::new("Renderer/TAA");
        assert_eq!(parent.join("OutputB"), PathId::new("Renderer/TAA/OutputB"));
    }

    #[test]
    fn test_display_is_hex() {
        let text = PathId::from_raw(0xff).to_string();
        assert_eq!(text, "0x00000000000000ff");
    }
}
