//! Ping-pong resource identities.
//!
//! A double-buffered resource is two physical allocations that swap roles
//! every frame: one is written this frame while the other still holds the
//! previous frame's result. Each allocation has its own [`ResourceId`], so a
//! pass that reads last frame's data and writes this frame's never depends on
//! itself within one frame.
//!
//! ```
//! use framegraph::{FrameParity, PingPong};
//!
//! let history = PingPong::new("PostProcess/TAA/Output");
//! let parity = FrameParity::from_frame(6);
//!
//! assert_ne!(history.current(parity), history.previous(parity));
//! assert_eq!(history.previous(parity), history.current(parity.other()));
//! ```

use framegraph_core::path::PathId;

use super::ResourceId;

/// Which of the two buffers is written in a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameParity {
    /// Buffer 0 is written.
    #[default]
    Even,
    /// Buffer 1 is written.
    Odd,
}

impl FrameParity {
    /// Parity of the frame with the given index.
    pub fn from_frame(frame_index: u64) -> Self {
        if frame_index % 2 == 0 {
            Self::Even
        } else {
            Self::Odd
        }
    }

    /// Buffer index, 0 or 1.
    pub fn index(self) -> usize {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }

    /// The opposite parity.
    pub fn other(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }
}

/// Mapping from `{logical_name, parity}` to a resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingPong {
    name: String,
    ids: [ResourceId; 2],
}

impl PingPong {
    /// Derive both identifiers from `logical_name`.
    ///
    /// The identifiers are the path ids of `"{logical_name}/0"` and
    /// `"{logical_name}/1"`.
    pub fn new(logical_name: impl Into<String>) -> Self {
        let name = logical_name.into();
        let base = PathId::new(&name);
        let ids = [
            ResourceId::from(base.join("0")),
            ResourceId::from(base.join("1")),
        ];
        Self { name, ids }
    }

    /// Logical name shared by both buffers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the buffer selected by `parity`.
    pub fn id(&self, parity: FrameParity) -> ResourceId {
        self.ids[parity.index()]
    }

    /// Identifier of the buffer written in a frame of the given parity.
    pub fn current(&self, parity: FrameParity) -> ResourceId {
        self.id(parity)
    }

    /// Identifier of the buffer holding the previous frame's result.
    pub fn previous(&self, parity: FrameParity) -> ResourceId {
        self.id(parity.other())
    }

    /// Both identifiers, indexed by parity.
    pub fn ids(&self) -> [ResourceId; 2] {
        self.ids
    }
}

/// A pair of resources of any type addressed through a [`PingPong`] mapping.
#[derive(Debug, Clone)]
pub struct DoubleBuffered<T> {
    ids: PingPong,
    buffers: [T; 2],
}

impl<T> DoubleBuffered<T> {
    /// Pair two allocations under `logical_name`.
    pub fn new(logical_name: impl Into<String>, first: T, second: T) -> Self {
        Self {
            ids: PingPong::new(logical_name),
            buffers: [first, second],
        }
    }

    /// The identifier mapping.
    pub fn ids(&self) -> &PingPong {
        &self.ids
    }

    /// Identifier and allocation written in a frame of the given parity.
    pub fn current(&self, parity: FrameParity) -> (ResourceId, &T) {
        (self.ids.current(parity), &self.buffers[parity.index()])
    }

    /// Identifier and allocation holding the previous frame's result.
    pub fn previous(&self, parity: FrameParity) -> (ResourceId, &T) {
        (
            self.ids.previous(parity),
            &self.buffers[parity.other().index()],
        )
    }

    /// Iterate over both buffers with their identifiers.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &T)> {
        self.ids.ids().into_iter().zip(self.buffers.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_alternates() {
        assert_eq!(FrameParity::from_frame(0), FrameParity::Even);
        assert_eq!(FrameParity::from_frame(1), FrameParity::Odd);
        assert_eq!(FrameParity::from_frame(2), FrameParity::Even);
        assert_eq!(FrameParity::Even.other(), FrameParity::Odd);
        assert_eq!(FrameParity::Odd.index(), 1);
    }

    #[test]
    fn test_ids_differ_by_parity() {
        let taa = PingPong::new("TAA/Output");
        assert_ne!(taa.id(FrameParity::Even), taa.id(FrameParity::Odd));
        assert_eq!(taa.id(FrameParity::Even), ResourceId::from_path("TAA/Output/0"));
        assert_eq!(taa.name(), "TAA/Output");
    }

    #[test]
    fn test_previous_is_last_frames_current() {
        let taa = PingPong::new("TAA/Output");
        for frame in 0..4u64 {
            let parity = FrameParity::from_frame(frame + 1);
            let last = FrameParity::from_frame(frame);
            assert_eq!(taa.previous(parity), taa.current(last));
        }
    }

    #[test]
    fn test_double_buffered_pairs_ids_with_buffers() {
        let buffers = DoubleBuffered::new("Denoiser/Cache", "cache a", "cache b");
        let (id, buffer) = buffers.current(FrameParity::Odd);
        assert_eq!(id, buffers.ids().id(FrameParity::Odd));
        assert_eq!(*buffer, "cache b");

        let (prev_id, prev) = buffers.previous(FrameParity::Odd);
        assert_eq!(prev_id, buffers.ids().id(FrameParity::Even));
        assert_eq!(*prev, "cache a");
        assert_eq!(buffers.iter().count(), 2);
    }
}
