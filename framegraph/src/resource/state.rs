//! GPU-visible resource states.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// GPU-visible access state of a resource.
    ///
    /// Read states may be combined (a texture can be sampled by pixel and
    /// compute shaders at the same time); a write state must be used alone.
    /// The empty set is [`ResourceState::COMMON`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceState: u32 {
        /// Bound as a vertex or constant buffer.
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 0;
        /// Bound as an index buffer.
        const INDEX_BUFFER = 1 << 1;
        /// Written as a color render target.
        const RENDER_TARGET = 1 << 2;
        /// Read/write storage access (UAV).
        const UNORDERED_ACCESS = 1 << 3;
        /// Written as a depth/stencil target.
        const DEPTH_WRITE = 1 << 4;
        /// Read-only depth/stencil.
        const DEPTH_READ = 1 << 5;
        /// Sampled by any non-pixel shader stage.
        const NON_PIXEL_SHADER_RESOURCE = 1 << 6;
        /// Sampled by the pixel shader.
        const PIXEL_SHADER_RESOURCE = 1 << 7;
        /// Source of indirect draw/dispatch arguments.
        const INDIRECT_ARGUMENT = 1 << 8;
        /// Destination of a copy.
        const COPY_DEST = 1 << 9;
        /// Source of a copy.
        const COPY_SOURCE = 1 << 10;
        /// Ray tracing acceleration structure.
        const RAYTRACING_ACCELERATION_STRUCTURE = 1 << 11;

        /// Sampled by every shader stage.
        const ALL_SHADER_RESOURCE =
            Self::NON_PIXEL_SHADER_RESOURCE.bits() | Self::PIXEL_SHADER_RESOURCE.bits();
        /// Every buffer and texture read state.
        const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits()
            | Self::INDIRECT_ARGUMENT.bits()
            | Self::COPY_SOURCE.bits();
    }
}

impl ResourceState {
    /// Accessible by any queue without a specific usage.
    pub const COMMON: Self = Self::empty();
    /// Ready for presentation. Identical to [`ResourceState::COMMON`].
    pub const PRESENT: Self = Self::empty();

    const WRITE_STATES: Self = Self::RENDER_TARGET
        .union(Self::UNORDERED_ACCESS)
        .union(Self::DEPTH_WRITE)
        .union(Self::COPY_DEST);

    /// Check if this state allows the GPU to write the resource.
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE_STATES)
    }

    /// Check if this state includes unordered (storage) access.
    pub fn is_unordered_access(self) -> bool {
        self.contains(Self::UNORDERED_ACCESS)
    }

    /// Check that this combination can be requested by a single edge.
    ///
    /// A write state and the acceleration structure state must be used alone.
    pub fn is_valid(self) -> bool {
        if self.is_write() {
            return self.bits().count_ones() == 1;
        }
        if self.contains(Self::RAYTRACING_ACCELERATION_STRUCTURE) {
            return self == Self::RAYTRACING_ACCELERATION_STRUCTURE;
        }
        true
    }
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::COMMON
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "COMMON");
        }
        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{name}")?;
        }
        Ok(())
    }
}
