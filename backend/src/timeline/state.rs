//! Native resource states.

use {bitflags::bitflags, kiln_core::ResourceState};

bitflags! {
    /// Resource usage state. Every buffer and image is in exactly one
    /// combination of these at any point of the queue timeline.
    #[repr(transparent)]
    pub struct ResourceStates: u32 {
        /// Vertex or constant buffer.
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        /// Index buffer.
        const INDEX_BUFFER = 0x2;
        /// Render target.
        const RENDER_TARGET = 0x4;
        /// Unordered access.
        const UNORDERED_ACCESS = 0x8;
        /// Read by non-pixel shaders.
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        /// Read by pixel shaders.
        const PIXEL_SHADER_RESOURCE = 0x80;
        /// Indirect argument buffer.
        const INDIRECT_ARGUMENT = 0x200;
        /// Copy destination.
        const COPY_DEST = 0x400;
        /// Copy source.
        const COPY_SOURCE = 0x800;
        /// Every read-only state.
        const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits
            | Self::INDEX_BUFFER.bits
            | Self::NON_PIXEL_SHADER_RESOURCE.bits
            | Self::PIXEL_SHADER_RESOURCE.bits
            | Self::INDIRECT_ARGUMENT.bits
            | Self::COPY_SOURCE.bits;
    }
}

impl ResourceStates {
    /// Common state. Any queue can access resource in this state.
    pub const COMMON: Self = Self::empty();

    /// Presentable state. Same as `COMMON`.
    pub const PRESENT: Self = Self::empty();

    /// Native state for logical state.
    pub fn from_state(state: ResourceState) -> Self {
        match state {
            ResourceState::Undefined | ResourceState::General => ResourceStates::COMMON,
            ResourceState::GenericRead => ResourceStates::GENERIC_READ,
            ResourceState::TransferSrc => ResourceStates::COPY_SOURCE,
            ResourceState::TransferDst => ResourceStates::COPY_DEST,
            ResourceState::ShaderRead => {
                ResourceStates::NON_PIXEL_SHADER_RESOURCE | ResourceStates::PIXEL_SHADER_RESOURCE
            }
            ResourceState::UnorderedAccess => ResourceStates::UNORDERED_ACCESS,
            ResourceState::RenderTarget => ResourceStates::RENDER_TARGET,
            ResourceState::Present => ResourceStates::PRESENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_read_allows_copy_source() {
        assert!(ResourceStates::from_state(ResourceState::GenericRead)
            .contains(ResourceStates::COPY_SOURCE));
        assert_eq!(
            ResourceStates::from_state(ResourceState::Present),
            ResourceStates::from_state(ResourceState::General)
        );
    }
}
