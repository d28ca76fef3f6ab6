//! Image layouts and access masks.

use {bitflags::bitflags, kiln_core::ResourceState};

/// Layout of image memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Content is discarded. Valid only as old layout.
    Undefined,
    /// Supports all access.
    General,
    /// Any read-only access.
    ReadOnlyOptimal,
    /// Source of transfer commands.
    TransferSrcOptimal,
    /// Destination of transfer commands.
    TransferDstOptimal,
    /// Read by shaders.
    ShaderReadOnlyOptimal,
    /// Color attachment of a render pass.
    ColorAttachmentOptimal,
    /// Presentable.
    PresentSrc,
}

impl ImageLayout {
    /// Layout for logical resource state.
    pub fn from_state(state: ResourceState) -> Self {
        match state {
            ResourceState::Undefined => ImageLayout::Undefined,
            ResourceState::General | ResourceState::UnorderedAccess => ImageLayout::General,
            ResourceState::GenericRead => ImageLayout::ReadOnlyOptimal,
            ResourceState::TransferSrc => ImageLayout::TransferSrcOptimal,
            ResourceState::TransferDst => ImageLayout::TransferDstOptimal,
            ResourceState::ShaderRead => ImageLayout::ShaderReadOnlyOptimal,
            ResourceState::RenderTarget => ImageLayout::ColorAttachmentOptimal,
            ResourceState::Present => ImageLayout::PresentSrc,
        }
    }

    /// Check if transfer commands can read image in this layout.
    pub fn is_transfer_src(self) -> bool {
        match self {
            ImageLayout::General | ImageLayout::ReadOnlyOptimal | ImageLayout::TransferSrcOptimal => {
                true
            }
            _ => false,
        }
    }

    /// Check if transfer commands can write image in this layout.
    pub fn is_transfer_dst(self) -> bool {
        match self {
            ImageLayout::General | ImageLayout::TransferDstOptimal => true,
            _ => false,
        }
    }
}

bitflags! {
    /// Memory access types.
    #[repr(transparent)]
    pub struct AccessFlags: u32 {
        /// Read index buffer.
        const INDEX_READ = 0x00002;
        /// Read vertex attributes.
        const VERTEX_ATTRIBUTE_READ = 0x00004;
        /// Read uniform buffer.
        const UNIFORM_READ = 0x00008;
        /// Read from shader.
        const SHADER_READ = 0x00020;
        /// Write from shader.
        const SHADER_WRITE = 0x00040;
        /// Read color attachment.
        const COLOR_ATTACHMENT_READ = 0x00080;
        /// Write color attachment.
        const COLOR_ATTACHMENT_WRITE = 0x00100;
        /// Read by transfer command.
        const TRANSFER_READ = 0x00800;
        /// Write by transfer command.
        const TRANSFER_WRITE = 0x01000;
        /// Any read.
        const MEMORY_READ = 0x08000;
        /// Any write.
        const MEMORY_WRITE = 0x10000;
    }
}

impl AccessFlags {
    /// Access mask for logical resource state.
    pub fn from_state(state: ResourceState) -> Self {
        match state {
            ResourceState::Undefined => AccessFlags::empty(),
            ResourceState::General => AccessFlags::MEMORY_READ | AccessFlags::MEMORY_WRITE,
            ResourceState::GenericRead => {
                AccessFlags::INDEX_READ
                    | AccessFlags::VERTEX_ATTRIBUTE_READ
                    | AccessFlags::UNIFORM_READ
                    | AccessFlags::SHADER_READ
                    | AccessFlags::TRANSFER_READ
            }
            ResourceState::TransferSrc => AccessFlags::TRANSFER_READ,
            ResourceState::TransferDst => AccessFlags::TRANSFER_WRITE,
            ResourceState::ShaderRead => AccessFlags::SHADER_READ,
            ResourceState::UnorderedAccess => AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE,
            ResourceState::RenderTarget => {
                AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE
            }
            ResourceState::Present => AccessFlags::MEMORY_READ,
        }
    }
}
