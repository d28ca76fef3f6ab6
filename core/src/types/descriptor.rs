use bitflags::bitflags;

bitflags! {
    /// Shader stages a binding is visible to.
    #[repr(transparent)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 0x01;
        /// Fragment shader stage.
        const FRAGMENT = 0x02;
        /// Compute shader stage.
        const COMPUTE = 0x04;
        /// Any ray-tracing shader stage.
        const RAY_TRACING = 0x08;
        /// All graphics stages.
        const GRAPHICS = Self::VERTEX.bits | Self::FRAGMENT.bits;
        /// All stages.
        const ALL = Self::GRAPHICS.bits | Self::COMPUTE.bits | Self::RAY_TRACING.bits;
    }
}

/// Kind of descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorKind {
    /// Uniform (constant) buffer view.
    UniformBuffer,
    /// Storage buffer view.
    StorageBuffer,
    /// Sampled image view.
    SampledImage,
    /// Storage image view.
    StorageImage,
    /// Sampler.
    Sampler,
    /// Ray-tracing acceleration structure.
    AccelerationStructure,
}

impl DescriptorKind {
    /// Heap class descriptors of this kind are stored in.
    pub fn class(self) -> DescriptorClass {
        match self {
            DescriptorKind::Sampler => DescriptorClass::Sampler,
            _ => DescriptorClass::Resource,
        }
    }
}

/// Descriptor heaps keep samplers apart from all other descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorClass {
    /// Buffer, image and acceleration structure views.
    Resource,
    /// Samplers.
    Sampler,
}

impl DescriptorClass {
    /// All classes.
    pub const ALL: [DescriptorClass; 2] = [DescriptorClass::Resource, DescriptorClass::Sampler];

    /// Index of the class in `ALL`.
    pub fn index(self) -> usize {
        match self {
            DescriptorClass::Resource => 0,
            DescriptorClass::Sampler => 1,
        }
    }
}

/// Who can see the content of a descriptor heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeapVisibility {
    /// Host writable working copy. Can't be bound on backends
    /// that separate staging heaps from shader-visible heaps.
    HostOnly,
    /// Can be bound to pipelines.
    ShaderVisible,
}

/// Descriptor heap creation info.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorHeapDesc {
    /// Number of resource descriptor slots.
    pub resources: u32,
    /// Number of sampler slots.
    pub samplers: u32,
    /// Heap visibility.
    pub visibility: HeapVisibility,
}

impl DescriptorHeapDesc {
    /// Number of slots of specified class.
    pub fn capacity(&self, class: DescriptorClass) -> u32 {
        match class {
            DescriptorClass::Resource => self.resources,
            DescriptorClass::Sampler => self.samplers,
        }
    }
}

/// Texture filtering mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Filter {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation.
    Linear,
}

/// Texture coordinate wrapping mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WrapMode {
    /// Repeat the texture.
    Tile,
    /// Repeat the texture, mirroring every other repetition.
    Mirror,
    /// Clamp to edge texels.
    Clamp,
}

/// Sampler description. Samplers live entirely in descriptor heaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplerDesc {
    /// Minification and magnification filter.
    pub filter: Filter,
    /// Wrapping mode for all coordinates.
    pub wrap: WrapMode,
}

impl SamplerDesc {
    /// Create sampler description.
    pub fn new(filter: Filter, wrap: WrapMode) -> Self {
        SamplerDesc { filter, wrap }
    }
}

/// Offsets of a descriptor set's first slots in each heap class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DescriptorOffsets {
    /// First resource slot.
    pub resources: u32,
    /// First sampler slot.
    pub samplers: u32,
}
