//! Hardware abstraction layer.
//!
//! Each backend implements [`Backend`] for a zero-sized marker type and
//! provides concrete types for every associated type.
//! Raw objects created by a device are not tracked by the device.
//! Destroying them while they are in use by the device is undefined behavior,
//! hence all `destroy_*` functions are `unsafe`.

pub mod command;
pub mod device;
pub mod queue;

use std::{any::Any, fmt::Debug, hash::Hash};

/// Backend family.
pub trait Backend: 'static + Sized + Eq + Clone + Hash + Debug + Any + Send + Sync {
    /// Name of the backend used in logs.
    const NAME: &'static str;

    /// Logical device.
    type Device: device::Device<Self>;

    /// Hardware queue.
    type Queue: queue::Queue<Self>;

    /// Command buffer.
    type CommandBuffer: command::CommandBuffer<Self>;

    /// Host-waitable completion primitive.
    type Fence: Debug + Send + Sync;

    /// Binary GPU to GPU synchronization primitive.
    type Semaphore: Debug + Send + Sync;

    /// Monotonic counter that can be waited for from both host and GPU.
    type Timeline: Debug + Send + Sync;

    /// Raw buffer.
    type Buffer: Debug + Clone + Send + Sync;

    /// Raw image.
    type Image: Debug + Clone + Send + Sync;

    /// Descriptor heap.
    type DescriptorHeap: Debug + Clone + Send + Sync;

    /// Pipeline state object.
    type Pipeline: Debug + Clone + Send + Sync;

    /// Open new logical device.
    fn open(config: &crate::DeviceConfig) -> Result<Self::Device, crate::DeviceError>;
}

/// Pipeline creation info.
/// Shader code and fixed-function state are opaque to the core.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineDesc {
    /// Label used in logs.
    pub label: String,

    /// Where the pipeline is bound.
    pub bind_point: crate::BindPoint,

    /// Opaque pipeline state cache blob from a previous run.
    pub cache: Option<Vec<u8>>,
}

/// Descriptor value written into a heap slot.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub enum Descriptor<'a, B: Backend> {
    /// Range of a buffer.
    Buffer {
        /// Uniform or storage buffer.
        kind: crate::DescriptorKind,
        /// Viewed buffer.
        #[derivative(Clone(clone_with = "std::clone::Clone::clone"))]
        buffer: &'a B::Buffer,
        /// Viewed bytes.
        range: std::ops::Range<u64>,
    },

    /// Whole image.
    Image {
        /// Sampled or storage image.
        kind: crate::DescriptorKind,
        /// Viewed image.
        #[derivative(Clone(clone_with = "std::clone::Clone::clone"))]
        image: &'a B::Image,
    },

    /// Sampler.
    Sampler(crate::SamplerDesc),

    /// Acceleration structure stored in a buffer.
    AccelerationStructure(
        #[derivative(Clone(clone_with = "std::clone::Clone::clone"))] &'a B::Buffer,
    ),
}

impl<'a, B> Descriptor<'a, B>
where
    B: Backend,
{
    /// Kind of the descriptor.
    pub fn kind(&self) -> crate::DescriptorKind {
        match *self {
            Descriptor::Buffer { kind, .. } | Descriptor::Image { kind, .. } => kind,
            Descriptor::Sampler(_) => crate::DescriptorKind::Sampler,
            Descriptor::AccelerationStructure(_) => crate::DescriptorKind::AccelerationStructure,
        }
    }
}
