//! Backend modelling the resource-state API family.
//!
//! Host fences are counters signaled when the completed value reaches the
//! target value, binary semaphores are emulated with counters and timelines
//! are shared counter fences.
//! Buffers and textures carry a state bitmask validated by every transition.
//! Descriptors are written into CPU-only heaps and copied into
//! shader-visible heaps before binding.

mod command;
mod device;
mod queue;
mod state;
mod sync;

pub use self::{
    command::{BarrierResource, Command, CommandList, TextureCopySource, TransitionBarrier},
    device::Device,
    queue::CommandQueue,
    state::ResourceStates,
    sync::{Fence, Semaphore, SharedFence},
};

use {
    crate::host::memory::Resource,
    kiln_core::{BufferInfo, DeviceConfig, DeviceError, ImageInfo},
};

/// `E_INVALIDARG`, returned for calls rejected by validation.
pub(crate) const E_INVALIDARG: i64 = 0x8007_0057;

/// Buffer with its current state.
pub type Buffer = Resource<BufferInfo, ResourceStates>;

/// Texture with its current state.
pub type Image = Resource<ImageInfo, ResourceStates>;

/// Descriptor heap.
pub type DescriptorHeap = crate::host::heap::DescriptorHeap;

/// Resource-state backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {}

impl kiln_core::hal::Backend for Backend {
    const NAME: &'static str = "timeline";

    type Device = Device;
    type Queue = CommandQueue;
    type CommandBuffer = CommandList;
    type Fence = Fence;
    type Semaphore = Semaphore;
    type Timeline = SharedFence;
    type Buffer = Buffer;
    type Image = Image;
    type DescriptorHeap = DescriptorHeap;
    type Pipeline = crate::host::Pipeline;

    fn open(config: &DeviceConfig) -> Result<Device, DeviceError> {
        Device::new(config)
    }
}
