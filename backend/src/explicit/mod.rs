//! Backend modelling the explicit-barrier API family.
//!
//! Fences and semaphores are binary, timelines are timeline semaphores.
//! Images carry a layout validated by every barrier and transfer.
//! Buffers carry no state, their barriers only order memory access.
//! Descriptor pools are host writable and bindable at the same time.

mod command;
mod device;
mod layout;
mod queue;
mod sync;

pub use self::{
    command::{BufferMemoryBarrier, Command, CommandBuffer, ImageMemoryBarrier},
    device::Device,
    layout::{AccessFlags, ImageLayout},
    queue::Queue,
    sync::{Fence, Semaphore, TimelineSemaphore},
};

use {
    crate::host::memory::Resource,
    kiln_core::{BufferInfo, DeviceConfig, DeviceError, ImageInfo},
};

/// Native code of a call rejected by validation.
pub(crate) const VK_ERROR_VALIDATION_FAILED: i64 = -1_000_011_001;

/// Buffer. Buffers have no layout.
pub type Buffer = Resource<BufferInfo, ()>;

/// Image with its current layout.
pub type Image = Resource<ImageInfo, ImageLayout>;

/// Descriptor pool.
pub type DescriptorPool = crate::host::heap::DescriptorHeap;

/// Explicit-barrier backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {}

impl kiln_core::hal::Backend for Backend {
    const NAME: &'static str = "explicit";

    type Device = Device;
    type Queue = Queue;
    type CommandBuffer = CommandBuffer;
    type Fence = Fence;
    type Semaphore = Semaphore;
    type Timeline = TimelineSemaphore;
    type Buffer = Buffer;
    type Image = Image;
    type DescriptorHeap = DescriptorPool;
    type Pipeline = crate::host::Pipeline;

    fn open(config: &DeviceConfig) -> Result<Device, DeviceError> {
        Device::new(config)
    }
}
