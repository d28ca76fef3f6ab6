//! Logical device trait.

use {
    super::{Backend, Descriptor, PipelineDesc},
    crate::{
        BufferInfo, CommandLevel, DescriptorClass, DescriptorHeapDesc, DeviceError, ImageInfo,
        MapError, QueueType, Statistics,
    },
    std::fmt::Debug,
};

/// Logical device. Creates and destroys every other raw object
/// and owns one queue of each `QueueType`.
pub trait Device<B: Backend>: Debug + Send + Sync {
    /// Get queue of specified type.
    fn queue(&self, ty: QueueType) -> &B::Queue;

    /// Create buffer with zeroed content.
    fn create_buffer(&self, info: BufferInfo) -> Result<B::Buffer, DeviceError>;

    /// Destroy buffer.
    ///
    /// # Safety
    ///
    /// Buffer must not be used by pending commands.
    unsafe fn destroy_buffer(&self, buffer: B::Buffer);

    /// Create image with zeroed content.
    fn create_image(&self, info: ImageInfo) -> Result<B::Image, DeviceError>;

    /// Destroy image.
    ///
    /// # Safety
    ///
    /// Image must not be used by pending commands.
    unsafe fn destroy_image(&self, image: B::Image);

    /// Write bytes into buffer memory from host.
    fn write_buffer(&self, buffer: &B::Buffer, offset: u64, data: &[u8]) -> Result<(), MapError>;

    /// Read bytes of buffer memory into host memory.
    fn read_buffer(&self, buffer: &B::Buffer, offset: u64, data: &mut [u8])
        -> Result<(), MapError>;

    /// Read tightly packed image content into host memory.
    fn read_image(&self, image: &B::Image, data: &mut [u8]) -> Result<(), MapError>;

    /// Allocate command buffer for specified queue.
    fn create_command_buffer(
        &self,
        queue: QueueType,
        level: CommandLevel,
    ) -> Result<B::CommandBuffer, DeviceError>;

    /// Free command buffer.
    ///
    /// # Safety
    ///
    /// Command buffer must not be pending.
    unsafe fn destroy_command_buffer(&self, buffer: B::CommandBuffer);

    /// Create fence.
    fn create_fence(&self, signaled: bool) -> Result<B::Fence, DeviceError>;

    /// Reset fence to unsignaled state.
    ///
    /// # Safety
    ///
    /// Fence must not be used in pending submission.
    unsafe fn reset_fence(&self, fence: &B::Fence) -> Result<(), DeviceError>;

    /// Wait for fence to become signaled.
    /// Returns `false` if timeout expired first.
    ///
    /// # Safety
    ///
    /// Fence must be created by this device.
    unsafe fn wait_for_fence(&self, fence: &B::Fence, timeout_ns: u64)
        -> Result<bool, DeviceError>;

    /// Check if fence is signaled.
    ///
    /// # Safety
    ///
    /// Fence must be created by this device.
    unsafe fn get_fence_status(&self, fence: &B::Fence) -> Result<bool, DeviceError>;

    /// Destroy fence.
    ///
    /// # Safety
    ///
    /// Fence must not be used in pending submission.
    unsafe fn destroy_fence(&self, fence: B::Fence);

    /// Create binary semaphore.
    fn create_semaphore(&self) -> Result<B::Semaphore, DeviceError>;

    /// Destroy semaphore.
    ///
    /// # Safety
    ///
    /// Semaphore must not be used in pending submission.
    unsafe fn destroy_semaphore(&self, semaphore: B::Semaphore);

    /// Create timeline with initial value.
    fn create_timeline(&self, initial: u64) -> Result<B::Timeline, DeviceError>;

    /// Get current timeline value.
    fn timeline_value(&self, timeline: &B::Timeline) -> Result<u64, DeviceError>;

    /// Wait for timeline to reach `value`.
    /// Returns `false` if timeout expired first.
    fn wait_timeline(
        &self,
        timeline: &B::Timeline,
        value: u64,
        timeout_ns: u64,
    ) -> Result<bool, DeviceError>;

    /// Destroy timeline.
    ///
    /// # Safety
    ///
    /// Timeline must not be used in pending submission.
    unsafe fn destroy_timeline(&self, timeline: B::Timeline);

    /// Create descriptor heap.
    fn create_descriptor_heap(
        &self,
        desc: DescriptorHeapDesc,
    ) -> Result<B::DescriptorHeap, DeviceError>;

    /// Write descriptor into heap slot of the descriptor's class.
    ///
    /// # Safety
    ///
    /// Slot must not be used by pending commands.
    unsafe fn write_descriptor(&self, heap: &B::DescriptorHeap, slot: u32, descriptor: Descriptor<'_, B>);

    /// Copy first `count` slots of specified class from one heap to another.
    ///
    /// # Safety
    ///
    /// Destination slots must not be used by pending commands.
    unsafe fn copy_descriptors(
        &self,
        src: &B::DescriptorHeap,
        dst: &B::DescriptorHeap,
        class: DescriptorClass,
        count: u32,
    );

    /// Destroy descriptor heap.
    ///
    /// # Safety
    ///
    /// Heap must not be used by pending commands.
    unsafe fn destroy_descriptor_heap(&self, heap: B::DescriptorHeap);

    /// Create pipeline.
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<B::Pipeline, DeviceError>;

    /// Get pipeline state cache blob.
    fn pipeline_cache_data(&self, pipeline: &B::Pipeline) -> Vec<u8>;

    /// Destroy pipeline.
    ///
    /// # Safety
    ///
    /// Pipeline must not be used by pending commands.
    unsafe fn destroy_pipeline(&self, pipeline: B::Pipeline);

    /// Wait for all queues to become idle.
    fn wait_idle(&self) -> Result<(), DeviceError>;

    /// Get counters collected so far.
    fn statistics(&self) -> Statistics;
}
