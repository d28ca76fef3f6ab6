use {
    super::{
        Backend, Buffer, CommandBuffer, DescriptorPool, Fence, Image, ImageLayout, Queue,
        Semaphore, TimelineSemaphore,
    },
    crate::host::{
        counters::Counters,
        heap::DescriptorRecord,
        memory::Resource,
        signal::timeout,
        Pipeline,
    },
    kiln_core::{
        hal::{self, Descriptor, PipelineDesc},
        BufferInfo, CommandLevel, DescriptorClass, DescriptorHeapDesc, DeviceConfig, DeviceError,
        ImageInfo, MapError, QueueType, Statistics,
    },
    std::sync::Arc,
};

/// Logical device with one queue of each type.
#[derive(Debug)]
pub struct Device {
    name: String,
    counters: Arc<Counters>,
    queues: Vec<Queue>,
}

impl Device {
    pub(super) fn new(config: &DeviceConfig) -> Result<Self, DeviceError> {
        let counters = Arc::new(Counters::new(config.validation));
        let queues = QueueType::ALL
            .iter()
            .map(|&ty| Queue::new(ty, counters.clone()))
            .collect::<Result<_, _>>()?;
        log::debug!("Explicit device {:?} opened", config.name);
        Ok(Device {
            name: config.name.clone(),
            counters,
            queues,
        })
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        log::debug!("Explicit device {:?} closed", self.name);
    }
}

impl hal::device::Device<Backend> for Device {
    fn queue(&self, ty: QueueType) -> &Queue {
        &self.queues[ty.index()]
    }

    fn create_buffer(&self, info: BufferInfo) -> Result<Buffer, DeviceError> {
        Ok(Resource::new(info, info.size, ()))
    }

    unsafe fn destroy_buffer(&self, buffer: Buffer) {
        log::trace!("vkDestroyBuffer {}", buffer.id);
    }

    fn create_image(&self, info: ImageInfo) -> Result<Image, DeviceError> {
        Ok(Resource::new(info, info.size(), ImageLayout::Undefined))
    }

    unsafe fn destroy_image(&self, image: Image) {
        log::trace!("vkDestroyImage {}", image.id);
    }

    fn write_buffer(&self, buffer: &Buffer, offset: u64, data: &[u8]) -> Result<(), MapError> {
        buffer.memory.write(offset, data)
    }

    fn read_buffer(&self, buffer: &Buffer, offset: u64, data: &mut [u8]) -> Result<(), MapError> {
        buffer.memory.read(offset, data)
    }

    fn read_image(&self, image: &Image, data: &mut [u8]) -> Result<(), MapError> {
        image.memory.read(0, data)
    }

    fn create_command_buffer(
        &self,
        queue: QueueType,
        level: CommandLevel,
    ) -> Result<CommandBuffer, DeviceError> {
        Ok(CommandBuffer::new(queue, level, self.counters.clone()))
    }

    unsafe fn destroy_command_buffer(&self, buffer: CommandBuffer) {
        if buffer.commands().is_pending() {
            self.counters.validation_error(format_args!(
                "vkFreeCommandBuffers: command buffer {} is pending",
                buffer.commands().id()
            ));
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<Fence, DeviceError> {
        Ok(Fence::new(signaled))
    }

    unsafe fn reset_fence(&self, fence: &Fence) -> Result<(), DeviceError> {
        fence.0.set(0);
        Ok(())
    }

    unsafe fn wait_for_fence(&self, fence: &Fence, timeout_ns: u64) -> Result<bool, DeviceError> {
        Ok(fence.0.wait(1, timeout(timeout_ns)))
    }

    unsafe fn get_fence_status(&self, fence: &Fence) -> Result<bool, DeviceError> {
        Ok(fence.is_signaled())
    }

    unsafe fn destroy_fence(&self, _fence: Fence) {}

    fn create_semaphore(&self) -> Result<Semaphore, DeviceError> {
        Ok(Semaphore::new())
    }

    unsafe fn destroy_semaphore(&self, _semaphore: Semaphore) {}

    fn create_timeline(&self, initial: u64) -> Result<TimelineSemaphore, DeviceError> {
        Ok(TimelineSemaphore::new(initial))
    }

    fn timeline_value(&self, timeline: &TimelineSemaphore) -> Result<u64, DeviceError> {
        Ok(timeline.0.value())
    }

    fn wait_timeline(
        &self,
        timeline: &TimelineSemaphore,
        value: u64,
        timeout_ns: u64,
    ) -> Result<bool, DeviceError> {
        Ok(timeline.0.wait(value, timeout(timeout_ns)))
    }

    unsafe fn destroy_timeline(&self, _timeline: TimelineSemaphore) {}

    fn create_descriptor_heap(&self, desc: DescriptorHeapDesc) -> Result<DescriptorPool, DeviceError> {
        Counters::bump(&self.counters.descriptor_heaps);
        log::trace!("vkCreateDescriptorPool {:?}", desc);
        Ok(DescriptorPool::new(desc))
    }

    unsafe fn write_descriptor(
        &self,
        pool: &DescriptorPool,
        slot: u32,
        descriptor: Descriptor<'_, Backend>,
    ) {
        Counters::bump(&self.counters.descriptor_writes);
        let record = DescriptorRecord::new(descriptor, &self.counters);
        if !pool.write(slot, record) {
            self.counters.validation_error(format_args!(
                "vkUpdateDescriptorSets: slot {} is out of pool {} bounds",
                slot,
                pool.id()
            ));
        }
    }

    unsafe fn copy_descriptors(
        &self,
        src: &DescriptorPool,
        dst: &DescriptorPool,
        class: DescriptorClass,
        count: u32,
    ) {
        Counters::bump(&self.counters.descriptor_copies);
        if !dst.copy_from(src, class, count) {
            self.counters.validation_error(format_args!(
                "vkUpdateDescriptorSets: copy of {} {:?} descriptors from pool {} to pool {} is out of bounds",
                count,
                class,
                src.id(),
                dst.id()
            ));
        }
    }

    unsafe fn destroy_descriptor_heap(&self, pool: DescriptorPool) {
        log::trace!("vkDestroyDescriptorPool {}", pool.id());
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Pipeline, DeviceError> {
        Ok(Pipeline::new(<Backend as hal::Backend>::NAME, desc))
    }

    fn pipeline_cache_data(&self, pipeline: &Pipeline) -> Vec<u8> {
        pipeline.cache().to_vec()
    }

    unsafe fn destroy_pipeline(&self, _pipeline: Pipeline) {}

    fn wait_idle(&self) -> Result<(), DeviceError> {
        for queue in &self.queues {
            hal::queue::Queue::wait_idle(queue)?;
        }
        Ok(())
    }

    fn statistics(&self) -> Statistics {
        self.counters.snapshot()
    }
}

