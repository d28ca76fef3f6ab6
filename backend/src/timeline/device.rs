use {
    super::{
        Backend, Buffer, CommandList, CommandQueue, DescriptorHeap, Fence, Image, ResourceStates,
        Semaphore, SharedFence,
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
        HeapVisibility, ImageInfo, MapError, QueueType, Statistics,
    },
    std::sync::Arc,
};

/// Device with a direct, a compute and a copy queue.
#[derive(Debug)]
pub struct Device {
    name: String,
    counters: Arc<Counters>,
    queues: Vec<CommandQueue>,
}

impl Device {
    pub(super) fn new(config: &DeviceConfig) -> Result<Self, DeviceError> {
        let counters = Arc::new(Counters::new(config.validation));
        let queues = QueueType::ALL
            .iter()
            .map(|&ty| CommandQueue::new(ty, counters.clone()))
            .collect::<Result<_, _>>()?;
        log::debug!("Timeline device {:?} created", config.name);
        Ok(Device {
            name: config.name.clone(),
            counters,
            queues,
        })
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        log::debug!("Timeline device {:?} released", self.name);
    }
}

impl hal::device::Device<Backend> for Device {
    fn queue(&self, ty: QueueType) -> &CommandQueue {
        &self.queues[ty.index()]
    }

    fn create_buffer(&self, info: BufferInfo) -> Result<Buffer, DeviceError> {
        Ok(Resource::new(info, info.size, ResourceStates::COMMON))
    }

    unsafe fn destroy_buffer(&self, buffer: Buffer) {
        log::trace!("ID3D12Resource::Release buffer {}", buffer.id);
    }

    fn create_image(&self, info: ImageInfo) -> Result<Image, DeviceError> {
        Ok(Resource::new(info, info.size(), ResourceStates::COMMON))
    }

    unsafe fn destroy_image(&self, image: Image) {
        log::trace!("ID3D12Resource::Release texture {}", image.id);
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
    ) -> Result<CommandList, DeviceError> {
        Ok(CommandList::new(queue, level, self.counters.clone()))
    }

    unsafe fn destroy_command_buffer(&self, list: CommandList) {
        if list.commands().is_pending() {
            self.counters.validation_error(format_args!(
                "ID3D12GraphicsCommandList::Release: command list {} is executing",
                list.commands().id()
            ));
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<Fence, DeviceError> {
        Ok(Fence::new(signaled))
    }

    unsafe fn reset_fence(&self, fence: &Fence) -> Result<(), DeviceError> {
        fence.reset();
        Ok(())
    }

    unsafe fn wait_for_fence(&self, fence: &Fence, timeout_ns: u64) -> Result<bool, DeviceError> {
        Ok(fence.completed.wait(fence.target(), timeout(timeout_ns)))
    }

    unsafe fn get_fence_status(&self, fence: &Fence) -> Result<bool, DeviceError> {
        Ok(fence.is_signaled())
    }

    unsafe fn destroy_fence(&self, _fence: Fence) {}

    fn create_semaphore(&self) -> Result<Semaphore, DeviceError> {
        Ok(Semaphore::new())
    }

    unsafe fn destroy_semaphore(&self, _semaphore: Semaphore) {}

    fn create_timeline(&self, initial: u64) -> Result<SharedFence, DeviceError> {
        Ok(SharedFence::new(initial))
    }

    fn timeline_value(&self, fence: &SharedFence) -> Result<u64, DeviceError> {
        Ok(fence.0.value())
    }

    fn wait_timeline(
        &self,
        fence: &SharedFence,
        value: u64,
        timeout_ns: u64,
    ) -> Result<bool, DeviceError> {
        Ok(fence.0.wait(value, timeout(timeout_ns)))
    }

    unsafe fn destroy_timeline(&self, _fence: SharedFence) {}

    fn create_descriptor_heap(&self, desc: DescriptorHeapDesc) -> Result<DescriptorHeap, DeviceError> {
        Counters::bump(&self.counters.descriptor_heaps);
        log::trace!("ID3D12Device::CreateDescriptorHeap {:?}", desc);
        Ok(DescriptorHeap::new(desc))
    }

    unsafe fn write_descriptor(
        &self,
        heap: &DescriptorHeap,
        slot: u32,
        descriptor: Descriptor<'_, Backend>,
    ) {
        Counters::bump(&self.counters.descriptor_writes);
        let record = DescriptorRecord::new(descriptor, &self.counters);
        if !heap.write(slot, record) {
            self.counters.validation_error(format_args!(
                "ID3D12Device::CreateView: slot {} is out of heap {} bounds",
                slot,
                heap.id()
            ));
        }
    }

    unsafe fn copy_descriptors(
        &self,
        src: &DescriptorHeap,
        dst: &DescriptorHeap,
        class: DescriptorClass,
        count: u32,
    ) {
        Counters::bump(&self.counters.descriptor_copies);
        if src.desc().visibility != HeapVisibility::HostOnly {
            self.counters.validation_error(format_args!(
                "ID3D12Device::CopyDescriptorsSimple: source heap {} is shader visible",
                src.id()
            ));
        }
        if !dst.copy_from(src, class, count) {
            self.counters.validation_error(format_args!(
                "ID3D12Device::CopyDescriptorsSimple: copy of {} {:?} descriptors from heap {} to heap {} is out of bounds",
                count,
                class,
                src.id(),
                dst.id()
            ));
        }
    }

    unsafe fn destroy_descriptor_heap(&self, heap: DescriptorHeap) {
        log::trace!("ID3D12DescriptorHeap::Release {}", heap.id());
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
