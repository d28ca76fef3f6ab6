use {
    crate::config::Config,
    kiln_command::{
        CommandRecorder, CommandSubmitter, HeadlessSwapchain, Queues, RecorderConfig,
        RecorderError, SubmitError,
    },
    kiln_core::{
        hal::{device::Device as _, Backend, PipelineDesc},
        BufferInfo, BufferKind, Device, DeviceError, ImageInfo, MapError, Statistics,
    },
    kiln_descriptor::{DescriptorError, DescriptorManager, DescriptorSetLayout},
    kiln_resource::{Buffer, CreationError, Image, Pipeline, Resources},
    std::{mem::ManuallyDrop, sync::Arc},
    thread_profiler::profile_scope,
};

/// Device with its queues and resource hub.
/// Creates recorders, submitters, descriptor managers and resources.
#[derive(Debug)]
pub struct Context<B: Backend> {
    config: Config,
    queues: Arc<Queues<B>>,
    resources: ManuallyDrop<Resources<B>>,
}

#[allow(unused)]
fn context_is_send_sync<B: Backend>() {
    fn is_send_sync<T: Send + Sync>() {}
    is_send_sync::<Context<B>>();
}

impl<B> Context<B>
where
    B: Backend,
{
    /// Open device and create context for it.
    pub fn new(config: Config) -> Result<Self, DeviceError> {
        let device = Device::<B>::open(&config.device)?;
        log::debug!(
            "Context for {} device {:?} created",
            B::NAME,
            config.device.name
        );
        Ok(Self::from_device(device, config))
    }

    /// Create context for opened device.
    pub fn from_device(device: Device<B>, config: Config) -> Self {
        let resources = Resources::new(&device);
        Context {
            config,
            queues: Arc::new(Queues::new(Arc::new(device))),
            resources: ManuallyDrop::new(resources),
        }
    }

    /// Configuration the context was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get device.
    pub fn device(&self) -> &Device<B> {
        self.queues.device()
    }

    /// Get device queues.
    pub fn queues(&self) -> &Arc<Queues<B>> {
        &self.queues
    }

    /// Device counters.
    pub fn statistics(&self) -> Statistics {
        self.device().statistics()
    }

    /// Create recorder with parameters from the config.
    pub fn create_recorder(&self) -> Result<CommandRecorder<B>, RecorderError> {
        CommandRecorder::new(&self.queues, self.config.recorder)
    }

    /// Create recorder with explicit parameters.
    pub fn create_recorder_with(
        &self,
        config: RecorderConfig,
    ) -> Result<CommandRecorder<B>, RecorderError> {
        CommandRecorder::new(&self.queues, config)
    }

    /// Create submitter.
    pub fn create_submitter(&self) -> CommandSubmitter<B> {
        CommandSubmitter::new(&self.queues)
    }

    /// Create descriptor manager for layout groups.
    pub fn create_descriptor_manager(
        &self,
        layouts: Vec<DescriptorSetLayout>,
    ) -> Result<DescriptorManager<B>, DescriptorError> {
        DescriptorManager::setup(self.device(), layouts)
    }

    /// Destroy descriptor manager.
    ///
    /// # Safety
    ///
    /// Commands that bound sets of the manager must be complete.
    pub unsafe fn destroy_descriptor_manager(&self, manager: DescriptorManager<B>) {
        manager.dispose(self.device());
    }

    /// Create buffer.
    pub fn create_buffer(&self, info: BufferInfo) -> Result<Buffer<B>, CreationError> {
        self.resources.create_buffer(self.device(), info)
    }

    /// Create buffer with usage of the specified kind.
    pub fn create_buffer_of_kind(
        &self,
        kind: BufferKind,
        size: u64,
    ) -> Result<Buffer<B>, CreationError> {
        self.create_buffer(BufferInfo {
            size,
            usage: kind.usage(),
        })
    }

    /// Create image.
    pub fn create_image(&self, info: ImageInfo) -> Result<Image<B>, CreationError> {
        self.resources.create_image(self.device(), info)
    }

    /// Create pipeline.
    pub fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Pipeline<B>, CreationError> {
        self.resources.create_pipeline(self.device(), desc)
    }

    /// Create off-screen swapchain.
    pub fn create_swapchain(
        &self,
        info: ImageInfo,
        count: usize,
    ) -> Result<HeadlessSwapchain<B>, SubmitError> {
        HeadlessSwapchain::new(&self.queues, &self.resources, info, count)
    }

    /// Write bytes into buffer memory from host.
    pub fn write_buffer(&self, buffer: &Buffer<B>, offset: u64, data: &[u8]) -> Result<(), MapError> {
        self.device().write_buffer(buffer.raw(), offset, data)
    }

    /// Read buffer memory into host memory.
    pub fn read_buffer(
        &self,
        buffer: &Buffer<B>,
        offset: u64,
        data: &mut [u8],
    ) -> Result<(), MapError> {
        self.device().read_buffer(buffer.raw(), offset, data)
    }

    /// Read image content into host memory.
    pub fn read_image(&self, image: &Image<B>, data: &mut [u8]) -> Result<(), MapError> {
        self.device().read_image(image.raw(), data)
    }

    /// Wait for whole device become idle.
    pub fn wait_idle(&self) -> Result<(), DeviceError> {
        profile_scope!("wait_idle");
        log::debug!("Wait device idle");
        self.queues.wait_idle()
    }

    /// Destroy raw objects of dropped resources.
    /// Returns number of destroyed objects.
    pub fn cleanup(&mut self) -> usize {
        self.resources.cleanup(self.queues.device())
    }
}

impl<B> Drop for Context<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        log::debug!("Dropping context");
        if let Err(err) = self.wait_idle() {
            log::error!("Failed to wait device idle: {}", err);
        }
        unsafe {
            ManuallyDrop::take(&mut self.resources).dispose(self.queues.device());
        }
        log::trace!("Context dropped");
    }
}
