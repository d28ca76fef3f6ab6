use {
    crate::{
        buffer::Buffer, error::CreationError, escape::Terminal, image::Image, pipeline::Pipeline,
    },
    kiln_core::{
        hal::{device::Device as _, Backend, PipelineDesc},
        BufferInfo, Device, DeviceId, ImageInfo,
    },
};

/// Resource hub.
/// Creates resources and destroys raw objects of dropped wrappers.
///
/// Raw objects arrive here only after the wrapper and every `KeepAlive` token
/// are dropped, so `cleanup` never destroys an object referenced by commands
/// that hold tokens until their completion.
#[derive(Debug)]
pub struct Resources<B: Backend> {
    device: DeviceId,
    buffers: Terminal<B::Buffer>,
    images: Terminal<B::Image>,
    pipelines: Terminal<B::Pipeline>,
}

kiln_core::device_owned!(Resources<B>);

impl<B> Resources<B>
where
    B: Backend,
{
    /// Create new resource hub for the device.
    pub fn new(device: &Device<B>) -> Self {
        Resources {
            device: device.id(),
            buffers: Terminal::new(),
            images: Terminal::new(),
            pipelines: Terminal::new(),
        }
    }

    /// Create buffer with zeroed content.
    pub fn create_buffer(
        &self,
        device: &Device<B>,
        info: BufferInfo,
    ) -> Result<Buffer<B>, CreationError> {
        self.assert_device_owner(device);
        if info.size == 0 {
            log::error!("Attempt to create zero sized buffer");
            return Err(CreationError::ZeroSize);
        }

        let raw = device.create_buffer(info)?;
        log::trace!("Buffer {:?} created: {:?}", raw, info);
        Ok(Buffer::new(device.id(), self.buffers.escape(raw), info))
    }

    /// Create image with zeroed content.
    pub fn create_image(
        &self,
        device: &Device<B>,
        info: ImageInfo,
    ) -> Result<Image<B>, CreationError> {
        self.assert_device_owner(device);
        if info.extent.area() == 0 {
            log::error!("Attempt to create zero sized image");
            return Err(CreationError::ZeroSize);
        }

        let raw = device.create_image(info)?;
        log::trace!("Image {:?} created: {:?}", raw, info);
        Ok(Image::new(device.id(), self.images.escape(raw), info))
    }

    /// Create pipeline.
    pub fn create_pipeline(
        &self,
        device: &Device<B>,
        desc: &PipelineDesc,
    ) -> Result<Pipeline<B>, CreationError> {
        self.assert_device_owner(device);
        let raw = device.create_pipeline(desc)?;
        log::trace!("Pipeline {:?} created", desc.label);
        Ok(Pipeline::new(
            device.id(),
            self.pipelines.escape(raw),
            desc.label.clone(),
            desc.bind_point,
        ))
    }

    /// Destroy raw objects of dropped resources.
    /// Returns number of destroyed objects.
    pub fn cleanup(&mut self, device: &Device<B>) -> usize {
        self.assert_device_owner(device);
        let mut count = 0;
        unsafe {
            // Raw objects are received only when nothing references them anymore.
            for buffer in self.buffers.drain() {
                device.destroy_buffer(buffer);
                count += 1;
            }
            for image in self.images.drain() {
                device.destroy_image(image);
                count += 1;
            }
            for pipeline in self.pipelines.drain() {
                device.destroy_pipeline(pipeline);
                count += 1;
            }
        }
        if count > 0 {
            log::debug!("Destroyed {} dropped resources", count);
        }
        count
    }

    /// Destroy raw objects of dropped resources and the hub itself.
    pub fn dispose(mut self, device: &Device<B>) {
        self.cleanup(device);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        kiln_backend::explicit::Backend as Explicit,
        kiln_core::{BufferUsage, DeviceConfig, ResourceState},
    };

    fn device() -> Device<Explicit> {
        Device::open(&DeviceConfig::default()).unwrap()
    }

    #[test]
    fn dropped_buffer_waits_for_keep_alive() {
        let device = device();
        let mut resources = Resources::new(&device);
        let buffer = resources
            .create_buffer(
                &device,
                BufferInfo {
                    size: 64,
                    usage: BufferUsage::TRANSFER_SRC,
                },
            )
            .unwrap();

        let kp = buffer.keep_alive();
        drop(buffer);
        assert_eq!(resources.cleanup(&device), 0);
        drop(kp);
        assert_eq!(resources.cleanup(&device), 1);
    }

    #[test]
    fn transition_reports_barrier_once() {
        let device = device();
        let resources = Resources::new(&device);
        let mut buffer = resources
            .create_buffer(
                &device,
                BufferInfo {
                    size: 16,
                    usage: BufferUsage::TRANSFER_DST,
                },
            )
            .unwrap();

        assert_eq!(buffer.state(), ResourceState::Undefined);
        assert_eq!(
            buffer.transition_to(ResourceState::TransferDst),
            Some(ResourceState::Undefined..ResourceState::TransferDst)
        );
        assert_eq!(buffer.transition_to(ResourceState::TransferDst), None);
        drop(buffer);
        resources.dispose(&device);
    }

    #[test]
    fn zero_sized_buffer_is_rejected() {
        let device = device();
        let resources = Resources::new(&device);
        let result = resources.create_buffer(
            &device,
            BufferInfo {
                size: 0,
                usage: BufferUsage::VERTEX,
            },
        );
        assert_eq!(result.err(), Some(CreationError::ZeroSize));
    }
}
