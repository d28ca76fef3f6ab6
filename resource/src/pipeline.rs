//! Pipeline wrapper.

use {
    crate::escape::{Escape, KeepAlive},
    kiln_core::{
        hal::{device::Device as _, Backend},
        BindPoint, Device, DeviceId,
    },
};

/// Pipeline state object created from an opaque description.
#[derive(Debug)]
pub struct Pipeline<B: Backend> {
    device: DeviceId,
    raw: Escape<B::Pipeline>,
    label: String,
    bind_point: BindPoint,
}

kiln_core::device_owned!(Pipeline<B>);

impl<B> Pipeline<B>
where
    B: Backend,
{
    pub(crate) fn new(
        device: DeviceId,
        raw: Escape<B::Pipeline>,
        label: String,
        bind_point: BindPoint,
    ) -> Self {
        Pipeline {
            device,
            raw,
            label,
            bind_point,
        }
    }

    /// Get reference to raw pipeline.
    pub fn raw(&self) -> &B::Pipeline {
        &self.raw
    }

    /// Pipeline label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Where the pipeline is bound.
    pub fn bind_point(&self) -> BindPoint {
        self.bind_point
    }

    /// Pipeline state cache blob that can be passed to future pipeline creation.
    pub fn cache_data(&self, device: &Device<B>) -> Vec<u8> {
        self.assert_device_owner(device);
        device.pipeline_cache_data(&self.raw)
    }

    /// Create token that keeps raw pipeline from destruction.
    pub fn keep_alive(&self) -> KeepAlive {
        self.raw.keep_alive()
    }
}
