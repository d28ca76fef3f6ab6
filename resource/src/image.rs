//! Image wrapper with state tracking.

use {
    crate::escape::{Escape, KeepAlive},
    kiln_core::{
        hal::Backend, DeviceId, Extent, Format, ImageInfo, ImageUsage, ResourceState,
        SteadyStatePolicy,
    },
    std::ops::Range,
};

/// Generic image resource wrapper.
///
/// # Parameters
///
/// `B` - backend.
#[derive(Debug)]
pub struct Image<B: Backend> {
    device: DeviceId,
    raw: Escape<B::Image>,
    info: ImageInfo,
    state: ResourceState,
}

kiln_core::device_owned!(Image<B>);

impl<B> Image<B>
where
    B: Backend,
{
    pub(crate) fn new(device: DeviceId, raw: Escape<B::Image>, info: ImageInfo) -> Self {
        Image {
            device,
            raw,
            info,
            state: ResourceState::Undefined,
        }
    }

    /// Get reference to raw image resource.
    pub fn raw(&self) -> &B::Image {
        &self.raw
    }

    /// Get image info.
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Get image extent.
    pub fn extent(&self) -> Extent {
        self.info.extent
    }

    /// Get image format.
    pub fn format(&self) -> Format {
        self.info.format
    }

    /// Get image usage.
    pub fn usage(&self) -> ImageUsage {
        self.info.usage
    }

    /// Current state of the image as of the last recorded command.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// State the image settles in according to `policy`.
    pub fn steady_state(&self, policy: SteadyStatePolicy) -> ResourceState {
        policy.image_state(self.info.usage)
    }

    /// Change state of the image.
    /// Returns states range for the barrier that must be recorded,
    /// or `None` if image is already in requested state.
    pub fn transition_to(&mut self, state: ResourceState) -> Option<Range<ResourceState>> {
        if self.state == state {
            None
        } else {
            let from = std::mem::replace(&mut self.state, state);
            log::trace!("Image {:?} transition {:?} -> {:?}", *self.raw, from, state);
            Some(from..state)
        }
    }

    /// Create token that keeps raw image from destruction.
    pub fn keep_alive(&self) -> KeepAlive {
        self.raw.keep_alive()
    }
}
