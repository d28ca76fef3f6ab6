//! Buffer wrapper with state tracking.

use {
    crate::escape::{Escape, KeepAlive},
    kiln_core::{
        hal::Backend, BufferInfo, BufferUsage, DeviceId, ResourceState, SteadyStatePolicy,
    },
    std::ops::Range,
};

/// Generic buffer resource wrapper.
///
/// Raw buffer is sent to the `Resources` that created the wrapper
/// when the wrapper and all `KeepAlive` tokens are dropped.
///
/// # Parameters
///
/// `B` - backend.
#[derive(Debug)]
pub struct Buffer<B: Backend> {
    device: DeviceId,
    raw: Escape<B::Buffer>,
    info: BufferInfo,
    state: ResourceState,
}

kiln_core::device_owned!(Buffer<B>);

impl<B> Buffer<B>
where
    B: Backend,
{
    pub(crate) fn new(device: DeviceId, raw: Escape<B::Buffer>, info: BufferInfo) -> Self {
        Buffer {
            device,
            raw,
            info,
            state: ResourceState::Undefined,
        }
    }

    /// Get reference to raw buffer resource.
    pub fn raw(&self) -> &B::Buffer {
        &self.raw
    }

    /// Get buffer info.
    pub fn info(&self) -> &BufferInfo {
        &self.info
    }

    /// Get buffer size.
    pub fn size(&self) -> u64 {
        self.info.size
    }

    /// Get buffer usage.
    pub fn usage(&self) -> BufferUsage {
        self.info.usage
    }

    /// Current state of the buffer as of the last recorded command.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// State the buffer settles in according to `policy`.
    pub fn steady_state(&self, policy: SteadyStatePolicy) -> ResourceState {
        policy.buffer_state(self.info.usage)
    }

    /// Change state of the buffer.
    /// Returns states range for the barrier that must be recorded,
    /// or `None` if buffer is already in requested state.
    pub fn transition_to(&mut self, state: ResourceState) -> Option<Range<ResourceState>> {
        if self.state == state {
            None
        } else {
            let from = std::mem::replace(&mut self.state, state);
            log::trace!("Buffer {:?} transition {:?} -> {:?}", *self.raw, from, state);
            Some(from..state)
        }
    }

    /// Create token that keeps raw buffer from destruction.
    pub fn keep_alive(&self) -> KeepAlive {
        self.raw.keep_alive()
    }
}
