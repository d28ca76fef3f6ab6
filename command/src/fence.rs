use kiln_core::{
    device_owned,
    hal::{device::Device as _, Backend},
    Device, DeviceError, DeviceId, QueueType,
};

/// Point in a queue's submission order at which a fence was submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FenceEpoch {
    /// Queue that signals fence.
    pub queue: QueueType,

    /// Number of fenced submissions to the queue before this one.
    pub epoch: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FenceState {
    /// Can be submitted.
    Idle,
    /// Signaled and must be reset before the next submission.
    Signaled,
    /// Attached to a submission that may still execute.
    InFlight,
}

/// Fence of a recorder slot.
///
/// Tracks whether the raw fence is attached to work that may still execute,
/// so waiting for an idle fence returns immediately and resetting or
/// destroying an in-flight one is caught before it reaches the backend.
#[derive(Debug)]
pub struct Fence<B: Backend> {
    device: DeviceId,
    raw: B::Fence,
    state: FenceState,
    last: Option<FenceEpoch>,
}

device_owned!(Fence<B>);

impl<B> Fence<B>
where
    B: Backend,
{
    /// Create new fence.
    pub fn new(device: &Device<B>, signaled: bool) -> Result<Self, DeviceError> {
        let raw = device.create_fence(signaled)?;
        Ok(Fence {
            device: device.id(),
            raw,
            state: if signaled {
                FenceState::Signaled
            } else {
                FenceState::Idle
            },
            last: None,
        })
    }

    /// Get raw fence reference.
    pub fn raw(&self) -> &B::Fence {
        &self.raw
    }

    /// Check if fence is attached to a submission not yet observed complete.
    pub fn is_submitted(&self) -> bool {
        self.state == FenceState::InFlight
    }

    /// Epoch of the most recent submission.
    pub fn epoch(&self) -> Option<FenceEpoch> {
        self.last
    }

    pub(crate) fn mark_submitted(&mut self, epoch: FenceEpoch) {
        debug_assert_eq!(self.state, FenceState::Idle, "Fence must be reset before submission");
        self.state = FenceState::InFlight;
        self.last = Some(epoch);
    }

    /// Bring fence back to submittable state.
    ///
    /// # Panics
    ///
    /// If the fence is in flight and the backend doesn't report it signaled.
    pub fn reset(&mut self, device: &Device<B>) -> Result<(), DeviceError> {
        self.assert_device_owner(device);
        if self.state == FenceState::InFlight {
            if !unsafe { device.get_fence_status(&self.raw) }? {
                panic!("Fence of {:?} is reset while in flight", self.last);
            }
            self.state = FenceState::Signaled;
        }

        if self.state == FenceState::Signaled {
            unsafe { device.reset_fence(&self.raw) }?;
            self.state = FenceState::Idle;
        }
        Ok(())
    }

    /// Wait for the submission the fence is attached to.
    /// Returns `false` if the timeout expired first.
    /// Fence that isn't in flight is complete right away.
    pub fn wait_signaled(&mut self, device: &Device<B>, timeout_ns: u64) -> Result<bool, DeviceError> {
        self.assert_device_owner(device);
        if self.state != FenceState::InFlight {
            return Ok(true);
        }

        if unsafe { device.wait_for_fence(&self.raw, timeout_ns) }? {
            self.state = FenceState::Signaled;
            log::trace!("Fence of {:?} signaled", self.last);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Destroy fence.
    ///
    /// # Panics
    ///
    /// If the fence is still in flight.
    pub fn dispose(self, device: &Device<B>) {
        self.assert_device_owner(device);
        assert_ne!(
            self.state,
            FenceState::InFlight,
            "In-flight fence must be waited upon before destroying"
        );
        unsafe { device.destroy_fence(self.raw) };
    }
}
