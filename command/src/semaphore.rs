use kiln_core::{
    device_owned,
    hal::{device::Device as _, queue::SyncPoint, Backend},
    Device, DeviceError, DeviceId,
};

/// Binary semaphore wrapper.
#[derive(Debug)]
pub struct Semaphore<B: Backend> {
    device: DeviceId,
    raw: B::Semaphore,
}

device_owned!(Semaphore<B>);

impl<B> Semaphore<B>
where
    B: Backend,
{
    /// Create new semaphore.
    pub fn new(device: &Device<B>) -> Result<Self, DeviceError> {
        let raw = device.create_semaphore()?;
        Ok(Semaphore {
            device: device.id(),
            raw,
        })
    }

    /// Get raw semaphore reference.
    pub fn raw(&self) -> &B::Semaphore {
        &self.raw
    }

    /// Sync point to wait for or to signal.
    pub fn sync_point(&self) -> SyncPoint<'_, B> {
        SyncPoint::Binary(&self.raw)
    }

    /// Destroy semaphore.
    ///
    /// # Safety
    ///
    /// Semaphore must not be used by pending submissions.
    pub unsafe fn dispose(self, device: &Device<B>) {
        self.assert_device_owner(device);
        device.destroy_semaphore(self.raw);
    }
}

/// Timeline wrapper.
#[derive(Debug)]
pub struct Timeline<B: Backend> {
    device: DeviceId,
    raw: B::Timeline,
}

device_owned!(Timeline<B>);

impl<B> Timeline<B>
where
    B: Backend,
{
    /// Create new timeline starting at `initial`.
    pub fn new(device: &Device<B>, initial: u64) -> Result<Self, DeviceError> {
        let raw = device.create_timeline(initial)?;
        Ok(Timeline {
            device: device.id(),
            raw,
        })
    }

    /// Get raw timeline reference.
    pub fn raw(&self) -> &B::Timeline {
        &self.raw
    }

    /// Sync point to wait for timeline to reach `value`.
    pub fn wait_point(&self, value: u64) -> SyncPoint<'_, B> {
        SyncPoint::Timeline(&self.raw, value)
    }

    /// Sync point to raise timeline to `value`.
    pub fn signal_point(&self, value: u64) -> SyncPoint<'_, B> {
        SyncPoint::Timeline(&self.raw, value)
    }

    /// Current value.
    pub fn value(&self, device: &Device<B>) -> Result<u64, DeviceError> {
        self.assert_device_owner(device);
        device.timeline_value(&self.raw)
    }

    /// Wait for timeline to reach `value`.
    /// Returns `false` on timeout.
    pub fn wait(&self, device: &Device<B>, value: u64, timeout_ns: u64) -> Result<bool, DeviceError> {
        self.assert_device_owner(device);
        device.wait_timeline(&self.raw, value, timeout_ns)
    }

    /// Destroy timeline.
    ///
    /// # Safety
    ///
    /// Timeline must not be used by pending submissions.
    pub unsafe fn dispose(self, device: &Device<B>) {
        self.assert_device_owner(device);
        device.destroy_timeline(self.raw);
    }
}
