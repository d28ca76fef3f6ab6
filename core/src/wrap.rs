//! Device wrapper that carries a unique id.
//! This allows checking if any other resource belongs to a specific
//! device. This is required to ensure we are making a safe call.

use {
    crate::hal::{device::Device as _, Backend},
    derive_more::{Deref, DerefMut},
};

#[cfg(not(feature = "no-slow-safety-checks"))]
fn new_device_id() -> DeviceId {
    static DEVICE_ID: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

    let id = DEVICE_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    DeviceId { id }
}

#[cfg(feature = "no-slow-safety-checks")]
fn new_device_id() -> DeviceId {
    DeviceId {}
}

/// Id of the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId {
    /// Unique id.
    #[cfg(not(feature = "no-slow-safety-checks"))]
    pub id: u32,
}

impl DeviceId {
    /// Create new device id.
    pub fn new() -> Self {
        new_device_id()
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw device wrapper with id.
#[derive(Deref, DerefMut)]
pub struct Device<B: Backend> {
    #[deref]
    #[deref_mut]
    device: B::Device,
    id: DeviceId,
}

impl<B> Device<B>
where
    B: Backend,
{
    /// Wrap device value.
    pub fn new(device: B::Device) -> Self {
        Device {
            id: new_device_id(),
            device,
        }
    }

    /// Wrap device value.
    pub fn from_raw(device: B::Device, id: DeviceId) -> Self {
        Device { id, device }
    }

    /// Open a device of backend `B`.
    pub fn open(config: &crate::DeviceConfig) -> Result<Self, crate::DeviceError> {
        log::debug!("Open {} device {:?}", B::NAME, config.name);
        let raw = B::open(config)?;
        Ok(Device::new(raw))
    }

    /// Get device id.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Get raw device.
    pub fn raw(&self) -> &B::Device {
        &self.device
    }

    /// Get counters collected by the backend.
    pub fn statistics(&self) -> crate::Statistics {
        self.device.statistics()
    }
}

impl<B> std::fmt::Debug for Device<B>
where
    B: Backend,
{
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "Device {{ backend: {}, id: {:?} }}", B::NAME, self.id)
    }
}
