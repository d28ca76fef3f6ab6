use {failure::Fail, kiln_core::DeviceError};

/// Error of descriptor manager operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum DescriptorError {
    /// Device failed to create or grow a descriptor heap.
    /// Manager can't be used anymore.
    #[fail(display = "Failed to create descriptor heap")]
    Device(#[cause] DeviceError),

    /// Layout group wasn't declared in `setup`.
    #[fail(display = "Layout group {} is not declared. Manager has {} groups", group, groups)]
    UnknownGroup {
        /// Requested group.
        group: usize,
        /// Number of declared groups.
        groups: usize,
    },

    /// Manager failed earlier and can't allocate anymore.
    #[fail(display = "Descriptor manager is poisoned by an earlier failure")]
    Poisoned,
}

impl From<DeviceError> for DescriptorError {
    fn from(error: DeviceError) -> Self {
        DescriptorError::Device(error)
    }
}
