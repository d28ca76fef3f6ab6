use {failure::Fail, kiln_core::DeviceError};

/// Resource creation error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum CreationError {
    /// Zero sized buffer or image was requested.
    #[fail(display = "Zero sized resource")]
    ZeroSize,

    /// Backend failed to create the resource.
    #[fail(display = "Failed to create resource: {}", _0)]
    Create(#[cause] DeviceError),
}

impl From<DeviceError> for CreationError {
    fn from(error: DeviceError) -> Self {
        CreationError::Create(error)
    }
}
