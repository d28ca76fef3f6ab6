use failure::Fail;

/// Typical device error - out of available memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum OutOfMemory {
    /// Host memory exhausted.
    #[fail(display = "Out of host memory")]
    Host,

    /// Device memory exhausted.
    #[fail(display = "Out of device memory")]
    Device,
}

/// Device was lost. Nothing submitted to it will ever complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
#[fail(display = "Device lost")]
pub struct DeviceLost;

/// Host access to a resource failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum MapError {
    /// Attempt to access memory out of bounds.
    #[fail(display = "Range {}..{} is out of bounds of {} bytes", start, end, size)]
    OutOfBounds {
        /// Start of the requested range.
        start: u64,
        /// End of the requested range.
        end: u64,
        /// Size of the resource.
        size: u64,
    },

    /// Resource memory can't be accessed from host.
    #[fail(display = "Resource memory is not host visible")]
    HostInvisible,
}

/// Error reported by a backend call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum DeviceError {
    /// Out of either host or device memory.
    #[fail(display = "{}", _0)]
    OutOfMemory(#[cause] OutOfMemory),

    /// Device was lost.
    #[fail(display = "{}", _0)]
    DeviceLost(#[cause] DeviceLost),

    /// Driver rejected the call.
    /// `code` is the diagnostic code reported by the native API.
    #[fail(display = "`{}` rejected with code {}", call, code)]
    Rejected {
        /// Native call that failed.
        call: &'static str,
        /// Native diagnostic code.
        code: i64,
    },
}

impl DeviceError {
    /// Create `Rejected` error and log it.
    pub fn rejected(call: &'static str, code: i64) -> Self {
        log::error!("`{}` rejected with code {}", call, code);
        DeviceError::Rejected { call, code }
    }
}

impl From<OutOfMemory> for DeviceError {
    fn from(error: OutOfMemory) -> Self {
        DeviceError::OutOfMemory(error)
    }
}

impl From<DeviceLost> for DeviceError {
    fn from(error: DeviceLost) -> Self {
        DeviceError::DeviceLost(error)
    }
}
