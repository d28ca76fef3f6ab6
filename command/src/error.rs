use {
    crate::recorder::RecordingState,
    failure::Fail,
    kiln_core::DeviceError,
    kiln_descriptor::DescriptorError,
    kiln_resource::CreationError,
};

/// Error of command recorder operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum RecorderError {
    /// Operation is not allowed in current state.
    #[fail(display = "`{}` is not allowed in {:?} state", operation, state)]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// State of the current slot.
        state: RecordingState,
    },

    /// Secondary recorders can only be executed by primary ones.
    #[fail(display = "Secondary recorder can't be submitted")]
    SecondarySubmit,

    /// Only secondary recorders can be nested.
    #[fail(display = "Only secondary recorders can be nested")]
    NotSecondary,

    /// Backend rejected a call or failed to create an object.
    #[fail(display = "{}", _0)]
    Device(#[cause] DeviceError),

    /// Descriptor storage is unavailable.
    #[fail(display = "{}", _0)]
    Descriptor(#[cause] DescriptorError),
}

impl From<DeviceError> for RecorderError {
    fn from(error: DeviceError) -> Self {
        RecorderError::Device(error)
    }
}

impl From<DescriptorError> for RecorderError {
    fn from(error: DescriptorError) -> Self {
        RecorderError::Descriptor(error)
    }
}

/// Error of command submitter and swapchain operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum SubmitError {
    /// One of the recorders can't be submitted.
    #[fail(display = "Recorder {} of batch {} can't be submitted: {}", recorder, batch, error)]
    Recorder {
        /// Batch index.
        batch: usize,
        /// Recorder index in the batch.
        recorder: usize,
        /// Recorder error.
        #[cause]
        error: RecorderError,
    },

    /// Backend rejected a call or failed to create an object.
    #[fail(display = "{}", _0)]
    Device(#[cause] DeviceError),

    /// Failed to create swapchain images.
    #[fail(display = "{}", _0)]
    Creation(#[cause] CreationError),
}

impl From<DeviceError> for SubmitError {
    fn from(error: DeviceError) -> Self {
        SubmitError::Device(error)
    }
}

impl From<CreationError> for SubmitError {
    fn from(error: CreationError) -> Self {
        SubmitError::Creation(error)
    }
}
