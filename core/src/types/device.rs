/// Parameters for opening a device.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Name used in logs.
    pub name: String,

    /// Enable validation of API usage.
    pub validation: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            name: "kiln".to_owned(),
            validation: true,
        }
    }
}

/// Counters collected by a device since it was opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Statistics {
    /// Queue submissions, including empty ones.
    pub submissions: u64,
    /// Executed copy commands.
    pub copies: u64,
    /// Executed draw commands.
    pub draws: u64,
    /// Executed dispatch commands.
    pub dispatches: u64,
    /// Executed ray-tracing commands.
    pub traces: u64,
    /// Executed barriers.
    pub barriers: u64,
    /// Descriptor heaps created.
    pub descriptor_heaps: u64,
    /// Descriptor writes.
    pub descriptor_writes: u64,
    /// Heap to heap descriptor copies.
    pub descriptor_copies: u64,
    /// Invalid API usage detected by validation.
    pub validation_errors: u64,
}
