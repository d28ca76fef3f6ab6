use {kiln_command::RecorderConfig, kiln_core::DeviceConfig};

/// Configuration of a [`Context`](crate::Context).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Config {
    /// Device parameters.
    pub device: DeviceConfig,

    /// Parameters of recorders created without explicit ones.
    pub recorder: RecorderConfig,
}

impl Config {
    /// Set device name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.device.name = name.into();
        self
    }

    /// Enable or disable validation.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.device.validation = validation;
        self
    }

    /// Set default recorder parameters.
    pub fn with_recorder(mut self, recorder: RecorderConfig) -> Self {
        self.recorder = recorder;
        self
    }
}

#[cfg(test)]
mod tests {
    use {super::*, kiln_command::RecorderUsage, kiln_core::SteadyStatePolicy};

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.device.validation);
        assert_eq!(config.recorder.usage, RecorderUsage::Graphics);
        assert_eq!(config.recorder.buffer_count, 1);
        assert_eq!(config.recorder.steady_state, SteadyStatePolicy::General);
    }

    #[test]
    fn builders_replace_fields() {
        let config = Config::default()
            .with_name("offscreen")
            .with_validation(false)
            .with_recorder(RecorderConfig {
                usage: RecorderUsage::Compute,
                buffer_count: 3,
                steady_state: SteadyStatePolicy::ByUsage,
            });
        assert_eq!(config.device.name, "offscreen");
        assert!(!config.device.validation);
        assert_eq!(config.recorder.buffer_count, 3);
    }
}
