use {
    kiln_core::Statistics,
    std::sync::atomic::{AtomicU64, Ordering},
};

/// Device-wide counters and the emulated validation layer.
#[derive(Debug, Default)]
pub struct Counters {
    validation: bool,
    pub submissions: AtomicU64,
    pub copies: AtomicU64,
    pub draws: AtomicU64,
    pub dispatches: AtomicU64,
    pub traces: AtomicU64,
    pub barriers: AtomicU64,
    pub descriptor_heaps: AtomicU64,
    pub descriptor_writes: AtomicU64,
    pub descriptor_copies: AtomicU64,
    validation_errors: AtomicU64,
}

impl Counters {
    pub fn new(validation: bool) -> Self {
        Counters {
            validation,
            ..Counters::default()
        }
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Report invalid API usage.
    pub fn validation_error(&self, message: std::fmt::Arguments<'_>) {
        if self.validation {
            log::error!("Validation: {}", message);
            self.validation_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> Statistics {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        Statistics {
            submissions: load(&self.submissions),
            copies: load(&self.copies),
            draws: load(&self.draws),
            dispatches: load(&self.dispatches),
            traces: load(&self.traces),
            barriers: load(&self.barriers),
            descriptor_heaps: load(&self.descriptor_heaps),
            descriptor_writes: load(&self.descriptor_writes),
            descriptor_copies: load(&self.descriptor_copies),
            validation_errors: load(&self.validation_errors),
        }
    }
}
