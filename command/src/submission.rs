use {
    crate::semaphore::{Semaphore, Timeline},
    kiln_core::hal::{queue::SyncPoint, Backend},
    smallvec::SmallVec,
};

/// Command queue submission.
#[derive(derivative::Derivative)]
#[derivative(Debug(bound = ""), Default(bound = ""))]
pub struct Submission<'a, B: Backend> {
    /// Sync points to wait for.
    pub waits: SmallVec<[SyncPoint<'a, B>; 4]>,

    /// Command buffers executed in order.
    pub submits: SmallVec<[&'a B::CommandBuffer; 4]>,

    /// Sync points to signal.
    pub signals: SmallVec<[SyncPoint<'a, B>; 4]>,
}

impl<'a, B> Submission<'a, B>
where
    B: Backend,
{
    /// Create new empty submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add command buffers to the submission.
    pub fn submits(mut self, submits: impl IntoIterator<Item = &'a B::CommandBuffer>) -> Self {
        self.submits.extend(submits);
        self
    }

    /// Wait for semaphore before execution.
    pub fn wait_semaphore(mut self, semaphore: &'a Semaphore<B>) -> Self {
        self.waits.push(semaphore.sync_point());
        self
    }

    /// Wait for timeline to reach value before execution.
    pub fn wait_timeline(mut self, timeline: &'a Timeline<B>, value: u64) -> Self {
        self.waits.push(timeline.wait_point(value));
        self
    }

    /// Add raw waits.
    pub fn wait(mut self, waits: impl IntoIterator<Item = SyncPoint<'a, B>>) -> Self {
        self.waits.extend(waits);
        self
    }

    /// Signal semaphore after execution.
    pub fn signal_semaphore(mut self, semaphore: &'a Semaphore<B>) -> Self {
        self.signals.push(semaphore.sync_point());
        self
    }

    /// Add raw signals.
    pub fn signal(mut self, signals: impl IntoIterator<Item = SyncPoint<'a, B>>) -> Self {
        self.signals.extend(signals);
        self
    }

    /// Check if submission neither executes, waits nor signals anything.
    pub fn is_empty(&self) -> bool {
        self.waits.is_empty() && self.submits.is_empty() && self.signals.is_empty()
    }
}
