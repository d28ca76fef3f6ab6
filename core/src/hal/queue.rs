//! Hardware queue trait.

use {
    super::Backend,
    crate::{DeviceError, QueueType},
    std::fmt::Debug,
};

/// Point of GPU timeline to wait for or to signal.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Copy(bound = ""), Debug(bound = ""))]
pub enum SyncPoint<'a, B: Backend> {
    /// Binary semaphore. Waiting consumes the signal.
    Binary(&'a B::Semaphore),

    /// Timeline value. Waits for timeline to reach the value,
    /// signals by raising timeline to the value.
    Timeline(&'a B::Timeline, u64),
}

/// Raw queue submission.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Copy(bound = ""), Debug(bound = ""))]
pub struct RawSubmission<'a, B: Backend> {
    /// Primary command buffers in execution order.
    pub command_buffers: &'a [&'a B::CommandBuffer],

    /// Sync points to wait for before execution starts.
    pub waits: &'a [SyncPoint<'a, B>],

    /// Sync points to signal after execution completes.
    pub signals: &'a [SyncPoint<'a, B>],
}

impl<'a, B> RawSubmission<'a, B>
where
    B: Backend,
{
    /// Submission that executes nothing and only waits and signals.
    pub fn sync(waits: &'a [SyncPoint<'a, B>], signals: &'a [SyncPoint<'a, B>]) -> Self {
        RawSubmission {
            command_buffers: &[],
            waits,
            signals,
        }
    }
}

/// Hardware queue. Submissions execute in submission order.
pub trait Queue<B: Backend>: Debug + Send + Sync {
    /// Type of the queue.
    fn queue_type(&self) -> QueueType;

    /// Submit command buffers for execution.
    /// Fence gets signaled after everything submitted so far completes.
    ///
    /// # Safety
    ///
    /// Command buffers must be executable, created for this queue type
    /// and not destroyed until execution completes.
    /// Fence must be unsignaled and not pending.
    unsafe fn submit(
        &self,
        submission: RawSubmission<'_, B>,
        fence: Option<&B::Fence>,
    ) -> Result<(), DeviceError>;

    /// Wait for queue to finish all pending work.
    fn wait_idle(&self) -> Result<(), DeviceError>;
}
