use {
    crate::{
        fence::{Fence, FenceEpoch},
        submission::Submission,
    },
    kiln_core::{
        hal::{
            device::Device as _,
            queue::{Queue as _, RawSubmission},
            Backend,
        },
        Device, DeviceError, QueueType,
    },
    std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread_profiler::profile_scope,
};

/// Command queue wrapper counting fenced submissions.
#[derive(Debug)]
pub struct Queue<B: Backend> {
    ty: QueueType,
    next_epoch: AtomicU64,
    marker: std::marker::PhantomData<fn() -> B>,
}

impl<B> Queue<B>
where
    B: Backend,
{
    fn new(ty: QueueType) -> Self {
        Queue {
            ty,
            next_epoch: AtomicU64::new(0),
            marker: std::marker::PhantomData,
        }
    }

    /// Type of the queue.
    pub fn queue_type(&self) -> QueueType {
        self.ty
    }

    /// Returns next queue epoch.
    pub fn next_epoch(&self) -> u64 {
        self.next_epoch.load(Ordering::Acquire)
    }

    /// Submit commands to the queue.
    /// Fence is attached to the last submission and becomes submitted.
    ///
    /// # Safety
    ///
    /// Command buffers must be executable and outlive execution.
    /// Fence must be unsignaled.
    pub unsafe fn submit<'a>(
        &self,
        device: &Device<B>,
        submissions: impl IntoIterator<Item = Submission<'a, B>>,
        fence: Option<&mut Fence<B>>,
    ) -> Result<(), DeviceError> {
        profile_scope!("submit");

        let raw = device.queue(self.ty);
        let mut submissions = submissions.into_iter().peekable();
        if submissions.peek().is_none() && fence.is_some() {
            raw.submit(
                RawSubmission::sync(&[], &[]),
                fence.as_ref().map(|f| f.raw()),
            )?;
        } else {
            while let Some(submission) = submissions.next() {
                raw.submit(
                    RawSubmission {
                        command_buffers: &submission.submits,
                        waits: &submission.waits,
                        signals: &submission.signals,
                    },
                    submissions
                        .peek()
                        .map_or(fence.as_ref().map(|f| f.raw()), |_| None),
                )?;
            }
        }

        if let Some(fence) = fence {
            let epoch = self.next_epoch.fetch_add(1, Ordering::AcqRel);
            log::trace!("{:?} queue epoch {} submitted", self.ty, epoch);
            fence.mark_submitted(FenceEpoch {
                queue: self.ty,
                epoch,
            });
        }
        Ok(())
    }

    /// Wait for queue to finish all pending commands.
    pub fn wait_idle(&self, device: &Device<B>) -> Result<(), DeviceError> {
        profile_scope!("wait_idle");
        device.queue(self.ty).wait_idle()
    }
}

/// Device with its queues.
/// Shared by recorders, submitters and swapchains created for the device.
#[derive(Debug)]
pub struct Queues<B: Backend> {
    device: Arc<Device<B>>,
    queues: [Queue<B>; 3],
}

impl<B> Queues<B>
where
    B: Backend,
{
    /// Wrap device queues.
    pub fn new(device: Arc<Device<B>>) -> Self {
        Queues {
            device,
            queues: [
                Queue::new(QueueType::Graphics),
                Queue::new(QueueType::Compute),
                Queue::new(QueueType::Transfer),
            ],
        }
    }

    /// Get the device.
    pub fn device(&self) -> &Arc<Device<B>> {
        &self.device
    }

    /// Get queue of specified type.
    pub fn queue(&self, ty: QueueType) -> &Queue<B> {
        &self.queues[ty.index()]
    }

    /// Wait for all queues to finish pending commands.
    pub fn wait_idle(&self) -> Result<(), DeviceError> {
        profile_scope!("wait_idle");
        self.device.wait_idle()
    }
}
