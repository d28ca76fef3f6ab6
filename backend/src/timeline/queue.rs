use {
    super::{Backend, Fence, E_INVALIDARG},
    crate::host::{counters::Counters, queue::Worker},
    kiln_core::{
        hal::queue::{RawSubmission, SyncPoint},
        DeviceError, QueueType,
    },
    std::sync::Arc,
};

/// Command queue executing lists on a worker thread.
#[derive(Debug)]
pub struct CommandQueue {
    worker: Worker,
}

impl CommandQueue {
    pub(super) fn new(ty: QueueType, counters: Arc<Counters>) -> Result<Self, DeviceError> {
        Ok(CommandQueue {
            worker: Worker::spawn("timeline", ty, counters)?,
        })
    }
}

impl kiln_core::hal::queue::Queue<Backend> for CommandQueue {
    fn queue_type(&self) -> QueueType {
        self.worker.queue_type()
    }

    unsafe fn submit(
        &self,
        submission: RawSubmission<'_, Backend>,
        fence: Option<&Fence>,
    ) -> Result<(), DeviceError> {
        let counters = self.worker.counters();
        let mut lists = Vec::with_capacity(submission.command_buffers.len());
        for list in submission.command_buffers {
            match list.commands().submit(self.worker.queue_type()) {
                Some(submitted) => lists.push(submitted),
                None => {
                    return Err(DeviceError::rejected(
                        "ID3D12CommandQueue::ExecuteCommandLists",
                        E_INVALIDARG,
                    ))
                }
            }
        }

        // Waits and signals are queued around `ExecuteCommandLists`
        // as `ID3D12CommandQueue::Wait` and `ID3D12CommandQueue::Signal`.
        let waits = submission
            .waits
            .iter()
            .map(|wait| match *wait {
                SyncPoint::Binary(semaphore) => semaphore.wait_op(),
                SyncPoint::Timeline(fence, value) => fence.wait_op(value),
            })
            .collect();

        let mut signals: Vec<_> = submission
            .signals
            .iter()
            .map(|signal| match *signal {
                SyncPoint::Binary(semaphore) => semaphore.signal_op(),
                SyncPoint::Timeline(fence, value) => {
                    let completed = fence.0.value();
                    if value <= completed {
                        counters.validation_error(format_args!(
                            "ID3D12CommandQueue::Signal: value {} is not greater than completed value {}",
                            value, completed
                        ));
                    }
                    fence.signal_op(value)
                }
            })
            .collect();

        if let Some(fence) = fence {
            if fence.is_signaled() {
                counters.validation_error(format_args!(
                    "ID3D12CommandQueue::Signal: fence target {} is already reached",
                    fence.target()
                ));
            }
            signals.push(fence.signal_op());
        }

        self.worker.submit(lists, waits, signals)
    }

    fn wait_idle(&self) -> Result<(), DeviceError> {
        self.worker.wait_idle()
    }
}
