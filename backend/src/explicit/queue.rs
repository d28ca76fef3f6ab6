use {
    super::{Backend, Fence, VK_ERROR_VALIDATION_FAILED},
    crate::host::{counters::Counters, queue::Worker},
    kiln_core::{
        hal::queue::{RawSubmission, SyncPoint},
        DeviceError, QueueType,
    },
    std::sync::Arc,
};

/// Queue executing submissions on a worker thread.
#[derive(Debug)]
pub struct Queue {
    worker: Worker,
}

impl Queue {
    pub(super) fn new(ty: QueueType, counters: Arc<Counters>) -> Result<Self, DeviceError> {
        Ok(Queue {
            worker: Worker::spawn("explicit", ty, counters)?,
        })
    }
}

impl kiln_core::hal::queue::Queue<Backend> for Queue {
    fn queue_type(&self) -> QueueType {
        self.worker.queue_type()
    }

    unsafe fn submit(
        &self,
        submission: RawSubmission<'_, Backend>,
        fence: Option<&Fence>,
    ) -> Result<(), DeviceError> {
        let counters = self.worker.counters();
        let mut buffers = Vec::with_capacity(submission.command_buffers.len());
        for buffer in submission.command_buffers {
            match buffer.commands().submit(self.worker.queue_type()) {
                Some(submitted) => buffers.push(submitted),
                None => {
                    return Err(DeviceError::rejected(
                        "vkQueueSubmit",
                        VK_ERROR_VALIDATION_FAILED,
                    ))
                }
            }
        }

        let waits = submission
            .waits
            .iter()
            .map(|wait| match *wait {
                SyncPoint::Binary(semaphore) => semaphore.wait_op(),
                SyncPoint::Timeline(timeline, value) => timeline.wait_op(value),
            })
            .collect();

        let mut signals: Vec<_> = submission
            .signals
            .iter()
            .map(|signal| match *signal {
                SyncPoint::Binary(semaphore) => semaphore.signal_op(),
                SyncPoint::Timeline(timeline, value) => {
                    if value <= timeline.0.value() {
                        counters.validation_error(format_args!(
                            "vkQueueSubmit: timeline signal value {} is not greater than current value {}",
                            value,
                            timeline.0.value()
                        ));
                    }
                    timeline.signal_op(value)
                }
            })
            .collect();

        if let Some(fence) = fence {
            if fence.is_signaled() {
                counters.validation_error(format_args!(
                    "vkQueueSubmit: fence {:?} is already signaled",
                    fence
                ));
            }
            signals.push(fence.signal_op());
        }

        self.worker.submit(buffers, waits, signals)
    }

    fn wait_idle(&self) -> Result<(), DeviceError> {
        self.worker.wait_idle()
    }
}
