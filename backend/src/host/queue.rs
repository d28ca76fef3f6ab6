use {
    super::{
        command::{HostCommand, Submitted},
        counters::Counters,
        signal::Signal,
    },
    kiln_core::{DeviceError, DeviceLost, QueueType},
    std::{
        any::Any,
        panic::{catch_unwind, AssertUnwindSafe},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::JoinHandle,
    },
};

type Job = Box<dyn FnOnce(&AtomicBool) + Send>;

/// Wait operation resolved at submission time.
#[derive(Debug)]
pub enum WaitOp {
    /// Wait for non-zero value and reset it.
    Consume(Signal),
    /// Wait for value to be reached.
    Reach(Signal, u64),
}

/// Signal operation resolved at submission time.
#[derive(Debug)]
pub enum SignalOp {
    /// Overwrite value.
    Set(Signal, u64),
    /// Raise value.
    Raise(Signal, u64),
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl SignalOp {
    fn apply(self) {
        match self {
            SignalOp::Set(signal, value) => signal.set(value),
            SignalOp::Raise(signal, value) => signal.raise(value),
        }
    }
}

/// Queue executed by a dedicated worker thread.
/// Jobs run strictly in submission order.
#[derive(Debug)]
pub struct Worker {
    ty: QueueType,
    sender: Option<crossbeam_channel::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

impl Worker {
    pub fn spawn(backend: &str, ty: QueueType, counters: Arc<Counters>) -> Result<Self, DeviceError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let thread = std::thread::Builder::new()
            .name(format!("kiln-{}-{:?}", backend, ty))
            .spawn(move || {
                // A panicking job must not take the queue down with it.
                for job in receiver.iter() {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job(&flag))) {
                        log::error!("{:?} queue job panicked: {}", ty, panic_message(&*payload));
                    }
                }
            })
            .map_err(|err| {
                DeviceError::rejected("spawn", i64::from(err.raw_os_error().unwrap_or(-1)))
            })?;

        Ok(Worker {
            ty,
            sender: Some(sender),
            thread: Some(thread),
            shutdown,
            counters,
        })
    }

    pub fn queue_type(&self) -> QueueType {
        self.ty
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    fn push(&self, job: Job) -> Result<(), DeviceError> {
        self.sender
            .as_ref()
            .ok_or(DeviceLost)?
            .send(job)
            .map_err(|_| DeviceLost.into())
    }

    /// Enqueue execution of command buffers.
    /// Command buffers are released before any signal operation is applied.
    pub fn submit<C>(
        &self,
        buffers: Vec<Submitted<C>>,
        waits: Vec<WaitOp>,
        signals: Vec<SignalOp>,
    ) -> Result<(), DeviceError>
    where
        C: HostCommand,
    {
        Counters::bump(&self.counters.submissions);
        let counters = self.counters.clone();
        let ty = self.ty;
        self.push(Box::new(move |shutdown| {
            for wait in waits {
                let satisfied = match wait {
                    WaitOp::Consume(signal) => signal.consume_on_queue(shutdown),
                    WaitOp::Reach(signal, value) => signal.wait_on_queue(value, shutdown),
                };
                if !satisfied {
                    log::warn!("{:?} queue shut down with unsatisfied wait", ty);
                    return;
                }
            }

            let executed = catch_unwind(AssertUnwindSafe(|| {
                for buffer in &buffers {
                    buffer.execute(&counters);
                }
            }));
            if let Err(payload) = executed {
                counters.validation_error(format_args!(
                    "{:?} queue aborted submission: {}",
                    ty,
                    panic_message(&*payload)
                ));
            }
            drop(buffers);

            for signal in signals {
                signal.apply();
            }
        }))
    }

    /// Block until every job submitted so far is complete.
    pub fn wait_idle(&self) -> Result<(), DeviceError> {
        let signal = Signal::new(0);
        let done = signal.clone();
        self.push(Box::new(move |_| done.set(1)))?;
        signal.wait(1, None);
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.sender.take();
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("{:?} queue worker panicked", self.ty);
            }
        }
    }
}
