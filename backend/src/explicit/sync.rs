//! Binary fences, binary semaphores and timeline semaphores.

use crate::host::{
    queue::{SignalOp, WaitOp},
    signal::Signal,
};

/// Binary fence. Value is `1` when signaled.
#[derive(Debug)]
pub struct Fence(pub(super) Signal);

impl Fence {
    pub(super) fn new(signaled: bool) -> Self {
        Fence(Signal::new(signaled as u64))
    }

    pub(super) fn is_signaled(&self) -> bool {
        self.0.value() != 0
    }

    pub(super) fn signal_op(&self) -> SignalOp {
        SignalOp::Set(self.0.clone(), 1)
    }
}

/// Binary semaphore. Waiting consumes the signal.
#[derive(Debug)]
pub struct Semaphore(pub(super) Signal);

impl Semaphore {
    pub(super) fn new() -> Self {
        Semaphore(Signal::new(0))
    }

    pub(super) fn wait_op(&self) -> WaitOp {
        WaitOp::Consume(self.0.clone())
    }

    pub(super) fn signal_op(&self) -> SignalOp {
        SignalOp::Set(self.0.clone(), 1)
    }
}

/// Timeline semaphore.
#[derive(Debug)]
pub struct TimelineSemaphore(pub(super) Signal);

impl TimelineSemaphore {
    pub(super) fn new(initial: u64) -> Self {
        TimelineSemaphore(Signal::new(initial))
    }

    pub(super) fn wait_op(&self, value: u64) -> WaitOp {
        WaitOp::Reach(self.0.clone(), value)
    }

    pub(super) fn signal_op(&self, value: u64) -> SignalOp {
        SignalOp::Raise(self.0.clone(), value)
    }
}
