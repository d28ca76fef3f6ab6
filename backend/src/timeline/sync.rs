//! Counter fences and the primitives emulated on top of them.

use {
    crate::host::{
        queue::{SignalOp, WaitOp},
        signal::Signal,
    },
    std::sync::atomic::{AtomicU64, Ordering},
};

/// Counter fence waited for by the host.
/// Signaled when completed value reaches the target value.
#[derive(Debug)]
pub struct Fence {
    pub(super) completed: Signal,
    pub(super) target: AtomicU64,
}

impl Fence {
    pub(super) fn new(signaled: bool) -> Self {
        Fence {
            completed: Signal::new(0),
            target: AtomicU64::new(if signaled { 0 } else { 1 }),
        }
    }

    pub(super) fn target(&self) -> u64 {
        self.target.load(Ordering::Acquire)
    }

    pub(super) fn is_signaled(&self) -> bool {
        self.completed.value() >= self.target()
    }

    /// Next submission signals the next counter value.
    pub(super) fn reset(&self) {
        let completed = self.completed.value();
        self.target.store(completed + 1, Ordering::Release);
    }

    pub(super) fn signal_op(&self) -> SignalOp {
        SignalOp::Raise(self.completed.clone(), self.target())
    }
}

/// Binary semaphore emulated with a counter.
/// N-th wait is satisfied by N-th signal.
#[derive(Debug)]
pub struct Semaphore {
    counter: Signal,
    signals: AtomicU64,
    waits: AtomicU64,
}

impl Semaphore {
    pub(super) fn new() -> Self {
        Semaphore {
            counter: Signal::new(0),
            signals: AtomicU64::new(0),
            waits: AtomicU64::new(0),
        }
    }

    pub(super) fn wait_op(&self) -> WaitOp {
        let value = self.waits.fetch_add(1, Ordering::AcqRel) + 1;
        WaitOp::Reach(self.counter.clone(), value)
    }

    pub(super) fn signal_op(&self) -> SignalOp {
        let value = self.signals.fetch_add(1, Ordering::AcqRel) + 1;
        SignalOp::Raise(self.counter.clone(), value)
    }
}

/// Counter fence shared between queues.
#[derive(Debug)]
pub struct SharedFence(pub(super) Signal);

impl SharedFence {
    pub(super) fn new(initial: u64) -> Self {
        SharedFence(Signal::new(initial))
    }

    pub(super) fn wait_op(&self, value: u64) -> WaitOp {
        WaitOp::Reach(self.0.clone(), value)
    }

    pub(super) fn signal_op(&self, value: u64) -> SignalOp {
        SignalOp::Raise(self.0.clone(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_targets_next_value() {
        let fence = Fence::new(true);
        assert!(fence.is_signaled());
        fence.reset();
        assert!(!fence.is_signaled());
        fence.completed.raise(1);
        assert!(fence.is_signaled());
        fence.reset();
        assert_eq!(fence.target(), 2);
    }
}
