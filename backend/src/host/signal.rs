use {
    parking_lot::{Condvar, Mutex},
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    },
};

/// Interval at which blocked queue workers check for shutdown.
const POLL_SLICE: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct State {
    value: Mutex<u64>,
    cond: Condvar,
}

/// Counter that can be raised by queue workers and waited for by
/// host threads and other queue workers.
/// Every fence, semaphore and timeline of host backends is built from it.
#[derive(Clone, Debug, Default)]
pub struct Signal(Arc<State>);

impl Signal {
    pub fn new(value: u64) -> Self {
        Signal(Arc::new(State {
            value: Mutex::new(value),
            cond: Condvar::new(),
        }))
    }

    pub fn value(&self) -> u64 {
        *self.0.value.lock()
    }

    /// Raise value. Lower values are ignored.
    pub fn raise(&self, value: u64) {
        let mut current = self.0.value.lock();
        if value > *current {
            *current = value;
            self.0.cond.notify_all();
        }
    }

    /// Overwrite value.
    pub fn set(&self, value: u64) {
        *self.0.value.lock() = value;
        self.0.cond.notify_all();
    }

    /// Block until value reaches `value` or `timeout` expires.
    pub fn wait(&self, value: u64, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut current = self.0.value.lock();
        while *current < value {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    self.0.cond.wait_for(&mut current, deadline - now);
                }
                None => self.0.cond.wait(&mut current),
            }
        }
        true
    }

    /// Block queue worker until value reaches `value`.
    /// Gives up when `shutdown` is raised.
    pub fn wait_on_queue(&self, value: u64, shutdown: &AtomicBool) -> bool {
        let mut current = self.0.value.lock();
        while *current < value {
            if shutdown.load(Ordering::Acquire) {
                return false;
            }
            self.0.cond.wait_for(&mut current, POLL_SLICE);
        }
        true
    }

    /// Block queue worker until value is non-zero, then reset it to zero.
    /// Gives up when `shutdown` is raised.
    pub fn consume_on_queue(&self, shutdown: &AtomicBool) -> bool {
        let mut current = self.0.value.lock();
        while *current == 0 {
            if shutdown.load(Ordering::Acquire) {
                return false;
            }
            self.0.cond.wait_for(&mut current, POLL_SLICE);
        }
        *current = 0;
        true
    }
}

/// Convert native timeout in nanoseconds. `u64::MAX` means no timeout.
pub fn timeout(timeout_ns: u64) -> Option<Duration> {
    if timeout_ns == u64::MAX {
        None
    } else {
        Some(Duration::from_nanos(timeout_ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_times_out() {
        let signal = Signal::new(0);
        assert!(!signal.wait(1, Some(Duration::from_millis(5))));
        assert!(signal.wait(0, Some(Duration::from_millis(0))));
    }

    #[test]
    fn raise_wakes_waiter() {
        let signal = Signal::new(0);
        let raiser = signal.clone();
        let thread = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            raiser.raise(3);
        });
        assert!(signal.wait(3, None));
        thread.join().unwrap();
        signal.raise(1);
        assert_eq!(signal.value(), 3);
    }

    #[test]
    fn consume_resets() {
        let signal = Signal::new(1);
        let shutdown = AtomicBool::new(false);
        assert!(signal.consume_on_queue(&shutdown));
        assert_eq!(signal.value(), 0);
        shutdown.store(true, Ordering::Release);
        assert!(!signal.consume_on_queue(&shutdown));
    }
}
