//! Module provides wrapper for types that cannot be dropped silently.
//! Usually such types are required to be returned to their creator.
//! `Escape` wrapper help the user to do so by sending underlying value to the `Terminal` when it is dropped.
//! `KeepAlive` tokens postpone the sending until the last token is dropped as well.

use std::{mem::ManuallyDrop, ops::Deref, sync::Arc};

#[derive(Debug)]
struct Inner<T> {
    value: ManuallyDrop<T>,
    sender: crossbeam_channel::Sender<T>,
}

impl<T> Inner<T> {
    fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);
        unsafe {
            // `this` is never dropped, both fields are moved out exactly once.
            let value = ManuallyDrop::take(&mut this.value);
            std::ptr::drop_in_place(&mut this.sender);
            value
        }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let value = unsafe {
            // `self.value` cannot be accessed after this function.
            ManuallyDrop::take(&mut self.value)
        };
        if let Err(crossbeam_channel::SendError(value)) = self.sender.send(value) {
            // Terminal is gone. Nothing can destroy the value properly anymore.
            log::warn!("Terminal dropped before escaped value");
            std::mem::forget(value);
        }
    }
}

/// Values of `KeepAlive` keeps resources from destroying.
///
/// # Example
///
/// ```
/// # use kiln_resource::escape::Terminal;
/// let terminal = Terminal::new();
/// let escape = terminal.escape(42u32);
/// let kp = escape.keep_alive();
///
/// // `kp` keeps the value from reaching the terminal.
/// drop(escape);
/// assert_eq!(terminal.drain().count(), 0);
///
/// drop(kp);
/// assert_eq!(terminal.drain().collect::<Vec<_>>(), vec![42]);
/// ```
#[derive(Clone, derivative::Derivative)]
#[derivative(Debug)]
pub struct KeepAlive(#[derivative(Debug = "ignore")] Arc<dyn std::any::Any + Send + Sync>);

/// Wraps value of any type and send it to the `Terminal` from which the wrapper was created.
/// In case `Terminal` is already dropped then value will be cast into oblivion via `std::mem::forget`.
#[derive(Debug)]
pub struct Escape<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Escape<T> {
    /// Create `KeepAlive` token for the value.
    pub fn keep_alive(&self) -> KeepAlive
    where
        T: Send + Sync + 'static,
    {
        KeepAlive(self.inner.clone() as _)
    }

    /// Try to avoid channel sending if value is not kept alive elsewhere.
    pub fn dispose(escape: Self) -> Result<T, Self> {
        Arc::try_unwrap(escape.inner)
            .map(Inner::into_inner)
            .map_err(|inner| Escape { inner })
    }
}

impl<T> Deref for Escape<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

/// This types allows the user to create `Escape` wrappers.
/// Receives values from dropped `Escape` instances that was created by this `Terminal`.
#[derive(Debug)]
pub struct Terminal<T> {
    receiver: crossbeam_channel::Receiver<T>,
    sender: crossbeam_channel::Sender<T>,
}

impl<T> Default for Terminal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Terminal<T> {
    /// Create new `Terminal`.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Terminal { sender, receiver }
    }

    /// Wrap the value. It will be yielded by iterator returned by `Terminal::drain` if `Escape` will be dropped.
    pub fn escape(&self, value: T) -> Escape<T> {
        Escape {
            inner: Arc::new(Inner {
                value: ManuallyDrop::new(value),
                sender: self.sender.clone(),
            }),
        }
    }

    /// Get iterator over values from dropped `Escape` instances that was created by this `Terminal`.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.receiver.try_iter()
    }
}

impl<T> Drop for Terminal<T> {
    fn drop(&mut self) {
        if !self.receiver.is_empty() {
            log::error!("Terminal must be drained before dropping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_bypasses_terminal() {
        let terminal = Terminal::new();
        let escape = terminal.escape(String::from("raw"));
        assert_eq!(Escape::dispose(escape).ok(), Some(String::from("raw")));
        assert_eq!(terminal.drain().count(), 0);
    }

    #[test]
    fn dispose_fails_while_kept_alive() {
        let terminal = Terminal::new();
        let escape = terminal.escape(7u64);
        let kp = escape.keep_alive();
        let escape = Escape::dispose(escape).unwrap_err();
        assert_eq!(*escape, 7);
        drop(escape);
        drop(kp);
        assert_eq!(terminal.drain().collect::<Vec<_>>(), vec![7]);
    }
}
