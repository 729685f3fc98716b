//! One-shot broadcast signal used by the single-threaded latch.

use std::cell::RefCell;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Single-threaded counterpart of the thread-safe signal: interior mutability
/// through a `RefCell` instead of a `Mutex`, shared through `Rc`.
#[derive(Debug)]
pub(crate) struct LocalSignal {
    state: RefCell<LocalSignalState>,
}

#[derive(Debug)]
struct LocalSignalState {
    fired: bool,
    next_key: u64,
    waiters: Vec<(u64, Waker)>,
}

impl LocalSignal {
    pub(crate) fn new() -> Self {
        Self {
            state: RefCell::new(LocalSignalState {
                fired: false,
                next_key: 0,
                waiters: Vec::new(),
            }),
        }
    }

    /// Transitions unfired -> fired and wakes every parked waiter. Idempotent.
    ///
    /// Wakeups happen after the borrow is released; a waker may re-enter the
    /// signal (e.g. a local executor polling inline) and must not observe an
    /// outstanding borrow.
    pub(crate) fn fire(&self) {
        let wakers = {
            let mut state = self.state.borrow_mut();

            if state.fired {
                return;
            }

            state.fired = true;
            mem::take(&mut state.waiters)
        };

        for (_, waker) in wakers {
            waker.wake();
        }
    }

    fn poll_fired(&self, waker: &Waker, key: &mut Option<u64>) -> bool {
        let mut state = self.state.borrow_mut();

        if state.fired {
            return true;
        }

        match *key {
            Some(existing) => {
                match state
                    .waiters
                    .iter_mut()
                    .find(|(entry_key, _)| *entry_key == existing)
                {
                    Some(entry) => entry.1 = waker.clone(),
                    None => state.waiters.push((existing, waker.clone())),
                }
            }
            None => {
                let assigned = state.next_key;
                state.next_key = state.next_key.wrapping_add(1);
                *key = Some(assigned);
                state.waiters.push((assigned, waker.clone()));
            }
        }

        false
    }

    fn deregister(&self, key: u64) {
        let mut state = self.state.borrow_mut();
        state.waiters.retain(|(entry_key, _)| *entry_key != key);
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        self.state.borrow().waiters.len()
    }
}

/// A future that completes once the owning [`LocalLatch`][crate::LocalLatch]
/// closes.
///
/// Behaves like [`Closed`][crate::Closed] but is neither `Send` nor `Sync`;
/// it can only be awaited on the thread that owns the latch. See
/// [`LocalLatch::when_closed`][crate::LocalLatch::when_closed].
#[derive(Debug)]
pub struct LocalClosed {
    signal: Rc<LocalSignal>,
    key: Option<u64>,
}

impl LocalClosed {
    pub(crate) fn new(signal: Rc<LocalSignal>) -> Self {
        Self { signal, key: None }
    }
}

impl Future for LocalClosed {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.signal.poll_fired(cx.waker(), &mut this.key) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Clone for LocalClosed {
    fn clone(&self) -> Self {
        Self {
            signal: Rc::clone(&self.signal),
            key: None,
        }
    }
}

impl Drop for LocalClosed {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.signal.deregister(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use static_assertions::assert_not_impl_any;
    use testing::poll_now;

    use super::*;

    assert_not_impl_any!(LocalClosed: Send, Sync);

    #[test]
    fn fire_is_idempotent() {
        let signal = LocalSignal::new();
        signal.fire();
        signal.fire();
    }

    #[test]
    fn handle_pending_before_fire_ready_after() {
        let signal = Rc::new(LocalSignal::new());
        let mut handle = LocalClosed::new(Rc::clone(&signal));

        assert_eq!(poll_now(&mut handle), Poll::Pending);

        signal.fire();

        assert_eq!(poll_now(&mut handle), Poll::Ready(()));
    }

    #[test]
    fn multiple_handles_observe_one_fire() {
        let signal = Rc::new(LocalSignal::new());

        let mut handles: Vec<_> = (0..3)
            .map(|_| LocalClosed::new(Rc::clone(&signal)))
            .collect();

        for handle in &mut handles {
            assert_eq!(poll_now(handle), Poll::Pending);
        }
        assert_eq!(signal.waiter_count(), 3);

        signal.fire();

        for handle in &mut handles {
            assert_eq!(poll_now(handle), Poll::Ready(()));
        }
    }

    #[test]
    fn dropping_pending_handle_deregisters_waker() {
        let signal = Rc::new(LocalSignal::new());

        let mut handle = LocalClosed::new(Rc::clone(&signal));
        assert_eq!(poll_now(&mut handle), Poll::Pending);
        assert_eq!(signal.waiter_count(), 1);

        drop(handle);
        assert_eq!(signal.waiter_count(), 0);
    }
}
