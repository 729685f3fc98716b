//! One-shot broadcast signal used by the thread-safe latch.
//!
//! A [`Signal`] starts unfired and fires at most once. Any number of
//! [`Closed`] handles can observe the transition; observing does not consume
//! it, so every current and future waiter on a fired signal completes
//! immediately. This is what distinguishes the latch from a point-to-point
//! channel, where one send satisfies exactly one receive.

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use crate::constants::ERR_POISONED_LOCK;

/// The shared state of one open episode of a latch.
///
/// Episode scoping matters: when a latch is reopened it installs a fresh
/// `Signal` and the old one is never fired again, so waiters must always
/// re-fetch their handle instead of caching it across waits.
#[derive(Debug)]
pub(crate) struct Signal {
    state: Mutex<SignalState>,
}

#[derive(Debug)]
struct SignalState {
    fired: bool,

    /// Key for the next waiter to register. Keys are never reused within a
    /// signal, so a re-poll can locate and replace its own waker and a
    /// dropped handle can deregister without disturbing other waiters.
    next_key: u64,

    /// Wakers of currently parked waiters.
    waiters: Vec<(u64, Waker)>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SignalState {
                fired: false,
                next_key: 0,
                waiters: Vec::new(),
            }),
        }
    }

    /// Transitions unfired -> fired and wakes every parked waiter.
    ///
    /// Idempotent: firing an already fired signal does nothing. The wakeups
    /// happen after the internal lock is released so a waiter that runs
    /// immediately does not contend with us.
    #[cfg_attr(test, mutants::skip)] // Critical primitive - causes test timeouts if tampered.
    pub(crate) fn fire(&self) {
        let wakers = {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

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

    /// Reports whether the signal has fired, registering the waker for a
    /// later wakeup if it has not.
    ///
    /// `key` is the waiter's registration slot; it is assigned on first use
    /// and reused on re-polls so only the most recent waker is retained.
    fn poll_fired(&self, waker: &Waker, key: &mut Option<u64>) -> bool {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

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
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        state.waiters.retain(|(entry_key, _)| *entry_key != key);
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        self.state.lock().expect(ERR_POISONED_LOCK).waiters.len()
    }
}

/// A future that completes once the owning latch closes.
///
/// Obtained from [`Latch::when_closed`][crate::Latch::when_closed]. Any number
/// of handles can wait on the same close; all of them complete and none of
/// them consumes the notification. A handle created after the close completes
/// immediately.
///
/// A handle is scoped to one open episode of its latch: reopening the latch
/// retires the current signal, so handles must be re-fetched immediately
/// before every wait rather than cached. The handle itself carries no value -
/// call [`Latch::read`][crate::Latch::read] after it completes, which is then
/// guaranteed to observe the closed state.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use futures::executor::block_on;
/// use value_latch::Latch;
///
/// let latch = Latch::new(Some(Arc::new("ready")));
/// latch.close(None).unwrap();
///
/// block_on(latch.when_closed());
/// let (payload, closed) = latch.read();
/// assert!(closed);
/// assert_eq!(*payload.unwrap(), "ready");
/// ```
#[derive(Debug)]
pub struct Closed {
    signal: Arc<Signal>,
    key: Option<u64>,
}

impl Closed {
    pub(crate) fn new(signal: Arc<Signal>) -> Self {
        Self { signal, key: None }
    }
}

impl Future for Closed {
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

// Cloning yields an independent waiter on the same episode; the clone starts
// unregistered and registers its own waker when first polled.
impl Clone for Closed {
    fn clone(&self) -> Self {
        Self {
            signal: Arc::clone(&self.signal),
            key: None,
        }
    }
}

impl Drop for Closed {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            self.signal.deregister(key);
        }
    }
}
