//! Single-threaded value-carrying close latch.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use crate::AlreadyClosed;
use crate::history::{History, LocalVersionedValue};
use crate::local_signal::{LocalClosed, LocalSignal};

/// Single-threaded counterpart of [`Latch`][crate::Latch], with lower
/// overhead and no `Send`/`Sync` requirements on the payload type.
///
/// The operation surface and semantics are identical to [`Latch`][crate::Latch];
/// payloads are handled through [`Rc`] instead of `Arc` and the latch itself
/// can be neither shared across threads nor sent to another thread. Use it
/// when writer and readers all live on one thread, for example inside a
/// single-threaded executor.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use value_latch::LocalLatch;
///
/// // `Rc<str>` payloads would not be accepted by the thread-safe latch.
/// let status = LocalLatch::new(Some(Rc::new("starting")));
///
/// status.close(Some(Rc::new("finished"))).unwrap();
///
/// let (payload, closed) = status.read();
/// assert!(closed);
/// assert_eq!(*payload.unwrap(), "finished");
/// ```
#[derive(Debug)]
pub struct LocalLatch<T> {
    state: RefCell<LocalLatchState<T>>,
}

#[derive(Debug)]
struct LocalLatchState<T> {
    payload: Option<Rc<T>>,
    closed: bool,
    version: u64,
    signal: Rc<LocalSignal>,
    history: History<LocalVersionedValue<T>>,
}

impl<T> LocalLatchState<T> {
    fn replace_payload(&mut self, payload: Option<Rc<T>>) -> Option<Rc<T>> {
        self.version += 1;

        let previous = mem::replace(&mut self.payload, payload);

        self.history.record(LocalVersionedValue {
            version: self.version,
            value: self.payload.clone(),
        });

        previous
    }

    fn make_open(&mut self) {
        if !self.closed {
            return;
        }

        self.closed = false;
        self.signal = Rc::new(LocalSignal::new());
    }
}

impl<T> LocalLatch<T> {
    /// Creates a new open latch with the given initial payload and no
    /// version history.
    #[must_use]
    pub fn new(initial: Option<Rc<T>>) -> Self {
        Self::with_history(initial, 0)
    }

    /// Creates a new open latch that retains the last `retain` payload
    /// versions for [`read_past`](LocalLatch::read_past).
    #[must_use]
    pub fn with_history(initial: Option<Rc<T>>, retain: usize) -> Self {
        let mut history = History::new(retain);
        history.record(LocalVersionedValue {
            version: 0,
            value: initial.clone(),
        });

        Self {
            state: RefCell::new(LocalLatchState {
                payload: initial,
                closed: false,
                version: 0,
                signal: Rc::new(LocalSignal::new()),
                history,
            }),
        }
    }

    /// Closes the latch, firing the current episode's signal exactly once.
    ///
    /// Same contract as [`Latch::close`][crate::Latch::close]: `Some`
    /// replaces the payload, `None` preserves it, and an already closed
    /// latch reports [`AlreadyClosed`] without any state change.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyClosed`] when the latch was closed before this call.
    pub fn close(&self, payload: Option<Rc<T>>) -> Result<(), AlreadyClosed> {
        let signal = {
            let mut state = self.state.borrow_mut();

            if state.closed {
                return Err(AlreadyClosed::new());
            }

            state.closed = true;

            if payload.is_some() {
                state.replace_payload(payload);
            }

            Rc::clone(&state.signal)
        };

        signal.fire();

        Ok(())
    }

    /// Atomically replaces the payload (even with `None`) and closes.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyClosed`] when the latch was already closed; no state
    /// is modified in that case.
    pub fn set_and_close(&self, payload: Option<Rc<T>>) -> Result<(), AlreadyClosed> {
        let signal = {
            let mut state = self.state.borrow_mut();

            if state.closed {
                return Err(AlreadyClosed::new());
            }

            state.replace_payload(payload);
            state.closed = true;

            Rc::clone(&state.signal)
        };

        signal.fire();

        Ok(())
    }

    /// Atomic set-then-close; equivalent to
    /// [`set_and_close`](LocalLatch::set_and_close).
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyClosed`] when the latch was already closed; no state
    /// is modified in that case.
    pub fn close_with(&self, payload: Option<Rc<T>>) -> Result<(), AlreadyClosed> {
        self.set_and_close(payload)
    }

    /// Replaces the payload regardless of open/closed state, returning the
    /// previous payload.
    pub fn set(&self, payload: Option<Rc<T>>) -> Option<Rc<T>> {
        let mut state = self.state.borrow_mut();
        state.replace_payload(payload)
    }

    /// Like [`set`](LocalLatch::set) but a no-op when the latch is closed.
    ///
    /// Always returns the payload that was current at call time.
    pub fn set_if_open(&self, payload: Option<Rc<T>>) -> Option<Rc<T>> {
        let mut state = self.state.borrow_mut();

        if state.closed {
            return state.payload.clone();
        }

        state.replace_payload(payload)
    }

    /// Returns a snapshot of the current payload and the closed flag.
    #[must_use]
    pub fn read(&self) -> (Option<Rc<T>>, bool) {
        let state = self.state.borrow();
        (state.payload.clone(), state.closed)
    }

    /// Like [`read`](LocalLatch::read), additionally returning the payload's
    /// version.
    #[must_use]
    pub fn read_version(&self) -> (Option<Rc<T>>, bool, u64) {
        let state = self.state.borrow();
        (state.payload.clone(), state.closed, state.version)
    }

    /// Copies the retained payload history into `dest`, oldest entry first,
    /// returning how many entries were copied.
    pub fn read_past(&self, dest: &mut [LocalVersionedValue<T>]) -> usize {
        let state = self.state.borrow();
        state.history.copy_out(dest)
    }

    /// Reopens a closed latch without touching the payload; no-op when open.
    pub fn open(&self) {
        let mut state = self.state.borrow_mut();
        state.make_open();
    }

    /// Reopens the latch and atomically replaces the payload in one step.
    ///
    /// On an already open latch this is a plain payload replacement.
    pub fn reopen(&self, payload: Option<Rc<T>>) {
        let mut state = self.state.borrow_mut();
        state.replace_payload(payload);
        state.make_open();
    }

    /// Returns a future that completes once the current episode closes.
    ///
    /// Fetch the handle immediately before waiting; see
    /// [`Latch::when_closed`][crate::Latch::when_closed] for the episode
    /// scoping rules, which apply here unchanged.
    #[must_use]
    pub fn when_closed(&self) -> LocalClosed {
        let state = self.state.borrow();
        LocalClosed::new(Rc::clone(&state.signal))
    }
}

impl<T> Default for LocalLatch<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use static_assertions::assert_not_impl_any;
    use testing::poll_now;

    use super::*;

    assert_not_impl_any!(LocalLatch<i32>: Send, Sync);

    #[test]
    fn works_with_non_send_payload() {
        let latch = LocalLatch::new(Some(Rc::new(Rc::new(1))));

        latch.close(None).unwrap();

        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(**payload.unwrap(), 1);
    }

    #[test]
    fn close_is_idempotent() {
        let latch = LocalLatch::new(None);

        latch.close(Some(Rc::new(1))).unwrap();
        assert!(latch.close(Some(Rc::new(2))).is_err());

        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(*payload.unwrap(), 1);
    }

    #[test]
    fn waiters_complete_after_close() {
        let latch = LocalLatch::new(None);

        let mut first = latch.when_closed();
        let mut second = latch.when_closed();
        assert_eq!(poll_now(&mut first), Poll::Pending);
        assert_eq!(poll_now(&mut second), Poll::Pending);

        latch.close(Some(Rc::new("done"))).unwrap();

        assert_eq!(poll_now(&mut first), Poll::Ready(()));
        assert_eq!(poll_now(&mut second), Poll::Ready(()));

        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(*payload.unwrap(), "done");
    }

    #[test]
    fn reopen_starts_fresh_episode() {
        let latch = LocalLatch::new(Some(Rc::new('A')));

        latch.close(Some(Rc::new('B'))).unwrap();
        latch.reopen(Some(Rc::new('C')));

        let mut handle = latch.when_closed();
        assert_eq!(poll_now(&mut handle), Poll::Pending);

        let (payload, closed) = latch.read();
        assert!(!closed);
        assert_eq!(*payload.unwrap(), 'C');

        latch.close(Some(Rc::new('D'))).unwrap();
        assert_eq!(poll_now(&mut handle), Poll::Ready(()));
    }

    #[test]
    fn set_if_open_is_noop_on_closed_latch() {
        let latch = LocalLatch::new(Some(Rc::new(1)));
        latch.close(None).unwrap();

        let current = latch.set_if_open(Some(Rc::new(2)));
        assert_eq!(*current.unwrap(), 1);

        let (payload, _) = latch.read();
        assert_eq!(*payload.unwrap(), 1);
    }

    #[test]
    fn history_bound_holds() {
        let latch = LocalLatch::with_history(Some(Rc::new(0_u32)), 2);

        for value in 1..=4_u32 {
            latch.set(Some(Rc::new(value)));
        }

        let mut past = vec![LocalVersionedValue::default(); 4];
        let copied = latch.read_past(&mut past);
        assert_eq!(copied, 2);
        past.truncate(copied);

        let versions: Vec<u64> = past.iter().map(|entry| entry.version).collect();
        assert_eq!(versions, vec![3, 4]);
    }
}
