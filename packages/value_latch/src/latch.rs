//! Thread-safe value-carrying close latch.

use std::mem;
use std::sync::{Arc, Mutex};

use crate::AlreadyClosed;
use crate::constants::ERR_POISONED_LOCK;
use crate::history::{History, VersionedValue};
use crate::signal::{Closed, Signal};

/// A broadcastable close latch that carries a payload value.
///
/// One writer announces "done" exactly once per open episode, to an unbounded
/// number of readers, while also conveying a payload - not just the bare fact
/// of the transition. Closing is idempotent: repeated or racing close attempts
/// from multiple cooperating paths (say, a success path plus a cleanup path
/// that always runs) never conflict and never fire the notification twice.
///
/// The payload can be established at creation, updated in place with
/// [`set`](Latch::set) / [`set_if_open`](Latch::set_if_open), or supplied
/// atomically at close time. Payloads are handled by shared reference
/// (`Arc<T>`): they are replaced, never mutated, and replacing hands the
/// previous `Arc` back to the caller.
///
/// Readers either poll with [`read`](Latch::read) or suspend on the future
/// returned by [`when_closed`](Latch::when_closed) and read afterwards. The
/// two-step notify-then-read protocol is deliberate: a fired one-shot signal
/// alone cannot carry a non-trivial value, only the fact of its firing.
///
/// A closed latch can be re-armed with [`open`](Latch::open) or
/// [`reopen`](Latch::reopen), which starts a new episode with a fresh
/// notification signal.
///
/// For single-threaded usage, see [`LocalLatch`][crate::LocalLatch], which has
/// lower overhead and accepts `!Send` payload types.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use value_latch::Latch;
///
/// let status = Latch::new(Some(Arc::new("starting")));
///
/// // Poll at any time, before or after the close.
/// let (payload, closed) = status.read();
/// assert!(!closed);
/// assert_eq!(*payload.unwrap(), "starting");
///
/// status.close(Some(Arc::new("finished"))).unwrap();
///
/// let (payload, closed) = status.read();
/// assert!(closed);
/// assert_eq!(*payload.unwrap(), "finished");
/// ```
#[derive(Debug)]
pub struct Latch<T>
where
    T: Send + Sync,
{
    state: Mutex<LatchState<T>>,
}

#[derive(Debug)]
struct LatchState<T> {
    payload: Option<Arc<T>>,
    closed: bool,

    /// Bumped on every payload replacement, never on close-without-payload.
    version: u64,

    /// The active episode's signal. Replaced with a fresh unfired one on
    /// every closed -> open transition; never reused across episodes.
    signal: Arc<Signal>,

    history: History<VersionedValue<T>>,
}

impl<T> LatchState<T> {
    /// Replaces the payload, bumps the version and records the new state in
    /// the history ring. Returns the previous payload.
    fn replace_payload(&mut self, payload: Option<Arc<T>>) -> Option<Arc<T>> {
        self.version += 1;

        let previous = mem::replace(&mut self.payload, payload);

        self.history.record(VersionedValue {
            version: self.version,
            value: self.payload.clone(),
        });

        previous
    }

    /// Re-arms a closed latch with a fresh signal. No-op when already open.
    fn make_open(&mut self) {
        if !self.closed {
            return;
        }

        self.closed = false;
        self.signal = Arc::new(Signal::new());
    }
}

impl<T> Latch<T>
where
    T: Send + Sync,
{
    /// Creates a new open latch with the given initial payload and no
    /// version history.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use value_latch::Latch;
    ///
    /// let with_payload = Latch::new(Some(Arc::new(42)));
    /// let empty = Latch::<u32>::new(None);
    /// ```
    #[must_use]
    pub fn new(initial: Option<Arc<T>>) -> Self {
        Self::with_history(initial, 0)
    }

    /// Creates a new open latch that retains the last `retain` payload
    /// versions for [`read_past`](Latch::read_past).
    ///
    /// With `retain > 0` the history starts out seeded with the initial
    /// payload at version 0. With `retain == 0` this is equivalent to
    /// [`new`](Latch::new).
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use value_latch::{Latch, VersionedValue};
    ///
    /// let latch = Latch::with_history(Some(Arc::new(0)), 4);
    /// latch.set(Some(Arc::new(1)));
    ///
    /// let mut past = vec![VersionedValue::default(); 4];
    /// let copied = latch.read_past(&mut past);
    /// assert_eq!(copied, 2);
    /// ```
    #[must_use]
    pub fn with_history(initial: Option<Arc<T>>, retain: usize) -> Self {
        let mut history = History::new(retain);
        history.record(VersionedValue {
            version: 0,
            value: initial.clone(),
        });

        Self {
            state: Mutex::new(LatchState {
                payload: initial,
                closed: false,
                version: 0,
                signal: Arc::new(Signal::new()),
                history,
            }),
        }
    }

    /// Closes the latch, firing the current episode's signal exactly once.
    ///
    /// With `Some(payload)`, the stored payload is replaced (bumping the
    /// version) before the signal fires. With `None`, the previously stored
    /// payload is preserved unchanged - the closing code can stay ignorant of
    /// the correct payload when it has already been established via
    /// [`new`](Latch::new) or [`set`](Latch::set).
    ///
    /// Returns [`AlreadyClosed`] if the latch is already closed; the state is
    /// left untouched and the payload argument is ignored. Callers that only
    /// care that the latch ends up closed can drop the result.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyClosed`] when the latch was closed before this call.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use value_latch::Latch;
    ///
    /// let latch = Latch::new(Some(Arc::new("established")));
    ///
    /// latch.close(None).unwrap();
    ///
    /// // The earlier payload survived the payload-less close.
    /// let (payload, closed) = latch.read();
    /// assert!(closed);
    /// assert_eq!(*payload.unwrap(), "established");
    ///
    /// // Closing again reports the condition without changing anything.
    /// assert!(latch.close(Some(Arc::new("too late"))).is_err());
    /// ```
    #[cfg_attr(test, mutants::skip)] // Critical primitive - causes test timeouts if tampered.
    pub fn close(&self, payload: Option<Arc<T>>) -> Result<(), AlreadyClosed> {
        let signal = {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

            if state.closed {
                return Err(AlreadyClosed::new());
            }

            // Order matters: `closed` is published before the signal fires,
            // so a waiter that saw the firing and then reads is guaranteed
            // to observe the closed state.
            state.closed = true;

            if payload.is_some() {
                state.replace_payload(payload);
            }

            Arc::clone(&state.signal)
        };

        // The wakeups run outside our lock.
        signal.fire();

        Ok(())
    }

    /// Atomically replaces the payload and closes the latch.
    ///
    /// Unlike [`close`](Latch::close), the payload is always stored, even
    /// when it is `None` - this is the way to broadcast an absent payload
    /// over a latch that previously carried one.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyClosed`] when the latch was already closed; no state
    /// is modified in that case.
    pub fn set_and_close(&self, payload: Option<Arc<T>>) -> Result<(), AlreadyClosed> {
        let signal = {
            let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

            if state.closed {
                return Err(AlreadyClosed::new());
            }

            state.replace_payload(payload);
            state.closed = true;

            Arc::clone(&state.signal)
        };

        signal.fire();

        Ok(())
    }

    /// Atomic set-then-close; equivalent to [`set_and_close`](Latch::set_and_close).
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyClosed`] when the latch was already closed; no state
    /// is modified in that case.
    pub fn close_with(&self, payload: Option<Arc<T>>) -> Result<(), AlreadyClosed> {
        self.set_and_close(payload)
    }

    /// Replaces the payload regardless of open/closed state, returning the
    /// previous payload.
    ///
    /// Setting on a closed latch is valid but sends no retroactive
    /// notification, so readers that already observed the close may have read
    /// the earlier payload. When every non-close mutation goes through
    /// [`set_if_open`](Latch::set_if_open) instead, all readers are
    /// guaranteed to observe the same payload after the closing transition.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use value_latch::Latch;
    ///
    /// let latch = Latch::new(Some(Arc::new(1)));
    /// let previous = latch.set(Some(Arc::new(2)));
    /// assert_eq!(*previous.unwrap(), 1);
    /// ```
    pub fn set(&self, payload: Option<Arc<T>>) -> Option<Arc<T>> {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        state.replace_payload(payload)
    }

    /// Like [`set`](Latch::set) but a no-op when the latch is closed.
    ///
    /// Always returns the payload that was current at call time: the
    /// replaced payload when open, the unchanged payload when closed.
    pub fn set_if_open(&self, payload: Option<Arc<T>>) -> Option<Arc<T>> {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);

        if state.closed {
            return state.payload.clone();
        }

        state.replace_payload(payload)
    }

    /// Returns a snapshot of the current payload and the closed flag.
    ///
    /// Valid at any time, before or after closing; never blocks. An open
    /// latch may well carry a meaningful payload (from creation or a
    /// [`set`](Latch::set)); it is up to the caller to assign meaning to the
    /// combination. Consistency between payload and flag holds within one
    /// call, not across separate calls.
    ///
    /// To wait for the close instead of polling, suspend on
    /// [`when_closed`](Latch::when_closed) and read afterwards.
    #[must_use]
    pub fn read(&self) -> (Option<Arc<T>>, bool) {
        let state = self.state.lock().expect(ERR_POISONED_LOCK);
        (state.payload.clone(), state.closed)
    }

    /// Like [`read`](Latch::read), additionally returning the payload's
    /// version so a caller can tell whether it has seen the latest mutation.
    #[must_use]
    pub fn read_version(&self) -> (Option<Arc<T>>, bool, u64) {
        let state = self.state.lock().expect(ERR_POISONED_LOCK);
        (state.payload.clone(), state.closed, state.version)
    }

    /// Copies the retained payload history into `dest`, oldest entry first,
    /// returning how many entries were copied.
    ///
    /// Returns 0 when the latch was created without history. Callers
    /// typically truncate their buffer to the returned count afterwards.
    pub fn read_past(&self, dest: &mut [VersionedValue<T>]) -> usize {
        let state = self.state.lock().expect(ERR_POISONED_LOCK);
        state.history.copy_out(dest)
    }

    /// Reopens a closed latch without touching the payload, starting a new
    /// episode with a fresh unfired signal. No-op when already open.
    ///
    /// Handles obtained from [`when_closed`](Latch::when_closed) before the
    /// reopen stay in their old episode's terminal state; waiters must
    /// re-fetch the handle for the new episode.
    pub fn open(&self) {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        state.make_open();
    }

    /// Reopens the latch and atomically replaces the payload (bumping the
    /// version) in one step.
    ///
    /// On an already open latch this is a plain payload replacement,
    /// equivalent to [`set`](Latch::set).
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use value_latch::Latch;
    ///
    /// let latch = Latch::new(Some(Arc::new("first run")));
    /// latch.close(None).unwrap();
    ///
    /// latch.reopen(Some(Arc::new("second run")));
    ///
    /// let (payload, closed) = latch.read();
    /// assert!(!closed);
    /// assert_eq!(*payload.unwrap(), "second run");
    /// ```
    pub fn reopen(&self, payload: Option<Arc<T>>) {
        let mut state = self.state.lock().expect(ERR_POISONED_LOCK);
        state.replace_payload(payload);
        state.make_open();
    }

    /// Returns a future that completes once the current episode closes.
    ///
    /// Any number of waiters can hold such futures at the same time; all of
    /// them complete on the close and none consumes the notification. Always
    /// fetch the handle immediately before waiting - caching one across a
    /// reopen leaves the waiter on a retired episode.
    ///
    /// The latch itself never suspends; waiting happens entirely in the
    /// caller's own select/timeout construct around the returned future.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::thread;
    ///
    /// use futures::executor::block_on;
    /// use value_latch::Latch;
    ///
    /// let latch = Arc::new(Latch::<String>::new(None));
    ///
    /// let waiter = {
    ///     let latch = Arc::clone(&latch);
    ///     thread::spawn(move || {
    ///         block_on(latch.when_closed());
    ///         let (payload, closed) = latch.read();
    ///         assert!(closed);
    ///         payload.unwrap()
    ///     })
    /// };
    ///
    /// latch.close(Some(Arc::new("done".to_string()))).unwrap();
    /// assert_eq!(*waiter.join().unwrap(), "done");
    /// ```
    #[must_use]
    pub fn when_closed(&self) -> Closed {
        let state = self.state.lock().expect(ERR_POISONED_LOCK);
        Closed::new(Arc::clone(&state.signal))
    }
}

impl<T> Default for Latch<T>
where
    T: Send + Sync,
{
    fn default() -> Self {
        Self::new(None)
    }
}
