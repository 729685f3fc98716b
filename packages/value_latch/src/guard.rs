//! Scope-exit closing for latches.

use std::sync::Arc;

use crate::Latch;

/// Closes a latch when the guard is dropped, so waiters are released no
/// matter how the guarded scope exits.
///
/// This packages the common calling convention where a worker must report
/// completion on every path - early error returns, panics and the ordinary
/// success path alike. The guard holds a staged payload for the drop-time
/// close; with none staged, the close preserves whatever payload the latch
/// already carries (the [`Latch::close`]`(None)` behavior).
///
/// Dropping the guard discards an [`AlreadyClosed`][crate::AlreadyClosed]
/// outcome: if some other path closed the latch first, there is nothing left
/// to report. Closing explicitly before the guard drops is therefore fine.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use value_latch::{CloseGuard, Latch};
///
/// fn run_job(status: Arc<Latch<String>>) {
///     let mut guard = CloseGuard::new(Arc::clone(&status));
///     guard.set_payload(Arc::new("failed before starting".to_string()));
///
///     // ... the actual work; any early return or panic still closes ...
///
///     guard.set_payload(Arc::new("completed".to_string()));
///     // Guard drops here and closes with the staged payload.
/// }
///
/// let status = Arc::new(Latch::new(None));
/// run_job(Arc::clone(&status));
///
/// let (payload, closed) = status.read();
/// assert!(closed);
/// assert_eq!(*payload.unwrap(), "completed");
/// ```
#[derive(Debug)]
pub struct CloseGuard<T>
where
    T: Send + Sync,
{
    latch: Arc<Latch<T>>,
    payload: Option<Arc<T>>,
    armed: bool,
}

impl<T> CloseGuard<T>
where
    T: Send + Sync,
{
    /// Arms a guard that will close `latch` when dropped.
    #[must_use]
    pub fn new(latch: Arc<Latch<T>>) -> Self {
        Self {
            latch,
            payload: None,
            armed: true,
        }
    }

    /// Stages the payload the drop-time close will carry, replacing any
    /// previously staged one.
    pub fn set_payload(&mut self, payload: Arc<T>) {
        self.payload = Some(payload);
    }

    /// Removes the staged payload; the drop-time close will then preserve
    /// the payload already stored in the latch.
    pub fn clear_payload(&mut self) {
        self.payload = None;
    }

    /// Consumes the guard without closing the latch.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for CloseGuard<T>
where
    T: Send + Sync,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        drop(self.latch.close(self.payload.take()));
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(CloseGuard<i32>: Send);

    #[test]
    fn drop_closes_with_staged_payload() {
        let latch = Arc::new(Latch::new(None));

        {
            let mut guard = CloseGuard::new(Arc::clone(&latch));
            guard.set_payload(Arc::new(5));
        }

        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(*payload.unwrap(), 5);
    }

    #[test]
    fn drop_without_staged_payload_preserves_existing() {
        let latch = Arc::new(Latch::new(Some(Arc::new("initial"))));

        {
            let _guard = CloseGuard::new(Arc::clone(&latch));
        }

        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(*payload.unwrap(), "initial");
    }

    #[test]
    fn cleared_payload_behaves_like_none() {
        let latch = Arc::new(Latch::new(Some(Arc::new(1))));

        {
            let mut guard = CloseGuard::new(Arc::clone(&latch));
            guard.set_payload(Arc::new(2));
            guard.clear_payload();
        }

        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(*payload.unwrap(), 1);
    }

    #[test]
    fn disarmed_guard_leaves_latch_open() {
        let latch = Arc::new(Latch::<u8>::new(None));

        let guard = CloseGuard::new(Arc::clone(&latch));
        guard.disarm();

        let (_, closed) = latch.read();
        assert!(!closed);
    }

    #[test]
    fn guard_tolerates_latch_closed_elsewhere() {
        let latch = Arc::new(Latch::new(None));

        {
            let mut guard = CloseGuard::new(Arc::clone(&latch));
            guard.set_payload(Arc::new(2));
            latch.close(Some(Arc::new(1))).unwrap();
        }

        // The explicit close won; the guard's staged payload was discarded.
        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(*payload.unwrap(), 1);
    }

    #[test]
    fn guard_closes_on_panic_path() {
        let latch = Arc::new(Latch::new(None));

        let result = std::panic::catch_unwind({
            let latch = Arc::clone(&latch);
            move || {
                let mut guard = CloseGuard::new(latch);
                guard.set_payload(Arc::new("went wrong"));
                panic!("job failed");
            }
        });
        assert!(result.is_err());

        let (payload, closed) = latch.read();
        assert!(closed);
        assert_eq!(*payload.unwrap(), "went wrong");
    }
}
