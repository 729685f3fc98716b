//! Private helpers for testing and examples in this workspace.

use std::future::Future;
use std::pin::Pin;
use std::process;
use std::sync::mpsc;
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::Duration;

/// Fails a hung test instead of letting the whole test run stall.
///
/// The closure runs on the calling thread while a watchdog thread counts down.
/// If the closure has not returned when the deadline expires, the process is
/// aborted - a hanging synchronization test cannot be unwound, so aborting is
/// the only way to keep CI moving.
///
/// A closure that panics fails the test in the ordinary way; the watchdog only
/// intervenes on an actual hang.
///
/// # Panics
///
/// Panics if the watchdog thread itself misbehaves, which is not expected.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let value = with_watchdog(|| 2 + 2);
/// assert_eq!(value, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R,
{
    let (disarm_tx, disarm_rx) = mpsc::channel::<()>();

    let watchdog = thread::spawn(move || {
        match disarm_rx.recv_timeout(watchdog_timeout()) {
            // Disarmed or disconnected - the test finished (or panicked) in time.
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {
                eprintln!("test exceeded the watchdog timeout; aborting the process");
                process::abort();
            }
        }
    });

    let result = test_fn();

    disarm_tx
        .send(())
        .expect("watchdog thread exited before being disarmed");
    watchdog.join().expect("watchdog thread should not panic");

    result
}

// Miri executes thread synchronization dramatically slower, so give it more room.
fn watchdog_timeout() -> Duration {
    if cfg!(miri) {
        Duration::from_secs(120)
    } else {
        Duration::from_secs(30)
    }
}

/// Polls a future exactly once with a no-op waker.
///
/// Useful for asserting that a future is (or is not yet) ready without
/// involving an executor. The no-op waker means a `Pending` result will not
/// lead to any later wakeup; callers re-poll manually when they expect
/// progress.
pub fn poll_now<F>(fut: &mut F) -> Poll<F::Output>
where
    F: Future + Unpin,
{
    let mut cx = Context::from_waker(Waker::noop());
    Pin::new(fut).poll(&mut cx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_passes_through_return_value() {
        let result = with_watchdog(|| "finished");
        assert_eq!(result, "finished");
    }

    #[test]
    fn watchdog_allows_consecutive_runs() {
        for i in 0..3 {
            let result = with_watchdog(move || i * 2);
            assert_eq!(result, i * 2);
        }
    }

    #[test]
    fn poll_now_reports_ready_future() {
        let mut fut = std::future::ready(5);
        assert_eq!(poll_now(&mut fut), Poll::Ready(5));
    }

    #[test]
    fn poll_now_reports_pending_future() {
        let mut fut = std::future::pending::<()>();
        assert_eq!(poll_now(&mut fut), Poll::Pending);
    }
}
