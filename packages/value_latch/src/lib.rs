//! Broadcast-on-close latch that carries a value.
//!
//! A latch lets one writer announce "done" exactly once to an unbounded number
//! of readers, while also conveying a payload value - not just a placeholder
//! notification. Closing is idempotent, so coordinating shutdown from multiple
//! origins (a success path plus a deferred cleanup path, racing workers, a
//! supervisor) needs no further choreography: every close attempt after the
//! first simply reports [`AlreadyClosed`] and changes nothing.
//!
//! Both thread-safe and single-threaded variants are available:
//! - [`Latch<T>`] with [`Closed`] - thread-safe, payloads shared via `Arc`
//! - [`LocalLatch<T>`] with [`LocalClosed`] - single-threaded, lower overhead,
//!   payloads shared via `Rc`
//!
//! The payload can be established at creation, replaced with
//! [`Latch::set`] / [`Latch::set_if_open`], or supplied atomically at close
//! time. A latch created with [`Latch::with_history`] additionally retains a
//! bounded ring of past payload versions for [`Latch::read_past`]. A closed
//! latch can be re-armed with [`Latch::open`] or [`Latch::reopen`].
//!
//! # Polling example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use value_latch::Latch;
//!
//! let status = Latch::new(Some(Arc::new(String::from("working"))));
//!
//! // Read at any time; the payload may be meaningful before the close.
//! let (payload, closed) = status.read();
//! assert!(!closed);
//! assert_eq!(*payload.unwrap(), "working");
//!
//! status.close(Some(Arc::new(String::from("done")))).unwrap();
//!
//! let (payload, closed) = status.read();
//! assert!(closed);
//! assert_eq!(*payload.unwrap(), "done");
//! ```
//!
//! # Waiting example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use futures::executor::block_on;
//! use value_latch::Latch;
//!
//! let status = Arc::new(Latch::<i32>::new(None));
//!
//! let waiter = {
//!     let status = Arc::clone(&status);
//!     thread::spawn(move || {
//!         // Two steps: wait for the notification, then read the payload.
//!         // A fired signal alone carries no value, only the fact of firing.
//!         block_on(status.when_closed());
//!         let (payload, _closed) = status.read();
//!         *payload.unwrap()
//!     })
//! };
//!
//! status.close(Some(Arc::new(42))).unwrap();
//! assert_eq!(waiter.join().unwrap(), 42);
//! ```
//!
//! # Single-threaded example
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use value_latch::LocalLatch;
//!
//! let status = LocalLatch::new(Some(Rc::new(1)));
//! status.close(Some(Rc::new(2))).unwrap();
//!
//! let (payload, closed) = status.read();
//! assert!(closed);
//! assert_eq!(*payload.unwrap(), 2);
//! ```
//!
//! There is no built-in timeout: combine the future returned by
//! [`Latch::when_closed`] with your own select/timeout construct. The latch
//! never blocks internally and never holds its lock across a suspension
//! point.

mod constants;
mod error;
mod guard;
mod history;
mod latch;
mod local_latch;
mod local_signal;
mod signal;

pub use error::AlreadyClosed;
pub use guard::CloseGuard;
pub use history::{LocalVersionedValue, VersionedValue};
pub use latch::Latch;
pub use local_latch::LocalLatch;
pub use local_signal::LocalClosed;
pub use signal::Closed;
