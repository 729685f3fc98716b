//! Episode lifecycle: close, reopen and close again, with version history.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use value_latch::{Latch, VersionedValue};

fn poll_once<F>(fut: &mut F) -> Poll<F::Output>
where
    F: Future + Unpin,
{
    Pin::new(fut).poll(&mut Context::from_waker(Waker::noop()))
}

fn main() {
    println!("=== Reopen and History Example ===");

    // Keep the last four payload versions around.
    let latch = Latch::with_history(Some(Arc::new("episode 1 starting")), 4);

    latch.set(Some(Arc::new("episode 1 making progress")));
    latch.close(Some(Arc::new("episode 1 done"))).unwrap();

    let (payload, closed, version) = latch.read_version();
    println!("closed={closed}, version={version}, payload={:?}", payload);

    // Re-arm for a second episode. The old episode's handles stay fired;
    // new handles start unfired.
    latch.reopen(Some(Arc::new("episode 2 starting")));

    let mut handle = latch.when_closed();
    println!(
        "fresh handle after reopen is {}",
        match poll_once(&mut handle) {
            Poll::Pending => "unfired",
            Poll::Ready(()) => "fired",
        }
    );

    latch.close(Some(Arc::new("episode 2 done"))).unwrap();

    // Walk the retained history, oldest first.
    let mut past = vec![VersionedValue::default(); 4];
    let copied = latch.read_past(&mut past);
    past.truncate(copied);

    println!("retained {copied} versions:");
    for entry in &past {
        println!("  v{}: {:?}", entry.version, entry.value);
    }

    println!("Example completed successfully!");
}
