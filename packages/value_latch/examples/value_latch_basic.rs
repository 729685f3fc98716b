//! Basic latch usage: establish a payload, poll it, close idempotently.

use std::sync::Arc;

use value_latch::Latch;

fn main() {
    println!("=== Basic Latch Example ===");

    // The payload can be established at creation...
    let status = Latch::new(Some(Arc::new(String::from("queued"))));

    // ...and read at any time, open or closed.
    let (payload, closed) = status.read();
    println!("before close: closed={closed}, payload={:?}", payload);

    // Replace the payload without closing; the previous payload comes back.
    let previous = status.set(Some(Arc::new(String::from("running"))));
    println!("replaced payload {:?}", previous);

    // Close without a payload: the established payload is preserved, so the
    // closing code does not need to know the correct value.
    status.close(None).unwrap();

    let (payload, closed) = status.read();
    println!("after close: closed={closed}, payload={:?}", payload);

    // Closing again is harmless and reports the condition.
    match status.close(Some(Arc::new(String::from("ignored")))) {
        Ok(()) => unreachable!("the latch was already closed"),
        Err(error) => println!("second close reported: {error}"),
    }

    // The payload of the losing close attempt was ignored.
    let (payload, _) = status.read();
    println!("payload is still {:?}", payload);

    println!("Example completed successfully!");
}
