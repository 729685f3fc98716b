//! A worker reports its outcome through a latch; several observers wait.
//!
//! The worker closes through a [`CloseGuard`], so the latch closes on every
//! exit path and no observer is ever left hanging.

use std::sync::Arc;
use std::thread;

use futures::executor::block_on;
use value_latch::{CloseGuard, Latch};

#[derive(Debug)]
struct JobReport {
    attempts: u32,
    outcome: &'static str,
}

fn run_job(status: Arc<Latch<JobReport>>) {
    let mut guard = CloseGuard::new(status);

    // If the work below returned early or panicked, this payload would be
    // the one broadcast at scope exit.
    guard.set_payload(Arc::new(JobReport {
        attempts: 0,
        outcome: "aborted",
    }));

    // The actual work.
    let attempts = 3;

    guard.set_payload(Arc::new(JobReport {
        attempts,
        outcome: "completed",
    }));
    // Guard drops here, closing the latch with the staged report.
}

fn main() {
    println!("=== Threading Example ===");

    let status = Arc::new(Latch::<JobReport>::new(None));

    // Several independent observers; none of them consumes the notification.
    let observers: Vec<_> = (0..3)
        .map(|i| {
            let status = Arc::clone(&status);
            thread::spawn(move || {
                // Fetch the handle just in time, then wait, then read.
                block_on(status.when_closed());

                let (payload, closed) = status.read();
                assert!(closed);
                let report = payload.expect("the worker always stages a report");
                println!(
                    "observer {i}: job {} after {} attempts",
                    report.outcome, report.attempts
                );
            })
        })
        .collect();

    run_job(Arc::clone(&status));

    for observer in observers {
        observer.join().expect("observer thread should not panic");
    }

    println!("Example completed successfully!");
}
