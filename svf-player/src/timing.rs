//! Waiting on a monotonic clock with bounded overshoot.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Blocks until `deadline`.
///
/// Waits longer than `spin_threshold` sleep for all but the last `spin_threshold` and spin
/// on [`Instant::now`] for the remainder, so scheduler latency is absorbed by the sleep
/// and the deadline itself is hit within a few microseconds.
pub fn wait_until(deadline: Instant, spin_threshold: Duration) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        let remaining = deadline - now;
        if remaining > spin_threshold {
            thread::sleep(remaining - spin_threshold);
        } else {
            std::hint::spin_loop();
        }
    }
}
