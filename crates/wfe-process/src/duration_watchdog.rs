//! Pure wall-clock watchdog logic for `maxDuration` enforcement, kept
//! separate from process I/O so it can be unit tested without spawning
//! anything. Mirrors the teacher's idle-timeout check shape: a single
//! pure function over an elapsed-time snapshot, called from a poll loop.

use std::time::{Duration, Instant};

/// True when a task submitted at `submitted_at` has outrun `max_duration`.
///
/// `max_duration` of `None` means no limit; such tasks never exceed it.
pub fn duration_exceeded(submitted_at: Instant, max_duration: Option<Duration>) -> bool {
    match max_duration {
        Some(limit) => submitted_at.elapsed() >= limit,
        None => false,
    }
}
