//! Wall clock and tick sources for chunk headers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Ticks per second of [`monotonic_ticks`]. One tick is one nanosecond.
pub const TICKS_PER_SECOND: i64 = 1_000_000_000;

/// Nanoseconds since the Unix epoch, or 0 if the clock is before it.
pub fn wall_clock_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Current value of `CLOCK_MONOTONIC` in nanoseconds, or 0 if the clock
/// cannot be read.
pub fn monotonic_ticks() -> i64 {
    get_clock_value(libc::CLOCK_MONOTONIC)
}

fn get_clock_value(clock_id: libc::c_int) -> i64 {
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    if unsafe { libc::clock_gettime(clock_id, &mut ts) } != 0 {
        return 0;
    }
    (ts.tv_sec as i64 * TICKS_PER_SECOND) + ts.tv_nsec as i64
}
