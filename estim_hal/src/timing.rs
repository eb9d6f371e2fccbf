//! Precise delay primitives for the latch hold time.
//!
//! The latch-enable pulse is sub-millisecond, below the resolution an OS
//! sleep guarantees on a general-purpose kernel, so the default delay spins
//! on the monotonic clock. `SleepDelay` is available where the hold time is
//! long enough (or the platform has high-resolution timers).

use std::time::{Duration, Instant};

/// Blocking wait of a given number of microseconds.
pub trait PreciseDelay: Send {
    /// Block the calling thread for at least `us` microseconds.
    fn delay_us(&self, us: u64);
}

/// Busy-wait on `Instant` with a spin-loop hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinDelay;

impl PreciseDelay for SpinDelay {
    fn delay_us(&self, us: u64) {
        let deadline = Instant::now() + Duration::from_micros(us);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// OS sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepDelay;

impl PreciseDelay for SleepDelay {
    fn delay_us(&self, us: u64) {
        std::thread::sleep(Duration::from_micros(us));
    }
}
