//! Time management for sampling loops
//!
//! Provides the clock abstraction the measurement code is paced against:
//! - Monotonic microsecond time (sample cadence, zero-crossing timestamps)
//! - Millisecond time (snapshot timestamps, driver scheduling)
//! - A "wait until deadline" primitive, implemented per platform
//!
//! Bursts never sleep for a relative duration. Every tick has an absolute
//! deadline `t0 + i * interval`, so a slow conversion on one tick does not
//! push every following tick later.

use core::cell::Cell;

use crate::constants::time::US_PER_MS;

/// Timestamp in milliseconds (monotonic, since device boot or clock creation)
pub type Timestamp = u64;

/// Monotonic time in microseconds
pub type Micros = u64;

/// Monotonic time source with a deadline-wait primitive
///
/// ## Implementation Requirements
///
/// - `now_us()` must never decrease
/// - `wait_until_us()` must not return before `now_us() >= deadline`
///   (returning immediately for a past deadline is correct)
///
/// The default `wait_until_us` busy-polls `now_us()`. Platforms with a
/// precise timer interrupt or a high-resolution sleep should override it.
pub trait Clock {
    /// Current monotonic time in microseconds
    fn now_us(&self) -> Micros;

    /// Current monotonic time in milliseconds
    fn now_ms(&self) -> Timestamp {
        self.now_us() / US_PER_MS
    }

    /// Block until the monotonic clock reaches `deadline`
    fn wait_until_us(&self, deadline: Micros) {
        while self.now_us() < deadline {
            core::hint::spin_loop();
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> Micros {
        (**self).now_us()
    }

    fn now_ms(&self) -> Timestamp {
        (**self).now_ms()
    }

    fn wait_until_us(&self, deadline: Micros) {
        (**self).wait_until_us(deadline)
    }
}

/// Host clock backed by `std::time::Instant`
///
/// Long waits sleep the thread and finish with a short spin so the deadline
/// is hit within a few microseconds.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Waits longer than this are slept, not spun (µs)
    const SPIN_THRESHOLD_US: Micros = 2000;

    /// Clock starting at zero now
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_us(&self) -> Micros {
        self.origin.elapsed().as_micros() as Micros
    }

    fn wait_until_us(&self, deadline: Micros) {
        let now = self.now_us();
        if deadline > now + Self::SPIN_THRESHOLD_US {
            let sleep_us = deadline - now - Self::SPIN_THRESHOLD_US / 2;
            std::thread::sleep(std::time::Duration::from_micros(sleep_us));
        }
        while self.now_us() < deadline {
            core::hint::spin_loop();
        }
    }
}

/// Simulated clock for tests and bench-top simulation
///
/// Time only moves when told to: `wait_until_us` jumps straight to the
/// deadline, and sample sources may charge a conversion time with
/// [`SimClock::advance_us`]. Shared by reference, so it uses a `Cell`.
#[derive(Debug, Default)]
pub struct SimClock {
    now_us: Cell<Micros>,
}

impl SimClock {
    /// Clock starting at `start_us`
    pub fn new(start_us: Micros) -> Self {
        Self { now_us: Cell::new(start_us) }
    }

    /// Move time forward
    pub fn advance_us(&self, us: Micros) {
        self.now_us.set(self.now_us.get().saturating_add(us));
    }

    /// Move time forward in milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms.saturating_mul(US_PER_MS));
    }

    /// Set the absolute time. Ignored if it would go backwards.
    pub fn set_us(&self, us: Micros) {
        if us > self.now_us.get() {
            self.now_us.set(us);
        }
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> Micros {
        self.now_us.get()
    }

    fn wait_until_us(&self, deadline: Micros) {
        self.set_us(deadline);
    }
}

/// Absolute-deadline cadence for one sampling burst
///
/// Tick `i` is due at `start + i * interval`. A tick that is already past
/// its deadline by more than a full interval is counted as late; the burst
/// keeps going because aborting would discard the partial RMS sum.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    start_us: Micros,
    interval_us: Micros,
    late_ticks: u32,
    max_lateness_us: Micros,
}

impl Pacer {
    /// Start a cadence at the current clock time
    pub fn start<C: Clock>(clock: &C, interval_us: Micros) -> Self {
        Self {
            start_us: clock.now_us(),
            interval_us,
            late_ticks: 0,
            max_lateness_us: 0,
        }
    }

    /// Deadline of tick `tick`
    pub fn deadline(&self, tick: usize) -> Micros {
        self.start_us
            .saturating_add((tick as Micros).saturating_mul(self.interval_us))
    }

    /// Block until tick `tick` is due
    pub fn wait_for_tick<C: Clock>(&mut self, clock: &C, tick: usize) {
        let deadline = self.deadline(tick);
        let now = clock.now_us();
        if now < deadline {
            clock.wait_until_us(deadline);
            return;
        }

        let lateness = now - deadline;
        if lateness > self.interval_us {
            self.late_ticks += 1;
            self.max_lateness_us = self.max_lateness_us.max(lateness);
        }
    }

    /// Time the cadence started
    pub fn start_us(&self) -> Micros {
        self.start_us
    }

    /// Interval between ticks
    pub fn interval_us(&self) -> Micros {
        self.interval_us
    }

    /// Ticks that started more than one interval after their deadline
    pub fn late_ticks(&self) -> u32 {
        self.late_ticks
    }

    /// Worst lateness seen among late ticks
    pub fn max_lateness_us(&self) -> Micros {
        self.max_lateness_us
    }
}
