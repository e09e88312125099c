//! Cooperative poll loop.
//!
//! Single-threaded, round-robin scheduling: every registered component's
//! `poll()` runs exactly once per cycle, in registration order, at a
//! roughly fixed cycle period. No `poll()` may block; non-blocking I/O
//! with "no data ready" is a normal silent return.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ cycle N                                             │
//! │  watchdog → shutdown timer → heartbeat →            │
//! │  gateway → pid bridge → power engine → sleep        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway and bridge are registered before the engine so a command
//! received this cycle is reflected in the engine's decision this cycle,
//! not the next one.
//!
//! Timestamps are `u32` milliseconds that wrap roughly every 49.7 days;
//! all comparisons go through [`ticks_diff`] / [`due`], never raw
//! subtraction, so wraparound is harmless.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::bus::Bus;

// ---------------------------------------------------------------------------
// Wraparound-safe tick arithmetic
// ---------------------------------------------------------------------------

/// Signed difference `a - b` on the wrapping millisecond counter.
/// Valid while the true distance is under ~24.8 days.
pub fn ticks_diff(a: u32, b: u32) -> i32 {
    a.wrapping_sub(b) as i32
}

/// Deadline arithmetic on the wrapping counter.
pub fn ticks_add(t: u32, offset_ms: u32) -> u32 {
    t.wrapping_add(offset_ms)
}

/// True iff `now` has reached `deadline`.
pub fn due(now: u32, deadline: u32) -> bool {
    ticks_diff(now, deadline) >= 0
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic millisecond source. Behind a trait so tests drive time
/// explicitly instead of sleeping.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Host clock backed by [`Instant`]. Truncation to `u32` supplies the
/// wraparound the tick helpers are built for.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Hand-cranked clock for tests. Clones share the same underlying time.
#[derive(Clone)]
pub struct ManualClock(Rc<Cell<u32>>);

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: u32) {
        self.0.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

// ---------------------------------------------------------------------------
// Poll context
// ---------------------------------------------------------------------------

/// Services handed to a component during its poll slot: the shared bus,
/// the monotonic clock, and the shutdown request flag.
///
/// The bus lives here so that exactly one component can touch it at a
/// time; no shared pointers cross component boundaries.
pub struct PollCtx {
    /// The shared message bus. Topics are created once at construction
    /// and live for the process lifetime.
    pub bus: Bus,
    clock: Box<dyn Clock>,
    shutdown: bool,
}

impl PollCtx {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            bus: Bus::new(now),
            clock,
            shutdown: false,
        }
    }

    /// Current monotonic time in milliseconds (wrapping).
    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    /// True iff the current time has reached `deadline_ms`.
    pub fn due(&self, deadline_ms: u32) -> bool {
        due(self.now_ms(), deadline_ms)
    }

    /// A deadline `offset_ms` from now.
    pub fn schedule_after(&self, offset_ms: u32) -> u32 {
        ticks_add(self.now_ms(), offset_ms)
    }

    /// Request an orderly process shutdown at the end of this cycle.
    pub fn request_shutdown(&mut self) {
        if !self.shutdown {
            info!("shutdown requested");
        }
        self.shutdown = true;
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
    }
}

// ---------------------------------------------------------------------------
// Pollable contract
// ---------------------------------------------------------------------------

/// A component driven by the poll loop.
///
/// `poll` runs once per cycle and must not block. `shutdown` runs once,
/// in registration order, after shutdown has been requested.
pub trait Pollable {
    fn poll(&mut self, ctx: &mut PollCtx);

    fn shutdown(&mut self, _ctx: &mut PollCtx) {}
}

// ---------------------------------------------------------------------------
// The loop
// ---------------------------------------------------------------------------

/// Owns the registered components and the poll context, and runs the
/// cooperative cycle until shutdown is requested.
pub struct PollLooper {
    poll_ms: u32,
    components: Vec<Box<dyn Pollable>>,
    ctx: PollCtx,
}

impl PollLooper {
    pub fn new(poll_ms: u32, clock: Box<dyn Clock>) -> Self {
        Self {
            poll_ms,
            components: Vec::new(),
            ctx: PollCtx::new(clock),
        }
    }

    /// Register a component. Registration order is poll order.
    pub fn add(&mut self, component: Box<dyn Pollable>) {
        self.components.push(component);
    }

    pub fn ctx(&self) -> &PollCtx {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut PollCtx {
        &mut self.ctx
    }

    /// Run a single cycle: poll every component once, in order.
    pub fn run_cycle(&mut self) {
        for component in &mut self.components {
            component.poll(&mut self.ctx);
        }
    }

    /// Run cycles at the configured period until shutdown is requested,
    /// then give every component its shutdown call, in order.
    pub fn run(&mut self) {
        info!("poll loop started ({} ms cycle)", self.poll_ms);
        while !self.ctx.shutdown_requested() {
            let cycle_start = self.ctx.now_ms();
            self.run_cycle();

            let elapsed = ticks_diff(self.ctx.now_ms(), cycle_start);
            if elapsed >= 0 && (elapsed as u32) < self.poll_ms {
                std::thread::sleep(Duration::from_millis(u64::from(self.poll_ms - elapsed as u32)));
            } else {
                debug!("cycle overran: {} ms", elapsed);
            }
        }
        info!("poll loop stopping");
        for component in &mut self.components {
            component.shutdown(&mut self.ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn ticks_diff_across_wraparound() {
        let before = u32::MAX - 10;
        let after = before.wrapping_add(25);
        assert_eq!(ticks_diff(after, before), 25);
        assert_eq!(ticks_diff(before, after), -25);
    }

    #[test]
    fn due_is_wraparound_safe() {
        let deadline = ticks_add(u32::MAX - 5, 20); // wraps to 14
        assert!(!due(u32::MAX - 5, deadline));
        assert!(!due(u32::MAX, deadline));
        assert!(due(14, deadline));
        assert!(due(15, deadline));
    }

    #[test]
    fn manual_clock_shares_time_across_clones() {
        let clock = ManualClock::new(100);
        let other = clock.clone();
        clock.advance(50);
        assert_eq!(other.now_ms(), 150);
    }

    #[test]
    fn schedule_after_and_due() {
        let clock = ManualClock::new(0);
        let mut ctx = PollCtx::new(Box::new(clock.clone()));
        let deadline = ctx.schedule_after(30);
        assert!(!ctx.due(deadline));
        clock.advance(30);
        assert!(ctx.due(deadline));
        let _ = &mut ctx;
    }

    struct Recorder {
        tag: &'static str,
        seen: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Pollable for Recorder {
        fn poll(&mut self, _ctx: &mut PollCtx) {
            self.seen.borrow_mut().push(self.tag);
        }
    }

    #[test]
    fn components_poll_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let clock = ManualClock::new(0);
        let mut looper = PollLooper::new(100, Box::new(clock));
        for tag in ["gateway", "bridge", "engine"] {
            looper.add(Box::new(Recorder {
                tag,
                seen: Rc::clone(&seen),
            }));
        }
        looper.run_cycle();
        looper.run_cycle();
        assert_eq!(
            *seen.borrow(),
            vec!["gateway", "bridge", "engine", "gateway", "bridge", "engine"]
        );
    }

    #[test]
    fn shutdown_flag_latches() {
        let clock = ManualClock::new(0);
        let mut ctx = PollCtx::new(Box::new(clock));
        assert!(!ctx.shutdown_requested());
        ctx.request_shutdown();
        ctx.request_shutdown();
        assert!(ctx.shutdown_requested());
    }
}
