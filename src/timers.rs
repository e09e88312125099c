//! Run-limit timer.
//!
//! Unconditionally requests shutdown once the configured run duration
//! has elapsed, regardless of command activity. Elapsed time is
//! accumulated from per-cycle wrapping differences, so the timer
//! survives tick-counter wraparound over multi-day runs.

use log::info;

use crate::looper::{ticks_diff, PollCtx, Pollable};

pub struct ShutdownTimer {
    /// Total allowed run duration; 0 disables the timer.
    run_ms: u32,
    /// Milliseconds accumulated so far.
    elapsed_ms: u32,
    last_time_ms: u32,
}

impl ShutdownTimer {
    pub fn new(run_ms: u32, now_ms: u32) -> Self {
        if run_ms > 0 {
            info!("shutdown timer set for {} ms", run_ms);
        }
        Self {
            run_ms,
            elapsed_ms: 0,
            last_time_ms: now_ms,
        }
    }
}

impl Pollable for ShutdownTimer {
    fn poll(&mut self, ctx: &mut PollCtx) {
        if self.run_ms == 0 {
            return; // Not set.
        }
        let now = ctx.now_ms();
        let step = ticks_diff(now, self.last_time_ms).max(0) as u32;
        self.elapsed_ms = self.elapsed_ms.saturating_add(step);
        self.last_time_ms = now;
        if self.elapsed_ms >= self.run_ms {
            info!("run limit reached after {} ms", self.elapsed_ms);
            ctx.request_shutdown();
        }
    }
}
