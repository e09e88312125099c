//! Watchdog timer.
//!
//! Polled collaborator fed once per cycle; if the loop stalls past the
//! timeout the supervisor resets the board. The hardware hookup is
//! target-specific, so on the host this only logs; the poll contract
//! and registration position are what the loop relies on.

use log::info;

use crate::looper::{PollCtx, Pollable};

pub struct Watchdog {
    timeout_ms: u32,
}

impl Watchdog {
    pub fn new(timeout_ms: u32) -> Self {
        info!("watchdog armed ({} ms timeout)", timeout_ms);
        Self { timeout_ms }
    }

    /// Tell the supervisor the loop is still alive. Must be called at
    /// least once per `timeout_ms`.
    pub fn feed(&mut self) {
        // Hardware feed goes here on a real target.
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

impl Pollable for Watchdog {
    fn poll(&mut self, _ctx: &mut PollCtx) {
        self.feed();
    }
}
