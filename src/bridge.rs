//! PID bridge.
//!
//! Dirty-flag watcher on the `pid_settings` topic. On the first
//! observed update it lazily constructs the PID controller from the
//! stored gains and set point (exactly once, not per update). Whenever
//! an update carries a genuine temperature sample it runs the loop and
//! writes the resulting power level to `powercontrol`, which the power
//! engine observes on its own next poll.

use log::{debug, info};

use crate::bus::round1;
use crate::control::pid::TemperaturePid;
use crate::looper::{ticks_diff, PollCtx, Pollable};

pub struct PidBridge {
    pid: Option<TemperaturePid>,
    /// `pid_settings` timestamp last consumed.
    last_seen_update_ms: u32,
    /// When the previous temperature sample arrived; gives the loop its dt.
    last_sample_ms: u32,
}

impl PidBridge {
    pub fn new(now_ms: u32) -> Self {
        Self {
            pid: None,
            last_seen_update_ms: now_ms,
            last_sample_ms: now_ms,
        }
    }

    /// Whether the controller has been constructed yet.
    pub fn initialized(&self) -> bool {
        self.pid.is_some()
    }
}

impl Pollable for PidBridge {
    fn poll(&mut self, ctx: &mut PollCtx) {
        let settings = ctx.bus.pid();
        if settings.last_update_ms == self.last_seen_update_ms {
            return; // No change.
        }
        self.last_seen_update_ms = settings.last_update_ms;

        let pid = self.pid.get_or_insert_with(|| {
            info!(
                "pid: initialise (P={} I={} D={}, set point {:.1})",
                settings.p, settings.i, settings.d, settings.set_point
            );
            TemperaturePid::new(settings.p, settings.i, settings.d, settings.set_point)
        });
        pid.set_target(settings.set_point);

        if !settings.temperature_update {
            return; // Gains-only update.
        }

        let dt_secs =
            ticks_diff(settings.last_update_ms, self.last_sample_ms).max(1) as f32 / 1000.0;
        self.last_sample_ms = settings.last_update_ms;

        let output = pid.update(settings.current_temperature, dt_secs);
        let power_level = round1(output.clamp(0.0, 100.0));
        debug!(
            "pid: temperature {:.1} -> power level {:.1}",
            settings.current_temperature, power_level
        );
        let now = ctx.now_ms();
        ctx.bus.set_power_level(power_level, now);
        ctx.bus.mark_temperature_consumed();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
