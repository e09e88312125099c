//! Power output engine.
//!
//! Watches the `powercontrol` topic, converts the commanded level into a
//! minimum-pulse-width on/off timing plan, drives the physical relay
//! line, and manages the standby state machine.
//!
//! ```text
//!          bus timestamp changed            command silence > timeout
//!  ACTIVE ◀────────────────────── STANDBY ◀──────────────────────────
//!          (restores bus level)            (applies fallback level,
//!                                           bus record untouched)
//! ```
//!
//! The wake check runs before the timeout check every cycle, and fires
//! on *any* timestamp change, even a re-send of the same level.

pub mod plan;

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::drivers::line::OutputLine;
use crate::error::LineFault;
use crate::looper::{due, ticks_add, ticks_diff, PollCtx, Pollable};
use crate::panel::PanelPort;
use plan::PulsePlan;

/// Standby fallback parameters and the current override flag.
///
/// `active = true` means the engine is overriding the commanded level
/// with `fallback_level`; the bus record is never mutated, so the
/// commanded level is restored exactly when a new command arrives.
#[derive(Debug, Clone, Copy)]
struct Standby {
    active: bool,
    timeout_ms: u32,
    fallback_level: f32,
}

/// The time-proportioning output engine.
pub struct PowerEngine<L: OutputLine, P: PanelPort> {
    line: L,
    panel: P,
    minimum_pulse_ms: u32,

    /// The level currently realized on the output (may be the standby
    /// fallback rather than the bus's stored level).
    applied_level: f32,
    plan: PulsePlan,
    output_on: bool,
    /// Deadline for the next free-running flip.
    next_change_ms: u32,

    /// Bus timestamp last consumed; the dirty flag for command watching.
    last_seen_update_ms: u32,
    standby: Standby,
}

impl<L: OutputLine, P: PanelPort> PowerEngine<L, P> {
    /// Construct the engine with the output released and the initial
    /// level applied. `now_ms` must come from the loop's clock.
    pub fn new(
        config: &SystemConfig,
        line: L,
        panel: P,
        now_ms: u32,
    ) -> Result<Self, LineFault> {
        let mut engine = Self {
            line,
            panel,
            minimum_pulse_ms: config.minimum_pulse_ms,
            applied_level: 0.0,
            plan: PulsePlan::for_level(0.0, config.minimum_pulse_ms),
            output_on: false,
            next_change_ms: ticks_add(now_ms, plan::HOLD_MS),
            last_seen_update_ms: now_ms,
            standby: Standby {
                active: false,
                timeout_ms: config.standby_timeout_ms(),
                fallback_level: config.standby_power_level,
            },
        };
        engine.line.deassert()?;
        engine.panel.show_output(false);
        if config.initial_power_level > 0.0 {
            engine.apply(config.initial_power_level, now_ms)?;
        }
        Ok(engine)
    }

    /// The level currently realized on the output.
    pub fn applied_level(&self) -> f32 {
        self.applied_level
    }

    /// Whether the engine is in standby fallback.
    pub fn in_standby(&self) -> bool {
        self.standby.active
    }

    /// Whether the physical line is currently asserted.
    pub fn output_on(&self) -> bool {
        self.output_on
    }

    /// Recompute the pulse plan for `level` and commit to the transition
    /// consistent with the direction of change: an increase drives the
    /// output on now, a decrease (or equal) drives it off now. This
    /// avoids waiting out a full idle period before responding to an
    /// increase.
    pub fn apply(&mut self, level: f32, now_ms: u32) -> Result<(), LineFault> {
        let increase = level > self.applied_level;
        self.applied_level = level;
        self.plan = PulsePlan::for_level(level, self.minimum_pulse_ms);
        if increase {
            self.drive(true)?;
            self.next_change_ms = ticks_add(now_ms, self.plan.on_ms);
        } else {
            self.drive(false)?;
            self.next_change_ms = ticks_add(now_ms, self.plan.off_ms);
        }
        self.panel.show_level(level);
        info!(
            "power level {:.1}: on {} ms / off {} ms",
            level, self.plan.on_ms, self.plan.off_ms
        );
        Ok(())
    }

    fn enter_standby(&mut self, now_ms: u32) -> Result<(), LineFault> {
        self.standby.active = true;
        self.panel.show_standby(true);
        warn!(
            "no command for {} ms, standing by at {:.1}",
            self.standby.timeout_ms, self.standby.fallback_level
        );
        self.apply(self.standby.fallback_level, now_ms)
    }

    fn exit_standby(&mut self) {
        if !self.standby.active {
            return;
        }
        self.standby.active = false;
        self.panel.show_standby(false);
        info!("command received, leaving standby");
    }

    fn drive(&mut self, on: bool) -> Result<(), LineFault> {
        if on {
            self.line.assert()?;
        } else {
            self.line.deassert()?;
        }
        self.output_on = on;
        self.panel.show_output(on);
        Ok(())
    }

    /// One engine cycle; factored out of [`Pollable::poll`] so the fault
    /// path stays in one place.
    fn cycle(&mut self, ctx: &mut PollCtx) -> Result<(), LineFault> {
        let command = ctx.bus.power();

        // Wake check first: any timestamp change ends standby and takes
        // the stored level, even if the value itself did not change.
        if command.last_update_ms != self.last_seen_update_ms {
            self.last_seen_update_ms = command.last_update_ms;
            self.exit_standby();
            if command.power_level != self.applied_level {
                self.apply(command.power_level, ctx.now_ms())?;
            }
            return Ok(());
        }

        let now = ctx.now_ms();

        // Standby entry: the applied level is worth falling back from and
        // the bus has been silent past the timeout.
        if !self.standby.active
            && self.applied_level > self.standby.fallback_level
            && ticks_diff(now, self.last_seen_update_ms) > self.standby.timeout_ms as i32
        {
            return self.enter_standby(now);
        }

        // Free-running square wave: flip when the deadline arrives, using
        // the other duration from the fixed plan. A zero "other duration"
        // means the plan is saturated; hold the line.
        if due(now, self.next_change_ms) {
            if self.output_on {
                if self.plan.off_ms > 0 {
                    self.drive(false)?;
                    self.next_change_ms = ticks_add(now, self.plan.off_ms);
                }
            } else if self.plan.on_ms > 0 {
                self.drive(true)?;
                self.next_change_ms = ticks_add(now, self.plan.on_ms);
            }
        }
        Ok(())
    }
}

impl<L: OutputLine, P: PanelPort> Pollable for PowerEngine<L, P> {
    fn poll(&mut self, ctx: &mut PollCtx) {
        if let Err(fault) = self.cycle(ctx) {
            // Output faults are fatal: an unknown relay state must not
            // keep heating.
            error!("output line fault: {fault}, shutting down");
            ctx.request_shutdown();
        }
    }

    fn shutdown(&mut self, ctx: &mut PollCtx) {
        let now = ctx.now_ms();
        if let Err(fault) = self.apply(0.0, now) {
            error!("output line fault during shutdown: {fault}");
        }
        self.panel.show_shutdown();
        info!("power output released");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
