//! Display capability port.
//!
//! The controller board carries a small status display (power level
//! readout, output indicator, standby banner, poll-activity blinker).
//! Rendering is out of scope here; the engine and the heartbeat talk to
//! this port and adapters decide what a "display" actually is.

use log::{debug, info};

use crate::looper::{PollCtx, Pollable};

/// What the core can show on whatever display is attached.
pub trait PanelPort {
    /// The applied power level changed.
    fn show_level(&mut self, level: f32);

    /// The physical output switched on or off.
    fn show_output(&mut self, on: bool);

    /// The standby banner appears or clears.
    fn show_standby(&mut self, active: bool);

    /// One blink of the poll-activity indicator.
    fn show_heartbeat(&mut self);

    /// The controller is shutting down.
    fn show_shutdown(&mut self);
}

/// Panel that renders to the log. The default on a headless host.
pub struct ConsolePanel;

impl PanelPort for ConsolePanel {
    fn show_level(&mut self, level: f32) {
        info!("panel: power level {:3.0}", level);
    }

    fn show_output(&mut self, on: bool) {
        debug!("panel: output {}", if on { "ON" } else { "off" });
    }

    fn show_standby(&mut self, active: bool) {
        if active {
            info!("panel: STANDBY");
        } else {
            info!("panel: standby cleared");
        }
    }

    fn show_heartbeat(&mut self) {
        debug!("panel: heartbeat");
    }

    fn show_shutdown(&mut self) {
        info!("panel: Power Off");
    }
}

/// Panel that shows nothing. Used in tests and on displayless builds.
pub struct NullPanel;

impl PanelPort for NullPanel {
    fn show_level(&mut self, _level: f32) {}
    fn show_output(&mut self, _on: bool) {}
    fn show_standby(&mut self, _active: bool) {}
    fn show_heartbeat(&mut self) {}
    fn show_shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// Poll-activity indicator
// ---------------------------------------------------------------------------

/// Blinks the panel's activity indicator at a fixed interval so a
/// stalled loop is visible at a glance.
pub struct Heartbeat<P: PanelPort> {
    panel: P,
    interval_ms: u32,
    next_ms: u32,
}

impl<P: PanelPort> Heartbeat<P> {
    pub fn new(panel: P, interval_ms: u32, now_ms: u32) -> Self {
        Self {
            panel,
            interval_ms,
            next_ms: now_ms,
        }
    }
}

impl<P: PanelPort> Pollable for Heartbeat<P> {
    fn poll(&mut self, ctx: &mut PollCtx) {
        if !ctx.due(self.next_ms) {
            return;
        }
        self.next_ms = ctx.schedule_after(self.interval_ms);
        self.panel.show_heartbeat();
    }

    fn shutdown(&mut self, _ctx: &mut PollCtx) {
        self.panel.show_shutdown();
    }
}
