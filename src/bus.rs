//! Shared message bus.
//!
//! A registry owning one canonical record per topic. Components never
//! hold references into the bus across cycles; they read a copy during
//! their poll slot and detect changes by comparing `last_update_ms`
//! (dirty-flag watching). Every write merges into the canonical record
//! and stamps it with the current monotonic time.
//!
//! Topics:
//! - `powercontrol` → [`PowerCommand`], written by the gateway and the
//!   PID bridge, consumed by the power engine.
//! - `pid_settings` → [`PidSettings`], written by the gateway, consumed
//!   by the PID bridge.
//!
//! Safe without locking only because the whole system is single-threaded
//! and a write is an atomic replace-or-merge, never a partial mutation
//! observed mid-update.

use serde::Deserialize;

/// Round to one decimal place, half away from zero.
pub fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Topic records
// ---------------------------------------------------------------------------

/// The `powercontrol` topic: the commanded power level.
///
/// Invariant: `power_level` is clamped to [0,100] and rounded to one
/// decimal place before it is stored. Every writer funnels through
/// [`Bus::set_power_level`], so readers never see an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerCommand {
    pub power_level: f32,
    pub last_update_ms: u32,
}

/// The `pid_settings` topic: PID gains, set point and the latest
/// temperature sample.
///
/// `temperature_update` is true only while the most recent merge carried
/// a `current_temperature` and the bridge has not yet consumed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidSettings {
    pub power_level: f32,
    pub p: f32,
    pub i: f32,
    pub d: f32,
    pub set_point: f32,
    pub current_temperature: f32,
    pub temperature_update: bool,
    pub last_update_ms: u32,
}

/// Partial update for the `pid_settings` topic, deserialized straight
/// from a `pid_update` request's params. Absent fields leave the stored
/// value untouched.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PidPatch {
    pub power_level: Option<f32>,
    #[serde(rename = "P")]
    pub p: Option<f32>,
    #[serde(rename = "I")]
    pub i: Option<f32>,
    #[serde(rename = "D")]
    pub d: Option<f32>,
    pub set_point: Option<f32>,
    pub current_temperature: Option<f32>,
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// The registry of topic records. Owned by the poll context; handed to
/// components only within their poll slot.
pub struct Bus {
    power: PowerCommand,
    pid: PidSettings,
}

impl Bus {
    /// Create all topics with their initial values. Topics are never
    /// deleted, only overwritten.
    pub fn new(now_ms: u32) -> Self {
        Self {
            power: PowerCommand {
                power_level: 0.0,
                last_update_ms: now_ms,
            },
            pid: PidSettings {
                power_level: 0.0,
                p: 0.2,
                i: 0.0,
                d: 0.0,
                set_point: 0.0,
                current_temperature: 0.0,
                temperature_update: false,
                last_update_ms: now_ms,
            },
        }
    }

    /// Read the `powercontrol` topic.
    pub fn power(&self) -> PowerCommand {
        self.power
    }

    /// Read the `pid_settings` topic.
    pub fn pid(&self) -> PidSettings {
        self.pid
    }

    /// Write the commanded power level, clamping to [0,100] and rounding
    /// to one decimal place, and stamp the topic.
    pub fn set_power_level(&mut self, level: f32, now_ms: u32) {
        self.power.power_level = round1(level.clamp(0.0, 100.0));
        self.power.last_update_ms = now_ms;
    }

    /// Merge a partial update into `pid_settings` and stamp the topic.
    /// `temperature_update` reflects whether *this* merge carried a
    /// temperature sample.
    pub fn merge_pid_settings(&mut self, patch: &PidPatch, now_ms: u32) {
        if let Some(v) = patch.power_level {
            self.pid.power_level = v;
        }
        if let Some(v) = patch.p {
            self.pid.p = v;
        }
        if let Some(v) = patch.i {
            self.pid.i = v;
        }
        if let Some(v) = patch.d {
            self.pid.d = v;
        }
        if let Some(v) = patch.set_point {
            self.pid.set_point = v;
        }
        if let Some(v) = patch.current_temperature {
            self.pid.current_temperature = v;
        }
        self.pid.temperature_update = patch.current_temperature.is_some();
        self.pid.last_update_ms = now_ms;
    }

    /// The bridge has fed the pending temperature sample to the PID
    /// controller. Clears the flag without restamping the topic, so the
    /// bridge does not wake itself on the next cycle.
    pub fn mark_temperature_consumed(&mut self) {
        self.pid.temperature_update = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_level_rounds_to_one_decimal() {
        let mut bus = Bus::new(0);
        bus.set_power_level(42.26, 10);
        assert_eq!(bus.power().power_level, 42.3);
        bus.set_power_level(42.24, 20);
        assert_eq!(bus.power().power_level, 42.2);
    }

    #[test]
    fn power_level_clamps_to_range() {
        let mut bus = Bus::new(0);
        bus.set_power_level(150.0, 10);
        assert_eq!(bus.power().power_level, 100.0);
        bus.set_power_level(-3.5, 20);
        assert_eq!(bus.power().power_level, 0.0);
    }

    #[test]
    fn every_write_stamps_the_topic() {
        let mut bus = Bus::new(0);
        bus.set_power_level(60.0, 123);
        assert_eq!(bus.power().last_update_ms, 123);
        // Re-sending the same value still restamps.
        bus.set_power_level(60.0, 456);
        assert_eq!(bus.power().last_update_ms, 456);
    }

    #[test]
    fn pid_merge_is_partial() {
        let mut bus = Bus::new(0);
        bus.merge_pid_settings(
            &PidPatch {
                p: Some(1.5),
                set_point: Some(110.0),
                ..Default::default()
            },
            10,
        );
        let s = bus.pid();
        assert_eq!(s.p, 1.5);
        assert_eq!(s.set_point, 110.0);
        assert_eq!(s.i, 0.0); // untouched default
        assert_eq!(s.last_update_ms, 10);
    }

    #[test]
    fn temperature_flag_tracks_current_merge() {
        let mut bus = Bus::new(0);
        bus.merge_pid_settings(
            &PidPatch {
                current_temperature: Some(95.0),
                ..Default::default()
            },
            10,
        );
        assert!(bus.pid().temperature_update);

        // A later merge without a sample clears the flag.
        bus.merge_pid_settings(
            &PidPatch {
                set_point: Some(120.0),
                ..Default::default()
            },
            20,
        );
        assert!(!bus.pid().temperature_update);
    }

    #[test]
    fn consuming_temperature_does_not_restamp() {
        let mut bus = Bus::new(0);
        bus.merge_pid_settings(
            &PidPatch {
                current_temperature: Some(95.0),
                ..Default::default()
            },
            10,
        );
        bus.mark_temperature_consumed();
        assert!(!bus.pid().temperature_update);
        assert_eq!(bus.pid().last_update_ms, 10);
    }

    #[test]
    fn patch_parses_from_rpc_params() {
        let patch: PidPatch = serde_json::from_str(
            r#"{"P": 0.8, "I": 0.02, "D": 0.1, "set_point": 107.0, "current_temperature": 93.4}"#,
        )
        .unwrap();
        assert_eq!(patch.p, Some(0.8));
        assert_eq!(patch.current_temperature, Some(93.4));
        assert_eq!(patch.power_level, None);
    }
}
