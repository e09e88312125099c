//! System configuration parameters
//!
//! All tunable parameters for the emberdrive controller. Values can be
//! overridden by passing a JSON config file path on the command line.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Identity ---
    /// Device name shown on the web status page.
    pub device_id: String,

    // --- Network ---
    /// Address the UDP and web sockets bind to.
    pub bind_address: String,
    /// UDP port for JSON-RPC style datagrams.
    pub udp_port: u16,
    /// TCP port for the minimal web form.
    pub web_port: u16,

    // --- Power output ---
    /// Power level applied at startup (0-100).
    pub initial_power_level: f32,
    /// Shortest allowed on or off pulse (milliseconds). Protects the
    /// relay from excessive switching.
    pub minimum_pulse_ms: u32,

    // --- Standby ---
    /// Command silence (seconds) before falling back to standby.
    pub standby_timeout_secs: u32,
    /// Power level applied while in standby (0-100).
    pub standby_power_level: f32,

    // --- Run limit ---
    /// Hard shutdown timer; the run duration is hours + minutes + seconds.
    pub shutdown_hours: u32,
    pub shutdown_minutes: u32,
    pub shutdown_seconds: u32,

    // --- Timing ---
    /// Poll cycle period (milliseconds).
    pub poll_interval_ms: u32,
    /// Watchdog timeout (milliseconds).
    pub watchdog_timeout_ms: u32,
    /// Poll-activity indicator blink interval (milliseconds).
    pub heartbeat_interval_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_id: "SmokerOne".to_string(),

            bind_address: "0.0.0.0".to_string(),
            udp_port: 5010,
            web_port: 5010,

            initial_power_level: 0.0,
            minimum_pulse_ms: 2000,

            standby_timeout_secs: 60,
            standby_power_level: 20.0,

            shutdown_hours: 24,
            shutdown_minutes: 0,
            shutdown_seconds: 0,

            poll_interval_ms: 100,     // 10 Hz
            watchdog_timeout_ms: 10_000,
            heartbeat_interval_ms: 300,
        }
    }
}

impl SystemConfig {
    /// Load configuration from a JSON file. Fields absent from the file
    /// keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Standby inactivity timeout in milliseconds.
    pub fn standby_timeout_ms(&self) -> u32 {
        self.standby_timeout_secs * 1000
    }

    /// Total hard-shutdown run duration in milliseconds.
    pub fn shutdown_run_ms(&self) -> u32 {
        (self.shutdown_hours * 3600 + self.shutdown_minutes * 60 + self.shutdown_seconds) * 1000
    }
}
