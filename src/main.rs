//! Controller entry point.
//!
//! Wires the configuration, the host clock, and every polled component
//! into the loop, then runs until shutdown is requested (remote command,
//! run-limit timer, or an output line fault).

use std::path::PathBuf;

use anyhow::Context;
use log::info;

use emberdrive::bridge::PidBridge;
use emberdrive::config::SystemConfig;
use emberdrive::drivers::line::SimLine;
use emberdrive::drivers::watchdog::Watchdog;
use emberdrive::gateway::CommandGateway;
use emberdrive::looper::{PollLooper, SystemClock};
use emberdrive::panel::{ConsolePanel, Heartbeat};
use emberdrive::power::PowerEngine;
use emberdrive::timers::ShutdownTimer;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("emberdrive {}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args_os().nth(1) {
        Some(path) => SystemConfig::load(&PathBuf::from(path))?,
        None => SystemConfig::default(),
    };
    info!(
        "device '{}', command port {}, web port {}",
        config.device_id, config.udp_port, config.web_port
    );

    let mut looper = PollLooper::new(config.poll_interval_ms, Box::new(SystemClock::new()));
    let now = looper.ctx().now_ms();

    // Registration order is poll order. The gateway and bridge run before
    // the engine so commands land in the same cycle they arrive.
    looper.add(Box::new(Watchdog::new(config.watchdog_timeout_ms)));
    looper.add(Box::new(ShutdownTimer::new(config.shutdown_run_ms(), now)));
    looper.add(Box::new(Heartbeat::new(
        ConsolePanel,
        config.heartbeat_interval_ms,
        now,
    )));
    looper.add(Box::new(
        CommandGateway::new(&config).context("binding command sockets")?,
    ));
    looper.add(Box::new(PidBridge::new(now)));
    looper.add(Box::new(
        PowerEngine::new(&config, SimLine::new(), ConsolePanel, now)
            .context("setting initial output state")?,
    ));

    looper.run();
    info!("stopped");
    Ok(())
}
