//! End-to-end control path: a remote PID update flows through the
//! bridge, the bus, and the power engine to the output line within a
//! single poll cycle.

use emberdrive::bridge::PidBridge;
use emberdrive::bus::PidPatch;
use emberdrive::config::SystemConfig;
use emberdrive::drivers::line::SimLine;
use emberdrive::looper::{ManualClock, PollCtx, PollLooper, Pollable};
use emberdrive::panel::NullPanel;
use emberdrive::power::PowerEngine;
use emberdrive::timers::ShutdownTimer;

fn test_config() -> SystemConfig {
    SystemConfig {
        minimum_pulse_ms: 2000,
        standby_timeout_secs: 60,
        standby_power_level: 20.0,
        initial_power_level: 0.0,
        ..Default::default()
    }
}

fn rig() -> (
    PidBridge,
    PowerEngine<SimLine, NullPanel>,
    PollCtx,
    ManualClock,
) {
    let clock = ManualClock::new(0);
    let ctx = PollCtx::new(Box::new(clock.clone()));
    let bridge = PidBridge::new(ctx.now_ms());
    let engine =
        PowerEngine::new(&test_config(), SimLine::new(), NullPanel, ctx.now_ms()).unwrap();
    (bridge, engine, ctx, clock)
}

fn temperature_patch(temp: f32) -> PidPatch {
    PidPatch {
        p: Some(1.0),
        i: Some(0.0),
        d: Some(0.0),
        set_point: Some(100.0),
        current_temperature: Some(temp),
        ..Default::default()
    }
}

#[test]
fn pid_update_reaches_the_output_in_one_cycle() {
    let (mut bridge, mut engine, mut ctx, clock) = rig();

    clock.advance(1000);
    let now = ctx.now_ms();
    ctx.bus.merge_pid_settings(&temperature_patch(40.0), now);

    // Bridge before engine, as registered in the real loop.
    bridge.poll(&mut ctx);
    engine.poll(&mut ctx);

    // P=1, set point 100, measurement 40 → power level 60.
    assert_eq!(ctx.bus.power().power_level, 60.0);
    assert_eq!(engine.applied_level(), 60.0);
    assert!(engine.output_on(), "an increase asserts the line now");
}

#[test]
fn standby_falls_back_and_a_pid_update_wakes() {
    let (mut bridge, mut engine, mut ctx, clock) = rig();

    clock.advance(1000);
    let now = ctx.now_ms();
    ctx.bus.set_power_level(60.0, now);
    bridge.poll(&mut ctx);
    engine.poll(&mut ctx);
    assert_eq!(engine.applied_level(), 60.0);

    // Command silence past the timeout: fallback, bus record untouched.
    clock.advance(60_001);
    bridge.poll(&mut ctx);
    engine.poll(&mut ctx);
    assert!(engine.in_standby());
    assert_eq!(engine.applied_level(), 20.0);
    assert_eq!(ctx.bus.power().power_level, 60.0);

    // A fresh temperature sample makes the bridge write the bus, which
    // wakes the engine the same cycle.
    clock.advance(100);
    let now = ctx.now_ms();
    ctx.bus.merge_pid_settings(&temperature_patch(40.0), now);
    bridge.poll(&mut ctx);
    engine.poll(&mut ctx);
    assert!(!engine.in_standby());
    assert_eq!(engine.applied_level(), 60.0);
}

#[test]
fn gains_only_update_does_not_touch_the_output() {
    let (mut bridge, mut engine, mut ctx, clock) = rig();

    clock.advance(1000);
    let now = ctx.now_ms();
    ctx.bus.merge_pid_settings(
        &PidPatch {
            p: Some(2.0),
            set_point: Some(110.0),
            ..Default::default()
        },
        now,
    );
    bridge.poll(&mut ctx);
    engine.poll(&mut ctx);

    assert_eq!(ctx.bus.power().power_level, 0.0);
    assert_eq!(engine.applied_level(), 0.0);
    assert!(!engine.output_on());
}

#[test]
fn run_limit_shuts_the_loop_down() {
    // Real clock, tiny run limit: the loop must terminate on its own and
    // give every component its shutdown call.
    let mut looper = PollLooper::new(1, Box::new(emberdrive::looper::SystemClock::new()));
    let now = looper.ctx().now_ms();
    looper.add(Box::new(ShutdownTimer::new(5, now)));
    let config = test_config();
    looper.add(Box::new(
        PowerEngine::new(&config, SimLine::new(), NullPanel, now).unwrap(),
    ));

    looper.run();
    assert!(looper.ctx().shutdown_requested());
}
