//! Emberdrive firmware library.
//!
//! Time-proportioning power-level controller for a relay-driven heating
//! element (smoker / kiln style). A cooperative single-threaded poll loop
//! drives four components that communicate only through a shared message
//! bus:
//!
//! ```text
//!  UDP / HTTP ──▶ CommandGateway ──┐
//!                                  ├──▶ Bus ──▶ PowerEngine ──▶ relay line
//!  temperature ──▶ PidBridge ──────┘
//! ```
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. Hardware-specific code sits behind port traits in
//! [`drivers`] and [`panel`].

#![deny(unused_must_use)]

pub mod bridge;
pub mod bus;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod gateway;
pub mod looper;
pub mod panel;
pub mod power;
pub mod timers;
