//! Unified error types for the emberdrive firmware.
//!
//! A small set of `Copy` enums that every subsystem can convert into,
//! keeping the poll loop's error handling uniform and allocation-free.
//! Socket binding and other bootstrap failures are reported through
//! `anyhow` at the binary edge instead.

use core::fmt;

// ---------------------------------------------------------------------------
// Physical output line faults
// ---------------------------------------------------------------------------

/// A fault driving the power control line.
///
/// The line is assumed always writable in normal operation; a fault here is
/// a distinct fatal condition. The engine logs it and requests an orderly
/// shutdown rather than silently continuing with an unknown relay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFault {
    /// The GPIO write behind `assert`/`deassert` failed.
    GpioWriteFailed,
    /// The line driver reported the output as no longer reachable.
    Disconnected,
}

impl fmt::Display for LineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::Disconnected => write!(f, "output line disconnected"),
        }
    }
}

impl std::error::Error for LineFault {}

// ---------------------------------------------------------------------------
// Remote command parse errors
// ---------------------------------------------------------------------------

/// Why an inbound remote command was dropped.
///
/// These are never fatal: the gateway logs the reason and keeps polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// Payload was not valid UTF-8 or not valid JSON.
    BadPayload,
    /// A required envelope field is absent.
    MissingField(&'static str),
    /// A parameter that should be numeric did not parse.
    BadNumber(&'static str),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPayload => write!(f, "unparseable payload"),
            Self::MissingField(name) => write!(f, "'{name}' missing"),
            Self::BadNumber(name) => write!(f, "'{name}' is not a number"),
        }
    }
}

impl std::error::Error for RequestError {}
