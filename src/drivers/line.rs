//! Power control line driver.
//!
//! The output boundary is a single digital line with two operations,
//! both effectively instantaneous and idempotent. On a real board the
//! line drives the solid-state relay gate; on the host it is simulated.

use log::debug;

use crate::error::LineFault;

/// The physical output boundary.
///
/// Implementations must be idempotent: asserting an already-asserted
/// line is a no-op, not an error.
pub trait OutputLine {
    /// Drive the line high (relay closed, element powered).
    fn assert(&mut self) -> Result<(), LineFault>;

    /// Drive the line low (relay open, element unpowered).
    fn deassert(&mut self) -> Result<(), LineFault>;
}

// ---------------------------------------------------------------------------
// embedded-hal adapter
// ---------------------------------------------------------------------------

/// Adapter over any `embedded-hal` digital output pin.
///
/// Skips redundant writes so repeated asserts cost nothing, and maps
/// pin errors to [`LineFault::GpioWriteFailed`].
pub struct GpioLine<P: embedded_hal::digital::OutputPin> {
    pin: P,
    state: Option<bool>,
}

impl<P: embedded_hal::digital::OutputPin> GpioLine<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, state: None }
    }

    fn set(&mut self, high: bool) -> Result<(), LineFault> {
        if self.state == Some(high) {
            return Ok(());
        }
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|_| LineFault::GpioWriteFailed)?;
        self.state = Some(high);
        Ok(())
    }
}

impl<P: embedded_hal::digital::OutputPin> OutputLine for GpioLine<P> {
    fn assert(&mut self) -> Result<(), LineFault> {
        self.set(true)
    }

    fn deassert(&mut self) -> Result<(), LineFault> {
        self.set(false)
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------

/// Host stand-in for the relay line: tracks state and logs transitions.
#[derive(Default)]
pub struct SimLine {
    asserted: bool,
}

impl SimLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }
}

impl OutputLine for SimLine {
    fn assert(&mut self) -> Result<(), LineFault> {
        if !self.asserted {
            debug!("line(sim): asserted");
        }
        self.asserted = true;
        Ok(())
    }

    fn deassert(&mut self) -> Result<(), LineFault> {
        if self.asserted {
            debug!("line(sim): released");
        }
        self.asserted = false;
        Ok(())
    }
}
