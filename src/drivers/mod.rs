//! Hardware drivers and their port traits.
//!
//! Everything that touches a physical pin lives here, behind small
//! traits so the control core runs unchanged on the host.

pub mod line;
pub mod watchdog;
