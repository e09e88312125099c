//! Closed-loop control algorithms.

pub mod pid;
