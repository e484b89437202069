#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # MCAL Core
//!
//! Types and traits shared by the MCAL peripheral drivers: the common error
//! type and the clock-source seam that turns "the core runs at N Hz" into a
//! value the timer drivers can convert durations with.

use core::fmt;

pub mod clock;

pub use clock::*;

/// MCAL crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the MCAL drivers
pub type MResult<T> = Result<T, MError>;

/// Error types for MCAL driver operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MError {
    /// Requested value does not fit the hardware field (counter width, reload)
    OutOfRange,
    /// The peripheral is already held by another logical user
    ResourceConflict,
    /// Clock frequency or clock tree parameter is unusable
    InvalidClock,
    /// Peripheral identifier outside the bus enable register
    InvalidPeripheral,
    /// Hardware never raised the ready flag we were waiting for
    Timeout,
}

impl fmt::Display for MError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MError::OutOfRange => write!(f, "Value exceeds the hardware range"),
            MError::ResourceConflict => write!(f, "Peripheral is in use by another request"),
            MError::InvalidClock => write!(f, "Invalid clock configuration"),
            MError::InvalidPeripheral => write!(f, "Invalid peripheral identifier"),
            MError::Timeout => write!(f, "Timed out waiting for hardware"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MError {}

#[cfg(feature = "defmt")]
impl defmt::Format for MError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            MError::OutOfRange => defmt::write!(fmt, "OutOfRange"),
            MError::ResourceConflict => defmt::write!(fmt, "ResourceConflict"),
            MError::InvalidClock => defmt::write!(fmt, "InvalidClock"),
            MError::InvalidPeripheral => defmt::write!(fmt, "InvalidPeripheral"),
            MError::Timeout => defmt::write!(fmt, "Timeout"),
        }
    }
}
