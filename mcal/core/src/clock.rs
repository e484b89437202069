//! Clock frequency types and the clock-source seam

use core::fmt;

/// Frequency in hertz
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hertz(pub u32);

impl Hertz {
    /// Create a frequency from a raw hertz value
    pub const fn hz(hz: u32) -> Self {
        Self(hz)
    }

    /// Create a frequency from kilohertz
    pub const fn khz(khz: u32) -> Self {
        Self(khz * 1_000)
    }

    /// Create a frequency from megahertz
    pub const fn mhz(mhz: u32) -> Self {
        Self(mhz * 1_000_000)
    }

    /// Get the raw hertz value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Hertz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Hertz {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}Hz", self.0);
    }
}

/// Source of the current core clock rate.
///
/// Timer drivers query this every time they convert a duration, so an
/// implementation that reads live hardware state tracks clock reconfiguration
/// without any cache invalidation.
pub trait ClockSource {
    /// Current core clock frequency in hertz
    fn frequency_hz(&self) -> u32;
}

impl<T: ClockSource + ?Sized> ClockSource for &T {
    fn frequency_hz(&self) -> u32 {
        (**self).frequency_hz()
    }
}

/// Clock source with a frequency fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(Hertz);

impl FixedClock {
    /// Create a fixed clock running at `frequency`
    pub const fn new(frequency: Hertz) -> Self {
        Self(frequency)
    }

    /// Get the configured frequency
    pub const fn frequency(&self) -> Hertz {
        self.0
    }
}

impl ClockSource for FixedClock {
    fn frequency_hz(&self) -> u32 {
        self.0.raw()
    }
}

impl From<Hertz> for FixedClock {
    fn from(value: Hertz) -> Self {
        Self::new(value)
    }
}
