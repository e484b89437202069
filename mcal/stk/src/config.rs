//! SysTick configuration.
//!
//! The counter width and the clock feeding the counter are fixed by the
//! silicon, so they are carried as configuration rather than hard-coded into
//! the conversion code.

use mcal_core::{MError, MResult};

/// Counter width of the Cortex-M SysTick.
pub const DEFAULT_COUNTER_BITS: u8 = 24;

/// Largest reload value a 24-bit counter accepts.
pub const MAX_RELOAD_24BIT: u32 = 0x00FF_FFFF;

/// Clock feeding the down-counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StkClockSource {
    /// Processor clock (AHB), one tick per core cycle.
    Ahb,
    /// External reference clock, AHB divided by 8 on STM32F1.
    AhbDiv8,
}

impl StkClockSource {
    /// Number of core cycles per counter tick.
    pub const fn divisor(self) -> u32 {
        match self {
            Self::Ahb => 1,
            Self::AhbDiv8 => 8,
        }
    }
}

/// Configuration for a SysTick resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StkConfig {
    pub clock_source: StkClockSource,
    pub counter_bits: u8,
}

impl Default for StkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StkConfig {
    /// Reference configuration: AHB/8, 24-bit counter.
    pub const fn new() -> Self {
        Self {
            clock_source: StkClockSource::AhbDiv8,
            counter_bits: DEFAULT_COUNTER_BITS,
        }
    }

    /// Creates a new configuration builder.
    pub fn builder() -> StkConfigBuilder {
        StkConfigBuilder::default()
    }

    /// Core cycles per counter tick.
    pub const fn divisor(&self) -> u32 {
        self.clock_source.divisor()
    }

    /// Largest reload value the counter can hold.
    pub const fn max_reload(&self) -> u32 {
        if self.counter_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.counter_bits) - 1
        }
    }
}

/// Builder for ergonomic SysTick configuration construction.
#[derive(Debug, Clone, Default)]
pub struct StkConfigBuilder {
    config: StkConfig,
}

impl StkConfigBuilder {
    /// Sets the clock feeding the counter.
    pub fn clock_source(mut self, source: StkClockSource) -> Self {
        self.config.clock_source = source;
        self
    }

    /// Sets the counter width in bits (1..=32).
    pub fn counter_bits(mut self, bits: u8) -> Self {
        self.config.counter_bits = bits;
        self
    }

    /// Builds the configuration, rejecting a counter width outside 1..=32.
    pub fn build(self) -> MResult<StkConfig> {
        if self.config.counter_bits == 0 || self.config.counter_bits > 32 {
            return Err(MError::OutOfRange);
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_hardware() {
        let config = StkConfig::default();
        assert_eq!(config.divisor(), 8);
        assert_eq!(config.max_reload(), MAX_RELOAD_24BIT);
    }

    #[test]
    fn builder_overrides() {
        let config = StkConfig::builder()
            .clock_source(StkClockSource::Ahb)
            .counter_bits(16)
            .build()
            .unwrap();

        assert_eq!(config.divisor(), 1);
        assert_eq!(config.max_reload(), 0xFFFF);
    }

    #[test]
    fn builder_rejects_bad_width() {
        assert_eq!(
            StkConfig::builder().counter_bits(0).build(),
            Err(MError::OutOfRange)
        );
        assert_eq!(
            StkConfig::builder().counter_bits(33).build(),
            Err(MError::OutOfRange)
        );
        assert_eq!(
            StkConfig::builder().counter_bits(32).build().unwrap().max_reload(),
            u32::MAX
        );
    }
}
