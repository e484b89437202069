//! Conversion between microseconds and counter ticks.
//!
//! One tick lasts `divisor / clock_hz` seconds. The multiply is done in 64
//! bits so that the largest 24-bit duration at any 32-bit clock rate cannot
//! overflow before the divide, and the result is range-checked against the
//! counter width before it is narrowed.

use mcal_core::{MError, MResult};

use crate::config::StkConfig;

/// Microseconds per second.
pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// Converts a duration in microseconds to a reload value.
///
/// Fails with [`MError::InvalidClock`] for a zero clock and with
/// [`MError::OutOfRange`] when the tick count exceeds `config.max_reload()`.
pub fn to_ticks(duration_us: u32, clock_hz: u32, config: &StkConfig) -> MResult<u32> {
    if clock_hz == 0 {
        return Err(MError::InvalidClock);
    }

    let ticks = u64::from(duration_us) * u64::from(clock_hz)
        / (u64::from(config.divisor()) * MICROS_PER_SECOND);

    if ticks > u64::from(config.max_reload()) {
        return Err(MError::OutOfRange);
    }
    Ok(ticks as u32)
}

/// Converts a tick count back to microseconds, rounding down.
pub fn to_duration(ticks: u32, clock_hz: u32, config: &StkConfig) -> MResult<u64> {
    if clock_hz == 0 {
        return Err(MError::InvalidClock);
    }

    Ok(u64::from(ticks) * u64::from(config.divisor()) * MICROS_PER_SECOND / u64::from(clock_hz))
}

/// Ticks needed to cover at least `duration_us`, rounding up and without a
/// counter-width limit. Callers split the result into countdowns.
pub fn ticks_covering(duration_us: u64, clock_hz: u32, config: &StkConfig) -> MResult<u64> {
    if clock_hz == 0 {
        return Err(MError::InvalidClock);
    }

    let per_second = u128::from(config.divisor()) * u128::from(MICROS_PER_SECOND);
    let ticks = (u128::from(duration_us) * u128::from(clock_hz)).div_ceil(per_second);
    u64::try_from(ticks).map_err(|_| MError::OutOfRange)
}

/// Longest duration, in microseconds, that fits one full countdown.
pub fn max_duration(clock_hz: u32, config: &StkConfig) -> MResult<u64> {
    to_duration(config.max_reload(), clock_hz, config)
}
