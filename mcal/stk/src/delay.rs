//! `embedded-hal` delay provider backed by the busy-wait engine.

use embedded_hal::delay::DelayNs;
use mcal_core::ClockSource;

use crate::convert;
use crate::hw::CountdownTimer;
use crate::systick::SysTick;

/// Blocking delay over a [`SysTick`] resource.
///
/// Requests longer than one full countdown are split into several
/// busy-waits. A request that cannot be served (a callback is armed on the
/// same counter, or the clock is unusable) is logged and returns early.
pub struct Delay<'a, H, C> {
    systick: &'a SysTick<H, C>,
}

impl<'a, H, C> Delay<'a, H, C> {
    pub fn new(systick: &'a SysTick<H, C>) -> Self {
        Self { systick }
    }
}

impl<H: CountdownTimer, C: ClockSource> Delay<'_, H, C> {
    /// Waits at least `us` microseconds: the tick count is rounded up, then
    /// served in countdowns no longer than the counter allows.
    fn wait_us(&mut self, us: u64) {
        let config = self.systick.config();
        let clock_hz = self.systick.clock().frequency_hz();
        let mut remaining = match convert::ticks_covering(us, clock_hz, config) {
            Ok(ticks) => ticks,
            Err(err) => {
                log::error!("stk: delay of {}us impossible: {}", us, err);
                return;
            }
        };
        let chunk = u64::from(config.max_reload());

        while remaining > 0 {
            let step = remaining.min(chunk);
            if let Err(err) = self.systick.busy_wait_ticks(step as u32) {
                log::error!("stk: delay abandoned with {} ticks left: {}", remaining, err);
                return;
            }
            remaining -= step;
        }
    }
}

impl<H: CountdownTimer, C: ClockSource> DelayNs for Delay<'_, H, C> {
    fn delay_ns(&mut self, ns: u32) {
        self.wait_us(u64::from(ns.div_ceil(1_000)));
    }

    fn delay_us(&mut self, us: u32) {
        self.wait_us(u64::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wait_us(u64::from(ms) * 1_000);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StkClockSource, StkConfig};
    use crate::sim::SimTimer;
    use mcal_core::{FixedClock, Hertz};

    fn elapsed<C: ClockSource>(systick: &SysTick<SimTimer, C>) -> u64 {
        systick.with_hardware(|hw| hw.elapsed_ticks())
    }

    #[test]
    fn short_delay_is_one_countdown() {
        let systick = SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(8)));
        systick.delay().delay_us(250);
        assert_eq!(elapsed(&systick), 250);
        assert!(!systick.state().enabled);
    }

    #[test]
    fn nanoseconds_round_up_to_microseconds() {
        let systick = SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(8)));
        systick.delay().delay_ns(1_001);
        assert_eq!(elapsed(&systick), 2);
    }

    #[test]
    fn long_delay_is_split_into_countdowns() {
        let config = StkConfig::builder()
            .clock_source(StkClockSource::AhbDiv8)
            .counter_bits(8)
            .build()
            .unwrap();
        let systick = SysTick::with_config(
            SimTimer::with_ticks_per_poll(16),
            FixedClock::new(Hertz::mhz(8)),
            config,
        );

        // 255us per countdown at one tick per microsecond.
        systick.delay().delay_ms(1);
        assert!(elapsed(&systick) >= 1_000);
        assert!(!systick.is_busy_waiting());
    }

    #[test]
    fn delay_never_undershoots_coarse_ticks() {
        // 1 MHz / 8: one tick lasts 8us.
        let systick = SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(1)));

        let mut before = 0;
        for us in [1u32, 7, 8, 9, 15, 16, 1_001] {
            systick.delay().delay_us(us);
            let waited_us = (elapsed(&systick) - before) * 8;
            assert!(waited_us >= u64::from(us), "{us}us request waited {waited_us}us");
            assert!(waited_us < u64::from(us) + 8);
            before = elapsed(&systick);
        }

        systick.delay().delay_ns(500);
        assert_eq!(elapsed(&systick) - before, 1);
    }

    #[test]
    fn delay_refuses_to_steal_an_armed_counter() {
        let systick = SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(8)));
        systick.schedule_periodic(1_000, || {}).unwrap();
        let before = systick.state();

        systick.delay().delay_us(10);

        assert_eq!(systick.state(), before);
        assert_eq!(systick.mode(), crate::SlotMode::Periodic);
    }
}
