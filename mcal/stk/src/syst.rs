//! Cortex-M SysTick binding.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::config::StkClockSource;
use crate::hw::CountdownTimer;

impl CountdownTimer for SYST {
    #[inline]
    fn select_clock(&mut self, source: StkClockSource) {
        self.set_clock_source(match source {
            StkClockSource::Ahb => SystClkSource::Core,
            StkClockSource::AhbDiv8 => SystClkSource::External,
        });
    }

    #[inline]
    fn set_reload(&mut self, ticks: u32) {
        SYST::set_reload(self, ticks);
    }

    #[inline]
    fn reload(&self) -> u32 {
        SYST::get_reload()
    }

    #[inline]
    fn clear_current(&mut self) {
        SYST::clear_current(self);
    }

    #[inline]
    fn current(&self) -> u32 {
        SYST::get_current()
    }

    #[inline]
    fn enable_counter(&mut self) {
        SYST::enable_counter(self);
    }

    #[inline]
    fn disable_counter(&mut self) {
        SYST::disable_counter(self);
    }

    #[inline]
    fn enable_interrupt(&mut self) {
        SYST::enable_interrupt(self);
    }

    #[inline]
    fn disable_interrupt(&mut self) {
        SYST::disable_interrupt(self);
    }

    #[inline]
    fn has_wrapped(&mut self) -> bool {
        SYST::has_wrapped(self)
    }

    #[inline]
    fn clear_pending(&mut self) {
        SCB::clear_pendst();
    }
}
