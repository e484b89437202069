//! Register-level seam to the physical down-counter.
//!
//! The method set mirrors what a SysTick-style peripheral offers: a reload
//! register, a current-value register that is cleared by any write, a
//! counter enable, a notification (exception) enable, and a sticky count flag
//! set on every 1 → 0 transition and cleared when read.

use crate::config::StkClockSource;

/// Down-counting timer with auto-reload.
pub trait CountdownTimer {
    /// Selects the clock feeding the counter.
    fn select_clock(&mut self, source: StkClockSource);

    /// Writes the reload register.
    fn set_reload(&mut self, ticks: u32);

    /// Reads the reload register.
    fn reload(&self) -> u32;

    /// Clears the current-value register to zero.
    fn clear_current(&mut self);

    /// Reads the current-value register.
    fn current(&self) -> u32;

    fn enable_counter(&mut self);

    fn disable_counter(&mut self);

    /// Enables the zero-crossing notification.
    fn enable_interrupt(&mut self);

    /// Masks the zero-crossing notification.
    fn disable_interrupt(&mut self);

    /// Returns whether the counter reached zero since the last call, clearing
    /// the flag.
    fn has_wrapped(&mut self) -> bool;

    /// Drops a notification that is pending but not yet delivered.
    fn clear_pending(&mut self);

    /// Called once per iteration while spinning on the counter.
    fn relax(&mut self) {
        core::hint::spin_loop();
    }
}
