//! Hosted model of the SysTick counter.
//!
//! [`SimTimer`] follows the Cortex-M SysTick rules closely enough to exercise
//! the scheduler without silicon:
//!
//! - enabling the counter while the current value is zero loads the reload
//!   value;
//! - every tick decrements the current value; the 1 → 0 transition sets the
//!   count flag and, if the notification is enabled, pends it;
//! - the tick after zero reloads, so a free-running period is `reload + 1`;
//! - a reload value of zero never produces a notification.
//!
//! Time only moves when the test says so: [`SimTimer::advance`] directly,
//! [`SysTick::elapse`] with notification delivery, or `ticks_per_poll` ticks
//! on every busy-wait poll.

use mcal_core::ClockSource;

use crate::config::StkClockSource;
use crate::hw::CountdownTimer;
use crate::systick::SysTick;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimTimer {
    reload: u32,
    current: u32,
    counter_enabled: bool,
    interrupt_enabled: bool,
    count_flag: bool,
    pending: bool,
    clock_source: Option<StkClockSource>,
    ticks_per_poll: u32,
    elapsed: u64,
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTimer {
    /// Power-on state; each busy-wait poll lets one tick elapse.
    pub const fn new() -> Self {
        Self::with_ticks_per_poll(1)
    }

    pub const fn with_ticks_per_poll(ticks_per_poll: u32) -> Self {
        Self {
            reload: 0,
            current: 0,
            counter_enabled: false,
            interrupt_enabled: false,
            count_flag: false,
            pending: false,
            clock_source: None,
            ticks_per_poll,
            elapsed: 0,
        }
    }

    /// Runs the counter for `ticks` ticks and returns how many times it
    /// reached zero. Does nothing while the counter is disabled.
    pub fn advance(&mut self, ticks: u32) -> u32 {
        let mut remaining = ticks;
        let mut crossings = 0;

        while remaining > 0 && self.counter_enabled {
            if self.current == 0 {
                if self.reload == 0 {
                    self.elapsed += u64::from(remaining);
                    break;
                }
                self.current = self.reload;
                remaining -= 1;
                self.elapsed += 1;
                continue;
            }

            let step = remaining.min(self.current);
            self.current -= step;
            remaining -= step;
            self.elapsed += u64::from(step);

            if self.current == 0 {
                self.count_flag = true;
                if self.interrupt_enabled {
                    self.pending = true;
                }
                crossings += 1;
            }
        }
        crossings
    }

    /// Ticks until the next 1 → 0 transition, `None` if there is none coming.
    pub fn ticks_to_zero(&self) -> Option<u32> {
        if !self.counter_enabled {
            return None;
        }
        match (self.current, self.reload) {
            (0, 0) => None,
            (0, reload) => Some(reload.saturating_add(1)),
            (current, _) => Some(current),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Acknowledges a pending notification, as exception entry does.
    pub fn take_pending(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }

    pub fn counter_enabled(&self) -> bool {
        self.counter_enabled
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    pub fn clock_source(&self) -> Option<StkClockSource> {
        self.clock_source
    }

    /// Total ticks counted since construction.
    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed
    }
}

impl CountdownTimer for SimTimer {
    fn select_clock(&mut self, source: StkClockSource) {
        self.clock_source = Some(source);
    }

    fn set_reload(&mut self, ticks: u32) {
        self.reload = ticks;
    }

    fn reload(&self) -> u32 {
        self.reload
    }

    fn clear_current(&mut self) {
        self.current = 0;
        self.count_flag = false;
    }

    fn current(&self) -> u32 {
        self.current
    }

    fn enable_counter(&mut self) {
        if !self.counter_enabled {
            self.counter_enabled = true;
            if self.current == 0 {
                self.current = self.reload;
            }
        }
    }

    fn disable_counter(&mut self) {
        self.counter_enabled = false;
    }

    fn enable_interrupt(&mut self) {
        self.interrupt_enabled = true;
    }

    fn disable_interrupt(&mut self) {
        self.interrupt_enabled = false;
    }

    fn has_wrapped(&mut self) -> bool {
        core::mem::take(&mut self.count_flag)
    }

    fn clear_pending(&mut self) {
        self.pending = false;
    }

    fn relax(&mut self) {
        self.advance(self.ticks_per_poll);
    }
}

impl<C: ClockSource> SysTick<SimTimer, C> {
    /// Lets `ticks` counter ticks pass, calling [`SysTick::on_zero_crossing`]
    /// for each notification at the moment it is raised. Returns the number of
    /// notifications delivered.
    pub fn elapse(&self, ticks: u32) -> u32 {
        let mut remaining = ticks;
        let mut delivered = 0;

        while remaining > 0 {
            let (consumed, raised) = self.with_hardware(|hw| {
                let step = hw
                    .ticks_to_zero()
                    .map_or(remaining, |to_zero| to_zero.min(remaining));
                hw.advance(step);
                (step, hw.take_pending())
            });
            remaining -= consumed;

            if raised {
                self.on_zero_crossing();
                delivered += 1;
            }
        }
        delivered
    }
}
