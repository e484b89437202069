//! Hardware timer abstraction.
//!
//! [`Timer`] owns a [`CountdownTimer`] and turns the raw register operations
//! into the lifecycle the rest of the crate relies on: reload values are
//! range-checked before they reach the hardware, `start`/`stop` are
//! idempotent, and `reset` returns the peripheral to its power-on state.

use mcal_core::{MError, MResult};

use crate::config::StkConfig;
use crate::hw::CountdownTimer;

/// Snapshot of the counter registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub reload_value: u32,
    pub current_count: u32,
    pub enabled: bool,
}

/// Whether the zero-crossing notification is delivered while counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Enabled,
    Masked,
}

/// Lifecycle wrapper over one physical down-counter.
#[derive(Debug)]
pub struct Timer<H> {
    hw: H,
    config: StkConfig,
    running: bool,
}

impl<H> Timer<H> {
    /// Wraps `hw`; the counter is assumed stopped.
    pub const fn new(hw: H, config: StkConfig) -> Self {
        Self {
            hw,
            config,
            running: false,
        }
    }

    pub fn config(&self) -> &StkConfig {
        &self.config
    }

    /// Whether the counter was started and not stopped since.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn hardware(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Releases the underlying counter.
    pub fn free(self) -> H {
        self.hw
    }
}

impl<H: CountdownTimer> Timer<H> {
    /// Loads `reload` and enables the zero-crossing notification without
    /// starting the counter.
    pub fn init(&mut self, reload: u32) -> MResult<()> {
        self.configure(reload, Notification::Enabled)
    }

    /// Stops the counter and loads `reload`, clearing any stale count flag or
    /// pending notification.
    pub fn configure(&mut self, reload: u32, notification: Notification) -> MResult<()> {
        if reload > self.config.max_reload() {
            return Err(MError::OutOfRange);
        }

        self.stop();
        self.hw.select_clock(self.config.clock_source);
        self.hw.set_reload(reload);
        self.hw.clear_current();
        let _ = self.hw.has_wrapped();
        self.hw.clear_pending();
        match notification {
            Notification::Enabled => self.hw.enable_interrupt(),
            Notification::Masked => self.hw.disable_interrupt(),
        }
        Ok(())
    }

    pub fn start(&mut self) {
        if !self.running {
            self.hw.enable_counter();
            self.running = true;
        }
    }

    /// Halts the counter, keeping the current value.
    pub fn stop(&mut self) {
        self.hw.disable_counter();
        self.running = false;
    }

    /// Stops the counter, masks the notification, zeroes both the current
    /// value and the reload value and drops any pending notification.
    pub fn reset(&mut self) {
        self.hw.disable_counter();
        self.hw.disable_interrupt();
        self.hw.clear_current();
        self.hw.set_reload(0);
        let _ = self.hw.has_wrapped();
        self.hw.clear_pending();
        self.running = false;
    }

    /// Zeroes the current value, leaving the reload value alone.
    pub fn clear_count(&mut self) {
        self.hw.clear_current();
    }

    pub fn current_count(&self) -> u32 {
        self.hw.current()
    }

    pub fn reload_value(&self) -> u32 {
        self.hw.reload()
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            reload_value: self.hw.reload(),
            current_count: self.hw.current(),
            enabled: self.running,
        }
    }

    /// Reads and clears the count flag.
    pub fn has_wrapped(&mut self) -> bool {
        self.hw.has_wrapped()
    }

    pub fn relax(&mut self) {
        self.hw.relax();
    }
}
