#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # MCAL STK
//!
//! Timing core built on a SysTick-style 24-bit down-counter.
//!
//! ## Module Overview
//! - [`convert`]   – microseconds ⇄ reload value at the current clock rate.
//! - [`hw`]        – register-level seam to the physical counter.
//! - [`timer`]     – range-checked init/start/stop/reset lifecycle.
//! - [`scheduler`] – single-shot / periodic callback slot.
//! - [`systick`]   – the shared resource tying the above together: busy-wait,
//!   callback scheduling and the notification entry point.
//! - `sim`         – hosted counter model for tests (feature `sim`).
//!
//! ## Usage
//!
//! ```rust,ignore
//! static SYSTICK: SysTick<SYST, FixedClock> = /* ... */;
//!
//! SYSTICK.schedule_periodic(1_000, || toggle_led())?;
//!
//! #[exception]
//! fn SysTick() {
//!     SYSTICK.on_zero_crossing();
//! }
//! ```

extern crate alloc;

pub mod config;
pub mod convert;
pub mod delay;
pub mod hw;
pub mod scheduler;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod systick;
pub mod timer;
pub mod trace;

#[cfg(feature = "cortex-m")]
mod syst;

pub use config::{StkClockSource, StkConfig, StkConfigBuilder, MAX_RELOAD_24BIT};
pub use delay::Delay;
pub use hw::CountdownTimer;
pub use mcal_core::{ClockSource, FixedClock, Hertz, MError, MResult};
pub use scheduler::{Handler, SlotMode};
#[cfg(any(test, feature = "sim"))]
pub use sim::SimTimer;
pub use systick::{SysTick, MIN_PERIOD_TICKS};
pub use timer::{Notification, Timer, TimerState};
pub use trace::{TraceHook, TraceRecord};
