//! Time-event trace records.

use alloc::boxed::Box;

use crate::scheduler::SlotMode;

/// One observable transition of the timer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceRecord {
    /// A callback request was armed.
    Arm { mode: SlotMode, period_ticks: u32 },
    /// A callback is about to be invoked.
    Post { mode: SlotMode },
    /// A single-shot request disarmed itself after firing.
    AutoDisarm,
    /// An armed request was cancelled or reset.
    Disarm { mode: SlotMode },
    /// Cancel was called with nothing armed.
    DisarmAttempt,
    /// A busy-wait countdown was started.
    BusyWait { ticks: u32 },
}

/// Receives trace records. Runs inside the critical section, so it must not
/// call back into the timer resource.
pub type TraceHook = Box<dyn Fn(TraceRecord) + Send + 'static>;
