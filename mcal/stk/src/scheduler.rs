//! Callback slot state machine.
//!
//! The slot holds at most one request. Arming replaces whatever was there.
//! On a zero-crossing notification a single-shot request is removed
//! outright, while a periodic request lends its handler out for the call and
//! gets it back afterwards unless the slot was re-armed or cancelled in the
//! meantime. The generation counter tells the two cases apart.

use alloc::boxed::Box;
use core::fmt;

/// Zero-argument callback run from the notification handler.
///
/// Handlers run in interrupt context: they must be short and must not block.
pub type Handler = Box<dyn FnMut() + Send + 'static>;

/// Arming state of the callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotMode {
    Idle,
    SingleShot,
    Periodic,
}

impl fmt::Display for SlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotMode::Idle => write!(f, "idle"),
            SlotMode::SingleShot => write!(f, "single-shot"),
            SlotMode::Periodic => write!(f, "periodic"),
        }
    }
}

/// What a notification should run.
pub(crate) enum Dispatch {
    Nothing,
    Once(Handler),
    Periodic { handler: Handler, generation: u32 },
}

pub(crate) struct CallbackSlot {
    mode: SlotMode,
    handler: Option<Handler>,
    period_ticks: u32,
    generation: u32,
}

impl CallbackSlot {
    pub(crate) const fn new() -> Self {
        Self {
            mode: SlotMode::Idle,
            handler: None,
            period_ticks: 0,
            generation: 0,
        }
    }

    pub(crate) fn mode(&self) -> SlotMode {
        self.mode
    }

    pub(crate) fn period_ticks(&self) -> Option<u32> {
        match self.mode {
            SlotMode::Idle => None,
            _ => Some(self.period_ticks),
        }
    }

    /// Installs a request, dropping the previous handler. Returns the mode
    /// that was replaced.
    pub(crate) fn arm(&mut self, mode: SlotMode, period_ticks: u32, handler: Handler) -> SlotMode {
        debug_assert!(mode != SlotMode::Idle);
        let previous = self.mode;
        self.mode = mode;
        self.period_ticks = period_ticks;
        self.handler = Some(handler);
        self.generation = self.generation.wrapping_add(1);
        previous
    }

    /// Returns the slot to idle. Returns the mode that was cancelled, `None`
    /// if nothing was armed.
    pub(crate) fn disarm(&mut self) -> Option<SlotMode> {
        if self.mode == SlotMode::Idle {
            return None;
        }
        let previous = self.mode;
        self.mode = SlotMode::Idle;
        self.period_ticks = 0;
        self.handler = None;
        self.generation = self.generation.wrapping_add(1);
        Some(previous)
    }

    pub(crate) fn take_for_dispatch(&mut self) -> Dispatch {
        match self.mode {
            SlotMode::Idle => Dispatch::Nothing,
            SlotMode::SingleShot => {
                let handler = self.handler.take();
                self.mode = SlotMode::Idle;
                self.period_ticks = 0;
                self.generation = self.generation.wrapping_add(1);
                handler.map_or(Dispatch::Nothing, Dispatch::Once)
            }
            // A handler already out on loan means the notification re-entered
            // a running dispatch; that period is lost.
            SlotMode::Periodic => match self.handler.take() {
                Some(handler) => Dispatch::Periodic {
                    handler,
                    generation: self.generation,
                },
                None => Dispatch::Nothing,
            },
        }
    }

    /// Hands a periodic handler back after its call. Dropped if the slot
    /// changed while it was running.
    pub(crate) fn restore(&mut self, handler: Handler, generation: u32) {
        if self.mode == SlotMode::Periodic
            && self.generation == generation
            && self.handler.is_none()
        {
            self.handler = Some(handler);
        }
    }
}
