//! The SysTick resource: one physical down-counter shared between the
//! busy-wait engine and the callback scheduler.
//!
//! Every multi-step update of the counter or the callback slot happens inside
//! `critical_section::with`, so the notification handler never sees a
//! half-armed slot and normal execution never races the single-shot
//! self-disarm. Handlers are invoked outside the critical section and may
//! call back into the resource.
//!
//! The counter cannot serve both engines at once. Starting a busy-wait while
//! a callback is armed, or arming a callback while a busy-wait is counting,
//! fails with [`MError::ResourceConflict`]. Hardware with several counters
//! gets one `SysTick` per counter.

use alloc::boxed::Box;
use core::cell::RefCell;

use critical_section::Mutex;
use mcal_core::{ClockSource, MError, MResult};

use crate::config::StkConfig;
use crate::convert;
use crate::delay::Delay;
use crate::hw::CountdownTimer;
use crate::scheduler::{CallbackSlot, Dispatch, Handler, SlotMode};
use crate::timer::{Notification, Timer, TimerState};
use crate::trace::{TraceHook, TraceRecord};

/// Shortest period a callback request is armed with.
pub const MIN_PERIOD_TICKS: u32 = 1;

/// Progress of the busy-wait engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Idle,
    Counting,
    /// The countdown was stopped or reset before it reached zero.
    Interrupted,
}

struct Inner<H> {
    timer: Timer<H>,
    slot: CallbackSlot,
    wait: Wait,
    trace: Option<TraceHook>,
}

impl<H> Inner<H> {
    fn emit(&self, record: TraceRecord) {
        if let Some(hook) = &self.trace {
            hook(record);
        }
    }

    fn in_use(&self) -> bool {
        self.wait == Wait::Counting || self.slot.mode() != SlotMode::Idle
    }
}

/// Down-counter resource with busy-wait and callback scheduling.
///
/// `new` is `const`, so with a const-constructible counter and clock the
/// resource can live in a `static` shared by `main` and the SysTick
/// exception handler, which calls [`SysTick::on_zero_crossing`].
pub struct SysTick<H, C> {
    inner: Mutex<RefCell<Inner<H>>>,
    clock: C,
    config: StkConfig,
}

impl<H, C> SysTick<H, C> {
    /// Resource with the reference configuration (AHB/8, 24-bit counter).
    pub const fn new(hw: H, clock: C) -> Self {
        Self::with_config(hw, clock, StkConfig::new())
    }

    pub const fn with_config(hw: H, clock: C, config: StkConfig) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                timer: Timer::new(hw, config),
                slot: CallbackSlot::new(),
                wait: Wait::Idle,
                trace: None,
            })),
            clock,
            config,
        }
    }

    /// Counter configuration fixed at construction.
    pub fn config(&self) -> &StkConfig {
        &self.config
    }

    /// Clock the durations are converted against.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Installs or removes the trace hook.
    pub fn set_trace_hook(&self, hook: Option<TraceHook>) {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).trace = hook;
        });
    }

    /// Runs `f` with exclusive access to the underlying counter.
    pub fn with_hardware<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        critical_section::with(|cs| f(self.inner.borrow_ref_mut(cs).timer.hardware()))
    }

    /// Releases the underlying counter.
    pub fn free(self) -> H {
        self.inner.into_inner().into_inner().timer.free()
    }
}

impl<H: CountdownTimer, C: ClockSource> SysTick<H, C> {
    fn ticks_for(&self, duration_us: u32) -> MResult<u32> {
        convert::to_ticks(duration_us, self.clock.frequency_hz(), &self.config)
    }

    /// Longest busy-wait or callback period representable at the current
    /// clock, in microseconds.
    pub fn max_duration_us(&self) -> MResult<u64> {
        convert::max_duration(self.clock.frequency_hz(), &self.config)
    }

    /// Loads `reload` and enables the notification without starting.
    ///
    /// Fails with [`MError::ResourceConflict`] while a callback is armed or a
    /// busy-wait is running, since either would lose its period.
    pub fn init(&self, reload: u32) -> MResult<()> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.in_use() {
                log::warn!("stk: init({}) rejected, timer in use", reload);
                return Err(MError::ResourceConflict);
            }
            inner.timer.init(reload)
        })
    }

    /// Starts counting. An armed request resumes where it was stopped.
    pub fn start(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).timer.start());
    }

    /// Stops counting without disarming the callback slot.
    ///
    /// An outstanding busy-wait ends early; its next [`SysTick::poll_wait`]
    /// reports [`MError::ResourceConflict`].
    pub fn stop(&self) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.timer.stop();
            if inner.wait == Wait::Counting {
                log::warn!("stk: busy-wait stopped before completion");
                inner.wait = Wait::Interrupted;
            }
        });
    }

    /// Hard reset of the counter. Also cancels any armed callback, since its
    /// notification source is gone.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.timer.reset();
            if inner.wait == Wait::Counting {
                inner.wait = Wait::Interrupted;
            }
            if let Some(mode) = inner.slot.disarm() {
                log::debug!("stk: reset cancelled {} request", mode);
                inner.emit(TraceRecord::Disarm { mode });
            }
        });
    }

    /// Current counter value.
    pub fn current_count(&self) -> u32 {
        critical_section::with(|cs| self.inner.borrow_ref(cs).timer.current_count())
    }

    /// Snapshot of reload value, current value and run state.
    pub fn state(&self) -> TimerState {
        critical_section::with(|cs| self.inner.borrow_ref(cs).timer.state())
    }

    /// Arming state of the callback slot.
    pub fn mode(&self) -> SlotMode {
        critical_section::with(|cs| self.inner.borrow_ref(cs).slot.mode())
    }

    /// Reload value of the armed request.
    pub fn period_ticks(&self) -> Option<u32> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).slot.period_ticks())
    }

    /// Whether a busy-wait countdown is in progress.
    pub fn is_busy_waiting(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).wait == Wait::Counting)
    }

    /// Blocks for `duration_us` microseconds by spinning on the counter.
    ///
    /// Returns with the counter stopped and cleared. No callback runs.
    pub fn busy_wait(&self, duration_us: u32) -> MResult<()> {
        self.start_wait(duration_us)?;
        nb::block!(self.poll_wait())
    }

    /// Starts a busy-wait countdown without blocking; complete it with
    /// [`SysTick::poll_wait`].
    pub fn start_wait(&self, duration_us: u32) -> MResult<()> {
        let ticks = self.ticks_for(duration_us).map_err(|err| {
            log::warn!("stk: busy-wait of {}us rejected: {}", duration_us, err);
            err
        })?;
        self.start_wait_ticks(ticks)
    }

    /// Busy-waits for exactly `ticks` counter ticks.
    pub(crate) fn busy_wait_ticks(&self, ticks: u32) -> MResult<()> {
        self.start_wait_ticks(ticks)?;
        nb::block!(self.poll_wait())
    }

    /// A count of zero stops and clears the counter and starts nothing.
    fn start_wait_ticks(&self, ticks: u32) -> MResult<()> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.in_use() {
                log::warn!("stk: busy-wait rejected, timer in use");
                return Err(MError::ResourceConflict);
            }
            if ticks == 0 {
                inner.timer.stop();
                inner.timer.clear_count();
                inner.wait = Wait::Idle;
                return Ok(());
            }

            inner.timer.configure(ticks, Notification::Masked)?;
            inner.timer.start();
            inner.wait = Wait::Counting;
            inner.emit(TraceRecord::BusyWait { ticks });
            Ok(())
        })
    }

    /// Polls the busy-wait countdown. `WouldBlock` until it reaches zero;
    /// `Ok` once no busy-wait is outstanding. A countdown cut short by
    /// [`SysTick::stop`] or [`SysTick::reset`] is reported once as
    /// [`MError::ResourceConflict`].
    pub fn poll_wait(&self) -> nb::Result<(), MError> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            match inner.wait {
                Wait::Idle => return Ok(()),
                Wait::Interrupted => {
                    inner.wait = Wait::Idle;
                    return Err(nb::Error::Other(MError::ResourceConflict));
                }
                Wait::Counting => {}
            }

            if inner.timer.has_wrapped() {
                inner.timer.stop();
                inner.timer.clear_count();
                inner.wait = Wait::Idle;
                Ok(())
            } else {
                inner.timer.relax();
                Err(nb::Error::WouldBlock)
            }
        })
    }

    /// Runs `handler` once, `duration_us` microseconds from now.
    pub fn schedule_once<F>(&self, duration_us: u32, handler: F) -> MResult<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.arm(SlotMode::SingleShot, duration_us, Box::new(handler))
    }

    /// Runs `handler` every `duration_us` microseconds until cancelled.
    pub fn schedule_periodic<F>(&self, duration_us: u32, handler: F) -> MResult<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.arm(SlotMode::Periodic, duration_us, Box::new(handler))
    }

    fn arm(&self, mode: SlotMode, duration_us: u32, handler: Handler) -> MResult<()> {
        let period_ticks = self
            .ticks_for(duration_us)
            .map_err(|err| {
                log::warn!("stk: {} request of {}us rejected: {}", mode, duration_us, err);
                err
            })?
            .max(MIN_PERIOD_TICKS);

        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.wait == Wait::Counting {
                log::warn!("stk: {} request rejected, busy-wait in progress", mode);
                return Err(MError::ResourceConflict);
            }

            inner.timer.configure(period_ticks, Notification::Enabled)?;
            let replaced = inner.slot.arm(mode, period_ticks, handler);
            inner.timer.start();

            log::debug!(
                "stk: armed {} request, {} ticks (replaced {})",
                mode,
                period_ticks,
                replaced
            );
            inner.emit(TraceRecord::Arm { mode, period_ticks });
            Ok(())
        })
    }

    /// Disarms the callback slot and stops the counter.
    pub fn cancel(&self) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.wait == Wait::Counting {
                // The counter belongs to the busy-wait, leave it running.
                inner.emit(TraceRecord::DisarmAttempt);
                return;
            }

            inner.timer.stop();
            match inner.slot.disarm() {
                Some(mode) => {
                    log::debug!("stk: cancelled {} request", mode);
                    inner.emit(TraceRecord::Disarm { mode });
                }
                None => inner.emit(TraceRecord::DisarmAttempt),
            }
        });
    }

    /// Zero-crossing notification entry point. Call from the SysTick
    /// exception handler.
    pub fn on_zero_crossing(&self) {
        let dispatch = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let dispatch = inner.slot.take_for_dispatch();
            match &dispatch {
                Dispatch::Nothing => {}
                Dispatch::Once(_) => {
                    inner.timer.stop();
                    inner.emit(TraceRecord::AutoDisarm);
                    inner.emit(TraceRecord::Post {
                        mode: SlotMode::SingleShot,
                    });
                }
                Dispatch::Periodic { .. } => inner.emit(TraceRecord::Post {
                    mode: SlotMode::Periodic,
                }),
            }
            dispatch
        });

        match dispatch {
            Dispatch::Nothing => log::trace!("stk: notification with nothing to dispatch"),
            Dispatch::Once(mut handler) => handler(),
            Dispatch::Periodic {
                mut handler,
                generation,
            } => {
                handler();
                critical_section::with(|cs| {
                    self.inner
                        .borrow_ref_mut(cs)
                        .slot
                        .restore(handler, generation);
                });
            }
        }
    }

    /// Blocking delay provider over this resource.
    pub fn delay(&self) -> Delay<'_, H, C> {
        Delay::new(self)
    }
}
