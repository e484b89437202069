//! Callback scheduling tests for mcal-stk, run against the hosted counter model

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mcal_stk::{FixedClock, Hertz, MError, SimTimer, SlotMode, SysTick, TimerState};

type SimSysTick = SysTick<SimTimer, FixedClock>;

/// 8 MHz core on AHB/8: one tick per microsecond.
fn reference_systick() -> SimSysTick {
    SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(8)))
}

fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let probe = Arc::clone(&hits);
    (hits, move || {
        probe.fetch_add(1, Ordering::SeqCst);
    })
}

fn hits(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

#[test]
fn test_single_shot_reference_scenario() {
    let systick = reference_systick();
    let (fired, handler) = counter();

    systick.schedule_once(1_000, handler).unwrap();
    assert_eq!(systick.mode(), SlotMode::SingleShot);
    assert_eq!(systick.state().reload_value, 1_000);

    assert_eq!(systick.elapse(999), 0);
    assert_eq!(hits(&fired), 0);

    assert_eq!(systick.elapse(1), 1);
    assert_eq!(hits(&fired), 1);
    assert_eq!(systick.mode(), SlotMode::Idle);
    assert!(!systick.state().enabled);
}

#[test]
fn test_single_shot_ignores_later_countdowns() {
    let systick = reference_systick();
    let (fired, handler) = counter();

    systick.schedule_once(100, handler).unwrap();
    systick.elapse(100);

    // Leave the hardware running after the request has disarmed itself.
    systick.start();
    assert_eq!(systick.elapse(1_000), 9);
    assert_eq!(hits(&fired), 1);
    assert_eq!(systick.mode(), SlotMode::Idle);
}

#[test]
fn test_periodic_fires_every_cycle() {
    let systick = reference_systick();
    let (fired, handler) = counter();

    systick.schedule_periodic(50, handler).unwrap();

    // First countdown starts from the reload value, later ones include the
    // reload tick.
    systick.elapse(50);
    assert_eq!(hits(&fired), 1);

    for cycle in 2..=10 {
        systick.elapse(51);
        assert_eq!(hits(&fired), cycle);
        assert_eq!(systick.mode(), SlotMode::Periodic);
    }
}

#[test]
fn test_overwrite_replaces_pending_request() {
    let systick = reference_systick();
    let (first, h1) = counter();
    let (second, h2) = counter();

    systick.schedule_once(100, h1).unwrap();
    systick.elapse(60);
    systick.schedule_periodic(200, h2).unwrap();
    assert_eq!(systick.period_ticks(), Some(200));

    systick.elapse(200);
    systick.elapse(201 * 3);

    assert_eq!(hits(&first), 0);
    assert_eq!(hits(&second), 4);
    assert_eq!(systick.mode(), SlotMode::Periodic);
}

#[test]
fn test_cancel_stops_all_dispatch() {
    let systick = reference_systick();
    let (fired, handler) = counter();

    systick.schedule_periodic(10, handler).unwrap();
    systick.elapse(10);
    systick.cancel();

    assert_eq!(systick.mode(), SlotMode::Idle);
    assert_eq!(systick.elapse(10_000), 0);

    // Even with the counter restarted, nothing is armed.
    systick.start();
    systick.elapse(10_000);
    assert_eq!(hits(&fired), 1);
}

#[test]
fn test_out_of_range_leaves_slot_untouched() {
    let systick = reference_systick();
    let (fired, handler) = counter();
    let (rejected, late) = counter();

    systick.schedule_periodic(300, handler).unwrap();
    systick.elapse(100);
    let before = systick.state();

    assert_eq!(
        systick.schedule_once(16_777_216, late),
        Err(MError::OutOfRange)
    );
    assert_eq!(
        systick.schedule_periodic(u32::MAX, || {}),
        Err(MError::OutOfRange)
    );

    assert_eq!(systick.state(), before);
    assert_eq!(systick.mode(), SlotMode::Periodic);
    assert_eq!(systick.period_ticks(), Some(300));

    systick.elapse(200);
    assert_eq!(hits(&fired), 1);
    assert_eq!(hits(&rejected), 0);
}

#[test]
fn test_largest_duration_is_accepted() {
    let systick = reference_systick();
    systick.schedule_once(16_777_215, || {}).unwrap();
    assert_eq!(systick.period_ticks(), Some(16_777_215));
}

#[test]
fn test_reset_cancels_armed_request() {
    let systick = reference_systick();
    let (fired, handler) = counter();

    systick.schedule_periodic(20, handler).unwrap();
    systick.reset();

    assert_eq!(systick.mode(), SlotMode::Idle);
    assert_eq!(
        systick.state(),
        TimerState {
            reload_value: 0,
            current_count: 0,
            enabled: false,
        }
    );

    systick.start();
    assert_eq!(systick.elapse(1_000), 0);
    assert_eq!(hits(&fired), 0);
}

#[test]
fn test_stop_pauses_and_start_resumes() {
    let systick = reference_systick();
    let (fired, handler) = counter();

    systick.schedule_once(100, handler).unwrap();
    systick.elapse(40);
    systick.stop();
    assert_eq!(systick.elapse(1_000), 0);
    assert_eq!(systick.current_count(), 60);
    assert_eq!(systick.mode(), SlotMode::SingleShot);

    systick.start();
    systick.elapse(60);
    assert_eq!(hits(&fired), 1);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let systick = reference_systick();
    systick.init(500).unwrap();

    systick.start();
    systick.elapse(5);
    let started = systick.state();
    systick.start();
    assert_eq!(systick.state(), started);

    systick.stop();
    let stopped = systick.state();
    systick.stop();
    assert_eq!(systick.state(), stopped);
}

#[test]
fn test_init_rejected_while_armed() {
    let systick = reference_systick();
    systick.schedule_periodic(100, || {}).unwrap();

    assert_eq!(systick.init(5), Err(MError::ResourceConflict));
    assert_eq!(systick.period_ticks(), Some(100));

    systick.cancel();
    assert_eq!(systick.init(5), Ok(()));
    assert_eq!(systick.init(0x0100_0000), Err(MError::OutOfRange));
}

#[test]
fn test_arming_rejected_during_busy_wait() {
    let systick = reference_systick();
    systick.start_wait(1_000).unwrap();

    assert_eq!(
        systick.schedule_once(10, || {}),
        Err(MError::ResourceConflict)
    );
    assert_eq!(systick.mode(), SlotMode::Idle);
    assert!(systick.is_busy_waiting());
}

#[test]
fn test_clock_is_read_per_request() {
    let slow = SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(72)));
    slow.schedule_once(1_000, || {}).unwrap();
    assert_eq!(slow.period_ticks(), Some(9_000));

    // 16.7 s does not fit at 72 MHz / 8.
    assert_eq!(
        slow.schedule_once(16_777_215, || {}),
        Err(MError::OutOfRange)
    );
}

#[test]
fn test_zero_clock_is_rejected() {
    let systick = SysTick::new(SimTimer::new(), FixedClock::new(Hertz::hz(0)));
    assert_eq!(
        systick.schedule_once(10, || {}),
        Err(MError::InvalidClock)
    );
    assert_eq!(systick.busy_wait(10), Err(MError::InvalidClock));
}
