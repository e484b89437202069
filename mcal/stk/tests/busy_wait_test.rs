//! Busy-wait tests for mcal-stk

use mcal_stk::{FixedClock, Hertz, MError, SimTimer, SlotMode, SysTick};

fn reference_systick() -> SysTick<SimTimer, FixedClock> {
    SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(8)))
}

fn elapsed(systick: &SysTick<SimTimer, FixedClock>) -> u64 {
    systick.with_hardware(|hw| hw.elapsed_ticks())
}

#[test]
fn test_busy_wait_reference_scenario() {
    let systick = reference_systick();

    systick.busy_wait(500).unwrap();

    assert_eq!(elapsed(&systick), 500);
    assert_eq!(systick.current_count(), 0);
    assert!(!systick.state().enabled);
    assert!(!systick.is_busy_waiting());
}

#[test]
fn test_busy_wait_masks_notification() {
    let systick = reference_systick();
    systick.start_wait(20).unwrap();

    assert!(!systick.with_hardware(|hw| hw.interrupt_enabled()));
    assert_eq!(systick.state().reload_value, 20);
}

#[test]
fn test_busy_wait_rejects_out_of_range() {
    let systick = reference_systick();

    assert_eq!(systick.busy_wait(16_777_216), Err(MError::OutOfRange));
    assert_eq!(elapsed(&systick), 0);
    assert!(!systick.is_busy_waiting());
}

#[test]
fn test_zero_duration_returns_immediately() {
    let systick = reference_systick();
    systick.busy_wait(0).unwrap();
    assert_eq!(elapsed(&systick), 0);

    // Below one tick at 1 MHz / 8.
    let slow = SysTick::new(SimTimer::new(), FixedClock::new(Hertz::mhz(1)));
    slow.busy_wait(7).unwrap();
    assert!(!slow.state().enabled);
}

#[test]
fn test_non_blocking_wait_polls_to_completion() {
    let systick = SysTick::new(
        SimTimer::with_ticks_per_poll(10),
        FixedClock::new(Hertz::mhz(8)),
    );

    systick.start_wait(100).unwrap();
    let mut polls = 0;
    loop {
        match systick.poll_wait() {
            Ok(()) => break,
            Err(nb::Error::WouldBlock) => polls += 1,
            Err(nb::Error::Other(err)) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(polls, 10);
    assert_eq!(systick.current_count(), 0);
    assert_eq!(systick.poll_wait(), Ok(()));
}

#[test]
fn test_busy_wait_refused_while_callback_armed() {
    let systick = reference_systick();
    systick.schedule_periodic(1_000, || {}).unwrap();

    assert_eq!(systick.busy_wait(10), Err(MError::ResourceConflict));
    assert_eq!(systick.mode(), SlotMode::Periodic);
    assert_eq!(systick.state().reload_value, 1_000);
}

#[test]
fn test_second_busy_wait_refused_while_first_runs() {
    let systick = reference_systick();
    systick.start_wait(1_000).unwrap();

    assert_eq!(systick.start_wait(10), Err(MError::ResourceConflict));
    assert_eq!(systick.state().reload_value, 1_000);
}

#[test]
fn test_counter_reusable_after_busy_wait() {
    let systick = reference_systick();
    systick.busy_wait(30).unwrap();

    let fired = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = std::sync::Arc::clone(&fired);
    systick
        .schedule_once(30, move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(systick.elapse(30), 1);
    assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
}

#[test]
fn test_stop_ends_outstanding_busy_wait() {
    let systick = reference_systick();
    systick.start_wait(100).unwrap();
    systick.with_hardware(|hw| hw.advance(40));

    systick.stop();
    assert!(!systick.is_busy_waiting());
    assert_eq!(
        systick.poll_wait(),
        Err(nb::Error::Other(MError::ResourceConflict))
    );
    assert_eq!(systick.poll_wait(), Ok(()));

    // The counter is free again.
    systick.schedule_once(10, || {}).unwrap();
    assert_eq!(systick.mode(), SlotMode::SingleShot);
    systick.cancel();
    systick.busy_wait(25).unwrap();
    assert_eq!(systick.current_count(), 0);
}

#[test]
fn test_reset_ends_outstanding_busy_wait() {
    let systick = reference_systick();
    systick.start_wait(100).unwrap();

    systick.reset();
    assert_eq!(
        systick.poll_wait(),
        Err(nb::Error::Other(MError::ResourceConflict))
    );
    assert_eq!(systick.init(50), Ok(()));
}

#[test]
fn test_zero_tick_busy_wait_leaves_counter_stopped() {
    let systick = reference_systick();
    systick.init(100).unwrap();
    systick.start();
    systick.elapse(30);
    assert_eq!(systick.current_count(), 70);

    systick.busy_wait(0).unwrap();

    assert!(!systick.state().enabled);
    assert_eq!(systick.current_count(), 0);
    assert_eq!(systick.elapse(1_000), 0);
}
