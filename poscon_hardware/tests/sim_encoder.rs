use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use poscon_hardware::{SimParams, SimulatedDriver, SimulatedEncoder};
use poscon_traits::{EdgeSource, MonotonicClock, MotorDriver};
use rstest::rstest;

fn fast_params() -> SimParams {
    SimParams {
        reference_period: Duration::from_millis(5),
        pulses_per_sec_per_unit: 1_000,
        step: Duration::from_millis(1),
    }
}

#[rstest]
#[case(5, 1)]
#[case(-5, -1)]
fn edges_follow_commanded_direction(#[case] command: i32, #[case] sign: i64) {
    let mut driver = SimulatedDriver::new();
    let mut encoder = SimulatedEncoder::new(driver.shared(), fast_params(), MonotonicClock::new());

    let count = Arc::new(AtomicI64::new(0));
    let c = count.clone();
    encoder
        .on_leading_edge(Box::new(move |lagging_high| {
            c.fetch_add(if lagging_high { -1 } else { 1 }, Ordering::Relaxed);
        }))
        .expect("register leading edge");

    driver.drive(command).expect("drive");
    std::thread::sleep(Duration::from_millis(60));
    encoder.release().expect("release");

    let n = count.load(Ordering::Relaxed);
    assert!(n * sign > 0, "expected pulses with sign {sign}, got {n}");
}

#[test]
fn zero_command_produces_no_edges() {
    let driver = SimulatedDriver::new();
    let mut encoder = SimulatedEncoder::new(driver.shared(), fast_params(), MonotonicClock::new());
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    encoder
        .on_leading_edge(Box::new(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        }))
        .expect("register leading edge");
    std::thread::sleep(Duration::from_millis(20));
    drop(encoder);
    assert_eq!(count.load(Ordering::Relaxed), 0);
}

#[test]
fn reference_ticks_stop_after_release() {
    let driver = SimulatedDriver::new();
    let mut encoder = SimulatedEncoder::new(driver.shared(), fast_params(), MonotonicClock::new());
    let ticks = Arc::new(AtomicUsize::new(0));
    let t = ticks.clone();
    encoder
        .on_reference_edge(Box::new(move |_| {
            t.fetch_add(1, Ordering::Relaxed);
        }))
        .expect("register reference edge");
    std::thread::sleep(Duration::from_millis(40));
    encoder.release().expect("release");
    let seen = ticks.load(Ordering::Relaxed);
    assert!(seen > 0);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::Relaxed), seen);

    // A released source refuses new registrations.
    assert!(encoder.on_reference_edge(Box::new(|_| {})).is_err());
}
