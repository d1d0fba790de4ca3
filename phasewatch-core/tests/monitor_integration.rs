//! Integration tests for the measurement driver
//!
//! Drives a [`Monitor`] through simulated time the way a firmware main loop
//! would and checks cadence, retention and sink failure handling.

mod common;

use phasewatch_core::{
    time::{Clock, SimClock},
    MeterError, Monitor,
};

use common::{quick_config, supply, FailingSource, RecordingSink};

/// Poll every `step_ms` until the clock reaches `until_ms`
fn run_loop<S, K>(monitor: &mut Monitor<K>, adc: &mut S, clock: &SimClock, step_ms: u64, until_ms: u64)
where
    S: phasewatch_core::SampleSource,
    K: phasewatch_core::TelemetrySink,
{
    while clock.now_ms() < until_ms {
        monitor.poll(&mut *adc, clock).unwrap();
        clock.advance_ms(step_ms);
    }
}

#[test]
fn test_cadence_over_ten_seconds() {
    let clock = SimClock::new(0);
    let mut adc = supply(&clock, [220.0; 3], 50.0);
    let sink = RecordingSink::default();
    let mut monitor = Monitor::new(quick_config())
        .unwrap()
        .with_device_id("esp32-001")
        .unwrap()
        .with_sink(sink.clone());

    run_loop(&mut monitor, &mut adc, &clock, 50, 10_000);

    let count = monitor.measurement_count();
    assert!((9..=10).contains(&count), "measured {count} times");

    let log = sink.log.borrow();
    assert_eq!(log.power.len() as u64, count);
    assert_eq!(log.waveforms.len(), 2);
    assert_eq!(monitor.sink_deliveries(), count + 2);
    assert_eq!(monitor.sink_failures(), 0);
    assert!(log.power.iter().all(|(id, _)| id == "esp32-001"));
    assert!(log.power.windows(2).all(|w| w[1].1.timestamp_ms - w[0].1.timestamp_ms >= 999));

    let last = monitor.last_power().unwrap();
    assert_eq!(*last, log.power.last().unwrap().1);
    assert!(!monitor.has_problems());
}

#[test]
fn test_sink_failures_are_counted_not_fatal() {
    let clock = SimClock::new(0);
    let mut adc = supply(&clock, [220.0; 3], 50.0);
    let sink = RecordingSink::default();
    let mut monitor = Monitor::new(quick_config()).unwrap().with_sink(sink.clone());

    sink.set_failing(true);
    let outcome = monitor.poll(&mut adc, &clock).unwrap();
    assert!(outcome.measured && outcome.captured);
    assert_eq!(monitor.sink_failures(), 2);
    assert_eq!(monitor.sink_deliveries(), 0);
    assert!(monitor.last_power().is_some());
    assert!(monitor.last_waveform().is_some());

    sink.set_failing(false);
    clock.advance_ms(1000);
    monitor.poll(&mut adc, &clock).unwrap();

    assert_eq!(monitor.sink_failures(), 2);
    assert_eq!(monitor.sink_deliveries(), 1);
    assert_eq!(monitor.measurement_count(), 2);
    assert_eq!(sink.log.borrow().power.len(), 1);
    assert_eq!(sink.log.borrow().rejected, 2);
}

#[test]
fn test_converter_fault_keeps_last_snapshot() {
    let clock = SimClock::new(0);
    let mut adc = supply(&clock, [220.0; 3], 50.0);
    let mut monitor = Monitor::new(quick_config().with_schedule(1000, 0, 0)).unwrap();

    monitor.poll(&mut adc, &clock).unwrap();
    let first = *monitor.last_power().unwrap();

    clock.advance_ms(1000);
    let mut flaky = FailingSource::after(&mut adc, 10);
    let err = monitor.poll(&mut flaky, &clock).unwrap_err();

    assert_eq!(err, MeterError::Converter { channel: 0 });
    assert_eq!(*monitor.last_power().unwrap(), first);
    assert_eq!(monitor.measurement_count(), 1);
}

#[test]
fn test_problems_surface_through_driver() {
    let clock = SimClock::new(0);
    let mut adc = supply(&clock, [250.0, 250.0, 250.0], 50.0);
    let mut monitor = Monitor::new(quick_config()).unwrap();

    monitor.poll(&mut adc, &clock).unwrap();

    assert!(monitor.has_problems());
    assert_eq!(monitor.last_power().unwrap().describe_problems().as_str(), "HIGH_V");
}
