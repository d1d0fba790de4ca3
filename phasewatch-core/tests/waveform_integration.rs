//! Integration tests for raw waveform capture

mod common;

use phasewatch_core::{
    constants::adc::ADC_MAX,
    sim::{SineChannel, ThreePhaseSource},
    time::SimClock,
    Channel, MeterConfig, Phase, WaveformCapture,
};

use common::{supply, FailingSource, RecordingSource};

#[test]
fn test_ticks_are_uniformly_spaced() {
    let clock = SimClock::new(1_000);
    let inner = supply(&clock, [220.0; 3], 50.0).with_conversion_us(10);
    let mut adc = RecordingSource::new(inner, &clock);
    let capture = WaveformCapture::new(&MeterConfig::default()).unwrap();

    let snapshot = capture.capture(&mut adc, &clock).unwrap();

    let a = adc.times_on(Channel(0));
    let b = adc.times_on(Channel(1));
    let c = adc.times_on(Channel(2));
    assert_eq!(a.len(), 100);
    assert!(a.windows(2).all(|w| w[1] - w[0] == 200));

    // B and C follow A back-to-back within each tick
    for i in 0..100 {
        assert_eq!(b[i], a[i] + 10);
        assert_eq!(c[i], a[i] + 20);
    }

    assert_eq!(a[0], 1_000);
    assert_eq!(snapshot.captured_at_ms, 1);
}

#[test]
fn test_traces_follow_the_signal() {
    let clock = SimClock::new(0);
    let mut adc = ThreePhaseSource::new(
        &clock,
        [
            SineChannel::new(2048.0, 1000.0, 50.0, 0.0),
            SineChannel::quiet(1000.0),
            SineChannel::new(2048.0, 4000.0, 50.0, 90.0),
        ],
    );
    let capture = WaveformCapture::new(&MeterConfig::default()).unwrap();

    let snapshot = capture.capture(&mut adc, &clock).unwrap();

    // 100 ticks at 200 µs is exactly one 50 Hz period
    let a = snapshot.phase(Phase::A);
    assert_eq!(a[0], 2048);
    assert_eq!(a[25], 3048);
    assert_eq!(a[75], 1048);

    assert!(snapshot.phase(Phase::B).iter().all(|raw| *raw == 1000));

    // overdriven input stays inside the converter range
    let c = snapshot.phase(Phase::C);
    assert_eq!(c[0], ADC_MAX);
    assert_eq!(c[50], 0);
}

#[test]
fn test_fault_aborts_capture() {
    let clock = SimClock::new(0);
    let mut adc = FailingSource::after(supply(&clock, [220.0; 3], 50.0), 50);
    let capture = WaveformCapture::new(&MeterConfig::default()).unwrap();

    assert!(capture.capture(&mut adc, &clock).is_err());
}
