//! Common test utilities for integration tests
//!
//! This module provides:
//! - Sources that record when and where each conversion happened
//! - Sources that fail on demand
//! - A sink that keeps what it was given
//! - Supply scenarios built on the simulated three-phase source

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use phasewatch_core::{
    sim::{SineChannel, ThreePhaseSource},
    time::{Clock, Micros, SimClock},
    traits::{Channel, RawSample, SampleSource, TelemetrySink},
    MeterConfig, PowerSnapshot, WaveformSnapshot,
};

/// Sensitivity used by every scenario
pub const SENSITIVITY: f32 = 0.23;

/// One conversion seen by a [`RecordingSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub channel: Channel,
    pub at_us: Micros,
    pub raw: RawSample,
}

/// Wraps a source and logs every conversion with the clock time it started at
pub struct RecordingSource<'a, S> {
    inner: S,
    clock: &'a SimClock,
    pub log: Vec<Conversion>,
}

impl<'a, S: SampleSource> RecordingSource<'a, S> {
    pub fn new(inner: S, clock: &'a SimClock) -> Self {
        Self { inner, clock, log: Vec::new() }
    }

    /// Start times of the conversions on one channel
    pub fn times_on(&self, channel: Channel) -> Vec<Micros> {
        self.log
            .iter()
            .filter(|c| c.channel == channel)
            .map(|c| c.at_us)
            .collect()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: SampleSource> SampleSource for RecordingSource<'_, S> {
    type Error = S::Error;

    fn sample(&mut self, channel: Channel) -> nb::Result<RawSample, Self::Error> {
        let at_us = self.clock.now_us();
        let raw = self.inner.sample(channel)?;
        self.log.push(Conversion { channel, at_us, raw });
        Ok(raw)
    }
}

/// Fault raised by a [`FailingSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedFault;

/// Passes reads through until a budget is spent, then reports a fault
pub struct FailingSource<S> {
    inner: S,
    remaining: usize,
}

impl<S: SampleSource> FailingSource<S> {
    pub fn after(inner: S, reads: usize) -> Self {
        Self { inner, remaining: reads }
    }
}

impl<S: SampleSource> SampleSource for FailingSource<S> {
    type Error = InjectedFault;

    fn sample(&mut self, channel: Channel) -> nb::Result<RawSample, Self::Error> {
        if self.remaining == 0 {
            return Err(nb::Error::Other(InjectedFault));
        }
        self.remaining -= 1;
        self.inner.sample(channel).map_err(|e| match e {
            nb::Error::WouldBlock => nb::Error::WouldBlock,
            nb::Error::Other(_) => nb::Error::Other(InjectedFault),
        })
    }
}

/// What a [`RecordingSink`] has received
#[derive(Debug, Default)]
pub struct SinkLog {
    pub power: Vec<(String, PowerSnapshot)>,
    pub waveforms: Vec<(String, usize)>,
    pub rejected: usize,
}

/// Sink that stores deliveries, or rejects them while `failing` is set
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub log: Rc<RefCell<SinkLog>>,
    pub failing: Rc<RefCell<bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkDown;

impl RecordingSink {
    pub fn set_failing(&self, failing: bool) {
        *self.failing.borrow_mut() = failing;
    }

    fn check(&self) -> Result<(), SinkDown> {
        if *self.failing.borrow() {
            self.log.borrow_mut().rejected += 1;
            Err(SinkDown)
        } else {
            Ok(())
        }
    }
}

impl TelemetrySink for RecordingSink {
    type Error = SinkDown;

    fn publish_power(&mut self, device_id: &str, snapshot: &PowerSnapshot) -> Result<(), Self::Error> {
        self.check()?;
        self.log.borrow_mut().power.push((device_id.to_string(), *snapshot));
        Ok(())
    }

    fn publish_waveform(&mut self, device_id: &str, snapshot: &WaveformSnapshot) -> Result<(), Self::Error> {
        self.check()?;
        self.log.borrow_mut().waveforms.push((device_id.to_string(), snapshot.sample_count));
        Ok(())
    }
}

/// Supply with per-phase voltages, phases 120° apart
pub fn supply(clock: &SimClock, voltages: [f32; 3], frequency_hz: f32) -> ThreePhaseSource<'_> {
    ThreePhaseSource::new(
        clock,
        [
            SineChannel::for_voltage(voltages[0], SENSITIVITY, frequency_hz, 0.0),
            SineChannel::for_voltage(voltages[1], SENSITIVITY, frequency_hz, -120.0),
            SineChannel::for_voltage(voltages[2], SENSITIVITY, frequency_hz, 120.0),
        ],
    )
}

/// Default configuration with shorter bursts to keep the tests quick
pub fn quick_config() -> MeterConfig {
    MeterConfig::default().with_rms_burst(1000, 100)
}

/// Assert two floats agree within `tolerance`
pub fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
