//! Synthetic converter inputs
//!
//! Deterministic [`SampleSource`] implementations driven by a [`SimClock`].
//! They stand in for the transformer modules in tests and let the whole
//! measurement chain run on a host without hardware.
//!
//! ```rust
//! use phasewatch_core::sim::ThreePhaseSource;
//! use phasewatch_core::time::SimClock;
//! use phasewatch_core::{MeterConfig, PowerAnalyzer};
//!
//! let clock = SimClock::new(0);
//! let mut adc = ThreePhaseSource::balanced(&clock, 220.0, 0.23, 50.0);
//! let mut analyzer = PowerAnalyzer::new(MeterConfig::default())?;
//!
//! let snapshot = analyzer.measure(&mut adc, &clock)?;
//! assert_eq!(snapshot.describe_problems().as_str(), "OK");
//! # Ok::<(), phasewatch_core::MeterError>(())
//! ```

use core::f64::consts::PI;

use libm::{round, sin};

use crate::constants::adc::{ADC_MAX, ADC_MIDPOINT};
use crate::constants::time::US_PER_SECOND;
use crate::time::{Clock, Micros, SimClock};
use crate::traits::{Channel, RawSample, SampleSource};

/// Faults a simulated source can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// No signal is wired to this channel
    UnknownChannel(u8),
}

/// One simulated transformer output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineChannel {
    /// DC center (raw counts)
    pub center: f32,
    /// Peak deviation from center (raw counts)
    pub amplitude: f32,
    /// Signal frequency (Hz)
    pub frequency_hz: f32,
    /// Phase angle at t = 0 (degrees)
    pub phase_deg: f32,
    /// Peak uniform noise added to each sample (raw counts)
    pub noise: f32,
}

impl SineChannel {
    /// Noise-free sinusoid
    pub fn new(center: f32, amplitude: f32, frequency_hz: f32, phase_deg: f32) -> Self {
        Self { center, amplitude, frequency_hz, phase_deg, noise: 0.0 }
    }

    /// Flat input sitting at `center`
    pub fn quiet(center: f32) -> Self {
        Self::new(center, 0.0, 0.0, 0.0)
    }

    /// Sinusoid that reads as `rms_v` volts through `sensitivity`, centered at mid-scale
    pub fn for_voltage(rms_v: f32, sensitivity: f32, frequency_hz: f32, phase_deg: f32) -> Self {
        let amplitude = rms_v * core::f32::consts::SQRT_2 / sensitivity;
        Self::new(ADC_MIDPOINT, amplitude, frequency_hz, phase_deg)
    }

    /// Add uniform noise of the given peak amplitude
    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }

    fn value_at(&self, t_us: Micros) -> f64 {
        let t = t_us as f64 / US_PER_SECOND as f64;
        let angle = 2.0 * PI * f64::from(self.frequency_hz) * t + f64::from(self.phase_deg) * PI / 180.0;
        f64::from(self.center) + f64::from(self.amplitude) * sin(angle)
    }
}

/// Three sinusoids on three converter channels, read against a [`SimClock`]
///
/// Each read samples the waveform at the clock's current time and may charge
/// a conversion time to the clock, like a real SAR converter would.
#[derive(Debug)]
pub struct ThreePhaseSource<'a> {
    clock: &'a SimClock,
    phases: [SineChannel; 3],
    channels: [Channel; 3],
    conversion_us: Micros,
    rng: u32,
    reads: u64,
}

impl<'a> ThreePhaseSource<'a> {
    /// Source with phases A, B, C on channels 0, 1, 2
    pub fn new(clock: &'a SimClock, phases: [SineChannel; 3]) -> Self {
        Self {
            clock,
            phases,
            channels: [Channel(0), Channel(1), Channel(2)],
            conversion_us: 0,
            rng: 0x2545_F491,
            reads: 0,
        }
    }

    /// Balanced supply: equal voltages, A at 0°, B at -120°, C at +120°
    pub fn balanced(clock: &'a SimClock, rms_v: f32, sensitivity: f32, frequency_hz: f32) -> Self {
        Self::new(
            clock,
            [
                SineChannel::for_voltage(rms_v, sensitivity, frequency_hz, 0.0),
                SineChannel::for_voltage(rms_v, sensitivity, frequency_hz, -120.0),
                SineChannel::for_voltage(rms_v, sensitivity, frequency_hz, 120.0),
            ],
        )
    }

    /// Wire phases A, B, C to other channels
    pub fn with_channels(mut self, channels: [Channel; 3]) -> Self {
        self.channels = channels;
        self
    }

    /// Charge `us` of clock time per conversion
    pub fn with_conversion_us(mut self, us: Micros) -> Self {
        self.conversion_us = us;
        self
    }

    /// Replace one phase's signal
    pub fn set_phase(&mut self, index: usize, signal: SineChannel) {
        self.phases[index] = signal;
    }

    /// Conversions performed so far
    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn next_noise(&mut self) -> f64 {
        // xorshift32
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        f64::from(x) / f64::from(u32::MAX) * 2.0 - 1.0
    }
}

impl SampleSource for ThreePhaseSource<'_> {
    type Error = SimError;

    fn sample(&mut self, channel: Channel) -> nb::Result<RawSample, Self::Error> {
        let index = self
            .channels
            .iter()
            .position(|c| *c == channel)
            .ok_or(nb::Error::Other(SimError::UnknownChannel(channel.0)))?;

        let signal = self.phases[index];
        let mut value = signal.value_at(self.clock.now_us());
        if signal.noise > 0.0 {
            value += self.next_noise() * f64::from(signal.noise);
        }

        self.clock.advance_us(self.conversion_us);
        self.reads += 1;

        Ok(round(value).clamp(0.0, f64::from(ADC_MAX)) as RawSample)
    }
}

/// Source returning the same code on every channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantSource {
    value: RawSample,
}

impl ConstantSource {
    /// Source that always reads `value`
    pub fn new(value: RawSample) -> Self {
        Self { value }
    }
}

impl SampleSource for ConstantSource {
    type Error = core::convert::Infallible;

    fn sample(&mut self, _channel: Channel) -> nb::Result<RawSample, Self::Error> {
        Ok(self.value)
    }
}
