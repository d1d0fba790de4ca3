//! Single-phase voltage sensor
//!
//! A [`PhaseSensor`] turns a paced burst of raw converter samples into an
//! RMS voltage and a zero-crossing frequency estimate.
//!
//! ## Burst Algorithm
//!
//! ```text
//! for i in 0..n:
//!     wait until t0 + i * interval          (absolute deadline)
//!     d = raw - offset
//!     sum += d²
//!     if sign(d) flipped: record crossing time
//!
//! rms  = sqrt(sum / n) * sensitivity        (0 below noise floor)
//! freq = ((crossings - 1) / 2) / (t_last - t_first)
//!        (nominal if < 4 crossings or outside nominal ± band)
//! ```
//!
//! Frequency comes from elapsed clock time between crossings, not from the
//! sample index, which is why the cadence has to be uniform.
//!
//! ## Calibration
//!
//! The offset is the mean of a calibration burst and is only ever written
//! by [`PhaseSensor::calibrate_offset`]. The burst is accepted as-is; the
//! returned [`CalibrationReport`] carries the min/max spread so the call
//! site can decide whether the input was really quiescent.

use libm::sqrt;

use crate::config::MeterConfig;
use crate::constants::{
    adc::{ADC_MIDPOINT, CALIBRATION_SPREAD_WARN_COUNTS},
    grid::MIN_ZERO_CROSSINGS,
    time::US_PER_SECOND,
};
use crate::errors::{MeterError, MeterResult};
use crate::time::{Clock, Micros, Pacer};
use crate::traits::{Channel, Phase, RawSample, SampleSource};

/// Result of one measurement burst on one phase
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseMeasurement {
    /// RMS voltage (V), never negative
    pub rms_voltage: f32,
    /// Frequency (Hz), inside the sanity band or exactly nominal
    pub frequency_hz: f32,
}

/// Statistics of an offset calibration burst
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationReport {
    /// New offset (mean raw code)
    pub offset: f32,
    /// Smallest raw code seen
    pub min: RawSample,
    /// Largest raw code seen
    pub max: RawSample,
}

impl CalibrationReport {
    /// Max-min spread of the burst (raw counts)
    pub fn spread(&self) -> RawSample {
        self.max - self.min
    }

    /// Whether the burst looked quiescent
    pub fn is_quiet(&self) -> bool {
        self.spread() <= CALIBRATION_SPREAD_WARN_COUNTS
    }
}

/// Per-sensor settings copied out of [`MeterConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSettings {
    /// Interval between RMS samples (µs)
    pub sample_interval_us: Micros,
    /// Interval between calibration samples (µs)
    pub calibration_interval_us: Micros,
    /// RMS below this is reported as 0 V
    pub noise_floor_v: f32,
    /// Fallback and band center (Hz)
    pub nominal_frequency_hz: f32,
    /// Half-width of the accepted frequency window (Hz)
    pub sanity_band_hz: f32,
    /// Raw samples above this are clamped
    pub adc_max: RawSample,
}

impl From<&MeterConfig> for SensorSettings {
    fn from(config: &MeterConfig) -> Self {
        Self {
            sample_interval_us: config.rms_interval_us,
            calibration_interval_us: config.calibration_interval_us,
            noise_floor_v: config.noise_floor_v,
            nominal_frequency_hz: config.nominal_frequency_hz,
            sanity_band_hz: config.frequency_sanity_band_hz,
            adc_max: config.adc_max,
        }
    }
}

/// Zero-crossing bookkeeping for one burst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZeroCrossings {
    count: u32,
    first_us: Micros,
    last_us: Micros,
}

impl ZeroCrossings {
    /// Record a crossing seen at `at_us`
    pub fn record(&mut self, at_us: Micros) {
        if self.count == 0 {
            self.first_us = at_us;
        }
        self.last_us = at_us;
        self.count += 1;
    }

    /// Crossings recorded so far
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Raw frequency estimate, `None` with fewer than two full cycles observed
    pub fn estimate_hz(&self) -> Option<f32> {
        if self.count < MIN_ZERO_CROSSINGS || self.last_us <= self.first_us {
            return None;
        }

        // n crossings span n-1 half cycles
        let full_cycles = f64::from(self.count - 1) / 2.0;
        let elapsed_s = (self.last_us - self.first_us) as f64 / US_PER_SECOND as f64;
        Some((full_cycles / elapsed_s) as f32)
    }
}

/// Accept an estimate inside `nominal ± band`, otherwise report nominal
pub fn resolve_frequency(estimate: Option<f32>, nominal_hz: f32, band_hz: f32) -> f32 {
    match estimate {
        Some(hz) if hz >= nominal_hz - band_hz && hz <= nominal_hz + band_hz => hz,
        _ => nominal_hz,
    }
}

/// RMS volts from a sum of squared deviations, clamped to 0 below the noise floor
pub fn rms_from_sum(sum_of_squares: f64, sample_count: usize, sensitivity: f32, noise_floor_v: f32) -> f32 {
    if sample_count == 0 {
        return 0.0;
    }

    let rms_counts = sqrt(sum_of_squares / sample_count as f64);
    let volts = (rms_counts * f64::from(sensitivity)) as f32;
    if volts < noise_floor_v || !volts.is_finite() {
        0.0
    } else {
        volts
    }
}

/// Voltage sensor on one converter channel
#[derive(Debug, Clone)]
pub struct PhaseSensor {
    phase: Phase,
    channel: Channel,
    sensitivity: f32,
    offset: f32,
    settings: SensorSettings,
    last: PhaseMeasurement,
}

impl PhaseSensor {
    /// Sensor with the mid-scale offset; calibrate before the first reading
    pub fn new(phase: Phase, channel: Channel, sensitivity: f32, settings: SensorSettings) -> Self {
        Self {
            phase,
            channel,
            sensitivity,
            offset: ADC_MIDPOINT,
            settings,
            last: PhaseMeasurement {
                rms_voltage: 0.0,
                frequency_hz: settings.nominal_frequency_hz,
            },
        }
    }

    /// Phase this sensor measures
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Converter channel
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Current offset (raw counts)
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Volts per RMS count
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Replace the sensitivity coefficient after field calibration
    pub fn set_sensitivity(&mut self, sensitivity: f32) -> MeterResult<()> {
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            return Err(MeterError::InvalidConfig { reason: "sensitivity must be positive and finite" });
        }
        self.sensitivity = sensitivity;
        Ok(())
    }

    /// RMS voltage of the last completed burst
    pub fn last_rms(&self) -> f32 {
        self.last.rms_voltage
    }

    /// Frequency of the last completed burst
    pub fn frequency(&self) -> f32 {
        self.last.frequency_hz
    }

    /// Both results of the last completed burst
    pub fn last_measurement(&self) -> PhaseMeasurement {
        self.last
    }

    /// One unpaced raw read, clamped to the converter range
    pub fn read_raw<S: SampleSource>(&self, source: &mut S) -> MeterResult<RawSample> {
        let raw = source.read_blocking(self.channel)?;
        Ok(raw.min(self.settings.adc_max))
    }

    /// Set the offset to the mean of a paced burst
    ///
    /// No check is made that the input was quiescent. A spread above
    /// [`CALIBRATION_SPREAD_WARN_COUNTS`] is logged and visible in the report.
    pub fn calibrate_offset<S, C>(&mut self, source: &mut S, clock: &C, sample_count: usize) -> MeterResult<CalibrationReport>
    where
        S: SampleSource,
        C: Clock,
    {
        if sample_count == 0 {
            return Err(MeterError::InvalidSampleCount { requested: sample_count });
        }

        let mut pacer = Pacer::start(clock, self.settings.calibration_interval_us);
        let mut sum: u64 = 0;
        let mut min = RawSample::MAX;
        let mut max = RawSample::MIN;

        for tick in 0..sample_count {
            pacer.wait_for_tick(clock, tick);
            let raw = self.read_raw(source)?;
            sum += u64::from(raw);
            min = min.min(raw);
            max = max.max(raw);
        }

        let report = CalibrationReport {
            offset: (sum as f64 / sample_count as f64) as f32,
            min,
            max,
        };
        self.offset = report.offset;

        log_info!(
            "phase {} (channel {}) offset calibrated: {:.1}",
            self.phase.label(),
            self.channel.0,
            report.offset
        );
        if !report.is_quiet() {
            log_warn!(
                "phase {} calibration spread {} counts exceeds {}; input may not be quiescent",
                self.phase.label(),
                report.spread(),
                CALIBRATION_SPREAD_WARN_COUNTS
            );
        }

        Ok(report)
    }

    /// Measure RMS voltage over a paced burst of `sample_count` samples
    ///
    /// The frequency estimate from the same burst is available through
    /// [`PhaseSensor::frequency`] afterwards. Blocks for
    /// `sample_count * interval`. On error the previous results are kept.
    pub fn read_rms<S, C>(&mut self, source: &mut S, clock: &C, sample_count: usize) -> MeterResult<f32>
    where
        S: SampleSource,
        C: Clock,
    {
        if sample_count == 0 {
            return Err(MeterError::InvalidSampleCount { requested: sample_count });
        }

        let offset = self.offset;
        let mut above = f32::from(self.read_raw(source)?) > offset;

        let mut pacer = Pacer::start(clock, self.settings.sample_interval_us);
        let mut crossings = ZeroCrossings::default();
        let mut sum_of_squares = 0.0f64;

        for tick in 0..sample_count {
            pacer.wait_for_tick(clock, tick);
            let raw = f32::from(self.read_raw(source)?);

            let deviation = f64::from(raw - offset);
            sum_of_squares += deviation * deviation;

            let now_above = raw > offset;
            if now_above != above {
                crossings.record(clock.now_us());
                above = now_above;
            }
        }

        if pacer.late_ticks() > 0 {
            log_warn!(
                "phase {} burst missed {} ticks (worst {} us late)",
                self.phase.label(),
                pacer.late_ticks(),
                pacer.max_lateness_us()
            );
        }

        let rms_voltage = rms_from_sum(sum_of_squares, sample_count, self.sensitivity, self.settings.noise_floor_v);
        let frequency_hz = resolve_frequency(
            crossings.estimate_hz(),
            self.settings.nominal_frequency_hz,
            self.settings.sanity_band_hz,
        );

        log_debug!(
            "phase {}: {:.2} V, {:.3} Hz, {} crossings",
            self.phase.label(),
            rms_voltage,
            frequency_hz,
            crossings.count()
        );

        self.last = PhaseMeasurement { rms_voltage, frequency_hz };
        Ok(rms_voltage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ConstantSource, SineChannel, ThreePhaseSource};
    use crate::time::SimClock;

    fn settings() -> SensorSettings {
        SensorSettings::from(&MeterConfig::default())
    }

    fn sensor() -> PhaseSensor {
        PhaseSensor::new(Phase::A, Channel(0), 0.23, settings())
    }

    #[test]
    fn sine_rms_matches_amplitude() {
        let clock = SimClock::new(0);
        // 1000 counts peak, exactly centered
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::new(2048.0, 1000.0, 50.0, 0.0); 3]);
        let mut sensor = sensor();
        sensor.offset = 2048.0;

        let rms = sensor.read_rms(&mut source, &clock, 2000).unwrap();
        let expected = 1000.0 / core::f32::consts::SQRT_2 * 0.23;
        assert!((rms - expected).abs() < 0.5, "rms {} expected {}", rms, expected);
        assert!((sensor.frequency() - 50.0).abs() < 0.2, "freq {}", sensor.frequency());
    }

    #[test]
    fn burst_takes_count_times_interval() {
        let clock = SimClock::new(0);
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::quiet(2048.0); 3]);
        let mut sensor = sensor();

        sensor.read_rms(&mut source, &clock, 500).unwrap();
        // last tick is due at 499 * 100 µs
        assert_eq!(clock.now_us(), 499 * 100);
    }

    #[test]
    fn quiet_input_reads_zero_and_nominal() {
        let clock = SimClock::new(0);
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::quiet(2048.0); 3]);
        let mut sensor = sensor();

        let rms = sensor.read_rms(&mut source, &clock, 1000).unwrap();
        assert_eq!(rms, 0.0);
        assert_eq!(sensor.frequency(), 50.0);
    }

    #[test]
    fn noise_below_floor_clamped() {
        // 15 counts peak * 0.23 / sqrt(2) ≈ 2.4 V < 5 V
        assert_eq!(rms_from_sum(112.5 * 100.0, 100, 0.23, 5.0), 0.0);
        // 100 counts RMS * 0.23 = 23 V
        let v = rms_from_sum(10_000.0 * 100.0, 100, 0.23, 5.0);
        assert!((v - 23.0).abs() < 1e-4);
    }

    #[test]
    fn rms_never_negative_or_nan() {
        assert_eq!(rms_from_sum(0.0, 10, 0.23, 0.0), 0.0);
        assert_eq!(rms_from_sum(1.0, 0, 0.23, 0.0), 0.0);
    }

    #[test]
    fn fewer_than_four_crossings_is_nominal() {
        let mut crossings = ZeroCrossings::default();
        crossings.record(1000);
        crossings.record(11_000);
        crossings.record(21_000);
        assert_eq!(crossings.estimate_hz(), None);
        assert_eq!(resolve_frequency(crossings.estimate_hz(), 50.0, 10.0), 50.0);
    }

    #[test]
    fn crossings_at_same_instant_are_rejected() {
        let mut crossings = ZeroCrossings::default();
        for _ in 0..6 {
            crossings.record(500);
        }
        assert_eq!(crossings.estimate_hz(), None);
    }

    #[test]
    fn five_crossings_span_two_cycles() {
        let mut crossings = ZeroCrossings::default();
        for i in 0..5 {
            crossings.record(i * 10_000);
        }
        // 2 cycles in 40 ms
        let hz = crossings.estimate_hz().unwrap();
        assert!((hz - 50.0).abs() < 1e-3);
    }

    #[test]
    fn out_of_band_frequency_falls_back() {
        assert_eq!(resolve_frequency(Some(75.0), 50.0, 10.0), 50.0);
        assert_eq!(resolve_frequency(Some(39.9), 50.0, 10.0), 50.0);
        assert_eq!(resolve_frequency(Some(49.8), 50.0, 10.0), 49.8);
        assert_eq!(resolve_frequency(Some(60.0), 50.0, 10.0), 60.0);
    }

    #[test]
    fn burst_outside_sanity_band_reports_nominal() {
        let clock = SimClock::new(0);
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::for_voltage(220.0, 0.23, 75.0, 0.0); 3]);
        let mut sensor = sensor();

        let rms = sensor.read_rms(&mut source, &clock, 2000).unwrap();
        assert!((rms - 220.0).abs() < 1.0, "rms {}", rms);
        assert_eq!(sensor.frequency(), 50.0);
    }

    #[test]
    fn burst_below_noise_floor_reads_zero() {
        let clock = SimClock::new(0);
        // 15 counts peak reads ≈ 2.4 V, under the 5 V floor
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::new(ADC_MIDPOINT, 15.0, 50.0, 0.0); 3]);
        let mut sensor = sensor();

        assert_eq!(sensor.read_rms(&mut source, &clock, 2000).unwrap(), 0.0);
        assert_eq!(sensor.last_rms(), 0.0);
        assert!((sensor.frequency() - 50.0).abs() < 0.2);
    }

    #[test]
    fn zero_sample_count_rejected_without_side_effects() {
        let clock = SimClock::new(0);
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::quiet(2000.0); 3]);
        let mut sensor = sensor();
        let before = sensor.last_measurement();

        assert_eq!(
            sensor.read_rms(&mut source, &clock, 0),
            Err(MeterError::InvalidSampleCount { requested: 0 })
        );
        assert_eq!(
            sensor.calibrate_offset(&mut source, &clock, 0),
            Err(MeterError::InvalidSampleCount { requested: 0 })
        );
        assert_eq!(sensor.last_measurement(), before);
        assert_eq!(sensor.offset(), ADC_MIDPOINT);
    }

    #[test]
    fn calibration_sets_mean() {
        let clock = SimClock::new(0);
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::quiet(1900.0); 3]);
        let mut sensor = sensor();

        let report = sensor.calibrate_offset(&mut source, &clock, 200).unwrap();
        assert_eq!(report.offset, 1900.0);
        assert_eq!(sensor.offset(), 1900.0);
        assert!(report.is_quiet());
        assert_eq!(clock.now_us(), 199 * 50);
    }

    #[test]
    fn calibration_with_live_signal_is_accepted_but_flagged() {
        let clock = SimClock::new(0);
        let mut source = ThreePhaseSource::new(&clock, [SineChannel::new(2048.0, 1200.0, 50.0, 0.0); 3]);
        let mut sensor = sensor();

        // 5000 * 50 µs = 12.5 cycles; the extra half cycle biases the mean by ~30 counts
        let report = sensor.calibrate_offset(&mut source, &clock, 5000).unwrap();
        assert!(!report.is_quiet());
        assert!((sensor.offset() - 2048.0).abs() < 40.0);
    }

    #[test]
    fn samples_above_range_are_clamped() {
        let mut source = ConstantSource::new(9000);
        let sensor = sensor();
        assert_eq!(sensor.read_raw(&mut source).unwrap(), 4095);
    }

    #[test]
    fn sensitivity_setter_validates() {
        let mut sensor = sensor();
        assert!(sensor.set_sensitivity(0.25).is_ok());
        assert_eq!(sensor.sensitivity(), 0.25);
        assert!(sensor.set_sensitivity(-1.0).is_err());
        assert!(sensor.set_sensitivity(f32::INFINITY).is_err());
        assert_eq!(sensor.sensitivity(), 0.25);
    }
}
