//! Three-phase power quality analysis
//!
//! ## Overview
//!
//! [`PowerAnalyzer`] owns one [`PhaseSensor`] per phase and turns their
//! bursts into a [`PowerSnapshot`]: phase and line voltages, averages,
//! unbalance and four independent fault flags.
//!
//! ## Sequential Measurement
//!
//! The converter runs one conversion at a time, so the phases are measured
//! one after another (A, then B, then C). Each phase sees a different
//! 200 ms window of the supply. Interleaving the channels would divide each
//! channel's sample rate by three and still not be simultaneous.
//!
//! ## Derived Quantities
//!
//! ### Line Voltage
//! For two sinusoids 120° apart:
//! ```text
//! Vxy = sqrt(Vx² + Vy² - 2·Vx·Vy·cos 120°) = sqrt(Vx² + Vy² + Vx·Vy)
//! ```
//! which reduces to `V·√3` for equal phases. Phase angles are not measured;
//! the 120° separation is assumed.
//!
//! ### Unbalance
//! ```text
//! K = (Vmax - Vmin) / Vavg × 100 %       (0 when Vavg < 1 V)
//! ```
//!
//! ## Snapshot Ownership
//!
//! `measure()` returns the snapshot by value and keeps no copy. Whoever
//! drives the analyzer decides what to retain (see [`crate::monitor`]).

use core::fmt;

use heapless::String;
use libm::{fabsf, sqrtf};

use crate::config::MeterConfig;
use crate::constants::buffers::PROBLEM_DESCRIPTION_CAPACITY;
use crate::constants::grid::UNBALANCE_MIN_AVERAGE_V;
use crate::errors::MeterResult;
use crate::sensor::{CalibrationReport, PhaseMeasurement, PhaseSensor, SensorSettings};
use crate::time::{Clock, Timestamp};
use crate::traits::{Phase, SampleSource};

/// Phase pair of a line-to-line voltage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinePair {
    /// A to B
    AB,
    /// B to C
    BC,
    /// C to A
    CA,
}

impl LinePair {
    /// All pairs in snapshot order
    pub const ALL: [LinePair; 3] = [LinePair::AB, LinePair::BC, LinePair::CA];

    /// The two phases of this pair
    pub const fn phases(self) -> (Phase, Phase) {
        match self {
            LinePair::AB => (Phase::A, Phase::B),
            LinePair::BC => (Phase::B, Phase::C),
            LinePair::CA => (Phase::C, Phase::A),
        }
    }

    /// Position in [`PowerSnapshot::line_voltages`]
    pub const fn index(self) -> usize {
        match self {
            LinePair::AB => 0,
            LinePair::BC => 1,
            LinePair::CA => 2,
        }
    }

    /// Two-letter label
    pub const fn label(self) -> &'static str {
        match self {
            LinePair::AB => "AB",
            LinePair::BC => "BC",
            LinePair::CA => "CA",
        }
    }
}

/// Line-to-line voltage of two phases assumed 120° apart
pub fn line_voltage(vx: f32, vy: f32) -> f32 {
    sqrtf(vx * vx + vy * vy + vx * vy)
}

/// Unbalance in percent; 0 when the average is below 1 V
pub fn unbalance_pct(voltages: [f32; 3]) -> f32 {
    let avg = mean(voltages);
    if !(avg >= UNBALANCE_MIN_AVERAGE_V) {
        return 0.0;
    }

    let max = voltages[0].max(voltages[1]).max(voltages[2]);
    let min = voltages[0].min(voltages[1]).min(voltages[2]);
    (max - min) / avg * 100.0
}

fn mean(values: [f32; 3]) -> f32 {
    (values[0] + values[1] + values[2]) / 3.0
}

/// Fault limits in absolute units
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    /// Any phase strictly below this is low (V)
    pub low_voltage_v: f32,
    /// Any phase strictly above this is high (V)
    pub high_voltage_v: f32,
    /// Unbalance strictly above this is a fault (%)
    pub unbalance_pct: f32,
    /// Nominal frequency (Hz)
    pub nominal_frequency_hz: f32,
    /// |avg frequency - nominal| strictly above this is a fault (Hz)
    pub frequency_deviation_hz: f32,
    /// Phase strictly below this is reported lost (V)
    pub phase_loss_v: f32,
}

impl From<&MeterConfig> for Thresholds {
    fn from(config: &MeterConfig) -> Self {
        Self {
            low_voltage_v: config.low_voltage_v(),
            high_voltage_v: config.high_voltage_v(),
            unbalance_pct: config.unbalance_threshold_pct,
            nominal_frequency_hz: config.nominal_frequency_hz,
            frequency_deviation_hz: config.frequency_deviation_hz,
            phase_loss_v: config.phase_loss_v,
        }
    }
}

/// The four independent power quality faults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaultFlags {
    /// At least one phase below the low-voltage limit
    pub low_voltage: bool,
    /// At least one phase above the high-voltage limit
    pub high_voltage: bool,
    /// Unbalance above threshold
    pub high_unbalance: bool,
    /// Average frequency too far from nominal
    pub frequency_deviation: bool,
}

impl FaultFlags {
    /// Token for low voltage
    pub const LOW_VOLTAGE: &'static str = "LOW_V";
    /// Token for high voltage
    pub const HIGH_VOLTAGE: &'static str = "HIGH_V";
    /// Token for high unbalance
    pub const UNBALANCE: &'static str = "UNBALANCE";
    /// Token for frequency deviation
    pub const FREQUENCY_DEVIATION: &'static str = "FREQ_DEV";
    /// Token when no flag is set
    pub const OK: &'static str = "OK";

    /// Evaluate every flag independently
    pub fn classify(voltages: [f32; 3], unbalance_pct: f32, frequency_avg_hz: f32, limits: &Thresholds) -> Self {
        Self {
            low_voltage: voltages.iter().any(|v| *v < limits.low_voltage_v),
            high_voltage: voltages.iter().any(|v| *v > limits.high_voltage_v),
            high_unbalance: unbalance_pct > limits.unbalance_pct,
            frequency_deviation: fabsf(frequency_avg_hz - limits.nominal_frequency_hz) > limits.frequency_deviation_hz,
        }
    }

    /// Whether any flag is set
    pub fn any(&self) -> bool {
        self.low_voltage || self.high_voltage || self.high_unbalance || self.frequency_deviation
    }

    /// Tokens of the set flags in fixed order
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.low_voltage, Self::LOW_VOLTAGE),
            (self.high_voltage, Self::HIGH_VOLTAGE),
            (self.high_unbalance, Self::UNBALANCE),
            (self.frequency_deviation, Self::FREQUENCY_DEVIATION),
        ]
        .into_iter()
        .filter_map(|(set, token)| set.then_some(token))
    }

    /// Space-joined tokens, or `OK`
    pub fn describe(&self) -> String<PROBLEM_DESCRIPTION_CAPACITY> {
        let mut text = String::new();
        // capacity covers all four tokens
        let _ = fmt::write(&mut text, format_args!("{}", self));
        text
    }
}

impl fmt::Display for FaultFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.any() {
            return f.write_str(Self::OK);
        }
        for (i, token) in self.tokens().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

/// Result of one three-phase measurement cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerSnapshot {
    /// Per-phase results, indexed by [`Phase::index`]
    pub phases: [PhaseMeasurement; 3],
    /// Line voltages AB, BC, CA (V)
    pub line_voltages: [f32; 3],
    /// Mean phase voltage (V)
    pub voltage_avg: f32,
    /// Mean phase frequency (Hz)
    pub frequency_avg: f32,
    /// Phase unbalance (%)
    pub unbalance_pct: f32,
    /// Fault classification
    pub faults: FaultFlags,
    /// Per-phase loss indicators, indexed by [`Phase::index`]
    pub phase_loss: [bool; 3],
    /// When the cycle completed (ms)
    pub timestamp_ms: Timestamp,
}

impl PowerSnapshot {
    /// Derive every aggregate from three phase results
    pub fn from_phases(phases: [PhaseMeasurement; 3], limits: &Thresholds, timestamp_ms: Timestamp) -> Self {
        let voltages = phases.map(|p| p.rms_voltage);
        let frequency_avg = mean(phases.map(|p| p.frequency_hz));
        let unbalance = unbalance_pct(voltages);

        let line_voltages = LinePair::ALL.map(|pair| {
            let (x, y) = pair.phases();
            line_voltage(voltages[x.index()], voltages[y.index()])
        });

        Self {
            phases,
            line_voltages,
            voltage_avg: mean(voltages),
            frequency_avg,
            unbalance_pct: unbalance,
            faults: FaultFlags::classify(voltages, unbalance, frequency_avg, limits),
            phase_loss: voltages.map(|v| v < limits.phase_loss_v),
            timestamp_ms,
        }
    }

    /// RMS voltage of one phase
    pub fn voltage(&self, phase: Phase) -> f32 {
        self.phases[phase.index()].rms_voltage
    }

    /// Frequency of one phase
    pub fn frequency(&self, phase: Phase) -> f32 {
        self.phases[phase.index()].frequency_hz
    }

    /// Line voltage of one pair
    pub fn line_voltage(&self, pair: LinePair) -> f32 {
        self.line_voltages[pair.index()]
    }

    /// Whether one phase is below the phase-loss threshold
    pub fn is_phase_lost(&self, phase: Phase) -> bool {
        self.phase_loss[phase.index()]
    }

    /// Whether any fault flag is set
    pub fn has_problems(&self) -> bool {
        self.faults.any()
    }

    /// Fault tokens (`LOW_V HIGH_V UNBALANCE FREQ_DEV`) or `OK`
    pub fn describe_problems(&self) -> String<PROBLEM_DESCRIPTION_CAPACITY> {
        self.faults.describe()
    }
}

/// Three-phase analyzer
#[derive(Debug, Clone)]
pub struct PowerAnalyzer {
    config: MeterConfig,
    thresholds: Thresholds,
    sensors: [PhaseSensor; 3],
}

impl PowerAnalyzer {
    /// Build the three sensors from a validated configuration
    pub fn new(config: MeterConfig) -> MeterResult<Self> {
        config.validate()?;

        let settings = SensorSettings::from(&config);
        let sensors = Phase::ALL.map(|phase| {
            let i = phase.index();
            PhaseSensor::new(phase, config.channels[i], config.sensitivity[i], settings)
        });

        Ok(Self {
            thresholds: Thresholds::from(&config),
            config,
            sensors,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Fault limits in use
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Sensor of one phase
    pub fn sensor(&self, phase: Phase) -> &PhaseSensor {
        &self.sensors[phase.index()]
    }

    /// Mutable sensor of one phase (sensitivity adjustment, single-phase calibration)
    pub fn sensor_mut(&mut self, phase: Phase) -> &mut PhaseSensor {
        &mut self.sensors[phase.index()]
    }

    /// Calibrate the offsets of A, B and C in turn
    pub fn calibrate<S, C>(&mut self, source: &mut S, clock: &C) -> MeterResult<[CalibrationReport; 3]>
    where
        S: SampleSource,
        C: Clock,
    {
        log_info!("calibrating offsets over {} samples", self.config.calibration_samples);

        let count = self.config.calibration_samples;
        let a = self.sensors[0].calibrate_offset(source, clock, count)?;
        let b = self.sensors[1].calibrate_offset(source, clock, count)?;
        let c = self.sensors[2].calibrate_offset(source, clock, count)?;
        Ok([a, b, c])
    }

    /// Run one measurement cycle: three sequential bursts, then derivation
    pub fn measure<S, C>(&mut self, source: &mut S, clock: &C) -> MeterResult<PowerSnapshot>
    where
        S: SampleSource,
        C: Clock,
    {
        let count = self.config.rms_samples;
        for sensor in self.sensors.iter_mut() {
            sensor.read_rms(source, clock, count)?;
        }

        let phases = self.sensors.each_ref().map(|s| s.last_measurement());
        let snapshot = PowerSnapshot::from_phases(phases, &self.thresholds, clock.now_ms());

        log_debug!(
            "measured A={:.1}V B={:.1}V C={:.1}V f={:.2}Hz unbalance={:.2}% [{}]",
            snapshot.voltage(Phase::A),
            snapshot.voltage(Phase::B),
            snapshot.voltage(Phase::C),
            snapshot.frequency_avg,
            snapshot.unbalance_pct,
            snapshot.faults
        );

        Ok(snapshot)
    }
}
