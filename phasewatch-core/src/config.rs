//! Measurement configuration
//!
//! A [`MeterConfig`] is injected at construction and never written by the
//! measurement code. Defaults describe a 220 V / 50 Hz network read through
//! three ZMPT101B transformer modules on a 12-bit converter.
//!
//! ```rust
//! use phasewatch_core::MeterConfig;
//!
//! // 60 Hz network, faster bursts for a bench setup
//! let config = MeterConfig::grid_120v_60hz()
//!     .with_sensitivity([0.21, 0.22, 0.23])
//!     .with_rms_burst(1000, 100);
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::constants::{
    adc::ADC_MAX,
    buffers::MAX_WAVEFORM_SAMPLES,
    grid::{
        DEFAULT_SENSITIVITY, FREQUENCY_DEVIATION_HZ, FREQUENCY_SANITY_BAND_HZ, HIGH_VOLTAGE_RATIO,
        LOW_VOLTAGE_RATIO, NOMINAL_FREQUENCY_60HZ, NOMINAL_FREQUENCY_HZ, NOMINAL_VOLTAGE_V,
        PHASE_LOSS_V, RMS_NOISE_FLOOR_V, UNBALANCE_THRESHOLD_PCT,
    },
    time::{
        CALIBRATION_INTERVAL_US, CALIBRATION_SAMPLES, MEASUREMENT_INTERVAL_MS, RMS_SAMPLES,
        RMS_SAMPLE_INTERVAL_US, STATUS_INTERVAL_MS, WAVEFORM_CAPTURE_INTERVAL_MS,
        WAVEFORM_INTERVAL_US, WAVEFORM_SAMPLES,
    },
};
use crate::errors::{MeterError, MeterResult};
use crate::time::Micros;
use crate::traits::Channel;

/// Complete configuration for the analyzer, waveform capture and driver
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterConfig {
    /// Converter channel for phases A, B, C
    pub channels: [Channel; 3],

    /// Volts per RMS count for phases A, B, C
    pub sensitivity: [f32; 3],

    /// Largest raw code the converter returns
    pub adc_max: u16,

    /// Nominal phase voltage (V)
    pub nominal_voltage_v: f32,

    /// Nominal grid frequency (Hz)
    pub nominal_frequency_hz: f32,

    /// Low-voltage fault below `nominal_voltage_v * low_voltage_ratio`
    pub low_voltage_ratio: f32,

    /// High-voltage fault above `nominal_voltage_v * high_voltage_ratio`
    pub high_voltage_ratio: f32,

    /// Unbalance fault above this percentage
    pub unbalance_threshold_pct: f32,

    /// Frequency fault when |avg - nominal| exceeds this (Hz)
    pub frequency_deviation_hz: f32,

    /// A phase below this voltage is reported as lost (V)
    pub phase_loss_v: f32,

    /// RMS below this is reported as 0 V
    pub noise_floor_v: f32,

    /// Accepted frequency window is `nominal ± band` (Hz)
    pub frequency_sanity_band_hz: f32,

    /// Samples per RMS burst
    pub rms_samples: usize,

    /// Interval between RMS samples (µs)
    pub rms_interval_us: u64,

    /// Samples per offset calibration
    pub calibration_samples: usize,

    /// Interval between calibration samples (µs)
    pub calibration_interval_us: u64,

    /// Samples per channel in a waveform trace
    pub waveform_samples: usize,

    /// Interval between waveform ticks (µs)
    pub waveform_interval_us: u64,

    /// Driver: interval between measurement cycles (ms)
    pub measurement_interval_ms: u64,

    /// Driver: interval between waveform captures (ms), 0 disables
    pub waveform_capture_interval_ms: u64,

    /// Driver: interval between status log summaries (ms), 0 disables
    pub status_interval_ms: u64,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            channels: [Channel(0), Channel(1), Channel(2)],
            sensitivity: [DEFAULT_SENSITIVITY; 3],
            adc_max: ADC_MAX,
            nominal_voltage_v: NOMINAL_VOLTAGE_V,
            nominal_frequency_hz: NOMINAL_FREQUENCY_HZ,
            low_voltage_ratio: LOW_VOLTAGE_RATIO,
            high_voltage_ratio: HIGH_VOLTAGE_RATIO,
            unbalance_threshold_pct: UNBALANCE_THRESHOLD_PCT,
            frequency_deviation_hz: FREQUENCY_DEVIATION_HZ,
            phase_loss_v: PHASE_LOSS_V,
            noise_floor_v: RMS_NOISE_FLOOR_V,
            frequency_sanity_band_hz: FREQUENCY_SANITY_BAND_HZ,
            rms_samples: RMS_SAMPLES,
            rms_interval_us: RMS_SAMPLE_INTERVAL_US,
            calibration_samples: CALIBRATION_SAMPLES,
            calibration_interval_us: CALIBRATION_INTERVAL_US,
            waveform_samples: WAVEFORM_SAMPLES,
            waveform_interval_us: WAVEFORM_INTERVAL_US,
            measurement_interval_ms: MEASUREMENT_INTERVAL_MS,
            waveform_capture_interval_ms: WAVEFORM_CAPTURE_INTERVAL_MS,
            status_interval_ms: STATUS_INTERVAL_MS,
        }
    }
}

impl MeterConfig {
    /// 230 V / 50 Hz (EU low-voltage networks)
    pub fn grid_230v_50hz() -> Self {
        Self::default().with_nominal(230.0, NOMINAL_FREQUENCY_HZ)
    }

    /// 120 V / 60 Hz (North American networks)
    pub fn grid_120v_60hz() -> Self {
        Self::default().with_nominal(120.0, NOMINAL_FREQUENCY_60HZ)
    }

    /// Set nominal voltage and frequency
    pub fn with_nominal(mut self, voltage_v: f32, frequency_hz: f32) -> Self {
        self.nominal_voltage_v = voltage_v;
        self.nominal_frequency_hz = frequency_hz;
        self
    }

    /// Set converter channels for phases A, B, C
    pub fn with_channels(mut self, channels: [Channel; 3]) -> Self {
        self.channels = channels;
        self
    }

    /// Set per-phase sensitivity coefficients
    pub fn with_sensitivity(mut self, sensitivity: [f32; 3]) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Set low/high voltage ratios
    pub fn with_voltage_ratios(mut self, low: f32, high: f32) -> Self {
        self.low_voltage_ratio = low;
        self.high_voltage_ratio = high;
        self
    }

    /// Set the unbalance fault threshold (%)
    pub fn with_unbalance_threshold(mut self, pct: f32) -> Self {
        self.unbalance_threshold_pct = pct;
        self
    }

    /// Set the frequency deviation fault threshold (Hz)
    pub fn with_frequency_deviation(mut self, hz: f32) -> Self {
        self.frequency_deviation_hz = hz;
        self
    }

    /// Set the RMS noise floor (V)
    pub fn with_noise_floor(mut self, volts: f32) -> Self {
        self.noise_floor_v = volts;
        self
    }

    /// Set the frequency sanity band half-width (Hz)
    pub fn with_sanity_band(mut self, hz: f32) -> Self {
        self.frequency_sanity_band_hz = hz;
        self
    }

    /// Set the RMS burst length and cadence
    pub fn with_rms_burst(mut self, samples: usize, interval_us: u64) -> Self {
        self.rms_samples = samples;
        self.rms_interval_us = interval_us;
        self
    }

    /// Set the calibration burst length and cadence
    pub fn with_calibration(mut self, samples: usize, interval_us: u64) -> Self {
        self.calibration_samples = samples;
        self.calibration_interval_us = interval_us;
        self
    }

    /// Set the waveform trace length and cadence
    pub fn with_waveform(mut self, samples: usize, interval_us: u64) -> Self {
        self.waveform_samples = samples;
        self.waveform_interval_us = interval_us;
        self
    }

    /// Set driver intervals (ms)
    pub fn with_schedule(mut self, measurement_ms: u64, waveform_ms: u64, status_ms: u64) -> Self {
        self.measurement_interval_ms = measurement_ms;
        self.waveform_capture_interval_ms = waveform_ms;
        self.status_interval_ms = status_ms;
        self
    }

    /// Low-voltage limit in volts
    pub fn low_voltage_v(&self) -> f32 {
        self.nominal_voltage_v * self.low_voltage_ratio
    }

    /// High-voltage limit in volts
    pub fn high_voltage_v(&self) -> f32 {
        self.nominal_voltage_v * self.high_voltage_ratio
    }

    /// Check every setting the measurement code relies on
    pub fn validate(&self) -> MeterResult<()> {
        for count in [self.rms_samples, self.calibration_samples, self.waveform_samples] {
            if count == 0 {
                return Err(MeterError::InvalidSampleCount { requested: count });
            }
        }

        if self.waveform_samples > MAX_WAVEFORM_SAMPLES {
            return Err(MeterError::WaveformCapacity {
                requested: self.waveform_samples,
                capacity: MAX_WAVEFORM_SAMPLES,
            });
        }

        if self.rms_interval_us == 0 || self.calibration_interval_us == 0 || self.waveform_interval_us == 0 {
            return Err(MeterError::InvalidConfig { reason: "sampling interval must be positive" });
        }

        let bursts = [
            (self.rms_samples, self.rms_interval_us),
            (self.calibration_samples, self.calibration_interval_us),
            (self.waveform_samples, self.waveform_interval_us),
        ];
        if bursts.iter().any(|(samples, interval_us)| burst_duration_us(*samples, *interval_us).is_none()) {
            return Err(MeterError::InvalidConfig { reason: "burst duration overflows the clock" });
        }

        if self.adc_max == 0 {
            return Err(MeterError::InvalidConfig { reason: "adc_max must be positive" });
        }

        if self.channels[0] == self.channels[1]
            || self.channels[1] == self.channels[2]
            || self.channels[0] == self.channels[2]
        {
            return Err(MeterError::InvalidConfig { reason: "phases must use distinct channels" });
        }

        if self.sensitivity.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(MeterError::InvalidConfig { reason: "sensitivity must be positive and finite" });
        }

        if !is_positive(self.nominal_voltage_v) {
            return Err(MeterError::InvalidConfig { reason: "nominal voltage must be positive" });
        }

        if !is_positive(self.nominal_frequency_hz) {
            return Err(MeterError::InvalidConfig { reason: "nominal frequency must be positive" });
        }

        if !is_positive(self.frequency_sanity_band_hz) || self.frequency_sanity_band_hz >= self.nominal_frequency_hz {
            return Err(MeterError::InvalidConfig { reason: "sanity band must be within (0, nominal frequency)" });
        }

        if !is_positive(self.low_voltage_ratio) || !(self.low_voltage_ratio < self.high_voltage_ratio) {
            return Err(MeterError::InvalidConfig { reason: "voltage ratios must satisfy 0 < low < high" });
        }

        let non_negative = [
            self.unbalance_threshold_pct,
            self.frequency_deviation_hz,
            self.phase_loss_v,
            self.noise_floor_v,
        ];
        if non_negative.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(MeterError::InvalidConfig { reason: "thresholds must be finite and non-negative" });
        }

        Ok(())
    }
}

/// `samples * interval_us`, or `None` if it does not fit a [`Micros`] count
pub fn burst_duration_us(samples: usize, interval_us: Micros) -> Option<Micros> {
    Micros::try_from(samples).ok()?.checked_mul(interval_us)
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MeterConfig::default().validate().is_ok());
        assert!(MeterConfig::grid_230v_50hz().validate().is_ok());
        assert!(MeterConfig::grid_120v_60hz().validate().is_ok());
    }

    #[test]
    fn default_limits_match_nominal() {
        let config = MeterConfig::default();
        assert!((config.low_voltage_v() - 198.0).abs() < 1e-3);
        assert!((config.high_voltage_v() - 242.0).abs() < 1e-3);
    }

    #[test]
    fn zero_sample_counts_rejected() {
        let config = MeterConfig::default().with_rms_burst(0, 100);
        assert_eq!(config.validate(), Err(MeterError::InvalidSampleCount { requested: 0 }));

        let config = MeterConfig::default().with_waveform(0, 200);
        assert_eq!(config.validate(), Err(MeterError::InvalidSampleCount { requested: 0 }));
    }

    #[test]
    fn oversized_waveform_rejected() {
        let config = MeterConfig::default().with_waveform(MAX_WAVEFORM_SAMPLES + 1, 200);
        assert!(matches!(config.validate(), Err(MeterError::WaveformCapacity { .. })));
    }

    #[test]
    fn overlong_burst_rejected() {
        let config = MeterConfig::default().with_rms_burst(3, u64::MAX / 2);
        assert!(matches!(config.validate(), Err(MeterError::InvalidConfig { .. })));

        let config = MeterConfig::default().with_waveform(100, u64::MAX / 50);
        assert!(config.validate().is_err());

        assert_eq!(burst_duration_us(2000, 100), Some(200_000));
    }

    #[test]
    fn shared_channel_rejected() {
        let config = MeterConfig::default().with_channels([Channel(0), Channel(0), Channel(2)]);
        assert!(matches!(config.validate(), Err(MeterError::InvalidConfig { .. })));
    }

    #[test]
    fn bad_ratios_and_sensitivity_rejected() {
        let config = MeterConfig::default().with_voltage_ratios(1.1, 0.9);
        assert!(config.validate().is_err());

        let config = MeterConfig::default().with_sensitivity([0.23, f32::NAN, 0.23]);
        assert!(config.validate().is_err());

        let config = MeterConfig::default().with_sanity_band(60.0);
        assert!(config.validate().is_err());
    }
}
