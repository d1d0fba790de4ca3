//! Constants for PhaseWatch Core
//!
//! Centralized, documented constants used throughout the measurement engine.
//! Names carry their unit suffix (`_V`, `_HZ`, `_US`, `_MS`, `_PCT`).
//!
//! ## Organization
//!
//! - **Adc**: converter resolution and quiescent point
//! - **Grid**: nominal supply values and fault thresholds
//! - **Time**: unit conversions, burst cadences and driver intervals
//! - **Buffers**: fixed capacities for traces and strings

/// Converter characteristics.
pub mod adc;

/// Grid nominal values and power quality limits.
pub mod grid;

/// Sampling cadences and time unit conversions.
pub mod time;

/// Fixed buffer capacities.
pub mod buffers;

pub use adc::{ADC_MAX, ADC_MIDPOINT, ADC_RESOLUTION_BITS, CALIBRATION_SPREAD_WARN_COUNTS};

pub use grid::{
    NOMINAL_VOLTAGE_V, NOMINAL_FREQUENCY_HZ, SQRT_3,
    LOW_VOLTAGE_RATIO, HIGH_VOLTAGE_RATIO, UNBALANCE_THRESHOLD_PCT,
    FREQUENCY_DEVIATION_HZ, RMS_NOISE_FLOOR_V, FREQUENCY_SANITY_BAND_HZ,
};

pub use time::{
    MS_PER_SECOND, US_PER_MS, US_PER_SECOND,
    RMS_SAMPLES, RMS_SAMPLE_INTERVAL_US, WAVEFORM_SAMPLES, WAVEFORM_INTERVAL_US,
};

pub use buffers::{MAX_WAVEFORM_SAMPLES, PROBLEM_DESCRIPTION_CAPACITY};
