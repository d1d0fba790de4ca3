//! Time-Related Constants
//!
//! Unit conversions, sampling cadences and driver intervals.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Microseconds per millisecond.
pub const US_PER_MS: u64 = 1000;

/// Microseconds per second.
pub const US_PER_SECOND: u64 = 1_000_000;

// ===== RMS BURSTS =====

/// Samples per RMS burst.
///
/// 2000 samples at 100 µs cover 200 ms, i.e. ten 50 Hz cycles.
pub const RMS_SAMPLES: usize = 2000;

/// Interval between RMS samples (µs). 10 kHz sampling.
pub const RMS_SAMPLE_INTERVAL_US: u64 = 100;

// ===== CALIBRATION =====

/// Samples averaged by an offset calibration.
pub const CALIBRATION_SAMPLES: usize = 5000;

/// Interval between calibration samples (µs).
pub const CALIBRATION_INTERVAL_US: u64 = 50;

// ===== WAVEFORM CAPTURE =====

/// Samples per channel in a waveform trace.
///
/// 100 samples at 200 µs cover 20 ms, one 50 Hz cycle.
pub const WAVEFORM_SAMPLES: usize = 100;

/// Interval between waveform ticks (µs). 5 kHz per channel.
pub const WAVEFORM_INTERVAL_US: u64 = 200;

// ===== DRIVER CADENCE =====

/// Interval between measurement cycles (ms).
pub const MEASUREMENT_INTERVAL_MS: u64 = 1000;

/// Interval between waveform captures (ms). 0 disables capture.
pub const WAVEFORM_CAPTURE_INTERVAL_MS: u64 = 5000;

/// Interval between status summaries in the log (ms).
pub const STATUS_INTERVAL_MS: u64 = 10_000;
