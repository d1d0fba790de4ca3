//! Grid Parameters and Power Quality Limits
//!
//! Nominal supply values and the default fault thresholds applied to each
//! measurement. Threshold defaults follow the EN 50160 / GOST 13109-97
//! limits commonly used for low-voltage distribution.

// ===== NOMINAL SUPPLY =====

/// Nominal phase-to-neutral voltage (V).
pub const NOMINAL_VOLTAGE_V: f32 = 220.0;

/// Nominal grid frequency (Hz).
///
/// 50 Hz for Europe/Asia. Use [`NOMINAL_FREQUENCY_60HZ`] for the Americas.
pub const NOMINAL_FREQUENCY_HZ: f32 = 50.0;

/// Nominal grid frequency for 60 Hz networks (Hz).
pub const NOMINAL_FREQUENCY_60HZ: f32 = 60.0;

/// √3, the ratio between line and phase voltage of a balanced system.
pub const SQRT_3: f32 = 1.732_050_8;

// ===== FAULT THRESHOLDS =====

/// Low-voltage ratio. A phase strictly below `nominal × 0.9` is a fault.
///
/// Source: EN 50160 (±10 % of nominal)
pub const LOW_VOLTAGE_RATIO: f32 = 0.9;

/// High-voltage ratio. A phase strictly above `nominal × 1.1` is a fault.
///
/// Source: EN 50160 (±10 % of nominal)
pub const HIGH_VOLTAGE_RATIO: f32 = 1.1;

/// Maximum allowed unbalance (%).
///
/// 2 % is the normal limit and 4 % the maximum permissible.
///
/// Source: GOST 13109-97
pub const UNBALANCE_THRESHOLD_PCT: f32 = 4.0;

/// Maximum deviation of the average frequency from nominal (Hz).
///
/// Source: GOST 13109-97 (±0.4 Hz maximum permissible)
pub const FREQUENCY_DEVIATION_HZ: f32 = 0.4;

/// Phase voltage below which a conductor is treated as lost (V).
pub const PHASE_LOSS_V: f32 = 50.0;

// ===== SIGNAL CONDITIONING =====

/// RMS readings below this are reported as exactly 0 V.
///
/// Separates a de-energized conductor from converter noise picked up on
/// an open input.
pub const RMS_NOISE_FLOOR_V: f32 = 5.0;

/// Half-width of the accepted frequency window around nominal (Hz).
///
/// A computed frequency outside `nominal ± band` is discarded.
pub const FREQUENCY_SANITY_BAND_HZ: f32 = 10.0;

/// Average voltage below which unbalance is forced to 0 (V).
pub const UNBALANCE_MIN_AVERAGE_V: f32 = 1.0;

/// Minimum zero-crossings before a frequency estimate is trusted.
///
/// Four crossings span at least two half-cycle pairs.
pub const MIN_ZERO_CROSSINGS: u32 = 4;

// ===== DEFAULT CALIBRATION =====

/// Volts per RMS count for a ZMPT101B module before field calibration.
///
/// `V_actual = ADC_RMS * coefficient`; adjust per module against a meter.
pub const DEFAULT_SENSITIVITY: f32 = 0.23;
