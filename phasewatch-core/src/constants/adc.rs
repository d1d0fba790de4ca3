//! Analog-to-Digital Converter Characteristics
//!
//! Values describing the converter that digitises the isolated voltage
//! transformer outputs. Defaults match a 12-bit SAR converter with the
//! transformer output biased to mid-rail.

/// Converter resolution (bits).
///
/// Source: ESP32-S3 SAR ADC1 datasheet
pub const ADC_RESOLUTION_BITS: u8 = 12;

/// Largest raw code the converter can return.
///
/// 2^12 - 1 for a 12-bit converter. Raw samples are always in `[0, ADC_MAX]`.
pub const ADC_MAX: u16 = (1 << ADC_RESOLUTION_BITS) - 1;

/// Nominal quiescent center (raw counts).
///
/// The transformer module biases its output to VCC/2, which reads as
/// roughly half scale. Used as the offset before the first calibration.
pub const ADC_MIDPOINT: f32 = 2048.0;

/// Calibration spread that triggers a warning (raw counts).
///
/// A quiescent input should wander by a few tens of counts at most. A
/// larger max-min spread means the offset was taken with a live signal
/// present or with a floating input.
pub const CALIBRATION_SPREAD_WARN_COUNTS: u16 = 200;
