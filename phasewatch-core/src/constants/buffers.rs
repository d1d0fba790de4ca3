//! Buffer Sizes and Memory Constraints
//!
//! Fixed capacities for the structures that live on the stack or in static
//! memory. Everything here is sized at compile time.

/// Per-channel capacity of a waveform trace (samples).
///
/// 3 channels × 512 samples × 2 bytes = 3 KB per snapshot, which fits the
/// stack of an ESP32 task comfortably.
pub const MAX_WAVEFORM_SAMPLES: usize = 512;

/// Capacity of the problem description string (bytes).
///
/// Long enough for all four tokens: `LOW_V HIGH_V UNBALANCE FREQ_DEV`.
pub const PROBLEM_DESCRIPTION_CAPACITY: usize = 40;

/// Capacity of the device identifier passed to telemetry sinks (bytes).
pub const DEVICE_ID_CAPACITY: usize = 32;
