//! Error Types for Measurement Failures
//!
//! ## Design Philosophy
//!
//! PhaseWatch runs its sampling loops on small microcontrollers, so the error
//! type follows the same rules as the rest of the hot path:
//!
//! 1. **Small Size**: every variant carries at most two machine words.
//!
//! 2. **No Heap Allocation**: messages are `&'static str`, never `String`.
//!
//! 3. **Copy Semantics**: errors are `Copy` so they can be returned from a
//!    burst and stored in a status struct without moves.
//!
//! ## What Is (and Is Not) an Error
//!
//! Numerically degenerate readings are *not* errors. They are resolved by a
//! substitution policy inside the measurement code:
//!
//! | Condition                               | Substitution            |
//! |-----------------------------------------|-------------------------|
//! | Average voltage below 1 V               | unbalance = 0 %         |
//! | RMS below the noise floor               | RMS = 0 V               |
//! | Fewer than 4 zero-crossings             | frequency = nominal     |
//! | Frequency outside the sanity band       | frequency = nominal     |
//!
//! Errors are reserved for things the caller has to fix:
//!
//! - `InvalidSampleCount`: a burst of zero samples was requested
//! - `InvalidConfig`: a configuration value makes measurement meaningless
//! - `Converter`: the sample source reported a hardware fault mid-burst
//! - `WaveformCapacity`: the requested trace does not fit the fixed buffers
//!
//! ```rust
//! use phasewatch_core::{MeterConfig, MeterError};
//!
//! let config = MeterConfig::default().with_rms_burst(0, 100);
//! match config.validate() {
//!     Err(MeterError::InvalidSampleCount { requested }) => assert_eq!(requested, 0),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for measurement operations
pub type MeterResult<T> = Result<T, MeterError>;

/// Measurement errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterError {
    /// A burst was requested with no samples; RMS would divide by zero
    #[error("Sample count must be positive, got {requested}")]
    InvalidSampleCount {
        /// The rejected sample count
        requested: usize,
    },

    /// Configuration rejected before any sampling took place
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Which setting was rejected and why
        reason: &'static str,
    },

    /// The sample source failed while converting
    #[error("Converter fault on channel {channel}")]
    Converter {
        /// Converter channel that was being read
        channel: u8,
    },

    /// Waveform sample count exceeds the fixed trace buffers
    #[error("Waveform of {requested} samples exceeds capacity {capacity}")]
    WaveformCapacity {
        /// Samples requested per channel
        requested: usize,
        /// Compile-time buffer capacity per channel
        capacity: usize,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for MeterError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidSampleCount { requested } =>
                defmt::write!(fmt, "Sample count {} must be positive", requested),
            Self::InvalidConfig { reason } =>
                defmt::write!(fmt, "Invalid config: {}", reason),
            Self::Converter { channel } =>
                defmt::write!(fmt, "Converter fault on channel {}", channel),
            Self::WaveformCapacity { requested, capacity } =>
                defmt::write!(fmt, "Waveform {} exceeds capacity {}", requested, capacity),
        }
    }
}
