//! Core measurement engine for PhaseWatch
//!
//! Turns raw ADC samples from three voltage transformer modules into
//! per-phase RMS voltage and frequency, line-to-line voltages, unbalance
//! and a small set of fault flags.
//! Designed for edge devices with limited resources.
//!
//! Key constraints:
//! - Runs on 32KB RAM (ESP32)
//! - No heap allocation anywhere
//! - One converter, shared by all three phases
//!
//! ```rust
//! use phasewatch_core::sim::ThreePhaseSource;
//! use phasewatch_core::time::SimClock;
//! use phasewatch_core::{LinePair, MeterConfig, PowerAnalyzer};
//!
//! let clock = SimClock::new(0);
//! let mut adc = ThreePhaseSource::balanced(&clock, 220.0, 0.23, 50.0);
//! let mut analyzer = PowerAnalyzer::new(MeterConfig::default())?;
//!
//! let snapshot = analyzer.measure(&mut adc, &clock)?;
//! assert!(!snapshot.has_problems());
//! assert!((snapshot.line_voltage(LinePair::AB) - 381.0).abs() < 5.0);
//! # Ok::<(), phasewatch_core::MeterError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod analyzer;
pub mod config;
pub mod constants;
pub mod errors;
pub mod monitor;
pub mod sensor;
pub mod sim;
pub mod time;
pub mod traits;
pub mod waveform;

// Public API
pub use analyzer::{FaultFlags, LinePair, PowerAnalyzer, PowerSnapshot};
pub use config::MeterConfig;
pub use errors::{MeterError, MeterResult};
pub use monitor::{Monitor, PollOutcome};
pub use sensor::{CalibrationReport, PhaseMeasurement, PhaseSensor};
pub use time::Clock;
pub use traits::{Channel, Phase, SampleSource, TelemetrySink};
pub use waveform::{WaveformCapture, WaveformSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
