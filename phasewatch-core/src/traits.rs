//! Core traits for the measurement boundary
//!
//! PhaseWatch never touches hardware directly. The converter and the
//! telemetry backend are injected through the traits in this module, which
//! keeps the signal processing testable against synthetic waveforms.
//!
//! The converter is a single shared resource: it can run one conversion at
//! a time. [`SampleSource::sample`] takes `&mut self`, so the borrow checker
//! serialises every read, including reads of different channels.

use crate::analyzer::PowerSnapshot;
use crate::errors::{MeterError, MeterResult};
use crate::waveform::WaveformSnapshot;

pub use crate::time::Clock;

/// One raw converter code in `[0, ADC_MAX]`
pub type RawSample = u16;

/// Converter input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel(pub u8);

/// Supply phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Phase A (L1)
    A,
    /// Phase B (L2)
    B,
    /// Phase C (L3)
    C,
}

impl Phase {
    /// All phases in measurement order
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    /// Position in per-phase arrays
    pub const fn index(self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
        }
    }

    /// Single-letter label used in tags and logs
    pub const fn label(self) -> &'static str {
        match self {
            Phase::A => "A",
            Phase::B => "B",
            Phase::C => "C",
        }
    }
}

/// Source of raw converter samples
///
/// `sample` follows the `nb` convention: return `WouldBlock` while a
/// conversion is in progress and `Other(e)` on a hardware fault. A
/// conversion must complete in time that is small against the sampling
/// interval; the caller spins on `WouldBlock`.
///
/// ```rust
/// use phasewatch_core::traits::{Channel, RawSample, SampleSource};
///
/// struct Grounded;
///
/// impl SampleSource for Grounded {
///     type Error = core::convert::Infallible;
///
///     fn sample(&mut self, _channel: Channel) -> nb::Result<RawSample, Self::Error> {
///         Ok(2048)
///     }
/// }
///
/// let mut adc = Grounded;
/// assert_eq!(adc.read_blocking(Channel(0)).unwrap(), 2048);
/// ```
pub trait SampleSource {
    /// Hardware fault type
    type Error: core::fmt::Debug;

    /// Start or poll one conversion on `channel`
    fn sample(&mut self, channel: Channel) -> nb::Result<RawSample, Self::Error>;

    /// Run one conversion to completion
    fn read_blocking(&mut self, channel: Channel) -> MeterResult<RawSample> {
        nb::block!(self.sample(channel)).map_err(|e| {
            log_warn!("converter fault on channel {}: {:?}", channel.0, e);
            MeterError::Converter { channel: channel.0 }
        })
    }
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    type Error = S::Error;

    fn sample(&mut self, channel: Channel) -> nb::Result<RawSample, Self::Error> {
        (**self).sample(channel)
    }
}

/// Consumer of measurement snapshots (telemetry backend, UI bridge, ...)
///
/// Serialization and transport belong to the implementation. A sink error
/// never aborts measurement; the driver counts and logs it.
pub trait TelemetrySink {
    /// Delivery failure type
    type Error: core::fmt::Debug;

    /// Deliver a power quality snapshot
    fn publish_power(&mut self, device_id: &str, snapshot: &PowerSnapshot) -> Result<(), Self::Error>;

    /// Deliver a raw waveform trace
    fn publish_waveform(&mut self, device_id: &str, snapshot: &WaveformSnapshot) -> Result<(), Self::Error>;
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSink;

impl TelemetrySink for NoSink {
    type Error = core::convert::Infallible;

    fn publish_power(&mut self, _device_id: &str, _snapshot: &PowerSnapshot) -> Result<(), Self::Error> {
        Ok(())
    }

    fn publish_waveform(&mut self, _device_id: &str, _snapshot: &WaveformSnapshot) -> Result<(), Self::Error> {
        Ok(())
    }
}
