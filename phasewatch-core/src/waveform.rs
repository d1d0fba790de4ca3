//! Raw three-phase waveform capture
//!
//! Short bursts of unconditioned samples for diagnostic plotting. Each tick
//! reads A, B and C back-to-back, so the three traces are offset from each
//! other by one conversion time; the converter cannot do better.
//!
//! No offset is subtracted and nothing is scaled; codes above the converter
//! range are clamped to `adc_max`, as on the RMS path. A renderer that wants a
//! centered trace can use [`WaveformSnapshot::centered`] with the sensor
//! offsets, and will then see any calibration error as a DC shift.

use heapless::Vec;

use crate::config::{burst_duration_us, MeterConfig};
use crate::constants::buffers::MAX_WAVEFORM_SAMPLES;
use crate::errors::{MeterError, MeterResult};
use crate::time::{Clock, Micros, Pacer, Timestamp};
use crate::traits::{Channel, Phase, RawSample, SampleSource};

/// Raw samples of one channel
pub type Trace = Vec<RawSample, MAX_WAVEFORM_SAMPLES>;

/// One synchronized raw capture of the three channels
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveformSnapshot {
    /// Raw traces, indexed by [`Phase::index`]
    pub traces: [Trace; 3],
    /// Samples per trace
    pub sample_count: usize,
    /// Interval between ticks (µs)
    pub interval_us: Micros,
    /// When the capture started (ms)
    pub captured_at_ms: Timestamp,
}

impl WaveformSnapshot {
    /// Raw samples of one phase
    pub fn phase(&self, phase: Phase) -> &[RawSample] {
        &self.traces[phase.index()]
    }

    /// Samples of one phase with `offset` subtracted
    pub fn centered(&self, phase: Phase, offset: f32) -> impl Iterator<Item = f32> + '_ {
        self.phase(phase).iter().map(move |raw| f32::from(*raw) - offset)
    }

    /// Time covered by the capture (µs)
    pub fn duration_us(&self) -> Micros {
        self.sample_count as Micros * self.interval_us
    }
}

/// Paced raw capture of the three phase channels
#[derive(Debug, Clone)]
pub struct WaveformCapture {
    channels: [Channel; 3],
    sample_count: usize,
    interval_us: Micros,
    adc_max: RawSample,
}

impl WaveformCapture {
    /// Capture with the configured channels, length and cadence
    pub fn new(config: &MeterConfig) -> MeterResult<Self> {
        Self::with_params(
            config.channels,
            config.waveform_samples,
            config.waveform_interval_us,
            config.adc_max,
        )
    }

    /// Capture with explicit parameters
    pub fn with_params(
        channels: [Channel; 3],
        sample_count: usize,
        interval_us: Micros,
        adc_max: RawSample,
    ) -> MeterResult<Self> {
        if sample_count == 0 {
            return Err(MeterError::InvalidSampleCount { requested: sample_count });
        }
        if sample_count > MAX_WAVEFORM_SAMPLES {
            return Err(MeterError::WaveformCapacity {
                requested: sample_count,
                capacity: MAX_WAVEFORM_SAMPLES,
            });
        }
        if interval_us == 0 {
            return Err(MeterError::InvalidConfig { reason: "sampling interval must be positive" });
        }
        if burst_duration_us(sample_count, interval_us).is_none() {
            return Err(MeterError::InvalidConfig { reason: "burst duration overflows the clock" });
        }

        Ok(Self { channels, sample_count, interval_us, adc_max })
    }

    /// Samples per trace
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Interval between ticks (µs)
    pub fn interval_us(&self) -> Micros {
        self.interval_us
    }

    /// Largest code stored in a trace
    pub fn adc_max(&self) -> RawSample {
        self.adc_max
    }

    /// Capture one trace per phase
    ///
    /// Blocks for `sample_count * interval`. A converter fault aborts the
    /// capture and nothing partial is returned.
    pub fn capture<S, C>(&self, source: &mut S, clock: &C) -> MeterResult<WaveformSnapshot>
    where
        S: SampleSource,
        C: Clock,
    {
        let captured_at_ms = clock.now_ms();
        let mut traces: [Trace; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let mut pacer = Pacer::start(clock, self.interval_us);

        for tick in 0..self.sample_count {
            pacer.wait_for_tick(clock, tick);
            for (trace, channel) in traces.iter_mut().zip(self.channels) {
                let raw = source.read_blocking(channel)?;
                // sample_count <= capacity was checked at construction
                let _ = trace.push(raw.min(self.adc_max));
            }
        }

        if pacer.late_ticks() > 0 {
            log_warn!(
                "waveform capture missed {} ticks (worst {} us late)",
                pacer.late_ticks(),
                pacer.max_lateness_us()
            );
        }
        log_debug!("captured {} x 3 waveform samples", self.sample_count);

        Ok(WaveformSnapshot {
            traces,
            sample_count: self.sample_count,
            interval_us: self.interval_us,
            captured_at_ms,
        })
    }
}
