//! Measurement driver
//!
//! [`Monitor`] is the loop that sits around the analyzer on a device: it
//! decides when to measure and when to capture a waveform, keeps the latest
//! snapshot of each kind, hands them to a [`TelemetrySink`] and writes
//! alerts and periodic status lines to the log.
//!
//! It is cooperative. Call [`Monitor::poll`] from the main loop as often as
//! convenient; it returns immediately when nothing is due and blocks for a
//! full burst when something is.
//!
//! ```rust
//! use phasewatch_core::monitor::Monitor;
//! use phasewatch_core::sim::ThreePhaseSource;
//! use phasewatch_core::time::SimClock;
//! use phasewatch_core::MeterConfig;
//!
//! let clock = SimClock::new(0);
//! let mut adc = ThreePhaseSource::balanced(&clock, 220.0, 0.23, 50.0);
//! let mut monitor = Monitor::new(MeterConfig::default())?.with_device_id("esp32-001")?;
//!
//! let outcome = monitor.poll(&mut adc, &clock)?;
//! assert!(outcome.measured);
//! assert!(!monitor.last_power().unwrap().has_problems());
//! # Ok::<(), phasewatch_core::MeterError>(())
//! ```

use heapless::String;

use crate::analyzer::{PowerAnalyzer, PowerSnapshot};
use crate::config::MeterConfig;
use crate::constants::buffers::DEVICE_ID_CAPACITY;
use crate::errors::{MeterError, MeterResult};
use crate::sensor::CalibrationReport;
use crate::time::{Clock, Timestamp};
use crate::traits::{NoSink, Phase, SampleSource, TelemetrySink};
use crate::waveform::{WaveformCapture, WaveformSnapshot};

/// What a call to [`Monitor::poll`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// A measurement cycle ran
    pub measured: bool,
    /// A waveform was captured
    pub captured: bool,
}

/// Interval gate: due on first check, then every `interval_ms`
#[derive(Debug, Clone, Copy)]
struct Cadence {
    interval_ms: u64,
    last_ms: Option<Timestamp>,
}

impl Cadence {
    fn new(interval_ms: u64) -> Self {
        Self { interval_ms, last_ms: None }
    }

    fn is_enabled(&self) -> bool {
        self.interval_ms > 0
    }

    fn is_due(&self, now_ms: Timestamp) -> bool {
        self.is_enabled()
            && self
                .last_ms
                .map_or(true, |last| now_ms.saturating_sub(last) >= self.interval_ms)
    }

    fn mark(&mut self, now_ms: Timestamp) {
        self.last_ms = Some(now_ms);
    }
}

/// Cooperative measurement driver with last-snapshot retention
pub struct Monitor<K: TelemetrySink = NoSink> {
    analyzer: PowerAnalyzer,
    waveform: WaveformCapture,
    sink: K,
    device_id: String<DEVICE_ID_CAPACITY>,
    measurement: Cadence,
    capture: Cadence,
    status: Cadence,
    last_power: Option<PowerSnapshot>,
    last_waveform: Option<WaveformSnapshot>,
    measurement_count: u64,
    sink_deliveries: u64,
    sink_failures: u64,
}

impl Monitor<NoSink> {
    /// Driver without a telemetry sink
    pub fn new(config: MeterConfig) -> MeterResult<Self> {
        let waveform = WaveformCapture::new(&config)?;
        let measurement = Cadence::new(config.measurement_interval_ms.max(1));
        let capture = Cadence::new(config.waveform_capture_interval_ms);
        let status = Cadence::new(config.status_interval_ms);
        let analyzer = PowerAnalyzer::new(config)?;

        Ok(Self {
            analyzer,
            waveform,
            sink: NoSink,
            device_id: String::new(),
            measurement,
            capture,
            status,
            last_power: None,
            last_waveform: None,
            measurement_count: 0,
            sink_deliveries: 0,
            sink_failures: 0,
        })
    }
}

impl<K: TelemetrySink> Monitor<K> {
    /// Replace the telemetry sink
    pub fn with_sink<K2: TelemetrySink>(self, sink: K2) -> Monitor<K2> {
        Monitor {
            analyzer: self.analyzer,
            waveform: self.waveform,
            sink,
            device_id: self.device_id,
            measurement: self.measurement,
            capture: self.capture,
            status: self.status,
            last_power: self.last_power,
            last_waveform: self.last_waveform,
            measurement_count: self.measurement_count,
            sink_deliveries: self.sink_deliveries,
            sink_failures: self.sink_failures,
        }
    }

    /// Set the device identifier passed to the sink
    pub fn with_device_id(mut self, device_id: &str) -> MeterResult<Self> {
        self.device_id.clear();
        self.device_id
            .push_str(device_id)
            .map_err(|_| MeterError::InvalidConfig { reason: "device id too long" })?;
        Ok(self)
    }

    /// Device identifier
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The analyzer
    pub fn analyzer(&self) -> &PowerAnalyzer {
        &self.analyzer
    }

    /// The analyzer, for sensitivity changes and single-phase calibration
    pub fn analyzer_mut(&mut self) -> &mut PowerAnalyzer {
        &mut self.analyzer
    }

    /// The telemetry sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Latest power snapshot, if any cycle has completed
    pub fn last_power(&self) -> Option<&PowerSnapshot> {
        self.last_power.as_ref()
    }

    /// Latest waveform, if any capture has completed
    pub fn last_waveform(&self) -> Option<&WaveformSnapshot> {
        self.last_waveform.as_ref()
    }

    /// Completed measurement cycles
    pub fn measurement_count(&self) -> u64 {
        self.measurement_count
    }

    /// Snapshots the sink accepted
    pub fn sink_deliveries(&self) -> u64 {
        self.sink_deliveries
    }

    /// Snapshots the sink failed to accept
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }

    /// Whether the latest power snapshot has any fault
    pub fn has_problems(&self) -> bool {
        self.last_power.as_ref().map_or(false, PowerSnapshot::has_problems)
    }

    /// Calibrate all three offsets
    pub fn calibrate<S, C>(&mut self, source: &mut S, clock: &C) -> MeterResult<[CalibrationReport; 3]>
    where
        S: SampleSource,
        C: Clock,
    {
        self.analyzer.calibrate(source, clock)
    }

    /// Run whatever is due
    ///
    /// A converter fault is returned and leaves the retained snapshots as
    /// they were. Sink failures are counted, never returned.
    pub fn poll<S, C>(&mut self, source: &mut S, clock: &C) -> MeterResult<PollOutcome>
    where
        S: SampleSource,
        C: Clock,
    {
        let mut outcome = PollOutcome::default();

        let now_ms = clock.now_ms();
        if self.measurement.is_due(now_ms) {
            self.measurement.mark(now_ms);
            self.run_measurement(source, clock)?;
            outcome.measured = true;
        }

        let now_ms = clock.now_ms();
        if self.capture.is_due(now_ms) {
            self.capture.mark(now_ms);
            self.run_capture(source, clock)?;
            outcome.captured = true;
        }

        Ok(outcome)
    }

    fn run_measurement<S, C>(&mut self, source: &mut S, clock: &C) -> MeterResult<()>
    where
        S: SampleSource,
        C: Clock,
    {
        let snapshot = self.analyzer.measure(source, clock)?;
        self.measurement_count += 1;

        match self.sink.publish_power(&self.device_id, &snapshot) {
            Ok(()) => self.sink_deliveries += 1,
            Err(e) => {
                self.sink_failures += 1;
                log_warn!("telemetry sink rejected power snapshot: {:?}", e);
            }
        }

        if snapshot.has_problems() {
            log_warn!(
                "[ALERT] {} | A={:.1}V B={:.1}V C={:.1}V | Unb={:.1}% | F={:.2}Hz",
                snapshot.faults,
                snapshot.voltage(Phase::A),
                snapshot.voltage(Phase::B),
                snapshot.voltage(Phase::C),
                snapshot.unbalance_pct,
                snapshot.frequency_avg
            );
        }

        let now_ms = clock.now_ms();
        if self.status.is_due(now_ms) {
            self.status.mark(now_ms);
            self.log_status(&snapshot);
        }

        self.last_power = Some(snapshot);
        Ok(())
    }

    fn run_capture<S, C>(&mut self, source: &mut S, clock: &C) -> MeterResult<()>
    where
        S: SampleSource,
        C: Clock,
    {
        let snapshot = self.waveform.capture(source, clock)?;

        match self.sink.publish_waveform(&self.device_id, &snapshot) {
            Ok(()) => self.sink_deliveries += 1,
            Err(e) => {
                self.sink_failures += 1;
                log_warn!("telemetry sink rejected waveform: {:?}", e);
            }
        }

        self.last_waveform = Some(snapshot);
        Ok(())
    }

    fn log_status(&self, snapshot: &PowerSnapshot) {
        log_info!(
            "#{} A={:.1}V@{:.2}Hz B={:.1}V@{:.2}Hz C={:.1}V@{:.2}Hz avg={:.1}V@{:.2}Hz \
             AB={:.1}V BC={:.1}V CA={:.1}V unbalance={:.2}% status={} sent={} failed={}",
            self.measurement_count,
            snapshot.voltage(Phase::A),
            snapshot.frequency(Phase::A),
            snapshot.voltage(Phase::B),
            snapshot.frequency(Phase::B),
            snapshot.voltage(Phase::C),
            snapshot.frequency(Phase::C),
            snapshot.voltage_avg,
            snapshot.frequency_avg,
            snapshot.line_voltages[0],
            snapshot.line_voltages[1],
            snapshot.line_voltages[2],
            snapshot.unbalance_pct,
            snapshot.faults,
            self.sink_deliveries,
            self.sink_failures
        );
    }
}
