//! Bridge orchestration.
//!
//! Connects to the receiver, then runs the poll loop on the calling thread and
//! the heartbeat loop on its own thread until the stop signal is raised:
//!
//! ```text
//! Disconnected -> Connected -> Running -> Stopping -> Disconnected
//! ```
//!
//! Both loops send through one shared [`PacketSender`].

pub mod heartbeat;
pub mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::receiver::frame::{decode_frame, SensorReading, MIN_FRAME_LEN};
use crate::receiver::{
    DeviceOpener, ReceiverDevice, ReceiverError, DEFAULT_PRODUCT_ID, DEFAULT_REPORT_SIZE,
    DEFAULT_VENDOR_ID,
};
use crate::slimevr::{DatagramSink, PacketSender};

pub use registry::{Observation, TrackerRegistry, TrackerSession, DEFAULT_TELEMETRY_INTERVAL};

/// Bridge errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to connect to receiver: {0}")]
    Connect(#[source] ReceiverError),

    #[error("Failed to start heartbeat thread: {0}")]
    ThreadSpawn(String),
}

/// Bridge lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Connected,
    Running,
    Stopping,
}

/// Cooperative stop flag shared between the bridge and whoever stops it.
///
/// Once triggered it stays triggered.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the bridge to stop.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runtime settings for one bridge.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Receiver USB vendor ID
    pub vendor_id: u16,
    /// Receiver USB product ID
    pub product_id: u16,
    /// Maximum report size read per poll
    pub report_size: usize,
    /// Bounded wait for one report
    pub read_timeout: Duration,
    /// Pause after an empty read
    pub idle_sleep: Duration,
    /// Pause after a read error
    pub read_error_backoff: Duration,
    /// Heartbeat period
    pub heartbeat_interval: Duration,
    /// Minimum spacing of battery packets per tracker
    pub telemetry_interval: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            report_size: DEFAULT_REPORT_SIZE,
            read_timeout: Duration::from_millis(10),
            idle_sleep: Duration::from_millis(1),
            read_error_backoff: Duration::from_millis(100),
            heartbeat_interval: Duration::from_secs(1),
            telemetry_interval: DEFAULT_TELEMETRY_INTERVAL,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeReport {
    /// Distinct tracker identities observed
    pub trackers_seen: usize,
    /// Non-empty reports read from the receiver
    pub frames_read: u64,
    /// Reports that decoded to a reading
    pub readings_decoded: u64,
    /// Receiver read errors
    pub read_errors: u64,
    /// Packets handed to the network
    pub packets_sent: u64,
    /// Packets dropped on send failure
    pub send_errors: u64,
    /// Heartbeats sent during the run
    pub heartbeats: u64,
}

#[derive(Debug, Default)]
struct RunStats {
    frames_read: u64,
    readings_decoded: u64,
    read_errors: u64,
}

/// Receiver-to-server bridge.
pub struct Bridge {
    settings: BridgeSettings,
    sender: Arc<PacketSender>,
    registry: TrackerRegistry,
    state: BridgeState,
    stop: StopSignal,
    stats: RunStats,
}

impl Bridge {
    /// Create a bridge sending to `sink`.
    pub fn new(settings: BridgeSettings, sink: Box<dyn DatagramSink>) -> Self {
        Self::with_sender(settings, Arc::new(PacketSender::new(sink)))
    }

    /// Create a bridge around an existing sender.
    pub fn with_sender(settings: BridgeSettings, sender: Arc<PacketSender>) -> Self {
        Self {
            settings,
            sender,
            registry: TrackerRegistry::new(),
            state: BridgeState::Disconnected,
            stop: StopSignal::new(),
            stats: RunStats::default(),
        }
    }

    /// Signal that stops [`Bridge::run`] when triggered.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Tracker sessions seen so far.
    pub fn registry(&self) -> &TrackerRegistry {
        &self.registry
    }

    /// Shared packet sender.
    pub fn sender(&self) -> Arc<PacketSender> {
        Arc::clone(&self.sender)
    }

    /// Bridge settings.
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Connect to the receiver and bridge until stopped.
    ///
    /// A failed open is fatal and leaves the bridge disconnected. Read and send
    /// errors are logged and never end the run. The receiver handle is closed
    /// exactly once, after the heartbeat thread has finished.
    pub fn run<O: DeviceOpener>(&mut self, opener: &O) -> Result<BridgeReport, BridgeError> {
        let mut device = self.connect(opener)?;

        let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded::<()>(0);
        let heartbeat = match heartbeat::spawn(
            Arc::clone(&self.sender),
            self.settings.heartbeat_interval,
            self.stop.clone(),
            shutdown_rx,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                self.disconnect(device);
                return Err(BridgeError::ThreadSpawn(e.to_string()));
            }
        };

        self.state = BridgeState::Running;
        tracing::info!("Bridge running");

        self.poll_loop(&mut device);

        self.state = BridgeState::Stopping;
        tracing::info!("Stopping bridge...");

        drop(shutdown_tx);
        let heartbeats = heartbeat.join().unwrap_or_else(|_| {
            tracing::error!("Heartbeat thread panicked");
            0
        });

        self.disconnect(device);

        let report = self.report(heartbeats);
        tracing::info!(
            "Session stats: {} trackers connected, {} packets sent",
            report.trackers_seen,
            report.packets_sent
        );

        Ok(report)
    }

    /// Decode one frame and forward the resulting reading.
    ///
    /// Returns the decoded reading, or `None` when the frame is not decodable.
    pub fn process_frame(&mut self, frame: &[u8], now: Instant) -> Option<SensorReading> {
        let reading = decode_frame(frame)?;
        self.stats.readings_decoded += 1;
        self.handle_reading(&reading, now);
        Some(reading)
    }

    fn connect<O: DeviceOpener>(&mut self, opener: &O) -> Result<O::Device, BridgeError> {
        tracing::info!(
            "Connecting to receiver {:04X}:{:04X}",
            self.settings.vendor_id,
            self.settings.product_id
        );

        let mut device = opener
            .open(self.settings.vendor_id, self.settings.product_id)
            .map_err(|e| {
                tracing::error!("Connection failed: {}", e);
                BridgeError::Connect(e)
            })?;

        // The poll loop relies on bounded reads, so a receiver stuck in
        // blocking mode counts as a failed connection.
        if let Err(e) = device.set_nonblocking() {
            tracing::error!("Could not switch receiver to non-blocking mode: {}", e);
            if let Err(close_err) = device.close() {
                tracing::warn!("Error closing receiver: {}", close_err);
            }
            return Err(BridgeError::Connect(e));
        }

        self.state = BridgeState::Connected;

        if let Some(info) = device.info() {
            tracing::info!(
                "Connected: {} {}",
                info.manufacturer.as_deref().unwrap_or("unknown manufacturer"),
                info.product.as_deref().unwrap_or("unknown product")
            );
            if let Some(serial) = info.serial_number {
                tracing::debug!("Serial number: {}", serial);
            }
        }

        Ok(device)
    }

    fn disconnect<D: ReceiverDevice>(&mut self, device: D) {
        if let Err(e) = device.close() {
            tracing::warn!("Error closing receiver: {}", e);
        }
        self.state = BridgeState::Disconnected;
        tracing::info!("Disconnected");
    }

    fn poll_loop<D: ReceiverDevice>(&mut self, device: &mut D) {
        let mut buf = vec![0u8; self.settings.report_size.max(MIN_FRAME_LEN)];

        while !self.stop.is_triggered() {
            match device.read(&mut buf, self.settings.read_timeout) {
                Ok(0) => thread::sleep(self.settings.idle_sleep),
                Ok(len) => {
                    self.stats.frames_read += 1;
                    let len = len.min(buf.len());
                    self.process_frame(&buf[..len], Instant::now());
                }
                Err(e) => {
                    self.stats.read_errors += 1;
                    tracing::warn!("Read error: {}", e);
                    thread::sleep(self.settings.read_error_backoff);
                }
            }
        }
    }

    fn handle_reading(&mut self, reading: &SensorReading, now: Instant) {
        let tracker_id = reading.tracker_id();
        let observation = self.registry.observe(tracker_id, now);

        if observation.is_new_session {
            tracing::info!("New tracker connected: #{}", tracker_id);
        }

        match reading {
            SensorReading::Orientation { data, .. } => {
                if observation.handshake_pending {
                    // Send errors are logged by the sender; the packet is dropped.
                    let _ = self.sender.send_handshake(tracker_id);
                    self.registry.mark_handshake_sent(tracker_id);
                }

                let _ = self.sender.send_orientation(tracker_id, data.quaternion);
                tracing::debug!(
                    "Tracker #{}: q={:?} accel_z={:.3}g",
                    tracker_id,
                    data.quaternion,
                    data.accel_z
                );

                if self
                    .registry
                    .due_for_telemetry_resend(tracker_id, now, self.settings.telemetry_interval)
                {
                    let _ = self.sender.send_battery(tracker_id, data.battery_pct);
                    self.registry.mark_telemetry_sent(tracker_id, now);
                }
            }
            SensorReading::DeviceInfo { .. } | SensorReading::Status { .. } => {
                tracing::debug!("Tracker #{}: {:?} frame", tracker_id, reading.kind());
            }
        }
    }

    fn report(&self, heartbeats: u64) -> BridgeReport {
        BridgeReport {
            trackers_seen: self.registry.len(),
            frames_read: self.stats.frames_read,
            readings_decoded: self.stats.readings_decoded,
            read_errors: self.stats.read_errors,
            packets_sent: self.sender.packets_sent(),
            send_errors: self.sender.send_errors(),
            heartbeats,
        }
    }
}
