//! Live serial source
//!
//! Reads newline-framed lines from a serial-attached sensor unit. Opening,
//! losing and reopening the port is driven by the [`ReconnectController`];
//! this module only carries out the commands it hands back.
//!
//! Port reads block, so they run on a dedicated reader thread that forwards
//! complete lines through a bounded channel. Dropping the link signals the
//! thread to stop at its next read timeout.

use crate::line_protocol::{self, LineFramer};
use anyhow::{anyhow, Result as AnyResult};
use log::{debug, info, trace, warn};
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tidewatch_core::{
    LinkCommand, LinkEvent, LinkState, ReconnectController, Record, RecordSource, Result,
    SourceMetadata, TelemetryError,
};
use tidewatch_types::SerialSourceConfig;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Manufacturer strings reported by the sensor unit's USB bridges
const KNOWN_MANUFACTURERS: &[&str] = &["Arduino", "wch.cn"];

const READ_CHUNK: usize = 256;
const LINE_QUEUE: usize = 64;

/// Something that can be opened into a byte stream of sensor lines
pub trait LineTransport: Send + Sync + 'static {
    /// Human-readable target, used in log lines
    fn describe(&self) -> String;

    /// Open the transport. Called from a blocking context.
    fn open(&self) -> AnyResult<Box<dyn Read + Send>>;
}

/// Serial port opened through the `serialport` crate
pub struct SerialTransport {
    config: SerialSourceConfig,
}

impl SerialTransport {
    pub fn new(config: SerialSourceConfig) -> Self {
        Self { config }
    }

    fn resolve_port(&self) -> AnyResult<String> {
        match &self.config.port {
            Some(port) if !port.trim().is_empty() => Ok(port.clone()),
            _ => detect_port().ok_or_else(|| anyhow!("no sensor serial port detected")),
        }
    }
}

impl LineTransport for SerialTransport {
    fn describe(&self) -> String {
        match &self.config.port {
            Some(port) => format!("{} @ {} baud", port, self.config.baud_rate),
            None => format!("auto-detected port @ {} baud", self.config.baud_rate),
        }
    }

    fn open(&self) -> AnyResult<Box<dyn Read + Send>> {
        let path = self.resolve_port()?;
        let port = serialport::new(&path, self.config.baud_rate)
            .timeout(Duration::from_millis(self.config.read_timeout_ms.max(1)))
            .open()
            .map_err(|e| anyhow!("failed to open {}: {}", path, e))?;

        info!("Opened serial port: {} at {} baud", path, self.config.baud_rate);
        Ok(Box::new(port))
    }
}

/// One entry of the port listing
#[derive(Debug, Clone, PartialEq)]
pub struct PortSummary {
    pub path: String,
    pub manufacturer: Option<String>,
    pub likely_sensor: bool,
}

/// Enumerate serial ports visible to the system
pub fn list_ports() -> Vec<PortSummary> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            return Vec::new();
        }
    };

    ports
        .into_iter()
        .map(|port| {
            let manufacturer = match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => usb.manufacturer.clone(),
                _ => None,
            };
            let likely_sensor = is_likely_sensor(&port.port_name, manufacturer.as_deref());
            PortSummary {
                path: port.port_name,
                manufacturer,
                likely_sensor,
            }
        })
        .collect()
}

/// First port that looks like the sensor unit's USB bridge
pub fn detect_port() -> Option<String> {
    let ports = list_ports();
    match ports.iter().find(|port| port.likely_sensor) {
        Some(port) => {
            debug!("Detected sensor port {}", port.path);
            Some(port.path.clone())
        }
        None => {
            let available: Vec<&str> = ports.iter().map(|port| port.path.as_str()).collect();
            warn!("No sensor port detected, available: {:?}", available);
            None
        }
    }
}

/// Heuristic match on manufacturer or device path
pub fn is_likely_sensor(path: &str, manufacturer: Option<&str>) -> bool {
    let by_manufacturer = manufacturer
        .map(|m| KNOWN_MANUFACTURERS.iter().any(|known| m.contains(known)))
        .unwrap_or(false);
    by_manufacturer || path.contains("USB") || path.contains("ACM")
}

enum LinkMessage {
    Line(String),
    Failed(String),
    Closed,
}

/// An open transport plus the thread reading it
struct ActiveLink {
    lines: mpsc::Receiver<LinkMessage>,
    shutdown: Arc<AtomicBool>,
}

impl ActiveLink {
    fn spawn(mut reader: Box<dyn Read + Send>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel(LINE_QUEUE);
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);

        thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || {
                let mut framer = LineFramer::new();
                let mut buffer = [0u8; READ_CHUNK];

                while !stop.load(Ordering::Relaxed) {
                    let message = match reader.read(&mut buffer) {
                        Ok(0) => LinkMessage::Closed,
                        Ok(n) => {
                            for line in framer.push(&buffer[..n]) {
                                if tx.blocking_send(LinkMessage::Line(line)).is_err() {
                                    return;
                                }
                            }
                            continue;
                        }
                        Err(e)
                            if matches!(
                                e.kind(),
                                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                            ) =>
                        {
                            continue
                        }
                        Err(e) => LinkMessage::Failed(e.to_string()),
                    };
                    let _ = tx.blocking_send(message);
                    return;
                }
                trace!("Serial reader stopped");
            })?;

        Ok(Self {
            lines: rx,
            shutdown,
        })
    }
}

impl Drop for ActiveLink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Record source backed by a line transport, reconnecting on loss
pub struct LiveSerialSource {
    metadata: SourceMetadata,
    transport: Arc<dyn LineTransport>,
    controller: ReconnectController,
    link: Option<ActiveLink>,
    retry_at: Option<Instant>,
    lines_dropped: u64,
}

impl LiveSerialSource {
    pub fn new(config: SerialSourceConfig, reconnect_delay: Duration) -> Self {
        Self::with_transport(Arc::new(SerialTransport::new(config)), reconnect_delay)
    }

    pub fn with_transport(transport: Arc<dyn LineTransport>, reconnect_delay: Duration) -> Self {
        let metadata = SourceMetadata {
            id: "serial".to_string(),
            name: "Live Serial".to_string(),
            description: format!("Sensor unit on {}", transport.describe()),
            nominal_interval: None,
        };

        Self {
            metadata,
            transport,
            controller: ReconnectController::new(reconnect_delay),
            link: None,
            retry_at: None,
            lines_dropped: 0,
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.controller.state()
    }

    /// Lines received but rejected by the protocol adapter
    pub fn lines_dropped(&self) -> u64 {
        self.lines_dropped
    }

    fn apply(&mut self, event: LinkEvent) {
        for command in self.controller.handle(event) {
            match command {
                // The connecting state itself triggers the open attempt
                LinkCommand::Open => {}
                LinkCommand::ReleaseResources => {
                    self.link = None;
                }
                LinkCommand::ScheduleRetry(delay) => {
                    self.retry_at = Some(Instant::now() + delay);
                }
            }
        }
    }

    fn lost(&mut self, event: LinkEvent, reason: String) -> TelemetryError {
        self.apply(event);
        TelemetryError::SourceLost(reason)
    }

    async fn open_link(&mut self) -> Result<()> {
        let transport = Arc::clone(&self.transport);
        let opened = tokio::task::spawn_blocking(move || transport.open()).await;

        let reader = match opened {
            Ok(Ok(reader)) => reader,
            Ok(Err(e)) => {
                let reason = format!("{:#}", e);
                return Err(self.lost(LinkEvent::OpenFailed(reason.clone()), reason));
            }
            Err(e) => {
                let reason = format!("open task failed: {}", e);
                return Err(self.lost(LinkEvent::OpenFailed(reason.clone()), reason));
            }
        };

        match ActiveLink::spawn(reader) {
            Ok(link) => {
                self.link = Some(link);
                self.apply(LinkEvent::Opened);
                Ok(())
            }
            Err(e) => {
                let reason = format!("failed to start reader: {}", e);
                Err(self.lost(LinkEvent::OpenFailed(reason.clone()), reason))
            }
        }
    }
}

impl RecordSource for LiveSerialSource {
    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn next_record(&mut self) -> Result<Record> {
        loop {
            match self.controller.state() {
                LinkState::Disconnected => {
                    if self.controller.retry_pending() {
                        // Cleared only once the wait completes so a cancelled call keeps it
                        if let Some(at) = self.retry_at {
                            tokio::time::sleep_until(at).await;
                            self.retry_at = None;
                        }
                        self.apply(LinkEvent::RetryElapsed);
                    } else {
                        self.apply(LinkEvent::Start);
                    }
                }
                LinkState::Connecting => {
                    debug!("Opening {}", self.transport.describe());
                    self.open_link().await?;
                }
                LinkState::Connected => {
                    let message = match self.link.as_mut() {
                        Some(link) => link.lines.recv().await,
                        None => None,
                    };

                    match message {
                        Some(LinkMessage::Line(line)) => match line_protocol::parse_line(&line) {
                            Ok(record) => return Ok(record),
                            Err(e) => {
                                self.lines_dropped += 1;
                                trace!("Dropping line {:?}: {}", line, e);
                            }
                        },
                        Some(LinkMessage::Failed(reason)) => {
                            let event = LinkEvent::TransportError(reason.clone());
                            return Err(self.lost(event, reason));
                        }
                        Some(LinkMessage::Closed) | None => {
                            let reason = "transport closed".to_string();
                            return Err(self.lost(LinkEvent::Closed, reason));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;

    const DELAY: Duration = Duration::from_millis(3000);
    const LINE_A: &str = "08:00:00,5,7.1,1900,104,1.2,3800,40,0,2,1,32,24,55,0.1,10\r\n";
    const LINE_B: &str = "08:00:01,5,7.2,1910,105,1.3,3790,41,1,2,1,32,24,55,0.1,10\r\n";

    /// Each open pops the next scripted outcome; an empty script fails to open
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<std::result::Result<String, String>>>,
        opens: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<std::result::Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|step| step.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                opens: Mutex::new(0),
            })
        }

        fn opens(&self) -> u32 {
            *self.opens.lock().unwrap()
        }
    }

    impl LineTransport for ScriptedTransport {
        fn describe(&self) -> String {
            "scripted".to_string()
        }

        fn open(&self) -> AnyResult<Box<dyn Read + Send>> {
            *self.opens.lock().unwrap() += 1;
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(data)) => Ok(Box::new(Cursor::new(data.into_bytes()))),
                Some(Err(reason)) => Err(anyhow!(reason)),
                None => Err(anyhow!("device not present")),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_lines_and_drops_malformed() {
        let stream = format!("{}garbage\r\n{}", LINE_A, LINE_B);
        let transport = ScriptedTransport::new(vec![Ok(stream.as_str())]);
        let mut source = LiveSerialSource::with_transport(transport.clone(), DELAY);

        let first = source.next_record().await.unwrap();
        assert_eq!(first.timestamp, "08:00:00");
        assert_eq!(first.salinity, 1900.0);
        assert_eq!(source.link_state(), LinkState::Connected);

        let second = source.next_record().await.unwrap();
        assert_eq!(second.timestamp, "08:00:01");
        assert!(second.leak);
        assert_eq!(source.lines_dropped(), 1);
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_constant_delay() {
        let transport = ScriptedTransport::new(vec![Ok(LINE_A), Ok(LINE_B)]);
        let mut source = LiveSerialSource::with_transport(transport.clone(), DELAY);

        assert_eq!(source.next_record().await.unwrap().timestamp, "08:00:00");

        // End of stream is a lost link
        let err = source.next_record().await.unwrap_err();
        assert!(err.is_source_lost());
        assert_eq!(source.link_state(), LinkState::Disconnected);

        let lost_at = Instant::now();
        let record = source.next_record().await.unwrap();
        assert_eq!(record.timestamp, "08:00:01");
        assert!(lost_at.elapsed() >= DELAY);
        assert_eq!(transport.opens(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_opens_retry_until_device_appears() {
        let transport = ScriptedTransport::new(vec![Err("busy"), Err("busy"), Ok(LINE_A)]);
        let mut source = LiveSerialSource::with_transport(transport.clone(), DELAY);
        let started = Instant::now();

        assert!(source.next_record().await.unwrap_err().is_source_lost());
        assert!(source.next_record().await.unwrap_err().is_source_lost());
        let record = source.next_record().await.unwrap();

        assert_eq!(record.timestamp, "08:00:00");
        assert_eq!(transport.opens(), 3);
        assert!(started.elapsed() >= DELAY * 2);
        assert!(started.elapsed() < DELAY * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_retry_wait_keeps_delay() {
        let transport = ScriptedTransport::new(vec![Err("busy"), Ok(LINE_A)]);
        let mut source = LiveSerialSource::with_transport(transport.clone(), DELAY);
        assert!(source.next_record().await.unwrap_err().is_source_lost());
        let lost_at = Instant::now();

        // Abandon the wait part way through, as a shutdown select would
        let cancelled = tokio::time::timeout(DELAY / 3, source.next_record()).await;
        assert!(cancelled.is_err());
        assert_eq!(transport.opens(), 1);

        let record = source.next_record().await.unwrap();
        assert_eq!(record.timestamp, "08:00:00");
        assert!(lost_at.elapsed() >= DELAY);
        assert_eq!(transport.opens(), 2);
    }

    #[test]
    fn test_sensor_port_heuristic() {
        assert!(is_likely_sensor("/dev/ttyACM0", None));
        assert!(is_likely_sensor("/dev/ttyUSB1", None));
        assert!(is_likely_sensor("COM3", Some("Arduino LLC (www.arduino.cc)")));
        assert!(is_likely_sensor("COM4", Some("wch.cn")));
        assert!(!is_likely_sensor("/dev/ttyS0", None));
        assert!(!is_likely_sensor("COM1", Some("Microsoft")));
    }

    #[test]
    fn test_configured_port_skips_detection() {
        let transport = SerialTransport::new(SerialSourceConfig {
            port: Some("/dev/ttyACM7".to_string()),
            ..SerialSourceConfig::default()
        });
        assert_eq!(transport.resolve_port().unwrap(), "/dev/ttyACM7");
        assert!(transport.describe().contains("9600"));
    }
}
