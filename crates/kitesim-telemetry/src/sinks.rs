//! Pluggable event sinks.
//!
//! Sinks consume events from the bus and process them
//! (log through `tracing`, write JSON lines, buffer for inspection).

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::events::{Severity, SimulationEvent};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Called when the simulation ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Shared handle to the events collected by a [`VecSink`].
pub type EventBuffer = Arc<Mutex<Vec<SimulationEvent>>>;

/// A sink that stores events in a shared `Vec` for testing and inspection.
///
/// Keep the [`EventBuffer`] from [`VecSink::buffer`] before boxing the sink
/// into a bus; it stays readable afterwards.
pub struct VecSink {
    events: EventBuffer,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a handle to the collected events.
    pub fn buffer(&self) -> EventBuffer {
        Arc::clone(&self.events)
    }
}

impl Default for VecSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        // A poisoned buffer only means a reader panicked; keep collecting.
        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// A sink that logs events using the `tracing` crate.
///
/// Warnings go to `warn!`, summaries and clamps to `info!`, per-iteration
/// chatter to `debug!`. Events below `min_severity` are dropped.
pub struct TracingSink {
    min_severity: Severity,
}

impl TracingSink {
    /// Creates a new tracing sink that forwards events at or above `min_severity`.
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        let severity = event.severity();
        if severity < self.min_severity {
            return;
        }
        match severity {
            Severity::Warning => tracing::warn!(
                timestep = event.timestep,
                event = ?event.kind,
                "{}", event.kind.label()
            ),
            Severity::Info => tracing::info!(
                timestep = event.timestep,
                event = ?event.kind,
                "{}", event.kind.label()
            ),
            Severity::Debug => tracing::debug!(
                timestep = event.timestep,
                event = ?event.kind,
                "{}", event.kind.label()
            ),
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}

/// A sink that writes one JSON object per event to any writer.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    min_severity: Severity,
    write_errors: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Creates a sink writing every event to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            min_severity: Severity::Debug,
            write_errors: 0,
        }
    }

    /// Only write events at or above `severity`.
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Number of events that failed to serialize or write.
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn handle(&mut self, event: &SimulationEvent) {
        if event.severity() < self.min_severity {
            return;
        }
        let result = serde_json::to_writer(&mut self.writer, event)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            if self.write_errors == 0 {
                tracing::warn!(error = %e, "json_lines_sink write failed");
            }
            self.write_errors += 1;
        }
    }

    fn finalize(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(error = %e, "json_lines_sink flush failed");
        }
    }

    fn name(&self) -> &str {
        "json_lines_sink"
    }
}
