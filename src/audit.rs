//! # Audit Events
//!
//! Every handled command produces one [`AuditEvent`]: a fresh id, the time it
//! was handled, the command name and its arguments as JSON. Events go to an
//! [`EventSink`]; which one is chosen by the `output` config key:
//!
//! | `output` | Sink | Where events go |
//! |----------|------|-----------------|
//! | `"log"` (default) | [`LogSink`] | one `info!` line per event |
//! | `"stdout"` | [`WriterSink`] | one JSON document per line on stdout |
//!
//! ```text
//! {"event_id":"0b8c..","timestamp":"2026-06-01T09:00:00Z","method":"issue","arguments":{"ids":[11,12]}}
//! ```

use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// One record of a handled command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub arguments: serde_json::Value,
}

impl AuditEvent {
    pub fn new(method: impl Into<String>, arguments: serde_json::Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp,
            method: method.into(),
            arguments,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to encode audit event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write audit event: {0}")]
    Write(#[from] io::Error),
}

/// Destination for audit events.
pub trait EventSink: Send + Sync {
    fn send(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Writes each event as one JSON line.
pub struct WriterSink<W> {
    out: Mutex<W>,
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn send(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let line = serde_json::to_string(event)?;
        let mut out = self.out.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// Emits each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn send(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let arguments = serde_json::to_string(&event.arguments)?;
        info!(
            event_id = %event.event_id,
            timestamp = %event.timestamp,
            method = %event.method,
            %arguments,
            "Audit event"
        );
        Ok(())
    }
}

/// Keeps events in memory. For tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for MemorySink {
    fn send(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Where audit events are sent, as named in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSource {
    #[default]
    Log,
    Stdout,
}

impl OutputSource {
    pub fn sink(self) -> Arc<dyn EventSink> {
        match self {
            OutputSource::Log => Arc::new(LogSink),
            OutputSource::Stdout => Arc::new(WriterSink::stdout()),
        }
    }
}
