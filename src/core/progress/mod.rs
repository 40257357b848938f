use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::core::orchestrator::BatchReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Downloading,
    Extracting,
}

/// Percentage update for one artifact phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub artifact: String,
    /// File name or folder path the percentage refers to.
    pub label: String,
    pub percent: f64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub text: String,
}

/// Everything the core tells its caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InstallerEvent {
    Progress(ProgressEvent),
    Log(LogLine),
    /// Headline such as "Downloading Station software."
    Status { text: String },
    ProgressReset,
    BatchComplete(BatchReport),
}

/// Receives progress and log notifications from the core.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: InstallerEvent);
}

impl ProgressSink for UnboundedSender<InstallerEvent> {
    fn emit(&self, event: InstallerEvent) {
        // A dropped receiver just means nobody is watching.
        let _ = self.send(event);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(InstallerEvent) + Send + Sync,
{
    fn emit(&self, event: InstallerEvent) {
        self(event)
    }
}

pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: InstallerEvent) {}
}

/// Cheap handle that fans events out to the sink and mirrors logs into tracing.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn ProgressSink>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink }
    }

    pub fn silent() -> Self {
        Self::new(Arc::new(NullSink))
    }

    pub fn log(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        info!("{}", text);
        self.sink.emit(InstallerEvent::Log(LogLine {
            at: Local::now(),
            text,
        }));
    }

    pub fn status(&self, text: impl Into<String>) {
        self.sink.emit(InstallerEvent::Status { text: text.into() });
    }

    pub fn progress(&self, artifact: &str, label: &str, percent: f64, phase: Phase) {
        self.sink.emit(InstallerEvent::Progress(ProgressEvent {
            artifact: artifact.to_string(),
            label: label.to_string(),
            percent,
            phase,
        }));
    }

    pub fn reset(&self) {
        self.sink.emit(InstallerEvent::ProgressReset);
    }

    pub fn batch_complete(&self, report: BatchReport) {
        self.sink.emit(InstallerEvent::BatchComplete(report));
    }
}

/// Rounds a percentage to two decimal places.
pub fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Coarse "k of n items" percentage, rounded to two decimals.
pub fn item_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    round_percent(done as f64 * 100.0 / total as f64)
}
