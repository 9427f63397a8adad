// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pull event records and layer progress types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use super::phase::PullPhase;

/// Identifier of a layer as reported by the daemon.
///
/// Taken verbatim from the event `id` field. Short digests such as
/// `"a0d0a0d46f8b"` are typical but nothing about the format is assumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Create a layer id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty id, which carries no layer information.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LayerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for LayerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A current/total pair with a completion flag.
///
/// Once completed the flag stays set; later events may still overwrite the
/// numbers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressCounter {
    /// Units done so far
    pub current: u64,
    /// Units expected in total (0 when unknown)
    pub total: u64,
    /// Whether the measured aspect has finished
    pub completed: bool,
}

impl ProgressCounter {
    /// Returns true once the counter has been forced to completion.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Calculate progress as a percentage (0-100).
    ///
    /// Completed counters report 100 even when no totals were ever seen.
    pub fn percentage(&self) -> Option<f64> {
        if self.completed {
            return Some(100.0);
        }
        if self.total == 0 {
            return None;
        }
        Some((self.current as f64 / self.total as f64) * 100.0)
    }

    /// Overwrite both numbers from event data.
    pub(crate) fn set(&mut self, current: u64, total: u64) {
        self.current = current;
        self.total = total;
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }
}

/// Point-in-time view of one layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerState {
    /// Phase reported by the latest event
    pub phase: PullPhase,
    /// Progress toward finishing the current phase
    pub phase_progress: ProgressCounter,
    /// Bytes downloaded, tracked independently of the phase
    pub download_progress: ProgressCounter,
}

/// Aggregate figures across all tracked layers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullSummary {
    /// Number of tracked layers
    pub layers: usize,
    /// Layers whose phase progress has completed
    pub layers_done: usize,
    /// Sum of downloaded bytes
    pub bytes_current: u64,
    /// Sum of expected bytes
    pub bytes_total: u64,
    /// Whether the session was marked complete
    pub complete: bool,
}

/// Numeric progress attached to an event.
///
/// Daemons send signed integers here. Negative values are recorded as zero
/// instead of rejecting the line.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressDetail {
    #[serde(default, deserialize_with = "non_negative")]
    pub current: u64,
    #[serde(default, deserialize_with = "non_negative")]
    pub total: u64,
}

fn non_negative<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    Ok(u64::try_from(value).unwrap_or(0))
}

/// Structured error attached to an event by newer daemons.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// One decoded record of the daemon's image pull stream.
///
/// ```json
/// {"status":"Downloading","progressDetail":{"current":50,"total":100},"id":"a0d0a0d46f8b"}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullEvent {
    /// Layer identifier, empty for image-level messages
    #[serde(default)]
    pub id: String,
    /// Human-readable phase label
    #[serde(default)]
    pub status: String,
    /// In-band failure reported by the daemon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, rename = "errorDetail", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
    /// Pre-rendered progress bar text, not interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, rename = "progressDetail")]
    pub progress_detail: ProgressDetail,
}

impl PullEvent {
    /// Create an event with the given id and status label.
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            ..Self::default()
        }
    }

    /// Attach progress numbers.
    pub fn with_progress(mut self, current: u64, total: u64) -> Self {
        self.progress_detail = ProgressDetail { current, total };
        self
    }

    /// Attach an in-band error.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// The daemon's error message, if this event reports a failure.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .filter(|msg| !msg.is_empty())
            .or_else(|| {
                self.error_detail
                    .as_ref()
                    .map(|detail| detail.message.as_str())
                    .filter(|msg| !msg.is_empty())
            })
    }
}

/// Errors that end a pull session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullError {
    /// The daemon reported a failure inside the event stream.
    Daemon { id: String, message: String },
    /// A stream line was not a valid event record.
    Decode { line: String, reason: String },
    /// Reading the stream failed.
    Io(String),
}

impl fmt::Display for PullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daemon { id, message } if id.is_empty() => write!(f, "Pull failed: {}", message),
            Self::Daemon { id, message } => write!(f, "Pull failed on {}: {}", id, message),
            Self::Decode { line, reason } => write!(f, "Malformed pull event {:?}: {}", line, reason),
            Self::Io(msg) => write!(f, "Pull stream error: {}", msg),
        }
    }
}

impl std::error::Error for PullError {}

impl From<std::io::Error> for PullError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Decode one line of a newline-delimited JSON pull stream.
///
/// Blank lines yield `Ok(None)`.
pub fn decode_line(line: &str) -> Result<Option<PullEvent>, PullError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<PullEvent>(trimmed)
        .map(Some)
        .map_err(|e| PullError::Decode {
            line: trimmed.to_string(),
            reason: e.to_string(),
        })
}
