// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Layer pull phases and status-label classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of a single layer's pull.
///
/// Variant order is significant: the tracker compares phases against
/// [`PullPhase::DownloadComplete`] and [`PullPhase::AlreadyExists`] to decide
/// when a counter is finished.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PullPhase {
    /// Status label not recognized
    #[default]
    Unknown = 0,
    /// Queued behind another layer
    Waiting = 1,
    /// Layer announced, transfer not started
    PullingFilesystem = 2,
    /// Bytes are being transferred
    Downloading = 3,
    /// Transfer finished
    DownloadComplete = 4,
    /// Unpacking onto the filesystem
    Extracting = 5,
    /// Digest verification
    VerifyingChecksum = 6,
    /// Layer was already present locally
    AlreadyExists = 7,
    /// Layer fully pulled
    PullComplete = 8,
}

/// Status label table as emitted by the daemon.
const STATUS_LABELS: [(&str, PullPhase); 8] = [
    ("Waiting", PullPhase::Waiting),
    ("Pulling fs layer", PullPhase::PullingFilesystem),
    ("Downloading", PullPhase::Downloading),
    ("Download complete", PullPhase::DownloadComplete),
    ("Extracting", PullPhase::Extracting),
    ("Verifying Checksum", PullPhase::VerifyingChecksum),
    ("Already exists", PullPhase::AlreadyExists),
    ("Pull complete", PullPhase::PullComplete),
];

impl PullPhase {
    /// Classify a daemon status label.
    ///
    /// Matching is exact and case-sensitive. Anything outside the table is
    /// [`PullPhase::Unknown`].
    pub fn classify(status: &str) -> Self {
        STATUS_LABELS
            .iter()
            .find(|(label, _)| *label == status)
            .map(|(_, phase)| *phase)
            .unwrap_or(PullPhase::Unknown)
    }

    /// The daemon label for this phase, or `None` for [`PullPhase::Unknown`].
    pub fn label(&self) -> Option<&'static str> {
        STATUS_LABELS
            .iter()
            .find(|(_, phase)| phase == self)
            .map(|(label, _)| *label)
    }

    /// Returns true once the phase-progress counter is considered finished.
    pub fn completes_phase(&self) -> bool {
        *self >= PullPhase::AlreadyExists
    }

    /// Returns true once the byte-download counter is considered finished.
    pub fn completes_download(&self) -> bool {
        *self >= PullPhase::DownloadComplete
    }
}

impl fmt::Display for PullPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().unwrap_or("Unknown"))
    }
}
