// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Thread-safe per-layer pull status tracking.
//!
//! One producer feeds events through [`PullStatus::ingest`]; any number of
//! readers query copies of the state concurrently. All layer data lives in a
//! single `RwLock`-guarded aggregate, so a reader never sees a layer that is
//! half registered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::phase::PullPhase;
use super::types::{LayerId, LayerState, PullEvent, PullSummary};
use crate::locks::{resilient_read, resilient_write};

/// Whether the image-id pseudo-layer has been consumed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum SessionState {
    #[default]
    NotStarted,
    Started { image_id: LayerId },
}

#[derive(Debug, Default)]
struct Inner {
    session: SessionState,
    /// Insertion order is first-seen order.
    layers: IndexMap<LayerId, LayerState>,
}

/// Pull progress for every layer of one image pull session.
#[derive(Debug, Default)]
pub struct PullStatus {
    inner: RwLock<Inner>,
    complete: AtomicBool,
}

impl PullStatus {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event to the tracked state.
    ///
    /// Events without an id are ignored. The first id of the session names
    /// the image itself and is never tracked as a layer, including when it
    /// shows up again later in the stream. Unrecognized status labels are
    /// recorded as [`PullPhase::Unknown`].
    pub fn ingest(&self, event: &PullEvent) {
        if event.id.is_empty() {
            return;
        }

        let phase = PullPhase::classify(&event.status);
        let detail = event.progress_detail;

        let mut guard = resilient_write(&self.inner);
        let inner = &mut *guard;

        if inner.session == SessionState::NotStarted {
            debug!(image_id = %event.id, "pull session started");
            inner.session = SessionState::Started {
                image_id: LayerId::from(event.id.as_str()),
            };
            return;
        }
        if let SessionState::Started { image_id } = &inner.session {
            if image_id.as_str() == event.id {
                return;
            }
        }

        let state = inner
            .layers
            .entry(LayerId::from(event.id.as_str()))
            .or_insert_with(|| {
                debug!(layer = %event.id, "tracking new layer");
                LayerState::default()
            });

        if phase == PullPhase::Unknown {
            warn!(layer = %event.id, status = %event.status, "unrecognized pull status label");
        }
        if state.phase != phase {
            debug!(layer = %event.id, from = %state.phase, to = %phase, status = %event.status, "layer phase changed");
        }
        state.phase = phase;

        if phase.completes_phase() {
            state.phase_progress.mark_completed();
        } else {
            state.phase_progress.set(detail.current, detail.total);
        }

        if phase == PullPhase::Downloading {
            state.download_progress.set(detail.current, detail.total);
        } else if phase.completes_download() {
            // Final events often omit progressDetail entirely.
            let total = state.download_progress.total;
            state.download_progress.set(total, total);
            state.download_progress.mark_completed();
        }
    }

    /// Layer ids in first-seen order.
    pub fn layers(&self) -> Vec<LayerId> {
        resilient_read(&self.inner).layers.keys().cloned().collect()
    }

    /// Snapshot of one layer. Unknown ids yield the zero state.
    pub fn current(&self, layer: &str) -> LayerState {
        resilient_read(&self.inner)
            .layers
            .get(layer)
            .copied()
            .unwrap_or_default()
    }

    /// Every layer's state in first-seen order, read under one lock.
    pub fn snapshot(&self) -> Vec<(LayerId, LayerState)> {
        resilient_read(&self.inner)
            .layers
            .iter()
            .map(|(id, state)| (id.clone(), *state))
            .collect()
    }

    /// Aggregate counts across all layers.
    pub fn summary(&self) -> PullSummary {
        let inner = resilient_read(&self.inner);
        let mut summary = PullSummary {
            layers: inner.layers.len(),
            complete: self.complete(),
            ..PullSummary::default()
        };
        for state in inner.layers.values() {
            if state.phase_progress.is_completed() {
                summary.layers_done += 1;
            }
            summary.bytes_current = summary.bytes_current.saturating_add(state.download_progress.current);
            summary.bytes_total = summary.bytes_total.saturating_add(state.download_progress.total);
        }
        summary
    }

    /// The id consumed as the image id, once the session has started.
    pub fn image_id(&self) -> Option<LayerId> {
        match &resilient_read(&self.inner).session {
            SessionState::NotStarted => None,
            SessionState::Started { image_id } => Some(image_id.clone()),
        }
    }

    /// Whether the session owner has marked the pull complete.
    pub fn complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Mark the pull complete. Only the session owner should call this, once
    /// the event stream has ended without error. The flag is never cleared.
    pub fn mark_complete(&self) {
        if self.complete.swap(true, Ordering::AcqRel) {
            debug!("pull session already marked complete");
        }
    }
}
