// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Terminal progress bars driven by tracker snapshots.

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pullwatch::{LayerId, LayerState, PullPhase};

const BAR_TEMPLATE: &str = "  {prefix:.bold} [{bar:30.cyan/blue}] {msg}";

/// Width of the short layer id shown next to each bar.
const PREFIX_WIDTH: usize = 12;

/// One bar per layer, created in first-seen order.
pub struct LayerBars {
    multi: MultiProgress,
    bars: HashMap<LayerId, ProgressBar>,
    show_completed: bool,
}

impl LayerBars {
    pub fn new(show_completed: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
            show_completed,
        }
    }

    /// Redraw from a tracker snapshot.
    pub fn update(&mut self, snapshot: &[(LayerId, LayerState)]) {
        for (id, state) in snapshot {
            if !self.bars.contains_key(id) {
                let bar = self.multi.add(new_bar(id));
                self.bars.insert(id.clone(), bar);
            }
            let Some(bar) = self.bars.get(id) else {
                continue;
            };

            if bar.is_finished() {
                continue;
            }

            let (current, total) = bar_position(state);
            bar.set_length(total.max(1));
            bar.set_position(current.min(total.max(1)));
            bar.set_message(describe(state));

            if state.phase_progress.is_completed() {
                if self.show_completed {
                    bar.finish();
                } else {
                    bar.finish_and_clear();
                }
            }
        }
    }

    /// Stop drawing, leaving finished bars in place.
    pub fn finish(&self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

fn new_bar(id: &LayerId) -> ProgressBar {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    let bar = ProgressBar::new(1).with_style(style);
    bar.set_prefix(short_id(id.as_str()).to_string());
    bar
}

/// Which counter the bar shows: download bytes until the transfer is done,
/// then phase progress (e.g. extraction).
fn bar_position(state: &LayerState) -> (u64, u64) {
    let counter = if state.phase <= PullPhase::DownloadComplete {
        state.download_progress
    } else {
        state.phase_progress
    };

    if counter.is_completed() {
        let total = counter.total.max(1);
        (total, total)
    } else {
        (counter.current, counter.total)
    }
}

fn describe(state: &LayerState) -> String {
    let dl = state.download_progress;
    match state.phase {
        PullPhase::Downloading if dl.total > 0 => format!(
            "{} {} / {}",
            state.phase,
            format_bytes(dl.current),
            format_bytes(dl.total)
        ),
        PullPhase::Extracting if state.phase_progress.total > 0 => format!(
            "{} {} / {}",
            state.phase,
            format_bytes(state.phase_progress.current),
            format_bytes(state.phase_progress.total)
        ),
        phase => phase.to_string(),
    }
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(PREFIX_WIDTH) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
