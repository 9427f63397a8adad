// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Image pull progress tracking.
//!
//! Consumes the JSON event stream a Docker or Podman daemon emits while
//! pulling an image and keeps per-layer progress that other threads can read
//! at any time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ daemon stream   │────▶│ PullSession     │────▶│ PullStatus      │
//! │ (NDJSON lines)  │     │ (owner, errors) │     │ (RwLock state)  │
//! └─────────────────┘     └─────────────────┘     └────────┬────────┘
//!                                                          │
//!                                                          ▼
//!                                                 ┌─────────────────┐
//!                                                 │ readers         │
//!                                                 │ layers/current  │
//!                                                 └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use pullwatch::pull::{PullPhase, PullSession};
//!
//! let stream = r#"{"status":"Pulling from library/alpine","id":"latest"}
//! {"status":"Downloading","progressDetail":{"current":50,"total":100},"id":"L1"}
//! {"status":"Pull complete","id":"L1"}
//! "#;
//!
//! let mut session = PullSession::new("alpine:latest");
//! let status = session.status();
//! session.consume_reader(Cursor::new(stream))?;
//!
//! assert!(status.complete());
//! assert_eq!(status.current("L1").phase, PullPhase::PullComplete);
//! # Ok::<(), pullwatch::pull::PullError>(())
//! ```

pub mod phase;
pub mod session;
pub mod status;
pub mod types;

// Re-export commonly used items
pub use phase::PullPhase;
pub use session::{decode_stream, PullSession};
pub use status::PullStatus;
pub use types::{
    decode_line, ErrorDetail, LayerId, LayerState, ProgressCounter, ProgressDetail, PullError,
    PullEvent, PullSummary,
};
