// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! pullwatch - per-layer progress for container image pulls
//!
//! Feeds the JSON event stream of a Docker or Podman image pull into a
//! thread-safe tracker that reports, for every layer, its current phase plus
//! phase and download progress.
//!
//! # Core Modules
//!
//! - [`pull`] - Event decoding, the status tracker, and the session driver
//! - [`config`] - User configuration
//! - [`error`] - Actionable error formatting for the CLI
//! - [`locks`] - Poison-recovering lock helpers

pub mod config;
pub mod error;
pub mod locks;
pub mod pull;

pub use config::Config;
pub use error::{explain_pull_error, ErrorBuilder};
pub use pull::{
    decode_line, decode_stream, LayerId, LayerState, ProgressCounter, PullError, PullEvent,
    PullPhase, PullSession, PullStatus, PullSummary,
};
