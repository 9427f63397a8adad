// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Actionable error messages for the command line.
//!
//! Failures are printed with a title, the likely causes, and numbered fixes.

use std::fmt;

use crate::pull::PullError;

/// Builder for a formatted error message.
///
/// ```
/// use pullwatch::error::ErrorBuilder;
///
/// let message = ErrorBuilder::new("Pull failed on a0d0a0d46f8b")
///     .cause("Registry rejected the credentials")
///     .fix("Log in again: docker login")
///     .build();
/// assert!(message.contains("1. Log in again"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBuilder {
    title: String,
    causes: Vec<String>,
    fixes: Vec<String>,
}

impl ErrorBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            causes: Vec::new(),
            fixes: Vec::new(),
        }
    }

    /// Add a possible cause.
    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a suggested fix.
    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fixes.push(fix.into());
        self
    }

    pub fn build(&self) -> String {
        let mut output = format!("[✗] {}\n", self.title);

        if !self.causes.is_empty() {
            output.push_str("\nPossible causes:\n");
            for cause in &self.causes {
                output.push_str(&format!("  - {}\n", cause));
            }
        }

        if !self.fixes.is_empty() {
            output.push_str("\nTry these fixes:\n");
            for (i, fix) in self.fixes.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, fix));
            }
        }

        output
    }
}

impl fmt::Display for ErrorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// Explain a failed pull session to the user.
pub fn explain_pull_error(err: &PullError) -> ErrorBuilder {
    match err {
        PullError::Daemon { message, .. } => {
            let lowered = message.to_lowercase();
            let builder = ErrorBuilder::new(err.to_string());
            if lowered.contains("unauthorized") || lowered.contains("denied") {
                builder
                    .cause("Registry requires authentication")
                    .cause("Image is private or does not exist")
                    .fix("Log in to the registry: docker login <registry>")
                    .fix("Check the image name and tag")
            } else if lowered.contains("manifest unknown") || lowered.contains("not found") {
                builder
                    .cause("Tag does not exist for this image")
                    .cause("Image is not built for this platform")
                    .fix("List available tags in the registry")
            } else {
                builder
                    .cause("Daemon aborted the pull")
                    .fix("Retry the pull and capture the stream again")
            }
        }
        PullError::Decode { .. } => ErrorBuilder::new(err.to_string())
            .cause("Input is not the daemon's JSON pull stream")
            .cause("Stream was captured through a proxy that rewrote it")
            .fix("Capture the raw API body, one JSON object per line"),
        PullError::Io(_) => ErrorBuilder::new(err.to_string())
            .cause("Input file is unreadable or the stream was cut off")
            .fix("Check the file path and permissions"),
    }
}
