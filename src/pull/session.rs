// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pull session driver.
//!
//! A [`PullSession`] owns the tracker for one image pull. It feeds decoded
//! events into the tracker in delivery order and decides how the session
//! ends: a daemon error inside the stream aborts it, and only a stream that
//! ends cleanly marks the tracker complete.

use std::io::BufRead;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::{future, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::LinesStream;
use tracing::{info, warn};

use super::status::PullStatus;
use super::types::{decode_line, PullError, PullEvent};

/// Decode an async newline-delimited JSON pull stream into events.
///
/// Blank lines are skipped. Malformed lines and read failures surface as
/// `Err` items.
pub fn decode_stream<R>(reader: R) -> impl Stream<Item = Result<PullEvent, PullError>>
where
    R: AsyncBufRead + Unpin,
{
    LinesStream::new(reader.lines()).filter_map(|line| {
        future::ready(match line {
            Ok(line) => decode_line(&line).transpose(),
            Err(e) => Some(Err(PullError::from(e))),
        })
    })
}

/// Owner of one image pull session.
#[derive(Debug)]
pub struct PullSession {
    image: String,
    status: Arc<PullStatus>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl PullSession {
    /// Start a session for the given image reference.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            status: Arc::new(PullStatus::new()),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// The image reference being pulled.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Shared handle for readers of the tracked state.
    pub fn status(&self) -> Arc<PullStatus> {
        Arc::clone(&self.status)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the stream ended cleanly, if it has.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Time from session start to clean finish, or to now while running.
    pub fn elapsed(&self) -> Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Feed one event to the tracker.
    ///
    /// Events reporting a daemon error are not ingested; the error is
    /// returned so the caller can abort the pull.
    pub fn handle_event(&self, event: &PullEvent) -> Result<(), PullError> {
        if let Some(message) = event.error_message() {
            warn!(image = %self.image, layer = %event.id, error = %message, "daemon reported pull failure");
            return Err(PullError::Daemon {
                id: event.id.clone(),
                message: message.to_string(),
            });
        }

        self.status.ingest(event);
        Ok(())
    }

    /// Consume a blocking newline-delimited JSON stream to its end.
    ///
    /// The tracker is marked complete only if every line decoded and no
    /// event carried an error.
    pub fn consume_reader<R: BufRead>(&mut self, reader: R) -> Result<(), PullError> {
        for line in reader.lines() {
            let line = line?;
            if let Some(event) = decode_line(&line)? {
                self.handle_event(&event)?;
            }
        }

        self.finish();
        Ok(())
    }

    /// Consume an async event stream to its end.
    ///
    /// Same completion contract as [`PullSession::consume_reader`].
    pub async fn consume_stream<S>(&mut self, stream: S) -> Result<(), PullError>
    where
        S: Stream<Item = Result<PullEvent, PullError>>,
    {
        futures_util::pin_mut!(stream);

        while let Some(item) = stream.next().await {
            let event = item?;
            self.handle_event(&event)?;
        }

        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.finished_at = Some(now);
        self.status.mark_complete();

        let summary = self.status.summary();
        info!(
            image = %self.image,
            layers = summary.layers,
            bytes = summary.bytes_total,
            elapsed_ms = (now - self.started_at).num_milliseconds(),
            "pull session complete"
        );
    }
}
