//! Upstream relay.
//!
//! Each streaming request gets its own task that POSTs to the upstream,
//! splits the body into lines, and forwards them one at a time into a
//! channel backing the client's response body. Each line is its own body
//! frame, and the channel holds at most one pending line, so a slow client
//! slows the upstream reads down with it.

use std::time::{Duration, Instant};

use axum::body::Body;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use super::stream::{classify_line, LineAction, LineBuffer};
use super::types::StreamRequest;
use crate::error::{Error, Result};

/// Sending half of a client response body.
pub type LineSink = mpsc::Sender<std::result::Result<Bytes, std::io::Error>>;

/// Counters collected while relaying one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Lines written to the client.
    pub lines_forwarded: u64,
    /// Forwarded chunks with non-empty delta content.
    pub tokens: u64,
    /// Whether the `[DONE]` sentinel was seen.
    pub done_received: bool,
}

impl RelayStats {
    /// Throughput over `elapsed`. A zero duration yields infinity or NaN.
    pub fn tokens_per_sec(&self, elapsed: Duration) -> f64 {
        self.tokens as f64 / elapsed.as_secs_f64()
    }
}

/// Where a relay sends its request.
#[derive(Debug, Clone)]
pub struct RelayTarget {
    pub model: String,
    pub endpoint: String,
}

/// Start relaying `request` to `target` and return the client body.
///
/// The relay runs in a spawned task. The returned body ends when the relay
/// finishes, whether normally or not.
pub fn spawn_relay(client: Client, target: RelayTarget, request: StreamRequest) -> Body {
    let (tx, rx) = mpsc::channel(1);

    let span = tracing::info_span!(
        "relay",
        request_id = %uuid::Uuid::new_v4(),
        model = %target.model,
    );
    tokio::spawn(run_relay(client, target, request, tx).instrument(span));

    Body::from_stream(ReceiverStream::new(rx))
}

async fn run_relay(client: Client, target: RelayTarget, request: StreamRequest, sink: LineSink) {
    let response = match client.post(&target.endpoint).json(&request).send().await {
        Ok(response) => response,
        Err(e) => {
            let err = Error::UpstreamUnreachable(e);
            tracing::error!(
                error = %err,
                status = err.status().as_u16(),
                endpoint = %target.endpoint,
                "Failed to reach upstream"
            );
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = %status, "Upstream returned non-success status, relaying body as-is");
    }

    tracing::info!(model = %target.model, "Stream started");
    let start = Instant::now();
    let mut stats = RelayStats::default();

    let result = relay_lines(response.bytes_stream(), &sink, &mut stats).await;

    let elapsed = start.elapsed();
    tracing::info!(
        model = %target.model,
        duration_secs = elapsed.as_secs_f64(),
        tokens = stats.tokens,
        tokens_per_sec = stats.tokens_per_sec(elapsed),
        done = stats.done_received,
        "Stream completed"
    );

    match result {
        Ok(()) => {}
        Err(Error::ClientDisconnected) => {
            tracing::debug!(lines = stats.lines_forwarded, "Client went away mid-stream");
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                status = e.status().as_u16(),
                lines = stats.lines_forwarded,
                "Streaming error"
            );
        }
    }
}

/// Forward upstream lines into `sink` until EOF, the sentinel, or an error.
///
/// Nothing is read from `upstream` after the sentinel line.
pub async fn relay_lines<S, E>(upstream: S, sink: &LineSink, stats: &mut RelayStats) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    futures::pin_mut!(upstream);
    let mut buffer = LineBuffer::new();

    while let Some(chunk) = upstream.next().await {
        let chunk = chunk.map_err(|e| Error::UpstreamRead(e.to_string()))?;
        for line in buffer.push(&chunk) {
            if !handle_line(line, sink, stats).await? {
                return Ok(());
            }
        }
    }

    if let Some(line) = buffer.finish() {
        handle_line(line, sink, stats).await?;
    }

    Ok(())
}

/// Apply the line rules to one line. Returns false once reading should stop.
async fn handle_line(line: Vec<u8>, sink: &LineSink, stats: &mut RelayStats) -> Result<bool> {
    match classify_line(&line) {
        LineAction::Skip => Ok(true),
        LineAction::Forward { content } => {
            forward(line, sink).await?;
            stats.lines_forwarded += 1;
            if content {
                stats.tokens += 1;
            }
            Ok(true)
        }
        LineAction::Finish => {
            forward(line, sink).await?;
            stats.lines_forwarded += 1;
            stats.done_received = true;
            Ok(false)
        }
    }
}

async fn forward(mut line: Vec<u8>, sink: &LineSink) -> Result<()> {
    line.push(b'\n');
    sink.send(Ok(Bytes::from(line)))
        .await
        .map_err(|_| Error::ClientDisconnected)
}
