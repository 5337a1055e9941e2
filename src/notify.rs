//! Server-sent notification stream.
//!
//! `GET /api/notification/` stays open and emits one SSE event per
//! notification. Each event's `data:` payload is a JSON object. The stream
//! is not resumable: after a disconnect the caller has to call
//! [`QuickPin::listen`] again and events sent in between are lost.

use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::client::QuickPin;
use crate::error::{check_status, Result};
use crate::models::Notification;

pub(crate) const NOTIFICATION_PATH: &str = "api/notification/";

/// Largest incomplete event kept in memory. Anything bigger is dropped up
/// to the next blank line.
pub(crate) const MAX_EVENT_BYTES: usize = 1 << 20;

/// Incremental SSE parser. Feed raw bytes, get back the `data` of each
/// complete event.
///
/// `\r\n`, `\r` and `\n` are all line terminators, including a `\r\n` pair
/// split across two reads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    after_cr: bool,
    skipping: bool,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        for &b in bytes {
            match b {
                b'\r' => {
                    self.buffer.push(b'\n');
                    self.after_cr = true;
                }
                b'\n' if self.after_cr => self.after_cr = false,
                _ => {
                    self.buffer.push(b);
                    self.after_cr = false;
                }
            }
        }

        let mut events = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if self.skipping {
                self.skipping = false;
                continue;
            }
            let text = String::from_utf8_lossy(&raw[..end]);
            if let Some(data) = event_data(&text) {
                events.push(data);
            }
        }

        if self.buffer.len() > MAX_EVENT_BYTES {
            if !self.skipping {
                warn!(limit = MAX_EVENT_BYTES, "dropping oversized notification event");
            }
            let ends_with_newline = self.buffer.last() == Some(&b'\n');
            self.buffer.clear();
            if ends_with_newline {
                self.buffer.push(b'\n');
            }
            self.skipping = true;
        }
        events
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Join the `data` lines of one event. Comments and other fields are ignored.
fn event_data(event: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in event.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        if field == "data" {
            lines.push(value);
        }
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Open notification stream. Obtain one from [`QuickPin::listen`].
pub struct NotificationStream {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl NotificationStream {
    /// Wait for the next notification.
    ///
    /// Returns `None` when the server closes the stream. A transport failure
    /// comes back once as `Some(Err(QpiError::Connection(..)))`, after which
    /// the stream is finished. An event whose data is not JSON comes back as
    /// `Some(Err(QpiError::Decode(..)))` and the stream stays usable.
    pub async fn next(&mut self) -> Option<Result<Notification>> {
        loop {
            if let Some(data) = self.pending.pop_front() {
                return Some(serde_json::from_str(&data).map_err(Into::into));
            }
            if self.done {
                return None;
            }
            match self.body.next().await {
                Some(Ok(bytes)) => {
                    let events = self.decoder.push(&bytes);
                    debug!(bytes = bytes.len(), events = events.len(), "notification chunk");
                    self.pending.extend(events);
                }
                Some(Err(e)) => {
                    warn!(error = %e, "notification stream broke");
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    info!("notification stream closed by server");
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

impl QuickPin {
    /// Open the notification stream.
    pub async fn listen(&self) -> Result<NotificationStream> {
        let url = self.endpoint(NOTIFICATION_PATH)?;
        info!(%url, "listening for notifications");

        let response = self
            .stream_http()
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();

        Ok(NotificationStream {
            body,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        })
    }
}
