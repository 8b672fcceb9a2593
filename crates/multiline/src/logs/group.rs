//! Multiline collector — folds a stream of raw lines into logical messages.
//!
//! Built for live log streams:
//! - Groups Python/Java/JS stack traces with the line that introduced them
//! - Keeps chained exceptions ("The above exception was...") in one message
//! - Holds unclosed `{`/`[`/`(` spans open until they balance
//! - Flushes a pending message after a quiet period (inactivity timeout)
//! - Caps every message at a byte limit, cut on a char boundary
//!
//! One task per collector owns the buffer; `add` only queues.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::conf::CollectorConfig;

use super::buffer::Buffer;
use super::classify::{classify, Decision};
use super::model::{LogEntry, Message};

/// Output capacity used by [`MultilineCollector::new`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Cloneable producer handle. Dropping every handle (the collector's own
/// included) flushes the pending message and stops the collector.
#[derive(Debug, Clone)]
pub struct EntrySender {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl EntrySender {
    /// Queue one line. Never blocks; lines sent after shutdown are dropped.
    pub fn add(&self, entry: LogEntry) {
        if self.tx.send(entry).is_err() {
            tracing::trace!("multiline: collector stopped, dropping entry");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct MultilineCollector {
    entries: EntrySender,
    messages: mpsc::Receiver<Message>,
    timeout: Duration,
    size_limit: usize,
}

impl MultilineCollector {
    /// Spawn a collector on the current tokio runtime.
    pub fn new(cancel: CancellationToken, timeout: Duration, size_limit: usize) -> Self {
        Self::spawn(cancel, timeout, size_limit, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn from_config(cancel: CancellationToken, config: &CollectorConfig) -> Self {
        Self::spawn(
            cancel,
            Duration::from_millis(config.timeout_ms),
            config.size_limit,
            config.channel_capacity,
        )
    }

    fn spawn(cancel: CancellationToken, timeout: Duration, size_limit: usize, capacity: usize) -> Self {
        let (entry_tx, entry_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::channel(capacity.max(1));

        let worker = Worker {
            entries: entry_rx,
            messages: message_tx,
            cancel,
            timeout,
            size_limit,
            buffer: None,
            deadline: None,
        };
        tokio::spawn(worker.run());

        Self {
            entries: EntrySender { tx: entry_tx },
            messages: message_rx,
            timeout,
            size_limit,
        }
    }

    pub fn add(&self, entry: LogEntry) {
        self.entries.add(entry);
    }

    pub fn sender(&self) -> EntrySender {
        self.entries.clone()
    }

    /// Next assembled message; `None` once the collector has stopped and
    /// every emitted message has been read.
    pub async fn next_message(&mut self) -> Option<Message> {
        self.messages.recv().await
    }

    /// Consume the collector into a message stream. The collector's own
    /// sender is dropped, so take a [`sender`](Self::sender) first if more
    /// lines are coming.
    pub fn into_stream(self) -> ReceiverStream<Message> {
        ReceiverStream::new(self.messages)
    }

    pub fn into_parts(self) -> (EntrySender, mpsc::Receiver<Message>) {
        (self.entries, self.messages)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn size_limit(&self) -> usize {
        self.size_limit
    }
}

#[derive(Debug, Clone, Copy)]
enum FlushReason {
    Boundary,
    Timeout,
    Closed,
}

impl FlushReason {
    fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Boundary => "boundary",
            FlushReason::Timeout => "timeout",
            FlushReason::Closed => "closed",
        }
    }
}

struct Worker {
    entries: mpsc::UnboundedReceiver<LogEntry>,
    messages: mpsc::Sender<Message>,
    cancel: CancellationToken,
    timeout: Duration,
    size_limit: usize,
    buffer: Option<Buffer>,
    /// Set only while a buffer is open.
    deadline: Option<Instant>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let armed = self.deadline.is_some();
            let deadline = self.deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    tracing::debug!(pending = self.buffer.is_some(), "multiline: cancelled, stopping collector");
                    return;
                }

                entry = self.entries.recv() => match entry {
                    Some(entry) => {
                        if !self.process(entry).await {
                            return;
                        }
                    }
                    None => {
                        self.flush(FlushReason::Closed).await;
                        tracing::debug!("multiline: input closed, stopping collector");
                        return;
                    }
                },

                _ = tokio::time::sleep_until(deadline), if armed => {
                    tracing::debug!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "multiline: timeout expired, flushing pending message"
                    );
                    if !self.flush(FlushReason::Timeout).await {
                        return;
                    }
                }
            }
        }
    }

    /// Returns false once the collector should stop.
    async fn process(&mut self, entry: LogEntry) -> bool {
        let decision = classify(self.buffer.as_ref(), &entry.content);
        tracing::trace!(rule = ?decision.rule(), start = decision.is_start(), "multiline: classified line");

        let mut running = true;
        match (decision, self.buffer.as_mut()) {
            (Decision::Continue(_), Some(buffer)) => buffer.append(entry),
            _ => {
                if self.buffer.is_some() {
                    running = self.flush(FlushReason::Boundary).await;
                }
                self.buffer = Some(Buffer::start(entry, self.size_limit));
            }
        }

        self.deadline = Some(Instant::now() + self.timeout);
        running
    }

    async fn flush(&mut self, reason: FlushReason) -> bool {
        self.deadline = None;
        let Some(buffer) = self.buffer.take() else {
            return true;
        };

        let message = buffer.flush();
        tracing::debug!(
            reason = reason.as_str(),
            lines = message.line_count,
            bytes = message.content.len(),
            truncated = message.truncated,
            "multiline: flushing message"
        );
        self.emit(message).await
    }

    async fn emit(&mut self, message: Message) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.messages.send(message) => {
                if sent.is_err() {
                    tracing::debug!("multiline: message receiver dropped, stopping collector");
                }
                sent.is_ok()
            }
        }
    }
}
