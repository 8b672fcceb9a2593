//! Serve — pump stdin lines through a collector and write JSON lines to stdout.

use std::io;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::{LinesStream, ReceiverStream};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::conf::CollectorConfig;
use crate::logs::{EntrySender, Level, LogEntry, MultilineCollector};
use crate::runtime::stop::shutdown_signal;

/// Run the collector over stdin/stdout until EOF or a shutdown signal.
pub async fn serve(config: CollectorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let collector = MultilineCollector::from_config(cancel.clone(), &config);

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let mut stdout = tokio::io::stdout();
    let written = pipe(tokio::io::stdin(), &mut stdout, collector, cancel).await?;

    info!("Collector stopped after {} messages", written);
    Ok(())
}

/// Feed every line of `reader` into `collector` and write each emitted
/// message to `writer` as one JSON object per line.
///
/// Returns once the collector stops: on EOF (after the pending message is
/// flushed) or on cancellation.
pub async fn pipe<R, W>(
    reader: R,
    writer: &mut W,
    collector: MultilineCollector,
    cancel: CancellationToken,
) -> io::Result<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let (sender, messages) = collector.into_parts();
    let reader_task = tokio::spawn(pump(reader, sender, cancel));

    let mut messages = ReceiverStream::new(messages);
    let mut written = 0;
    while let Some(message) = messages.next().await {
        let mut line = serde_json::to_vec(&message).map_err(io::Error::other)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        written += 1;
    }

    match reader_task.await {
        Ok(Ok(lines)) => debug!("Read {} lines", lines),
        Ok(Err(e)) => return Err(e),
        Err(e) => return Err(io::Error::other(e)),
    }
    Ok(written)
}

/// Stamp and queue each input line; the sender is dropped on return.
async fn pump<R>(reader: R, sender: EntrySender, cancel: CancellationToken) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = LinesStream::new(BufReader::new(reader).lines());
    let mut count = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    let level = Level::from_line(&line);
                    sender.add(LogEntry::new(Utc::now(), line, level));
                    count += 1;
                }
                Some(Err(e)) => return Err(e),
                None => break,
            },
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn collector(cancel: &CancellationToken) -> MultilineCollector {
        MultilineCollector::new(cancel.clone(), Duration::from_secs(60), 64 * 1024)
    }

    #[tokio::test]
    async fn test_pipe_writes_json_lines() {
        let input: &'static [u8] =
            b"ERROR boom\n    at main.rs:10\nINFO recovered\n";
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        let written = pipe(input, &mut out, collector(&cancel), cancel).await.unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let records: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["content"], "ERROR boom\n    at main.rs:10");
        assert_eq!(records[0]["level"], "error");
        assert_eq!(records[0]["line_count"], 2);
        assert_eq!(records[0]["truncated"], false);
        assert_eq!(records[1]["content"], "INFO recovered");
        assert_eq!(records[1]["level"], "info");
        assert!(records[1]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_pipe_strips_crlf() {
        let input: &'static [u8] = b"WARN disk low\r\n";
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        pipe(input, &mut out, collector(&cancel), cancel).await.unwrap();
        let record: serde_json::Value = serde_json::from_slice(out.trim_ascii_end()).unwrap();
        assert_eq!(record["content"], "WARN disk low");
        assert_eq!(record["level"], "warning");
    }

    #[tokio::test]
    async fn test_pipe_empty_input() {
        let input: &'static [u8] = b"";
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        let written = pipe(input, &mut out, collector(&cancel), cancel).await.unwrap();
        assert_eq!(written, 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_pipe_stops_on_cancel() {
        // Reader that never reaches EOF.
        let (_keep_open, reader) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let collector = collector(&cancel);
                pipe(reader, &mut out, collector, cancel).await
            })
        };
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(result.unwrap(), 0);
    }
}
