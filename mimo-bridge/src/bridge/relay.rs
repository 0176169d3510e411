//! The multiplexing relay loop.
//!
//! One task watches the three readable streams (upstream stdin, child stdout,
//! child stderr), the two writable ones (child stdin, upstream stdout) and a
//! periodic tick. Whichever becomes ready first is serviced; the tick bounds
//! every wait so child liveness is re-checked even when nothing is flowing.
//!
//! ```text
//!  upstream in ──▶ Inbound  ──(raw line + \n)──▶ queue ──▶ child stdin
//!  child stdout ─▶ Outbound ──(classify, trim + \n)──▶ queue ──▶ upstream out
//!  child stderr ─▶ diagnostics only
//! ```
//!
//! Handlers never wait on a write. Complete frames go into a [`WriteQueue`]
//! that is drained from its own `select!` branch, and a direction stops
//! reading while its queue is at `queue_limit`. A peer that stops reading
//! therefore pauses only the stream feeding it; interruption, the other
//! direction and stderr stay live.
//!
//! A stream that reaches end-of-input is dropped from the watched set and
//! never polled again. When the child exits, its remaining output is drained
//! for at most `drain_timeout` and whatever was queued upstream is written
//! before the loop returns.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use mimo_bridge_core::StreamDirection;
use mimo_bridge_core::classify::{Classification, LineClassifier};
use mimo_bridge_core::diagnostic::{DiagnosticEvent, Diagnostics};
use mimo_bridge_core::framing::{FramingError, Line, LineReassembler};

use crate::config::BridgeDefaults;
use crate::error::BridgeError;

use super::supervisor::ChildHandle;

// ─────────────────────────────────────────────────────────────────────────────
// Settings and outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for the relay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Longest single wait before child liveness is polled again.
    pub wait_ceiling: Duration,
    /// Bytes requested per read.
    pub chunk_size: usize,
    /// Lines longer than this are dropped in either direction.
    pub max_line_bytes: usize,
    /// Queued bytes per direction at which reading from the source pauses.
    pub queue_limit: usize,
    /// Upper bound on draining child output after the child exits.
    pub drain_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        let d = BridgeDefaults::default();
        Self {
            wait_ceiling: d.wait_ceiling,
            chunk_size: d.chunk_size,
            max_line_bytes: d.max_line_bytes,
            queue_limit: d.queue_limit,
            drain_timeout: d.drain_timeout,
        }
    }
}

/// Why the relay loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The child exited; its output has been drained.
    ChildExited { code: i32 },
    /// The interrupt future resolved. The child may still be running.
    Interrupted,
}

// ─────────────────────────────────────────────────────────────────────────────
// run_relay
// ─────────────────────────────────────────────────────────────────────────────

/// Relay between the upstream peer and a started child until the child exits
/// or `interrupt` resolves.
///
/// Takes the child's stdio streams out of `child`; the caller keeps ownership
/// of the process itself and is responsible for terminating it after an
/// [`RelayOutcome::Interrupted`] or an error.
///
/// # Errors
///
/// Returns [`BridgeError::Relay`] when reading upstream or writing upstream
/// fails, or when writing to the child fails with anything other than a
/// broken pipe.
pub async fn run_relay<R, W, S>(
    child: &mut ChildHandle,
    upstream_in: R,
    upstream_out: W,
    settings: &RelaySettings,
    classifier: &dyn LineClassifier,
    diag: &Diagnostics,
    interrupt: S,
) -> Result<RelayOutcome, BridgeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut inbound = Inbound::new(
        WriteQueue::new(child.take_stdin()?, settings.queue_limit),
        diag,
        settings.max_line_bytes,
    );
    let mut outbound = Outbound::new(
        WriteQueue::new(upstream_out, settings.queue_limit),
        classifier,
        diag,
        settings.max_line_bytes,
    );

    let mut upstream_in = Some(upstream_in);
    let mut child_stdout = Some(child.take_stdout()?);
    let mut child_stderr = Some(child.take_stderr()?);

    let mut in_buf = vec![0u8; settings.chunk_size];
    let mut out_buf = vec![0u8; settings.chunk_size];
    let mut err_buf = vec![0u8; settings.chunk_size];

    // Exit code and drain deadline, once the child is gone.
    let mut exited: Option<(i32, Instant)> = None;

    tokio::pin!(interrupt);

    loop {
        if exited.is_none() {
            if let Some(code) = child.poll()?.exit_code() {
                tracing::debug!(code, "child exited, draining its output");
                exited = Some((code, Instant::now() + settings.drain_timeout));
                upstream_in = None;
                inbound.close();
            }
        }
        if let Some((code, _)) = exited {
            if child_stdout.is_none() && child_stderr.is_none() && !outbound.queue.has_work() {
                diag.record(DiagnosticEvent::ChildExited { code });
                return Ok(RelayOutcome::ChildExited { code });
            }
        }
        let drain_deadline = exited.map(|(_, deadline)| deadline);
        let child_output_open = child_stdout.is_some() || child_stderr.is_some();

        tokio::select! {
            _ = &mut interrupt => {
                tracing::info!(
                    pending_upstream = outbound.queue.len(),
                    pending_child = inbound.queue.len(),
                    "interrupted, leaving relay loop"
                );
                diag.record(DiagnosticEvent::Interrupted);
                return Ok(RelayOutcome::Interrupted);
            }
            res = outbound.queue.write_some(), if outbound.queue.has_work() => {
                outbound.on_written(res)?;
            }
            res = inbound.queue.write_some(), if inbound.queue.has_work() => {
                inbound.on_written(res)?;
                if !inbound.queue.is_open() {
                    // Child input is closed; nothing more can be delivered.
                    upstream_in = None;
                }
            }
            res = read_opt(&mut child_stdout, &mut out_buf), if outbound.queue.has_room() => match res {
                Ok(0) => {
                    tracing::debug!("child stdout EOF");
                    child_stdout = None;
                    outbound.finish();
                }
                Ok(n) => outbound.on_chunk(&out_buf[..n]),
                Err(e) => {
                    return Err(BridgeError::Relay {
                        direction: StreamDirection::ChildToUpstream,
                        source: e,
                    });
                }
            },
            res = read_opt(&mut child_stderr, &mut err_buf) => match res {
                Ok(0) => {
                    tracing::debug!("child stderr EOF");
                    child_stderr = None;
                }
                Ok(n) => diag.record(DiagnosticEvent::Stderr {
                    text: String::from_utf8_lossy(&err_buf[..n]).into_owned(),
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "child stderr unreadable, ignoring it");
                    child_stderr = None;
                }
            },
            res = read_opt(&mut upstream_in, &mut in_buf), if inbound.queue.has_room() => match res {
                Ok(0) => {
                    upstream_in = None;
                    inbound.on_eof();
                }
                Ok(n) => inbound.on_chunk(&in_buf[..n]),
                Err(e) => {
                    return Err(BridgeError::Relay {
                        direction: StreamDirection::UpstreamToChild,
                        source: e,
                    });
                }
            },
            _ = sleep_until_opt(drain_deadline), if child_output_open => {
                // A grandchild holding the pipes open must not keep the bridge alive.
                tracing::warn!("child output still open after exit, giving up on it");
                if child_stdout.take().is_some() {
                    outbound.finish();
                }
                child_stderr = None;
            }
            _ = tokio::time::sleep(settings.wait_ceiling) => {}
        }
    }
}

/// Read from `stream`, or wait forever once it has been dropped.
async fn read_opt<T>(stream: &mut Option<T>, buf: &mut [u8]) -> io::Result<usize>
where
    T: AsyncRead + Unpin,
{
    match stream {
        Some(s) => s.read(buf).await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WriteQueue
// ─────────────────────────────────────────────────────────────────────────────

/// Bytes on their way to a writer that may be slower than the relay.
///
/// Whole frames are pushed synchronously and written out in pieces by
/// [`WriteQueue::write_some`]. A frame is never split by the queue itself,
/// so the peer always sees complete lines in order.
struct WriteQueue<W> {
    writer: Option<W>,
    pending: VecDeque<u8>,
    limit: usize,
    /// Bytes were written since the last flush.
    unflushed: bool,
    /// Drop the writer once `pending` is empty.
    closing: bool,
}

impl<W: AsyncWrite + Unpin> WriteQueue<W> {
    fn new(writer: W, limit: usize) -> Self {
        Self {
            writer: Some(writer),
            pending: VecDeque::new(),
            limit,
            unflushed: false,
            closing: false,
        }
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the source feeding this queue may be read again.
    fn has_room(&self) -> bool {
        self.is_open() && self.pending.len() < self.limit
    }

    /// Whether `write_some` has anything to do.
    fn has_work(&self) -> bool {
        self.is_open() && (!self.pending.is_empty() || self.unflushed)
    }

    fn push(&mut self, frame: &[u8]) {
        if self.is_open() {
            self.pending.extend(frame);
        }
    }

    /// Write as much of the queue as the writer takes in one call, then
    /// flush once the queue is empty.
    ///
    /// Cancel safe: written bytes leave the queue in the same poll that
    /// completes the write, and an interrupted flush is retried on the next
    /// call.
    async fn write_some(&mut self) -> io::Result<usize> {
        let Some(writer) = self.writer.as_mut() else {
            return std::future::pending().await;
        };
        let mut written = 0;
        if !self.pending.is_empty() {
            let (front, _) = self.pending.as_slices();
            written = writer.write(front).await?;
            if written == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            self.pending.drain(..written);
            self.unflushed = true;
        }
        if self.pending.is_empty() && self.unflushed {
            writer.flush().await?;
            self.unflushed = false;
        }
        Ok(written)
    }

    /// Close now if nothing is queued, otherwise once the queue drains.
    /// Returns `true` if the writer was dropped by this call.
    fn close_when_drained(&mut self) -> bool {
        self.closing = true;
        self.settle()
    }

    /// Finish a deferred close. Returns `true` if the writer was dropped.
    fn settle(&mut self) -> bool {
        if self.closing && !self.has_work() {
            self.close()
        } else {
            false
        }
    }

    /// Drop the writer and anything still queued. Returns `true` if it was
    /// open.
    fn close(&mut self) -> bool {
        self.pending.clear();
        self.unflushed = false;
        self.writer.take().is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream → child
// ─────────────────────────────────────────────────────────────────────────────

/// Upstream-to-child direction: reassemble lines and queue them for the child
/// verbatim. Blank lines are dropped.
struct Inbound<'a, C> {
    queue: WriteQueue<C>,
    diag: &'a Diagnostics,
    lines: LineReassembler,
}

impl<'a, C: AsyncWrite + Unpin> Inbound<'a, C> {
    fn new(queue: WriteQueue<C>, diag: &'a Diagnostics, max_line_bytes: usize) -> Self {
        Self {
            queue,
            diag,
            lines: LineReassembler::new(max_line_bytes),
        }
    }

    fn on_chunk(&mut self, chunk: &[u8]) {
        for item in self.lines.feed(chunk) {
            match item {
                Ok(line) => self.forward(line),
                Err(FramingError::LineTooLarge { max_bytes }) => {
                    tracing::warn!(max_bytes, "upstream line exceeded size limit, dropped");
                    self.diag.record(DiagnosticEvent::Oversized {
                        direction: StreamDirection::UpstreamToChild,
                        max_bytes,
                    });
                }
            }
        }
    }

    /// Upstream closed: queue any unterminated remainder, then close the
    /// child's stdin once everything queued has been written.
    fn on_eof(&mut self) {
        self.diag.record(DiagnosticEvent::InputEof);
        if let Some(line) = self.lines.finish() {
            self.forward(line);
        }
        if self.queue.close_when_drained() {
            self.diag.record(DiagnosticEvent::ChildInputClosed);
        }
    }

    fn forward(&mut self, line: Line) {
        if line.is_blank() {
            return;
        }
        if !self.queue.is_open() {
            tracing::debug!(len = line.len(), "child stdin closed, dropping upstream line");
            return;
        }

        self.diag.record(DiagnosticEvent::Inbound {
            line: line.text().into_owned(),
        });
        let mut frame = line.into_bytes();
        frame.push(b'\n');
        self.queue.push(&frame);
    }

    fn on_written(&mut self, res: io::Result<usize>) -> Result<(), BridgeError> {
        match res {
            Ok(_) => {
                if self.queue.settle() {
                    self.diag.record(DiagnosticEvent::ChildInputClosed);
                }
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::warn!(
                    dropped = self.queue.len(),
                    "child stdin broken pipe, closing child input"
                );
                self.close();
                Ok(())
            }
            Err(e) => Err(BridgeError::Relay {
                direction: StreamDirection::UpstreamToChild,
                source: e,
            }),
        }
    }

    fn close(&mut self) {
        if self.queue.close() {
            self.diag.record(DiagnosticEvent::ChildInputClosed);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Child → upstream
// ─────────────────────────────────────────────────────────────────────────────

/// Child-to-upstream direction: reassemble lines, classify them, queue
/// protocol lines trimmed and newline-terminated, record everything else.
struct Outbound<'a, W> {
    queue: WriteQueue<W>,
    classifier: &'a dyn LineClassifier,
    diag: &'a Diagnostics,
    lines: LineReassembler,
}

impl<'a, W: AsyncWrite + Unpin> Outbound<'a, W> {
    fn new(
        queue: WriteQueue<W>,
        classifier: &'a dyn LineClassifier,
        diag: &'a Diagnostics,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            queue,
            classifier,
            diag,
            lines: LineReassembler::new(max_line_bytes),
        }
    }

    fn on_chunk(&mut self, chunk: &[u8]) {
        self.diag
            .record(DiagnosticEvent::RawOutput { bytes: chunk.len() });
        for item in self.lines.feed(chunk) {
            match item {
                Ok(line) => self.emit(&line),
                Err(FramingError::LineTooLarge { max_bytes }) => {
                    tracing::warn!(max_bytes, "child line exceeded size limit, dropped");
                    self.diag.record(DiagnosticEvent::Oversized {
                        direction: StreamDirection::ChildToUpstream,
                        max_bytes,
                    });
                }
            }
        }
    }

    /// Classify and emit the unterminated remainder, if any.
    fn finish(&mut self) {
        if let Some(line) = self.lines.finish() {
            self.emit(&line);
        }
    }

    fn emit(&mut self, line: &Line) {
        let text = line.text();
        match self.classifier.classify(&text) {
            Classification::Forward => {
                let trimmed = text.trim();
                let mut frame = Vec::with_capacity(trimmed.len() + 1);
                frame.extend_from_slice(trimmed.as_bytes());
                frame.push(b'\n');
                self.queue.push(&frame);
                self.diag.record(DiagnosticEvent::Forwarded {
                    line: trimmed.to_string(),
                });
            }
            Classification::Suppress(reason) => {
                self.diag.record(DiagnosticEvent::Skipped {
                    line: text.trim_end().to_string(),
                    reason,
                });
            }
        }
    }

    fn on_written(&mut self, res: io::Result<usize>) -> Result<(), BridgeError> {
        res.map(|_| ()).map_err(|e| BridgeError::Relay {
            direction: StreamDirection::ChildToUpstream,
            source: e,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::DuplexStream;

    use mimo_bridge_core::classify::{PrefixClassifier, SuppressReason};
    use mimo_bridge_core::diagnostic::MemorySink;

    use super::*;

    fn memory_diag() -> (Arc<MemorySink>, Diagnostics) {
        let sink = Arc::new(MemorySink::new());
        (sink.clone(), Diagnostics::new(sink))
    }

    async fn read_all(mut reader: DuplexStream) -> Vec<u8> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        out
    }

    fn outbound<'a>(
        writer: DuplexStream,
        classifier: &'a PrefixClassifier,
        diag: &'a Diagnostics,
        max_line_bytes: usize,
    ) -> Outbound<'a, DuplexStream> {
        Outbound::new(WriteQueue::new(writer, 1 << 16), classifier, diag, max_line_bytes)
    }

    fn inbound(writer: DuplexStream, diag: &Diagnostics, limit: usize) -> Inbound<'_, DuplexStream> {
        Inbound::new(WriteQueue::new(writer, limit), diag, 1024)
    }

    async fn flush_outbound(out: &mut Outbound<'_, DuplexStream>) {
        while out.queue.has_work() {
            let res = out.queue.write_some().await;
            out.on_written(res).unwrap();
        }
    }

    async fn flush_inbound(inb: &mut Inbound<'_, DuplexStream>) {
        while inb.queue.has_work() {
            let res = inb.queue.write_some().await;
            inb.on_written(res).unwrap();
        }
    }

    #[test]
    fn test_relay_settings_default() {
        let s = RelaySettings::default();
        assert_eq!(s.wait_ceiling, Duration::from_secs(1));
        assert_eq!(s.chunk_size, 64 * 1024);
        assert_eq!(s.queue_limit, 1024 * 1024);
        assert_eq!(s.drain_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_outbound_forwards_split_protocol_line() {
        let (_sink, diag) = memory_diag();
        let classifier = PrefixClassifier::default();
        let (writer, reader) = tokio::io::duplex(4096);
        {
            let mut out = outbound(writer, &classifier, &diag, 1024);
            out.on_chunk(b"{\"jsonrpc\":\"2.0\",");
            assert!(!out.queue.has_work());
            out.on_chunk(b"\"id\":1,\"result\":{}}\n");
            flush_outbound(&mut out).await;
        }
        assert_eq!(
            read_all(reader).await,
            b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n"
        );
    }

    #[tokio::test]
    async fn test_outbound_suppresses_noise_and_trims() {
        let (sink, diag) = memory_diag();
        let classifier = PrefixClassifier::default();
        let (writer, reader) = tokio::io::duplex(4096);
        {
            let mut out = outbound(writer, &classifier, &diag, 1024);
            out.on_chunk(b"Compiling 3 files (.ex)\n{:ok, :started}\n\n   {\"id\":2,\"result\":null}  \r\n");
            flush_outbound(&mut out).await;
        }
        assert_eq!(read_all(reader).await, b"{\"id\":2,\"result\":null}\n");

        let events = sink.events();
        assert!(events.contains(&DiagnosticEvent::Skipped {
            line: "Compiling 3 files (.ex)".to_string(),
            reason: SuppressReason::Text,
        }));
        assert!(events.contains(&DiagnosticEvent::Skipped {
            line: "{:ok, :started}".to_string(),
            reason: SuppressReason::StructuredNoise,
        }));
        assert!(events.contains(&DiagnosticEvent::Skipped {
            line: String::new(),
            reason: SuppressReason::Empty,
        }));
        assert!(events.contains(&DiagnosticEvent::RawOutput { bytes: 70 }));
    }

    #[tokio::test]
    async fn test_outbound_finish_emits_partial() {
        let (_sink, diag) = memory_diag();
        let classifier = PrefixClassifier::default();
        let (writer, reader) = tokio::io::duplex(4096);
        {
            let mut out = outbound(writer, &classifier, &diag, 1024);
            out.on_chunk(b"{\"id\":8}");
            out.finish();
            // A second finish has nothing left to emit.
            out.finish();
            flush_outbound(&mut out).await;
        }
        assert_eq!(read_all(reader).await, b"{\"id\":8}\n");
    }

    #[tokio::test]
    async fn test_outbound_oversized_line_dropped() {
        let (sink, diag) = memory_diag();
        let classifier = PrefixClassifier::default();
        let (writer, reader) = tokio::io::duplex(4096);
        {
            let mut out = outbound(writer, &classifier, &diag, 8);
            out.on_chunk(b"{\"id\":1,\"result\":\"way too long\"}\n{\"id\":2}\n");
            flush_outbound(&mut out).await;
        }
        assert_eq!(read_all(reader).await, b"{\"id\":2}\n");
        assert!(sink.events().contains(&DiagnosticEvent::Oversized {
            direction: StreamDirection::ChildToUpstream,
            max_bytes: 8,
        }));
    }

    #[tokio::test]
    async fn test_outbound_write_error_is_fatal() {
        let (_sink, diag) = memory_diag();
        let classifier = PrefixClassifier::default();
        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);

        let mut out = outbound(writer, &classifier, &diag, 1024);
        out.on_chunk(b"{\"id\":1}\n");
        let res = out.queue.write_some().await;
        assert!(matches!(
            out.on_written(res),
            Err(BridgeError::Relay {
                direction: StreamDirection::ChildToUpstream,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_inbound_preserves_bytes_and_skips_blank() {
        let (sink, diag) = memory_diag();
        let (writer, reader) = tokio::io::duplex(4096);
        {
            let mut inb = inbound(writer, &diag, 1024);
            inb.on_chunk(b"  {\"id\":1}\n\n   \n{\"id\"");
            inb.on_chunk(b":2}\n");
            inb.on_eof();
            // Queued lines keep the child's stdin open until written.
            assert!(inb.queue.is_open());
            flush_inbound(&mut inb).await;
            assert!(!inb.queue.is_open());
        }
        assert_eq!(read_all(reader).await, b"  {\"id\":1}\n{\"id\":2}\n");
        let events = sink.events();
        assert_eq!(events.last(), Some(&DiagnosticEvent::ChildInputClosed));
        assert!(events.contains(&DiagnosticEvent::InputEof));
    }

    #[tokio::test]
    async fn test_inbound_eof_forwards_unterminated_remainder() {
        let (_sink, diag) = memory_diag();
        let (writer, reader) = tokio::io::duplex(4096);
        {
            let mut inb = inbound(writer, &diag, 1024);
            inb.on_chunk(b"{\"id\":9}");
            inb.on_eof();
            flush_inbound(&mut inb).await;
        }
        assert_eq!(read_all(reader).await, b"{\"id\":9}\n");
    }

    #[tokio::test]
    async fn test_inbound_eof_with_empty_queue_closes_at_once() {
        let (sink, diag) = memory_diag();
        let (writer, _reader) = tokio::io::duplex(64);
        let mut inb = inbound(writer, &diag, 1024);
        inb.on_eof();
        assert!(!inb.queue.is_open());
        assert_eq!(
            sink.events(),
            vec![DiagnosticEvent::InputEof, DiagnosticEvent::ChildInputClosed]
        );
    }

    #[tokio::test]
    async fn test_inbound_broken_pipe_closes_child_input() {
        let (sink, diag) = memory_diag();
        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);

        let mut inb = inbound(writer, &diag, 1024);
        inb.on_chunk(b"{\"id\":1}\n");
        flush_inbound(&mut inb).await;
        assert!(!inb.queue.is_open());
        assert!(!inb.queue.has_room());

        // Later lines are dropped without error.
        inb.on_chunk(b"{\"id\":2}\n");
        assert!(!inb.queue.has_work());
        let closed = sink
            .events()
            .iter()
            .filter(|e| **e == DiagnosticEvent::ChildInputClosed)
            .count();
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn test_inbound_queue_limit_pauses_reading() {
        let (_sink, diag) = memory_diag();
        let (writer, reader) = tokio::io::duplex(4096);
        let mut inb = inbound(writer, &diag, 16);

        assert!(inb.queue.has_room());
        inb.on_chunk(b"{\"id\":1,\"method\":\"ping\"}\n");
        assert!(!inb.queue.has_room());

        flush_inbound(&mut inb).await;
        assert!(inb.queue.has_room());
        drop(inb);
        assert_eq!(read_all(reader).await, b"{\"id\":1,\"method\":\"ping\"}\n");
    }

    #[tokio::test]
    async fn test_write_queue_keeps_remainder_when_reader_stalls() {
        let (writer, mut reader) = tokio::io::duplex(8);
        let mut queue = WriteQueue::new(writer, 1024);
        queue.push(b"0123456789abcdef\n");

        assert_eq!(queue.write_some().await.unwrap(), 8);
        assert_eq!(queue.len(), 9);

        // Nobody is reading: the next write waits instead of failing.
        let stalled = tokio::time::timeout(Duration::from_millis(50), queue.write_some()).await;
        assert!(stalled.is_err());
        assert_eq!(queue.len(), 9);

        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"01234567");
        while queue.has_work() {
            queue.write_some().await.unwrap();
        }
        drop(queue);
        assert_eq!(read_all(reader).await, b"89abcdef\n");
    }

    #[tokio::test]
    async fn test_read_opt_none_never_resolves() {
        let mut stream: Option<DuplexStream> = None;
        let mut buf = [0u8; 8];
        let res = tokio::time::timeout(
            Duration::from_millis(50),
            read_opt(&mut stream, &mut buf),
        )
        .await;
        assert!(res.is_err());
    }
}
