//! Byte-stream transport: framing incoming lines onto the bus and writing
//! queued outgoing lines.
//!
//! [`read_loop`] publishes a `raw` event per line and ends with a
//! `disconnect` event. [`write_loop`] is the only writer of the socket; every
//! [`Session`](crate::Session) helper feeds it through an unbounded queue, so
//! lines never interleave.

pub mod codec;
pub mod error;

pub use self::codec::LineCodec;
pub use self::error::{TransportError, TransportExit};

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::SinkExt;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::codec::{Decoder, FramedWrite};
use tracing::{debug, error, trace, warn};

use crate::bus::EventBus;
use crate::config::{TransportConfig, DEFAULT_MAX_LINE_LEN};
use crate::event::{kind, Event};

/// Maximum IRC line length accepted by default.
pub const MAX_IRC_LINE_LEN: usize = DEFAULT_MAX_LINE_LEN;

const READ_CHUNK: usize = 4096;

/// Enable TCP keepalive probes on `stream`.
pub fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

/// Errors worth retrying after a pause.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn publish_line(bus: &EventBus, line: String) {
    trace!(%line, "<<");
    bus.publish(Event::new(kind::RAW).with("line", line));
}

fn transport_error(direction: &'static str, err: &dyn std::fmt::Display, attempt: u32) -> Event {
    Event::new(kind::TRANSPORT_ERROR)
        .with("direction", direction)
        .with("error", err.to_string())
        .with("attempt", i64::from(attempt))
}

fn disconnect(bus: &EventBus, reason: String) {
    debug!(%reason, "disconnect");
    bus.publish(Event::new(kind::DISCONNECT).with("reason", reason));
}

/// Read lines from `reader` and publish each as a `raw` event until the
/// stream ends or fails.
///
/// Transient read errors are retried with exponential back-off, up to
/// `config.max_read_retries` consecutive failures; each one publishes a
/// `transport-error` event. The loop always finishes by publishing
/// `disconnect`.
pub async fn read_loop<R>(mut reader: R, bus: EventBus, config: TransportConfig) -> TransportExit
where
    R: AsyncRead + Unpin,
{
    let mut codec = LineCodec::with_max_len(config.max_line_len);
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut failures: u32 = 0;

    loop {
        loop {
            match codec.decode(&mut buf) {
                Ok(Some(line)) => publish_line(&bus, line),
                Ok(None) => break,
                Err(e) => {
                    error!("line codec failed: {}", e);
                    disconnect(&bus, e.to_string());
                    return TransportExit::Failed(e.into());
                }
            }
        }

        buf.reserve(READ_CHUNK);
        match reader.read_buf(&mut buf).await {
            Ok(0) => {
                loop {
                    match codec.decode_eof(&mut buf) {
                        Ok(Some(line)) => publish_line(&bus, line),
                        Ok(None) => break,
                        Err(e) => {
                            warn!("discarding unterminated data: {}", e);
                            break;
                        }
                    }
                }
                disconnect(&bus, "connection closed by peer".to_string());
                return TransportExit::Closed;
            }
            Ok(_) => failures = 0,
            Err(e) if is_transient(&e) && failures < config.max_read_retries => {
                failures += 1;
                let delay = config.backoff(failures);
                warn!(attempt = failures, ?delay, "transient read error: {}", e);
                bus.publish(transport_error("read", &e, failures));
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                let attempts = failures + 1;
                error!(attempts, "read failed: {}", e);
                bus.publish(transport_error("read", &e, attempts));
                let err = TransportError::Read {
                    attempts,
                    source: e,
                };
                disconnect(&bus, err.to_string());
                return TransportExit::Failed(err);
            }
        }
    }
}

/// Write every line received on `lines` to `writer`, each terminated with
/// `\r\n`, until the queue closes or a write fails.
///
/// A failed write publishes a `transport-error` event and ends the task.
pub async fn write_loop<W>(
    writer: W,
    mut lines: UnboundedReceiver<String>,
    bus: EventBus,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(writer, LineCodec::new());
    while let Some(line) = lines.recv().await {
        trace!(%line, ">>");
        if let Err(e) = framed.send(line).await {
            error!("write failed: {}", e);
            bus.publish(transport_error("write", &e, 1));
            return Err(TransportError::Write(e));
        }
    }
    debug!("outgoing queue closed");
    framed.close().await.map_err(TransportError::Write)
}
