//! Connection wiring: socket, reader and writer tasks, bus and session.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::EventBus;
use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::message;
use crate::session::Session;
use crate::transport::{self, TransportError, TransportExit};

/// A running connection.
///
/// Owns the reader and writer tasks. The reader publishes everything it
/// receives on the session's bus; the writer drains the session's outgoing
/// queue.
#[derive(Debug)]
pub struct Client {
    session: Session,
    reader: JoinHandle<TransportExit>,
    writer: JoinHandle<Result<(), TransportError>>,
}

/// Open a TCP connection described by `config` and start a client on it.
///
/// See [`Client::start`] for the order in which things happen.
pub async fn connect<F>(config: ClientConfig, setup: F) -> anyhow::Result<Client>
where
    F: FnOnce(&Session),
{
    let address = config.address();
    let stream = TcpStream::connect(&address).await?;
    info!(%address, "connected");
    if config.transport.keepalive {
        if let Err(e) = transport::enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }
    }
    Ok(Client::start(stream, config, setup)?)
}

impl Client {
    /// Start a client over any byte stream.
    ///
    /// The decoder and session are attached to a fresh bus, `setup` runs so
    /// handlers can be registered before any line is read, and the
    /// registration lines from `config` are queued. Only then does the reader
    /// task start. Must be called from within a tokio runtime.
    pub fn start<S, F>(stream: S, config: ClientConfig, setup: F) -> Result<Client, SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        F: FnOnce(&Session),
    {
        let bus = EventBus::new();
        message::attach(&bus);
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(bus.clone(), tx, config.version.clone());

        setup(&session);
        session.autojoin(config.autojoin.iter().cloned())?;
        session.register(
            &config.nick,
            &config.user,
            &config.realname,
            config.password.as_deref(),
        )?;

        let (read_half, write_half) = tokio::io::split(stream);
        let writer = tokio::spawn(transport::write_loop(write_half, rx, bus.clone()));

        // The reader keeps the session alive for as long as lines can arrive.
        let keep = session.clone();
        let transport_config = config.transport.clone();
        let reader = tokio::spawn(async move {
            let exit = transport::read_loop(read_half, bus, transport_config).await;
            debug!(?exit, "reader finished");
            drop(keep);
            exit
        });

        Ok(Client {
            session,
            reader,
            writer,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Whether the reader task has stopped.
    pub fn is_finished(&self) -> bool {
        self.reader.is_finished()
    }

    /// Wait for the connection to end, then stop the writer.
    pub async fn wait(self) -> TransportExit {
        let exit = match self.reader.await {
            Ok(exit) => exit,
            Err(e) => TransportExit::Failed(TransportError::Task(e.to_string())),
        };
        self.writer.abort();
        exit
    }

    /// Send QUIT and wait for the server to close the connection.
    pub async fn quit(self, reason: Option<&str>) -> TransportExit {
        if let Err(e) = self.session.quit(reason) {
            warn!("could not send QUIT: {}", e);
        }
        self.wait().await
    }
}
