//! End-to-end tests: a client talking to a scripted server over an
//! in-memory duplex stream.
//!
//! Run with: `cargo test --test client_duplex`

use std::time::Duration;

use slirc_events::event::kind;
use slirc_events::{Client, ClientConfig, TransportConfig};
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::sync::mpsc;
use tokio::time::timeout;

const STEP: Duration = Duration::from_secs(5);

struct Server {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Server {
    fn new(io: DuplexStream) -> Self {
        let (read, writer) = tokio::io::split(io);
        Server {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn expect(&mut self, expected: &str) {
        let line = timeout(STEP, self.lines.next_line())
            .await
            .expect("timed out waiting for client line")
            .expect("read failed")
            .expect("client closed the connection");
        assert_eq!(line, expected);
    }

    async fn send(&mut self, data: &[u8]) {
        self.writer.write_all(data).await.expect("write failed");
    }

    async fn hang_up(&mut self) {
        self.writer.shutdown().await.expect("shutdown failed");
    }
}

fn config() -> ClientConfig {
    ClientConfig::new("test.invalid", 6667, "hugbot")
        .with_realname("Hug Bot")
        .with_autojoin(["#hugs"])
        .with_version("hugbot 0.1")
}

#[tokio::test]
async fn test_registration_autojoin_and_ping() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let mut server = Server::new(server_io);
    let client = Client::start(client_io, config().with_password("hunter2"), |_| {}).unwrap();

    server.expect("PASS hunter2").await;
    server.expect("USER hugbot . . :Hug Bot").await;
    server.expect("NICK hugbot").await;

    server
        .send(b":irc.test 001 hugbot :Welcome\r\nPING :abc\r\n")
        .await;
    server.expect("JOIN #hugs").await;
    server.expect("PONG :abc").await;
    assert!(client.session().is_registered());

    server.hang_up().await;
    let exit = timeout(STEP, client.wait()).await.unwrap();
    assert!(exit.is_closed());
}

#[tokio::test]
async fn test_handlers_see_messages_split_across_writes() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let mut server = Server::new(server_io);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let client = Client::start(client_io, config(), move |session| {
        session.on(kind::PUBMESSAGE, move |session, event| {
            let text = event.str("message")?.to_string();
            if text == "!hug" {
                let from = event.user("from")?;
                session.action(event.str("to")?, &format!("hugs {}", from.nick))?;
            }
            tx.send(text)?;
            Ok(())
        });
    })
    .unwrap();
    server.expect("USER hugbot . . :Hug Bot").await;
    server.expect("NICK hugbot").await;

    server.send(b":dan!d@localhost PRIVMSG #hugs :hel").await;
    server.send(b"lo\r\n:dan!d@localhost PRIV").await;
    server.send(b"MSG #hugs :!hug\r\n").await;

    assert_eq!(timeout(STEP, rx.recv()).await.unwrap().unwrap(), "hello");
    assert_eq!(timeout(STEP, rx.recv()).await.unwrap().unwrap(), "!hug");
    server.expect("PRIVMSG #hugs :\x01ACTION hugs dan\x01").await;

    server.hang_up().await;
    timeout(STEP, client.wait()).await.unwrap();
}

#[tokio::test]
async fn test_eof_delivers_remainder_then_disconnect() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let mut server = Server::new(server_io);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let client = Client::start(client_io, config(), move |session| {
        for tag in [kind::RAW, kind::DISCONNECT] {
            let tx = tx.clone();
            session.on(tag, move |_, event| {
                tx.send(event.kind().to_string())?;
                Ok(())
            });
        }
    })
    .unwrap();

    server.send(b"PING :last").await;
    server.hang_up().await;

    let exit = timeout(STEP, client.wait()).await.unwrap();
    assert!(exit.is_closed());

    let mut seen = Vec::new();
    while let Ok(tag) = rx.try_recv() {
        seen.push(tag);
    }
    assert_eq!(seen, vec!["raw", "disconnect"]);
}

#[tokio::test]
async fn test_overlong_line_is_dropped_and_reading_continues() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let mut server = Server::new(server_io);
    let transport = TransportConfig::default().with_max_line_len(64);
    let client = Client::start(client_io, config().with_transport(transport), |_| {}).unwrap();
    server.expect("USER hugbot . . :Hug Bot").await;
    server.expect("NICK hugbot").await;

    let long = format!(":dan!d@localhost PRIVMSG #hugs :{}\r\n", "x".repeat(200));
    server.send(long.as_bytes()).await;
    server.send(b"PING :still-here\r\n").await;
    server.expect("PONG :still-here").await;
    assert!(!client.is_finished());

    server.hang_up().await;
    timeout(STEP, client.wait()).await.unwrap();
}

#[tokio::test]
async fn test_ctcp_version_over_the_wire() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let mut server = Server::new(server_io);
    let client = Client::start(client_io, config(), |_| {}).unwrap();
    server.expect("USER hugbot . . :Hug Bot").await;
    server.expect("NICK hugbot").await;

    server
        .send(b":dan!d@localhost PRIVMSG hugbot :\x01VERSION\x01\r\n")
        .await;
    server.expect("NOTICE dan :\x01VERSION hugbot 0.1\x01").await;

    server.hang_up().await;
    timeout(STEP, client.wait()).await.unwrap();
}
