//! # slirc-events
//!
//! An evented IRC client engine. A connection's bytes are framed into lines,
//! decoded into messages and republished as a layered hierarchy of events:
//!
//! ```text
//! raw ─► irc + irc-<command> ─► message / pubmessage / privmessage
//!                              ├► notice / pubnotice / privnotice
//!                              ├► ctcp / ctcp-reply
//!                              ├► join / part / quit
//!                              ├► names / whois-result
//!                              └► registered
//! ```
//!
//! Application code registers handlers on a [`Session`] for the event types
//! it cares about and talks back through the session's outgoing helpers.
//!
//! ## Features
//!
//! - Line framing with lossy UTF-8 decoding and overlong-line recovery
//! - Ordered, synchronous publish/subscribe with per-handler fault isolation
//! - Removable, optionally filtered handler registrations
//! - ISUPPORT tracking and channel/private message classification
//! - Channel membership with on-demand NAMES refresh
//! - WHOIS lookups correlated to request handles
//! - Optional `serde` support for configuration and state types

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ```no_run
//! use slirc_events::{connect, event::kind, ClientConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ClientConfig::new("irc.libera.chat", 6667, "hugbot")
//!     .with_autojoin(["#hugbot"]);
//!
//! let client = connect(config, |session| {
//!     session.on(kind::PUBMESSAGE, |session, event| {
//!         let text = event.str("message")?;
//!         if let Some(target) = text.strip_prefix("!hug ") {
//!             session.action(event.str("to")?, &format!("hugs {}", target))?;
//!         }
//!         Ok(())
//!     });
//! })
//! .await?;
//!
//! client.wait().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Without a socket
//!
//! The session only needs a bus and an outgoing queue, which makes handlers
//! easy to drive directly:
//!
//! ```
//! use slirc_events::{message, Event, EventBus, Session};
//! use slirc_events::event::kind;
//!
//! let bus = EventBus::new();
//! message::attach(&bus);
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let session = Session::new(bus, tx, "demo 1.0");
//!
//! session.dispatch(Event::new(kind::RAW).with("line", "PING :tag123"));
//! assert_eq!(rx.try_recv().unwrap(), "PONG :tag123");
//! ```

pub mod bus;
pub mod casemap;
pub mod channel;
pub mod client;
pub mod config;
pub mod ctcp;
pub mod error;
pub mod event;
mod handlers;
pub mod isupport;
pub mod message;
pub mod response;
pub mod session;
pub mod state;
pub mod transport;
pub mod user;
pub mod util;

pub use self::bus::EventBus;
pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::channel::Channel;
pub use self::client::{connect, Client};
pub use self::config::{ClientConfig, TransportConfig};
pub use self::ctcp::Ctcp;
pub use self::error::{EventError, MessageParseError, ProtocolError, SessionError};
pub use self::event::{Event, Names, Value};
pub use self::isupport::{Capabilities, Capability};
pub use self::message::Message;
pub use self::response::Response;
pub use self::session::{HandlerId, Session};
pub use self::state::ConnectionState;
pub use self::transport::{LineCodec, TransportError, TransportExit};
pub use self::user::{User, WhoisRequest};
