//! Decoded IRC messages and the bus adapter that publishes them.
//!
//! [`attach`] subscribes a decoder to an [`EventBus`]. For every `raw` event
//! it publishes an `irc` event carrying the whole message, followed by an
//! `irc-<command>` event (for example `irc-privmsg` or `irc-353`) carrying the
//! prefix and arguments. Lines that do not decode produce a `parse-error`
//! event instead.

mod nom_parser;

pub use self::nom_parser::ParsedLine;

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::bus::EventBus;
use crate::error::{EventError, MessageParseError, ProtocolError};
use crate::event::{irc_kind, kind, Event};

/// A decoded IRC line.
///
/// The trailing parameter, when present, is always the last element of
/// `args`; argument order matches the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message source; empty when the line had no prefix.
    pub prefix: String,
    /// Uppercased command or three-digit numeric.
    pub command: String,
    /// Middle arguments followed by the trailing argument.
    pub args: Vec<String>,
}

impl Message {
    /// Decode a raw protocol line.
    ///
    /// # Example
    ///
    /// ```
    /// use slirc_events::Message;
    ///
    /// let msg = Message::decode(":a!b@c PRIVMSG #chan :hello there").unwrap();
    /// assert_eq!(msg.prefix, "a!b@c");
    /// assert_eq!(msg.command, "PRIVMSG");
    /// assert_eq!(msg.args, vec!["#chan", "hello there"]);
    /// ```
    pub fn decode(line: &str) -> Result<Self, MessageParseError> {
        let parsed = ParsedLine::parse(line)?;
        Ok(Message {
            prefix: parsed.prefix.to_string(),
            command: parsed.command.to_ascii_uppercase(),
            args: parsed.args.into_iter().map(str::to_string).collect(),
        })
    }

    /// True when the message carried no prefix.
    pub fn is_from_server(&self) -> bool {
        self.prefix.is_empty()
    }

    /// The `irc-<command>` tag for this message.
    pub fn event_kind(&self) -> String {
        irc_kind(&self.command)
    }

    /// The generic `irc` event for this message.
    pub fn to_event(&self) -> Event {
        Event::new(kind::IRC)
            .with("prefix", self.prefix.as_str())
            .with("command", self.command.as_str())
            .with("args", self.args.clone())
    }

    /// The command-specific `irc-<command>` event for this message.
    pub fn to_command_event(&self) -> Event {
        Event::new(self.event_kind())
            .with("prefix", self.prefix.as_str())
            .with("args", self.args.clone())
    }

    /// Rebuild a message from a generic `irc` event.
    pub fn from_event(event: &Event) -> Result<Self, EventError> {
        Ok(Message {
            prefix: event.str("prefix")?.to_string(),
            command: event.str("command")?.to_string(),
            args: event.list("args")?.to_vec(),
        })
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::decode(s)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, ":{} ", self.prefix)?;
        }
        f.write_str(&self.command)?;
        if let Some((last, middle)) = self.args.split_last() {
            for arg in middle {
                write!(f, " {}", arg)?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}

/// Subscribe the decoder to `bus`.
///
/// Subscribers run in subscription order, so attaching the decoder first
/// means a line's `irc` events are fully dispatched before later
/// subscribers see its `raw` event.
pub fn attach(bus: &EventBus) {
    bus.subscribe(|bus, event| {
        if event.kind() != kind::RAW {
            return;
        }
        let line = match event.str("line") {
            Ok(line) => line,
            Err(e) => {
                debug!("raw event without line: {}", e);
                return;
            }
        };

        match Message::decode(line) {
            Ok(message) => {
                bus.publish(message.to_event());
                bus.publish(message.to_command_event());
            }
            Err(cause) => {
                let err = ProtocolError::InvalidMessage {
                    string: line.to_string(),
                    cause,
                };
                debug!("dropping line: {}", err);
                bus.publish(
                    Event::new(kind::PARSE_ERROR)
                        .with("line", line)
                        .with("error", err.to_string()),
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn collect(bus: &EventBus) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(move |_, event| sink.lock().push(event.clone()));
        seen
    }

    #[test]
    fn test_decode_uppercases_command() {
        let msg = Message::decode(":srv privmsg #c :hi").unwrap();
        assert_eq!(msg.command, "PRIVMSG");
    }

    #[test]
    fn test_decode_ping_without_prefix() {
        let msg: Message = "PING :tag123".parse().unwrap();
        assert_eq!(msg.prefix, "");
        assert!(msg.is_from_server());
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.args, vec!["tag123"]);
    }

    #[test]
    fn test_display_marks_trailing() {
        let msg = Message::decode(":n!u@h PRIVMSG #c :two words").unwrap();
        assert_eq!(msg.to_string(), ":n!u@h PRIVMSG #c :two words");
        let msg = Message::decode("JOIN #c").unwrap();
        assert_eq!(msg.to_string(), "JOIN #c");
    }

    #[test]
    fn test_adapter_publishes_generic_then_command_event() {
        let bus = EventBus::new();
        attach(&bus);
        let seen = collect(&bus);

        bus.publish(Event::new(kind::RAW).with("line", ":a!b@c PRIVMSG #chan :hello there"));

        let seen = seen.lock();
        let kinds: Vec<_> = seen.iter().map(|e| e.kind().to_string()).collect();
        assert_eq!(kinds, vec!["irc", "irc-privmsg", "raw"]);

        let generic = Message::from_event(&seen[0]).unwrap();
        assert_eq!(generic.command, "PRIVMSG");
        assert_eq!(seen[1].str("prefix").unwrap(), "a!b@c");
        assert_eq!(seen[1].list("args").unwrap(), &["#chan", "hello there"]);
        assert!(!seen[1].has("command"));
    }

    #[test]
    fn test_adapter_reports_parse_errors() {
        let bus = EventBus::new();
        attach(&bus);
        let seen = collect(&bus);

        bus.publish(Event::new(kind::RAW).with("line", ":only.a.prefix"));

        let seen = seen.lock();
        assert_eq!(seen[0].kind(), kind::PARSE_ERROR);
        assert_eq!(seen[0].str("line").unwrap(), ":only.a.prefix");
        assert!(seen[0].str("error").unwrap().starts_with("invalid message"));
    }
}
