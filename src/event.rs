//! Tagged events flowing through the [`EventBus`](crate::EventBus).
//!
//! An [`Event`] is a type tag plus a small set of named fields. Field values
//! are drawn from the closed [`Value`] sum type, and every accessor returns a
//! [`Result`] so a misspelt field name surfaces as
//! [`EventError::MissingField`] instead of a silent default.
//!
//! ```
//! use slirc_events::{Event, event::kind};
//!
//! let event = Event::new(kind::RAW).with("line", "PING :tag123");
//! assert_eq!(event.str("line").unwrap(), "PING :tag123");
//! assert!(event.str("lien").is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::EventError;
use crate::user::User;

/// Channel membership snapshot: nick to prefix symbol (`""`, `"@"`, `"+"`, ...).
pub type Names = BTreeMap<String, String>;

/// Built-in event type tags.
pub mod kind {
    /// A complete line read from the transport. Field: `line`.
    pub const RAW: &str = "raw";
    /// Every decoded message. Fields: `prefix`, `command`, `args`.
    pub const IRC: &str = "irc";
    /// A raw line that failed to decode. Fields: `line`, `error`.
    pub const PARSE_ERROR: &str = "parse-error";
    /// A PRIVMSG. Fields: `from`, `to`, `message`.
    pub const MESSAGE: &str = "message";
    /// A NOTICE. Fields: `from`, `to`, `message`.
    pub const NOTICE: &str = "notice";
    /// A PRIVMSG addressed to a channel.
    pub const PUBMESSAGE: &str = "pubmessage";
    /// A PRIVMSG addressed to us directly.
    pub const PRIVMESSAGE: &str = "privmessage";
    /// A NOTICE addressed to a channel.
    pub const PUBNOTICE: &str = "pubnotice";
    /// A NOTICE addressed to us directly.
    pub const PRIVNOTICE: &str = "privnotice";
    /// A CTCP request. Fields: `from`, `to`, `command`, `args`, `text`.
    pub const CTCP: &str = "ctcp";
    /// A CTCP reply (carried by NOTICE). Same fields as [`CTCP`].
    pub const CTCP_REPLY: &str = "ctcp-reply";
    /// Fields: `user`, `channel`.
    pub const JOIN: &str = "join";
    /// Fields: `user`, `channel`, `reason`.
    pub const PART: &str = "part";
    /// Fields: `user`, `reason`.
    pub const QUIT: &str = "quit";
    /// A completed NAMES listing. Fields: `channel`, `nicks`.
    pub const NAMES: &str = "names";
    /// RPL_WHOISUSER. Fields: `nick`, `user`, `host`, `realname`.
    pub const WHOIS_RESULT: &str = "whois-result";
    /// The session saw RPL_WELCOME. Field: `nick`.
    pub const REGISTERED: &str = "registered";
    /// The reader stopped for good. Field: `reason`.
    pub const DISCONNECT: &str = "disconnect";
    /// A recoverable or fatal I/O fault. Fields: `direction` (`read` or
    /// `write`), `error`, `attempt`.
    pub const TRANSPORT_ERROR: &str = "transport-error";
}

/// Returns the `irc-<command>` tag for a command or numeric.
pub fn irc_kind(command: &str) -> String {
    format!("irc-{}", command.to_ascii_lowercase())
}

/// A field value carried by an [`Event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Plain text.
    Str(String),
    /// Text that may legitimately be absent, such as a PART reason.
    OptStr(Option<String>),
    /// Counter or numeric value.
    Int(i64),
    /// Ordered list of strings, such as message arguments.
    List(Vec<String>),
    /// A user parsed from a hostmask.
    User(User),
    /// A NAMES membership mapping.
    Nicks(Names),
}

impl Value {
    fn variant(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::OptStr(_) => "optional string",
            Value::Int(_) => "integer",
            Value::List(_) => "list",
            Value::User(_) => "user",
            Value::Nicks(_) => "nick map",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        Value::OptStr(s)
    }
}

impl From<Option<&str>> for Value {
    fn from(s: Option<&str>) -> Self {
        Value::OptStr(s.map(str::to_string))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(list: Vec<String>) -> Self {
        Value::List(list)
    }
}

impl From<User> for Value {
    fn from(user: User) -> Self {
        Value::User(user)
    }
}

impl From<Names> for Value {
    fn from(nicks: Names) -> Self {
        Value::Nicks(nicks)
    }
}

/// An immutable tagged record published on the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    kind: String,
    fields: Vec<(&'static str, Value)>,
}

macro_rules! typed_getter {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ret:ty, $label:literal, |$v:ident| $map:expr) => {
        $(#[$doc])*
        pub fn $name(&self, field: &'static str) -> Result<$ret, EventError> {
            match self.get(field)? {
                Value::$variant($v) => Ok($map),
                other => Err(self.type_error(field, $label, other)),
            }
        }
    };
}

impl Event {
    /// Create an event with no fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, replacing any earlier field of the same name.
    pub fn with(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
        self
    }

    /// The event type tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the event carries `field`.
    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| *name == field)
    }

    /// Iterate over fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// Look up a field by name.
    pub fn get(&self, field: &'static str) -> Result<&Value, EventError> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
            .ok_or_else(|| EventError::MissingField {
                kind: self.kind.clone(),
                field,
            })
    }

    typed_getter!(
        /// Read a [`Value::Str`] field.
        str, Str, &str, "string", |s| s.as_str()
    );
    typed_getter!(
        /// Read a [`Value::OptStr`] field.
        opt_str, OptStr, Option<&str>, "optional string", |s| s.as_deref()
    );
    typed_getter!(
        /// Read a [`Value::Int`] field.
        int, Int, i64, "integer", |n| *n
    );
    typed_getter!(
        /// Read a [`Value::List`] field.
        list, List, &[String], "list", |l| l.as_slice()
    );
    typed_getter!(
        /// Read a [`Value::User`] field.
        user, User, &User, "user", |u| u
    );
    typed_getter!(
        /// Read a [`Value::Nicks`] field.
        nicks, Nicks, &Names, "nick map", |n| n
    );

    /// Read the `args` list and require at least `min` entries.
    pub fn args(&self, min: usize) -> Result<&[String], EventError> {
        let args = self.list("args")?;
        if args.len() < min {
            return Err(EventError::NotEnoughArguments {
                command: self.kind.clone(),
                expected: min,
                got: args.len(),
            });
        }
        Ok(args)
    }

    fn type_error(&self, field: &'static str, expected: &'static str, found: &Value) -> EventError {
        EventError::FieldType {
            kind: self.kind.clone(),
            field,
            expected,
            found: found.variant(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Event<{}>", self.kind)?;
        for (name, value) in &self.fields {
            write!(f, " {}={:?}", name, value)?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_is_an_error() {
        let event = Event::new(kind::MESSAGE).with("message", "hi");
        let err = event.str("mesage").unwrap_err();
        assert_eq!(
            err,
            EventError::MissingField {
                kind: "message".to_string(),
                field: "mesage",
            }
        );
    }

    #[test]
    fn test_wrong_variant_is_an_error() {
        let event = Event::new(kind::RAW).with("line", "PING x");
        match event.list("line") {
            Err(EventError::FieldType { expected, found, .. }) => {
                assert_eq!(expected, "list");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_with_replaces_existing_field() {
        let event = Event::new("x").with("a", "1").with("a", "2");
        assert_eq!(event.str("a").unwrap(), "2");
        assert_eq!(event.fields().count(), 1);
    }

    #[test]
    fn test_optional_string_field() {
        let event = Event::new(kind::PART).with("reason", None::<String>);
        assert_eq!(event.opt_str("reason").unwrap(), None);
        assert!(event.has("reason"));
    }

    #[test]
    fn test_args_enforces_minimum() {
        let event = Event::new("irc-privmsg").with("args", vec!["#chan".to_string()]);
        assert_eq!(event.args(1).unwrap(), &["#chan".to_string()]);
        assert!(matches!(
            event.args(2),
            Err(EventError::NotEnoughArguments { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_events_compare_by_value() {
        let a = Event::new(kind::JOIN).with("channel", "#x");
        let b = Event::new(kind::JOIN).with("channel", "#x");
        assert_eq!(a, b);
    }

    #[test]
    fn test_irc_kind_lowercases() {
        assert_eq!(irc_kind("PRIVMSG"), "irc-privmsg");
        assert_eq!(irc_kind("005"), "irc-005");
    }

    #[test]
    fn test_display() {
        let event = Event::new(kind::RAW).with("line", "PING :x");
        assert_eq!(event.to_string(), "<Event<raw> line=Str(\"PING :x\")>");
    }
}
