//! Server numerics the built-in handlers listen for.
//!
//! Numerics arrive as three-digit commands, so the decoder publishes them
//! under `irc-001`, `irc-353` and so on. [`Response::event_kind`] gives that
//! tag without allocating, and [`Response::from_event_kind`] maps a tag back.
//!
//! # Reference
//! - RFC 2812 section 5: Replies

#![allow(non_camel_case_types)]

use std::fmt;

/// A numeric reply the session reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// `001 <nick> :Welcome ...`; marks registration complete.
    RPL_WELCOME = 1,
    /// `005 <nick> <token>... :are supported by this server`
    RPL_ISUPPORT = 5,
    /// `311 <me> <nick> <user> <host> * :<realname>`
    RPL_WHOISUSER = 311,
    /// `353 <me> <symbol> <channel> :<[prefix]nick>...`
    RPL_NAMREPLY = 353,
    /// `366 <me> <channel> :End of /NAMES list`
    RPL_ENDOFNAMES = 366,
}

const ALL: [Response; 5] = [
    Response::RPL_WELCOME,
    Response::RPL_ISUPPORT,
    Response::RPL_WHOISUSER,
    Response::RPL_NAMREPLY,
    Response::RPL_ENDOFNAMES,
];

impl Response {
    /// Numeric value of the reply.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// The `irc-NNN` event tag this numeric is published under.
    pub const fn event_kind(self) -> &'static str {
        match self {
            Response::RPL_WELCOME => "irc-001",
            Response::RPL_ISUPPORT => "irc-005",
            Response::RPL_WHOISUSER => "irc-311",
            Response::RPL_NAMREPLY => "irc-353",
            Response::RPL_ENDOFNAMES => "irc-366",
        }
    }

    /// Reverse of [`event_kind`](Response::event_kind).
    pub fn from_event_kind(kind: &str) -> Option<Response> {
        ALL.into_iter().find(|r| r.event_kind() == kind)
    }

    /// Minimum number of arguments a well-formed reply carries.
    pub const fn min_args(self) -> usize {
        match self {
            Response::RPL_WELCOME => 1,
            Response::RPL_ISUPPORT => 1,
            Response::RPL_WHOISUSER => 4,
            Response::RPL_NAMREPLY => 2,
            Response::RPL_ENDOFNAMES => 2,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
