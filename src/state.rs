//! Connection registration state.
//!
//! A session starts [`Unregistered`](ConnectionState::Unregistered) and moves
//! to [`Registered`](ConnectionState::Registered) exactly once, when the
//! server's RPL_WELCOME (001) arrives. There is no way back: a dropped
//! connection is reported by the transport, not by this state.

/// Current registration state of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// Connected, RPL_WELCOME not yet seen.
    #[default]
    Unregistered,
    /// RPL_WELCOME received.
    Registered,
}

impl ConnectionState {
    /// Move to `Registered`. Returns `true` only for the call that made the
    /// transition.
    pub fn register(&mut self) -> bool {
        match self {
            ConnectionState::Unregistered => {
                *self = ConnectionState::Registered;
                true
            }
            ConnectionState::Registered => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, ConnectionState::Registered)
    }
}
