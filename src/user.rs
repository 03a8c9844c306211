//! Users parsed from hostmasks, and WHOIS lookups that fill them in.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use crate::casemap::irc_eq;
use crate::error::SessionError;
use crate::event::kind;
use crate::session::{HandlerId, Session};

const SERVER: &str = "ircd";

/// A network user.
///
/// Anything that is not a well-formed `nick!user@host` mask is treated as the
/// server and collapses to [`User::server`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub nick: String,
    /// Ident; `None` until known.
    pub user: Option<String>,
    /// Hostname; `None` until known.
    pub host: Option<String>,
}

impl User {
    /// Parse a message prefix.
    ///
    /// ```
    /// use slirc_events::User;
    ///
    /// let user = User::from_hostmask("dan!d@localhost");
    /// assert_eq!(user.nick, "dan");
    /// assert_eq!(user.host.as_deref(), Some("localhost"));
    ///
    /// assert!(User::from_hostmask("irc.example.net").is_server());
    /// ```
    pub fn from_hostmask(mask: &str) -> User {
        let parsed = mask.split_once('!').and_then(|(nick, rest)| {
            let (user, host) = rest.split_once('@')?;
            if nick.contains('@') || rest.contains('!') || host.contains('@') {
                return None;
            }
            Some(User {
                nick: nick.to_string(),
                user: Some(user.to_string()),
                host: Some(host.to_string()),
            })
        });
        parsed.unwrap_or_else(User::server)
    }

    /// The sentinel used for server-originated prefixes.
    pub fn server() -> User {
        User {
            nick: SERVER.to_string(),
            user: Some(SERVER.to_string()),
            host: Some(SERVER.to_string()),
        }
    }

    /// A user known only by nick.
    pub fn pending(nick: impl Into<String>) -> User {
        User {
            nick: nick.into(),
            user: None,
            host: None,
        }
    }

    pub fn is_server(&self) -> bool {
        *self == User::server()
    }

    /// True once ident and host are both known.
    pub fn is_resolved(&self) -> bool {
        self.user.is_some() && self.host.is_some()
    }

    /// `nick!user@host`, or the bare nick while unresolved.
    pub fn hostmask(&self) -> String {
        match (&self.user, &self.host) {
            (Some(user), Some(host)) => format!("{}!{}@{}", self.nick, user, host),
            _ => self.nick.clone(),
        }
    }

    /// Send `WHOIS <nick>` and return a handle to the user it resolves.
    pub fn from_nickname(session: &Session, nick: &str) -> Result<WhoisRequest, SessionError> {
        User::from_nickname_with(session, nick, |_, _| {})
    }

    /// Like [`from_nickname`](User::from_nickname), calling `callback` once
    /// the matching RPL_WHOISUSER arrives.
    ///
    /// The reply handler is installed before the request is sent and removes
    /// itself after the first matching reply, so `callback` runs at most once.
    pub fn from_nickname_with<F>(
        session: &Session,
        nick: &str,
        callback: F,
    ) -> Result<WhoisRequest, SessionError>
    where
        F: FnOnce(&Session, &User) + Send + 'static,
    {
        let shared = Arc::new(WhoisShared {
            user: Mutex::new(User::pending(nick)),
            done: AtomicBool::new(false),
            callback: Mutex::new(Some(Box::new(callback))),
            id: OnceLock::new(),
        });

        let wanted = nick.to_string();
        let filter = move |event: &crate::Event| {
            event
                .str("nick")
                .is_ok_and(|nick| irc_eq(nick, &wanted))
        };
        let state = shared.clone();
        let id = session.on_filtered(kind::WHOIS_RESULT, filter, move |session, event| {
            state.resolve(session, event)
        });
        // The id is only known once registration returns; a reply that raced
        // ahead could not unregister itself.
        let _ = shared.id.set(id);
        if shared.done.load(Ordering::Acquire) {
            session.off(id);
        }

        if let Err(e) = session.whois(nick) {
            session.off(id);
            return Err(e);
        }

        Ok(WhoisRequest {
            id,
            nick: nick.to_string(),
            shared,
            session: session.clone(),
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hostmask())
    }
}

type WhoisCallback = Box<dyn FnOnce(&Session, &User) + Send>;

struct WhoisShared {
    user: Mutex<User>,
    /// Set by the first reply or by cancellation.
    done: AtomicBool,
    callback: Mutex<Option<WhoisCallback>>,
    id: OnceLock<HandlerId>,
}

impl WhoisShared {
    fn resolve(&self, session: &Session, event: &crate::Event) -> anyhow::Result<()> {
        let ident = event.str("user")?.to_string();
        let host = event.str("host")?.to_string();
        if self.done.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(id) = self.id.get() {
            session.off(*id);
        }

        let user = {
            let mut user = self.user.lock();
            user.user = Some(ident);
            user.host = Some(host);
            user.clone()
        };
        debug!(user = %user, "whois resolved");

        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(session, &user);
        }
        Ok(())
    }
}

/// An outstanding WHOIS lookup.
///
/// Dropping the handle does not cancel the lookup; call
/// [`cancel`](WhoisRequest::cancel) for that.
pub struct WhoisRequest {
    id: HandlerId,
    nick: String,
    shared: Arc<WhoisShared>,
    session: Session,
}

impl WhoisRequest {
    /// Correlation id; also the id of the reply handler.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Current view of the user; ident and host stay `None` until resolved.
    pub fn user(&self) -> User {
        self.shared.user.lock().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.user.lock().is_resolved()
    }

    /// Stop waiting for the reply. Returns `false` if it already arrived or
    /// the request was cancelled before.
    pub fn cancel(&self) -> bool {
        if self.shared.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shared.callback.lock().take();
        self.session.off(self.id)
    }
}

impl fmt::Debug for WhoisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhoisRequest")
            .field("id", &self.id)
            .field("nick", &self.nick)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
