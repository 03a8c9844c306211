//! Channel membership tracking.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::casemap::irc_eq;
use crate::error::SessionError;
use crate::event::{kind, Event, Names};
use crate::handlers::{ops, voices};
use crate::session::{HandlerId, Session};

type RefreshCallback = Box<dyn FnOnce(&Session, &Names) + Send>;

#[derive(Default)]
struct ChannelState {
    users: RwLock<Names>,
    /// Callbacks waiting for the next `names` event. Non-empty while a
    /// NAMES request is in flight.
    pending: Mutex<Vec<RefreshCallback>>,
}

impl ChannelState {
    fn apply(&self, session: &Session, event: &Event) -> anyhow::Result<()> {
        let nicks = event.nicks("nicks")?.clone();
        *self.users.write() = nicks.clone();
        let callbacks = std::mem::take(&mut *self.pending.lock());
        for callback in callbacks {
            callback(session, &nicks);
        }
        Ok(())
    }
}

/// Membership of one channel, kept current from `names` events.
///
/// Ops and voices are derived from the membership map on every read.
/// Dropping the channel unregisters its handler.
pub struct Channel {
    name: String,
    id: HandlerId,
    session: Session,
    state: Arc<ChannelState>,
}

impl Channel {
    /// Start tracking `name`. Nothing is sent; membership fills in on the
    /// next NAMES listing for the channel, whether requested through
    /// [`refresh`](Channel::refresh) or sent by the server after a JOIN.
    pub fn track(session: &Session, name: impl Into<String>) -> Channel {
        let name = name.into();
        let state = Arc::new(ChannelState::default());

        let wanted = name.clone();
        let filter = move |event: &Event| {
            event
                .str("channel")
                .is_ok_and(|channel| irc_eq(channel, &wanted))
        };
        let handler_state = state.clone();
        let id = session.on_filtered(kind::NAMES, filter, move |session, event| {
            handler_state.apply(session, event)
        });

        Channel {
            name,
            id,
            session: session.clone(),
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the `names` handler backing this channel.
    pub fn handler_id(&self) -> HandlerId {
        self.id
    }

    /// Nick to prefix symbol, as of the last listing.
    pub fn users(&self) -> Names {
        self.state.users.read().clone()
    }

    pub fn ops(&self) -> Vec<String> {
        ops(&self.state.users.read())
    }

    pub fn voices(&self) -> Vec<String> {
        voices(&self.state.users.read())
    }

    /// Whether a NAMES request is outstanding.
    pub fn is_refreshing(&self) -> bool {
        !self.state.pending.lock().is_empty()
    }

    /// Queue `callback` for the next listing of this channel and request one
    /// unless a request is already in flight.
    ///
    /// Queued callbacks run in the order they were queued, each exactly once.
    pub fn refresh<F>(&self, callback: F) -> Result<(), SessionError>
    where
        F: FnOnce(&Session, &Names) + Send + 'static,
    {
        let mut pending = self.state.pending.lock();
        let first = pending.is_empty();
        pending.push(Box::new(callback));
        if first {
            if let Err(e) = self.session.names(&self.name) {
                pending.clear();
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.session.off(self.id);
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("users", &self.state.users.read().len())
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use tokio::sync::mpsc;

    fn names_event(channel: &str, members: &[(&str, &str)]) -> Event {
        let nicks: Names = members
            .iter()
            .map(|(n, p)| (n.to_string(), p.to_string()))
            .collect();
        Event::new(kind::NAMES)
            .with("channel", channel)
            .with("nicks", nicks)
    }

    #[test]
    fn test_names_replace_membership() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(EventBus::new(), tx, "t");
        let channel = Channel::track(&session, "#Rust");

        session.dispatch(names_event("#rust", &[("a", "@"), ("b", "+"), ("c", "")]));
        assert_eq!(channel.users().len(), 3);
        assert_eq!(channel.ops(), vec!["a"]);
        assert_eq!(channel.voices(), vec!["b"]);

        session.dispatch(names_event("#RUST", &[("d", "")]));
        assert_eq!(channel.users().len(), 1);
        assert!(channel.ops().is_empty());
    }

    #[test]
    fn test_other_channels_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(EventBus::new(), tx, "t");
        let channel = Channel::track(&session, "#a");
        session.dispatch(names_event("#b", &[("x", "@")]));
        assert!(channel.users().is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new(EventBus::new(), tx, "t");
        let before = session.handler_count(kind::NAMES);
        let channel = Channel::track(&session, "#a");
        assert_eq!(session.handler_count(kind::NAMES), before + 1);
        drop(channel);
        assert_eq!(session.handler_count(kind::NAMES), before);
    }

    #[test]
    fn test_refresh_failure_clears_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(EventBus::new(), tx, "t");
        let channel = Channel::track(&session, "#a");
        drop(rx);
        assert!(channel.refresh(|_, _| {}).is_err());
        assert!(!channel.is_refreshing());
    }
}
