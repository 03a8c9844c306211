//! The per-connection session.
//!
//! A [`Session`] sits on an [`EventBus`] and routes each published event to
//! the handlers registered for its type. It also owns the outgoing line queue
//! and the state derived from the stream: registration status, our current
//! nick, ISUPPORT capabilities and in-progress NAMES listings.
//!
//! Handlers run synchronously on the thread that published the event, in
//! registration order. A handler that fails or panics is logged and the
//! remaining handlers still run. No session lock is held while a handler
//! runs, so handlers may freely call back into the session.

mod registry;

pub use self::registry::{Filter, Handler, HandlerId};

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, trace};

use self::registry::Registry;
use crate::bus::{panic_message, EventBus};
use crate::casemap::irc_to_lower;
use crate::ctcp;
use crate::error::SessionError;
use crate::event::{kind, Event, Names};
use crate::handlers;
use crate::isupport::Capabilities;
use crate::state::ConnectionState;
use crate::util::{has_line_break, say_chunks};

#[derive(Default)]
struct Handshake {
    state: ConnectionState,
    autojoin: Vec<String>,
}

struct Inner {
    bus: EventBus,
    outgoing: UnboundedSender<String>,
    version: String,
    registry: Registry,
    capabilities: RwLock<Capabilities>,
    handshake: Mutex<Handshake>,
    nick: RwLock<Option<String>>,
    names: Mutex<HashMap<String, Names>>,
}

/// Cheaply cloneable handle to a connection's session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create a session on `bus` that writes lines to `outgoing`.
    ///
    /// The built-in protocol handlers (PING, PRIVMSG, NAMES, ...) are
    /// installed before this returns. Attach the message decoder to the bus
    /// first so `irc-*` events reach the session.
    pub fn new(
        bus: EventBus,
        outgoing: UnboundedSender<String>,
        version: impl Into<String>,
    ) -> Self {
        let session = Session {
            inner: Arc::new(Inner {
                bus: bus.clone(),
                outgoing,
                version: version.into(),
                registry: Registry::default(),
                capabilities: RwLock::new(Capabilities::new()),
                handshake: Mutex::new(Handshake::default()),
                nick: RwLock::new(None),
                names: Mutex::new(HashMap::new()),
            }),
        };

        let weak: Weak<Inner> = Arc::downgrade(&session.inner);
        bus.subscribe(move |_, event| {
            if let Some(inner) = weak.upgrade() {
                Session { inner }.deliver(event);
            }
        });
        handlers::install(&session);
        session
    }

    fn deliver(&self, event: &Event) {
        for registration in self.inner.registry.snapshot(event.kind()) {
            if !registration.is_live() {
                continue;
            }
            if let Some(filter) = &registration.filter {
                if !filter(event) {
                    continue;
                }
            }
            let id = registration.id;
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| (registration.handler)(self, event)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(kind = event.kind(), handler = %id, "handler failed: {:#}", e)
                }
                Err(payload) => error!(
                    kind = event.kind(),
                    handler = %id,
                    "handler panicked: {}",
                    panic_message(&*payload)
                ),
            }
        }
    }

    /// Run `handler` for every event of type `kind`.
    pub fn on<F>(&self, kind: &str, handler: F) -> HandlerId
    where
        F: Fn(&Session, &Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.registry.insert(kind, Box::new(handler), None)
    }

    /// Run `handler` for events of type `kind` that pass `filter`.
    ///
    /// The filter is evaluated on every dispatch.
    pub fn on_filtered<P, F>(&self, kind: &str, filter: P, handler: F) -> HandlerId
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
        F: Fn(&Session, &Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner
            .registry
            .insert(kind, Box::new(handler), Some(Box::new(filter)))
    }

    /// Alias for [`on`](Session::on).
    pub fn register_callback<F>(&self, kind: &str, handler: F) -> HandlerId
    where
        F: Fn(&Session, &Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(kind, handler)
    }

    /// Remove a handler. Returns `false` if it was already gone.
    ///
    /// Takes effect immediately, including for a dispatch in progress.
    pub fn off(&self, id: HandlerId) -> bool {
        self.inner.registry.remove(id)
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.inner.registry.count(kind)
    }

    /// Publish an event on the underlying bus.
    pub fn dispatch(&self, event: Event) {
        self.inner.bus.publish(event);
    }

    /// The bus this session publishes on and listens to.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// A snapshot of the server's ISUPPORT tokens.
    pub fn capabilities(&self) -> Capabilities {
        self.inner.capabilities.read().clone()
    }

    /// Classify a message target using the current capabilities.
    pub fn is_channel(&self, target: &str) -> bool {
        self.inner.capabilities.read().is_channel(target)
    }

    pub(crate) fn update_capabilities(&self, args: &[String]) {
        self.inner.capabilities.write().apply_isupport(args);
    }

    pub(crate) fn prefix_symbols(&self) -> Option<String> {
        self.inner
            .capabilities
            .read()
            .prefix_symbols()
            .map(str::to_string)
    }

    /// Current registration state.
    pub fn state(&self) -> ConnectionState {
        self.inner.handshake.lock().state
    }

    /// Whether RPL_WELCOME has been received.
    pub fn is_registered(&self) -> bool {
        self.state().is_registered()
    }

    /// Our nick as last sent or confirmed by the server.
    pub fn current_nick(&self) -> Option<String> {
        self.inner.nick.read().clone()
    }

    /// The CTCP VERSION answer.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    /// Join `channels` once registered, or right away if already registered.
    ///
    /// Calls accumulate.
    pub fn autojoin<I, S>(&self, channels: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut handshake = self.inner.handshake.lock();
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        if handshake.state.is_registered() {
            for channel in &channels {
                self.join(channel)?;
            }
        }
        handshake.autojoin.extend(channels);
        Ok(())
    }

    /// Channels queued by [`autojoin`](Session::autojoin).
    pub fn autojoin_channels(&self) -> Vec<String> {
        self.inner.handshake.lock().autojoin.clone()
    }

    /// Handle RPL_WELCOME: record our nick, move to `Registered` and send
    /// the autojoins. Only the first call has any effect.
    pub(crate) fn mark_registered(&self, nick: &str) -> Result<bool, SessionError> {
        {
            let mut handshake = self.inner.handshake.lock();
            if !handshake.state.register() {
                return Ok(false);
            }
            *self.inner.nick.write() = Some(nick.to_string());
            for channel in &handshake.autojoin {
                self.join(channel)?;
            }
        }
        debug!(nick, "registered");
        self.dispatch(Event::new(kind::REGISTERED).with("nick", nick));
        Ok(true)
    }

    /// Add `(nick, prefix)` pairs to the listing being built for `channel`.
    pub(crate) fn accumulate_names<I>(&self, channel: &str, members: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.inner
            .names
            .lock()
            .entry(irc_to_lower(channel))
            .or_default()
            .extend(members);
    }

    /// Finish the listing for `channel`, leaving an empty accumulator.
    pub(crate) fn take_names(&self, channel: &str) -> Names {
        self.inner
            .names
            .lock()
            .remove(&irc_to_lower(channel))
            .unwrap_or_default()
    }

    /// Queue one raw protocol line. The terminator is added by the writer.
    pub fn writeln(&self, line: impl Into<String>) -> Result<(), SessionError> {
        let line = line.into();
        if has_line_break(&line) {
            return Err(SessionError::LineBreak(line));
        }
        trace!(%line, "queue");
        self.inner
            .outgoing
            .send(line)
            .map_err(|_| SessionError::Closed)
    }

    /// Alias for [`writeln`](Session::writeln).
    pub fn raw(&self, line: impl Into<String>) -> Result<(), SessionError> {
        self.writeln(line)
    }

    /// Send PASS (when given), USER and NICK.
    pub fn register(
        &self,
        nick: &str,
        user: &str,
        realname: &str,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        if let Some(password) = password {
            self.writeln(format!("PASS {}", password))?;
        }
        self.writeln(format!("USER {} . . :{}", user, realname))?;
        self.nick(nick)
    }

    /// Send NICK and remember `nick` as the current nickname.
    pub fn nick(&self, nick: &str) -> Result<(), SessionError> {
        self.writeln(format!("NICK {}", nick))?;
        *self.inner.nick.write() = Some(nick.to_string());
        Ok(())
    }

    /// Send JOIN for `channel`.
    pub fn join(&self, channel: &str) -> Result<(), SessionError> {
        self.writeln(format!("JOIN {}", channel))
    }

    /// Send PART for `channel` without a reason.
    pub fn part(&self, channel: &str) -> Result<(), SessionError> {
        self.writeln(format!("PART {}", channel))
    }

    pub fn part_with_reason(&self, channel: &str, reason: &str) -> Result<(), SessionError> {
        self.writeln(format!("PART {} :{}", channel, reason))
    }

    /// PRIVMSG `target`. Text of 450 characters or more goes out as
    /// successive 400-character messages.
    pub fn say(&self, target: &str, message: &str) -> Result<(), SessionError> {
        for chunk in say_chunks(message) {
            self.writeln(format!("PRIVMSG {} :{}", target, chunk))?;
        }
        Ok(())
    }

    /// CTCP ACTION, the `/me` command.
    pub fn action(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.ctcp(target, &format!("ACTION {}", text))
    }

    /// Send a NOTICE to `target`.
    pub fn notice(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.writeln(format!("NOTICE {} :{}", target, text))
    }

    /// Send a CTCP request.
    pub fn ctcp(&self, target: &str, body: &str) -> Result<(), SessionError> {
        self.writeln(format!("PRIVMSG {} :{}", target, ctcp::wrap(body)))
    }

    /// Send a CTCP reply.
    pub fn ctcp_reply(&self, target: &str, body: &str) -> Result<(), SessionError> {
        self.writeln(format!("NOTICE {} :{}", target, ctcp::wrap(body)))
    }

    /// Send MODE with `modes` followed by `args`.
    pub fn mode(&self, target: &str, modes: &str, args: &[&str]) -> Result<(), SessionError> {
        let mut line = format!("MODE {} {}", target, modes);
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.writeln(line)
    }

    /// Request NAMES for `target`.
    pub fn names(&self, target: &str) -> Result<(), SessionError> {
        self.writeln(format!("NAMES {}", target))
    }

    /// Request WHOIS for `target`.
    pub fn whois(&self, target: &str) -> Result<(), SessionError> {
        self.writeln(format!("WHOIS {}", target))
    }

    /// Reply to a PING carrying `token`.
    pub fn pong(&self, token: &str) -> Result<(), SessionError> {
        self.writeln(format!("PONG :{}", token))
    }

    /// Send QUIT, with `reason` as the trailing parameter when given.
    pub fn quit(&self, reason: Option<&str>) -> Result<(), SessionError> {
        match reason {
            Some(reason) => self.writeln(format!("QUIT :{}", reason)),
            None => self.writeln("QUIT"),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("nick", &self.current_nick())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn session() -> (Session, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Session::new(EventBus::new(), tx, "test 1.0"), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_register_order() {
        let (session, mut rx) = session();
        session
            .register("bot", "ident", "Real Name", Some("secret"))
            .unwrap();
        assert_eq!(
            drain(&mut rx),
            vec!["PASS secret", "USER ident . . :Real Name", "NICK bot"]
        );
        assert_eq!(session.current_nick().as_deref(), Some("bot"));
    }

    #[test]
    fn test_register_without_password() {
        let (session, mut rx) = session();
        session.register("bot", "bot", "bot", None).unwrap();
        assert_eq!(drain(&mut rx), vec!["USER bot . . :bot", "NICK bot"]);
    }

    #[test]
    fn test_outgoing_wire_formats() {
        let (session, mut rx) = session();
        session.join("#c").unwrap();
        session.part("#c").unwrap();
        session.part_with_reason("#c", "bye now").unwrap();
        session.notice("bob", "hi").unwrap();
        session.action("#c", "waves").unwrap();
        session.ctcp("bob", "PING 1").unwrap();
        session.ctcp_reply("bob", "VERSION x").unwrap();
        session.mode("#c", "+o", &["bob"]).unwrap();
        session.mode("#c", "+m", &[]).unwrap();
        session.names("#c").unwrap();
        session.whois("bob").unwrap();
        session.pong("abc").unwrap();
        session.quit(Some("later")).unwrap();
        session.quit(None).unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                "JOIN #c",
                "PART #c",
                "PART #c :bye now",
                "NOTICE bob :hi",
                "PRIVMSG #c :\x01ACTION waves\x01",
                "PRIVMSG bob :\x01PING 1\x01",
                "NOTICE bob :\x01VERSION x\x01",
                "MODE #c +o bob",
                "MODE #c +m",
                "NAMES #c",
                "WHOIS bob",
                "PONG :abc",
                "QUIT :later",
                "QUIT",
            ]
        );
    }

    #[test]
    fn test_writeln_rejects_line_breaks() {
        let (session, mut rx) = session();
        assert!(matches!(
            session.say("#c", "one\r\nQUIT"),
            Err(SessionError::LineBreak(_))
        ));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_writeln_after_close() {
        let (session, rx) = session();
        drop(rx);
        assert!(matches!(session.join("#c"), Err(SessionError::Closed)));
    }

    #[test]
    fn test_mark_registered_once() {
        let (session, mut rx) = session();
        session.autojoin(["#a", "#b"]).unwrap();
        assert!(drain(&mut rx).is_empty());

        assert!(session.mark_registered("bot").unwrap());
        assert!(!session.mark_registered("bot").unwrap());
        assert_eq!(drain(&mut rx), vec!["JOIN #a", "JOIN #b"]);
        assert!(session.is_registered());
    }

    #[test]
    fn test_autojoin_after_registration_is_immediate() {
        let (session, mut rx) = session();
        session.mark_registered("bot").unwrap();
        session.autojoin(["#late"]).unwrap();
        assert_eq!(drain(&mut rx), vec!["JOIN #late"]);
        assert_eq!(session.autojoin_channels(), vec!["#late"]);
    }

    #[test]
    fn test_names_accumulator_is_case_insensitive() {
        let (session, _rx) = session();
        session.accumulate_names("#Chan", [("a".to_string(), "@".to_string())]);
        session.accumulate_names("#chan", [("b".to_string(), String::new())]);
        let names = session.take_names("#CHAN");
        assert_eq!(names.len(), 2);
        assert!(session.take_names("#chan").is_empty());
    }

    #[test]
    fn test_off_during_dispatch_skips_later_handler() {
        let (session, _rx) = session();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let second = Arc::new(Mutex::new(None));
        let s = second.clone();
        let h = hits.clone();
        session.on("x", move |session, _| {
            h.lock().push(1);
            if let Some(id) = *s.lock() {
                session.off(id);
            }
            Ok(())
        });
        let h = hits.clone();
        let id = session.on("x", move |_, _| {
            h.lock().push(2);
            Ok(())
        });
        *second.lock() = Some(id);

        session.dispatch(Event::new("x"));
        session.dispatch(Event::new("x"));
        assert_eq!(*hits.lock(), vec![1, 1]);
    }
}
