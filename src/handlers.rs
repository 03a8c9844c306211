//! Built-in handlers that turn `irc-*` events into domain events.
//!
//! | Source          | Effect                                               |
//! |-----------------|------------------------------------------------------|
//! | `irc-ping`      | `PONG :<token>`                                      |
//! | `irc-001`       | registration, `registered`, autojoins                |
//! | `irc-005`       | capability update                                    |
//! | `irc-privmsg`   | `ctcp`, or `message` + `pubmessage`/`privmessage`    |
//! | `irc-notice`    | `ctcp-reply`, or `notice` + `pubnotice`/`privnotice` |
//! | `irc-join`      | `join`                                               |
//! | `irc-part`      | `part`                                               |
//! | `irc-quit`      | `quit`                                               |
//! | `irc-311`       | `whois-result`                                       |
//! | `irc-353`/`366` | `names`                                              |
//! | `ctcp` VERSION  | CTCP VERSION reply                                   |

use anyhow::Result;

use crate::ctcp::Ctcp;
use crate::event::{irc_kind, kind, Event, Names};
use crate::response::Response;
use crate::session::Session;
use crate::user::User;

pub(crate) fn install(session: &Session) {
    session.on(&irc_kind("PING"), on_ping);
    session.on(Response::RPL_WELCOME.event_kind(), on_welcome);
    session.on(Response::RPL_ISUPPORT.event_kind(), on_isupport);
    session.on(&irc_kind("PRIVMSG"), on_privmsg);
    session.on(&irc_kind("NOTICE"), on_notice);
    session.on(&irc_kind("JOIN"), on_join);
    session.on(&irc_kind("PART"), on_part);
    session.on(&irc_kind("QUIT"), on_quit);
    session.on(Response::RPL_WHOISUSER.event_kind(), on_whois_user);
    session.on(Response::RPL_NAMREPLY.event_kind(), on_names_reply);
    session.on(Response::RPL_ENDOFNAMES.event_kind(), on_end_of_names);
    session.on_filtered(
        kind::CTCP,
        |event| {
            event
                .str("command")
                .is_ok_and(|c| c.eq_ignore_ascii_case("version"))
        },
        on_ctcp_version,
    );
}

fn sender(event: &Event) -> Result<User> {
    Ok(User::from_hostmask(event.str("prefix")?))
}

fn on_ping(session: &Session, event: &Event) -> Result<()> {
    let args = event.args(1)?;
    session.pong(&args[0])?;
    Ok(())
}

fn on_welcome(session: &Session, event: &Event) -> Result<()> {
    let args = event.args(Response::RPL_WELCOME.min_args())?;
    session.mark_registered(&args[0])?;
    Ok(())
}

fn on_isupport(session: &Session, event: &Event) -> Result<()> {
    session.update_capabilities(event.list("args")?);
    Ok(())
}

/// Shared PRIVMSG/NOTICE classification.
struct TextKinds {
    ctcp: &'static str,
    all: &'static str,
    public: &'static str,
    private: &'static str,
}

const PRIVMSG_KINDS: TextKinds = TextKinds {
    ctcp: kind::CTCP,
    all: kind::MESSAGE,
    public: kind::PUBMESSAGE,
    private: kind::PRIVMESSAGE,
};

const NOTICE_KINDS: TextKinds = TextKinds {
    ctcp: kind::CTCP_REPLY,
    all: kind::NOTICE,
    public: kind::PUBNOTICE,
    private: kind::PRIVNOTICE,
};

fn on_privmsg(session: &Session, event: &Event) -> Result<()> {
    classify_text(session, event, &PRIVMSG_KINDS)
}

fn on_notice(session: &Session, event: &Event) -> Result<()> {
    classify_text(session, event, &NOTICE_KINDS)
}

fn classify_text(session: &Session, event: &Event, kinds: &TextKinds) -> Result<()> {
    let args = event.args(2)?;
    let (target, text) = (args[0].as_str(), args[1].as_str());
    let from = sender(event)?;

    if let Some(ctcp) = Ctcp::parse(text) {
        session.dispatch(
            Event::new(kinds.ctcp)
                .with("from", from)
                .with("to", target)
                .with("command", ctcp.command)
                .with("args", ctcp.args())
                .with("text", ctcp.params),
        );
        return Ok(());
    }

    let message = |kind: &'static str| {
        Event::new(kind)
            .with("from", from.clone())
            .with("to", target)
            .with("message", text)
    };
    session.dispatch(message(kinds.all));
    let scoped = if session.is_channel(target) {
        kinds.public
    } else {
        kinds.private
    };
    session.dispatch(message(scoped));
    Ok(())
}

fn on_join(session: &Session, event: &Event) -> Result<()> {
    let args = event.args(1)?;
    session.dispatch(
        Event::new(kind::JOIN)
            .with("user", sender(event)?)
            .with("channel", args[0].as_str()),
    );
    Ok(())
}

fn on_part(session: &Session, event: &Event) -> Result<()> {
    let args = event.args(1)?;
    session.dispatch(
        Event::new(kind::PART)
            .with("user", sender(event)?)
            .with("channel", args[0].as_str())
            .with("reason", args.get(1).cloned()),
    );
    Ok(())
}

fn on_quit(session: &Session, event: &Event) -> Result<()> {
    let args = event.list("args")?;
    session.dispatch(
        Event::new(kind::QUIT)
            .with("user", sender(event)?)
            .with("reason", args.first().cloned()),
    );
    Ok(())
}

fn on_ctcp_version(session: &Session, event: &Event) -> Result<()> {
    let from = event.user("from")?;
    session.ctcp_reply(&from.nick, &format!("VERSION {}", session.version()))?;
    Ok(())
}

/// `<me> <nick> <user> <host> * :<realname>`
fn on_whois_user(session: &Session, event: &Event) -> Result<()> {
    let args = event.args(Response::RPL_WHOISUSER.min_args())?;
    session.dispatch(
        Event::new(kind::WHOIS_RESULT)
            .with("nick", args[1].as_str())
            .with("user", args[2].as_str())
            .with("host", args[3].as_str())
            .with("realname", args.get(5).cloned()),
    );
    Ok(())
}

/// `<me> [symbol] <channel> :<names>`; the channel is always second to last.
fn on_names_reply(session: &Session, event: &Event) -> Result<()> {
    let args = event.args(Response::RPL_NAMREPLY.min_args())?;
    let channel = &args[args.len() - 2];
    let symbols = session.prefix_symbols();
    let members = args[args.len() - 1]
        .split(' ')
        .filter_map(|entry| split_member(entry, symbols.as_deref()));
    session.accumulate_names(channel, members);
    Ok(())
}

/// `<me> <channel> :End of /NAMES list.`
fn on_end_of_names(session: &Session, event: &Event) -> Result<()> {
    let args = event.args(Response::RPL_ENDOFNAMES.min_args())?;
    let channel = args[1].as_str();
    let nicks: Names = session.take_names(channel);
    session.dispatch(
        Event::new(kind::NAMES)
            .with("channel", channel)
            .with("nicks", nicks),
    );
    Ok(())
}

/// Split one NAMES entry into `(nick, prefix)`.
///
/// At most one leading symbol is taken: one of `symbols` when the server
/// advertised PREFIX, otherwise any ASCII punctuation.
fn split_member(entry: &str, symbols: Option<&str>) -> Option<(String, String)> {
    let first = entry.chars().next()?;
    let is_prefix = match symbols {
        Some(symbols) => symbols.contains(first),
        None => first.is_ascii_punctuation(),
    };
    let (prefix, nick) = if is_prefix {
        entry.split_at(first.len_utf8())
    } else {
        ("", entry)
    };
    if nick.is_empty() {
        return None;
    }
    Some((nick.to_string(), prefix.to_string()))
}

/// Nicks holding `@` in a NAMES mapping.
pub(crate) fn ops(nicks: &Names) -> Vec<String> {
    with_prefix(nicks, "@")
}

/// Nicks holding `+` in a NAMES mapping.
pub(crate) fn voices(nicks: &Names) -> Vec<String> {
    with_prefix(nicks, "+")
}

fn with_prefix(nicks: &Names, prefix: &str) -> Vec<String> {
    nicks
        .iter()
        .filter(|(_, p)| p.as_str() == prefix)
        .map(|(nick, _)| nick.clone())
        .collect()
}
