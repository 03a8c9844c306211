//! A small bot that greets people joining its channels.
//!
//! ```text
//! cargo run --example greeter -- irc.libera.chat 6667 greeter9001 '#slirc-test'
//! ```
//!
//! Set `RUST_LOG=slirc_events=debug` to see the protocol traffic.

use slirc_events::event::kind;
use slirc_events::{connect, ClientConfig, User};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "irc.libera.chat".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(6667);
    let nick = args.next().unwrap_or_else(|| "greeter9001".to_string());
    let channels: Vec<String> = args.collect();

    let config = ClientConfig::new(host, port, nick)
        .with_realname("slirc-events greeter")
        .with_autojoin(channels);

    let client = connect(config, |session| {
        session.on(kind::REGISTERED, |_, event| {
            info!("registered as {}", event.str("nick")?);
            Ok(())
        });

        session.on(kind::JOIN, |session, event| {
            let user = event.user("user")?;
            if session.current_nick().as_deref() == Some(user.nick.as_str()) {
                return Ok(());
            }
            session.say(event.str("channel")?, &format!("Hello, {}!", user.nick))?;
            Ok(())
        });

        session.on(kind::PART, |session, event| {
            let user = event.user("user")?;
            session.say(event.str("channel")?, &format!("{} left :(", user.nick))?;
            Ok(())
        });

        session.on_filtered(
            kind::PUBMESSAGE,
            |event| event.str("message").is_ok_and(|m| m.starts_with("!caps")),
            |session, event| {
                let caps = session.capabilities();
                session.say(event.str("to")?, &format!("{:?}", caps))?;
                Ok(())
            },
        );

        session.on_filtered(
            kind::PUBMESSAGE,
            |event| event.str("message").is_ok_and(|m| m.starts_with("!whois ")),
            |session, event| {
                let channel = event.str("to")?.to_string();
                let Some(nick) = event.str("message")?.split_whitespace().nth(1) else {
                    return Ok(());
                };
                User::from_nickname_with(session, nick, move |session, user| {
                    let reply = format!("{} is {}", user.nick, user.hostmask());
                    if let Err(e) = session.say(&channel, &reply) {
                        warn!("could not report WHOIS result: {}", e);
                    }
                })?;
                Ok(())
            },
        );

        session.on(kind::CTCP, |session, event| {
            let args = event.list("args")?;
            if event.str("command")?.eq_ignore_ascii_case("action")
                && args.iter().any(|a| a == "hugs")
            {
                let from = event.user("from")?;
                session.action(event.str("to")?, &format!("hugs {}", from.nick))?;
            }
            Ok(())
        });
    })
    .await?;

    let exit = client.wait().await;
    info!("connection ended: {:?}", exit);
    Ok(())
}
