//! Connection settings for [`connect`](crate::connect).

use std::time::Duration;

/// Default cap on a single line, in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LEN: usize = 8191;

/// Default number of consecutive transient read errors tolerated.
pub const DEFAULT_MAX_READ_RETRIES: u32 = 5;

/// Everything needed to open and register a client connection.
///
/// ```
/// use slirc_events::ClientConfig;
///
/// let config = ClientConfig::new("irc.libera.chat", 6667, "hugbot")
///     .with_realname("hugs people")
///     .with_autojoin(["#hugs"]);
/// assert_eq!(config.user, "hugbot");
/// assert_eq!(config.address(), "irc.libera.chat:6667");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub nick: String,
    /// Ident sent in USER. Defaults to the nick.
    pub user: String,
    pub realname: String,
    /// Server password, sent as PASS before USER.
    pub password: Option<String>,
    /// Channels joined once the server welcomes us.
    pub autojoin: Vec<String>,
    /// Answer to CTCP VERSION.
    pub version: String,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, nick: impl Into<String>) -> Self {
        let nick = nick.into();
        Self {
            host: host.into(),
            port,
            user: nick.clone(),
            realname: nick.clone(),
            nick,
            ..Self::default()
        }
    }

    /// `host:port`, suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_realname(mut self, realname: impl Into<String>) -> Self {
        self.realname = realname.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_autojoin<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.autojoin.extend(channels.into_iter().map(Into::into));
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6667,
            nick: "slirc".to_string(),
            user: "slirc".to_string(),
            realname: "slirc".to_string(),
            password: None,
            autojoin: Vec::new(),
            version: default_version(),
            transport: TransportConfig::default(),
        }
    }
}

/// The CTCP VERSION reply used when none is configured.
pub fn default_version() -> String {
    concat!("slirc-events ", env!("CARGO_PKG_VERSION")).to_string()
}

/// Reader limits and retry policy.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportConfig {
    /// Longest accepted line in bytes; longer lines are discarded.
    pub max_line_len: usize,
    /// Consecutive transient read errors tolerated before giving up.
    pub max_read_retries: u32,
    /// First retry delay; doubles on each consecutive failure.
    pub initial_backoff: Duration,
    /// Upper bound for the retry delay.
    pub max_backoff: Duration,
    /// Enable TCP keepalive on connect.
    pub keepalive: bool,
}

impl TransportConfig {
    /// Delay before retry number `attempt` (starting at 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_max_read_retries(mut self, retries: u32) -> Self {
        self.max_read_retries = retries;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_read_retries: DEFAULT_MAX_READ_RETRIES,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(5),
            keepalive: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_user_and_realname_to_nick() {
        let config = ClientConfig::new("irc.example.net", 6697, "bot");
        assert_eq!(config.user, "bot");
        assert_eq!(config.realname, "bot");
        assert_eq!(config.password, None);
        assert!(config.version.starts_with("slirc-events "));
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new("h", 1, "n")
            .with_user("ident")
            .with_password("hunter2")
            .with_autojoin(vec!["#a", "#b"])
            .with_autojoin(["#c"])
            .with_version("bot 1.0");
        assert_eq!(config.user, "ident");
        assert_eq!(config.password.as_deref(), Some("hunter2"));
        assert_eq!(config.autojoin, vec!["#a", "#b", "#c"]);
        assert_eq!(config.version, "bot 1.0");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let transport = TransportConfig::default();
        assert_eq!(transport.backoff(1), Duration::from_millis(50));
        assert_eq!(transport.backoff(2), Duration::from_millis(100));
        assert_eq!(transport.backoff(3), Duration::from_millis(200));
        assert_eq!(transport.backoff(10), Duration::from_secs(5));
        assert_eq!(transport.backoff(64), Duration::from_secs(5));
    }
}
