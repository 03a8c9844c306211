//! Client-To-Client Protocol framing.
//!
//! A CTCP body is PRIVMSG or NOTICE text wrapped in `\x01` on both ends:
//! `\x01VERSION\x01`, `\x01ACTION waves\x01`. Requests travel as PRIVMSG and
//! replies as NOTICE.

/// The CTCP delimiter byte.
pub const DELIM: char = '\x01';

/// A borrowed CTCP body split into command and parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// Command word as sent, e.g. `VERSION` or `ACTION`.
    pub command: &'a str,
    /// Everything after the command word, possibly empty.
    pub params: &'a str,
}

impl<'a> Ctcp<'a> {
    /// Parse message text. Returns `None` unless the text is wrapped in
    /// delimiters and names a command.
    pub fn parse(text: &'a str) -> Option<Self> {
        let inner = text.strip_prefix(DELIM)?.strip_suffix(DELIM)?;
        let (command, params) = inner.split_once(' ').unwrap_or((inner, ""));
        if command.is_empty() {
            return None;
        }
        Some(Ctcp { command, params })
    }

    /// Whitespace-separated parameters.
    pub fn args(&self) -> Vec<String> {
        self.params.split_whitespace().map(str::to_string).collect()
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }
}

/// Wrap `body` in CTCP delimiters.
pub fn wrap(body: &str) -> String {
    format!("{DELIM}{body}{DELIM}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_without_params() {
        let ctcp = Ctcp::parse("\x01VERSION\x01").unwrap();
        assert_eq!(ctcp.command, "VERSION");
        assert_eq!(ctcp.params, "");
        assert!(ctcp.args().is_empty());
    }

    #[test]
    fn test_parse_action() {
        let ctcp = Ctcp::parse("\x01ACTION hugs hugbot\x01").unwrap();
        assert!(ctcp.is("action"));
        assert_eq!(ctcp.params, "hugs hugbot");
        assert_eq!(ctcp.args(), vec!["hugs", "hugbot"]);
    }

    #[test]
    fn test_plain_text_is_not_ctcp() {
        assert!(Ctcp::parse("hello").is_none());
        assert!(Ctcp::parse("\x01unterminated").is_none());
        assert!(Ctcp::parse("\x01").is_none());
        assert!(Ctcp::parse("\x01\x01").is_none());
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("PING 123"), "\x01PING 123\x01");
    }
}
