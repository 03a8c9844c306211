//! Server capabilities advertised through RPL_ISUPPORT (005).
//!
//! Each 005 line carries our nick, a run of `KEY` or `KEY=VALUE` tokens and a
//! closing human-readable sentence. Tokens accumulate across lines; a later
//! token for the same key overwrites the earlier one.

use std::collections::HashMap;

/// A single ISUPPORT value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capability {
    /// `KEY=VALUE`.
    Value(String),
    /// Bare `KEY`.
    Flag,
}

/// Lower-cased ISUPPORT key to value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities {
    entries: HashMap<String, Capability>,
}

impl Capabilities {
    /// An empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every token of an `irc-005` argument list.
    ///
    /// The first argument (our nick) and a final free-text argument
    /// (detected by containing a space) are not tokens and are skipped.
    pub fn apply_isupport(&mut self, args: &[String]) {
        let mut tokens = args.get(1..).unwrap_or_default();
        if let Some(last) = tokens.last() {
            if last.contains(' ') {
                tokens = &tokens[..tokens.len() - 1];
            }
        }
        for token in tokens {
            self.insert_token(token);
        }
    }

    /// Record one `KEY` or `KEY=VALUE` token.
    pub fn insert_token(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        let (key, value) = match token.split_once('=') {
            Some((key, value)) => (key, Capability::Value(value.to_string())),
            None => (token, Capability::Flag),
        };
        self.entries.insert(key.to_ascii_lowercase(), value);
    }

    /// Look up a key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&Capability> {
        self.entries.get(&key.to_ascii_lowercase())
    }

    /// The value of a `KEY=VALUE` token, if one was seen.
    pub fn value(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Capability::Value(v) => Some(v.as_str()),
            Capability::Flag => None,
        }
    }

    /// Whether the server advertised `key` in either form.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn chantypes(&self) -> Option<&str> {
        self.value("chantypes")
    }

    pub fn statusmsg(&self) -> Option<&str> {
        self.value("statusmsg")
    }

    pub fn network(&self) -> Option<&str> {
        self.value("network")
    }

    /// Membership symbols from `PREFIX=(modes)symbols`, e.g. `@+` for `(ov)@+`.
    pub fn prefix_symbols(&self) -> Option<&str> {
        let prefix = self.value("prefix")?;
        let symbols = match prefix.find(')') {
            Some(close) if prefix.starts_with('(') => &prefix[close + 1..],
            _ => prefix,
        };
        (!symbols.is_empty()).then_some(symbols)
    }

    /// Whether a message target names a channel.
    ///
    /// With `CHANTYPES` known, the first character must be one of its
    /// symbols; otherwise a leading `#` marks a channel. A leading
    /// `STATUSMSG` symbol (as in `@#ops`) also counts as a channel target.
    pub fn is_channel(&self, target: &str) -> bool {
        let Some(first) = target.chars().next() else {
            return false;
        };
        let by_type = match self.chantypes() {
            Some(types) => types.contains(first),
            None => first == '#',
        };
        by_type || self.statusmsg().is_some_and(|s| s.contains(first))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Capability)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
