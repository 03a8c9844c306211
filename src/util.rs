//! Utility functions for outgoing text handling.
//!
//! Long `PRIVMSG` bodies are split on character boundaries so that each
//! chunk stays well inside the 512-byte IRC line limit once the command,
//! target and server-added prefix are accounted for.

/// Messages with at least this many characters are split by `say`.
pub const SPLIT_THRESHOLD: usize = 450;

/// Maximum characters per chunk when a message is split.
pub const CHUNK_CHARS: usize = 400;

/// Truncates a string to at most `max_chars` characters.
///
/// Counts Unicode codepoints rather than bytes, so a multi-byte
/// character is never cut in half.
///
/// # Examples
///
/// ```
/// use slirc_events::util::truncate_chars;
///
/// assert_eq!(truncate_chars("hello", 3), "hel");
/// assert_eq!(truncate_chars("héllo", 3), "hél");
/// assert_eq!(truncate_chars("👋🌍🚀", 2), "👋🌍");
/// ```
#[inline]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Splits a message into successive chunks of at most `max_chars`
/// characters. Concatenating the chunks yields the input.
///
/// # Examples
///
/// ```
/// use slirc_events::util::split_chars;
///
/// let chunks: Vec<_> = split_chars("Hello World! This is a test.", 10).collect();
/// assert_eq!(chunks, vec!["Hello Worl", "d! This is", " a test."]);
/// ```
pub fn split_chars(s: &str, max_chars: usize) -> impl Iterator<Item = &str> {
    SplitChars {
        remaining: s,
        max_chars: max_chars.max(1),
    }
}

/// Returns the chunks `say` sends for `message`: the message itself when
/// it is shorter than [`SPLIT_THRESHOLD`], otherwise [`CHUNK_CHARS`]-sized
/// pieces in order.
pub fn say_chunks(message: &str) -> Vec<&str> {
    if message.chars().count() < SPLIT_THRESHOLD {
        vec![message]
    } else {
        split_chars(message, CHUNK_CHARS).collect()
    }
}

/// True when `s` would break the line framing if written verbatim.
#[inline]
pub fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

struct SplitChars<'a> {
    remaining: &'a str,
    max_chars: usize,
}

impl<'a> Iterator for SplitChars<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let chunk = truncate_chars(self.remaining, self.max_chars);
        self.remaining = &self.remaining[chunk.len()..];
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("日本語", 2), "日本");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_split_chars() {
        let chunks: Vec<_> = split_chars("hello world", 5).collect();
        assert_eq!(chunks, vec!["hello", " worl", "d"]);

        let chunks: Vec<_> = split_chars("日本語テスト", 2).collect();
        assert_eq!(chunks, vec!["日本", "語テ", "スト"]);

        assert!(split_chars("", 5).next().is_none());
    }

    #[test]
    fn test_say_chunks_below_threshold_is_single() {
        let msg = "x".repeat(SPLIT_THRESHOLD - 1);
        assert_eq!(say_chunks(&msg), vec![msg.as_str()]);
    }

    #[test]
    fn test_say_chunks_at_threshold_splits() {
        let msg = "x".repeat(SPLIT_THRESHOLD);
        let chunks = say_chunks(&msg);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), CHUNK_CHARS);
        assert_eq!(chunks[1].chars().count(), SPLIT_THRESHOLD - CHUNK_CHARS);
    }

    #[test]
    fn test_say_chunks_counts_characters_not_bytes() {
        // 449 three-byte characters stay in one message.
        let msg = "€".repeat(SPLIT_THRESHOLD - 1);
        assert_eq!(say_chunks(&msg).len(), 1);
    }

    #[test]
    fn test_has_line_break() {
        assert!(has_line_break("a\nb"));
        assert!(has_line_break("a\r"));
        assert!(!has_line_break("plain text"));
    }
}
