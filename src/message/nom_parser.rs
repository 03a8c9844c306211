//! Nom-based IRC line scanner.
//!
//! The grammar is applied in a fixed order:
//!
//! ```text
//! [:prefix SP] command-and-middle [SP ":" trailing]
//! ```
//!
//! 1. A leading `:` introduces a prefix that runs up to the first space.
//! 2. The first `" :"` in the remainder separates the trailing argument.
//! 3. The part before it is split on spaces into command and middle args.
//! 4. Every argument is trimmed.

use nom::{
    bytes::complete::{tag, take_till, take_until},
    character::complete::char,
    error::{context, VerboseError},
    sequence::{delimited, terminated},
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Parse the message prefix: the text after `:` and before the first space.
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        delimited(char(':'), take_till(|c| c == ' '), char(' ')),
    )(input)
}

/// Split off the trailing argument introduced by the first `" :"`.
fn parse_head(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing command and middle arguments",
        terminated(take_until(" :"), tag(" :")),
    )(input)
}

/// A scanned line with borrowed components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    /// Prefix without the leading `:`; empty when the line had none.
    pub prefix: &'a str,
    /// Command token exactly as it appeared.
    pub command: &'a str,
    /// Middle arguments followed by the trailing argument, each trimmed.
    pub args: Vec<&'a str>,
}

impl<'a> ParsedLine<'a> {
    /// Scan a single line. Line terminators are ignored.
    pub fn parse(line: &'a str) -> Result<Self, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let (prefix, rest) = if line.starts_with(':') {
            match parse_prefix(line) {
                Ok((rest, prefix)) => (prefix, rest.trim()),
                Err(_) => return Err(MessageParseError::MissingCommand(line[1..].to_string())),
            }
        } else {
            ("", line)
        };

        let (head, trailing) = match parse_head(rest) {
            Ok((trailing, head)) => (head, Some(trailing)),
            Err(_) => (rest, None),
        };

        let mut tokens = head.trim().split(' ').filter(|t| !t.is_empty());
        let command = match tokens.next() {
            Some(command) => command,
            None if trailing.is_none() => {
                return Err(MessageParseError::MissingCommand(prefix.to_string()))
            }
            None => return Err(MessageParseError::InvalidCommand(rest.to_string())),
        };
        if command.starts_with(':') {
            return Err(MessageParseError::InvalidCommand(command.to_string()));
        }

        let args = tokens
            .chain(trailing)
            .map(str::trim)
            .collect::<Vec<_>>();

        Ok(ParsedLine {
            prefix,
            command,
            args,
        })
    }
}
