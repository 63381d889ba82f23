//! Structural parse of one IRC line.
//!
//! This layer splits a decoded line into its wire-grammar pieces —
//! `[@tags] [:prefix] COMMAND param1 param2 ... [:trailing]` — without
//! assigning any meaning to the command. Interpretation into protocol
//! events happens in [`crate::parser`].
//!
//! Built on nom for zero-copy borrows into the input line. IRCv3 tags are
//! accepted and skipped: this engine never requests capabilities, but some
//! servers prepend tags regardless.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    sequence::preceded,
    IResult,
};

/// One structurally parsed IRC line, borrowing from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// Prefix (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command token, verbatim (`PRIVMSG`, `332`, ...).
    pub command: &'a str,
    /// Positional middle parameters, excluding the trailing parameter.
    pub params: Vec<&'a str>,
    /// The trailing parameter (after ` :`), which may contain spaces.
    pub trailing: Option<&'a str>,
}

/// The sender extracted from a line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin<'a> {
    /// Nick part of `nick!ident@host`; `None` for server-origin prefixes.
    pub nick: Option<&'a str>,
    /// `ident@host` when a nick is present, otherwise the whole prefix.
    pub host: &'a str,
}

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

fn parse_command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric())(input)
}

impl<'a> RawLine<'a> {
    /// Parse one decoded line. Returns `None` for anything that does not
    /// match the wire grammar; the caller decides whether that is worth a
    /// log line.
    #[must_use]
    pub fn parse(input: &'a str) -> Option<Self> {
        let (input, _tags) = opt(parse_tags)(input).ok()?;
        let (input, _) = space0::<_, nom::error::Error<&str>>(input).ok()?;
        let (input, prefix) = opt(parse_prefix)(input).ok()?;
        let (input, _) = space0::<_, nom::error::Error<&str>>(input).ok()?;
        let (input, command) = parse_command(input).ok()?;

        let mut params = Vec::new();
        let mut trailing = None;
        let mut rest = input;

        while let Some(stripped) = rest.strip_prefix(' ') {
            rest = stripped;
            if let Some(after_colon) = rest.strip_prefix(':') {
                let end = after_colon
                    .find(['\r', '\n'])
                    .unwrap_or(after_colon.len());
                trailing = Some(&after_colon[..end]);
                break;
            }
            let mut end = rest.len();
            for stop in [' ', '\r', '\n'] {
                if let Some(i) = rest.find(stop) {
                    end = end.min(i);
                }
            }
            let param = &rest[..end];
            if param.is_empty() {
                break;
            }
            params.push(param);
            rest = &rest[end..];
        }

        Some(Self {
            prefix,
            command,
            params,
            trailing,
        })
    }

    /// Positional parameter by index.
    #[must_use]
    pub fn arg(&self, i: usize) -> Option<&'a str> {
        self.params.get(i).copied()
    }

    /// The trailing parameter if present, otherwise the last positional one.
    /// IRC servers are split on which form they use for reasons and topics.
    #[must_use]
    pub fn text(&self) -> Option<&'a str> {
        self.trailing.or_else(|| self.params.last().copied())
    }

    /// Join positional params from `from` onward plus the trailing text.
    /// Used for the free-text numerics (004, 005, 251-255).
    #[must_use]
    pub fn joined_from(&self, from: usize) -> String {
        let mut parts: Vec<&str> = self.params.iter().skip(from).copied().collect();
        if let Some(t) = self.trailing {
            parts.push(t);
        }
        parts.join(" ")
    }

    /// Extract the sending nick/host from the prefix.
    #[must_use]
    pub fn origin(&self) -> Option<Origin<'a>> {
        let prefix = self.prefix?;
        match prefix.find('!') {
            Some(i) => Some(Origin {
                nick: Some(&prefix[..i]),
                host: &prefix[i + 1..],
            }),
            None => Some(Origin {
                nick: None,
                host: prefix,
            }),
        }
    }
}
