//! Channel and member mode machinery.
//!
//! Channel modes are untyped single characters (`t`, `n`, `s`, ...) held in
//! a set; member modes are the per-user flags a channel grants (`o` op,
//! `v` voice). Both change only through explicit `+`/`-` deltas or a
//! full-state replace — nothing is ever inferred.

use std::collections::BTreeSet;

enum PlusMinus {
    Plus,
    Minus,
}

/// A per-member channel mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberMode {
    /// Channel operator (`+o`, NAMES glyph `@`).
    Op,
    /// Voice (`+v`, NAMES glyph `+`).
    Voice,
    /// Any other single-character member mode a server hands out.
    Other(char),
}

impl MemberMode {
    /// Interpret a modestring character (`o`, `v`, ...).
    #[must_use]
    pub fn from_char(c: char) -> Self {
        match c {
            'o' => Self::Op,
            'v' => Self::Voice,
            other => Self::Other(other),
        }
    }

    /// Interpret a NAMES glyph (`@`, `+`). Anything else is not a glyph.
    #[must_use]
    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '@' => Some(Self::Op),
            '+' => Some(Self::Voice),
            _ => None,
        }
    }

    /// The modestring character for this mode.
    #[must_use]
    pub fn as_char(&self) -> char {
        match self {
            Self::Op => 'o',
            Self::Voice => 'v',
            Self::Other(c) => *c,
        }
    }
}

/// Split a NAMES entry into its optional mode glyph and the bare nick.
#[must_use]
pub fn strip_glyph(raw_nick: &str) -> (Option<MemberMode>, &str) {
    let mut chars = raw_nick.chars();
    match chars.next().and_then(MemberMode::from_glyph) {
        Some(mode) => (Some(mode), chars.as_str()),
        None => (None, raw_nick),
    }
}

/// One decoded `+`/`-` delta against one member's mode set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberModeChange {
    /// The affected nick.
    pub nick: String,
    /// The mode being granted or revoked.
    pub mode: MemberMode,
    /// `true` for `+`, `false` for `-`.
    pub add: bool,
}

/// Decode `MODE <chan> <modestring> <nick>...` into per-member deltas.
///
/// Walks the modestring left to right; `+`/`-` toggles the active operation
/// (default `+`); every other character pairs with the next unconsumed nick
/// argument. When the server supplies fewer nicks than mode characters the
/// last nick is reused for the remainder rather than failing — a malformed
/// line must never take the engine down.
#[must_use]
pub fn decode_user_mode_deltas(modestring: &str, nicks: &[&str]) -> Vec<MemberModeChange> {
    use self::PlusMinus::*;

    let mut changes = Vec::new();
    if nicks.is_empty() {
        return changes;
    }

    let mut op = Plus;
    let mut next_arg = 0usize;
    for c in modestring.chars() {
        match c {
            '+' => op = Plus,
            '-' => op = Minus,
            _ => {
                let nick = nicks[next_arg.min(nicks.len() - 1)];
                changes.push(MemberModeChange {
                    nick: nick.to_string(),
                    mode: MemberMode::from_char(c),
                    add: matches!(op, Plus),
                });
                next_arg += 1;
            }
        }
    }
    changes
}

/// Apply a channel modestring delta (`+s-n`) to a mode set.
///
/// Idempotent: adding a present mode or removing an absent one is a no-op.
pub fn apply_mode_deltas(modes: &mut BTreeSet<char>, modestring: &str) {
    use self::PlusMinus::*;

    let mut op = Plus;
    for c in modestring.chars() {
        match c {
            '+' => op = Plus,
            '-' => op = Minus,
            _ => {
                match op {
                    Plus => modes.insert(c),
                    Minus => modes.remove(&c),
                };
            }
        }
    }
}
