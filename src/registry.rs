//! User registry boundary.
//!
//! The state tracker never invents member identity: every nick it sees is
//! resolved through a [`UserRegistry`] into an opaque [`MemberId`]. The
//! registry usually belongs to the embedding bot (accounts, permissions,
//! hostnames live there); [`MemoryRegistry`] is a plain interning
//! implementation for embedders without one, and for tests.

use std::collections::HashMap;

/// Opaque handle to a user in the embedder's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u64);

/// Lookup capability the channel tracker requires.
pub trait UserRegistry {
    /// Return the member for `nick`, creating it on first sight.
    fn resolve_or_create(&mut self, nick: &str) -> MemberId;

    /// Return the member for `nick` if it is already known.
    fn find(&self, nick: &str) -> Option<MemberId>;
}

/// In-memory nick-interning registry.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    by_nick: HashMap<String, MemberId>,
    nicks: Vec<String>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The nick a member was registered under.
    #[must_use]
    pub fn nick_of(&self, id: MemberId) -> Option<&str> {
        self.nicks.get(id.0 as usize).map(String::as_str)
    }
}

impl UserRegistry for MemoryRegistry {
    fn resolve_or_create(&mut self, nick: &str) -> MemberId {
        if let Some(id) = self.by_nick.get(nick) {
            return *id;
        }
        let id = MemberId(self.nicks.len() as u64);
        self.nicks.push(nick.to_string());
        self.by_nick.insert(nick.to_string(), id);
        id
    }

    fn find(&self, nick: &str) -> Option<MemberId> {
        self.by_nick.get(nick).copied()
    }
}
