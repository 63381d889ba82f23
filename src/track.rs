//! Channel and member state tracking.
//!
//! The tracker subscribes to the protocol event stream and maintains the
//! canonical view of every channel the connection references: membership,
//! per-member modes, channel modes, topic and its metadata, and whether we
//! are currently joined. It consumes events and returns follow-up actions
//! for the engine to perform — it never touches the socket itself.
//!
//! State it cannot trust is cleared: a disconnect wipes membership, modes
//! and joined flags everywhere, because continuity across a connectivity
//! gap cannot be guaranteed. Everything is rebuilt from NAMES and MODE
//! replies on rejoin.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::event::{Event, EventKind};
use crate::mode::{apply_mode_deltas, MemberMode};
use crate::registry::{MemberId, UserRegistry};

/// Follow-up work the engine should perform after an event is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerAction {
    /// Send a bare `MODE <channel>` query so the mode view gets populated.
    QueryModes(String),
}

/// Tracked state for one channel.
#[derive(Debug)]
pub struct Channel {
    /// Channel name, used verbatim as the key.
    pub name: String,
    /// Whether we are currently joined.
    pub joined: bool,
    /// Current topic text.
    pub topic: String,
    /// Who set the topic, when known.
    pub topic_by: Option<String>,
    /// Unix time the topic was set, when known.
    pub topic_time: Option<i64>,
    /// Current channel mode set.
    pub modes: BTreeSet<char>,
    members: HashMap<MemberId, BTreeSet<MemberMode>>,
    /// Set on self-join; makes the next NAMES chunk a reset instead of a
    /// merge, so an interrupted earlier join cannot leave stale members.
    awaiting_names: bool,
}

impl Channel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            joined: false,
            topic: String::new(),
            topic_by: None,
            topic_time: None,
            modes: BTreeSet::new(),
            members: HashMap::new(),
            awaiting_names: false,
        }
    }

    /// Member map: member handle to that member's mode set here.
    #[must_use]
    pub fn members(&self) -> &HashMap<MemberId, BTreeSet<MemberMode>> {
        &self.members
    }

    /// Whether the member is currently present.
    #[must_use]
    pub fn has_member(&self, id: MemberId) -> bool {
        self.members.contains_key(&id)
    }

    /// The member's mode set on this channel, if present.
    #[must_use]
    pub fn member_modes(&self, id: MemberId) -> Option<&BTreeSet<MemberMode>> {
        self.members.get(&id)
    }

    /// We left (or were removed from) the channel; nothing local is
    /// authoritative any more.
    fn clear_local_state(&mut self) {
        self.joined = false;
        self.topic.clear();
        self.topic_by = None;
        self.topic_time = None;
        self.modes.clear();
        self.members.clear();
        self.awaiting_names = false;
    }

    /// Connectivity gap: membership and modes are untrustworthy.
    fn clear_untrusted(&mut self) {
        self.joined = false;
        self.modes.clear();
        self.members.clear();
        self.awaiting_names = false;
    }
}

/// Event-driven channel/member state, resolving nicks through an external
/// [`UserRegistry`].
pub struct ChannelTracker {
    channels: HashMap<String, Channel>,
    registry: Box<dyn UserRegistry + Send>,
}

impl ChannelTracker {
    /// Create a tracker resolving identity through `registry`.
    #[must_use]
    pub fn new(registry: Box<dyn UserRegistry + Send>) -> Self {
        Self {
            channels: HashMap::new(),
            registry,
        }
    }

    /// Look up a tracked channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Iterate all tracked channels.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// The identity registry behind the tracker.
    #[must_use]
    pub fn registry(&self) -> &dyn UserRegistry {
        self.registry.as_ref()
    }

    /// Drop a channel record entirely. Records are otherwise only cleared,
    /// never deleted; removal is an explicit collaborator decision.
    pub fn remove_channel(&mut self, name: &str) -> bool {
        self.channels.remove(name).is_some()
    }

    fn chan_mut(&mut self, name: &str) -> &mut Channel {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(name))
    }

    /// Apply one event. `me` is our current nick, needed to recognize
    /// events about ourselves. Application is all-or-nothing per event;
    /// anomalies are logged and the event is skipped.
    pub fn apply(&mut self, event: &Event, me: &str) -> Vec<TrackerAction> {
        let mut actions = Vec::new();
        match &event.kind {
            EventKind::Joined { channel } => {
                let chan = self.chan_mut(channel);
                chan.joined = true;
                chan.awaiting_names = true;
                actions.push(TrackerAction::QueryModes(channel.clone()));
            }
            EventKind::ChannelJoin { channel, nick } => {
                let id = self.registry.resolve_or_create(nick);
                self.chan_mut(channel).members.entry(id).or_default();
            }
            EventKind::ChannelHasUsers { channel, users } => {
                // Resolve every nick before touching the channel so a bad
                // entry cannot leave a half-applied chunk behind.
                let resolved: Vec<(MemberId, Option<MemberMode>)> = users
                    .iter()
                    .map(|entry| (self.registry.resolve_or_create(&entry.nick), entry.mode))
                    .collect();
                let chan = self.chan_mut(channel);
                if chan.awaiting_names {
                    chan.members.clear();
                    chan.awaiting_names = false;
                }
                for (id, mode) in resolved {
                    let modes = chan.members.entry(id).or_default();
                    if let Some(mode) = mode {
                        modes.insert(mode);
                    }
                }
            }
            EventKind::ChannelPart { channel, nick, .. } => {
                self.remove_from_channel(channel, nick, me);
            }
            EventKind::ChannelKick { channel, who, .. } => {
                self.remove_from_channel(channel, who, me);
            }
            EventKind::Quit { nick, .. } => match self.registry.find(nick) {
                Some(id) => {
                    for chan in self.channels.values_mut() {
                        chan.members.remove(&id);
                    }
                }
                None => debug!(nick, "quit from unknown user"),
            },
            EventKind::ChannelTopicIs { channel, text } => {
                self.chan_mut(channel).topic = text.clone();
            }
            EventKind::ChannelTopicChanged {
                channel,
                nick,
                text,
            } => {
                let chan = self.chan_mut(channel);
                chan.topic = text.clone();
                chan.topic_by = Some(nick.clone());
            }
            EventKind::ChannelTopicMeta {
                channel,
                nick,
                set_at,
            } => {
                let chan = self.chan_mut(channel);
                chan.topic_by = Some(nick.clone());
                chan.topic_time = Some(*set_at);
            }
            EventKind::ChannelModesAre { channel, modes } => {
                self.chan_mut(channel).modes = modes.iter().copied().collect();
            }
            EventKind::ChannelModesChanged { channel, modes, .. } => {
                apply_mode_deltas(&mut self.chan_mut(channel).modes, modes);
            }
            EventKind::ChannelUserModesChanged {
                channel, changes, ..
            } => {
                let resolved: Vec<(MemberId, MemberMode, bool)> = changes
                    .iter()
                    .map(|c| (self.registry.resolve_or_create(&c.nick), c.mode, c.add))
                    .collect();
                let chan = self.chan_mut(channel);
                for (id, mode, add) in resolved {
                    let modes = chan.members.entry(id).or_default();
                    if add {
                        modes.insert(mode);
                    } else {
                        modes.remove(&mode);
                    }
                }
            }
            EventKind::Disconnected => {
                for chan in self.channels.values_mut() {
                    chan.clear_untrusted();
                }
            }
            // Informational only, or handled by the engine itself.
            _ => {}
        }
        actions
    }

    fn remove_from_channel(&mut self, channel: &str, nick: &str, me: &str) {
        if nick == me {
            self.chan_mut(channel).clear_local_state();
            return;
        }
        let Some(id) = self.registry.find(nick) else {
            warn!(channel, nick, "removal of unknown user, skipping");
            return;
        };
        if self.chan_mut(channel).members.remove(&id).is_none() {
            warn!(channel, nick, "removal of user not present on channel");
        }
    }
}

impl std::fmt::Debug for ChannelTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTracker")
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}
