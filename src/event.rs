//! Protocol events.
//!
//! Every line the parser understands becomes exactly one [`EventKind`],
//! constructed explicitly at its raising site with named fields. Events are
//! immutable once built and are delivered synchronously, in arrival order,
//! to every subscriber (see [`crate::dispatch`]).

use chrono::{DateTime, Utc};

use crate::mode::{MemberMode, MemberModeChange};

/// A protocol event plus the moment it was raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// When the engine raised it.
    pub time: DateTime<Utc>,
}

impl Event {
    /// Wrap an [`EventKind`] with the current timestamp.
    #[must_use]
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            time: Utc::now(),
        }
    }
}

/// One entry of a NAMES (353) reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamesEntry {
    /// The nick with any mode glyph stripped.
    pub nick: String,
    /// Mode implied by the glyph (`@` op, `+` voice), if any.
    pub mode: Option<MemberMode>,
}

/// Everything the engine can observe on (or about) the connection.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EventKind {
    /// The socket connected and registration was sent.
    Connected,
    /// The socket closed, deliberately or not.
    Disconnected,
    /// End of MOTD reached; the connection is fully usable.
    Ready,
    /// Keepalive gave up on the server.
    ConnectionTimeout,

    /// Server PING; the engine answers with PONG.
    Ping { payload: String },
    /// Server PONG, ending an outstanding keepalive probe.
    Pong { payload: Option<String> },
    /// The server signalled connection throttling (ERROR text or 465).
    ConnectThrottled { reason: String },
    /// 433: the desired nick is taken.
    NickInUse { nick: String, text: String },

    /// 001-004 welcome lines.
    WelcomeInfo { text: String },
    /// 005 ISUPPORT line.
    SupportInfo { text: String },
    /// 251-255 lusers summary lines.
    ServerInfo { text: String },
    /// 020 connection-processing notice.
    ProcessingConnection { text: String },
    /// 042 unique client id.
    YourId { id: String, text: String },
    /// 375/372 MOTD line.
    MotdLine { text: String },
    /// 376/422: MOTD over (or absent).
    EndOfMotd,
    /// 311 WHOIS reply carrying `ident@host`.
    WhoisHostname { nick: String, hostname: String },

    /// PRIVMSG to a channel or to us.
    Privmsg {
        nick: String,
        target: String,
        text: String,
    },
    /// NOTICE; `nick` is `None` for prefix-less server notices.
    Notice {
        nick: Option<String>,
        target: String,
        text: String,
    },
    /// A user quit the server.
    Quit { nick: String, reason: String },
    /// A user (possibly us) changed nick.
    NickChanged { nick: String, new_nick: String },
    /// MODE targeted at our own nick.
    MyModesChanged { modes: String },

    /// We joined a channel.
    Joined { channel: String },
    /// Someone else joined a channel.
    ChannelJoin { channel: String, nick: String },
    /// A user left a channel.
    ChannelPart {
        channel: String,
        nick: String,
        reason: Option<String>,
    },
    /// A user was kicked from a channel.
    ChannelKick {
        channel: String,
        who: String,
        kicked_by: String,
        reason: String,
    },
    /// 332: topic as reported on join/query.
    ChannelTopicIs { channel: String, text: String },
    /// TOPIC: topic changed live.
    ChannelTopicChanged {
        channel: String,
        nick: String,
        text: String,
    },
    /// 333: who set the topic and when (unix time).
    ChannelTopicMeta {
        channel: String,
        nick: String,
        set_at: i64,
    },
    /// 329: channel creation time. Parsed but ignored by the tracker.
    ChannelCreationTime { channel: String, timestamp: String },
    /// 324: full channel mode set.
    ChannelModesAre { channel: String, modes: Vec<char> },
    /// MODE on a channel without nick arguments: raw modestring delta.
    ChannelModesChanged {
        channel: String,
        modes: String,
        by: String,
    },
    /// MODE on a channel with nick arguments: decoded per-user deltas.
    ChannelUserModesChanged {
        channel: String,
        changes: Vec<MemberModeChange>,
        by: String,
    },
    /// 353: one chunk of a NAMES reply.
    ChannelHasUsers {
        channel: String,
        users: Vec<NamesEntry>,
    },
    /// 366: end of NAMES. Ignored by the tracker.
    EndOfNames { channel: String },
    /// 473: the channel is invite-only.
    ChannelInviteOnly { channel: String, text: String },
    /// 475: the channel needs a key.
    ChannelNeedsPassword { channel: String, text: String },
}
