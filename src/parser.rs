//! Protocol parser: one decoded line in, one [`EventKind`] out.
//!
//! The grammar split lives in [`crate::message`]; this module assigns
//! meaning. Three branches, tried in order: connection-level lines without
//! a prefix (PING/PONG/ERROR/NOTICE), textual commands from a prefixed
//! sender (JOIN, PART, MODE, ...), and three-digit numeric replies.
//!
//! Anything unrecognized yields `None`. That is not an error: servers emit
//! plenty of numerics this engine has no use for, and an unknown line must
//! never take the connection down. The caller logs and moves on.

use crate::event::{EventKind, NamesEntry};
use crate::message::RawLine;
use crate::mode::{decode_user_mode_deltas, strip_glyph};

/// Textual commands the parser understands (matched case-insensitively).
const TEXT_COMMANDS: [&str; 11] = [
    "ping", "pong", "join", "part", "kick", "topic", "quit", "privmsg", "nick", "mode", "notice",
];

/// ERROR-line substrings that mean the server is throttling us.
const THROTTLE_INDICATORS: [&str; 3] = [":closing link:", "throttled", "g-lined"];

/// Parse one line into a protocol event. `None` means unparsed.
///
/// `current_nick` is needed to tell a self-join from someone else's join
/// and a channel MODE from one aimed at us.
#[must_use]
pub fn parse_line(line: &str, current_nick: &str) -> Option<EventKind> {
    let raw = RawLine::parse(line)?;

    if raw.prefix.is_none() {
        return parse_connection_level(&raw, line);
    }

    if let Ok(numeric) = raw.command.parse::<u16>() {
        return parse_numeric(numeric, &raw);
    }

    parse_text_command(&raw, current_nick)
}

/// Prefix-less lines the server sends about the connection itself.
fn parse_connection_level(raw: &RawLine<'_>, line: &str) -> Option<EventKind> {
    match raw.command.to_ascii_lowercase().as_str() {
        "ping" => Some(EventKind::Ping {
            payload: text_of(raw),
        }),
        "pong" => Some(EventKind::Pong {
            payload: raw.text().map(str::to_string),
        }),
        "error" => {
            let lowered = line.to_lowercase();
            if THROTTLE_INDICATORS.iter().any(|ind| lowered.contains(ind)) {
                Some(EventKind::ConnectThrottled {
                    reason: text_of(raw),
                })
            } else {
                // ERROR without a throttle indicator carries no event; the
                // server closes the socket and the read path notices.
                None
            }
        }
        "notice" => Some(EventKind::Notice {
            nick: None,
            target: raw.arg(0)?.to_string(),
            text: text_of(raw),
        }),
        _ => None,
    }
}

/// Prefixed textual commands.
fn parse_text_command(raw: &RawLine<'_>, current_nick: &str) -> Option<EventKind> {
    let command = raw.command.to_ascii_lowercase();
    if !TEXT_COMMANDS.contains(&command.as_str()) {
        return None;
    }
    let origin = raw.origin()?;
    let nick = origin.nick.unwrap_or_default().to_string();

    match command.as_str() {
        "ping" => Some(EventKind::Ping {
            payload: text_of(raw),
        }),
        "pong" => Some(EventKind::Pong {
            payload: raw.text().map(str::to_string),
        }),
        "join" => {
            let channel = raw.trailing.or_else(|| raw.arg(0))?.to_string();
            if nick == current_nick {
                Some(EventKind::Joined { channel })
            } else {
                Some(EventKind::ChannelJoin { channel, nick })
            }
        }
        "part" => {
            let channel = raw.trailing.or_else(|| raw.arg(0))?.to_string();
            Some(EventKind::ChannelPart {
                channel,
                nick,
                reason: raw.trailing.map(str::to_string),
            })
        }
        "kick" => Some(EventKind::ChannelKick {
            channel: raw.arg(0)?.to_string(),
            who: raw.arg(1)?.to_string(),
            kicked_by: nick,
            reason: raw.trailing.unwrap_or_default().to_string(),
        }),
        "topic" => Some(EventKind::ChannelTopicChanged {
            channel: raw.arg(0)?.to_string(),
            nick,
            text: text_of(raw),
        }),
        "privmsg" => Some(EventKind::Privmsg {
            nick,
            target: raw.arg(0)?.to_string(),
            text: text_of(raw),
        }),
        "notice" => Some(EventKind::Notice {
            nick: origin.nick.map(str::to_string),
            target: raw.arg(0)?.to_string(),
            text: text_of(raw),
        }),
        "quit" => Some(EventKind::Quit {
            nick,
            reason: text_of(raw),
        }),
        "nick" => Some(EventKind::NickChanged {
            nick,
            new_nick: raw.trailing.or_else(|| raw.arg(0))?.to_string(),
        }),
        "mode" => parse_mode(raw, current_nick, nick),
        _ => None,
    }
}

fn parse_mode(raw: &RawLine<'_>, current_nick: &str, by: String) -> Option<EventKind> {
    let target = raw.arg(0)?;
    let modestring = raw.arg(1).or(raw.trailing)?.to_string();

    if target == current_nick {
        return Some(EventKind::MyModesChanged { modes: modestring });
    }

    let nick_args: Vec<&str> = raw.params.iter().skip(2).copied().collect();
    if nick_args.is_empty() {
        Some(EventKind::ChannelModesChanged {
            channel: target.to_string(),
            modes: modestring,
            by,
        })
    } else {
        Some(EventKind::ChannelUserModesChanged {
            channel: target.to_string(),
            changes: decode_user_mode_deltas(&modestring, &nick_args),
            by,
        })
    }
}

/// Three-digit numeric replies. The first positional param is our own nick
/// and is skipped everywhere.
fn parse_numeric(numeric: u16, raw: &RawLine<'_>) -> Option<EventKind> {
    match numeric {
        1..=3 => Some(EventKind::WelcomeInfo { text: text_of(raw) }),
        4 => Some(EventKind::WelcomeInfo {
            text: raw.joined_from(1),
        }),
        5 => Some(EventKind::SupportInfo {
            text: raw.joined_from(1),
        }),
        20 => Some(EventKind::ProcessingConnection { text: text_of(raw) }),
        42 => Some(EventKind::YourId {
            id: raw.arg(1)?.to_string(),
            text: text_of(raw),
        }),
        251..=255 => Some(EventKind::ServerInfo {
            text: raw.joined_from(1),
        }),
        311 => Some(EventKind::WhoisHostname {
            nick: raw.arg(1)?.to_string(),
            hostname: format!("{}@{}", raw.arg(2)?, raw.arg(3)?),
        }),
        324 => Some(EventKind::ChannelModesAre {
            channel: raw.arg(1)?.to_string(),
            modes: raw.arg(2)?.chars().filter(|c| *c != '+').collect(),
        }),
        329 => Some(EventKind::ChannelCreationTime {
            channel: raw.arg(1)?.to_string(),
            timestamp: raw.arg(2)?.to_string(),
        }),
        332 => Some(EventKind::ChannelTopicIs {
            channel: raw.arg(1)?.to_string(),
            text: text_of(raw),
        }),
        333 => Some(EventKind::ChannelTopicMeta {
            channel: raw.arg(1)?.to_string(),
            nick: raw.arg(2)?.to_string(),
            set_at: raw.arg(3)?.parse().ok()?,
        }),
        353 => Some(EventKind::ChannelHasUsers {
            channel: raw.arg(2)?.to_string(),
            users: raw
                .trailing?
                .split_whitespace()
                .map(|raw_nick| {
                    let (mode, nick) = strip_glyph(raw_nick);
                    NamesEntry {
                        nick: nick.to_string(),
                        mode,
                    }
                })
                .collect(),
        }),
        366 => Some(EventKind::EndOfNames {
            channel: raw.arg(1)?.to_string(),
        }),
        372 | 375 => Some(EventKind::MotdLine { text: text_of(raw) }),
        376 | 422 => Some(EventKind::EndOfMotd),
        433 => Some(EventKind::NickInUse {
            nick: raw.arg(1)?.to_string(),
            text: text_of(raw),
        }),
        465 => Some(EventKind::ConnectThrottled {
            reason: text_of(raw),
        }),
        473 => Some(EventKind::ChannelInviteOnly {
            channel: raw.arg(1)?.to_string(),
            text: text_of(raw),
        }),
        475 => Some(EventKind::ChannelNeedsPassword {
            channel: raw.arg(1)?.to_string(),
            text: text_of(raw),
        }),
        _ => None,
    }
}

fn text_of(raw: &RawLine<'_>) -> String {
    raw.text().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{MemberMode, MemberModeChange};

    const ME: &str = "perch";

    #[test]
    fn test_ping() {
        assert_eq!(
            parse_line("PING :abc", ME),
            Some(EventKind::Ping {
                payload: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_error_throttled() {
        let event = parse_line(
            "ERROR :Your host is trying to (re)connect too fast -- throttled",
            ME,
        );
        assert!(matches!(event, Some(EventKind::ConnectThrottled { .. })));

        let event = parse_line("ERROR :Closing Link: bot by irc.example.org (G-lined)", ME);
        assert!(matches!(event, Some(EventKind::ConnectThrottled { .. })));
    }

    #[test]
    fn test_error_without_indicator_is_silent() {
        assert_eq!(parse_line("ERROR :Goodbye", ME), None);
    }

    #[test]
    fn test_server_notice_without_prefix() {
        assert_eq!(
            parse_line("NOTICE AUTH :*** Looking up your hostname", ME),
            Some(EventKind::Notice {
                nick: None,
                target: "AUTH".to_string(),
                text: "*** Looking up your hostname".to_string(),
            })
        );
    }

    #[test]
    fn test_self_join_vs_other_join() {
        assert_eq!(
            parse_line(":perch!ident@host JOIN :#lab", ME),
            Some(EventKind::Joined {
                channel: "#lab".to_string()
            })
        );
        assert_eq!(
            parse_line(":visitor!v@host JOIN #lab", ME),
            Some(EventKind::ChannelJoin {
                channel: "#lab".to_string(),
                nick: "visitor".to_string(),
            })
        );
    }

    #[test]
    fn test_part_without_reason() {
        assert_eq!(
            parse_line(":visitor!v@host PART #lab", ME),
            Some(EventKind::ChannelPart {
                channel: "#lab".to_string(),
                nick: "visitor".to_string(),
                reason: None,
            })
        );
    }

    #[test]
    fn test_kick() {
        assert_eq!(
            parse_line(":oper!o@host KICK #lab troll :begone", ME),
            Some(EventKind::ChannelKick {
                channel: "#lab".to_string(),
                who: "troll".to_string(),
                kicked_by: "oper".to_string(),
                reason: "begone".to_string(),
            })
        );
    }

    #[test]
    fn test_privmsg() {
        assert_eq!(
            parse_line(":alice!a@host PRIVMSG #lab :hello there", ME),
            Some(EventKind::Privmsg {
                nick: "alice".to_string(),
                target: "#lab".to_string(),
                text: "hello there".to_string(),
            })
        );
    }

    #[test]
    fn test_quit_and_nick() {
        assert_eq!(
            parse_line(":bob!b@host QUIT :leaving", ME),
            Some(EventKind::Quit {
                nick: "bob".to_string(),
                reason: "leaving".to_string(),
            })
        );
        assert_eq!(
            parse_line(":bob!b@host NICK :robert", ME),
            Some(EventKind::NickChanged {
                nick: "bob".to_string(),
                new_nick: "robert".to_string(),
            })
        );
    }

    #[test]
    fn test_topic_change() {
        assert_eq!(
            parse_line(":alice!a@host TOPIC #lab :new topic", ME),
            Some(EventKind::ChannelTopicChanged {
                channel: "#lab".to_string(),
                nick: "alice".to_string(),
                text: "new topic".to_string(),
            })
        );
    }

    #[test]
    fn test_my_modes() {
        assert_eq!(
            parse_line(":perch!i@host MODE perch :+i", ME),
            Some(EventKind::MyModesChanged {
                modes: "+i".to_string()
            })
        );
    }

    #[test]
    fn test_channel_modes_changed() {
        assert_eq!(
            parse_line(":oper!o@host MODE #lab +tn", ME),
            Some(EventKind::ChannelModesChanged {
                channel: "#lab".to_string(),
                modes: "+tn".to_string(),
                by: "oper".to_string(),
            })
        );
    }

    #[test]
    fn test_channel_user_modes_changed() {
        assert_eq!(
            parse_line(":nick!ident@host MODE #chan +ov nick1 nick2", ME),
            Some(EventKind::ChannelUserModesChanged {
                channel: "#chan".to_string(),
                changes: vec![
                    MemberModeChange {
                        nick: "nick1".to_string(),
                        mode: MemberMode::Op,
                        add: true,
                    },
                    MemberModeChange {
                        nick: "nick2".to_string(),
                        mode: MemberMode::Voice,
                        add: true,
                    },
                ],
                by: "nick".to_string(),
            })
        );
    }

    #[test]
    fn test_welcome_and_motd() {
        assert!(matches!(
            parse_line(":srv 001 perch :Welcome to the network", ME),
            Some(EventKind::WelcomeInfo { .. })
        ));
        assert!(matches!(
            parse_line(":srv 372 perch :- enjoy your stay", ME),
            Some(EventKind::MotdLine { .. })
        ));
        assert_eq!(parse_line(":srv 376 perch :End of MOTD", ME), Some(EventKind::EndOfMotd));
        assert_eq!(
            parse_line(":srv 422 perch :MOTD File is missing", ME),
            Some(EventKind::EndOfMotd)
        );
    }

    #[test]
    fn test_support_and_server_info() {
        assert_eq!(
            parse_line(":srv 005 perch MAXNICKLEN=15 CHANTYPES=#& :are supported", ME),
            Some(EventKind::SupportInfo {
                text: "MAXNICKLEN=15 CHANTYPES=#& are supported".to_string()
            })
        );
        assert!(matches!(
            parse_line(":srv 251 perch :There are 42 users", ME),
            Some(EventKind::ServerInfo { .. })
        ));
    }

    #[test]
    fn test_whois_hostname() {
        assert_eq!(
            parse_line(":srv 311 perch alice ident example.org * :Alice", ME),
            Some(EventKind::WhoisHostname {
                nick: "alice".to_string(),
                hostname: "ident@example.org".to_string(),
            })
        );
    }

    #[test]
    fn test_channel_modes_are() {
        assert_eq!(
            parse_line(":srv 324 perch #lab +tn", ME),
            Some(EventKind::ChannelModesAre {
                channel: "#lab".to_string(),
                modes: vec!['t', 'n'],
            })
        );
    }

    #[test]
    fn test_topic_numerics() {
        assert_eq!(
            parse_line(":srv 332 perch #lab :the topic", ME),
            Some(EventKind::ChannelTopicIs {
                channel: "#lab".to_string(),
                text: "the topic".to_string(),
            })
        );
        assert_eq!(
            parse_line(":srv 333 perch #lab alice 1700000000", ME),
            Some(EventKind::ChannelTopicMeta {
                channel: "#lab".to_string(),
                nick: "alice".to_string(),
                set_at: 1_700_000_000,
            })
        );
    }

    #[test]
    fn test_names_reply() {
        let event = parse_line(":srv 353 perch = #lab :@oper +voiced plain", ME).unwrap();
        let EventKind::ChannelHasUsers { channel, users } = event else {
            panic!("expected ChannelHasUsers");
        };
        assert_eq!(channel, "#lab");
        assert_eq!(
            users,
            vec![
                NamesEntry {
                    nick: "oper".to_string(),
                    mode: Some(MemberMode::Op),
                },
                NamesEntry {
                    nick: "voiced".to_string(),
                    mode: Some(MemberMode::Voice),
                },
                NamesEntry {
                    nick: "plain".to_string(),
                    mode: None,
                },
            ]
        );
    }

    #[test]
    fn test_nick_in_use_and_throttle_numerics() {
        assert!(matches!(
            parse_line(":srv 433 * perch :Nickname is already in use", ME),
            Some(EventKind::NickInUse { .. })
        ));
        assert!(matches!(
            parse_line(":srv 465 perch :You are banned", ME),
            Some(EventKind::ConnectThrottled { .. })
        ));
        assert!(matches!(
            parse_line(":srv 473 perch #secret :Cannot join (+i)", ME),
            Some(EventKind::ChannelInviteOnly { .. })
        ));
        assert!(matches!(
            parse_line(":srv 475 perch #locked :Cannot join (+k)", ME),
            Some(EventKind::ChannelNeedsPassword { .. })
        ));
    }

    #[test]
    fn test_unknown_numeric_is_unparsed() {
        assert_eq!(parse_line(":srv 999 perch :whatever", ME), None);
        assert_eq!(parse_line(":srv 221 perch +i", ME), None);
    }

    #[test]
    fn test_unknown_command_is_unparsed() {
        assert_eq!(parse_line(":srv WALLOPS :hello", ME), None);
    }

    #[test]
    fn test_numeric_with_missing_fields_is_unparsed() {
        assert_eq!(parse_line(":srv 333 perch #lab", ME), None);
        assert_eq!(parse_line(":srv 311 perch alice", ME), None);
    }
}
