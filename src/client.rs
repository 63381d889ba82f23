//! Engine assembly.
//!
//! [`IrcClient`] wires the connection, parser, channel tracker, dispatcher
//! and reconnect backoff into one engine for a single server. The embedder
//! drives it: call [`IrcClient::connect`], then loop on
//! [`IrcClient::maintain`] until it returns `false`, sleep
//! [`IrcClient::reconnect_wait`], reconnect, repeat.
//!
//! The engine's own protocol reactions (PONG replies, nick-collision
//! retries, auto-join after the MOTD) happen before an event reaches any
//! subscriber, so subscribers always observe a consistent tracker.

use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::backoff::ReconnectBackoff;
use crate::config::ClientConfig;
use crate::conn::{Connection, ConnectionSnapshot};
use crate::dispatch::Dispatcher;
use crate::event::{Event, EventKind};
use crate::parser::parse_line;
use crate::registry::{MemoryRegistry, UserRegistry};
use crate::track::{ChannelTracker, TrackerAction};

/// Protocol engine for one IRC server connection.
#[derive(Debug)]
pub struct IrcClient {
    config: ClientConfig,
    conn: Connection,
    dispatcher: Dispatcher,
    tracker: ChannelTracker,
    backoff: ReconnectBackoff,
}

impl IrcClient {
    /// Build an engine from a configuration, with a private in-memory user
    /// registry.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_registry(config, Box::new(MemoryRegistry::new()))
    }

    /// Build an engine resolving user identity through the embedder's
    /// registry.
    #[must_use]
    pub fn with_registry(config: ClientConfig, registry: Box<dyn UserRegistry + Send>) -> Self {
        let conn = Connection::new(
            &config.host,
            config.port,
            &config.nick,
            config.ident(),
            config.realname(),
            config.timing.clone(),
        );
        let backoff = ReconnectBackoff::new(
            config.timing.reconnect_default(),
            config.timing.reconnect_increment(),
        );
        Self {
            config,
            conn,
            dispatcher: Dispatcher::new(),
            tracker: ChannelTracker::new(registry),
            backoff,
        }
    }

    /// The configuration this engine was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The connection, for queue inspection and lifecycle flags.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The tracked channel/member state.
    #[must_use]
    pub fn tracker(&self) -> &ChannelTracker {
        &self.tracker
    }

    /// Current nick (may differ from the configured one after collisions).
    #[must_use]
    pub fn nick(&self) -> &str {
        self.conn.nick()
    }

    /// Register an event subscriber.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.dispatcher.subscribe(handler);
    }

    /// Open the connection and start registration. Failure is logged and
    /// reported through the return value only; the caller decides whether
    /// and when to retry.
    pub async fn connect(&mut self) -> bool {
        if !self.config.enabled {
            debug!(host = %self.config.host, "connection disabled, not connecting");
            return false;
        }
        match self.conn.connect().await {
            Ok(()) => {
                self.process_event(Event::now(EventKind::Connected));
                true
            }
            Err(err) => {
                warn!(host = %self.config.host, "connect failed: {err}");
                false
            }
        }
    }

    /// Tear the connection down deliberately.
    pub fn disconnect(&mut self) {
        self.conn.disconnect();
        self.process_event(Event::now(EventKind::Disconnected));
    }

    /// One engine tick: socket I/O, at most one parsed line, liveness.
    /// Returns `false` once the connection is gone; the caller then sleeps
    /// [`IrcClient::reconnect_wait`] and reconnects.
    pub async fn maintain(&mut self) -> bool {
        if !self.conn.is_connected() {
            return false;
        }
        if !self.conn.poll_io().await {
            self.process_event(Event::now(EventKind::Disconnected));
            return false;
        }
        // One line per tick keeps reactions interleaved with output
        // throttling instead of bursting.
        if let Some(line) = self.conn.pop_line() {
            self.process_line(&line);
        }
        if !self.conn.keepalive() {
            self.process_event(Event::now(EventKind::ConnectionTimeout));
            self.process_event(Event::now(EventKind::Disconnected));
            return false;
        }
        true
    }

    /// How long to wait before the next connect attempt.
    #[must_use]
    pub fn reconnect_wait(&self) -> std::time::Duration {
        self.backoff.wait()
    }

    /// Parse one received line and run it through the engine. Unparsed
    /// lines are logged and dropped.
    pub fn process_line(&mut self, line: &str) {
        match parse_line(line, self.conn.nick()) {
            Some(kind) => self.process_event(Event::now(kind)),
            None => debug!(host = %self.config.host, "unparsed line: {line}"),
        }
    }

    /// Run one event through the pipeline: engine reactions, tracker
    /// application, subscriber fan-out.
    pub fn process_event(&mut self, event: Event) {
        let me = self.conn.nick().to_string();
        match &event.kind {
            EventKind::Ping { payload } => {
                let reply = format!("PONG {payload}");
                self.conn.send(&reply);
            }
            EventKind::NickInUse { .. } => {
                let fallback = format!("{me}_");
                warn!(nick = %me, fallback = %fallback, "nick in use, retrying");
                self.conn.set_nick(&fallback);
                let line = format!("NICK {fallback}");
                self.conn.send(&line);
            }
            EventKind::ConnectThrottled { reason } => {
                warn!(reason = %reason, "server throttled the connection");
                self.backoff.throttled();
            }
            EventKind::EndOfMotd => {
                self.conn.set_ready(true);
                self.autojoin();
            }
            EventKind::Ready => self.backoff.reset(),
            _ => {}
        }

        for action in self.tracker.apply(&event, &me) {
            match action {
                TrackerAction::QueryModes(channel) => self.query_modes(&channel),
            }
        }

        // Full registration is signalled as its own event once the MOTD
        // event has been delivered.
        let newly_ready = matches!(event.kind, EventKind::EndOfMotd);
        self.dispatcher.publish(&event);
        if newly_ready {
            self.process_event(Event::now(EventKind::Ready));
        }
    }

    fn autojoin(&mut self) {
        for entry in self.config.channels.clone() {
            self.join(&entry.name, entry.key.as_deref());
        }
        for line in self.config.autosend.clone() {
            self.conn.send(&line);
        }
    }

    /// Change nick, updating local bookkeeping immediately.
    pub fn change_nick(&mut self, nick: &str) {
        self.conn.set_nick(nick);
        self.conn.send(&format!("NICK {nick}"));
    }

    /// Join a channel, with a key if it needs one.
    pub fn join(&mut self, channel: &str, key: Option<&str>) {
        match key {
            Some(key) => self.conn.send(&format!("JOIN {channel} {key}")),
            None => self.conn.send(&format!("JOIN {channel}")),
        }
    }

    /// Leave a channel.
    pub fn part(&mut self, channel: &str) {
        self.conn.send(&format!("PART {channel}"));
    }

    /// Send a message to a channel or nick. Empty messages are refused.
    pub fn privmsg(&mut self, target: &str, text: &str) {
        if text.is_empty() {
            warn!(target, "refusing to send empty message");
            return;
        }
        self.conn.send(&format!("PRIVMSG {target} :{text}"));
    }

    /// Send a notice. Empty notices are refused.
    pub fn notice(&mut self, target: &str, text: &str) {
        if text.is_empty() {
            warn!(target, "refusing to send empty notice");
            return;
        }
        self.conn.send(&format!("NOTICE {target} :{text}"));
    }

    /// Send a CTCP ACTION ("/me") to a channel or nick.
    pub fn action(&mut self, target: &str, text: &str) {
        self.privmsg(target, &format!("\x01ACTION {text}\x01"));
    }

    /// Set a channel topic.
    pub fn topic(&mut self, channel: &str, text: &str) {
        self.conn.send(&format!("TOPIC {channel} :{text}"));
    }

    /// Kick a user from a channel.
    pub fn kick(&mut self, channel: &str, nick: &str, reason: Option<&str>) {
        match reason {
            Some(reason) => self.conn.send(&format!("KICK {channel} {nick} :{reason}")),
            None => self.conn.send(&format!("KICK {channel} {nick}")),
        }
    }

    /// Ask the server about a user.
    pub fn whois(&mut self, nick: &str) {
        self.conn.send(&format!("WHOIS {nick}"));
    }

    /// Query a channel's current modes.
    pub fn query_modes(&mut self, channel: &str) {
        self.conn.send(&format!("MODE {channel}"));
    }

    /// Apply a mode change to a channel or user, e.g. `+o nick` or `+tn`.
    pub fn mode(&mut self, target: &str, modestring: &str) {
        self.conn.send(&format!("MODE {target} {modestring}"));
    }

    /// Queue a raw protocol line verbatim (CRLF appended on send).
    pub fn send_raw(&mut self, line: &str) {
        self.conn.send(line);
    }

    /// Serializable engine state: connection (minus socket) and backoff.
    /// Subscribers and the user registry stay with the embedder.
    #[must_use]
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            config: self.config.clone(),
            conn: self.conn.snapshot(),
            backoff: self.backoff.clone(),
        }
    }

    /// Rebuild an engine from a snapshot. The tracker starts empty and the
    /// connection has no socket until [`IrcClient::attach_socket`].
    #[must_use]
    pub fn restore(snapshot: ClientSnapshot) -> Self {
        Self::restore_with_registry(snapshot, Box::new(MemoryRegistry::new()))
    }

    /// [`IrcClient::restore`] with the embedder's registry.
    #[must_use]
    pub fn restore_with_registry(
        snapshot: ClientSnapshot,
        registry: Box<dyn UserRegistry + Send>,
    ) -> Self {
        Self {
            config: snapshot.config,
            conn: Connection::restore(snapshot.conn),
            dispatcher: Dispatcher::new(),
            tracker: ChannelTracker::new(registry),
            backoff: snapshot.backoff,
        }
    }

    /// Re-arm a restored engine with the live socket it was snapshotted
    /// with.
    pub fn attach_socket(&mut self, socket: TcpStream) {
        self.conn.attach_socket(socket);
    }
}

/// Serializable state of an [`IrcClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub config: ClientConfig,
    pub conn: ConnectionSnapshot,
    pub backoff: ReconnectBackoff,
}
