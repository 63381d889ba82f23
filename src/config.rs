//! Client configuration.
//!
//! Loaded once at setup, typically from a JSON file the embedding program
//! owns. The engine never re-reads or writes configuration; changing it at
//! runtime is the embedder's business.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for one server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Nick to register with.
    pub nick: String,
    /// Ident (username); defaults to the nick.
    #[serde(default)]
    pub ident: Option<String>,
    /// Realname (gecos); defaults to the nick.
    #[serde(default)]
    pub realname: Option<String>,
    /// Whether this connection should be brought up at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Channels to join once the connection is fully ready.
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
    /// Raw lines to send once the connection is fully ready, e.g. a
    /// NickServ identify.
    #[serde(default)]
    pub autosend: Vec<String>,
    /// Timing tunables.
    #[serde(default)]
    pub timing: Timing,
}

/// An auto-join channel, with its key if the channel needs one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// Channel name, including the leading sigil.
    pub name: String,
    /// Join key, if any.
    #[serde(default)]
    pub key: Option<String>,
}

impl ClientConfig {
    /// Minimal configuration with every tunable at its default.
    #[must_use]
    pub fn new(host: &str, port: u16, nick: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            nick: nick.to_string(),
            ident: None,
            realname: None,
            enabled: true,
            channels: Vec::new(),
            autosend: Vec::new(),
            timing: Timing::default(),
        }
    }

    /// The ident to register with.
    #[must_use]
    pub fn ident(&self) -> &str {
        self.ident.as_deref().unwrap_or(&self.nick)
    }

    /// The realname to register with.
    #[must_use]
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nick)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Timing tunables, in seconds where fractional values make sense.
///
/// Every field has a default matching long-running production use; a JSON
/// config only names the ones it wants to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Minimum gap between two sent lines.
    #[serde(default = "default_send_throttle")]
    pub send_throttle: f64,
    /// Readiness-wait interval per maintenance tick.
    #[serde(default = "default_select_interval")]
    pub select_interval: f64,
    /// Upper bound on a connect attempt.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: f64,
    /// Bytes read per readable tick.
    #[serde(default = "default_read_chunk")]
    pub read_chunk: usize,
    /// Idle seconds before a keepalive PING goes out.
    #[serde(default = "default_ping_after")]
    pub ping_after: f64,
    /// Idle seconds before the connection is declared dead.
    #[serde(default = "default_max_inactivity")]
    pub max_inactivity: f64,
    /// Advisory cap on outgoing line length, excluding CRLF.
    #[serde(default = "default_max_send_length")]
    pub max_send_length: usize,
    /// Reconnect wait after a clean cycle.
    #[serde(default = "default_reconnect_default")]
    pub reconnect_default: f64,
    /// Reconnect wait growth per throttled connect.
    #[serde(default = "default_reconnect_increment")]
    pub reconnect_increment: f64,
}

fn default_enabled() -> bool {
    true
}
fn default_send_throttle() -> f64 {
    0.05
}
fn default_select_interval() -> f64 {
    0.02
}
fn default_connect_timeout() -> f64 {
    20.0
}
fn default_read_chunk() -> usize {
    1024
}
fn default_ping_after() -> f64 {
    120.0
}
fn default_max_inactivity() -> f64 {
    180.0
}
fn default_max_send_length() -> usize {
    400
}
fn default_reconnect_default() -> f64 {
    5.0
}
fn default_reconnect_increment() -> f64 {
    30.0
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            send_throttle: default_send_throttle(),
            select_interval: default_select_interval(),
            connect_timeout: default_connect_timeout(),
            read_chunk: default_read_chunk(),
            ping_after: default_ping_after(),
            max_inactivity: default_max_inactivity(),
            max_send_length: default_max_send_length(),
            reconnect_default: default_reconnect_default(),
            reconnect_increment: default_reconnect_increment(),
        }
    }
}

impl Timing {
    /// [`Timing::send_throttle`] as a [`Duration`].
    #[must_use]
    pub fn send_throttle(&self) -> Duration {
        Duration::from_secs_f64(self.send_throttle)
    }

    /// [`Timing::select_interval`] as a [`Duration`].
    #[must_use]
    pub fn select_interval(&self) -> Duration {
        Duration::from_secs_f64(self.select_interval)
    }

    /// [`Timing::connect_timeout`] as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout)
    }

    /// [`Timing::reconnect_default`] as a [`Duration`].
    #[must_use]
    pub fn reconnect_default(&self) -> Duration {
        Duration::from_secs_f64(self.reconnect_default)
    }

    /// [`Timing::reconnect_increment`] as a [`Duration`].
    #[must_use]
    pub fn reconnect_increment(&self) -> Duration {
        Duration::from_secs_f64(self.reconnect_increment)
    }
}
