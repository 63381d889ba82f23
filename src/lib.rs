//! # perch-irc
//!
//! A client-side IRC protocol engine owning one TCP connection: framing
//! and parsing, registration, liveness, throttled output, reconnect
//! backoff, and an event-derived channel/member model.
//!
//! ## Features
//!
//! - Line codec with encoding fallback (UTF-8, windows-1252, windows-1251)
//! - Line parsing into typed protocol events
//! - Non-blocking queue-based connection with keepalive and send throttling
//! - Synchronous event fan-out with subscriber isolation
//! - Channel membership, modes, and topic tracking
//! - Escalating reconnect backoff driven by server throttle signals
//! - Serde snapshots of engine state, minus the socket
//!
//! Command dispatch, permissions, and user accounts are the embedder's
//! business; the engine exposes events and a [`UserRegistry`] seam instead.
//!
//! ## Quick Start
//!
//! ```no_run
//! use perch_irc::{ClientConfig, IrcClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::new("irc.example.org", 6667, "perch");
//!     let mut client = IrcClient::new(config);
//!     client.subscribe(|event| {
//!         println!("{:?}", event.kind);
//!         Ok(())
//!     });
//!
//!     loop {
//!         if client.connect().await {
//!             while client.maintain().await {}
//!         }
//!         tokio::time::sleep(client.reconnect_wait()).await;
//!     }
//! }
//! ```

#![deny(clippy::all)]

pub mod backoff;
pub mod client;
pub mod config;
pub mod conn;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod line;
pub mod message;
pub mod mode;
pub mod parser;
pub mod registry;
pub mod track;

pub use backoff::ReconnectBackoff;
pub use client::{ClientSnapshot, IrcClient};
pub use config::{ChannelEntry, ClientConfig, Timing};
pub use conn::{Connection, ConnectionSnapshot};
pub use dispatch::Dispatcher;
pub use error::{ConfigError, EngineError, Result};
pub use event::{Event, EventKind, NamesEntry};
pub use line::LineCodec;
pub use message::{Origin, RawLine};
pub use mode::{MemberMode, MemberModeChange};
pub use parser::parse_line;
pub use registry::{MemberId, MemoryRegistry, UserRegistry};
pub use track::{Channel, ChannelTracker, TrackerAction};
