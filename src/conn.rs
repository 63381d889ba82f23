//! Connection manager.
//!
//! Owns the TCP socket for one server and everything directly attached to
//! it: lifecycle flags, activity timestamps, the send and receive queues,
//! and the undecoded byte carry. All I/O is non-blocking and driven one
//! tick at a time by [`crate::client::IrcClient::maintain`]; `send` only
//! enqueues, and at most one queued line actually goes out per writable
//! tick so the server's flood limits are respected.
//!
//! The socket itself is the only piece that cannot survive serialization;
//! [`ConnectionSnapshot`] captures everything else, and
//! [`Connection::attach_socket`] re-arms a restored connection with a
//! descriptor the embedder carried across.

use std::collections::VecDeque;

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use crate::config::Timing;
use crate::error::{EngineError, Result};
use crate::line::LineCodec;

/// Non-blocking, queue-based connection to one IRC server.
#[derive(Debug)]
pub struct Connection {
    host: String,
    port: u16,
    nick: String,
    ident: String,
    realname: String,
    connected: bool,
    ready: bool,
    awaiting_pong: bool,
    last_connect: DateTime<Utc>,
    last_receive: DateTime<Utc>,
    last_send: DateTime<Utc>,
    send_queue: VecDeque<String>,
    recv_queue: VecDeque<String>,
    carry: BytesMut,
    codec: LineCodec,
    timing: Timing,
    socket: Option<TcpStream>,
}

impl Connection {
    /// Create an unconnected connection.
    #[must_use]
    pub fn new(host: &str, port: u16, nick: &str, ident: &str, realname: &str, timing: Timing) -> Self {
        let now = Utc::now();
        Self {
            host: host.to_string(),
            port,
            nick: nick.to_string(),
            ident: ident.to_string(),
            realname: realname.to_string(),
            connected: false,
            ready: false,
            awaiting_pong: false,
            last_connect: now,
            last_receive: now,
            last_send: now,
            send_queue: VecDeque::new(),
            recv_queue: VecDeque::new(),
            carry: BytesMut::new(),
            codec: LineCodec::new(),
            timing,
            socket: None,
        }
    }

    /// Current nick.
    #[must_use]
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Change the nick bookkeeping. Does not send anything.
    pub fn set_nick(&mut self, nick: &str) {
        self.nick = nick.to_string();
    }

    /// Whether the socket is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Whether registration completed (end of MOTD seen).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Number of lines waiting to be written.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.send_queue.len()
    }

    /// The lines waiting to be written, oldest first, CRLF included.
    pub fn queued_lines(&self) -> impl Iterator<Item = &str> {
        self.send_queue.iter().map(String::as_str)
    }

    /// Open the socket and send the registration handshake. Bounded by the
    /// configured connect timeout.
    pub async fn connect(&mut self) -> Result<()> {
        debug!(host = %self.host, port = self.port, "connecting");
        let attempt = TcpStream::connect((self.host.as_str(), self.port));
        let socket = match tokio::time::timeout(self.timing.connect_timeout(), attempt).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                return Err(EngineError::ConnectTimeout {
                    host: self.host.clone(),
                    port: self.port,
                })
            }
        };

        let now = Utc::now();
        self.socket = Some(socket);
        self.connected = true;
        self.ready = false;
        self.awaiting_pong = false;
        self.last_connect = now;
        self.last_receive = now;
        self.last_send = now;
        self.carry.clear();
        self.recv_queue.clear();
        self.send_queue.clear();

        let nick = self.nick.clone();
        let ident = self.ident.clone();
        let realname = self.realname.clone();
        self.send(&format!("NICK {nick}"));
        self.send(&format!("USER {ident} 8 * :{realname}"));
        Ok(())
    }

    /// Drop the socket and mark the connection down. Queues and carry bytes
    /// are left alone; a reconnect clears them.
    pub fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            debug!(host = %self.host, "disconnected");
        }
        self.connected = false;
        self.ready = false;
        self.awaiting_pong = false;
    }

    /// Queue one line for sending. CRLF is appended here; callers pass bare
    /// protocol lines. Lines over the advisory length cap are logged and
    /// sent anyway.
    pub fn send(&mut self, line: &str) {
        if line.len() > self.timing.max_send_length {
            warn!(
                len = line.len(),
                max = self.timing.max_send_length,
                "outgoing line exceeds advisory length cap"
            );
        }
        self.send_queue.push_back(format!("{line}\r\n"));
    }

    /// Next fully decoded received line, oldest first.
    pub fn pop_line(&mut self) -> Option<String> {
        self.recv_queue.pop_front()
    }

    /// One tick of socket work: wait briefly for readiness, then either
    /// drain a read chunk into the receive queue or write one throttled
    /// queued line. Returns `false` when the connection died.
    pub async fn poll_io(&mut self) -> bool {
        let interest = Interest::READABLE | Interest::WRITABLE;
        let readiness = {
            let Some(socket) = self.socket.as_ref() else {
                return false;
            };
            match tokio::time::timeout(self.timing.select_interval(), socket.ready(interest)).await
            {
                Ok(Ok(readiness)) => readiness,
                Ok(Err(err)) => {
                    warn!(host = %self.host, "socket readiness failed: {err}");
                    self.disconnect();
                    return false;
                }
                // Nothing happened this tick.
                Err(_) => return true,
            }
        };

        if readiness.is_readable() {
            if !self.read_chunk() {
                self.disconnect();
                return false;
            }
        } else if readiness.is_writable() {
            if !self.write_one() {
                self.disconnect();
                return false;
            }
        }
        true
    }

    /// Liveness check for the current tick. Sends a keepalive PING after
    /// `ping_after` idle seconds; past `max_inactivity` the connection is
    /// declared dead and torn down. Returns `false` on death.
    pub fn keepalive(&mut self) -> bool {
        if !self.connected {
            return true;
        }
        let idle = seconds_since(self.last_receive);
        if idle > self.timing.max_inactivity {
            warn!(host = %self.host, idle, "no traffic past inactivity limit, dropping connection");
            self.disconnect();
            return false;
        }
        if idle > self.timing.ping_after && !self.awaiting_pong {
            let nick = self.nick.clone();
            self.send(&format!("PING {nick}"));
            self.awaiting_pong = true;
        }
        true
    }

    fn read_chunk(&mut self) -> bool {
        let Some(socket) = self.socket.as_ref() else {
            return false;
        };
        let mut chunk = vec![0u8; self.timing.read_chunk];
        match socket.try_read(&mut chunk) {
            Ok(0) => {
                debug!(host = %self.host, "peer closed the connection");
                false
            }
            Ok(n) => {
                self.carry.extend_from_slice(&chunk[..n]);
                self.last_receive = Utc::now();
                // Any traffic proves the link is alive.
                self.awaiting_pong = false;
                while let Ok(Some(line)) = self.codec.decode(&mut self.carry) {
                    debug!(host = %self.host, "< {line}");
                    self.recv_queue.push_back(line);
                }
                true
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(err) => {
                warn!(host = %self.host, "read failed: {err}");
                false
            }
        }
    }

    fn write_one(&mut self) -> bool {
        if self.send_queue.is_empty() || seconds_since(self.last_send) < self.timing.send_throttle {
            return true;
        }
        let Some(socket) = self.socket.as_ref() else {
            return false;
        };
        let line = self.send_queue.front().cloned().unwrap_or_default();
        match socket.try_write(line.as_bytes()) {
            Ok(n) => {
                self.send_queue.pop_front();
                if n < line.len() {
                    // Short write; requeue the remainder ahead of the rest.
                    self.send_queue.push_front(line[n..].to_string());
                } else {
                    debug!(host = %self.host, "> {}", line.trim_end());
                }
                self.last_send = Utc::now();
                true
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(err) => {
                warn!(host = %self.host, "write failed: {err}");
                false
            }
        }
    }

    /// Serializable state of this connection, minus the socket.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            host: self.host.clone(),
            port: self.port,
            nick: self.nick.clone(),
            ident: self.ident.clone(),
            realname: self.realname.clone(),
            connected: self.connected,
            ready: self.ready,
            awaiting_pong: self.awaiting_pong,
            last_connect: self.last_connect,
            last_receive: self.last_receive,
            last_send: self.last_send,
            send_queue: self.send_queue.clone(),
            recv_queue: self.recv_queue.clone(),
            carry: self.carry.to_vec(),
            timing: self.timing.clone(),
        }
    }

    /// Rebuild a connection from a snapshot. The result has no socket until
    /// [`Connection::attach_socket`] provides one.
    #[must_use]
    pub fn restore(snapshot: ConnectionSnapshot) -> Self {
        Self {
            host: snapshot.host,
            port: snapshot.port,
            nick: snapshot.nick,
            ident: snapshot.ident,
            realname: snapshot.realname,
            connected: snapshot.connected,
            ready: snapshot.ready,
            awaiting_pong: snapshot.awaiting_pong,
            last_connect: snapshot.last_connect,
            last_receive: snapshot.last_receive,
            last_send: snapshot.last_send,
            send_queue: snapshot.send_queue,
            recv_queue: snapshot.recv_queue,
            carry: BytesMut::from(&snapshot.carry[..]),
            codec: LineCodec::new(),
            timing: snapshot.timing,
            socket: None,
        }
    }

    /// Hand a restored connection the live socket it was snapshotted with.
    /// The stream must already be connected to the same server.
    pub fn attach_socket(&mut self, socket: TcpStream) {
        self.socket = Some(socket);
        self.connected = true;
    }
}

/// Everything about a [`Connection`] except the socket itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub ident: String,
    pub realname: String,
    pub connected: bool,
    pub ready: bool,
    pub awaiting_pong: bool,
    pub last_connect: DateTime<Utc>,
    pub last_receive: DateTime<Utc>,
    pub last_send: DateTime<Utc>,
    pub send_queue: VecDeque<String>,
    pub recv_queue: VecDeque<String>,
    /// Undecoded bytes of a partial trailing line.
    pub carry: Vec<u8>,
    pub timing: Timing,
}

fn seconds_since(instant: DateTime<Utc>) -> f64 {
    (Utc::now() - instant).num_milliseconds() as f64 / 1000.0
}
