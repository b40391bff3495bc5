//! Per-connection state and the session controller that drives one client
//! through handshake, navigation, and logout (spec.md §3, §4.5).

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};

use crate::framer::{Deadline, Framer};
use crate::handshake;
use crate::navigator::{self, Direction, Position};
use crate::protocol::ServerCommand;

/// One connection's worth of state, destroyed when the connection closes.
pub struct Session<S> {
    pub(crate) framer: Framer<S>,
    pub(crate) username: String,
    pub(crate) position: Position,
    pub(crate) old_position: Position,
    pub(crate) direction: Direction,
}

impl<S> Session<S>
where
    S: Read + Write + Deadline,
{
    /// Build a fresh session wrapping `conn`. `position`/`old_position` seed
    /// with the shared origin sentinel; they are always overwritten by the
    /// first position reply before the navigator inspects them.
    pub fn new(conn: S) -> Self {
        Self {
            framer: Framer::new(conn),
            username: String::new(),
            position: (0, 0),
            old_position: (0, 0),
            direction: Direction::None,
        }
    }
}

/// Run the full per-connection protocol: handshake, then navigation, then
/// logout, emitting the matching error frame and closing on any failure.
pub fn run<S>(conn: S) -> Result<(), crate::error::SessionError>
where
    S: Read + Write + Deadline,
{
    let mut session = Session::new(conn);

    match handshake::run(&mut session).and_then(|()| navigator::navigate(&mut session)) {
        Ok(_secret_message) => {
            session.framer.send(&ServerCommand::Logout.encode())?;
            Ok(())
        }
        Err(err) => {
            if let Some(frame) = err.wire_frame() {
                // Best-effort: the peer may already be gone.
                let _ = session.framer.send(&frame);
            }
            Err(err)
        }
    }
}

/// Handle one accepted TCP connection: run the protocol to completion (or
/// failure), logging the outcome, and close the socket on every exit path.
pub fn handle_connection(stream: TcpStream, peer: SocketAddr) {
    match run(stream) {
        Ok(()) => {
            tracing::info!(%peer, "session completed, robot retrieved its message");
        }
        Err(err) => {
            if err.wire_frame().is_some() {
                tracing::warn!(%peer, error = %err, "session terminated with a protocol error");
            } else {
                tracing::debug!(%peer, "session disconnected");
            }
        }
    }
}
