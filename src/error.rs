//! Error types shared by the framer, handshake, and navigator.

use std::io;

use thiserror::Error;

use crate::protocol::ServerCommand;

/// Result type used throughout the session pipeline.
pub type SessionResult<T> = Result<T, SessionError>;

/// Everything that can end a session, wire-visible or silent.
///
/// The four wire-visible kinds each map to one of the `3xx` reply frames;
/// [`SessionError::Io`] and [`SessionError::Disconnected`] never produce a
/// reply and simply close the socket.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport-level failure (reset connection, broken pipe, ...).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// No bytes observed within the current read deadline, or the peer
    /// closed the connection mid-message.
    #[error("connection closed or timed out")]
    Disconnected,
    /// Missing/late terminator, oversize frame, non-numeric field, malformed
    /// `OK x y`, a `.` in a coordinate, or disallowed trailing whitespace.
    #[error("syntax error")]
    Syntax,
    /// The client's confirmation value did not match the expected hash.
    #[error("login failed")]
    LoginFailed,
    /// The numeric key id fell outside `[0, 4]`.
    #[error("key out of range")]
    KeyOutOfRange,
    /// `FULL POWER` received while not recharging, or any non-`FULL POWER`
    /// message received while recharging.
    #[error("logic error")]
    Logic,
}

impl SessionError {
    /// The wire frame to send to the client before closing, if any.
    ///
    /// Returns `None` for the two silent-close variants: timeouts and I/O
    /// failures are never acknowledged on the wire (spec.md §7).
    pub fn wire_frame(&self) -> Option<Vec<u8>> {
        let command = match self {
            Self::Syntax => ServerCommand::SyntaxError,
            Self::LoginFailed => ServerCommand::LoginFailed,
            Self::KeyOutOfRange => ServerCommand::KeyOutOfRange,
            Self::Logic => ServerCommand::LogicError,
            Self::Io(_) | Self::Disconnected => return None,
        };
        Some(command.encode())
    }

    /// Classify an I/O error produced by a read as either a timeout (which is
    /// silent) or a genuine transport failure.
    pub(crate) fn from_read_error(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::Disconnected,
            _ => Self::Io(err),
        }
    }
}
