//! Byte-stream message framer.
//!
//! Pulls bytes one at a time off a buffered transport, enforcing the
//! terminator and per-phase length limit, and transparently absorbing a
//! `RECHARGING` / `FULL POWER` interlude wherever it appears (spec.md §4.1).

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::time::Duration;

use crate::error::SessionError;
use crate::protocol::{self, Phase, RechargeFrame, SUFFIX};

/// A transport over which a read deadline can be set.
///
/// [`std::net::TcpStream`] already exposes `set_read_timeout` with this
/// exact signature; implementing the trait is a one-line forward. Tests
/// supply an in-memory transport instead so the framer's length/timeout
/// logic can be exercised without a real socket.
pub trait Deadline {
    /// Apply (or clear, with `None`) a read deadline.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()>;
}

impl Deadline for std::net::TcpStream {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        self.set_read_timeout(timeout)
    }
}

/// Per-connection framer: owns the unread byte buffer and the recharging
/// flag described in spec.md §3.
pub struct Framer<S> {
    conn: S,
    buffer: VecDeque<u8>,
    recharging: bool,
}

impl<S> Framer<S>
where
    S: Read + Write + Deadline,
{
    /// Wrap a transport in a fresh framer with an empty buffer.
    pub fn new(conn: S) -> Self {
        Self {
            conn,
            buffer: VecDeque::new(),
            recharging: false,
        }
    }

    /// Whether the framer is currently inside a recharge interlude.
    pub fn is_recharging(&self) -> bool {
        self.recharging
    }

    /// Write a complete frame to the peer.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), SessionError> {
        self.conn.write_all(frame).map_err(SessionError::Io)
    }

    /// Return exactly one complete logical message (spec.md §4.1).
    ///
    /// `phase` selects the length limit; the framer always also tolerates a
    /// 12-byte recharge frame regardless of phase. A `RECHARGING` message is
    /// consumed transparently: the framer switches to the recharging
    /// deadline, insists the very next message is `FULL POWER`, then
    /// continues reading the message the caller actually asked for.
    pub fn next_message(&mut self, phase: Phase) -> Result<Vec<u8>, SessionError> {
        let limit = phase.limit();
        let mut message = Vec::new();

        loop {
            let byte = self.read_byte()?;
            message.push(byte);

            if message.len() >= SUFFIX.len() && message[message.len() - SUFFIX.len()..] == SUFFIX
            {
                break;
            }
            if message.len() == limit {
                return Err(SessionError::Syntax);
            }
        }

        match protocol::classify_recharge(&message) {
            RechargeFrame::Recharging => {
                self.recharging = true;
                let reply = self.next_message(Phase::Recharge)?;
                if protocol::classify_recharge(&reply) != RechargeFrame::FullPower {
                    return Err(SessionError::Logic);
                }
                self.recharging = false;
                self.next_message(phase)
            }
            RechargeFrame::FullPower if !self.recharging => Err(SessionError::Logic),
            RechargeFrame::FullPower | RechargeFrame::None => Ok(message),
        }
    }

    /// Pre-authentication peek (spec.md §4.1): if a complete framed message
    /// is already sitting in the buffer and it is part of the recharge
    /// interlude, consume and handle it immediately, before the caller's
    /// next write. Any other already-buffered message is left untouched for
    /// the caller's own [`Self::next_message`] call to pick up.
    pub fn check_recharge(&mut self) -> Result<(), SessionError> {
        let Some(end) = find_suffix(&self.buffer) else {
            return Ok(());
        };
        let buffered: Vec<u8> = self.buffer.iter().take(end).copied().collect();

        match protocol::classify_recharge(&buffered) {
            RechargeFrame::Recharging => {
                self.buffer.drain(..end);
                self.recharging = true;
                let reply = self.next_message(Phase::Recharge)?;
                if protocol::classify_recharge(&reply) != RechargeFrame::FullPower {
                    return Err(SessionError::Logic);
                }
                self.recharging = false;
                Ok(())
            }
            RechargeFrame::FullPower if !self.recharging => Err(SessionError::Logic),
            RechargeFrame::FullPower | RechargeFrame::None => Ok(()),
        }
    }

    fn read_byte(&mut self) -> Result<u8, SessionError> {
        if self.buffer.is_empty() {
            let timeout = if self.recharging {
                protocol::RECHARGE_TIMEOUT
            } else {
                protocol::IDLE_TIMEOUT
            };
            self.conn.set_timeout(Some(timeout)).map_err(SessionError::Io)?;

            let mut chunk = [0_u8; 1024];
            let read = self
                .conn
                .read(&mut chunk)
                .map_err(SessionError::from_read_error)?;
            if read == 0 {
                return Err(SessionError::Disconnected);
            }
            self.buffer.extend(&chunk[..read]);
        }

        Ok(self.buffer.pop_front().expect("buffer just verified non-empty"))
    }
}

/// Index one past the end of the first `SUFFIX` occurrence in `buffer`, if
/// a complete message is already present.
fn find_suffix(buffer: &VecDeque<u8>) -> Option<usize> {
    buffer
        .iter()
        .copied()
        .collect::<Vec<u8>>()
        .windows(SUFFIX.len())
        .position(|window| window == SUFFIX)
        .map(|start| start + SUFFIX.len())
}
