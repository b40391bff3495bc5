//! Wire constants and pure encode/decode functions.
//!
//! Nothing in this module touches a socket: the framer drives these
//! functions with bytes it has already pulled off the wire, and the
//! handshake/navigator feed their output back into the framer for sending.

use std::time::Duration;

use crate::error::SessionError;

/// The two-byte terminator ending every framed message.
pub const SUFFIX: [u8; 2] = [0x07, 0x08];

/// Idle read deadline: no byte seen in this long and the session is dropped.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Read deadline while waiting for `FULL POWER` during a recharge interlude.
pub const RECHARGE_TIMEOUT: Duration = Duration::from_secs(5);

const RECHARGING_FRAME: &[u8] = b"RECHARGING\x07\x08";
const FULL_POWER_FRAME: &[u8] = b"FULL POWER\x07\x08";

/// `(server_key, client_key)` pairs, indexed by the numeric key id the
/// client sends during the handshake.
pub const KEYS: [(u16, u16); 5] = [
    (23019, 32037),
    (32037, 29295),
    (18789, 13603),
    (16443, 29533),
    (18189, 21952),
];

/// Which field the framer is currently expecting, selecting the applicable
/// phase limit (spec.md §3, §4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Handshake step 1: the client's username.
    Username,
    /// Handshake step 2: the numeric key id.
    KeyId,
    /// Handshake step 4: the client's confirmation value.
    Confirmation,
    /// A navigation `OK <x> <y>` position reply.
    Ok,
    /// The secret message returned after `GET MESSAGE`.
    Message,
    /// Waiting for `FULL POWER` during a recharge interlude.
    Recharge,
}

impl Phase {
    /// The phase's own cap, ignoring the recharge-tolerance widening applied
    /// by [`Self::limit`]. Callers that must re-check a specific field's
    /// length after framing (e.g. the confirmation reply, whose own 7-byte
    /// cap is smaller than the recharge frame's) use this directly.
    pub(crate) const fn own_limit(self) -> usize {
        match self {
            Self::Username => 20,
            Self::KeyId => 5,
            Self::Confirmation => 7,
            Self::Ok => 12,
            Self::Message => 100,
            Self::Recharge => 12,
        }
    }

    /// The byte length at which a message in this phase must already have
    /// ended in [`SUFFIX`], honouring the rule that a recharge interlude may
    /// appear before any message regardless of that message's own limit.
    pub const fn limit(self) -> usize {
        let own = self.own_limit();
        let recharge = Self::Recharge.own_limit();
        if own > recharge {
            own
        } else {
            recharge
        }
    }
}

/// Server-to-client commands, named after the wire text they encode to
/// (spec.md §4.2). Each variant owns its literal text; there is no separate
/// lookup table to keep in sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerCommand {
    /// `102 MOVE`
    Move,
    /// `103 TURN LEFT`
    TurnLeft,
    /// `104 TURN RIGHT`
    TurnRight,
    /// `105 GET MESSAGE`
    GetMessage,
    /// `106 LOGOUT`
    Logout,
    /// `107 KEY REQUEST`
    KeyRequest,
    /// `200 OK`
    Ok,
    /// `300 LOGIN FAILED`
    LoginFailed,
    /// `301 SYNTAX ERROR`
    SyntaxError,
    /// `302 LOGIC ERROR`
    LogicError,
    /// `303 KEY OUT OF RANGE`
    KeyOutOfRange,
}

impl ServerCommand {
    /// The command's text, not including [`SUFFIX`].
    pub const fn text(self) -> &'static str {
        match self {
            Self::Move => "102 MOVE",
            Self::TurnLeft => "103 TURN LEFT",
            Self::TurnRight => "104 TURN RIGHT",
            Self::GetMessage => "105 GET MESSAGE",
            Self::Logout => "106 LOGOUT",
            Self::KeyRequest => "107 KEY REQUEST",
            Self::Ok => "200 OK",
            Self::LoginFailed => "300 LOGIN FAILED",
            Self::SyntaxError => "301 SYNTAX ERROR",
            Self::LogicError => "302 LOGIC ERROR",
            Self::KeyOutOfRange => "303 KEY OUT OF RANGE",
        }
    }

    /// Render the full wire frame, terminator included.
    pub fn encode(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.text().len() + SUFFIX.len());
        bytes.extend_from_slice(self.text().as_bytes());
        bytes.extend_from_slice(&SUFFIX);
        bytes
    }
}

/// Whether a complete, suffix-terminated message is the `RECHARGING` frame,
/// the `FULL POWER` frame, or neither.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RechargeFrame {
    /// Neither recharge-interlude frame.
    None,
    /// The client announced it is recharging.
    Recharging,
    /// The client announced it has returned to full power.
    FullPower,
}

/// Classify a complete framed message as one of the two recharge frames.
pub fn classify_recharge(message: &[u8]) -> RechargeFrame {
    if message == RECHARGING_FRAME {
        RechargeFrame::Recharging
    } else if message == FULL_POWER_FRAME {
        RechargeFrame::FullPower
    } else {
        RechargeFrame::None
    }
}

/// Render the server's numeric confirmation reply (decimal ASCII + suffix).
pub fn encode_confirmation(value: u16) -> Vec<u8> {
    let mut bytes = value.to_string().into_bytes();
    bytes.extend_from_slice(&SUFFIX);
    bytes
}

/// `(ascii_sum(u) * 1000) mod 65536`, using at least 32-bit intermediate
/// arithmetic so the multiplication cannot overflow (spec.md §9(d)).
pub fn username_hash(username: &str) -> u16 {
    let ascii_sum: u32 = username.bytes().map(u32::from).sum();
    ((ascii_sum * 1000) % 65536) as u16
}

/// `(hash + key) mod 65536`, used both for the server's own confirmation and
/// for the value expected back from the client.
pub fn confirmation(hash: u16, key: u16) -> u16 {
    ((u32::from(hash) + u32::from(key)) % 65536) as u16
}

/// The payload of a complete framed message, with the terminator stripped.
///
/// Callers only ever pass messages returned by the framer, which guarantees
/// the terminator is present, so this never fails.
pub fn strip_suffix(message: &[u8]) -> &[u8] {
    debug_assert!(message.ends_with(&SUFFIX));
    &message[..message.len() - SUFFIX.len()]
}

/// Parse a decimal key id, rejecting anything that is not a run of ASCII
/// digits (so a leading `-` is a syntax error, not a range error, matching
/// the original server's `str.isnumeric()` check). Range validation against
/// `[0, 4]` is the handshake's job, not this function's.
pub fn parse_key_id(payload: &[u8]) -> Result<u64, SessionError> {
    let text = std::str::from_utf8(payload).map_err(|_| SessionError::Syntax)?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SessionError::Syntax);
    }
    // The key-id field's own limit is 5 bytes, but Phase::limit widens every
    // phase to also tolerate a 12-byte recharge frame, so up to 10 digits
    // can reach this parse — comfortably overflowing a u32. Saturate rather
    // than erroring so an absurdly large numeric key id still falls out as
    // `KeyOutOfRange`, matching the original's arbitrary-precision `int()`
    // (examples/original_source/main_server.py `check_key_ID`), never a
    // syntax error.
    Ok(text.parse::<u64>().unwrap_or(u64::MAX))
}

/// Parse a decimal confirmation value, with the same all-digits rule as
/// [`parse_key_id`].
pub fn parse_confirmation(payload: &[u8]) -> Result<u32, SessionError> {
    let text = std::str::from_utf8(payload).map_err(|_| SessionError::Syntax)?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SessionError::Syntax);
    }
    text.parse::<u32>().map_err(|_| SessionError::Syntax)
}

/// Parse a trimmed username from handshake step 1's payload.
///
/// The username is taken after stripping outer whitespace and decoded as
/// UTF-8; the hash still sums raw byte values (spec.md §4.2).
pub fn parse_username(payload: &[u8]) -> Result<String, SessionError> {
    let text = std::str::from_utf8(payload).map_err(|_| SessionError::Syntax)?;
    Ok(text.trim().to_owned())
}

/// Parse a `OK <x> <y>` position reply (spec.md §4.2).
///
/// Trailing whitespace inside the payload is a syntax error; tokens are
/// then split on runs of ASCII whitespace, and neither coordinate may
/// contain `.`.
pub fn parse_ok_reply(payload: &[u8]) -> Result<(i64, i64), SessionError> {
    let text = std::str::from_utf8(payload).map_err(|_| SessionError::Syntax)?;
    if text.len() != text.trim_end().len() {
        return Err(SessionError::Syntax);
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 3 || tokens[0] != "OK" {
        return Err(SessionError::Syntax);
    }

    let x = parse_signed_coordinate(tokens[1])?;
    let y = parse_signed_coordinate(tokens[2])?;
    Ok((x, y))
}

fn parse_signed_coordinate(token: &str) -> Result<i64, SessionError> {
    if token.contains('.') {
        return Err(SessionError::Syntax);
    }
    token.parse::<i64>().map_err(|_| SessionError::Syntax)
}
