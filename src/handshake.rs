//! Handshake state machine: username → key id → mutual confirmation
//! (spec.md §4.3).

use std::io::{Read, Write};

use crate::error::SessionError;
use crate::framer::Deadline;
use crate::protocol::{self, Phase, ServerCommand};
use crate::session::Session;

/// Drive the four handshake steps to completion. On success the session's
/// `username` field is populated and `200 OK` has been sent; any error
/// leaves the wire frame to be sent by the caller (spec.md §4.5).
pub fn run<S>(session: &mut Session<S>) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    read_username(session)?;

    // A client may legally open with a recharge interlude before ever
    // sending its username's follow-up traffic; consult the buffer before
    // committing to the key request (spec.md §4.3 "At S0").
    session.framer.check_recharge()?;

    session.framer.send(&ServerCommand::KeyRequest.encode())?;
    let (server_key, client_key) = read_key(session)?;

    let hash = protocol::username_hash(&session.username);
    let server_confirm = protocol::confirmation(hash, server_key);
    session
        .framer
        .send(&protocol::encode_confirmation(server_confirm))?;

    confirm_client(session, hash, client_key)?;

    session.framer.send(&ServerCommand::Ok.encode())?;
    Ok(())
}

fn read_username<S>(session: &mut Session<S>) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    let message = session.framer.next_message(Phase::Username)?;
    session.username = protocol::parse_username(protocol::strip_suffix(&message))?;
    Ok(())
}

fn read_key<S>(session: &mut Session<S>) -> Result<(u16, u16), SessionError>
where
    S: Read + Write + Deadline,
{
    let message = session.framer.next_message(Phase::KeyId)?;
    let key_id = protocol::parse_key_id(protocol::strip_suffix(&message))?;
    usize::try_from(key_id)
        .ok()
        .and_then(|index| protocol::KEYS.get(index))
        .copied()
        .ok_or(SessionError::KeyOutOfRange)
}

fn confirm_client<S>(session: &mut Session<S>, hash: u16, client_key: u16) -> Result<(), SessionError>
where
    S: Read + Write + Deadline,
{
    let message = session.framer.next_message(Phase::Confirmation)?;
    if message.len() > Phase::Confirmation.own_limit() {
        return Err(SessionError::Syntax);
    }
    let value = protocol::parse_confirmation(protocol::strip_suffix(&message))?;
    let expected = protocol::confirmation(hash, client_key);
    if value != u32::from(expected) {
        return Err(SessionError::LoginFailed);
    }
    Ok(())
}
