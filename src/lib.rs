//! Library surface for the robot navigation daemon.
//!
//! The binary in `src/main.rs` is thin glue around [`server::run`]; the
//! modules here are also exercised directly by the integration tests under
//! `tests/`, mirroring how the teacher workspace splits protocol logic into
//! library crates consumed by a small CLI/daemon binary.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod framer;
pub mod handshake;
pub mod navigator;
pub mod protocol;
pub mod server;
pub mod session;
