//! TCP acceptor: one independent worker thread per accepted connection
//! (spec.md §5, §6). Everything protocol-specific lives in [`crate::session`];
//! this module is thin glue.

use std::io;
use std::net::TcpListener;
use std::thread;

use socket2::{Domain, Socket, Type};

use crate::config::Config;
use crate::session;

/// Minimum pending-connect backlog required by spec.md §6.
const BACKLOG: i32 = 20;

/// Bind and accept-loop forever, spawning one thread per connection.
///
/// Returns only if the listener itself fails (e.g. bind fails); accept
/// errors on individual connections are logged and skipped.
pub fn run(config: Config) -> io::Result<()> {
    let listener = bind(&config)?;
    tracing::info!(addr = %config.bind_addr, "robot daemon listening");

    for incoming in listener.incoming() {
        match incoming {
            Ok(stream) => {
                let peer = match stream.peer_addr() {
                    Ok(addr) => addr,
                    Err(err) => {
                        tracing::warn!(error = %err, "accepted connection without a peer address");
                        continue;
                    }
                };
                tracing::debug!(%peer, "accepted connection");
                thread::spawn(move || session::handle_connection(stream, peer));
            }
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
            }
        }
    }

    Ok(())
}

fn bind(config: &Config) -> io::Result<TcpListener> {
    let domain = if config.bind_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&config.bind_addr.into())?;
    socket.listen(BACKLOG)?;
    Ok(socket.into())
}
