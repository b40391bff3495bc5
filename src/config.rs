//! Listen-address configuration.
//!
//! The wire protocol takes no CLI flags (spec.md §6): the only configurable
//! knob is where the daemon binds, and even that defaults to the spec's
//! hard-coded `0.0.0.0:3999`. Environment overrides exist only so the
//! integration tests can bind an ephemeral port without a CLI surface.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Environment variable overriding the bind address's IP.
pub const BIND_ENV: &str = "ROBOT_DAEMON_BIND";
/// Environment variable overriding the bind address's port.
pub const PORT_ENV: &str = "ROBOT_DAEMON_PORT";

const DEFAULT_PORT: u16 = 3999;

/// Daemon-wide configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// The address the TCP listener binds.
    pub bind_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
        }
    }
}

impl Config {
    /// Build a [`Config`], applying [`BIND_ENV`]/[`PORT_ENV`] overrides on
    /// top of the default `0.0.0.0:3999`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ip) = std::env::var(BIND_ENV) {
            if let Ok(parsed) = ip.parse::<IpAddr>() {
                config.bind_addr.set_ip(parsed);
            }
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            if let Ok(parsed) = port.parse::<u16>() {
                config.bind_addr.set_port(parsed);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_all_interfaces_on_3999() {
        let config = Config::default();
        assert_eq!(config.bind_addr.port(), 3999);
        assert!(config.bind_addr.ip().is_unspecified());
    }
}
