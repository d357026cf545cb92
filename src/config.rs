/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! Startup configuration. There is no config file and no keyspace-tuning
//! environment variable beyond `RUST_LOG` (handled by `env_logger`
//! directly) — everything this server needs to boot fits on one command
//! line.

use std::net::SocketAddr;

use clap::Parser;

const DEFAULT_BIND: &str = "0.0.0.0:6379";
const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

#[derive(Debug, Parser)]
#[command(name = "tridentd", about = "An in-memory, network-accessible data store")]
pub struct Args {
    /// Address to bind the TCP listener to.
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Raise the log level to debug, regardless of `RUST_LOG`.
    #[arg(short, long)]
    pub verbose: bool,

    /// Maximum number of simultaneously connected clients.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,
}

impl Args {
    pub fn parse_from_env() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_all_interfaces_on_the_standard_port() {
        let args = Args::parse_from(["tridentd"]);
        assert_eq!(args.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
        assert!(!args.verbose);
        assert_eq!(args.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn accepts_explicit_bind_and_verbose() {
        let args = Args::parse_from(["tridentd", "--bind", "127.0.0.1:7000", "-v"]);
        assert_eq!(args.bind, "127.0.0.1:7000".parse::<SocketAddr>().unwrap());
        assert!(args.verbose);
    }
}
