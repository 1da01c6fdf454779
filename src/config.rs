use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::remote::DEFAULT_ENDPOINT;

/// irlog - archive IRKit signals and replay them from a web page
#[derive(Debug, Clone, Parser)]
#[command(name = "irlog")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// IRKit client key used for both polling and replay
    #[arg(long, env = "IRLOG_CLIENTKEY", default_value = "")]
    pub clientkey: String,

    /// SQLite database file
    #[arg(long, default_value = "irlog.db")]
    pub db: PathBuf,

    /// Address the web interface binds to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port the web interface listens on
    #[arg(long, default_value_t = 3355)]
    pub port: u16,

    /// Recreate the database tables and exit
    #[arg(long)]
    pub setup: bool,

    /// Run the polling agent next to the web interface
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub agent: bool,

    /// IRKit messages endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

impl Config {
    /// `host:port`, with IPv6 literals bracketed.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("irlog").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_cover_a_local_install() {
        let config = parse(&[]);
        assert_eq!(config.db, PathBuf::from("irlog.db"));
        assert_eq!(config.bind_addr(), "0.0.0.0:3355");
        assert!(config.agent);
        assert!(!config.setup);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn agent_can_be_disabled() {
        let config = parse(&["--agent", "false", "--clientkey", "secret", "--port", "8080"]);
        assert!(!config.agent);
        assert_eq!(config.clientkey, "secret");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let config = parse(&["--host", "::1", "--port", "9000"]);
        assert_eq!(config.bind_addr(), "[::1]:9000");

        let config = parse(&["--host", "localhost"]);
        assert_eq!(config.bind_addr(), "localhost:3355");
    }

    #[test]
    fn rejects_invalid_port() {
        let result = Config::try_parse_from(["irlog", "--port", "70000"]);
        assert!(result.is_err());
    }
}
