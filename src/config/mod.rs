//! Runtime configuration from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 10007;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    /// Directory holding data-gpu.json / data-cpu.json
    pub data_dir: PathBuf,
    pub template_path: PathBuf,
    pub index_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparseable values use the defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host: IpAddr = lookup("SCOREBOARD_HOST")
            .and_then(|s| s.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port: u16 = lookup("SCOREBOARD_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            addr: SocketAddr::new(host, port),
            data_dir: PathBuf::from(lookup("SCOREBOARD_DATA_DIR").unwrap_or_else(|| "data".into())),
            template_path: PathBuf::from(
                lookup("SCOREBOARD_TEMPLATE").unwrap_or_else(|| "assets/data-template.json".into()),
            ),
            index_path: PathBuf::from(
                lookup("SCOREBOARD_INDEX").unwrap_or_else(|| "assets/index.html".into()),
            ),
        }
    }
}
