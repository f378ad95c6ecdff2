//! Forwarder configuration (spec §6).
//!
//! Loaded with the `config` crate's layered builder: compiled-in defaults,
//! overridden by an optional TOML file, overridden by `UDCND_*` environment
//! variables — the same precedence order the teacher's transports expect
//! callers to apply by hand, here centralized into one deserializable tree.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FwSettings {
    /// Number of forwarding threads, each owning a PIT/CS shard.
    pub threads: usize,
    /// Capacity of each thread's inbound queue before Overload kicks in.
    pub queue_size: usize,
    /// Default Interest lifetime applied when a face doesn't override it.
    pub default_interest_lifetime_ms: u32,
    pub max_packet_size: usize,
    pub dead_nonce_window_ms: u64,
}

impl Default for FwSettings {
    fn default() -> Self {
        Self {
            threads: 4,
            queue_size: 1024,
            default_interest_lifetime_ms: 4000,
            max_packet_size: 8800,
            dead_nonce_window_ms: 6000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsSettings {
    pub capacity: usize,
    pub admit: bool,
    pub serve: bool,
}

impl Default for CsSettings {
    fn default() -> Self {
        Self {
            capacity: 65536,
            admit: true,
            serve: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TablesSettings {
    pub cs: CsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpFaceSettings {
    pub default_mtu: usize,
    pub default_lifetime_ms: u64,
    pub multicast_addr: String,
    pub multicast_port: u16,
}

impl Default for UdpFaceSettings {
    fn default() -> Self {
        Self {
            default_mtu: 1400,
            default_lifetime_ms: 600_000,
            multicast_addr: "224.0.23.170".to_string(),
            multicast_port: 56363,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FacesSettings {
    pub udp: UdpFaceSettings,
}

/// Root configuration tree (spec §6's `fw.*`/`tables.*`/`faces.*` table).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForwarderConfig {
    pub fw: FwSettings,
    pub tables: TablesSettings,
    pub faces: FacesSettings,
}

impl ForwarderConfig {
    /// Loads defaults, layered with an optional TOML file at `path` and
    /// `UDCND_`-prefixed environment overrides (e.g. `UDCND_FW__THREADS=8`).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("UDCND").separator("__"));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = ForwarderConfig::default();
        assert_eq!(cfg.fw.threads, 4);
        assert_eq!(cfg.fw.default_interest_lifetime_ms, 4000);
        assert_eq!(cfg.fw.max_packet_size, 8800);
        assert_eq!(cfg.fw.dead_nonce_window_ms, 6000);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let cfg = ForwarderConfig::load(None).unwrap();
        assert_eq!(cfg.tables.cs.capacity, 65536);
    }
}
