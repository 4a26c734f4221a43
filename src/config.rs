//! Ambient configuration: HTTP bind address/telemetry toggles, loaded
//! the teacher's way (TOML file + env + CLI flags via `clap_serde_derive`).
//!
//! The alignment-specific toggles from §6.4 (`USE_HF_WORD`,
//! `USE_HF_PHONEME`, `CTC_MODEL_ID`, `PHONEME_MODEL_ID`, `DEVICE`) are
//! read directly via `std::env` inside `providers`/`backends`, independent
//! of this struct, so the alignment core has no hard dependency on the
//! server's config type.

use anyhow::Result;
use clap::ArgAction;
use clap_serde_derive::ClapSerde;
use serde::Deserialize;

#[derive(ClapSerde, Deserialize)]
pub struct Config {
    /// The address the HTTP listener binds to
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub address: String,

    /// The port the HTTP listener binds to
    #[arg(short, long, env, default_value = "8080")]
    pub port: u16,

    /// The OpenTelemetry collector endpoint, enables telemetry export
    #[arg(short, long, env)]
    pub otel_endpoint: Option<String>,

    /// Keep console logging on even when a collector endpoint is set
    #[arg(long, env, action(ArgAction::SetTrue))]
    pub console: bool,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let config = toml::from_str(&str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_toml_string() {
        let toml_str = r#"
            address = "127.0.0.1"
            port = 9090
            console = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert!(config.console);
    }
}
