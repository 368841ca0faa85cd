//! Server configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Seconds between alert-expiry / dead-connection sweeps.
    pub sweep_interval_secs: u64,
    /// Automatically raise an alert when a detection crosses the near-miss threshold.
    pub auto_alert: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("ROADSAFE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            sweep_interval_secs: env::var("ROADSAFE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            auto_alert: env::var("ROADSAFE_AUTO_ALERT")
                .map(|s| s != "0" && !s.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            sweep_interval_secs: 60,
            auto_alert: true,
        }
    }
}
