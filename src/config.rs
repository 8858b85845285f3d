use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Beacon rendezvous/relay server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "beacon-server", version, about = "Beacon rendezvous/relay server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "BEACON_PORT", default_value = "4444")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "BEACON_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./beacon.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "BEACON_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Seconds between liveness probes on each connection
    #[arg(long, env = "BEACON_HEARTBEAT_INTERVAL_SECS", default_value = "30")]
    pub heartbeat_interval_secs: u64,

    /// Seconds an empty room survives before it is destroyed
    #[arg(long, env = "BEACON_ROOM_GRACE_PERIOD_SECS", default_value = "30")]
    pub room_grace_period_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4444,
            bind_address: "0.0.0.0".to_string(),
            config: "./beacon.toml".to_string(),
            json_logs: false,
            generate_config: false,
            heartbeat_interval_secs: 30,
            room_grace_period_secs: 30,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (BEACON_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("BEACON_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Beacon Rendezvous/Relay Server Configuration
# Place this file at ./beacon.toml or specify with --config <path>
# All settings can be overridden via environment variables (BEACON_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 4444)
# port = 4444

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Seconds between liveness probes on each WebSocket connection.
# A connection that misses one probe is terminated and cleaned up.
# heartbeat_interval_secs = 30

# Seconds an empty room survives before destruction. A peer joining
# within the grace period keeps the room (and its code) alive.
# room_grace_period_secs = 30
"#
    .to_string()
}
