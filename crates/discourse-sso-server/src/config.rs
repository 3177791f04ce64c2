//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use discourse_sso_telemetry::{LogFormat, TelemetryConfig};

/// Longest accepted `--nonce-ttl-secs` (24 hours).
pub const MAX_NONCE_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Parser)]
#[command(
    name = "discourse-sso",
    about = "Discourse SSO provider service",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the SSO HTTP server.
    Serve(ServeArgs),

    /// Print an Argon2id PHC hash of a password for the user directory file.
    HashPassword {
        /// Password to hash.
        password: String,
    },
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Local login entry point that receives `?ssoRef=<reference>`.
    #[arg(long, env = "LOCAL_AUTH_URL")]
    pub local_auth_url: String,

    /// Base URL of the Discourse instance.
    #[arg(long, env = "DISCOURSE_SERVER_URL")]
    pub discourse_url: String,

    /// Secret shared with Discourse (`sso secret` site setting).
    #[arg(long, env = "DISCOURSE_SSO_SECRET", hide_env_values = true)]
    pub sso_secret: String,

    /// Prefix for the external id sent to Discourse.
    #[arg(long, default_value = "local")]
    pub auth_source: String,

    /// How long a pending handshake waits for local login (seconds, at most 86400).
    #[arg(long, default_value_t = 600)]
    pub nonce_ttl_secs: u64,

    /// Interval between sweeps of expired handshakes (seconds).
    #[arg(long, default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// TOML file listing local users. Without it every login is rejected.
    #[arg(long)]
    pub users: Option<PathBuf>,

    /// Service name reported in startup logs.
    #[arg(long, default_value = "discourse-sso")]
    pub service_name: String,

    /// Log level.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format (json or pretty).
    #[arg(long, default_value = "json")]
    pub log_format: String,
}

/// Resolved server configuration. Immutable once built.
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub local_auth_url: String,
    pub discourse_url: String,
    pub sso_secret: String,
    pub auth_source: String,
    pub nonce_ttl: Duration,
    pub sweep_interval: Duration,
    pub users_file: Option<PathBuf>,
    pub telemetry: TelemetryConfig,
}

impl ServeArgs {
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let log_format = LogFormat::parse(&self.log_format).ok_or_else(|| {
            anyhow::anyhow!(
                "invalid log format '{}' (expected json or pretty)",
                self.log_format
            )
        })?;

        if self.nonce_ttl_secs == 0 || self.nonce_ttl_secs > MAX_NONCE_TTL_SECS {
            anyhow::bail!(
                "--nonce-ttl-secs must be between 1 and {}",
                MAX_NONCE_TTL_SECS
            );
        }

        if self.sweep_interval_secs == 0 {
            anyhow::bail!("--sweep-interval-secs must be greater than zero");
        }

        Ok(ServerConfig {
            listen_addr: self.listen,
            local_auth_url: self.local_auth_url,
            discourse_url: self.discourse_url,
            sso_secret: self.sso_secret,
            auth_source: self.auth_source,
            nonce_ttl: Duration::from_secs(self.nonce_ttl_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            users_file: self.users,
            telemetry: TelemetryConfig::new()
                .with_service_name(self.service_name)
                .with_log_level(self.log_level)
                .with_log_format(log_format),
        })
    }
}
