//! Server configuration and CLI argument parsing
//!
//! Every option can be given on the command line or through an environment
//! variable with the `TOLLGATE_` prefix.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Using CLI arguments
//! tollgate --port 9090 --capacity 10 --refill-amount 5
//!
//! # Using environment variables
//! export TOLLGATE_PORT=8080
//! export TOLLGATE_EVICTION_TTL=300
//! tollgate
//!
//! # Mixed (CLI overrides env)
//! export TOLLGATE_PORT=8080
//! tollgate --port 9090  # Uses port 9090
//! ```

use crate::identity::DEFAULT_IDENTITY_FIELD;
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::time::Duration;
use tollgate::{AdmissionGate, GateConfig};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main configuration structure for the server
#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    /// Bucket parameters and eviction schedule
    pub gate: GateConfig,
    /// Store shard count, `None` for the CPU-based default
    pub shards: Option<usize>,
    pub identity: IdentityConfig,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Client identity configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// JSON body field keying the onboarding route
    pub field: String,
    /// Trust `X-Real-IP` / `X-Forwarded-For` for address keys
    pub trust_proxy_headers: bool,
}

/// Command-line arguments for the server
///
/// All arguments can also be set via environment variables with the
/// TOLLGATE_ prefix. CLI arguments take precedence over environment variables.
///
/// # Examples
///
/// Burst of 10, one token back every 500ms:
/// ```bash
/// tollgate --capacity 10 --refill-interval-ms 500 --refill-amount 1
/// ```
///
/// Behind a reverse proxy with debug logging:
/// ```bash
/// tollgate --host 0.0.0.0 --trust-proxy-headers --log-level debug
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "tollgate",
    about = "Per-client admission control server",
    long_about = "An HTTP server that admits or rejects requests per client with token buckets.\n\nEnvironment variables with TOLLGATE_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // HTTP
    #[arg(
        long,
        value_name = "HOST",
        help = "HTTP host",
        default_value = "127.0.0.1",
        env = "TOLLGATE_HOST"
    )]
    pub host: String,
    #[arg(
        long,
        value_name = "PORT",
        help = "HTTP port",
        default_value_t = 8080,
        env = "TOLLGATE_PORT"
    )]
    pub port: u16,

    // Buckets
    #[arg(
        long,
        value_name = "TOKENS",
        help = "Bucket capacity (burst size)",
        default_value_t = 4,
        env = "TOLLGATE_CAPACITY"
    )]
    pub capacity: u64,
    #[arg(
        long,
        value_name = "MS",
        help = "Refill period in milliseconds",
        default_value_t = 1000,
        env = "TOLLGATE_REFILL_INTERVAL_MS"
    )]
    pub refill_interval_ms: u64,
    #[arg(
        long,
        value_name = "TOKENS",
        help = "Tokens added per refill period",
        default_value_t = 2,
        env = "TOLLGATE_REFILL_AMOUNT"
    )]
    pub refill_amount: u64,

    // Eviction
    #[arg(
        long,
        value_name = "SECS",
        help = "Idle time before a client's bucket is evicted (seconds)",
        default_value_t = 180,
        env = "TOLLGATE_EVICTION_TTL"
    )]
    pub eviction_ttl: u64,
    #[arg(
        long,
        value_name = "SECS",
        help = "Time between eviction sweeps (seconds)",
        default_value_t = 60,
        env = "TOLLGATE_SWEEP_INTERVAL"
    )]
    pub sweep_interval: u64,
    #[arg(
        long,
        value_name = "N",
        help = "Number of store shards [default: 4 per CPU]",
        env = "TOLLGATE_SHARDS"
    )]
    pub shards: Option<usize>,

    // Identity
    #[arg(
        long,
        value_name = "FIELD",
        help = "JSON body field identifying clients on /api/v1/onboard",
        default_value = DEFAULT_IDENTITY_FIELD,
        env = "TOLLGATE_IDENTITY_FIELD"
    )]
    pub identity_field: String,
    #[arg(
        long,
        help = "Key clients by X-Real-IP / X-Forwarded-For when present",
        env = "TOLLGATE_TRUST_PROXY_HEADERS"
    )]
    pub trust_proxy_headers: bool,

    // General options
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "TOLLGATE_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if any limiter parameter is zero, the identity field
    /// is empty or the log level is unknown.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    /// Build and validate configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let config = Config {
            http: HttpConfig {
                host: args.host,
                port: args.port,
            },
            gate: GateConfig {
                capacity: args.capacity,
                refill_interval: Duration::from_millis(args.refill_interval_ms),
                refill_amount: args.refill_amount,
                eviction_ttl: Duration::from_secs(args.eviction_ttl),
                sweep_interval: Duration::from_secs(args.sweep_interval),
            },
            shards: args.shards,
            identity: IdentityConfig {
                field: args.identity_field,
                trust_proxy_headers: args.trust_proxy_headers,
            },
            log_level: args.log_level.to_lowercase(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Build the admission gate described by this configuration
    pub fn build_gate(&self) -> Result<AdmissionGate> {
        let mut builder = AdmissionGate::builder().config(self.gate);
        if let Some(shards) = self.shards {
            builder = builder.shards(shards);
        }
        builder.build().context("invalid limiter configuration")
    }

    fn validate(&self) -> Result<()> {
        self.gate
            .validate()
            .context("invalid limiter configuration")?;

        if self.shards == Some(0) {
            return Err(anyhow!("--shards must be greater than zero"));
        }

        if self.identity.field.trim().is_empty() {
            return Err(anyhow!("--identity-field must not be empty"));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level: {}. Valid options are: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("Tollgate Environment Variables");
        println!("==============================");
        println!();
        println!("All environment variables use the TOLLGATE_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("HTTP Configuration:");
        println!("  TOLLGATE_HOST=<host>                  HTTP host [default: 127.0.0.1]");
        println!("  TOLLGATE_PORT=<port>                  HTTP port [default: 8080]");
        println!();

        println!("Bucket Configuration:");
        println!("  TOLLGATE_CAPACITY=<tokens>            Bucket capacity [default: 4]");
        println!("  TOLLGATE_REFILL_INTERVAL_MS=<ms>      Refill period [default: 1000]");
        println!("  TOLLGATE_REFILL_AMOUNT=<tokens>       Tokens per refill period [default: 2]");
        println!();

        println!("Eviction Configuration:");
        println!("  TOLLGATE_EVICTION_TTL=<secs>          Idle time before eviction [default: 180]");
        println!("  TOLLGATE_SWEEP_INTERVAL=<secs>        Time between sweeps [default: 60]");
        println!("  TOLLGATE_SHARDS=<n>                   Store shards [default: 4 per CPU]");
        println!();

        println!("Identity Configuration:");
        println!(
            "  TOLLGATE_IDENTITY_FIELD=<field>       Body field for /api/v1/onboard [default: mobileNumber]"
        );
        println!(
            "  TOLLGATE_TRUST_PROXY_HEADERS=true|false  Trust X-Real-IP / X-Forwarded-For [default: false]"
        );
        println!();

        println!("General Configuration:");
        println!(
            "  TOLLGATE_LOG_LEVEL=<level>            Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  # Burst of 10, five tokens back every second");
        println!("  export TOLLGATE_CAPACITY=10");
        println!("  export TOLLGATE_REFILL_AMOUNT=5");
        println!();
        println!("  # Run server (CLI args override env vars)");
        println!("  tollgate --port 9090");
    }
}
