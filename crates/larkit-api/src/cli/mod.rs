//! CLI command definitions for the `larkit` binary.

pub mod crypto;
pub mod token;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Webhook gateway and access-token toolkit for messaging platforms.
#[derive(Parser)]
#[command(name = "larkit", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "LARKIT_CONFIG", default_value = "larkit.toml")]
    pub config: PathBuf,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook listener.
    Serve {
        /// Host to bind to (overrides `[server].host`).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides `[server].port`).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch, refresh, or seed the cached access token.
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },

    /// Compute a request signature over token, timestamp and nonce.
    Sign {
        #[arg(long)]
        timestamp: String,

        #[arg(long)]
        nonce: String,

        /// Verification token (defaults to the configured one).
        #[arg(long)]
        token: Option<String>,
    },

    /// Encrypt a payload with the configured key.
    Encrypt {
        plaintext: String,
    },

    /// Decrypt a payload produced by `encrypt` or a secure-mode request.
    Decrypt {
        payload: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Show the cached token, issuing one if none is live.
    Get {
        /// Bypass the cache and request a new token.
        #[arg(long)]
        force: bool,
    },

    /// Request a new token and overwrite the cache.
    Refresh,

    /// Store an externally obtained token.
    Set {
        /// Token value (prompted for when omitted).
        #[arg(long)]
        value: Option<String>,

        /// Lifetime in seconds (defaults to `default_lifetime_secs`).
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Print the credential fingerprint and cache key.
    Fingerprint,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_token_set_with_ttl() {
        let cli = Cli::try_parse_from(["larkit", "--json", "token", "set", "--value", "abc", "--ttl", "60"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Token {
                action: TokenCommand::Set { value, ttl },
            } => {
                assert_eq!(value.as_deref(), Some("abc"));
                assert_eq!(ttl, Some(60));
            }
            _ => panic!("expected token set"),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["larkit", "serve", "--config", "/etc/larkit.toml", "-p", "9000"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/larkit.toml"));
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000), .. }));
    }
}
