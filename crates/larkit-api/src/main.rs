//! Larkit CLI and webhook server entry point.
//!
//! Binary name: `larkit`
//!
//! Parses CLI arguments, loads `larkit.toml`, wires the kernel into an
//! [`AppState`], then dispatches to a command handler or starts the webhook
//! listener.

mod cli;
mod events;
mod http;
mod replies;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing::{info, warn};

use cli::{Cli, Commands, TokenCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,larkit_api=debug,larkit_core=debug,larkit_infra=debug",
        _ => "trace",
    };
    larkit_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    larkit_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "larkit", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = larkit_infra::config::load_kernel_config(&cli.config).await;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let webhook_path = config.server.path.clone();

            let state = AppState::init(config).await?;
            let _event_logger = events::spawn_event_logger(&state.events);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(%addr, path = %webhook_path, "webhook listener started");

            if !cli.quiet {
                println!(
                    "  {} Larkit webhook listening on {}",
                    console::style(">>").bold(),
                    console::style(format!("http://{addr}{webhook_path}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Token { action } => {
            let state = AppState::init(config).await?;
            let manager = &state.token_manager;
            match action {
                TokenCommand::Get { force } => cli::token::get_token(manager, force, cli.json).await?,
                TokenCommand::Refresh => cli::token::get_token(manager, true, cli.json).await?,
                TokenCommand::Set { value, ttl } => {
                    cli::token::set_token(manager, value.as_deref(), ttl, cli.json).await?
                }
                TokenCommand::Fingerprint => cli::token::show_fingerprint(manager, cli.json),
            }
        }

        Commands::Sign {
            timestamp,
            nonce,
            token,
        } => {
            let token = token.or(config.token);
            cli::crypto::sign(token.as_deref(), &timestamp, &nonce, cli.json)?;
        }

        Commands::Encrypt { plaintext } => {
            cli::crypto::encrypt(config.encryption_key.as_deref(), &plaintext, cli.json)?;
        }

        Commands::Decrypt { payload } => {
            cli::crypto::decrypt(config.encryption_key.as_deref(), &payload, cli.json)?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
