//! habitlog CLI and REST API entry point.
//!
//! Binary name: `habitlog`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli);

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "habitlog", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Timezones = &cli.command {
        return cli::timezone::list_presets(cli.json);
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => serve(state, &host, port).await?,

        Commands::Log { user } => {
            cli::log::log_interactive(&state, user, cli.json).await?;
        }

        Commands::Stats { user, month } => {
            cli::stats::show_stats(&state, user, month, cli.json).await?;
        }

        Commands::Timezone { action } => {
            cli::timezone::handle_timezone_command(action, &state, cli.json).await?;
        }

        Commands::Timezones | Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the verbosity flags when set.
fn init_tracing(cli: &Cli) {
    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "info,habitlog=debug,habitlog_core=debug,habitlog_infra=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Run the REST API until Ctrl+C / SIGTERM, with the reaper alongside.
async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let reaper_cancel = CancellationToken::new();
    let reaper = state.reaper();
    let reaper_interval = reaper.interval();
    let reaper_handle = reaper.spawn(reaper_cancel.clone());

    println!(
        "  {} habitlog API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!(
        "  {}",
        console::style(format!("Data directory: {}", state.data_dir.display())).dim()
    );
    println!(
        "  {}",
        console::style(format!(
            "Sessions expire after {} min idle, swept every {} min. Press Ctrl+C to stop",
            state.config.session_ttl().num_minutes(),
            reaper_interval.as_secs() / 60
        ))
        .dim()
    );
    tracing::info!(%addr, "server started");

    let router = http::router::build_router(state);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    reaper_cancel.cancel();
    if let Err(err) = reaper_handle.await {
        tracing::warn!("session reaper ended abnormally: {err}");
    }

    served?;
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
///
/// A signal handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
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

    tracing::info!("shutdown signal received");
}
