//! skillrt CLI and REST API entry point.
//!
//! Binary name: `skillrt`
//!
//! Parses CLI arguments, scans skill sources, then dispatches to the
//! appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,skillrt_core=debug,skillrt_infra=debug,skillrt_api=debug",
        _ => "trace",
    };
    if let Err(e) = skillrt_observe::tracing_setup::init_tracing(filter, cli.otel) {
        eprintln!("warning: tracing init failed: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "skillrt", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;
    let result = run(cli, state.clone()).await;

    state.close().await;
    skillrt_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::List { kind, prefix } => {
            cli::skill::list_skills(&state, kind, prefix, cli.json).await?;
        }

        Commands::Show { name } => {
            cli::skill::show_skill(&state, &name, cli.json).await?;
        }

        Commands::Prompt { active, tool_only } => {
            cli::prompt::print_prompt(&state, &active, tool_only, cli.json).await?;
        }

        Commands::Read { skill, path } => {
            cli::tool::read_resource(&state, &skill, &path, cli.json).await?;
        }

        Commands::Run {
            skill,
            path,
            timeout_ms,
            args,
        } => {
            cli::tool::run_script(&state, &skill, &path, args, timeout_ms, cli.json).await?;
        }

        Commands::Check => {
            cli::skill::check(&state, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} skillrt API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }
            tracing::info!(%addr, skills = state.registry.snapshot().len(), "Server started");

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
    tracing::info!("Shutdown signal received");
}
