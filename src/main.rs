mod cli;
mod client;
mod controller;
mod error;
mod output;
mod state;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cli::{Command, OutputArgs};
use controller::{Action, ActionOutcome, TipJar};
use state::DEFAULT_TIP_AMOUNT;
use tipjar_gateway::HttpProvider;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    // Load .env before parsing so it can feed the env-backed options.
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    // Initialize tracing
    let filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);

    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Shared cancellation token + signal handlers.
    let cancel = setup_signal_handlers();

    let gateway = match client::create_gateway(&cli.gateway, cancel.clone()) {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Ui(args) => {
            let jar = Arc::new(TipJar::new(gateway, &args.amount));
            let refresh_every = (args.refresh_secs > 0).then(|| Duration::from_secs(args.refresh_secs));
            if let Err(e) = ui::run_ui(jar, refresh_every, cancel).await {
                tracing::error!(error = %e, "ui error");
                std::process::exit(1);
            }
        }

        Command::Status(out) => {
            let jar = TipJar::new(gateway, DEFAULT_TIP_AMOUNT);
            jar.refresh().await;
            print_status(&jar, out);
        }

        Command::Connect(out) => run_action(TipJar::new(gateway, DEFAULT_TIP_AMOUNT), Action::Connect, out).await,

        Command::SwitchNetwork(out) => {
            run_action(TipJar::new(gateway, DEFAULT_TIP_AMOUNT), Action::SwitchNetwork, out).await
        }

        Command::Tip(args) => run_action(TipJar::new(gateway, &args.amount), Action::SendTip, args.output).await,

        Command::Withdraw(out) => run_action(TipJar::new(gateway, DEFAULT_TIP_AMOUNT), Action::Withdraw, out).await,
    }
}

/// Run one action, print the resulting state, and exit non-zero on failure.
async fn run_action(jar: TipJar<HttpProvider>, action: Action, out: OutputArgs) {
    info!(action = action.label(), "running");
    let outcome = jar.trigger(action).await;
    print_status(&jar, out);
    if outcome != ActionOutcome::Succeeded {
        std::process::exit(1);
    }
}

fn print_status(jar: &TipJar<HttpProvider>, out: OutputArgs) {
    let view = jar.snapshot();
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = output::write_status(&view, out.json, &mut stdout) {
        tracing::error!(error = %e, "failed to write output");
        std::process::exit(1);
    }
}

/// Register SIGINT and SIGTERM handlers that trigger the returned token.
fn setup_signal_handlers() -> CancellationToken {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received SIGINT, shutting down");
        cancel_clone.cancel();
    });

    #[cfg(unix)]
    {
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
            sig.recv().await;
            info!("received SIGTERM, shutting down");
            cancel_clone.cancel();
        });
    }

    cancel
}
