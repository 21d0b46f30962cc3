use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use keywatch::config::AllConfigs;
use keywatch::{factory, logging};
use keywatch_types::{OutputMessage, Severity};

#[derive(Parser, Debug)]
#[command(name = "keywatch")]
#[command(version, about = "Monitors validator BLS key ratings and sends alerts")]
struct Args {
    /// The main configuration file
    #[arg(long, default_value = "./config/config.toml")]
    config: PathBuf,

    /// The credentials configuration file
    #[arg(long, default_value = "./config/credentials.toml")]
    credentials: PathBuf,

    /// Log filter, e.g. "info" or "info,keywatch::executor=debug"
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write the logs to rolling files in the ./logs directory
    #[arg(long)]
    log_save: bool,

    /// Send one message to every configured notifier and exit
    #[arg(long)]
    test_notifiers: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let configs = AllConfigs::load(&args.config, &args.credentials)?;
    let save_to_file = args.log_save.then_some(&configs.config.general.logs);
    let _log_guard = logging::init(&args.log_level, save_to_file)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting application");

    if args.test_notifiers {
        return test_notifiers(&configs).await;
    }

    let monitoring = factory::start_monitoring(&configs)?;
    monitoring.status.notify_app_start().await;

    shutdown_signal().await;
    tracing::info!("terminating at user's signal");

    monitoring.shutdown().await;

    Ok(())
}

async fn test_notifiers(configs: &AllConfigs) -> Result<()> {
    let fanout = factory::create_fanout(configs)?;
    let message = OutputMessage::builder(Severity::Info)
        .source_name(&configs.config.general.application_name)
        .category("Test message for the configured notifiers")
        .build();

    fanout
        .notify_with_retry("test-notifiers", &[message])
        .await
        .context("testing notifiers")?;
    tracing::info!(num_notifiers = fanout.num_notifiers(), "test message sent");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
