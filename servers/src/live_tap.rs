use anyhow::{Context, Result};
use lib_livehub::{HubOptions, LiveHubClient};
use tokio::signal;

mod live_logic;
use live_logic::{config, logger, printer};

#[tokio::main]
async fn main() -> Result<()> {
    // Explicitly install the default crypto provider for rustls
    let _ = rustls::crypto::ring::default_provider().install_default();
    dotenvy::dotenv().ok();

    let (config, diagnostics) = config::load_config();
    let log_dir = config.log_dir.clone().unwrap_or_else(|| "./logs".into());
    let log_level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    logger::setup_logging(&log_dir, &log_level)?;
    for (level, message) in &diagnostics {
        log::log!(*level, "{}", message);
    }

    let target = config
        .target
        .clone()
        .context("A live target is required (--target or LIVE_TARGET)")?;
    let events = config::parse_events(config.events.as_deref())?;

    let mut options = match &config.hub_url {
        Some(url) => HubOptions::with_hub_url(url.clone()),
        None => HubOptions::default(),
    };
    if let Some(page) = &config.page_url {
        options = options.page_location(page.clone());
    }

    let mut client = LiveHubClient::new(target, options);
    printer::attach(&client, &events);
    client.configure(config.token.as_deref())?;
    client.connect()?;

    let interrupted = tokio::select! {
        _ = shutdown_signal() => true,
        _ = client.wait_closed() => false,
    };
    if interrupted {
        client.close().await;
    }

    log::info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("SIGTERM handler unavailable: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }
}
