// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `autospares serve` command implementation.
//!
//! Opens SQLite storage, builds the Gemini provider, the M-Pesa gateway and
//! the optional SMTP mailer, wires them into the chat engine, and serves the
//! HTTP/WebSocket API until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use autospares_agent::{CartEvents, CartService, ChatEngine, OrderService, PaymentService, ToolServices};
use autospares_config::StoreConfig;
use autospares_core::{MailAdapter, PluginAdapter, StorageAdapter, StoreError};
use autospares_email::SmtpMailer;
use autospares_gateway::AppState;
use autospares_gemini::GeminiProvider;
use autospares_mpesa::MpesaGateway;
use autospares_storage::SqliteStorage;
use tracing::{error, info, warn};

use crate::shutdown;

/// Runs the `autospares serve` command.
pub async fn run_serve(config: StoreConfig) -> Result<(), StoreError> {
    init_tracing(&config.server.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting autospares serve");

    let storage = open_storage(&config).await?;

    let provider = GeminiProvider::new(&config).await.map_err(|e| {
        error!(error = %e, "failed to initialize Gemini provider");
        eprintln!("error: Gemini API key required. Set gemini.api_key or GEMINI_API_KEY.");
        e
    })?;
    let provider = Arc::new(provider);

    let gateway = Arc::new(MpesaGateway::new(
        &config.mpesa,
        default_callback_url(&config),
    )?);
    info!(callback_url = gateway.callback_url(), "mpesa callbacks configured");

    let mailer: Option<Arc<dyn MailAdapter>> = match SmtpMailer::from_config(&config.email)? {
        Some(mailer) => Some(Arc::new(mailer)),
        None => {
            warn!("email.smtp_host not set, invoice email disabled");
            None
        }
    };

    let events = CartEvents::new();
    let services = ToolServices {
        storage: storage.clone(),
        cart: CartService::new(storage.clone(), events),
        orders: OrderService::new(storage.clone(), config.checkout.clone()),
        payments: PaymentService::new(storage.clone(), gateway.clone()),
    };
    let engine = Arc::new(ChatEngine::new(
        provider.clone(),
        services.clone(),
        config.chat.clone(),
    ));

    let state = AppState::new(
        engine,
        services,
        mailer.clone(),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let cancel = shutdown::install_signal_handler();
    let served = autospares_gateway::start_server(&config.server, state, cancel.clone()).await;

    // Adapters shut down even when the server failed.
    cancel.cancel();
    shutdown_adapter(provider.as_ref()).await;
    shutdown_adapter(gateway.as_ref()).await;
    if let Some(mailer) = &mailer
        && let Err(e) = mailer.shutdown().await
    {
        warn!(adapter = mailer.name(), error = %e, "adapter shutdown failed");
    }
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }

    served?;
    info!("autospares serve shutdown complete");
    Ok(())
}

async fn shutdown_adapter(adapter: &dyn PluginAdapter) {
    if let Err(e) = adapter.shutdown().await {
        warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
    }
}

/// Open and migrate the configured database.
pub async fn open_storage(config: &StoreConfig) -> Result<Arc<dyn StorageAdapter>, StoreError> {
    if let Some(parent) = std::path::Path::new(&config.storage.database_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Storage { source: e.into() })?;
    }
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");
    Ok(Arc::new(storage))
}

/// `http://<host>:<port>/v1/mpesa/callback`, used when `mpesa.callback_url` is unset.
pub fn default_callback_url(config: &StoreConfig) -> String {
    format!(
        "http://{}:{}/v1/mpesa/callback",
        config.server.host, config.server.port
    )
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("autospares={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
