use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deploy_sync::command::{ProcessRunner, redact_credentials};
use deploy_sync::config::{Config, Stage};
use deploy_sync::report::TracingReporter;
use deploy_sync::server::{AppState, build_router};
use deploy_sync::workflows::Engine;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deploy_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        stage = %config.stage,
        release = config.release.as_deref().unwrap_or("unknown"),
        primary = %config.primary.id,
        downstream = %config.downstream.id,
        "Starting deploy-sync"
    );
    if config.webhook_secret.is_empty() {
        warn!("GITHUB_WEBHOOK_SECRET is empty, webhook signatures will not be checked");
    }
    if config.api_secret.is_empty() {
        warn!("DEPLOY_SYNC_API_SECRET is empty, revert API signatures will not be checked");
    }
    if config.trusted_mode && config.stage != Stage::Development {
        warn!(
            stage = %config.stage,
            "TRUSTED_MODE is on, pull requests from any repository can trigger bumps"
        );
    }
    if config.dry_run {
        info!("Dry run mode: on");
    } else {
        warn!(
            branch = %config.downstream.default_branch,
            remote = %redact_credentials(&config.downstream.remote_url),
            "Dry run mode: OFF, bumps will be pushed to {}",
            config.downstream.id
        );
    }

    let config = Arc::new(config);
    let runner = Arc::new(ProcessRunner::new(config.command_timeout));
    let engine = Engine::new(config.clone(), runner);

    if config.fast_startup {
        info!("FAST_STARTUP set, checkouts will be synced on first use");
    } else if let Err(e) = engine.checkouts().sync_all().await {
        error!(error = %e, "Initial checkout sync failed");
        return ExitCode::FAILURE;
    }

    let app = build_router(AppState::new(engine, Arc::new(TracingReporter)));

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.listen_addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!("listening on {}", config.listen_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    info!("Shut down");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
