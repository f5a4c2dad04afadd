//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the secret mapping from config and environment
//! - Initialize the upstream client and analytics store
//! - Assemble the gateway, HTTP server and retention job
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners are bound by the caller, after everything here succeeds

use std::sync::Arc;

use thiserror::Error;

use crate::analytics::{AnalyticsError, AnalyticsSink, RetentionJob, SqliteAnalyticsSink};
use crate::config::GatewayConfig;
use crate::gateway::{Gateway, HttpDispatcher, SecretMap};
use crate::http::HttpServer;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

/// Everything `main` needs to start serving.
pub struct Components {
    pub server: HttpServer,
    pub retention: Option<RetentionJob>,
}

/// Wire the subsystems described by `config`.
pub fn build(config: &GatewayConfig) -> Result<Components, StartupError> {
    let secrets = SecretMap::from_env_with(&config.secrets);
    if secrets.is_empty() {
        tracing::warn!("No service secrets configured; callers must send x-gateway-service-token");
    } else {
        tracing::info!(count = secrets.len(), "Service secrets loaded");
    }

    let dispatcher = HttpDispatcher::new(&config.upstream)?;

    let analytics: Option<Arc<dyn AnalyticsSink>> = if config.analytics.enabled {
        let sink: Arc<dyn AnalyticsSink> =
            Arc::new(SqliteAnalyticsSink::open(&config.analytics.database_path)?);
        Some(sink)
    } else {
        tracing::info!("Exchange analytics disabled");
        None
    };

    let retention = match (&analytics, config.retention.enabled) {
        (Some(sink), true) => Some(RetentionJob::new(Arc::clone(sink), &config.retention)),
        _ => None,
    };

    let gateway = Gateway::new(
        Arc::new(secrets),
        Arc::new(dispatcher),
        analytics,
        &config.upstream,
    );
    let server = HttpServer::new(config.listener.clone(), Arc::new(gateway));

    Ok(Components { server, retention })
}
