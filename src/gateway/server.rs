//! Gateway server

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::auth::ResolvedAuthConfig;
use super::redaction::RedactionState;
use super::router::{AppState, create_router};
use crate::agent::{
    AgentOrchestrator, HttpApiCaller, OracleAnswerSynthesizer, OracleIntentResolver,
};
use crate::config::Config;
use crate::oracle::{GeminiClient, TextGenerator};
use crate::routes::builtin_catalog;
use crate::{Error, Result};

/// Wire the production orchestrator: built-in catalog, Gemini oracle and
/// the HTTP application caller
pub fn build_orchestrator(config: &Config) -> Result<AgentOrchestrator> {
    let catalog = Arc::new(builtin_catalog()?);
    let oracle: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(&config.oracle)?);

    if !oracle.is_configured() {
        warn!("Oracle API key is not set; every agent request will report no decision");
    }

    let marker = if config.agent.mark_outbound_requests {
        Some(config.redaction.marker_header_name()?)
    } else {
        None
    };
    let caller = HttpApiCaller::new(&config.agent, marker)?;

    Ok(AgentOrchestrator::new(
        catalog,
        Arc::new(OracleIntentResolver::new(Arc::clone(&oracle))),
        Arc::new(caller),
        Arc::new(OracleAnswerSynthesizer::new(oracle)),
    ))
}

/// Agent gateway server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Router with all layers applied
    app: Router,
    /// Number of allow-listed operations
    operation_count: usize,
}

impl Gateway {
    /// Create a new gateway
    pub fn new(config: Config) -> Result<Self> {
        let orchestrator = build_orchestrator(&config)?;
        let operation_count = orchestrator.catalog().len();

        let state = Arc::new(AppState {
            orchestrator,
            auth_config: Arc::new(ResolvedAuthConfig::from_config(&config.auth)?),
            redaction: Arc::new(RedactionState::from_config(&config.redaction)?),
            request_timeout: config.server.request_timeout,
            max_body_size: config.server.max_body_size,
        });

        Ok(Self {
            app: create_router(state),
            config,
            operation_count,
        })
    }

    /// The fully layered router
    #[must_use]
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Run the gateway
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("AGENT GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(operations = self.operation_count, "Operations allow-listed");
        info!(api_base_url = %self.config.agent.api_base_url, "Application API");
        info!(model = %self.config.oracle.model, "Reasoning oracle");

        if self.config.auth.enabled {
            info!("AUTHENTICATION enabled (HS256 bearer tokens)");
        } else {
            warn!("AUTHENTICATION disabled - prompts run as '{}'", super::auth::ANONYMOUS);
        }

        if self.config.redaction.enabled {
            info!(
                marker = %self.config.redaction.marker_header,
                fields = self.config.redaction.redacted_fields.len(),
                "Response redaction enabled"
            );
        }

        info!(
            "  POST http://{}:{}/agent/run",
            self.config.server.host, self.config.server.port
        );
        info!("============================================================");

        let server = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
            .into_future();

        let mut shutdown_rx = shutdown_tx.subscribe();
        let shutdown_timeout = self.config.server.shutdown_timeout;
        let drain_deadline = async move {
            let _ = shutdown_rx.recv().await;
            tokio::time::sleep(shutdown_timeout).await;
        };

        tokio::select! {
            result = server => result.map_err(|e| Error::Internal(e.to_string()))?,
            () = drain_deadline => {
                warn!(
                    timeout = ?shutdown_timeout,
                    "Shutdown timeout elapsed, dropping in-flight requests"
                );
            }
        }

        info!("Gateway stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
