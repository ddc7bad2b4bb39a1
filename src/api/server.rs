//! API Server
//!
//! Binds the router to a socket with the standard middleware stack.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::ServerConfig;
use crate::engine::CasinoService;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

pub struct ApiServer {
    config: ServerConfig,
    casino: Arc<CasinoService>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, casino: Arc<CasinoService>) -> Self {
        Self { config, casino }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.create_app();
        let addr = self.socket_addr()?;

        info!("Starting venue casino API on http://{}", addr);
        self.log_server_info();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server stopped gracefully");
        Ok(())
    }

    /// Router with the full middleware stack
    pub fn create_app(&self) -> axum::Router {
        build_app(self.casino.clone(), &self.config)
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_server_info(&self) {
        let games = &self.casino.config().games;
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);
        info!(
            "   Buy-back offer TTL: {}s",
            self.casino.config().buy_back.offer_ttl_secs
        );
        info!("   Lottery term: {}s", self.casino.config().lottery.term_secs);
        for game in crate::games::GameType::ALL {
            let rules = games.rules(game);
            info!(
                "   {}: claim cost {}, default max bet {}, shortfall {:?}",
                game, rules.claim_cost, rules.default_max_bet, rules.shortfall_policy
            );
        }
        if self.config.allowed_origins.iter().any(|o| o == "*") {
            warn!("CORS allows every origin");
        }
    }
}

/// Application router shared by the server and in-process tests
pub fn build_app(casino: Arc<CasinoService>, config: &ServerConfig) -> axum::Router {
    let state = Arc::new(AppState {
        casino,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    create_router(state)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(create_cors_layer(config.allowed_origins.clone()))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
