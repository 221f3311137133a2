//! HTTP gateway over the ledger, aggregation and rate scraping services.

pub mod dto;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::application::{AggregationService, LedgerService};
use crate::rates::RateScraper;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub aggregation: Arc<AggregationService>,
    pub scraper: Arc<RateScraper>,
}

impl AppState {
    pub fn new(
        ledger: LedgerService,
        aggregation: AggregationService,
        scraper: RateScraper,
    ) -> Self {
        Self {
            ledger: Arc::new(ledger),
            aggregation: Arc::new(aggregation),
            scraper: Arc::new(scraper),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/accounts",
            post(handlers::create_account).get(handlers::list_accounts),
        )
        .route("/accounts/deposit", post(handlers::deposit))
        .route("/accounts/withdraw", post(handlers::withdraw))
        .route("/accounts/transfer", post(handlers::transfer))
        .route(
            "/accounts/:id",
            get(handlers::get_account)
                .put(handlers::update_account)
                .delete(handlers::delete_account),
        )
        .route("/batch_calc", get(handlers::batch_calc))
        .route("/scraper/rates", get(handlers::interest_rates))
        .route("/scraper/banks", get(handlers::bank_names))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("listening on {addr}");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!("Failed to listen for shutdown signal: {err}");
            std::future::pending::<()>().await;
        }
    }
}
