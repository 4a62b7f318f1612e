//! # billbook-api: HTTP Surface for Billbook
//!
//! REST API over the billing, return and exchange workflows, built on axum.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Request Path                                   │
//! │                                                                         │
//! │  HTTP ──► TraceLayer ──► CORS ──► require_auth ──► request_log         │
//! │                                        │                                │
//! │                          401 ◄── no/invalid bearer token                │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                         handler: principal.require(Capability)         │
//! │                                        │                                │
//! │                          403 ◄── role lacks capability                  │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                         DTO ──► workflow (billbook-db) ──► DTO ──► JSON │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`auth`] - JWT verification into a `Principal`
//! - [`middleware`] - auth and request logging layers, JSON/query extractors
//! - [`handlers`] - one module per resource
//! - [`dto`] - wire shapes with decimal money
//! - [`error`] - `ApiError` and the status mapping
//! - [`config`] - environment configuration

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::middleware as axum_middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::handlers::{bills, exchange, health, items, notifications, reports, returns};
use crate::middleware::{request_log, require_auth};
use billbook_db::{BillingEngine, Catalog, Database, ExchangeWorkflow, Reports, ReturnWorkflow};

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: BillingEngine,
    pub returns: ReturnWorkflow,
    pub exchange: ExchangeWorkflow,
    pub catalog: Catalog,
    pub reports: Reports,
    pub jwt: JwtManager,
}

impl AppState {
    pub fn new(db: Database, config: &ApiConfig) -> Self {
        let policy = config.return_policy();
        AppState {
            engine: BillingEngine::new(db.clone()),
            returns: ReturnWorkflow::new(db.clone(), policy),
            exchange: ExchangeWorkflow::new(db.clone(), policy),
            catalog: Catalog::new(db.clone()),
            reports: Reports::new(db.clone()),
            jwt: JwtManager::new(config.jwt_secret.clone(), config.jwt_expiration_secs),
            db,
        }
    }
}

/// Creates the API router with every route and layer.
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Bill routes. Static segments win over `/:id`.
    let bill_routes = Router::new()
        .route("/", post(bills::create_bill).get(bills::list_bills))
        .route("/all", get(bills::all_bills))
        .route("/next-bill-number", get(bills::next_bill_number))
        .route("/status", get(bills::bills_by_status))
        .route("/summary", get(reports::summary))
        .route("/summary/my", get(reports::my_summary))
        .route("/count", get(reports::bill_count))
        .route("/status-ratio", get(reports::status_ratio))
        .route("/unique-customers", get(reports::unique_customers))
        .route("/customers/list", get(reports::customer_directory))
        .route("/top-customers", get(reports::top_customers))
        .route("/top-customers/my", get(reports::my_top_customers))
        .route("/top-editors", get(reports::top_staff))
        .route("/weekly-sales", get(reports::weekly_sales))
        .route("/weekly-sales/my", get(reports::my_weekly_sales))
        .route("/total-sales-details", get(reports::sales_details))
        .route("/agents", get(reports::agent_commissions))
        .route("/agent-bills/:name", get(bills::agent_bills))
        .route("/delete-agent/:name", delete(bills::delete_agent_commission))
        .route("/exchanged", get(bills::exchanged_bills))
        .route("/count/exchange", get(reports::exchange_bill_count))
        .route("/count/return", get(reports::return_bill_count))
        .route("/number/:bill_number", get(bills::bill_by_number))
        .route("/mine/suggestions", get(bills::suggestions))
        .route(
            "/:id",
            get(bills::get_bill)
                .put(bills::update_bill)
                .delete(bills::delete_bill),
        );

    let return_routes = Router::new()
        .route("/submit", post(returns::submit_return))
        .route("/requests", get(returns::list_requests))
        .route("/requests/:id/approve", post(returns::approve_request))
        .route("/requests/:id/reject", post(returns::reject_request))
        .route("/refund/:return_id", patch(returns::allot_refund))
        .route("/refund/bill/:bill_id", put(returns::refund_bill));

    let item_routes = Router::new()
        .route("/", post(items::create_item).get(items::list_items))
        .route("/:id", get(items::get_item).delete(items::delete_item));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/:id/read", put(notifications::mark_read));

    // Protected routes
    let api_routes = Router::new()
        .nest("/bills", bill_routes)
        .nest("/returns", return_routes)
        .nest("/items", item_routes)
        .nest("/notifications", notification_routes)
        .route("/exchange-request", post(exchange::request_exchange))
        .layer(axum_middleware::from_fn(request_log))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
