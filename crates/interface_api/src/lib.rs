//! HTTP API Layer
//!
//! REST surface of the case desk using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: cases, finances, invoices, the three directory collections
//!   and the dropdown helper
//! - **Middleware**: JWT authentication, request ids, tracing, audit logging
//! - **DTOs**: query strings and small request bodies
//! - **Error Handling**: domain errors mapped to status codes with a JSON body
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::postgres(pool, config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod extract;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_cases::{
    CaseLifecycle, CasePort, CaseService, FinancePort, InvoicePort, IssueLogPort, LifecyclePort,
    ReportingService, SequencePort,
};
use domain_directory::{ActiveCaseCounter, Directory, DirectoryService, EntityKind};
use infra_db::{DatabasePool, PostgresCaseAdapter, PostgresDirectoryAdapter};

use crate::config::ApiConfig;
use crate::handlers::{cases, directory, finances, health, invoices, utils};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub cases: Arc<CaseService>,
    pub lifecycle: Arc<CaseLifecycle>,
    pub reporting: Arc<ReportingService>,
    pub directory: Arc<DirectoryService>,
    pub case_store: Arc<dyn CasePort>,
}

impl AppState {
    /// Wires the services over one case store and a directory
    pub fn new<S>(config: ApiConfig, store: Arc<S>, directory: Directory) -> Self
    where
        S: CasePort
            + FinancePort
            + InvoicePort
            + SequencePort
            + IssueLogPort
            + LifecyclePort
            + ActiveCaseCounter
            + 'static,
    {
        let lifecycle = CaseLifecycle::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            directory.clone(),
            config.lifecycle(),
        );

        Self {
            cases: Arc::new(CaseService::new(store.clone(), store.clone(), directory.clone())),
            lifecycle: Arc::new(lifecycle),
            reporting: Arc::new(ReportingService::new(store.clone())),
            directory: Arc::new(DirectoryService::new(directory, store.clone())),
            case_store: store,
            config,
        }
    }

    /// Postgres-backed state
    pub fn postgres(pool: DatabasePool, config: ApiConfig) -> Self {
        let directory = Directory::new(
            Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Clients)),
            Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Providers)),
            Arc::new(PostgresDirectoryAdapter::new(pool.clone(), EntityKind::Hospitals)),
        );
        Self::new(config, Arc::new(PostgresCaseAdapter::new(pool)), directory)
    }
}

/// Creates the main API router
///
/// Health routes are public; everything under `/api` requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let case_routes = Router::new()
        .route("/", get(cases::list_cases).post(cases::create_case))
        .route("/monthly-entity-counts", get(cases::monthly_entity_counts))
        .route("/closed-case-count", get(cases::closed_case_count))
        .route(
            "/:id",
            get(cases::get_case).put(cases::update_case).delete(cases::delete_case),
        )
        .route("/:id/in-review", put(cases::move_to_review));

    let finance_routes = Router::new()
        .route("/", get(finances::list_finances))
        .route("/:id", get(finances::get_finance))
        .route("/:id/status", put(finances::update_finance_status));

    let invoice_routes = Router::new()
        .route("/", get(invoices::list_invoices))
        .route("/:id", get(invoices::get_invoice))
        .route("/:id/status", put(invoices::update_invoice_status));

    let api_routes = Router::new()
        .nest("/cases", case_routes)
        .nest("/finances", finance_routes)
        .nest("/invoices", invoice_routes)
        .nest("/clients", directory::routes(EntityKind::Clients))
        .nest("/providers", directory::routes(EntityKind::Providers))
        .nest("/hospitals", directory::routes(EntityKind::Hospitals))
        .route("/utils/dropdown-data", get(utils::dropdown_data))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
