//! JSON API over the customer store and the analytics built on it.
//!
//! - `GET  /api/v1/customers`       — every customer in creation order
//! - `POST /api/v1/customers`       — capture a customer (400 on missing fields or location)
//! - `GET  /api/v1/customers/{id}`  — one customer (404 when absent)
//! - `GET  /api/v1/dashboard`       — totals, segment counts, and top customers by volume
//! - `GET  /api/v1/map`             — markers, bounds, and view centre
//! - `POST /api/v1/analysis`        — model-backed analysis; always 200 with a displayable result

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use sachet_agent::CustomerAnalyst;
use sachet_core::analytics::analysis::{AnalysisOutcome, AnalysisResult};
use sachet_core::analytics::dashboard::DashboardSnapshot;
use sachet_core::analytics::segments::SegmentRules;
use sachet_core::analytics::summary::SummaryOptions;
use sachet_core::domain::customer::{Customer, CustomerId, NewCustomer};
use sachet_core::errors::{ApplicationError, DomainError};
use sachet_core::map::MapView;
use sachet_db::{CustomerRepository, RepositoryError};

#[derive(Clone)]
pub struct ApiState {
    customers: Arc<dyn CustomerRepository>,
    analyst: Arc<CustomerAnalyst>,
    rules: SegmentRules,
    summary: SummaryOptions,
}

impl ApiState {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        analyst: Arc<CustomerAnalyst>,
        summary: SummaryOptions,
    ) -> Self {
        let rules = *analyst.rules();
        Self { customers, analyst, rules, summary }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/customers", get(list_customers).post(create_customer))
        .route("/api/v1/customers/{id}", get(get_customer))
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/map", get(map_view))
        .route("/api/v1/analysis", post(run_analysis))
        .with_state(state)
}

async fn list_customers(State(state): State<ApiState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(load_customers(&state).await?))
}

async fn create_customer(
    State(state): State<ApiState>,
    Json(request): Json<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = request
        .into_customer(Utc::now())
        .map_err(|error| api_error(ApplicationError::Domain(error)))?;

    state.customers.save(customer.clone()).await.map_err(repository_error)?;
    info!(
        event_name = "customer.created",
        customer_id = %customer.id,
        average_bags = customer.average_bags,
        "customer captured"
    );

    Ok((StatusCode::CREATED, Json(customer)))
}

async fn get_customer(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let id = id
        .parse::<CustomerId>()
        .map_err(|_| api_error(ApplicationError::Domain(DomainError::MalformedCustomerId(id))))?;

    match state.customers.find_by_id(&id).await.map_err(repository_error)? {
        Some(customer) => Ok(Json(customer)),
        None => Err(api_error(ApplicationError::Domain(DomainError::CustomerNotFound(id)))),
    }
}

async fn dashboard(State(state): State<ApiState>) -> ApiResult<Json<DashboardSnapshot>> {
    let customers = load_customers(&state).await?;
    Ok(Json(DashboardSnapshot::build(&customers, &state.rules, &state.summary, &Utc::now())))
}

async fn map_view(State(state): State<ApiState>) -> ApiResult<Json<MapView>> {
    let customers = load_customers(&state).await?;
    Ok(Json(MapView::from_customers(&customers, &state.rules)))
}

/// Store failures still surface as errors; only the model call is folded into a fallback.
async fn run_analysis(State(state): State<ApiState>) -> ApiResult<Json<AnalysisResponse>> {
    let customers = load_customers(&state).await?;
    let outcome = state.analyst.analyze(&customers, &Utc::now()).await;

    let reason = match &outcome {
        AnalysisOutcome::Unavailable { reason } => Some(reason.clone()),
        _ => None,
    };
    Ok(Json(AnalysisResponse { outcome: outcome.kind(), reason, result: outcome.into_result() }))
}

async fn load_customers(state: &ApiState) -> ApiResult<Vec<Customer>> {
    state.customers.list().await.map_err(repository_error)
}

fn repository_error(error: RepositoryError) -> (StatusCode, Json<ApiError>) {
    error!(event_name = "customer.store.error", error = %error, "customer store call failed");
    api_error(ApplicationError::Persistence(error.to_string()))
}

fn api_error(error: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(Uuid::new_v4().to_string());
    let status = StatusCode::from_u16(interface.kind.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        Json(ApiError {
            error: interface.kind.user_message().to_string(),
            detail: interface.message,
            correlation_id: interface.correlation_id,
        }),
    )
}
