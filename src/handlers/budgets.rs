use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginationParams,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    handlers::AppState,
    services::budgets::CreateBudgetInput,
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBudgetRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1))]
    pub total_amount: i64,
    #[validate(length(min = 3, max = 8))]
    pub currency: Option<String>,
    #[serde(default)]
    pub organization_scoped: bool,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActiveBudgetQuery {
    /// `user` (default) or `organization`
    #[serde(default)]
    pub scope: Option<String>,
}

/// Create a budget and make it the active one for its scope
#[utoipa::path(
    post,
    path = "/api/v1/budgets",
    request_body = CreateBudgetRequest,
    responses(
        (status = 201, description = "Budget created"),
        (status = 403, description = "Admin role required", body = crate::errors::ErrorResponse)
    ),
    tag = "budgets"
)]
pub async fn create_budget(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateBudgetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let budget = state
        .services
        .budgets
        .create_budget(
            &user,
            CreateBudgetInput {
                name: payload.name,
                total_amount: payload.total_amount,
                currency: payload.currency,
                organization_scoped: payload.organization_scoped,
                period_start: payload.period_start,
                period_end: payload.period_end,
            },
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(budget)))
}

/// The budget currently consulted for authorization in the given scope
#[utoipa::path(
    get,
    path = "/api/v1/budgets/active",
    responses((status = 200, description = "Active budget, if any")),
    tag = "budgets"
)]
pub async fn get_active_budget(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ActiveBudgetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_scoped = matches!(query.scope.as_deref(), Some("organization"));
    let budget = state
        .services
        .budgets
        .get_active_budget(&user, organization_scoped)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(budget)))
}

/// Deactivate a budget (it stays attributable, just stops authorizing)
#[utoipa::path(
    post,
    path = "/api/v1/budgets/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Budget id")),
    responses((status = 200, description = "Budget deactivated")),
    tag = "budgets"
)]
pub async fn deactivate_budget(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let budget = state
        .services
        .budgets
        .deactivate_budget(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(budget)))
}

/// A budget's ledger, newest first
#[utoipa::path(
    get,
    path = "/api/v1/budgets/{id}/transactions",
    params(("id" = Uuid, Path, description = "Budget id"), PaginationParams),
    responses((status = 200, description = "Ledger listed")),
    tag = "budgets"
)]
pub async fn list_budget_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = pagination.normalized();
    let (entries, total) = state
        .services
        .budgets
        .list_transactions(&user, id, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(PaginatedResponse {
        total_pages: total.div_ceil(per_page),
        items: entries,
        total,
        page,
        limit: per_page,
    })))
}

pub fn budgets_router() -> Router<AppState> {
    Router::new()
        .route("/budgets", post(create_budget))
        .route("/budgets/active", get(get_active_budget))
        .route("/budgets/:id/deactivate", post(deactivate_budget))
        .route("/budgets/:id/transactions", get(list_budget_transactions))
}
