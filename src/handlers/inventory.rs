use super::common::{map_service_error, success_response, PaginationParams};
use crate::{
    auth::AuthenticatedUser, errors::ApiError, handlers::AppState, ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

/// The caller's stock position, as materialized by delivered orders
#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    params(PaginationParams),
    responses((status = 200, description = "Inventory listed")),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = pagination.normalized();
    let (items, total) = state
        .services
        .inventory
        .list_inventory(&user, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(PaginatedResponse {
        total_pages: total.div_ceil(per_page),
        items,
        total,
        page,
        limit: per_page,
    })))
}

pub fn inventory_router() -> Router<AppState> {
    Router::new().route("/inventory", get(list_inventory))
}
