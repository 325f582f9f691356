//! Public vendor-facing endpoints. No session: the unguessable token is the
//! capability, and the only accepted lookup key.

use super::common::{map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::vendor_requests::{SubmitVendorResponseInput, VendorResponseLineInput},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct VendorResponseLineRequest {
    pub snapshot_item_id: Uuid,
    #[validate(range(min = 1))]
    pub unit_price: i64,
    #[validate(length(min = 3, max = 8))]
    pub currency: Option<String>,
    #[validate(range(min = 0))]
    pub lead_time_days: Option<i32>,
    #[validate(range(min = 1))]
    pub minimum_order_quantity: Option<i32>,
    #[validate(length(max = 100))]
    pub vendor_sku: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitVendorResponseRequest {
    #[validate(length(min = 1, max = 255))]
    pub vendor_name: Option<String>,
    #[validate(length(min = 1, message = "At least one priced line is required"))]
    pub items: Vec<VendorResponseLineRequest>,
}

/// Vendor view of a request: the frozen snapshot plus any lines already
/// submitted against it.
#[utoipa::path(
    get,
    path = "/api/v1/vendor-responses/{token}",
    params(("token" = String, Path, description = "Vendor response token")),
    responses(
        (status = 200, description = "Request found"),
        (status = 400, description = "Malformed token", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown token", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-responses"
)]
pub async fn view_request(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (request, responses) = state
        .services
        .vendor_requests
        .get_request_by_token(&token)
        .await
        .map_err(map_service_error)?;

    let snapshot_items = request.snapshot_items().map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(json!({
        "request": {
            "id": request.id,
            "vendor_name": request.vendor_name,
            "status": request.status,
            "expires_at": request.expires_at,
            "responded_at": request.responded_at,
            "response_edit_count": request.response_edit_count,
            "response_edit_limit": request.response_edit_limit,
        },
        "snapshot_items": snapshot_items,
        "responses": responses,
    }))))
}

/// Submit or revise a vendor response against the frozen snapshot
#[utoipa::path(
    post,
    path = "/api/v1/vendor-responses/{token}",
    params(("token" = String, Path, description = "Vendor response token")),
    request_body = SubmitVendorResponseRequest,
    responses(
        (status = 200, description = "Response recorded"),
        (status = 409, description = "Edit limit reached", body = crate::errors::ErrorResponse),
        (status = 410, description = "Request expired or cancelled", body = crate::errors::ErrorResponse),
        (status = 422, description = "Lines outside the snapshot", body = crate::errors::ErrorResponse)
    ),
    tag = "vendor-responses"
)]
pub async fn submit_response(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<SubmitVendorResponseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = SubmitVendorResponseInput {
        vendor_name: payload.vendor_name,
        items: payload
            .items
            .into_iter()
            .map(|line| VendorResponseLineInput {
                snapshot_item_id: line.snapshot_item_id,
                unit_price: line.unit_price,
                currency: line.currency,
                lead_time_days: line.lead_time_days,
                minimum_order_quantity: line.minimum_order_quantity,
                vendor_sku: line.vendor_sku,
                notes: line.notes,
            })
            .collect(),
    };

    let outcome = state
        .services
        .vendor_requests
        .submit_response(&token, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(json!({
        "vendor_request_id": outcome.vendor_request_id,
        "is_edit": outcome.is_edit,
        "edit_count": outcome.edit_count,
        "edit_limit": outcome.edit_limit,
        "changed_lines": outcome.changed_lines,
    }))))
}

pub fn vendor_responses_router() -> Router<AppState> {
    Router::new().route(
        "/vendor-responses/:token",
        get(view_request).post(submit_response),
    )
}
