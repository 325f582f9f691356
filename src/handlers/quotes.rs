use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser,
    commands::orders::ConvertQuoteCommand,
    entities::quote::QuoteStatus,
    errors::ApiError,
    handlers::AppState,
    services::quotes::{CreateQuoteInput, ItemPriceUpdate, QuoteItemInput},
    services::vendor_requests::{CreateVendorRequestsInput, VendorContact},
    ApiResponse, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::PaginationParams;

// Request DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateQuoteItemRequest {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub product_name: String,
    pub brand: Option<String>,
    pub catalog_number: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit: Option<String>,
    #[validate(range(min = 1))]
    pub unit_price: Option<i64>,
    pub pack_size: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateQuoteRequest {
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CreateQuoteItemRequest>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    #[validate(length(min = 3, max = 8))]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuoteTransitionRequest {
    pub status: QuoteStatus,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PriceUpdateItemRequest {
    pub item_id: Uuid,
    #[validate(range(min = 1))]
    pub unit_price: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SetQuotePricingRequest {
    #[validate(length(min = 1, message = "At least one price update is required"))]
    pub items: Vec<PriceUpdateItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct VendorContactRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVendorRequestsRequest {
    #[validate(length(min = 1, message = "At least one vendor is required"))]
    pub vendors: Vec<VendorContactRequest>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    #[validate(range(min = 1, max = 90))]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConvertQuoteRequest {
    #[validate(length(max = 500))]
    pub shipping_address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

// Handler functions

/// Create a quote with its line items
#[utoipa::path(
    post,
    path = "/api/v1/quotes",
    request_body = CreateQuoteRequest,
    responses(
        (status = 201, description = "Quote created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn create_quote(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateQuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateQuoteInput {
        items: payload
            .items
            .into_iter()
            .map(|item| QuoteItemInput {
                product_id: item.product_id,
                product_name: item.product_name,
                brand: item.brand,
                catalog_number: item.catalog_number,
                quantity: item.quantity,
                unit: item.unit,
                unit_price: item.unit_price,
                pack_size: item.pack_size,
                notes: item.notes,
            })
            .collect(),
        message: payload.message,
        currency: payload.currency,
    };

    let (quote, items) = state
        .services
        .quotes
        .create_quote(&user, input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(
        json!({ "quote": quote, "items": items }),
    )))
}

/// List the caller's quotes
#[utoipa::path(
    get,
    path = "/api/v1/quotes",
    params(PaginationParams),
    responses((status = 200, description = "Quotes listed")),
    tag = "quotes"
)]
pub async fn list_quotes(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = pagination.normalized();
    let (quotes, total) = state
        .services
        .quotes
        .list_quotes(&user, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(PaginatedResponse {
        total_pages: total.div_ceil(per_page),
        items: quotes,
        total,
        page,
        limit: per_page,
    })))
}

/// Fetch one quote with its items
#[utoipa::path(
    get,
    path = "/api/v1/quotes/{id}",
    params(("id" = Uuid, Path, description = "Quote id")),
    responses(
        (status = 200, description = "Quote found"),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn get_quote(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (quote, items) = state
        .services
        .quotes
        .get_quote(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        json!({ "quote": quote, "items": items }),
    )))
}

/// Request a quote status transition
#[utoipa::path(
    post,
    path = "/api/v1/quotes/{id}/status",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = QuoteTransitionRequest,
    responses(
        (status = 200, description = "Transition applied"),
        (status = 400, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn transition_quote(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuoteTransitionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let quote = state
        .services
        .quotes
        .request_transition(&user, id, payload.status, payload.reason)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(quote)))
}

/// Apply chosen prices to quote lines
#[utoipa::path(
    post,
    path = "/api/v1/quotes/{id}/pricing",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = SetQuotePricingRequest,
    responses((status = 200, description = "Pricing applied")),
    tag = "quotes"
)]
pub async fn set_quote_pricing(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetQuotePricingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updates = payload
        .items
        .into_iter()
        .map(|item| ItemPriceUpdate {
            item_id: item.item_id,
            unit_price: item.unit_price,
        })
        .collect();

    let (quote, items) = state
        .services
        .quotes
        .set_item_pricing(&user, id, updates)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        json!({ "quote": quote, "items": items }),
    )))
}

/// Send the quote out to vendors
#[utoipa::path(
    post,
    path = "/api/v1/quotes/{id}/vendor-requests",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = CreateVendorRequestsRequest,
    responses((status = 201, description = "Vendor requests created")),
    tag = "vendor-requests"
)]
pub async fn create_vendor_requests(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVendorRequestsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateVendorRequestsInput {
        vendors: payload
            .vendors
            .into_iter()
            .map(|v| VendorContact {
                name: v.name,
                email: v.email,
            })
            .collect(),
        message: payload.message,
        expires_in_days: payload.expires_in_days,
    };

    let outcome = state
        .services
        .vendor_requests
        .create_requests(&user, id, input)
        .await
        .map_err(map_service_error)?;

    let sent = outcome.dispatches.iter().filter(|d| d.sent).count();
    Ok(created_response(ApiResponse::success(json!({
        "requests": outcome.requests,
        "dispatches": outcome
            .dispatches
            .iter()
            .map(|d| json!({ "vendor_email": d.vendor_email, "sent": d.sent }))
            .collect::<Vec<_>>(),
        "summary": format!("{} of {} emails sent", sent, outcome.dispatches.len()),
    }))))
}

/// List a quote's vendor requests (lazily expiring stale ones)
#[utoipa::path(
    get,
    path = "/api/v1/quotes/{id}/vendor-requests",
    params(("id" = Uuid, Path, description = "Quote id")),
    responses((status = 200, description = "Vendor requests listed")),
    tag = "vendor-requests"
)]
pub async fn list_vendor_requests(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .services
        .vendor_requests
        .get_requests(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(requests)))
}

/// Cancel an outstanding vendor request
#[utoipa::path(
    delete,
    path = "/api/v1/vendor-requests/{id}",
    params(("id" = Uuid, Path, description = "Vendor request id")),
    responses((status = 200, description = "Vendor request cancelled")),
    tag = "vendor-requests"
)]
pub async fn cancel_vendor_request(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let request = state
        .services
        .vendor_requests
        .cancel_request(&user, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(request)))
}

/// Convert a completed quote into an order
#[utoipa::path(
    post,
    path = "/api/v1/quotes/{id}/convert",
    params(("id" = Uuid, Path, description = "Quote id")),
    request_body = ConvertQuoteRequest,
    responses(
        (status = 201, description = "Order created"),
        (status = 409, description = "Quote already ordered", body = crate::errors::ErrorResponse),
        (status = 422, description = "Budget refused the amount", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn convert_quote(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConvertQuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let command = ConvertQuoteCommand {
        quote_id: id,
        requester_id: user.user_id,
        shipping_address: payload.shipping_address,
        notes: payload.notes,
    };

    let result = state
        .services
        .orders
        .convert_quote(command)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(json!({
        "order": result.order,
        "items": result.items,
        "ledger_entry": result.ledger_entry,
    }))))
}

/// Routes mounted under `/api/v1`.
pub fn quotes_router() -> Router<AppState> {
    Router::new()
        .route("/quotes", post(create_quote).get(list_quotes))
        .route("/quotes/:id", get(get_quote))
        .route("/quotes/:id/status", post(transition_quote))
        .route("/quotes/:id/pricing", post(set_quote_pricing))
        .route(
            "/quotes/:id/vendor-requests",
            post(create_vendor_requests).get(list_vendor_requests),
        )
        .route("/quotes/:id/convert", post(convert_quote))
        .route("/vendor-requests/:id", delete(cancel_vendor_request))
}
