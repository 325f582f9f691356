use utoipa::OpenApi;

/// Aggregated API documentation, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LabQuote API",
        description = "Laboratory procurement: quote lifecycle, vendor request exchange, budget ledger and order conversion"
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::quotes::create_quote,
        crate::handlers::quotes::list_quotes,
        crate::handlers::quotes::get_quote,
        crate::handlers::quotes::transition_quote,
        crate::handlers::quotes::set_quote_pricing,
        crate::handlers::quotes::create_vendor_requests,
        crate::handlers::quotes::list_vendor_requests,
        crate::handlers::quotes::cancel_vendor_request,
        crate::handlers::quotes::convert_quote,
        crate::handlers::vendor_responses::view_request,
        crate::handlers::vendor_responses::submit_response,
        crate::handlers::budgets::create_budget,
        crate::handlers::budgets::get_active_budget,
        crate::handlers::budgets::deactivate_budget,
        crate::handlers::budgets::list_budget_transactions,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::transition_order,
        crate::handlers::inventory::list_inventory,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::quote::QuoteStatus,
        crate::entities::order::OrderStatus,
        crate::handlers::quotes::CreateQuoteRequest,
        crate::handlers::quotes::CreateQuoteItemRequest,
        crate::handlers::quotes::QuoteTransitionRequest,
        crate::handlers::quotes::SetQuotePricingRequest,
        crate::handlers::quotes::PriceUpdateItemRequest,
        crate::handlers::quotes::CreateVendorRequestsRequest,
        crate::handlers::quotes::VendorContactRequest,
        crate::handlers::quotes::ConvertQuoteRequest,
        crate::handlers::vendor_responses::SubmitVendorResponseRequest,
        crate::handlers::vendor_responses::VendorResponseLineRequest,
        crate::handlers::budgets::CreateBudgetRequest,
        crate::handlers::orders::OrderTransitionRequest,
    )),
    tags(
        (name = "quotes", description = "Quote lifecycle"),
        (name = "vendor-requests", description = "Outbound vendor asks"),
        (name = "vendor-responses", description = "Public token-addressed vendor responses"),
        (name = "budgets", description = "Budget ledger"),
        (name = "orders", description = "Order conversion and fulfillment"),
        (name = "inventory", description = "Materialized stock positions"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_includes_core_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/quotes"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/v1/quotes/{id}/convert"));
        assert!(paths
            .iter()
            .any(|p| p.as_str() == "/api/v1/vendor-responses/{token}"));
    }
}
