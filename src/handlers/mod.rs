pub mod budgets;
pub mod common;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod quotes;
pub mod vendor_responses;

use std::sync::Arc;

use axum::Router;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    mailer::Mailer,
    services::{
        budgets::BudgetService, inventory::InventoryService, orders::OrderService,
        quotes::QuoteService, vendor_requests::VendorRequestService,
    },
};

pub use crate::AppState;

/// Aggregate of the services the HTTP handlers dispatch into.
#[derive(Clone)]
pub struct AppServices {
    pub quotes: Arc<QuoteService>,
    pub vendor_requests: Arc<VendorRequestService>,
    pub budgets: Arc<BudgetService>,
    pub orders: Arc<OrderService>,
    pub inventory: Arc<InventoryService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        config: &AppConfig,
    ) -> Self {
        Self {
            quotes: Arc::new(QuoteService::new(
                db.clone(),
                Some(event_sender.clone()),
                config.default_currency.clone(),
            )),
            vendor_requests: Arc::new(VendorRequestService::new(
                db.clone(),
                Some(event_sender.clone()),
                mailer,
                config.response_edit_limit,
                config.vendor_request_expiry_days,
                config.default_currency.clone(),
            )),
            budgets: Arc::new(BudgetService::new(
                db.clone(),
                config.default_currency.clone(),
            )),
            orders: Arc::new(OrderService::new(db.clone(), Some(event_sender))),
            inventory: Arc::new(InventoryService::new(db)),
        }
    }
}

/// All `/api/v1` routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(quotes::quotes_router())
        .merge(vendor_responses::vendor_responses_router())
        .merge(budgets::budgets_router())
        .merge(orders::orders_router())
        .merge(inventory::inventory_router())
}
