use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    db::DbPool,
    entities::budget_transaction,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item,
    entities::quote::{self, Entity as QuoteEntity, QuoteStatus},
    entities::quote_item::{self, Entity as QuoteItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::budgets::{self, BudgetScope},
};

/// Converts a COMPLETED quote into an order: order + line-item copies +
/// budget debit + ledger entry + PURCHASED flip, all in one transaction.
/// If any step fails nothing is written.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ConvertQuoteCommand {
    pub quote_id: Uuid,
    pub requester_id: Uuid,
    #[validate(length(max = 500))]
    pub shipping_address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertQuoteResult {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub ledger_entry: budget_transaction::Model,
}

/// Date-stamped order number with a random suffix. Collisions are
/// negligible and carry no correctness weight; the one-order-per-quote
/// invariant rests on the unique index over `orders.quote_id`.
fn generate_order_number() -> String {
    let timestamp = Utc::now().format("%Y%m%d");
    let random = Uuid::new_v4()
        .to_string()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_uppercase();
    format!("LQ-{}-{}", timestamp, random)
}

#[async_trait::async_trait]
impl Command for ConvertQuoteCommand {
    type Result = ConvertQuoteResult;

    #[instrument(skip(self, db_pool, event_sender), fields(quote_id = %self.quote_id, requester_id = %self.requester_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let result = self.convert(db_pool.as_ref()).await?;

        self.log_and_trigger_events(&event_sender, &result).await;

        Ok(result)
    }
}

impl ConvertQuoteCommand {
    async fn convert(&self, db: &DbPool) -> Result<ConvertQuoteResult, ServiceError> {
        let quote_id = self.quote_id;
        let requester_id = self.requester_id;
        let shipping_address = self.shipping_address.clone();
        let notes = self.notes.clone();

        db.transaction::<_, ConvertQuoteResult, ServiceError>(move |txn| {
            Box::pin(async move {
                convert_in_txn(txn, quote_id, requester_id, shipping_address, notes).await
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn log_and_trigger_events(
        &self,
        event_sender: &EventSender,
        result: &ConvertQuoteResult,
    ) {
        info!(
            order_id = %result.order.id,
            order_number = %result.order.order_number,
            quote_id = %self.quote_id,
            total_amount = %result.order.total_amount,
            "Quote converted to order"
        );

        // The order is already durable; these are best-effort.
        event_sender.dispatch(Event::OrderCreated(result.order.id)).await;
        event_sender
            .dispatch(Event::BudgetDebited {
                budget_id: result.ledger_entry.budget_id,
                order_id: result.order.id,
                amount: result.ledger_entry.amount,
            })
            .await;
        event_sender
            .dispatch(Event::QuoteStatusChanged {
                quote_id: self.quote_id,
                old_status: QuoteStatus::Completed.to_string(),
                new_status: QuoteStatus::Purchased.to_string(),
            })
            .await;
    }
}

async fn convert_in_txn(
    txn: &DatabaseTransaction,
    quote_id: Uuid,
    requester_id: Uuid,
    shipping_address: Option<String>,
    notes: Option<String>,
) -> Result<ConvertQuoteResult, ServiceError> {
    let quote = QuoteEntity::find_by_id(quote_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

    if quote.user_id != requester_id {
        return Err(ServiceError::Forbidden(
            "Quote belongs to another user".to_string(),
        ));
    }

    if quote.status != QuoteStatus::Completed {
        return Err(ServiceError::InvalidStatus(format!(
            "Only a COMPLETED quote can be converted, current status is {}",
            quote.status
        )));
    }

    let existing = OrderEntity::find()
        .filter(order::Column::QuoteId.eq(quote_id))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .one(txn)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::AlreadyOrdered);
    }

    let items = QuoteItemEntity::find()
        .filter(quote_item::Column::QuoteId.eq(quote_id))
        .order_by_asc(quote_item::Column::LineNumber)
        .all(txn)
        .await?;

    let total_amount = match quote.total_amount {
        Some(total) => total,
        None => items.iter().filter_map(|i| i.line_total).sum(),
    };
    if total_amount <= 0 {
        return Err(ServiceError::InvalidAmount(total_amount));
    }

    // Budget authorization comes before any write; a failure here leaves
    // nothing behind.
    let scope = BudgetScope::for_quote(quote.user_id, quote.organization_id);
    let budget = budgets::authorize_on(txn, &scope, total_amount).await?;

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let order_model = order::ActiveModel {
        id: Set(order_id),
        user_id: Set(quote.user_id),
        quote_id: Set(quote_id),
        organization_id: Set(quote.organization_id),
        order_number: Set(generate_order_number()),
        status: Set(OrderStatus::Ordered),
        total_amount: Set(total_amount),
        currency: Set(quote.currency.clone()),
        shipping_address: Set(shipping_address),
        notes: Set(notes),
        actual_delivery_date: Set(None),
        created_at: Set(now),
        updated_at: Set(Some(now)),
    };
    let saved_order = order_model.insert(txn).await?;

    // Value copies, not references: the order must stay stable no matter
    // what happens to the quote's items afterwards.
    let mut saved_items = Vec::with_capacity(items.len());
    for item in &items {
        let copy = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            line_number: Set(item.line_number),
            product_id: Set(item.product_id),
            product_name: Set(item.product_name.clone()),
            brand: Set(item.brand.clone()),
            catalog_number: Set(item.catalog_number.clone()),
            quantity: Set(item.quantity),
            unit: Set(item.unit.clone()),
            unit_price: Set(item.unit_price),
            line_total: Set(item.line_total),
            created_at: Set(now),
        };
        saved_items.push(copy.insert(txn).await?);
    }

    let ledger_entry = budgets::debit_on(
        txn,
        &budget,
        total_amount,
        format!("Order {} from quote {}", saved_order.order_number, quote_id),
        Some(order_id),
    )
    .await?;

    // Internal, already-validated move; the general transition dispatch is
    // bypassed on purpose.
    let mut quote_active: quote::ActiveModel = quote.into();
    quote_active.status = Set(QuoteStatus::Purchased);
    quote_active.updated_at = Set(Some(now));
    quote_active.update(txn).await?;

    Ok(ConvertQuoteResult {
        order: saved_order,
        items: saved_items,
        ledger_entry,
    })
}
