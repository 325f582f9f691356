use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    db::DbPool,
    entities::quote::{self, Entity as QuoteEntity, QuoteStatus},
    entities::quote_item::{self, Entity as QuoteItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone)]
pub struct QuoteItemInput {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub catalog_number: Option<String>,
    pub quantity: i32,
    pub unit: Option<String>,
    pub unit_price: Option<i64>,
    pub pack_size: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateQuoteInput {
    pub items: Vec<QuoteItemInput>,
    pub message: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ItemPriceUpdate {
    pub item_id: Uuid,
    pub unit_price: i64,
}

/// Quote lifecycle service. Every status mutation passes through the
/// transition table on [`QuoteStatus`]; side effects are dispatched after
/// the state write commits and never revert it.
#[derive(Clone)]
pub struct QuoteService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    default_currency: String,
}

impl QuoteService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        default_currency: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            default_currency,
        }
    }

    /// Creates a quote with its line items, denormalizing product fields so
    /// the quote stays readable if the product record changes later.
    #[instrument(skip(self, input), fields(user_id = %user.user_id, items = input.items.len()))]
    pub async fn create_quote(
        &self,
        user: &CurrentUser,
        input: CreateQuoteInput,
    ) -> Result<(quote::Model, Vec<quote_item::Model>), ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A quote needs at least one item".to_string(),
            ));
        }
        for item in &input.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity must be positive for '{}'",
                    item.product_name
                )));
            }
            if item.product_name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Item product name is required".to_string(),
                ));
            }
            if matches!(item.unit_price, Some(p) if p <= 0) {
                return Err(ServiceError::ValidationError(format!(
                    "Unit price must be positive for '{}'",
                    item.product_name
                )));
            }
        }

        let now = Utc::now();
        let quote_id = Uuid::new_v4();
        let currency = input
            .currency
            .unwrap_or_else(|| self.default_currency.clone());

        let txn = self.db.begin().await?;

        let mut items = Vec::with_capacity(input.items.len());
        for (idx, item) in input.items.iter().enumerate() {
            let line_total = item.unit_price.map(|p| p * i64::from(item.quantity));
            let model = quote_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                quote_id: Set(quote_id),
                line_number: Set((idx + 1) as i32),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name.clone()),
                brand: Set(item.brand.clone()),
                catalog_number: Set(item.catalog_number.clone()),
                quantity: Set(item.quantity),
                unit: Set(item.unit.clone().unwrap_or_else(|| "ea".to_string())),
                unit_price: Set(item.unit_price),
                line_total: Set(line_total),
                pack_size: Set(item.pack_size.clone()),
                notes: Set(item.notes.clone()),
                created_at: Set(now),
            };
            items.push(model);
        }

        let total_amount = derive_total(&items.iter().map(line_total_of).collect::<Vec<_>>());

        let quote_model = quote::ActiveModel {
            id: Set(quote_id),
            user_id: Set(user.user_id),
            organization_id: Set(user.organization_id),
            status: Set(QuoteStatus::Pending),
            total_amount: Set(total_amount),
            currency: Set(currency),
            message: Set(input.message.clone()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let saved_quote = quote_model.insert(&txn).await?;
        let mut saved_items = Vec::with_capacity(items.len());
        for item in items {
            saved_items.push(item.insert(&txn).await?);
        }

        txn.commit().await?;

        info!(quote_id = %saved_quote.id, "Quote created");
        self.dispatch(Event::QuoteCreated(saved_quote.id)).await;

        Ok((saved_quote, saved_items))
    }

    /// Loads a quote with its items, enforcing ownership.
    #[instrument(skip(self), fields(quote_id = %quote_id, user_id = %user.user_id))]
    pub async fn get_quote(
        &self,
        user: &CurrentUser,
        quote_id: Uuid,
    ) -> Result<(quote::Model, Vec<quote_item::Model>), ServiceError> {
        let quote = self.load_owned_quote(quote_id, user).await?;
        let items = QuoteItemEntity::find()
            .filter(quote_item::Column::QuoteId.eq(quote_id))
            .order_by_asc(quote_item::Column::LineNumber)
            .all(self.db.as_ref())
            .await?;
        Ok((quote, items))
    }

    /// Lists the caller's quotes, newest first.
    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn list_quotes(
        &self,
        user: &CurrentUser,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<quote::Model>, u64), ServiceError> {
        let paginator = QuoteEntity::find()
            .filter(quote::Column::UserId.eq(user.user_id))
            .order_by_desc(quote::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let quotes = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((quotes, total))
    }

    /// Requests a status transition. Illegal moves are rejected with the
    /// current state, the requested state and the full allowed-target list
    /// so the caller can self-correct.
    #[instrument(skip(self), fields(quote_id = %quote_id, target = %target, user_id = %user.user_id))]
    pub async fn request_transition(
        &self,
        user: &CurrentUser,
        quote_id: Uuid,
        target: QuoteStatus,
        reason: Option<String>,
    ) -> Result<quote::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let quote = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        if quote.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Quote belongs to another user".to_string(),
            ));
        }

        let current = quote.status;
        if !current.can_transition_to(target) {
            warn!(
                quote_id = %quote_id,
                current = %current,
                requested = %target,
                "Illegal quote transition rejected"
            );
            return Err(illegal_transition(current, target));
        }

        let mut active: quote::ActiveModel = quote.into();
        active.status = Set(target);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            quote_id = %quote_id,
            old_status = %current,
            new_status = %target,
            "Quote status updated"
        );

        // Post-commit side effects: best-effort, never revert the write.
        self.dispatch(Event::QuoteStatusChanged {
            quote_id,
            old_status: current.to_string(),
            new_status: target.to_string(),
        })
        .await;
        match target {
            QuoteStatus::Completed => self.dispatch(Event::QuoteCompleted(quote_id)).await,
            QuoteStatus::Cancelled => {
                self.dispatch(Event::QuoteCancelled { quote_id, reason }).await
            }
            _ => {}
        }

        Ok(updated)
    }

    /// Applies chosen prices to quote lines and re-derives the quote total.
    /// Allowed only before the quote reaches a terminal state.
    #[instrument(skip(self, updates), fields(quote_id = %quote_id, user_id = %user.user_id))]
    pub async fn set_item_pricing(
        &self,
        user: &CurrentUser,
        quote_id: Uuid,
        updates: Vec<ItemPriceUpdate>,
    ) -> Result<(quote::Model, Vec<quote_item::Model>), ServiceError> {
        if updates.is_empty() {
            return Err(ServiceError::ValidationError(
                "No price updates supplied".to_string(),
            ));
        }
        for update in &updates {
            if update.unit_price <= 0 {
                return Err(ServiceError::ValidationError(
                    "Unit price must be positive".to_string(),
                ));
            }
        }

        let txn = self.db.begin().await?;

        let quote = QuoteEntity::find_by_id(quote_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;

        if quote.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Quote belongs to another user".to_string(),
            ));
        }
        if matches!(
            quote.status,
            QuoteStatus::Purchased | QuoteStatus::Cancelled | QuoteStatus::Completed
        ) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot reprice a quote in status {}",
                quote.status
            )));
        }

        let items = QuoteItemEntity::find()
            .filter(quote_item::Column::QuoteId.eq(quote_id))
            .order_by_asc(quote_item::Column::LineNumber)
            .all(&txn)
            .await?;

        let known: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let unknown: Vec<Uuid> = updates
            .iter()
            .map(|u| u.item_id)
            .filter(|id| !known.contains(id))
            .collect();
        if !unknown.is_empty() {
            return Err(ServiceError::InvalidItems(unknown));
        }

        let mut saved_items = Vec::with_capacity(items.len());
        for item in items {
            let update = updates.iter().find(|u| u.item_id == item.id);
            match update {
                Some(update) => {
                    let quantity = item.quantity;
                    let mut active: quote_item::ActiveModel = item.into();
                    active.unit_price = Set(Some(update.unit_price));
                    active.line_total = Set(Some(update.unit_price * i64::from(quantity)));
                    saved_items.push(active.update(&txn).await?);
                }
                None => saved_items.push(item),
            }
        }

        let total_amount = derive_total(
            &saved_items
                .iter()
                .map(|i| i.line_total)
                .collect::<Vec<_>>(),
        );

        let mut active: quote::ActiveModel = quote.into();
        active.total_amount = Set(total_amount);
        active.updated_at = Set(Some(Utc::now()));
        let updated_quote = active.update(&txn).await?;

        txn.commit().await?;

        info!(quote_id = %quote_id, total = ?total_amount, "Quote pricing updated");
        Ok((updated_quote, saved_items))
    }

    async fn load_owned_quote(
        &self,
        quote_id: Uuid,
        user: &CurrentUser,
    ) -> Result<quote::Model, ServiceError> {
        let quote = QuoteEntity::find_by_id(quote_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {} not found", quote_id)))?;
        if quote.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Quote belongs to another user".to_string(),
            ));
        }
        Ok(quote)
    }

    async fn dispatch(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.dispatch(event).await;
        }
    }
}

fn line_total_of(item: &quote_item::ActiveModel) -> Option<i64> {
    match &item.line_total {
        sea_orm::ActiveValue::Set(v) => *v,
        _ => None,
    }
}

/// A quote's total is derivable only once every line is priced.
fn derive_total(line_totals: &[Option<i64>]) -> Option<i64> {
    if line_totals.iter().all(Option::is_some) {
        Some(line_totals.iter().flatten().sum())
    } else {
        None
    }
}

pub(crate) fn illegal_transition(current: QuoteStatus, requested: QuoteStatus) -> ServiceError {
    ServiceError::IllegalTransition {
        current: current.to_string(),
        requested: requested.to_string(),
        allowed: current
            .allowed_targets()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn total_requires_every_line_priced() {
        assert_eq!(derive_total(&[Some(100), Some(200)]), Some(300));
        assert_eq!(derive_total(&[Some(100), None]), None);
        assert_eq!(derive_total(&[]), Some(0));
    }

    #[rstest]
    #[case(QuoteStatus::Pending, QuoteStatus::Sent, true)]
    #[case(QuoteStatus::Pending, QuoteStatus::Purchased, false)]
    #[case(QuoteStatus::Sent, QuoteStatus::Responded, true)]
    #[case(QuoteStatus::Responded, QuoteStatus::Purchased, true)]
    #[case(QuoteStatus::Completed, QuoteStatus::Purchased, true)]
    #[case(QuoteStatus::Purchased, QuoteStatus::Pending, false)]
    #[case(QuoteStatus::Cancelled, QuoteStatus::Pending, true)]
    #[case(QuoteStatus::Cancelled, QuoteStatus::Completed, false)]
    fn transition_table(
        #[case] from: QuoteStatus,
        #[case] to: QuoteStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(from.can_transition_to(to), expected);
    }

    #[test]
    fn illegal_transition_error_lists_targets() {
        let err = illegal_transition(QuoteStatus::Sent, QuoteStatus::Purchased);
        match err {
            ServiceError::IllegalTransition {
                current,
                requested,
                allowed,
            } => {
                assert_eq!(current, "SENT");
                assert_eq!(requested, "PURCHASED");
                assert_eq!(allowed, vec!["RESPONDED", "COMPLETED", "CANCELLED"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
