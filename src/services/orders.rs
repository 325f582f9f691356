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
    commands::orders::{ConvertQuoteCommand, ConvertQuoteResult},
    commands::Command,
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory,
};

/// Order fulfillment service: conversion entry point, reads, and the
/// fulfillment state machine.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Converts a completed quote into an order. See
    /// [`ConvertQuoteCommand`] for the transactional steps.
    #[instrument(skip(self, command), fields(quote_id = %command.quote_id))]
    pub async fn convert_quote(
        &self,
        command: ConvertQuoteCommand,
    ) -> Result<ConvertQuoteResult, ServiceError> {
        let sender = self
            .event_sender
            .clone()
            .ok_or_else(|| ServiceError::InternalError("event sender not wired".to_string()))?;
        command.execute(self.db.clone(), sender).await
    }

    /// Loads an order with its items, enforcing ownership.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user.user_id))]
    pub async fn get_order(
        &self,
        user: &CurrentUser,
        order_id: Uuid,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::LineNumber)
            .all(self.db.as_ref())
            .await?;
        Ok((order, items))
    }

    /// Lists the caller's orders, newest first.
    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn list_orders(
        &self,
        user: &CurrentUser,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = OrderEntity::find()
            .filter(order::Column::UserId.eq(user.user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Moves an order through its fulfillment states. DELIVERED carries a
    /// mandatory same-transaction side effect: every order line becomes an
    /// inventory record for the order's owner.
    #[instrument(skip(self), fields(order_id = %order_id, target = %target, user_id = %user.user_id))]
    pub async fn update_status(
        &self,
        user: &CurrentUser,
        order_id: Uuid,
        target: OrderStatus,
        notes: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "Order belongs to another user".to_string(),
            ));
        }

        let current = order.status;
        if !current.can_transition_to(target) {
            warn!(
                order_id = %order_id,
                current = %current,
                requested = %target,
                "Illegal order transition rejected"
            );
            return Err(ServiceError::IllegalTransition {
                current: current.to_string(),
                requested: target.to_string(),
                allowed: current
                    .allowed_targets()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            });
        }

        let now = Utc::now();
        let user_id = order.user_id;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(target);
        active.updated_at = Set(Some(now));
        if let Some(notes) = notes {
            active.notes = Set(Some(notes));
        }
        if target == OrderStatus::Delivered {
            active.actual_delivery_date = Set(Some(now));
        }
        let updated = active.update(&txn).await?;

        let mut materialized = 0usize;
        if target == OrderStatus::Delivered {
            let items = OrderItemEntity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;
            materialized = inventory::materialize_on(&txn, user_id, &items).await?.len();
        }

        txn.commit().await?;

        info!(
            order_id = %order_id,
            old_status = %current,
            new_status = %target,
            materialized = materialized,
            "Order status updated"
        );

        self.dispatch(Event::OrderStatusChanged {
            order_id,
            old_status: current.to_string(),
            new_status: target.to_string(),
        })
        .await;
        if target == OrderStatus::Delivered {
            self.dispatch(Event::OrderDelivered(order_id)).await;
        }

        Ok(updated)
    }

    async fn dispatch(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.dispatch(event).await;
        }
    }
}
