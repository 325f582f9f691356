use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    db::DbPool,
    entities::inventory_item::{self, Entity as InventoryItemEntity, InventoryStatus},
    entities::order_item,
    errors::ServiceError,
};

pub const DEFAULT_UNIT: &str = "ea";
pub const DEFAULT_LOCATION: &str = "unassigned";

/// Turns delivered order lines into stock positions. Generic over the
/// connection so the delivery transition can run it on its own open
/// transaction.
pub async fn materialize_on<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    items: &[order_item::Model],
) -> Result<Vec<inventory_item::Model>, ServiceError> {
    let now = Utc::now();
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        let model = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            order_item_id: Set(Some(item.id)),
            product_name: Set(item.product_name.clone()),
            quantity: Set(item.quantity),
            unit: Set(if item.unit.is_empty() {
                DEFAULT_UNIT.to_string()
            } else {
                item.unit.clone()
            }),
            location: Set(DEFAULT_LOCATION.to_string()),
            status: Set(InventoryStatus::InStock),
            received_at: Set(now),
            created_at: Set(now),
        };
        created.push(model.insert(conn).await?);
    }

    info!(user_id = %user_id, count = created.len(), "Inventory materialized");
    Ok(created)
}

/// Read side of the stock position created by deliveries.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn list_inventory(
        &self,
        user: &CurrentUser,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_item::Model>, u64), ServiceError> {
        let paginator = InventoryItemEntity::find()
            .filter(inventory_item::Column::UserId.eq(user.user_id))
            .order_by_desc(inventory_item::Column::ReceivedAt)
            .paginate(self.db.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }
}
