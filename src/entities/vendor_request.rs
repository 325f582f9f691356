use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// States of one outbound vendor request.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VendorRequestStatus {
    #[sea_orm(string_value = "SENT")]
    Sent,
    #[sea_orm(string_value = "RESPONDED")]
    Responded,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// One frozen quote line as shown to the vendor. An owned value copied at
/// request-creation time; it never reflects later edits to the live quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub item_id: Uuid,
    pub line_number: i32,
    pub product_name: String,
    pub brand: Option<String>,
    pub catalog_number: Option<String>,
    pub quantity: i32,
    pub unit: String,
    pub unit_price: Option<i64>,
    pub pack_size: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendor_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub quote_id: Uuid,
    pub vendor_name: String,
    pub vendor_email: String,

    /// Sole lookup key for the public response endpoint.
    #[sea_orm(unique)]
    pub token: String,

    pub status: VendorRequestStatus,
    pub expires_at: DateTime<Utc>,

    /// Serialized `Vec<SnapshotItem>`, written once at creation.
    pub snapshot: Json,

    pub response_edit_count: i32,
    pub response_edit_limit: i32,
    pub responded_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quote::Entity",
        from = "Column::QuoteId",
        to = "super::quote::Column::Id"
    )]
    Quote,
    #[sea_orm(has_many = "super::vendor_response_item::Entity")]
    ResponseItems,
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl Related<super::vendor_response_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResponseItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Deserialize the frozen snapshot lines.
    pub fn snapshot_items(&self) -> Result<Vec<SnapshotItem>, ServiceError> {
        serde_json::from_value(self.snapshot.clone()).map_err(|e| {
            ServiceError::InternalError(format!(
                "corrupt snapshot on vendor request {}: {}",
                self.id, e
            ))
        })
    }

    /// Whether a SENT request has passed its deadline. Expiry is detected
    /// lazily on read; nothing schedules it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == VendorRequestStatus::Sent && now > self.expires_at
    }
}
