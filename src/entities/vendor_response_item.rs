use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One vendor-priced line, keyed by (vendor request, snapshot line).
/// Upserted per submission; superseded values overwrite in place.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendor_response_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub vendor_request_id: Uuid,
    /// Line identifier from the request snapshot, never from the live quote.
    pub snapshot_item_id: Uuid,

    pub unit_price: i64,
    pub currency: String,
    pub lead_time_days: Option<i32>,
    pub minimum_order_quantity: Option<i32>,
    pub vendor_sku: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor_request::Entity",
        from = "Column::VendorRequestId",
        to = "super::vendor_request::Column::Id"
    )]
    VendorRequest,
}

impl Related<super::vendor_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VendorRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Compare the priced fields a vendor can revise. Used to count how
    /// many lines actually changed value on an edit.
    pub fn same_values(&self, other: &Model) -> bool {
        self.unit_price == other.unit_price
            && self.currency == other.currency
            && self.lead_time_days == other.lead_time_days
            && self.minimum_order_quantity == other.minimum_order_quantity
            && self.vendor_sku == other.vendor_sku
            && self.notes == other.notes
    }
}
