use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One requested line of a quote. Product fields are denormalized at
/// creation time so historical quotes stay readable if the product record
/// changes later.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quote_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub quote_id: Uuid,
    pub line_number: i32,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub brand: Option<String>,
    pub catalog_number: Option<String>,
    pub quantity: i32,
    pub unit: String,

    /// Null until a vendor response has been applied.
    pub unit_price: Option<i64>,
    /// quantity x unit_price when the price is known.
    pub line_total: Option<i64>,

    pub pack_size: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quote::Entity",
        from = "Column::QuoteId",
        to = "super::quote::Column::Id"
    )]
    Quote,
}

impl Related<super::quote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
