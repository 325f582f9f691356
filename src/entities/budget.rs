use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A scoped monetary allowance. The scope is the organization when
/// `organization_id` is set, otherwise the owning user. `remaining_amount`
/// is maintained by the ledger, never recomputed from a stored formula.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,

    pub total_amount: i64,
    pub used_amount: i64,
    pub remaining_amount: i64,
    pub currency: String,

    pub is_active: bool,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_transaction::Entity")]
    Transactions,
}

impl Related<super::budget_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
