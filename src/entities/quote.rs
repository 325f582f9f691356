use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle states of a quote request.
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
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PARSED")]
    Parsed,
    #[sea_orm(string_value = "SENT")]
    Sent,
    #[sea_orm(string_value = "RESPONDED")]
    Responded,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "PURCHASED")]
    Purchased,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl QuoteStatus {
    /// States a quote in this status may move to. Cancellation is terminal
    /// except for the explicit reactivation path back to PENDING.
    pub fn allowed_targets(&self) -> &'static [QuoteStatus] {
        use QuoteStatus::*;
        match self {
            Pending => &[Parsed, Sent, Completed, Cancelled],
            Parsed => &[Sent, Completed, Cancelled],
            Sent => &[Responded, Completed, Cancelled],
            Responded => &[Completed, Purchased, Cancelled],
            Completed => &[Purchased, Cancelled],
            Purchased => &[],
            Cancelled => &[Pending],
        }
    }

    pub fn can_transition_to(&self, target: QuoteStatus) -> bool {
        self.allowed_targets().contains(&target)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub status: QuoteStatus,

    /// Derived total; stays null until the quote is priced.
    pub total_amount: Option<i64>,
    pub currency: String,
    pub message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::quote_item::Entity")]
    QuoteItems,
    #[sea_orm(has_many = "super::vendor_request::Entity")]
    VendorRequests,
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::quote_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuoteItems.def()
    }
}

impl Related<super::vendor_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VendorRequests.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::QuoteStatus::*;
    use super::*;

    #[test]
    fn purchased_is_terminal() {
        assert!(Purchased.allowed_targets().is_empty());
    }

    #[test]
    fn cancelled_reopens_only_to_pending() {
        assert_eq!(Cancelled.allowed_targets(), &[Pending]);
        assert!(!Cancelled.can_transition_to(Sent));
    }

    #[test]
    fn forward_edges_match_the_table() {
        assert!(Pending.can_transition_to(Sent));
        assert!(Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Purchased));
        assert!(Sent.can_transition_to(Responded));
        assert!(!Sent.can_transition_to(Purchased));
        assert!(Responded.can_transition_to(Purchased));
        assert!(Completed.can_transition_to(Purchased));
        assert!(!Completed.can_transition_to(Pending));
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(Pending.to_string(), "PENDING");
        assert_eq!(
            serde_json::to_string(&Purchased).unwrap(),
            "\"PURCHASED\""
        );
    }
}
