use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    db::DbPool,
    entities::budget::{self, Entity as BudgetEntity},
    entities::budget_transaction::{self, Entity as BudgetTransactionEntity, TransactionDirection},
    errors::ServiceError,
};

/// The key under which a budget is held: an organization when the spending
/// context has one, otherwise the user themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    User(Uuid),
    Organization(Uuid),
}

impl BudgetScope {
    /// Scope used when authorizing spend for a quote: the quote's
    /// organization wins over the personal scope.
    pub fn for_quote(user_id: Uuid, organization_id: Option<Uuid>) -> Self {
        match organization_id {
            Some(org) => BudgetScope::Organization(org),
            None => BudgetScope::User(user_id),
        }
    }
}

/// Finds the most recently created active budget for a scope.
pub async fn find_active_budget<C: ConnectionTrait>(
    conn: &C,
    scope: &BudgetScope,
) -> Result<Option<budget::Model>, ServiceError> {
    let query = match scope {
        BudgetScope::User(user_id) => BudgetEntity::find()
            .filter(budget::Column::UserId.eq(*user_id))
            .filter(budget::Column::OrganizationId.is_null()),
        BudgetScope::Organization(org_id) => {
            BudgetEntity::find().filter(budget::Column::OrganizationId.eq(*org_id))
        }
    };

    let found = query
        .filter(budget::Column::IsActive.eq(true))
        .order_by_desc(budget::Column::CreatedAt)
        .one(conn)
        .await?;

    Ok(found)
}

/// Checks that the scope's active budget can cover `amount`. Performs no
/// writes; the caller decides whether to follow up with [`debit_on`].
pub async fn authorize_on<C: ConnectionTrait>(
    conn: &C,
    scope: &BudgetScope,
    amount: i64,
) -> Result<budget::Model, ServiceError> {
    let budget = find_active_budget(conn, scope)
        .await?
        .ok_or(ServiceError::NoActiveBudget)?;

    if budget.remaining_amount < amount {
        return Err(ServiceError::InsufficientBudget {
            requested: amount,
            remaining: budget.remaining_amount,
        });
    }

    Ok(budget)
}

/// Applies a debit on the caller's open transaction and appends the ledger
/// row. The balance update is conditional on `remaining >= amount`, so of
/// two concurrent debits against a near-exhausted budget the second one
/// observes the first writer's committed balance and fails here rather than
/// overdrawing.
pub async fn debit_on<C: ConnectionTrait>(
    conn: &C,
    budget: &budget::Model,
    amount: i64,
    description: String,
    order_id: Option<Uuid>,
) -> Result<budget_transaction::Model, ServiceError> {
    let now = Utc::now();

    let update = BudgetEntity::update_many()
        .col_expr(
            budget::Column::UsedAmount,
            Expr::col(budget::Column::UsedAmount).add(amount),
        )
        .col_expr(
            budget::Column::RemainingAmount,
            Expr::col(budget::Column::RemainingAmount).sub(amount),
        )
        .col_expr(budget::Column::UpdatedAt, Expr::value(now))
        .filter(budget::Column::Id.eq(budget.id))
        .filter(budget::Column::RemainingAmount.gte(amount))
        .exec(conn)
        .await?;

    if update.rows_affected == 0 {
        let current = BudgetEntity::find_by_id(budget.id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Budget {} not found", budget.id)))?;
        return Err(ServiceError::InsufficientBudget {
            requested: amount,
            remaining: current.remaining_amount,
        });
    }

    // Re-read for the exact committed balance; under concurrency the value
    // seen at authorize time may already be stale.
    let updated = BudgetEntity::find_by_id(budget.id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Budget {} not found", budget.id)))?;

    let balance_after = updated.remaining_amount;
    let balance_before = balance_after + amount;

    let entry = budget_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        budget_id: Set(budget.id),
        order_id: Set(order_id),
        direction: Set(TransactionDirection::Debit),
        amount: Set(amount),
        description: Set(description),
        balance_before: Set(balance_before),
        balance_after: Set(balance_after),
        created_at: Set(now),
    };

    let entry = entry.insert(conn).await?;

    info!(
        budget_id = %budget.id,
        amount = %amount,
        balance_before = %balance_before,
        balance_after = %balance_after,
        "Budget debit applied"
    );

    Ok(entry)
}

/// Replays a budget's ledger from its total. Test and reconciliation
/// helper; the live balance must always agree with this value.
pub fn replay_remaining(total_amount: i64, entries: &[budget_transaction::Model]) -> i64 {
    entries
        .iter()
        .fold(total_amount, |acc, entry| acc + entry.signed_amount())
}

#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    pub name: String,
    pub total_amount: i64,
    pub currency: Option<String>,
    pub organization_scoped: bool,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
}

/// Budget ledger service.
#[derive(Clone)]
pub struct BudgetService {
    db: Arc<DbPool>,
    default_currency: String,
}

impl BudgetService {
    pub fn new(db: Arc<DbPool>, default_currency: String) -> Self {
        Self {
            db,
            default_currency,
        }
    }

    fn scope_for(&self, user: &CurrentUser, organization_scoped: bool) -> Result<BudgetScope, ServiceError> {
        if organization_scoped {
            let org = user.organization_id.ok_or_else(|| {
                ServiceError::ValidationError(
                    "Caller has no organization for an organization-scoped budget".to_string(),
                )
            })?;
            Ok(BudgetScope::Organization(org))
        } else {
            Ok(BudgetScope::User(user.user_id))
        }
    }

    /// Creates a budget and makes it the active one for its scope. The
    /// previously active budget is deactivated in the same transaction so
    /// "most recently created active budget wins" stays unambiguous.
    #[instrument(skip(self, input), fields(user_id = %user.user_id))]
    pub async fn create_budget(
        &self,
        user: &CurrentUser,
        input: CreateBudgetInput,
    ) -> Result<budget::Model, ServiceError> {
        if input.total_amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Budget total must be positive".to_string(),
            ));
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Budget name is required".to_string(),
            ));
        }
        if input.organization_scoped && !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only organization admins may create organization budgets".to_string(),
            ));
        }

        let scope = self.scope_for(user, input.organization_scoped)?;
        let now = Utc::now();
        let currency = input
            .currency
            .unwrap_or_else(|| self.default_currency.clone());

        let txn = self.db.begin().await?;

        let deactivate = match scope {
            BudgetScope::User(user_id) => BudgetEntity::update_many()
                .filter(budget::Column::UserId.eq(user_id))
                .filter(budget::Column::OrganizationId.is_null()),
            BudgetScope::Organization(org_id) => {
                BudgetEntity::update_many().filter(budget::Column::OrganizationId.eq(org_id))
            }
        };
        deactivate
            .filter(budget::Column::IsActive.eq(true))
            .col_expr(budget::Column::IsActive, Expr::value(false))
            .col_expr(budget::Column::UpdatedAt, Expr::value(now))
            .exec(&txn)
            .await?;

        let model = budget::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            organization_id: Set(match scope {
                BudgetScope::Organization(org) => Some(org),
                BudgetScope::User(_) => None,
            }),
            name: Set(input.name),
            total_amount: Set(input.total_amount),
            used_amount: Set(0),
            remaining_amount: Set(input.total_amount),
            currency: Set(currency),
            is_active: Set(true),
            period_start: Set(input.period_start),
            period_end: Set(input.period_end),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let created = model.insert(&txn).await?;
        txn.commit().await?;

        info!(budget_id = %created.id, total = %created.total_amount, "Budget created");
        Ok(created)
    }

    /// Returns the budget that would authorize spend for the given scope.
    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn get_active_budget(
        &self,
        user: &CurrentUser,
        organization_scoped: bool,
    ) -> Result<Option<budget::Model>, ServiceError> {
        let scope = self.scope_for(user, organization_scoped)?;
        find_active_budget(self.db.as_ref(), &scope).await
    }

    /// Deactivates a budget. It stays in place so its transactions remain
    /// attributable; it just stops being consulted for authorization.
    #[instrument(skip(self), fields(budget_id = %budget_id, user_id = %user.user_id))]
    pub async fn deactivate_budget(
        &self,
        user: &CurrentUser,
        budget_id: Uuid,
    ) -> Result<budget::Model, ServiceError> {
        let budget = BudgetEntity::find_by_id(budget_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Budget {} not found", budget_id)))?;

        self.check_budget_access(user, &budget)?;

        let mut active: budget::ActiveModel = budget.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(self.db.as_ref()).await?;

        info!(budget_id = %updated.id, "Budget deactivated");
        Ok(updated)
    }

    /// Lists a budget's ledger, newest first.
    #[instrument(skip(self), fields(budget_id = %budget_id, user_id = %user.user_id))]
    pub async fn list_transactions(
        &self,
        user: &CurrentUser,
        budget_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<budget_transaction::Model>, u64), ServiceError> {
        let budget = BudgetEntity::find_by_id(budget_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Budget {} not found", budget_id)))?;

        self.check_budget_access(user, &budget)?;

        let paginator = BudgetTransactionEntity::find()
            .filter(budget_transaction::Column::BudgetId.eq(budget_id))
            .order_by_desc(budget_transaction::Column::CreatedAt)
            .paginate(self.db.as_ref(), per_page);

        let total = paginator.num_items().await?;
        let entries = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((entries, total))
    }

    fn check_budget_access(
        &self,
        user: &CurrentUser,
        budget: &budget::Model,
    ) -> Result<(), ServiceError> {
        let allowed = match budget.organization_id {
            Some(org) => user.organization_id == Some(org) && user.is_admin(),
            None => budget.user_id == user.user_id,
        };
        if allowed {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Not allowed to manage this budget".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use proptest::prelude::*;

    fn member(user_id: Uuid, organization_id: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            user_id,
            organization_id,
            role: Role::Member,
        }
    }

    #[test]
    fn quote_scope_prefers_organization() {
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        assert_eq!(
            BudgetScope::for_quote(user_id, Some(org_id)),
            BudgetScope::Organization(org_id)
        );
        assert_eq!(
            BudgetScope::for_quote(user_id, None),
            BudgetScope::User(user_id)
        );
    }

    #[test]
    fn replay_of_empty_ledger_is_total() {
        assert_eq!(replay_remaining(100_000, &[]), 100_000);
    }

    #[test]
    fn org_scope_requires_membership() {
        let svc_user = member(Uuid::new_v4(), None);
        let db = Arc::new(sea_orm::DatabaseConnection::Disconnected);
        let service = BudgetService::new(db, "KRW".to_string());
        let err = service.scope_for(&svc_user, true).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    fn entry(direction: TransactionDirection, amount: i64) -> budget_transaction::Model {
        budget_transaction::Model {
            id: Uuid::new_v4(),
            budget_id: Uuid::new_v4(),
            order_id: None,
            direction,
            amount,
            description: String::new(),
            balance_before: 0,
            balance_after: 0,
            created_at: Utc::now(),
        }
    }

    proptest! {
        #[test]
        fn replay_matches_running_balance(amounts in proptest::collection::vec(1i64..10_000, 0..20)) {
            let total: i64 = 1_000_000;
            let mut running = total;
            let mut entries = Vec::new();
            for amount in amounts {
                running -= amount;
                entries.push(entry(TransactionDirection::Debit, amount));
            }
            prop_assert_eq!(replay_remaining(total, &entries), running);
        }

        #[test]
        fn credits_and_debits_cancel(amount in 1i64..100_000) {
            let total: i64 = 500_000;
            let entries = vec![
                entry(TransactionDirection::Debit, amount),
                entry(TransactionDirection::Credit, amount),
            ];
            prop_assert_eq!(replay_remaining(total, &entries), total);
        }
    }
}
