//! Budget ledger behavior: authorization, conditional debits, the
//! append-only audit trail and active-budget selection per scope.

mod common;

use assert_matches::assert_matches;
use common::{member, org_admin, org_member, TestApp};
use labquote_api::{
    entities::budget::Entity as BudgetEntity,
    entities::budget_transaction::TransactionDirection,
    errors::ServiceError,
    services::budgets::{
        self, authorize_on, debit_on, replay_remaining, BudgetScope, CreateBudgetInput,
    },
};
use sea_orm::EntityTrait;
use uuid::Uuid;

fn budget_input(name: &str, total: i64, organization_scoped: bool) -> CreateBudgetInput {
    CreateBudgetInput {
        name: name.to_string(),
        total_amount: total,
        currency: None,
        organization_scoped,
        period_start: None,
        period_end: None,
    }
}

#[tokio::test]
async fn fresh_budget_authorizes_within_balance() {
    let app = TestApp::new().await;
    let user = member();

    let budget = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Lab budget", 100_000, false))
        .await
        .expect("budget created");

    assert_eq!(budget.total_amount, 100_000);
    assert_eq!(budget.used_amount, 0);
    assert_eq!(budget.remaining_amount, 100_000);
    assert_eq!(budget.currency, "KRW");
    assert!(budget.is_active);

    let scope = BudgetScope::User(user.user_id);
    let authorized = authorize_on(app.state.db.as_ref(), &scope, 80_000)
        .await
        .expect("authorization passes");
    assert_eq!(authorized.id, budget.id);
}

#[tokio::test]
async fn authorize_without_budget_fails() {
    let app = TestApp::new().await;
    let scope = BudgetScope::User(Uuid::new_v4());

    let err = authorize_on(app.state.db.as_ref(), &scope, 1)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NoActiveBudget);
}

#[tokio::test]
async fn authorize_beyond_remaining_fails() {
    let app = TestApp::new().await;
    let user = member();

    app.state
        .services
        .budgets
        .create_budget(&user, budget_input("Small budget", 5_000, false))
        .await
        .unwrap();

    let scope = BudgetScope::User(user.user_id);
    let err = authorize_on(app.state.db.as_ref(), &scope, 5_001)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientBudget {
            requested: 5_001,
            remaining: 5_000
        }
    );
}

#[tokio::test]
async fn debit_freezes_balances_into_the_ledger() {
    let app = TestApp::new().await;
    let user = member();

    let budget = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Lab budget", 100_000, false))
        .await
        .unwrap();

    let entry = debit_on(
        app.state.db.as_ref(),
        &budget,
        80_000,
        "Reagent order".to_string(),
        None,
    )
    .await
    .expect("debit applies");

    assert_eq!(entry.direction, TransactionDirection::Debit);
    assert_eq!(entry.amount, 80_000);
    assert_eq!(entry.balance_before, 100_000);
    assert_eq!(entry.balance_after, 20_000);

    let reloaded = BudgetEntity::find_by_id(budget.id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.used_amount, 80_000);
    assert_eq!(reloaded.remaining_amount, 20_000);
    assert_eq!(
        reloaded.remaining_amount,
        reloaded.total_amount - reloaded.used_amount
    );
}

#[tokio::test]
async fn debit_never_overdraws() {
    let app = TestApp::new().await;
    let user = member();

    let budget = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Lab budget", 50_000, false))
        .await
        .unwrap();

    debit_on(
        app.state.db.as_ref(),
        &budget,
        45_000,
        "First order".to_string(),
        None,
    )
    .await
    .unwrap();

    // The stale `budget` model still claims 50k remaining; the conditional
    // update must see the committed 5k and refuse.
    let err = debit_on(
        app.state.db.as_ref(),
        &budget,
        10_000,
        "Second order".to_string(),
        None,
    )
    .await
    .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientBudget {
            requested: 10_000,
            remaining: 5_000
        }
    );

    let reloaded = BudgetEntity::find_by_id(budget.id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.remaining_amount, 5_000);
    assert_eq!(reloaded.used_amount, 45_000);
}

#[tokio::test]
async fn ledger_replay_reproduces_the_balance() {
    let app = TestApp::new().await;
    let user = member();

    let budget = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Lab budget", 200_000, false))
        .await
        .unwrap();

    for (amount, label) in [(30_000, "a"), (50_000, "b"), (20_000, "c")] {
        debit_on(
            app.state.db.as_ref(),
            &budget,
            amount,
            label.to_string(),
            None,
        )
        .await
        .unwrap();
    }

    let (entries, total) = app
        .state
        .services
        .budgets
        .list_transactions(&user, budget.id, 1, 50)
        .await
        .unwrap();
    assert_eq!(total, 3);

    let reloaded = BudgetEntity::find_by_id(budget.id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        replay_remaining(reloaded.total_amount, &entries),
        reloaded.remaining_amount
    );
    assert_eq!(reloaded.remaining_amount, 100_000);
}

#[tokio::test]
async fn most_recently_created_active_budget_wins() {
    let app = TestApp::new().await;
    let user = member();

    let first = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Q1", 10_000, false))
        .await
        .unwrap();
    let second = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Q2", 99_000, false))
        .await
        .unwrap();

    let active = app
        .state
        .services
        .budgets
        .get_active_budget(&user, false)
        .await
        .unwrap()
        .expect("an active budget");
    assert_eq!(active.id, second.id);

    // The older budget was deactivated, not deleted.
    let first_reloaded = BudgetEntity::find_by_id(first.id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert!(!first_reloaded.is_active);
}

#[tokio::test]
async fn deactivated_budget_stops_authorizing() {
    let app = TestApp::new().await;
    let user = member();

    let budget = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Lab budget", 10_000, false))
        .await
        .unwrap();

    app.state
        .services
        .budgets
        .deactivate_budget(&user, budget.id)
        .await
        .unwrap();

    let scope = BudgetScope::User(user.user_id);
    let err = authorize_on(app.state.db.as_ref(), &scope, 1)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NoActiveBudget);
}

#[tokio::test]
async fn organization_budget_requires_admin() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();

    let plain = org_member(org);
    let err = app
        .state
        .services
        .budgets
        .create_budget(&plain, budget_input("Org budget", 10_000, true))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let admin = org_admin(org);
    let budget = app
        .state
        .services
        .budgets
        .create_budget(&admin, budget_input("Org budget", 10_000, true))
        .await
        .expect("admin may create org budgets");
    assert_eq!(budget.organization_id, Some(org));

    // The org budget is what an org-scoped quote draws from.
    let scope = BudgetScope::for_quote(admin.user_id, Some(org));
    let authorized = authorize_on(app.state.db.as_ref(), &scope, 10_000)
        .await
        .unwrap();
    assert_eq!(authorized.id, budget.id);
}

#[tokio::test]
async fn foreign_budget_is_not_manageable() {
    let app = TestApp::new().await;
    let owner = member();
    let stranger = member();

    let budget = app
        .state
        .services
        .budgets
        .create_budget(&owner, budget_input("Private", 10_000, false))
        .await
        .unwrap();

    let err = app
        .state
        .services
        .budgets
        .deactivate_budget(&stranger, budget.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let err = app
        .state
        .services
        .budgets
        .list_transactions(&stranger, budget.id, 1, 10)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn budget_rejects_nonpositive_totals() {
    let app = TestApp::new().await;
    let user = member();

    let err = app
        .state
        .services
        .budgets
        .create_budget(&user, budget_input("Zero", 0, false))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn personal_and_org_scopes_are_distinct() {
    let app = TestApp::new().await;
    let org = Uuid::new_v4();
    let admin = org_admin(org);

    // Personal budget only; an org-scoped lookup must not see it.
    app.state
        .services
        .budgets
        .create_budget(&admin, budget_input("Personal", 10_000, false))
        .await
        .unwrap();

    let found = budgets::find_active_budget(app.state.db.as_ref(), &BudgetScope::Organization(org))
        .await
        .unwrap();
    assert!(found.is_none());
}
