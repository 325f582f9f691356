//! Order conversion and fulfillment: the atomic quote→order path, budget
//! debiting, and the DELIVERED inventory side effect.

mod common;

use assert_matches::assert_matches;
use common::{member, TestApp};
use labquote_api::{
    auth::CurrentUser,
    commands::orders::ConvertQuoteCommand,
    entities::budget::Entity as BudgetEntity,
    entities::budget_transaction::TransactionDirection,
    entities::order::{Entity as OrderEntity, OrderStatus},
    entities::quote::{Entity as QuoteEntity, QuoteStatus},
    errors::ServiceError,
    services::budgets::CreateBudgetInput,
    services::quotes::{CreateQuoteInput, QuoteItemInput},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

async fn seed_budget(app: &TestApp, user: &CurrentUser, total: i64) -> Uuid {
    app.state
        .services
        .budgets
        .create_budget(
            user,
            CreateBudgetInput {
                name: "Lab budget".to_string(),
                total_amount: total,
                currency: None,
                organization_scoped: false,
                period_start: None,
                period_end: None,
            },
        )
        .await
        .expect("budget created")
        .id
}

/// A COMPLETED quote totalling `unit_price * quantity`.
async fn completed_quote(
    app: &TestApp,
    user: &CurrentUser,
    quantity: i32,
    unit_price: Option<i64>,
) -> Uuid {
    let (quote, _) = app
        .state
        .services
        .quotes
        .create_quote(
            user,
            CreateQuoteInput {
                items: vec![QuoteItemInput {
                    product_id: Some(Uuid::new_v4()),
                    product_name: "Centrifuge tubes".to_string(),
                    brand: Some("LabCorp".to_string()),
                    catalog_number: Some("CT-50".to_string()),
                    quantity,
                    unit: None,
                    unit_price,
                    pack_size: None,
                    notes: None,
                }],
                message: None,
                currency: None,
            },
        )
        .await
        .unwrap();

    app.state
        .services
        .quotes
        .request_transition(user, quote.id, QuoteStatus::Completed, None)
        .await
        .unwrap();

    quote.id
}

fn convert_command(quote_id: Uuid, requester_id: Uuid) -> ConvertQuoteCommand {
    ConvertQuoteCommand {
        quote_id,
        requester_id,
        shipping_address: Some("123 Research Park".to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn conversion_debits_the_budget_and_flips_the_quote() {
    let app = TestApp::new().await;
    let user = member();
    let budget_id = seed_budget(&app, &user, 100_000).await;
    let quote_id = completed_quote(&app, &user, 4, Some(20_000)).await;

    let result = app
        .state
        .services
        .orders
        .convert_quote(convert_command(quote_id, user.user_id))
        .await
        .expect("conversion succeeds");

    // Order carries a price snapshot of the quote.
    assert_eq!(result.order.total_amount, 80_000);
    assert_eq!(result.order.quote_id, quote_id);
    assert_eq!(result.order.status, OrderStatus::Ordered);
    assert!(result.order.order_number.starts_with("LQ-"));
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].quantity, 4);
    assert_eq!(result.items[0].line_total, Some(80_000));

    // One DEBIT with both balances frozen.
    assert_eq!(result.ledger_entry.direction, TransactionDirection::Debit);
    assert_eq!(result.ledger_entry.balance_before, 100_000);
    assert_eq!(result.ledger_entry.balance_after, 20_000);
    assert_eq!(result.ledger_entry.order_id, Some(result.order.id));

    let budget = BudgetEntity::find_by_id(budget_id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(budget.remaining_amount, 20_000);
    assert_eq!(budget.used_amount, 80_000);

    let quote = QuoteEntity::find_by_id(quote_id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(quote.status, QuoteStatus::Purchased);
}

#[tokio::test]
async fn second_conversion_fails_with_already_ordered() {
    let app = TestApp::new().await;
    let user = member();
    seed_budget(&app, &user, 500_000).await;
    let quote_id = completed_quote(&app, &user, 1, Some(10_000)).await;

    app.state
        .services
        .orders
        .convert_quote(convert_command(quote_id, user.user_id))
        .await
        .unwrap();

    let err = app
        .state
        .services
        .orders
        .convert_quote(convert_command(quote_id, user.user_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::AlreadyOrdered);

    // Exactly one order and one debit exist.
    let order_count = OrderEntity::find()
        .filter(labquote_api::entities::order::Column::QuoteId.eq(quote_id))
        .count(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(order_count, 1);
}

#[tokio::test]
async fn insufficient_budget_blocks_conversion_without_writes() {
    let app = TestApp::new().await;
    let user = member();
    let budget_id = seed_budget(&app, &user, 100_000).await;

    let first = completed_quote(&app, &user, 4, Some(20_000)).await;
    app.state
        .services
        .orders
        .convert_quote(convert_command(first, user.user_id))
        .await
        .unwrap();

    // 30k against the 20k that is left.
    let second = completed_quote(&app, &user, 3, Some(10_000)).await;
    let err = app
        .state
        .services
        .orders
        .convert_quote(convert_command(second, user.user_id))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientBudget {
            requested: 30_000,
            remaining: 20_000
        }
    );

    // Nothing moved: no order, quote still COMPLETED, balance unchanged.
    let order_count = OrderEntity::find()
        .filter(labquote_api::entities::order::Column::QuoteId.eq(second))
        .count(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(order_count, 0);

    let quote = QuoteEntity::find_by_id(second)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(quote.status, QuoteStatus::Completed);

    let budget = BudgetEntity::find_by_id(budget_id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(budget.remaining_amount, 20_000);
}

#[tokio::test]
async fn conversion_without_budget_fails() {
    let app = TestApp::new().await;
    let user = member();
    let quote_id = completed_quote(&app, &user, 1, Some(10_000)).await;

    let err = app
        .state
        .services
        .orders
        .convert_quote(convert_command(quote_id, user.user_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NoActiveBudget);
}

#[tokio::test]
async fn only_completed_quotes_convert() {
    let app = TestApp::new().await;
    let user = member();
    seed_budget(&app, &user, 100_000).await;

    let (quote, _) = app
        .state
        .services
        .quotes
        .create_quote(
            &user,
            CreateQuoteInput {
                items: vec![QuoteItemInput {
                    product_id: None,
                    product_name: "Tips".to_string(),
                    brand: None,
                    catalog_number: None,
                    quantity: 1,
                    unit: None,
                    unit_price: Some(10_000),
                    pack_size: None,
                    notes: None,
                }],
                message: None,
                currency: None,
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .services
        .orders
        .convert_quote(convert_command(quote.id, user.user_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn conversion_enforces_ownership() {
    let app = TestApp::new().await;
    let owner = member();
    let stranger = member();
    seed_budget(&app, &owner, 100_000).await;
    let quote_id = completed_quote(&app, &owner, 1, Some(10_000)).await;

    let err = app
        .state
        .services
        .orders
        .convert_quote(convert_command(quote_id, stranger.user_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}

#[tokio::test]
async fn unpriced_quote_has_no_convertible_amount() {
    let app = TestApp::new().await;
    let user = member();
    seed_budget(&app, &user, 100_000).await;
    let quote_id = completed_quote(&app, &user, 1, None).await;

    let err = app
        .state
        .services
        .orders
        .convert_quote(convert_command(quote_id, user.user_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidAmount(0));
}

#[tokio::test]
async fn missing_quote_is_not_found() {
    let app = TestApp::new().await;
    let user = member();

    let err = app
        .state
        .services
        .orders
        .convert_quote(convert_command(Uuid::new_v4(), user.user_id))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

// ==================== Fulfillment ====================

async fn converted_order(app: &TestApp, user: &CurrentUser) -> Uuid {
    seed_budget(app, user, 500_000).await;
    let quote_id = completed_quote(app, user, 3, Some(10_000)).await;
    app.state
        .services
        .orders
        .convert_quote(convert_command(quote_id, user.user_id))
        .await
        .unwrap()
        .order
        .id
}

#[tokio::test]
async fn fulfillment_walks_the_forward_path() {
    let app = TestApp::new().await;
    let user = member();
    let order_id = converted_order(&app, &user).await;

    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Shipping,
        OrderStatus::Delivered,
    ] {
        let updated = app
            .state
            .services
            .orders
            .update_status(&user, order_id, target, None)
            .await
            .expect("legal fulfillment transition");
        assert_eq!(updated.status, target);
    }
}

#[tokio::test]
async fn delivery_materializes_inventory_in_the_same_transaction() {
    let app = TestApp::new().await;
    let user = member();
    let order_id = converted_order(&app, &user).await;

    app.state
        .services
        .orders
        .update_status(&user, order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    app.state
        .services
        .orders
        .update_status(&user, order_id, OrderStatus::Shipping, None)
        .await
        .unwrap();

    let delivered = app
        .state
        .services
        .orders
        .update_status(&user, order_id, OrderStatus::Delivered, None)
        .await
        .unwrap();
    assert!(delivered.actual_delivery_date.is_some());

    // Exactly one stock position per order line, quantities preserved.
    let (inventory, total) = app
        .state
        .services
        .inventory
        .list_inventory(&user, 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(inventory[0].quantity, 3);
    assert_eq!(inventory[0].product_name, "Centrifuge tubes");
    assert_eq!(inventory[0].location, "unassigned");
    assert_eq!(inventory[0].unit, "ea");
}

#[tokio::test]
async fn illegal_fulfillment_jumps_are_rejected() {
    let app = TestApp::new().await;
    let user = member();
    let order_id = converted_order(&app, &user).await;

    // ORDERED cannot jump straight to DELIVERED.
    let err = app
        .state
        .services
        .orders
        .update_status(&user, order_id, OrderStatus::Delivered, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition { .. });

    let (order, _) = app
        .state
        .services
        .orders
        .get_order(&user, order_id)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Ordered);
}

#[tokio::test]
async fn delivered_is_terminal() {
    let app = TestApp::new().await;
    let user = member();
    let order_id = converted_order(&app, &user).await;

    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Shipping,
        OrderStatus::Delivered,
    ] {
        app.state
            .services
            .orders
            .update_status(&user, order_id, target, None)
            .await
            .unwrap();
    }

    let err = app
        .state
        .services
        .orders
        .update_status(&user, order_id, OrderStatus::Shipping, None)
        .await
        .unwrap_err();
    match err {
        ServiceError::IllegalTransition {
            current, allowed, ..
        } => {
            assert_eq!(current, "DELIVERED");
            assert!(allowed.is_empty());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn cancelled_order_blocks_further_fulfillment() {
    let app = TestApp::new().await;
    let user = member();
    let order_id = converted_order(&app, &user).await;

    app.state
        .services
        .orders
        .update_status(
            &user,
            order_id,
            OrderStatus::Cancelled,
            Some("vendor out of stock".to_string()),
        )
        .await
        .unwrap();

    let err = app
        .state
        .services
        .orders
        .update_status(&user, order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition { .. });

    // No inventory was materialized for a cancelled order.
    let (_, total) = app
        .state
        .services
        .inventory
        .list_inventory(&user, 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn orders_are_visible_only_to_their_owner() {
    let app = TestApp::new().await;
    let owner = member();
    let stranger = member();
    let order_id = converted_order(&app, &owner).await;

    let err = app
        .state
        .services
        .orders
        .get_order(&stranger, order_id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let err = app
        .state
        .services
        .orders
        .update_status(&stranger, order_id, OrderStatus::Confirmed, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));
}
