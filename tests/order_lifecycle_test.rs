mod common;

use common::{TestApp, VariantSpec};
use nutriline_api::{
    entities::{OrderStatus, PaymentState, ProductVariant, UserRole},
    errors::ServiceError,
    services::{carts::AddToCartInput, orders::CreateOrderInput},
};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

fn no_address() -> CreateOrderInput {
    CreateOrderInput {
        shipping_address_id: None,
        notes: None,
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn checkout_snapshots_prices_and_empties_the_cart() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let variant_id = app
        .seed_variant(VariantSpec {
            price: dec!(100.00),
            discount_percent: Some(dec!(20)),
            stock_count: 8,
            ..Default::default()
        })
        .await;

    app.services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 3,
            },
        )
        .await
        .expect("add");

    let order = app
        .services
        .orders
        .create_from_cart(user_id, no_address())
        .await
        .expect("checkout");

    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(order.order.payment_state, PaymentState::Unpaid);
    assert_eq!(order.order.subtotal, dec!(300.00));
    assert_eq!(order.order.total_amount, dec!(240.00));
    assert!(order.order.order_number.starts_with("ORD-"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.items[0].unit_price, dec!(100.00));
    assert_eq!(order.items[0].discounted_unit_price, dec!(80.00));

    // Cart emptied, stock reserved.
    let cart = app
        .services
        .cart
        .get_or_create_cart(user_id)
        .await
        .expect("cart");
    assert!(cart.items.is_empty());

    let variant = ProductVariant::find_by_id(variant_id)
        .one(&*app.db)
        .await
        .expect("query")
        .expect("variant");
    assert_eq!(variant.stock_count, 5);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn later_price_changes_do_not_touch_placed_orders() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let variant_id = app
        .seed_variant(VariantSpec {
            price: dec!(50.00),
            stock_count: 5,
            ..Default::default()
        })
        .await;

    app.services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 1,
            },
        )
        .await
        .expect("add");
    let order = app
        .services
        .orders
        .create_from_cart(user_id, no_address())
        .await
        .expect("checkout");

    app.services
        .products
        .update_variant(
            variant_id,
            nutriline_api::services::products::UpdateVariantInput {
                name: None,
                aroma: None,
                size: None,
                price: Some(dec!(80.00)),
                discount_percent: None,
                stock_count: None,
                is_active: None,
                position: None,
            },
        )
        .await
        .expect("price change");

    let reread = app
        .services
        .orders
        .get_order(order.order.id, user_id, false)
        .await
        .expect("order");
    assert_eq!(reread.items[0].unit_price, dec!(50.00));
    assert_eq!(reread.order.total_amount, dec!(50.00));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn checkout_with_an_empty_cart_fails() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;

    let err = app
        .services
        .orders
        .create_from_cart(user_id, no_address())
        .await
        .expect_err("nothing to check out");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn checkout_uses_only_own_addresses() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let other_user = app.seed_user(UserRole::Customer).await;
    let variant_id = app.seed_variant(VariantSpec::default()).await;

    let foreign_address = app
        .services
        .addresses
        .create_address(
            other_user,
            nutriline_api::services::addresses::AddressInput {
                label: "Home".into(),
                recipient: "Someone Else".into(),
                phone: "+15550001111".into(),
                country: "US".into(),
                city: "Austin".into(),
                postal_code: "73301".into(),
                line1: "1 Elsewhere Rd".into(),
                line2: None,
            },
        )
        .await
        .expect("address")
        .id;

    app.services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 1,
            },
        )
        .await
        .expect("add");

    let err = app
        .services
        .orders
        .create_from_cart(
            user_id,
            CreateOrderInput {
                shipping_address_id: Some(foreign_address),
                notes: None,
            },
        )
        .await
        .expect_err("foreign address");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn status_transitions_follow_the_lifecycle() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let variant_id = app.seed_variant(VariantSpec::default()).await;

    app.services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 1,
            },
        )
        .await
        .expect("add");
    let order_id = app
        .services
        .orders
        .create_from_cart(user_id, no_address())
        .await
        .expect("checkout")
        .order
        .id;

    // Delivered straight from pending is invalid.
    let err = app
        .services
        .orders
        .update_status(order_id, OrderStatus::Delivered)
        .await
        .expect_err("skipping states");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let order = app
        .services
        .orders
        .update_status(order_id, OrderStatus::Confirmed)
        .await
        .expect("confirm");
    assert_eq!(order.status, OrderStatus::Confirmed);

    let order = app
        .services
        .orders
        .update_status(order_id, OrderStatus::Shipped)
        .await
        .expect("ship");
    assert!(order.shipped_at.is_some());

    let order = app
        .services
        .orders
        .update_status(order_id, OrderStatus::Delivered)
        .await
        .expect("deliver");
    assert!(order.delivered_at.is_some());

    // Delivered is terminal.
    let err = app
        .services
        .orders
        .update_status(order_id, OrderStatus::Cancelled)
        .await
        .expect_err("cannot cancel a delivered order");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn foreign_orders_read_as_absent() {
    let app = TestApp::new().await;
    let owner = app.seed_user(UserRole::Customer).await;
    let stranger = app.seed_user(UserRole::Customer).await;
    let admin = app.seed_user(UserRole::Admin).await;
    let variant_id = app.seed_variant(VariantSpec::default()).await;

    app.services
        .cart
        .add_item(
            owner,
            AddToCartInput {
                variant_id,
                quantity: 1,
            },
        )
        .await
        .expect("add");
    let order_id = app
        .services
        .orders
        .create_from_cart(owner, no_address())
        .await
        .expect("checkout")
        .order
        .id;

    let err = app
        .services
        .orders
        .get_order(order_id, stranger, false)
        .await
        .expect_err("stranger sees nothing");
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Admin sees everything.
    app.services
        .orders
        .get_order(order_id, admin, true)
        .await
        .expect("admin access");
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn order_listing_is_paginated_per_user() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let other_user = app.seed_user(UserRole::Customer).await;

    for _ in 0..3 {
        let variant_id = app.seed_variant(VariantSpec::default()).await;
        app.services
            .cart
            .add_item(
                user_id,
                AddToCartInput {
                    variant_id,
                    quantity: 1,
                },
            )
            .await
            .expect("add");
        app.services
            .orders
            .create_from_cart(user_id, no_address())
            .await
            .expect("checkout");
    }

    let (orders, total) = app
        .services
        .orders
        .list_orders(user_id, 1, 2)
        .await
        .expect("page 1");
    assert_eq!(total, 3);
    assert_eq!(orders.len(), 2);

    let (orders, _) = app
        .services
        .orders
        .list_orders(user_id, 2, 2)
        .await
        .expect("page 2");
    assert_eq!(orders.len(), 1);

    let (orders, total) = app
        .services
        .orders
        .list_orders(other_user, 1, 10)
        .await
        .expect("other user");
    assert_eq!(total, 0);
    assert!(orders.is_empty());
}
