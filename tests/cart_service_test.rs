mod common;

use common::{TestApp, VariantSpec};
use nutriline_api::{
    entities::UserRole,
    errors::ServiceError,
    services::carts::AddToCartInput,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn get_or_create_cart_is_idempotent() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;

    let first = app
        .services
        .cart
        .get_or_create_cart(user_id)
        .await
        .expect("first access should create a cart");
    let second = app
        .services
        .cart
        .get_or_create_cart(user_id)
        .await
        .expect("second access should reuse the cart");

    assert_eq!(first.cart.id, second.cart.id);
    assert!(first.items.is_empty());
    assert_eq!(first.summary.item_count, 0);
    assert_eq!(first.summary.total, Decimal::ZERO);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn add_item_computes_discounted_totals() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let variant_id = app
        .seed_variant(VariantSpec {
            price: dec!(100.00),
            discount_percent: Some(dec!(10)),
            stock_count: 5,
            ..Default::default()
        })
        .await;

    let cart = app
        .services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 2,
            },
        )
        .await
        .expect("add should succeed");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.summary.item_count, 2);
    assert_eq!(cart.summary.subtotal, dec!(200.00));
    assert_eq!(cart.summary.total, dec!(180.00));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn adding_same_variant_twice_sums_into_one_line() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let variant_id = app
        .seed_variant(VariantSpec {
            stock_count: 10,
            ..Default::default()
        })
        .await;

    app.services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 2,
            },
        )
        .await
        .expect("first add");
    let cart = app
        .services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 3,
            },
        )
        .await
        .expect("second add");

    assert_eq!(cart.items.len(), 1, "expected a single merged line");
    assert_eq!(cart.items[0].quantity, 5);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn adding_beyond_stock_fails_and_leaves_cart_unchanged() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let variant_id = app
        .seed_variant(VariantSpec {
            stock_count: 3,
            ..Default::default()
        })
        .await;

    app.services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 2,
            },
        )
        .await
        .expect("within stock");

    let err = app
        .services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 2, // 2 + 2 > 3
            },
        )
        .await
        .expect_err("combined quantity exceeds stock");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let cart = app
        .services
        .cart
        .get_or_create_cart(user_id)
        .await
        .expect("cart still readable");
    assert_eq!(cart.items[0].quantity, 2, "failed add must not change the line");
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn unknown_variant_is_not_found() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;

    let err = app
        .services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id: Uuid::new_v4(),
                quantity: 1,
            },
        )
        .await
        .expect_err("variant does not exist");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn inactive_variant_or_product_cannot_be_added() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;

    let inactive_variant = app
        .seed_variant(VariantSpec {
            is_active: false,
            ..Default::default()
        })
        .await;
    let err = app
        .services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id: inactive_variant,
                quantity: 1,
            },
        )
        .await
        .expect_err("inactive variant");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let inactive_product = app.seed_product(None, false).await;
    let variant_of_inactive = app
        .seed_variant(VariantSpec {
            product_id: Some(inactive_product),
            ..Default::default()
        })
        .await;
    let err = app
        .services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id: variant_of_inactive,
                quantity: 1,
            },
        )
        .await
        .expect_err("inactive parent product");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn update_quantity_rechecks_stock_and_ownership() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let other_user = app.seed_user(UserRole::Customer).await;
    let variant_id = app
        .seed_variant(VariantSpec {
            stock_count: 4,
            ..Default::default()
        })
        .await;

    let cart = app
        .services
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
    let item_id = cart.items[0].id;

    let err = app
        .services
        .cart
        .update_item_quantity(user_id, item_id, 9)
        .await
        .expect_err("beyond stock");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let err = app
        .services
        .cart
        .update_item_quantity(other_user, item_id, 2)
        .await
        .expect_err("foreign cart line");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let cart = app
        .services
        .cart
        .update_item_quantity(user_id, item_id, 4)
        .await
        .expect("within stock");
    assert_eq!(cart.items[0].quantity, 4);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn missing_line_is_not_found() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;

    let err = app
        .services
        .cart
        .update_item_quantity(user_id, Uuid::new_v4(), 1)
        .await
        .expect_err("no such line");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn removing_last_item_leaves_a_valid_empty_cart() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;
    let variant_id = app.seed_variant(VariantSpec::default()).await;

    let cart = app
        .services
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
    let item_id = cart.items[0].id;

    let cart = app
        .services
        .cart
        .remove_item(user_id, item_id)
        .await
        .expect("remove should succeed");

    assert!(cart.items.is_empty());
    assert_eq!(cart.summary.item_count, 0);
    assert_eq!(cart.summary.total, Decimal::ZERO);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn clear_cart_is_idempotent_even_without_a_cart() {
    let app = TestApp::new().await;
    let user_id = app.seed_user(UserRole::Customer).await;

    // No cart exists yet; clearing must still succeed.
    app.services
        .cart
        .clear_cart(user_id)
        .await
        .expect("clearing an absent cart");

    let variant_id = app.seed_variant(VariantSpec::default()).await;
    app.services
        .cart
        .add_item(
            user_id,
            AddToCartInput {
                variant_id,
                quantity: 2,
            },
        )
        .await
        .expect("add");

    app.services
        .cart
        .clear_cart(user_id)
        .await
        .expect("clear");

    let cart = app
        .services
        .cart
        .get_or_create_cart(user_id)
        .await
        .expect("cart");
    assert!(cart.items.is_empty());
}
