//! Stock, payment and cleanup behaviour against a real database.
//! Every test here needs TEST_DATABASE_URL and runs with `cargo test -- --ignored`.

use std::collections::HashMap;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;
use uuid::Uuid;

use comix_commerce::{
    auth::jwt::{generate_token, TokenSubject, TokenType},
    build_app,
    db::{self, users::NewUser},
    domain::aggregates::{
        generate_order_no, Address, LineRequest, NewOrder, NewProduct, Order, OrderItem, OrderStatus, OrderTotals,
        PaymentMethod, PaymentStatus, Product, Role, Variant,
    },
    domain::value_objects::Slug,
    services::{cleanup, EventPublisher, PaymentConfirmation},
    ApiError, AppState, Config,
};

const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
const KEY_SECRET: &str = "rzp_test_secret";

fn test_config(database_url: &str) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.to_string()),
        ("JWT_SECRET", JWT_SECRET.to_string()),
        ("RAZORPAY_KEY_ID", "rzp_test_key".to_string()),
        ("RAZORPAY_KEY_SECRET", KEY_SECRET.to_string()),
        ("RAZORPAY_WEBHOOK_SECRET", "rzp_webhook_secret".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

async fn state() -> AppState {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let db = PgPoolOptions::new().max_connections(4).connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&db).await.unwrap();
    AppState::new(db, test_config(&url), EventPublisher::default()).unwrap()
}

async fn seed_user(db: &PgPool) -> Uuid {
    let user = NewUser {
        email: format!("buyer-{}@example.com", Uuid::new_v4().simple()),
        username: Some("buyer".into()),
        password_hash: None,
        google_id: None,
        first_name: Some("Asha".into()),
        last_name: Some("Menon".into()),
        phone_number: None,
        profile_picture: None,
        role: Role::Customer,
    };
    db::users::create(db, &user).await.unwrap().id
}

async fn seed_product(db: &PgPool, stock: i32) -> Product {
    let draft = NewProduct {
        name: format!("Rose Toner {}", Uuid::new_v4().simple()),
        description: None,
        category_id: None,
        brand: None,
        image_urls: vec!["https://res.cloudinary.com/demo/image/upload/v1/products/rose.jpg".into()],
        variants: vec![Variant { name: "50ml".into(), price: Decimal::new(250, 0), stock_quantity: stock }],
        discount_percentage: Decimal::ZERO,
    };
    let slug = Slug::from_name(&draft.name).unwrap();
    db::products::create(db, &draft, &slug).await.unwrap()
}

async fn stock_of(db: &PgPool, product_id: Uuid) -> i32 {
    let product = db::products::find_by_id(db, product_id).await.unwrap().unwrap();
    product.variants[0].stock_quantity
}

async fn set_stock(db: &PgPool, product_id: Uuid, stock: i32) {
    let variants = vec![Variant { name: "50ml".into(), price: Decimal::new(250, 0), stock_quantity: stock }];
    db::products::update_variants(db, product_id, &variants).await.unwrap();
}

fn address() -> Address {
    Address {
        address_name: Some("Home".into()),
        street: "MG Road".into(),
        state: "Kerala".into(),
        house: "12B".into(),
        postcode: "682001".into(),
        location: "Kochi".into(),
        country: "India".into(),
        phone_number: "9876543210".into(),
    }
}

async fn fill_cart(db: &PgPool, user_id: Uuid, product: &Product, quantity: u32) {
    let mut cart = db::carts::find_or_create(db, user_id).await.unwrap();
    let line = LineRequest {
        product_id: product.id,
        product_name: product.name.clone(),
        image_url: None,
        variant_name: "50ml".into(),
        quantity,
        unit_price: Decimal::new(250, 0),
    };
    let item = cart.add_item(line).unwrap().clone();
    db::carts::upsert_item(db, &item).await.unwrap();
}

/// A Razorpay order as checkout leaves it before the customer pays.
async fn pending_razorpay_order(db: &PgPool, user_id: Uuid, product: &Product, quantity: i32) -> Order {
    let items = vec![OrderItem::new(product.id, product.name.clone(), "50ml", quantity, Decimal::new(250, 0))];
    let totals = OrderTotals::compute(&items, Decimal::ZERO, Decimal::new(10350, 2));
    let order = NewOrder {
        order_no: generate_order_no("ORD"),
        user_id: Some(user_id),
        guest_info: None,
        items,
        totals,
        shipping_address: address(),
        payment_method: PaymentMethod::Razorpay,
        payment_status: PaymentStatus::Pending,
        order_status: OrderStatus::Pending,
        razorpay_order_id: Some(format!("order_{}", Uuid::new_v4().simple())),
        offer_id: None,
    };
    db::orders::insert(db, &order).await.unwrap()
}

fn paid(order: &Order, payment_id: &str) -> PaymentConfirmation {
    let razorpay_order_id = order.razorpay_order_id.clone().unwrap();
    let mut mac = Hmac::<Sha256>::new_from_slice(KEY_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}|{}", razorpay_order_id, payment_id).as_bytes());
    PaymentConfirmation {
        razorpay_order_id,
        razorpay_payment_id: payment_id.to_string(),
        razorpay_signature: hex::encode(mac.finalize().into_bytes()),
    }
}

async fn backdate(db: &PgPool, order_id: Uuid) {
    sqlx::query("UPDATE orders SET created_at = NOW() - INTERVAL '2 hours' WHERE id = $1")
        .bind(order_id)
        .execute(db)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_cod_checkout_takes_stock_and_clears_cart() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 5).await;
    fill_cart(&s.db, user_id, &product, 2).await;

    let placed = s.checkout.checkout_cart(user_id, address(), PaymentMethod::Cod, None).await.unwrap();
    assert_eq!(placed.order.order_status, OrderStatus::Confirmed);
    assert_eq!(placed.order.payment_status, PaymentStatus::Pending);
    assert!(placed.razorpay.is_none());
    assert_eq!(stock_of(&s.db, product.id).await, 3);
    let cart = db::carts::find_by_user(&s.db, user_id).await.unwrap();
    assert!(cart.map_or(true, |c| c.is_empty()));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_checkout_beyond_stock_conflicts() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 1).await;
    fill_cart(&s.db, user_id, &product, 3).await;

    let err = s.checkout.checkout_cart(user_id, address(), PaymentMethod::Cod, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);
    assert_eq!(stock_of(&s.db, product.id).await, 1);
    assert!(!db::carts::find_by_user(&s.db, user_id).await.unwrap().unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_payment_replay_takes_stock_once() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 5).await;
    let order = pending_razorpay_order(&s.db, user_id, &product, 2).await;

    let confirmed = s.checkout.verify_payment(Some(user_id), paid(&order, "pay_1")).await.unwrap();
    assert_eq!(confirmed.order_status, OrderStatus::Confirmed);
    assert_eq!(confirmed.payment_status, PaymentStatus::Completed);
    assert_eq!(stock_of(&s.db, product.id).await, 3);

    let replayed = s.checkout.verify_payment(Some(user_id), paid(&order, "pay_1")).await.unwrap();
    assert_eq!(replayed.order_status, OrderStatus::Confirmed);
    assert_eq!(stock_of(&s.db, product.id).await, 3);

    let other = s.checkout.verify_payment(Some(user_id), paid(&order, "pay_2")).await.unwrap_err();
    assert!(matches!(other, ApiError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_payment_rolls_back_when_stock_ran_out() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 5).await;
    let order = pending_razorpay_order(&s.db, user_id, &product, 2).await;
    set_stock(&s.db, product.id, 1).await;

    let err = s.checkout.verify_payment(Some(user_id), paid(&order, "pay_1")).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);
    assert_eq!(stock_of(&s.db, product.id).await, 1);
    let unchanged = db::orders::find_by_id(&s.db, order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.order_status, OrderStatus::Pending);
    assert_eq!(unchanged.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_cancelling_confirmed_order_restores_stock() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 5).await;
    let order = pending_razorpay_order(&s.db, user_id, &product, 2).await;
    s.checkout.verify_payment(Some(user_id), paid(&order, "pay_1")).await.unwrap();
    assert_eq!(stock_of(&s.db, product.id).await, 3);

    let cancelled = s.checkout.cancel(user_id, order.id).await.unwrap();
    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&s.db, product.id).await, 5);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_admin_cannot_confirm_unpaid_order() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 5).await;
    let order = pending_razorpay_order(&s.db, user_id, &product, 2).await;

    let err = s.checkout.update_status(order.id, OrderStatus::Confirmed, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)), "{:?}", err);

    // the customer's payment still goes through afterwards
    s.checkout.verify_payment(Some(user_id), paid(&order, "pay_1")).await.unwrap();
    assert_eq!(stock_of(&s.db, product.id).await, 3);

    s.checkout.update_status(order.id, OrderStatus::Cancelled, None).await.unwrap();
    assert_eq!(stock_of(&s.db, product.id).await, 5);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_admin_cancel_of_unpaid_order_leaves_stock() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 5).await;
    let order = pending_razorpay_order(&s.db, user_id, &product, 2).await;

    s.checkout.update_status(order.id, OrderStatus::Cancelled, None).await.unwrap();
    assert_eq!(stock_of(&s.db, product.id).await, 5);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_cleanup_only_removes_abandoned_orders() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 10).await;

    let abandoned = pending_razorpay_order(&s.db, user_id, &product, 1).await;
    let cancelled = pending_razorpay_order(&s.db, user_id, &product, 1).await;
    s.checkout.cancel(user_id, cancelled.id).await.unwrap();
    let shipped = pending_razorpay_order(&s.db, user_id, &product, 1).await;
    s.checkout.verify_payment(Some(user_id), paid(&shipped, "pay_ship")).await.unwrap();
    s.checkout.update_status(shipped.id, OrderStatus::Shipped, Some("TRK1".into())).await.unwrap();
    for id in [abandoned.id, cancelled.id, shipped.id] {
        backdate(&s.db, id).await;
    }

    let (deleted, _) = cleanup::sweep(&s.db, chrono::Duration::minutes(30)).await.unwrap();
    assert!(deleted >= 1);
    assert!(db::orders::find_by_id(&s.db, abandoned.id).await.unwrap().is_none());
    let kept = db::orders::find_by_id(&s.db, cancelled.id).await.unwrap().unwrap();
    assert_eq!(kept.order_status, OrderStatus::Cancelled);
    let kept = db::orders::find_by_id(&s.db, shipped.id).await.unwrap().unwrap();
    assert_eq!(kept.order_status, OrderStatus::Shipped);
}

fn review_with_photo(token: &str, product_id: Uuid) -> Request<Body> {
    let boundary = "comix-review-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"product_id\"\r\n\r\n{id}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"comment\"\r\n\r\nLovely scent\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"rating\"\r\n\r\n5\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"rose.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nnot-really-a-jpeg\r\n\
         --{b}--\r\n",
        b = boundary,
        id = product_id
    );
    Request::builder()
        .method("POST")
        .uri("/api/reviews")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap()
}

fn token_for(user_id: Uuid) -> String {
    let subject = TokenSubject { user_id, email: "buyer@example.com", role: Role::Customer };
    generate_token(&subject, &Uuid::new_v4().to_string(), JWT_SECRET, 900, TokenType::Access).unwrap()
}

// Media is not configured in tests, so any upload attempt would surface as a 500.
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_rejected_review_does_not_upload_photo() {
    let s = state().await;
    let user_id = seed_user(&s.db).await;
    let product = seed_product(&s.db, 5).await;
    let token = token_for(user_id);
    let app = build_app(s.clone());

    let unknown = app.clone().oneshot(review_with_photo(&token, Uuid::new_v4())).await.unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let first = Request::builder()
        .method("POST")
        .uri("/api/reviews")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "product_id": product.id, "comment": "Nice", "rating": 4 }).to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(first).await.unwrap().status(), StatusCode::CREATED);

    let duplicate = app.oneshot(review_with_photo(&token, product.id)).await.unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
}
