//! Route table. Everything except `/health` lives under `/api`.

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::handlers::{
    admin, auth, banners, cart, categories, favourites, health, newsletter, offers, orders, payments, products, reports, reviews,
    users,
};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/verify-otp", post(auth::verify_otp))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/admin-login", post(auth::admin_login))
        .route("/api/auth/google", post(auth::google))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(users::me).put(users::update_me))
        .route("/api/users/me/addresses", post(users::add_address))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(categories::list).post(categories::create))
        .route("/api/categories/:id", get(categories::get).put(categories::update).delete(categories::delete))
        .route("/api/categories/:id/subcategories", post(categories::add_subcategory))
        .route(
            "/api/categories/:id/subcategories/:sub_id",
            put(categories::update_subcategory).delete(categories::delete_subcategory),
        )
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/by-ids", post(products::by_ids))
        .route("/api/products/recently-visited", get(products::recently_visited))
        .route("/api/products/slug/:slug", get(products::get_by_slug))
        .route("/api/products/:id", get(products::get).put(products::update))
        .route("/api/products/:id/block", patch(products::toggle_block))
        .route("/api/products/:id/visit", post(products::record_visit))
        .route("/api/products/:id/reviews", get(reviews::for_product))
}

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(cart::get).delete(cart::clear))
        .route("/api/cart/items", post(cart::add_item).put(cart::update_item).delete(cart::remove_item))
        .route("/api/favourites", get(favourites::list).post(favourites::add))
        .route("/api/favourites/:product_id", get(favourites::check).delete(favourites::remove))
        .route("/api/offers", get(offers::list).post(offers::create))
        .route("/api/offers/active", get(offers::active))
        .route("/api/offers/apply", post(offers::apply))
        .route("/api/offers/:id", put(offers::update).delete(offers::delete))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(orders::list_mine))
        .route("/api/orders/checkout", post(orders::checkout))
        .route("/api/orders/:id", get(orders::get))
        .route("/api/orders/:id/invoice", get(orders::invoice))
        .route("/api/orders/:id/cancel", post(orders::cancel))
        .route("/api/orders/:id/items/:index/return", post(orders::request_return))
        .route("/api/payment/verify", post(payments::verify))
        .route("/api/payment/guest/checkout", post(payments::guest_checkout))
        .route("/api/payment/guest/verify", post(payments::guest_verify))
        .route("/api/payment/webhook", post(payments::webhook))
}

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", post(reviews::create))
        .route("/api/reviews/:id", put(reviews::update))
        .route("/api/reviews/:id/block", patch(reviews::toggle_block))
        .route("/api/banners", get(banners::list).post(banners::create))
        .route("/api/banners/type/:banner_type", get(banners::by_type))
        .route("/api/banners/:id", get(banners::get).put(banners::update).delete(banners::delete))
        .route("/api/reports", post(reports::create))
        .route("/api/newsletter/subscribe", post(newsletter::subscribe))
        .route("/api/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/api/newsletter/unsubscribe/:email", get(newsletter::unsubscribe_page))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/sales", get(admin::sales))
        .route("/api/admin/products", get(products::list_all))
        .route("/api/admin/users", get(users::list))
        .route("/api/admin/users/:id", get(users::get))
        .route("/api/admin/users/:id/block", patch(users::block))
        .route("/api/admin/orders", get(orders::admin_list))
        .route("/api/admin/orders/:id", get(orders::admin_get))
        .route("/api/admin/orders/:id/status", patch(orders::update_status))
        .route("/api/admin/orders/:id/items/:index/return", patch(orders::resolve_return))
        .route("/api/admin/reports", get(reports::list))
        .route("/api/admin/reports/:id/status", patch(reports::set_status))
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(auth_routes())
        .merge(user_routes())
        .merge(catalog_routes())
        .merge(shopping_routes())
        .merge(order_routes())
        .merge(content_routes())
        .merge(admin_routes())
}
