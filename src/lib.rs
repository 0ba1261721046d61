//! Comix Commerce
//!
//! Storefront and admin API for a single-vendor shop.
//!
//! ## Features
//! - Catalog with variants, categories, banners and offers
//! - Cart, checkout with Razorpay or cash on delivery, guest checkout
//! - Orders with status tracking, returns and HTML invoices
//! - Reviews, favourites, product reports and a newsletter
//! - Email/OTP, password and Google sign-in with rotating refresh tokens

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Enough for a product form carrying its full set of images.
const MAX_BODY_BYTES: usize = 40 * 1024 * 1024;

/// The full application router with its middleware stack.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());
    routes::api_router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins");
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
