//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::config::Config;
use crate::services::{CheckoutService, EmailService, EventPublisher, MediaService, RazorpayClient};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub checkout: Arc<CheckoutService>,
    pub email: EmailService,
    pub media: MediaService,
    pub events: EventPublisher,
}

impl AppState {
    /// Wires every service from the configuration. Does not touch the network.
    pub fn new(db: PgPool, config: Config, events: EventPublisher) -> Result<Self, crate::services::EmailError> {
        let http = reqwest::Client::new();
        let email = EmailService::new(&config.smtp)?;
        let media = MediaService::new(http.clone(), config.cloudinary.clone());
        let razorpay = RazorpayClient::new(http.clone(), config.razorpay.clone());
        let auth = Arc::new(AuthService::new(db.clone(), &config, http));
        let checkout = Arc::new(CheckoutService::new(db.clone(), razorpay, email.clone(), events.clone(), config.shipping_fee));
        Ok(Self { db, config: Arc::new(config), auth, checkout, email, media, events })
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self { state.auth.clone() }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self { state.db.clone() }
}
