//! Order placement and payment settlement
//!
//! Stock only leaves inventory when an order is confirmed (cash on delivery at
//! placement, Razorpay once the payment is verified). Both happen inside one
//! transaction that row-locks the products involved, so two checkouts cannot
//! sell the same unit twice.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::{
    generate_order_no, Address, CartError, GuestInfo, NewOrder, Order, OrderItem, OrderStatus, OrderTotals, PaymentDetails,
    PaymentMethod, PaymentOutcome, PaymentStatus, Product, ReturnReason, ReturnStatus, ReturnType,
};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;
use crate::error::{ApiError, ApiResult};

use super::{EmailService, EventPublisher, RazorpayClient};

const ORDER_PREFIX: &str = "ORD";

/// A line the customer asked for. Prices are always looked up server side.
#[derive(Debug, Clone, Deserialize)]
pub struct LineSelection {
    pub product_id: Uuid,
    pub variant_name: String,
    pub quantity: u32,
}

/// What the storefront needs to open Razorpay's checkout widget.
#[derive(Debug, Clone, Serialize)]
pub struct RazorpayCheckout {
    pub key_id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay: Option<RazorpayCheckout>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: PgPool,
    razorpay: RazorpayClient,
    email: EmailService,
    events: EventPublisher,
    shipping_fee: Decimal,
}

impl CheckoutService {
    pub fn new(db: PgPool, razorpay: RazorpayClient, email: EmailService, events: EventPublisher, shipping_fee: Decimal) -> Self {
        Self { db, razorpay, email, events, shipping_fee }
    }

    /// Turns the user's cart into an order.
    #[tracing::instrument(skip(self, address))]
    pub async fn checkout_cart(&self, user_id: Uuid, address: Address, method: PaymentMethod, offer_id: Option<Uuid>) -> ApiResult<PlacedOrder> {
        address.validate_for_shipping()?;
        let cart = db::carts::find_by_user(&self.db, user_id)
            .await?
            .filter(|c| !c.is_empty())
            .ok_or(CartError::Empty)?;
        let selections: Vec<LineSelection> = cart
            .items()
            .iter()
            .map(|i| LineSelection { product_id: i.product_id, variant_name: i.variant_name.clone(), quantity: i.quantity.max(0) as u32 })
            .collect();
        let items = self.price_lines(&selections).await?;
        let discount = self.offer_discount(offer_id, &items).await?;
        let totals = OrderTotals::compute(&items, discount, self.shipping_fee);

        let new_order = NewOrder {
            order_no: generate_order_no(ORDER_PREFIX),
            user_id: Some(user_id),
            guest_info: None,
            items,
            totals,
            shipping_address: address,
            payment_method: method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            razorpay_order_id: None,
            offer_id,
        };
        match method {
            PaymentMethod::Razorpay => self.place_razorpay_order(new_order).await,
            PaymentMethod::Cod => self.place_cod_order(new_order).await,
        }
    }

    /// Guest orders always go through Razorpay.
    #[tracing::instrument(skip_all, fields(guest = %guest.email))]
    pub async fn checkout_guest(&self, selections: Vec<LineSelection>, guest: GuestInfo, address: Address) -> ApiResult<PlacedOrder> {
        address.validate_for_shipping()?;
        if selections.is_empty() {
            return Err(ApiError::BadRequest("No items".to_string()));
        }
        let items = self.price_lines(&selections).await?;
        let totals = OrderTotals::compute(&items, Decimal::ZERO, self.shipping_fee);
        let new_order = NewOrder {
            order_no: generate_order_no(ORDER_PREFIX),
            user_id: None,
            guest_info: Some(guest),
            items,
            totals,
            shipping_address: address,
            payment_method: PaymentMethod::Razorpay,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            razorpay_order_id: None,
            offer_id: None,
        };
        self.place_razorpay_order(new_order).await
    }

    /// Checkout-widget callback. `user_id` is `None` for guest orders.
    #[tracing::instrument(skip(self, confirmation), fields(razorpay_order_id = %confirmation.razorpay_order_id))]
    pub async fn verify_payment(&self, user_id: Option<Uuid>, confirmation: PaymentConfirmation) -> ApiResult<Order> {
        self.razorpay.verify_payment(
            &confirmation.razorpay_order_id,
            &confirmation.razorpay_payment_id,
            &confirmation.razorpay_signature,
        )?;
        let details = PaymentDetails {
            razorpay_order_id: confirmation.razorpay_order_id,
            razorpay_payment_id: confirmation.razorpay_payment_id,
            razorpay_signature: confirmation.razorpay_signature,
            payment_date: Utc::now(),
        };
        self.settle(user_id, details, true).await
    }

    /// Razorpay webhook. The body must be the raw bytes Razorpay signed.
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> ApiResult<()> {
        self.razorpay.verify_webhook(body, signature)?;
        let event: super::razorpay::WebhookEvent = serde_json::from_slice(body)?;
        let Some(payment) = event.payment() else {
            tracing::debug!(event = %event.event, "Ignoring webhook without payment entity");
            return Ok(());
        };
        let Some(razorpay_order_id) = payment.order_id.clone() else { return Ok(()) };

        match event.event.as_str() {
            "payment.captured" => {
                let details = PaymentDetails {
                    razorpay_order_id,
                    razorpay_payment_id: payment.id.clone(),
                    razorpay_signature: String::new(),
                    payment_date: Utc::now(),
                };
                match self.settle(None, details, false).await {
                    Ok(_) => Ok(()),
                    Err(e @ (ApiError::NotFound(_) | ApiError::Conflict(_))) => {
                        tracing::warn!(error = %e, "Captured payment not applied");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            "payment.failed" => self.mark_failed(&razorpay_order_id).await,
            other => {
                tracing::debug!(event = %other, "Ignoring webhook event");
                Ok(())
            }
        }
    }

    /// Customer cancellation; puts stock back when the order had taken it.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> ApiResult<Order> {
        let mut tx = self.db.begin().await?;
        let mut order = db::orders::lock_by_id(&mut *tx, order_id)
            .await?
            .filter(|o| o.belongs_to(user_id))
            .ok_or_else(|| ApiError::not_found("Order"))?;
        if order.cancel()? {
            restore_stock(&mut tx, &order.items).await?;
        }
        db::orders::save(&mut *tx, &order).await?;
        tx.commit().await?;

        tracing::info!(order_no = %order.order_no, "Order cancelled");
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    /// Admin status change. Cancelling an order that took stock puts it back.
    #[tracing::instrument(skip(self, tracking_number))]
    pub async fn update_status(&self, order_id: Uuid, next: OrderStatus, tracking_number: Option<String>) -> ApiResult<Order> {
        let mut tx = self.db.begin().await?;
        let mut order = db::orders::lock_by_id(&mut *tx, order_id).await?.ok_or_else(|| ApiError::not_found("Order"))?;
        let held = order.holds_stock();
        let from = order.transition(next, tracking_number)?;
        if held && next == OrderStatus::Cancelled {
            restore_stock(&mut tx, &order.items).await?;
        }
        db::orders::save(&mut *tx, &order).await?;
        tx.commit().await?;

        tracing::info!(order_no = %order.order_no, from = %from, to = %next, "Order status updated");
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    pub async fn request_return(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        index: usize,
        request_type: ReturnType,
        reason: ReturnReason,
        description: Option<String>,
    ) -> ApiResult<Order> {
        let mut tx = self.db.begin().await?;
        let mut order = db::orders::lock_by_id(&mut *tx, order_id)
            .await?
            .filter(|o| o.belongs_to(user_id))
            .ok_or_else(|| ApiError::not_found("Order"))?;
        order.request_return(index, request_type, reason, description)?;
        db::orders::save(&mut *tx, &order).await?;
        tx.commit().await?;
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    pub async fn resolve_return(&self, order_id: Uuid, index: usize, status: ReturnStatus) -> ApiResult<Order> {
        let mut tx = self.db.begin().await?;
        let mut order = db::orders::lock_by_id(&mut *tx, order_id).await?.ok_or_else(|| ApiError::not_found("Order"))?;
        order.resolve_return(index, status)?;
        db::orders::save(&mut *tx, &order).await?;
        tx.commit().await?;
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    /// Re-prices the requested lines from current product data and checks stock.
    pub async fn price_lines(&self, selections: &[LineSelection]) -> ApiResult<Vec<OrderItem>> {
        let ids: Vec<Uuid> = selections.iter().map(|s| s.product_id).collect();
        let products: HashMap<Uuid, Product> = db::products::find_by_ids(&self.db, &ids).await?.into_iter().map(|p| (p.id, p)).collect();

        let mut wanted: HashMap<(Uuid, &str), u32> = HashMap::new();
        let mut items = Vec::with_capacity(selections.len());
        for s in selections {
            if s.quantity == 0 {
                return Err(ApiError::BadRequest(format!("Quantity for {} must be at least 1", s.variant_name)));
            }
            let product = products.get(&s.product_id).ok_or_else(|| ApiError::not_found("Product"))?;
            let total = wanted.entry((s.product_id, s.variant_name.as_str())).or_default();
            *total = total.saturating_add(s.quantity);
            product.ensure_available(&s.variant_name, *total)?;
            let quantity = i32::try_from(s.quantity).map_err(|_| ApiError::BadRequest("Quantity is too large".to_string()))?;
            items.push(OrderItem::new(product.id, product.name.clone(), s.variant_name.clone(), quantity, product.unit_price(&s.variant_name)?));
        }
        Ok(items)
    }

    async fn offer_discount(&self, offer_id: Option<Uuid>, items: &[OrderItem]) -> ApiResult<Decimal> {
        let Some(offer_id) = offer_id else { return Ok(Decimal::ZERO) };
        let offer = db::offers::find_by_id(&self.db, offer_id).await?.ok_or_else(|| ApiError::not_found("Offer"))?;
        // a product-bound offer discounts only that product's lines
        let (amount, product_id) = match offer.product_id {
            Some(bound) => {
                let amount: Decimal = items.iter().filter(|i| i.product_id == bound).map(|i| i.total_price).sum();
                (amount, items.iter().any(|i| i.product_id == bound).then_some(bound))
            }
            None => (items.iter().map(|i| i.total_price).sum(), None),
        };
        Ok(offer.apply(amount, product_id, Utc::now())?.discount_amount)
    }

    async fn place_razorpay_order(&self, mut new_order: NewOrder) -> ApiResult<PlacedOrder> {
        let key_id = self.razorpay.key_id()?.to_string();
        let gateway = self.razorpay.create_order(&Money::inr(new_order.totals.total_amount), &new_order.order_no).await?;
        new_order.razorpay_order_id = Some(gateway.id.clone());
        new_order.validate()?;
        let order = db::orders::insert(&self.db, &new_order).await?;
        tracing::info!(order_no = %order.order_no, razorpay_order_id = %gateway.id, "Pending order created");
        Ok(PlacedOrder {
            order,
            razorpay: Some(RazorpayCheckout { key_id, order_id: gateway.id, amount: gateway.amount, currency: gateway.currency }),
        })
    }

    async fn place_cod_order(&self, mut new_order: NewOrder) -> ApiResult<PlacedOrder> {
        new_order.order_status = OrderStatus::Confirmed;
        new_order.validate()?;
        let mut tx = self.db.begin().await?;
        let mut events = take_stock(&mut tx, &new_order.items).await?;
        let order = db::orders::insert(&mut *tx, &new_order).await?;
        if let Some(user_id) = order.user_id {
            db::carts::delete_for_user(&mut *tx, user_id).await?;
        }
        tx.commit().await?;

        tracing::info!(order_no = %order.order_no, total = %order.total_amount, "Cash on delivery order placed");
        events.push(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id,
            order_no: order.order_no.clone(),
            total: order.total_amount,
        }));
        self.events.publish_all(events).await;
        self.send_confirmation(&order).await;
        Ok(PlacedOrder { order, razorpay: None })
    }

    async fn settle(&self, user_id: Option<Uuid>, details: PaymentDetails, require_owner: bool) -> ApiResult<Order> {
        let mut tx = self.db.begin().await?;
        let mut order = db::orders::lock_by_razorpay_id(&mut *tx, &details.razorpay_order_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Order"))?;
        if require_owner && order.user_id != user_id {
            return Err(ApiError::not_found("Order"));
        }

        if order.confirm_payment(details)? == PaymentOutcome::AlreadyConfirmed {
            tx.rollback().await?;
            tracing::debug!(order_no = %order.order_no, "Payment already applied");
            return Ok(order);
        }
        let mut events = take_stock(&mut tx, &order.items).await?;
        db::orders::save(&mut *tx, &order).await?;
        db::orders::insert_payment(&mut *tx, &order).await?;
        if let Some(owner) = order.user_id {
            db::carts::delete_for_user(&mut *tx, owner).await?;
        }
        tx.commit().await?;

        tracing::info!(order_no = %order.order_no, total = %order.total_amount, "Payment confirmed");
        events.extend(order.take_events());
        self.events.publish_all(events).await;
        self.send_confirmation(&order).await;
        Ok(order)
    }

    async fn mark_failed(&self, razorpay_order_id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;
        let Some(mut order) = db::orders::lock_by_razorpay_id(&mut *tx, razorpay_order_id).await? else {
            return Ok(());
        };
        if order.fail_payment().is_err() {
            return Ok(());
        }
        db::orders::save(&mut *tx, &order).await?;
        tx.commit().await?;
        tracing::warn!(order_no = %order.order_no, "Payment failed");
        self.events.publish_all(order.take_events()).await;
        Ok(())
    }

    /// Email failures after a committed order are logged only.
    async fn send_confirmation(&self, order: &Order) {
        let recipient = match (&order.guest_info, order.user_id) {
            (Some(guest), _) => Some((guest.email.clone(), format!("{} {}", guest.first_name, guest.last_name))),
            (None, Some(user_id)) => match db::users::find_by_id(&self.db, user_id).await {
                Ok(Some(user)) => Some((user.email.clone(), user.display_name())),
                Ok(None) => None,
                Err(e) => {
                    tracing::error!(order_no = %order.order_no, error = %e, "Failed to load customer for confirmation email");
                    None
                }
            },
            (None, None) => None,
        };
        let Some((to, name)) = recipient else { return };
        if let Err(e) = self.email.send_order_confirmation(&to, &name, order).await {
            tracing::error!(order_no = %order.order_no, error = %e, "Failed to send order confirmation");
        }
    }
}

/// Locks every product in `items` and takes their quantities out of stock.
async fn take_stock(conn: &mut PgConnection, items: &[OrderItem]) -> ApiResult<Vec<DomainEvent>> {
    let mut products = lock_products(conn, items).await?;
    for item in items {
        let product = products.get_mut(&item.product_id).ok_or_else(|| ApiError::not_found("Product"))?;
        product.remove_inventory(&item.variant_name, item.quantity.max(0) as u32)?;
    }
    let mut events = Vec::new();
    for product in products.values_mut() {
        db::products::update_variants(&mut *conn, product.id, &product.variants).await?;
        events.extend(product.take_events());
    }
    Ok(events)
}

async fn restore_stock(conn: &mut PgConnection, items: &[OrderItem]) -> Result<(), sqlx::Error> {
    let mut products = lock_products(conn, items).await?;
    for item in items {
        if let Some(product) = products.get_mut(&item.product_id) {
            product.add_inventory(&item.variant_name, item.quantity.max(0) as u32);
        }
    }
    for product in products.values() {
        db::products::update_variants(&mut *conn, product.id, &product.variants).await?;
    }
    Ok(())
}

async fn lock_products(conn: &mut PgConnection, items: &[OrderItem]) -> Result<HashMap<Uuid, Product>, sqlx::Error> {
    let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    ids.sort();
    ids.dedup();
    let products = db::products::lock_for_update(conn, &ids).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}
