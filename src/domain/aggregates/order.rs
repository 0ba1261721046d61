//! Order Aggregate

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::aggregates::user::Address;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::string_enum;
use crate::domain::value_objects::round_money;

string_enum! {
    pub enum OrderStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
}

string_enum! {
    pub enum PaymentStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
    }
}

string_enum! {
    pub enum PaymentMethod {
        Razorpay => "razorpay",
        Cod => "cod",
    }
}

string_enum! {
    pub enum ReturnStatus {
        None => "none",
        Requested => "requested",
        Approved => "approved",
        Rejected => "rejected",
        Completed => "completed",
    }
}

string_enum! {
    pub enum ReturnType {
        Return => "return",
        Replace => "replace",
    }
}

string_enum! {
    pub enum ReturnReason {
        Damaged => "damaged",
        WrongItem => "wrong_item",
        NotAsDescribed => "not_as_described",
        Defective => "defective",
        SizeIssue => "size_issue",
        Other => "other",
    }
}

impl Default for ReturnStatus { fn default() -> Self { ReturnStatus::None } }

impl OrderStatus {
    /// Fulfilment graph: pending -> confirmed -> shipped -> delivered -> refunded,
    /// with cancellation allowed before shipping.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Shipped) | (Confirmed, Cancelled) | (Shipped, Delivered) | (Delivered, Refunded)
        )
    }
}

impl ReturnStatus {
    pub fn can_transition_to(self, next: ReturnStatus) -> bool {
        use ReturnStatus as R;
        matches!((self, next), (R::None, R::Requested) | (R::Requested, R::Approved) | (R::Requested, R::Rejected) | (R::Approved, R::Completed))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_no: String,
    pub user_id: Option<Uuid>,
    pub is_guest: bool,
    pub guest_info: Option<Json<GuestInfo>>,
    pub items: Json<Vec<OrderItem>>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: Json<Address>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub tracking_number: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub payment_details: Option<Json<PaymentDetails>>,
    pub offer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total_price: Decimal,
    #[serde(default)]
    pub return_status: ReturnStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_details: Option<ReturnDetails>,
}

impl OrderItem {
    pub fn new(product_id: Uuid, product_name: impl Into<String>, variant_name: impl Into<String>, quantity: i32, price: Decimal) -> Self {
        Self {
            product_id, product_name: product_name.into(), variant_name: variant_name.into(), quantity, price,
            total_price: round_money(price * Decimal::from(quantity)), return_status: ReturnStatus::None, return_details: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnDetails {
    pub request_type: ReturnType,
    pub reason: ReturnReason,
    pub description: Option<String>,
    pub request_date: DateTime<Utc>,
    pub status_update_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub payment_date: DateTime<Utc>,
}

/// Money breakdown of an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    pub fn compute(items: &[OrderItem], discount: Decimal, shipping_fee: Decimal) -> Self {
        let subtotal = round_money(items.iter().map(|i| i.total_price).sum());
        let discount_amount = round_money(discount.clamp(Decimal::ZERO, subtotal));
        let total_amount = round_money(subtotal - discount_amount + shipping_fee);
        Self { subtotal, discount_amount, shipping_fee, total_amount }
    }
}

/// Outcome of applying a verified payment to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome { Confirmed, AlreadyConfirmed }

/// `ORD1718000000000x7k` style order numbers.
pub fn generate_order_no(prefix: &str) -> String {
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(3).map(|c| char::from(c).to_ascii_lowercase()).collect();
    format!("{}{}{}", prefix, Utc::now().timestamp_millis(), suffix)
}

/// Everything needed to create an order row.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub order_no: String,
    pub user_id: Option<Uuid>,
    pub guest_info: Option<GuestInfo>,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub razorpay_order_id: Option<String>,
    pub offer_id: Option<Uuid>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.items.is_empty() { return Err(OrderError::NoItems); }
        if self.user_id.is_none() && self.guest_info.is_none() { return Err(OrderError::MissingCustomer); }
        if self.payment_method == PaymentMethod::Razorpay && self.razorpay_order_id.is_none() { return Err(OrderError::MissingGatewayOrder); }
        Ok(())
    }
}

impl Order {
    pub fn belongs_to(&self, user_id: Uuid) -> bool { self.user_id == Some(user_id) }

    pub fn customer_email(&self) -> Option<&str> { self.guest_info.as_ref().map(|g| g.email.as_str()) }

    pub fn transition(&mut self, next: OrderStatus, tracking_number: Option<String>) -> Result<OrderStatus, OrderError> {
        let from = self.order_status;
        if !from.can_transition_to(next) { return Err(OrderError::InvalidTransition { from, to: next }); }
        // Razorpay orders confirm through the payment, which is also when stock is taken
        if next == OrderStatus::Confirmed && !self.is_paid_or_cod() { return Err(OrderError::AwaitingPayment); }
        if next == OrderStatus::Shipped {
            let tracking = tracking_number.filter(|t| !t.trim().is_empty()).or_else(|| self.tracking_number.clone());
            if tracking.is_none() { return Err(OrderError::TrackingRequired); }
            self.tracking_number = tracking;
        } else if let Some(t) = tracking_number.filter(|t| !t.trim().is_empty()) {
            self.tracking_number = Some(t);
        }
        self.order_status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(from)
    }

    /// Applies a gateway-verified payment. Replaying the same payment id is a no-op.
    pub fn confirm_payment(&mut self, details: PaymentDetails) -> Result<PaymentOutcome, OrderError> {
        if self.payment_status == PaymentStatus::Completed {
            let same = self.payment_details.as_ref().is_some_and(|d| d.razorpay_payment_id == details.razorpay_payment_id);
            return if same { Ok(PaymentOutcome::AlreadyConfirmed) } else { Err(OrderError::AlreadyPaid) };
        }
        if self.order_status != OrderStatus::Pending { return Err(OrderError::InvalidTransition { from: self.order_status, to: OrderStatus::Confirmed }); }
        self.payment_status = PaymentStatus::Completed;
        self.order_status = OrderStatus::Confirmed;
        self.payment_details = Some(Json(details));
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Confirmed { order_id: self.id, order_no: self.order_no.clone(), total: self.total_amount }));
        Ok(PaymentOutcome::Confirmed)
    }

    pub fn fail_payment(&mut self) -> Result<(), OrderError> {
        if self.payment_status != PaymentStatus::Pending { return Err(OrderError::AlreadyPaid); }
        self.payment_status = PaymentStatus::Failed;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentFailed { order_id: self.id, order_no: self.order_no.clone() }));
        Ok(())
    }

    /// Customer cancellation. Returns true when reserved stock has to be put back.
    pub fn cancel(&mut self) -> Result<bool, OrderError> {
        if !self.order_status.can_transition_to(OrderStatus::Cancelled) { return Err(OrderError::CannotCancel); }
        let held = self.holds_stock();
        self.order_status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(held)
    }

    fn is_paid_or_cod(&self) -> bool {
        self.payment_method == PaymentMethod::Cod || self.payment_status == PaymentStatus::Completed
    }

    /// Whether this order took stock out of inventory: cash on delivery at placement,
    /// Razorpay once the payment was applied.
    pub fn holds_stock(&self) -> bool {
        matches!(self.order_status, OrderStatus::Confirmed | OrderStatus::Shipped | OrderStatus::Delivered) && self.is_paid_or_cod()
    }

    pub fn request_return(&mut self, index: usize, request_type: ReturnType, reason: ReturnReason, description: Option<String>) -> Result<(), OrderError> {
        if self.order_status != OrderStatus::Delivered { return Err(OrderError::NotDelivered); }
        let item = self.items.0.get_mut(index).ok_or(OrderError::ItemNotFound(index))?;
        if !item.return_status.can_transition_to(ReturnStatus::Requested) {
            return Err(OrderError::InvalidReturnTransition { from: item.return_status, to: ReturnStatus::Requested });
        }
        item.return_status = ReturnStatus::Requested;
        item.return_details = Some(ReturnDetails { request_type, reason, description, request_date: Utc::now(), status_update_date: None });
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::ReturnUpdated { order_id: self.id, item_index: index, status: ReturnStatus::Requested }));
        Ok(())
    }

    pub fn resolve_return(&mut self, index: usize, status: ReturnStatus) -> Result<(), OrderError> {
        let item = self.items.0.get_mut(index).ok_or(OrderError::ItemNotFound(index))?;
        if !item.return_status.can_transition_to(status) || status == ReturnStatus::Requested {
            return Err(OrderError::InvalidReturnTransition { from: item.return_status, to: status });
        }
        item.return_status = status;
        if let Some(details) = item.return_details.as_mut() { details.status_update_date = Some(Utc::now()); }
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::ReturnUpdated { order_id: self.id, item_index: index, status }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    pub(crate) fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    NoItems,
    MissingCustomer,
    MissingGatewayOrder,
    CannotCancel,
    AlreadyPaid,
    AwaitingPayment,
    TrackingRequired,
    NotDelivered,
    ItemNotFound(usize),
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    InvalidReturnTransition { from: ReturnStatus, to: ReturnStatus },
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::MissingCustomer => write!(f, "Order needs a user or guest information"),
            Self::MissingGatewayOrder => write!(f, "Razorpay order id is required"),
            Self::CannotCancel => write!(f, "Cannot cancel"),
            Self::AlreadyPaid => write!(f, "Order payment already settled"),
            Self::AwaitingPayment => write!(f, "Order cannot be confirmed before its payment is received"),
            Self::TrackingRequired => write!(f, "Tracking number is required to ship an order"),
            Self::NotDelivered => write!(f, "Returns are only possible for delivered orders"),
            Self::ItemNotFound(i) => write!(f, "Order item {} not found", i),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {} to {}", from, to),
            Self::InvalidReturnTransition { from, to } => write!(f, "Cannot move return from {} to {}", from, to),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_address() -> Address {
        Address {
            address_name: None, street: "MG Road".into(), state: "Kerala".into(), house: "12B".into(),
            postcode: "682001".into(), location: "Kochi".into(), country: "India".into(), phone_number: "9999999999".into(),
        }
    }

    pub(crate) fn sample_order(status: OrderStatus, payment: PaymentStatus) -> Order {
        let items = vec![OrderItem::new(Uuid::new_v4(), "Widget", "50ml", 2, Decimal::new(10, 0))];
        let totals = OrderTotals::compute(&items, Decimal::ZERO, Decimal::new(10350, 2));
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(), order_no: "ORD1".into(), user_id: Some(Uuid::new_v4()), is_guest: false, guest_info: None,
            items: Json(items), subtotal: totals.subtotal, discount_amount: totals.discount_amount, shipping_fee: totals.shipping_fee,
            total_amount: totals.total_amount, shipping_address: Json(sample_address()), payment_method: PaymentMethod::Razorpay,
            payment_status: payment, order_status: status, tracking_number: None, razorpay_order_id: Some("order_1".into()),
            payment_details: None, offer_id: None, created_at: now, updated_at: now, events: vec![],
        }
    }

    fn details(payment_id: &str) -> PaymentDetails {
        PaymentDetails { razorpay_order_id: "order_1".into(), razorpay_payment_id: payment_id.into(), razorpay_signature: "sig".into(), payment_date: Utc::now() }
    }

    #[test]
    fn test_order_workflow() {
        let mut order = sample_order(OrderStatus::Pending, PaymentStatus::Pending);
        assert_eq!(order.total_amount, Decimal::new(12350, 2));
        assert_eq!(order.confirm_payment(details("pay_1")).unwrap(), PaymentOutcome::Confirmed);
        assert_eq!(order.order_status, OrderStatus::Confirmed);
        assert_eq!(order.confirm_payment(details("pay_1")).unwrap(), PaymentOutcome::AlreadyConfirmed);
        assert_eq!(order.confirm_payment(details("pay_2")).unwrap_err(), OrderError::AlreadyPaid);
        assert_eq!(order.transition(OrderStatus::Shipped, None).unwrap_err(), OrderError::TrackingRequired);
        order.transition(OrderStatus::Shipped, Some("TRK1".into())).unwrap();
        order.transition(OrderStatus::Delivered, None).unwrap();
        assert_eq!(order.tracking_number.as_deref(), Some("TRK1"));
        assert_eq!(order.take_events().len(), 3);
    }

    #[test]
    fn test_transition_graph() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Confirmed));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn test_cancel() {
        let mut pending = sample_order(OrderStatus::Pending, PaymentStatus::Pending);
        assert!(!pending.cancel().unwrap());
        let mut confirmed = sample_order(OrderStatus::Confirmed, PaymentStatus::Completed);
        assert!(confirmed.cancel().unwrap());
        let mut shipped = sample_order(OrderStatus::Shipped, PaymentStatus::Completed);
        assert_eq!(shipped.cancel().unwrap_err(), OrderError::CannotCancel);
    }

    #[test]
    fn test_unpaid_razorpay_order_cannot_be_confirmed() {
        let mut order = sample_order(OrderStatus::Pending, PaymentStatus::Pending);
        assert_eq!(order.transition(OrderStatus::Confirmed, None).unwrap_err(), OrderError::AwaitingPayment);
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert!(!order.holds_stock());

        // the customer can still pay afterwards
        assert_eq!(order.confirm_payment(details("pay_1")).unwrap(), PaymentOutcome::Confirmed);
        assert!(order.holds_stock());

        let mut cod = sample_order(OrderStatus::Pending, PaymentStatus::Pending);
        cod.payment_method = PaymentMethod::Cod;
        cod.transition(OrderStatus::Confirmed, None).unwrap();
        assert!(cod.holds_stock());
    }

    #[test]
    fn test_stock_follows_payment_not_status() {
        // confirmed by status only, payment never applied
        let mut order = sample_order(OrderStatus::Confirmed, PaymentStatus::Pending);
        assert!(!order.holds_stock());
        assert!(!order.cancel().unwrap());

        let mut cod = sample_order(OrderStatus::Confirmed, PaymentStatus::Pending);
        cod.payment_method = PaymentMethod::Cod;
        assert!(cod.cancel().unwrap());
    }

    #[test]
    fn test_returns() {
        let mut confirmed = sample_order(OrderStatus::Confirmed, PaymentStatus::Completed);
        assert_eq!(confirmed.request_return(0, ReturnType::Return, ReturnReason::Damaged, None).unwrap_err(), OrderError::NotDelivered);

        let mut order = sample_order(OrderStatus::Delivered, PaymentStatus::Completed);
        assert_eq!(order.request_return(3, ReturnType::Return, ReturnReason::Damaged, None).unwrap_err(), OrderError::ItemNotFound(3));
        order.request_return(0, ReturnType::Replace, ReturnReason::WrongItem, Some("blue not red".into())).unwrap();
        assert!(order.request_return(0, ReturnType::Return, ReturnReason::Other, None).is_err());
        assert!(order.resolve_return(0, ReturnStatus::Completed).is_err());
        order.resolve_return(0, ReturnStatus::Approved).unwrap();
        order.resolve_return(0, ReturnStatus::Completed).unwrap();
        assert_eq!(order.items[0].return_status, ReturnStatus::Completed);
        assert!(order.items[0].return_details.as_ref().unwrap().status_update_date.is_some());
    }

    #[test]
    fn test_totals_clamp_discount() {
        let items = vec![OrderItem::new(Uuid::new_v4(), "A", "50ml", 1, Decimal::new(100, 0))];
        let totals = OrderTotals::compute(&items, Decimal::new(250, 0), Decimal::new(10350, 2));
        assert_eq!(totals.discount_amount, Decimal::new(100, 0));
        assert_eq!(totals.total_amount, Decimal::new(10350, 2));
    }

    #[test]
    fn test_order_no_format() {
        let no = generate_order_no("ORD");
        assert!(no.starts_with("ORD"));
        assert_eq!(no.len(), 3 + 13 + 3);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("Paid".parse::<OrderStatus>().is_err());
        assert_eq!(serde_json::to_string(&ReturnReason::WrongItem).unwrap(), "\"wrong_item\"");
    }

    #[test]
    fn test_new_order_validation() {
        let order = NewOrder {
            order_no: "ORD1".into(), user_id: None, guest_info: None, items: vec![],
            totals: OrderTotals::compute(&[], Decimal::ZERO, Decimal::ZERO), shipping_address: sample_address(),
            payment_method: PaymentMethod::Cod, payment_status: PaymentStatus::Pending, order_status: OrderStatus::Confirmed,
            razorpay_order_id: None, offer_id: None,
        };
        assert_eq!(order.validate().unwrap_err(), OrderError::NoItems);
    }
}
