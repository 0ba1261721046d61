//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{OrderStatus, ReturnStatus};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, slug: String },
    BlockToggled { product_id: Uuid, is_blocked: bool },
    StockDepleted { product_id: Uuid, variant_name: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_no: String, total: Decimal },
    Confirmed { order_id: Uuid, order_no: String, total: Decimal },
    PaymentFailed { order_id: Uuid, order_no: String },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    Cancelled { order_id: Uuid },
    ReturnUpdated { order_id: Uuid, item_index: usize, status: ReturnStatus },
}

impl DomainEvent {
    /// NATS subject, e.g. `commerce.order.confirmed`.
    pub fn subject(&self) -> String {
        let name = match self {
            DomainEvent::Product(ProductEvent::Created { .. }) => "product.created",
            DomainEvent::Product(ProductEvent::BlockToggled { .. }) => "product.block_toggled",
            DomainEvent::Product(ProductEvent::StockDepleted { .. }) => "product.stock_depleted",
            DomainEvent::Order(OrderEvent::Placed { .. }) => "order.placed",
            DomainEvent::Order(OrderEvent::Confirmed { .. }) => "order.confirmed",
            DomainEvent::Order(OrderEvent::PaymentFailed { .. }) => "order.payment_failed",
            DomainEvent::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            DomainEvent::Order(OrderEvent::Cancelled { .. }) => "order.cancelled",
            DomainEvent::Order(OrderEvent::ReturnUpdated { .. }) => "order.return_updated",
        };
        format!("commerce.{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_and_payload() {
        let event = DomainEvent::Order(OrderEvent::Cancelled { order_id: Uuid::nil() });
        assert_eq!(event.subject(), "commerce.order.cancelled");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregate"], "order");
        assert_eq!(json["event"]["type"], "cancelled");
    }
}
