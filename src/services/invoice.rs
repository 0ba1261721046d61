//! HTML invoices for orders

use askama::Template;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::{Order, OrderItem};
use crate::domain::value_objects::Money;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// An order line with its amounts already formatted for display.
#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub product_name: String,
    pub variant_name: String,
    pub quantity: i32,
    pub price: String,
    pub total_price: String,
}

impl From<&OrderItem> for InvoiceLine {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_name: item.product_name.clone(),
            variant_name: item.variant_name.clone(),
            quantity: item.quantity,
            price: format_inr(item.price),
            total_price: format_inr(item.total_price),
        }
    }
}

pub fn format_inr(amount: Decimal) -> String { Money::inr(amount).to_string() }

/// Who the invoice is billed to.
#[derive(Debug, Clone)]
pub struct BillTo {
    pub name: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "invoice.html")]
struct InvoiceTemplate<'a> {
    brand: &'a str,
    order_no: &'a str,
    order_date: String,
    bill_to: &'a BillTo,
    address: String,
    phone: &'a str,
    lines: Vec<InvoiceLine>,
    subtotal: String,
    discount: String,
    has_discount: bool,
    shipping: String,
    total: String,
    payment_method: &'a str,
    payment_status: &'a str,
    order_status: &'a str,
}

pub fn render_invoice(order: &Order, bill_to: &BillTo, brand: &str) -> Result<String, InvoiceError> {
    let html = InvoiceTemplate {
        brand,
        order_no: &order.order_no,
        order_date: order.created_at.format("%d %b %Y").to_string(),
        bill_to,
        address: order.shipping_address.one_line(),
        phone: &order.shipping_address.phone_number,
        lines: order.items.iter().map(InvoiceLine::from).collect(),
        subtotal: format_inr(order.subtotal),
        discount: format_inr(order.discount_amount),
        has_discount: !order.discount_amount.is_zero(),
        shipping: format_inr(order.shipping_fee),
        total: format_inr(order.total_amount),
        payment_method: order.payment_method.as_str(),
        payment_status: order.payment_status.as_str(),
        order_status: order.order_status.as_str(),
    }
    .render()?;
    Ok(html)
}

pub fn invoice_filename(order: &Order) -> String { format!("invoice-{}.html", order.order_no) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::sample_order;
    use crate::domain::aggregates::{OrderStatus, PaymentStatus};

    #[test]
    fn test_render_invoice() {
        let order = sample_order(OrderStatus::Delivered, PaymentStatus::Completed);
        let bill_to = BillTo { name: "Jane <Doe>".into(), email: "jane@example.com".into() };
        let html = render_invoice(&order, &bill_to, "Comix").unwrap();
        assert!(html.contains("ORD1"));
        assert!(html.contains("₹103.50"));
        assert!(html.contains("₹123.50"));
        // names are escaped
        assert!(html.contains("Jane &#60;Doe&#62;") || html.contains("Jane &lt;Doe&gt;"));
        assert_eq!(invoice_filename(&order), "invoice-ORD1.html");
    }

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(Decimal::new(5, 0)), "₹5.00");
        assert_eq!(format_inr(Decimal::new(12345, 3)), "₹12.35");
    }
}
