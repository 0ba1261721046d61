//! Transactional email over SMTP via lettre, rendered from Askama templates.
//!
//! Without SMTP credentials the service logs what it would have sent and
//! reports success, so development setups work without a mail account.

use askama::Template;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::domain::aggregates::Order;

use super::invoice::{format_inr, InvoiceLine};

#[derive(Template)]
#[template(path = "email/signup_otp.html")]
struct SignupOtpHtml<'a> {
    username: &'a str,
    otp: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "email/signup_otp.txt")]
struct SignupOtpText<'a> {
    username: &'a str,
    otp: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: &'a str,
    order_no: &'a str,
    lines: &'a [InvoiceLine],
    subtotal: String,
    discount: String,
    has_discount: bool,
    shipping: String,
    total: String,
    address: String,
    payment_method: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: &'a str,
    order_no: &'a str,
    lines: &'a [InvoiceLine],
    total: String,
    address: String,
}

#[derive(Template)]
#[template(path = "email/newsletter_welcome.html")]
struct NewsletterWelcomeHtml<'a> {
    unsubscribe_link: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter_welcome.txt")]
struct NewsletterWelcomeText<'a> {
    unsubscribe_link: &'a str,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    brand: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let sender = config.username.clone().unwrap_or_else(|| "no-reply@comix.in".to_string());
        let from: Mailbox = format!("{} <{}>", config.from_name, sender)
            .parse()
            .map_err(|_| EmailError::InvalidAddress(sender.clone()))?;

        let mailer = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                let credentials = Credentials::new(username.clone(), password.expose_secret().to_string());
                Some(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port).credentials(credentials).build())
            }
            _ => {
                tracing::warn!("SMTP credentials not set; outgoing email will only be logged");
                None
            }
        };

        Ok(Self { mailer, from, brand: config.from_name.clone() })
    }

    pub async fn send_signup_otp(&self, to: &str, username: &str, otp: &str) -> Result<(), EmailError> {
        let minutes = crate::auth::otp::OTP_TTL_SECONDS / 60;
        let html = SignupOtpHtml { username, otp, minutes }.render()?;
        let text = SignupOtpText { username, otp, minutes }.render()?;
        self.send_multipart_email(to, &format!("Your {} verification code", self.brand), &text, &html).await
    }

    pub async fn send_order_confirmation(&self, to: &str, customer_name: &str, order: &Order) -> Result<(), EmailError> {
        let lines: Vec<InvoiceLine> = order.items.iter().map(InvoiceLine::from).collect();
        let total = format_inr(order.total_amount);
        let address = order.shipping_address.one_line();
        let html = OrderConfirmationHtml {
            customer_name,
            order_no: &order.order_no,
            lines: &lines,
            subtotal: format_inr(order.subtotal),
            discount: format_inr(order.discount_amount),
            has_discount: !order.discount_amount.is_zero(),
            shipping: format_inr(order.shipping_fee),
            total: total.clone(),
            address: address.clone(),
            payment_method: order.payment_method.as_str(),
        }
        .render()?;
        let text = OrderConfirmationText { customer_name, order_no: &order.order_no, lines: &lines, total, address }.render()?;
        self.send_multipart_email(to, &format!("Order Confirmation - {}", order.order_no), &text, &html).await
    }

    pub async fn send_newsletter_welcome(&self, to: &str, unsubscribe_link: &str) -> Result<(), EmailError> {
        let html = NewsletterWelcomeHtml { unsubscribe_link }.render()?;
        let text = NewsletterWelcomeText { unsubscribe_link }.render()?;
        self.send_multipart_email(to, "Welcome to Our Newsletter!", &text, &html).await
    }

    async fn send_multipart_email(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> Result<(), EmailError> {
        let recipient: Mailbox = to.parse().map_err(|_| EmailError::InvalidAddress(to.to_string()))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text_body.to_string()))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html_body.to_string())),
            )?;

        match &self.mailer {
            Some(mailer) => {
                mailer.send(email).await?;
                tracing::info!(to = %to, subject = %subject, "Email sent successfully");
            }
            None => tracing::info!(to = %to, subject = %subject, "Email not sent (SMTP disabled)"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::sample_order;
    use crate::domain::aggregates::{OrderStatus, PaymentStatus};

    fn disabled() -> EmailService {
        EmailService::new(&SmtpConfig {
            host: "smtp.example.com".into(), port: 587, username: None, password: None, from_name: "Comix".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_otp_templates_render() {
        let html = SignupOtpHtml { username: "jane", otp: "123456", minutes: 2 }.render().unwrap();
        assert!(html.contains("123456"));
        let text = SignupOtpText { username: "jane", otp: "123456", minutes: 2 }.render().unwrap();
        assert!(text.contains("2 minutes"));
    }

    #[test]
    fn test_order_confirmation_renders_lines() {
        let order = sample_order(OrderStatus::Confirmed, PaymentStatus::Completed);
        let lines: Vec<InvoiceLine> = order.items.iter().map(InvoiceLine::from).collect();
        let text = OrderConfirmationText {
            customer_name: "Jane", order_no: &order.order_no, lines: &lines, total: format_inr(order.total_amount), address: order.shipping_address.one_line(),
        }
        .render()
        .unwrap();
        assert!(text.contains("Widget"));
        assert!(text.contains("₹123.50"));
    }

    #[tokio::test]
    async fn test_disabled_transport_accepts_mail() {
        let service = disabled();
        assert!(service.send_newsletter_welcome("jane@example.com", "http://localhost/unsub").await.is_ok());
        assert!(matches!(service.send_newsletter_welcome("not an address", "x").await, Err(EmailError::InvalidAddress(_))));
    }
}
