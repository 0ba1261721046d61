//! Outbound integrations and long-running jobs.

pub mod checkout;
pub mod cleanup;
pub mod email;
pub mod events;
pub mod invoice;
pub mod media;
pub mod razorpay;

pub use checkout::{CheckoutService, LineSelection, PaymentConfirmation, PlacedOrder};
pub use email::{EmailError, EmailService};
pub use events::EventPublisher;
pub use invoice::InvoiceError;
pub use media::{ImageUpload, MediaError, MediaService};
pub use razorpay::{PaymentError, RazorpayClient};
