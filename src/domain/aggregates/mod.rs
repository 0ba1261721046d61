//! Aggregates module
pub mod banner;
pub mod cart;
pub mod category;
pub mod offer;
pub mod order;
pub mod product;
pub mod report;
pub mod review;
pub mod user;

pub use banner::{Banner, BannerError, BannerType};
pub use cart::{Cart, CartError, CartItem, CartSummary, LineRequest};
pub use category::{Category, CategoryError, Subcategory, SubcategoryPatch};
pub use offer::{AppliedOffer, Offer, OfferError};
pub use order::{
    generate_order_no, GuestInfo, NewOrder, Order, OrderError, OrderItem, OrderStatus, OrderTotals, PaymentDetails,
    PaymentMethod, PaymentOutcome, PaymentStatus, ReturnReason, ReturnStatus, ReturnType,
};
pub use product::{NewProduct, Product, ProductError, Variant, LOW_STOCK_THRESHOLD};
pub use report::{NewsletterSubscription, Report, ReportStatus};
pub use review::{Review, ReviewError};
pub use user::{Address, AddressError, Role, User};
