pub mod catalog;
pub mod identity;
pub mod payment;

pub use catalog::{CatalogError, Resource, ResourceCatalog};
pub use identity::{Principal, Role};
pub use payment::{
    CheckoutSession, CreateSessionRequest, PaymentProvider, ProviderError, SessionStatus,
};
