use roost_booking::{BookingManager, CheckoutCoordinator};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub checkout: Arc<CheckoutCoordinator>,
    pub auth: AuthConfig,
}
