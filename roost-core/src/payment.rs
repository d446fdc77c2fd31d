use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider-side state of a hosted checkout session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Session created, payment not completed yet.
    Open,
    /// Payment succeeded.
    Complete,
    /// Session abandoned or timed out on the provider side.
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "OPEN",
            SessionStatus::Complete => "COMPLETE",
            SessionStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(SessionStatus::Open),
            "COMPLETE" => Some(SessionStatus::Complete),
            "EXPIRED" => Some(SessionStatus::Expired),
            _ => None,
        }
    }
}

/// A hosted checkout session as mirrored from the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's opaque session identifier (e.g. `cs_123`).
    pub reference: String,
    pub booking_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub status: SessionStatus,
    /// Hosted payment page the guest is redirected to.
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub booking_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted-checkout payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a checkout session encoding the booking id and amount.
    async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<CheckoutSession, ProviderError>;

    /// Fetch the provider's current view of a session.
    async fn get_session(&self, reference: &str) -> Result<CheckoutSession, ProviderError>;
}

/// Transient provider failures; callers may retry.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("payment provider call timed out")]
    Timeout,

    #[error("payment provider request failed: {0}")]
    Transport(String),

    #[error("unknown checkout session: {0}")]
    UnknownSession(String),
}
