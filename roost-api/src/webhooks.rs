use axum::{extract::State, http::StatusCode, Json};
use roost_booking::BookingError;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: SessionObject,
}

#[derive(Debug, Deserialize)]
pub struct SessionObject {
    /// Checkout session reference.
    pub id: String,
    pub status: Option<String>,
}

/// POST /v1/webhooks/payments
/// Push callback from the payment provider. The session state is re-fetched
/// from the provider rather than trusted from the payload, so replayed or
/// out-of-order deliveries reconcile to the same result.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<StatusCode, StatusCode> {
    tracing::info!(
        "received webhook {} ({}) for session {}",
        payload.id,
        payload.type_,
        payload.data.object.id
    );

    if payload.type_ == "checkout.session.completed" || payload.type_ == "checkout.session.expired"
    {
        match state.checkout.reconcile(&payload.data.object.id).await {
            Ok(_) => {}
            // The booking may have been hard-deleted since the session was
            // opened; acknowledge so the provider stops redelivering.
            Err(BookingError::NotFound(_)) => {
                tracing::warn!(
                    "webhook for session {} matches no booking, acknowledged",
                    payload.data.object.id
                );
            }
            Err(e) => {
                tracing::error!("webhook reconciliation failed: {e}");
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    Ok(StatusCode::OK)
}
