use chrono::Utc;
use roost_core::identity::Principal;
use roost_core::payment::{
    CheckoutSession, CreateSessionRequest, PaymentProvider, ProviderError, SessionStatus,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::booking::Booking;
use crate::error::BookingError;
use crate::store::{BookingStore, StoreError};

/// Same bound as the lifecycle manager: a reconcile racing a cancel replays
/// its guards instead of losing the update.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Where the provider redirects the guest after payment.
    pub success_url: String,
    pub cancel_url: String,
    /// Upper bound on any single provider call.
    pub provider_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            success_url: "http://localhost:3000/checkout/success".to_string(),
            cancel_url: "http://localhost:3000/checkout/cancelled".to_string(),
            provider_timeout: Duration::from_secs(10),
        }
    }
}

/// Creates and tracks provider checkout sessions for bookings and reconciles
/// provider-reported session states back onto booking status.
pub struct CheckoutCoordinator {
    store: Arc<dyn BookingStore>,
    provider: Arc<dyn PaymentProvider>,
    config: CheckoutConfig,
}

impl CheckoutCoordinator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        provider: Arc<dyn PaymentProvider>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Open a hosted checkout session for the guest's pending booking and
    /// persist its reference on the record.
    ///
    /// Provider failures surface as [`BookingError::Provider`] and leave the
    /// booking untouched, so the guest can retry.
    pub async fn open_session(
        &self,
        actor: &Principal,
        booking_id: Uuid,
    ) -> Result<CheckoutSession, BookingError> {
        let booking = self
            .store
            .get(booking_id)
            .await?
            .ok_or(BookingError::NotFound("booking"))?;
        if booking.guest_id != actor.profile_id {
            return Err(BookingError::Forbidden(
                "open checkout for someone else's booking",
            ));
        }
        booking.ensure_payable()?;

        let session = self
            .provider_call(self.provider.create_session(CreateSessionRequest {
                booking_id: booking.id,
                amount_minor: booking.total_minor,
                currency: booking.currency.clone(),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
            }))
            .await?;

        self.attach(booking, &session).await?;
        info!(booking_id = %booking_id, reference = %session.reference, "checkout session opened");
        Ok(session)
    }

    /// Re-open checkout after a failed or abandoned session, replacing the
    /// previous reference. The pending record already holds the dates, so no
    /// availability re-check happens here.
    pub async fn retry(
        &self,
        actor: &Principal,
        booking_id: Uuid,
    ) -> Result<CheckoutSession, BookingError> {
        let previous = self
            .store
            .get(booking_id)
            .await?
            .and_then(|b| b.session_ref);
        let session = self.open_session(actor, booking_id).await?;
        if let Some(old) = previous {
            debug!(booking_id = %booking_id, old = %old, new = %session.reference, "payment retried, session replaced");
        }
        Ok(session)
    }

    /// Pull the provider's view of a session and fold it into the booking.
    ///
    /// Safe to call repeatedly (polling fallback and webhook share this
    /// path): a `Complete` session marks the booking paid exactly once, and
    /// reconciling against a since-cancelled booking is a logged no-op.
    pub async fn reconcile(&self, reference: &str) -> Result<Booking, BookingError> {
        let session = self.provider_call(self.provider.get_session(reference)).await?;

        for _attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let Some(mut booking) = self.lookup(reference, session.booking_id).await? else {
                return Err(BookingError::NotFound("booking"));
            };

            if booking.session_ref.as_deref() != Some(reference) {
                // A retry replaced this session; its reports no longer apply.
                debug!(booking_id = %booking.id, reference, "stale session report ignored");
                return Ok(booking);
            }
            if !booking.status.is_active() {
                info!(booking_id = %booking.id, reference, "session reconciled against cancelled booking, ignoring");
                return Ok(booking);
            }

            let changed = match session.status {
                SessionStatus::Complete => booking.mark_paid(Utc::now())?,
                status => booking.record_session_status(status),
            };
            if !changed {
                return Ok(booking);
            }

            match self.store.update(&booking).await {
                Ok(stored) => {
                    info!(
                        booking_id = %stored.id,
                        reference,
                        session_status = session.status.as_str(),
                        status = %stored.status,
                        "session reconciled"
                    );
                    return Ok(stored);
                }
                Err(StoreError::VersionConflict) => {
                    debug!(booking_id = %booking.id, reference, "version race during reconcile, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict)
    }

    async fn lookup(
        &self,
        reference: &str,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, BookingError> {
        if let Some(booking) = self.store.find_by_session_ref(reference).await? {
            return Ok(Some(booking));
        }
        // The booking may have replaced this reference through a retry.
        Ok(self.store.get(booking_id).await?)
    }

    async fn attach(
        &self,
        mut booking: Booking,
        session: &CheckoutSession,
    ) -> Result<(), BookingError> {
        for _attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            booking.attach_session(session.reference.clone())?;
            match self.store.update(&booking).await {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict) => {
                    debug!(booking_id = %booking.id, "version race while attaching session, retrying");
                    booking = self
                        .store
                        .get(booking.id)
                        .await?
                        .ok_or(BookingError::NotFound("booking"))?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::Conflict)
    }

    /// Every provider call runs under the configured timeout; a timed-out
    /// call fails the request instead of leaving the booking ambiguous.
    async fn provider_call<T>(
        &self,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, BookingError> {
        match tokio::time::timeout(self.config.provider_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("payment provider call timed out");
                Err(ProviderError::Timeout.into())
            }
        }
    }
}

/// In-process payment provider used by tests and local development.
///
/// Sessions progress only when a test (or a dev tool) flips them via
/// [`MockPaymentProvider::complete_session`] / `expire_session`, mirroring
/// how the hosted provider reports state changes.
#[derive(Default)]
pub struct MockPaymentProvider {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    fail_next: AtomicBool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next provider call fail with a transport error.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Simulate the guest completing payment on the hosted page.
    pub fn complete_session(&self, reference: &str) {
        self.set_status(reference, SessionStatus::Complete);
    }

    /// Simulate the session timing out on the provider side.
    pub fn expire_session(&self, reference: &str) {
        self.set_status(reference, SessionStatus::Expired);
    }

    fn set_status(&self, reference: &str, status: SessionStatus) {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(reference) {
            session.status = status;
        }
    }

    fn take_failure(&self) -> Result<(), ProviderError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ProviderError::Transport(
                "simulated gateway failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_session(
        &self,
        req: CreateSessionRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        self.take_failure()?;
        let reference = format!("cs_mock_{}", Uuid::new_v4().simple());
        let session = CheckoutSession {
            reference: reference.clone(),
            booking_id: req.booking_id,
            amount_minor: req.amount_minor,
            currency: req.currency,
            status: SessionStatus::Open,
            redirect_url: Some(format!("https://pay.example/session/{reference}")),
            created_at: Utc::now(),
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(reference, session.clone());
        Ok(session)
    }

    async fn get_session(&self, reference: &str) -> Result<CheckoutSession, ProviderError> {
        self.take_failure()?;
        self.sessions
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownSession(reference.to_string()))
    }
}
