use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use roost_booking::booking::BookingStatus;
use roost_booking::{
    BookingError, BookingFilter, BookingManager, CheckoutConfig, CheckoutCoordinator, HoldSweeper,
    MockPaymentProvider,
};
use roost_core::catalog::Resource;
use roost_core::identity::Principal;
use roost_store::{MemoryBookingStore, MemoryResourceCatalog};

struct Harness {
    store: Arc<MemoryBookingStore>,
    catalog: Arc<MemoryResourceCatalog>,
    provider: Arc<MockPaymentProvider>,
    manager: BookingManager,
    checkout: CheckoutCoordinator,
    resource: Resource,
    host: Principal,
    guest: Principal,
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryBookingStore::new());
    let catalog = Arc::new(MemoryResourceCatalog::new());
    let provider = Arc::new(MockPaymentProvider::new());

    let resource = Resource {
        id: Uuid::new_v4(),
        host_id: Uuid::new_v4(),
        nightly_rate_minor: 1000,
        currency: "USD".to_string(),
        capacity: 1,
    };
    catalog.insert(resource.clone()).await;

    let manager = BookingManager::new(store.clone(), catalog.clone());
    let checkout = CheckoutCoordinator::new(
        store.clone(),
        provider.clone(),
        CheckoutConfig::default(),
    );

    Harness {
        host: Principal::host(resource.host_id),
        guest: Principal::guest(Uuid::new_v4()),
        store,
        catalog,
        provider,
        manager,
        checkout,
        resource,
    }
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

#[tokio::test]
async fn full_lifecycle_to_checked_in() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.nights, 3);
    assert_eq!(booking.total_minor, 3000);

    let session = h.checkout.open_session(&h.guest, booking.id).await.unwrap();
    assert!(session.redirect_url.is_some());

    // Guest pays on the hosted page; the provider reports completion.
    h.provider.complete_session(&session.reference);
    let paid = h.checkout.reconcile(&session.reference).await.unwrap();
    assert_eq!(paid.status, BookingStatus::Paid);
    assert!(paid.paid_at.is_some());

    let confirmed = h.manager.confirm(&h.host, booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let checked_in = h
        .manager
        .check_in(&h.host, booking.id, date(1))
        .await
        .unwrap();
    assert_eq!(checked_in.status, BookingStatus::CheckedIn);
}

#[tokio::test]
async fn duplicate_completion_callback_is_idempotent() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    let session = h.checkout.open_session(&h.guest, booking.id).await.unwrap();
    h.provider.complete_session(&session.reference);

    let first = h.checkout.reconcile(&session.reference).await.unwrap();
    let second = h.checkout.reconcile(&session.reference).await.unwrap();

    assert_eq!(first.status, BookingStatus::Paid);
    assert_eq!(second.status, BookingStatus::Paid);
    assert_eq!(first.paid_at, second.paid_at);
    assert_eq!(first.version, second.version);
}

#[tokio::test]
async fn cancelled_booking_rejects_confirm() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();

    let cancelled = h.manager.cancel(&h.guest, booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let err = h.manager.confirm(&h.host, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::IllegalTransition { .. }));
}

#[tokio::test]
async fn expired_session_allows_retry_with_fresh_reference() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    let first = h.checkout.open_session(&h.guest, booking.id).await.unwrap();

    h.provider.expire_session(&first.reference);
    let after_expiry = h.checkout.reconcile(&first.reference).await.unwrap();
    assert_eq!(after_expiry.status, BookingStatus::AwaitingPayment);

    let second = h.checkout.retry(&h.guest, booking.id).await.unwrap();
    assert_ne!(first.reference, second.reference);

    let stored = h.manager.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.session_ref.as_deref(), Some(second.reference.as_str()));
    assert_eq!(stored.status, BookingStatus::AwaitingPayment);

    // Completing the replacement session pays the booking.
    h.provider.complete_session(&second.reference);
    let paid = h.checkout.reconcile(&second.reference).await.unwrap();
    assert_eq!(paid.status, BookingStatus::Paid);
}

#[tokio::test]
async fn retry_after_payment_is_refused() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    let session = h.checkout.open_session(&h.guest, booking.id).await.unwrap();
    h.provider.complete_session(&session.reference);
    h.checkout.reconcile(&session.reference).await.unwrap();

    let err = h.checkout.retry(&h.guest, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::AlreadyPaid));
}

#[tokio::test]
async fn provider_failure_leaves_booking_pending() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();

    h.provider.fail_next_call();
    let err = h.checkout.open_session(&h.guest, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::Provider(_)));

    let stored = h.manager.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
    assert!(stored.session_ref.is_none());

    // The guest can try again once the provider recovers.
    h.checkout.open_session(&h.guest, booking.id).await.unwrap();
}

#[tokio::test]
async fn completion_for_cancelled_booking_is_a_noop() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    let session = h.checkout.open_session(&h.guest, booking.id).await.unwrap();

    h.manager.cancel(&h.guest, booking.id).await.unwrap();

    // Payment completes provider-side after the cancellation.
    h.provider.complete_session(&session.reference);
    let reconciled = h.checkout.reconcile(&session.reference).await.unwrap();
    assert_eq!(reconciled.status, BookingStatus::Cancelled);
    assert!(reconciled.paid_at.is_none());
}

#[tokio::test]
async fn stranger_cannot_open_checkout_or_cancel() {
    let h = harness().await;

    let booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();

    let stranger = Principal::guest(Uuid::new_v4());
    assert!(matches!(
        h.checkout.open_session(&stranger, booking.id).await.unwrap_err(),
        BookingError::Forbidden(_)
    ));
    assert!(matches!(
        h.manager.cancel(&stranger, booking.id).await.unwrap_err(),
        BookingError::Forbidden(_)
    ));
    assert!(matches!(
        h.manager.confirm(&h.guest, booking.id).await.unwrap_err(),
        BookingError::Forbidden(_)
    ));
}

#[tokio::test]
async fn concurrent_bookings_admit_exactly_one() {
    let h = harness().await;
    let manager = Arc::new(BookingManager::new(h.store.clone(), h.catalog.clone()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let manager = Arc::clone(&manager);
        let guest = Principal::guest(Uuid::new_v4());
        let resource_id = h.resource.id;
        handles.push(tokio::spawn(async move {
            manager
                .create_booking(&guest, resource_id, date(10), date(14))
                .await
        }));
    }

    let mut created = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(BookingError::Unavailable) => refused += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(refused, 3);
}

#[tokio::test]
async fn sweep_releases_stale_unpaid_holds() {
    let h = harness().await;

    let stale = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    let paid_booking = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(10), date(12))
        .await
        .unwrap();
    let session = h
        .checkout
        .open_session(&h.guest, paid_booking.id)
        .await
        .unwrap();
    h.provider.complete_session(&session.reference);
    h.checkout.reconcile(&session.reference).await.unwrap();

    let sweeper = HoldSweeper::new(h.store.clone(), 1800);

    // Nothing is old enough yet.
    assert_eq!(sweeper.sweep().await.unwrap(), 0);

    // An hour later the unpaid hold is reclaimed, the paid one is kept.
    let released = sweeper
        .sweep_at(Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(released, 1);

    let reclaimed = h.manager.get_booking(stale.id).await.unwrap();
    assert_eq!(reclaimed.status, BookingStatus::Cancelled);
    let kept = h.manager.get_booking(paid_booking.id).await.unwrap();
    assert_eq!(kept.status, BookingStatus::Paid);

    // The reclaimed dates are bookable again.
    h.manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_rules_follow_payment_history() {
    let h = harness().await;

    let unpaid = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    h.manager.delete(&h.guest, unpaid.id).await.unwrap();
    assert!(matches!(
        h.manager.get_booking(unpaid.id).await.unwrap_err(),
        BookingError::NotFound(_)
    ));

    let paid = h
        .manager
        .create_booking(&h.guest, h.resource.id, date(10), date(12))
        .await
        .unwrap();
    let session = h.checkout.open_session(&h.guest, paid.id).await.unwrap();
    h.provider.complete_session(&session.reference);
    h.checkout.reconcile(&session.reference).await.unwrap();

    assert!(matches!(
        h.manager.delete(&h.guest, paid.id).await.unwrap_err(),
        BookingError::AlreadyPaid
    ));
}

#[tokio::test]
async fn host_listing_spans_owned_resources() {
    let h = harness().await;

    let second = Resource {
        id: Uuid::new_v4(),
        host_id: h.resource.host_id,
        nightly_rate_minor: 2500,
        currency: "USD".to_string(),
        capacity: 1,
    };
    h.catalog.insert(second.clone()).await;

    h.manager
        .create_booking(&h.guest, h.resource.id, date(1), date(4))
        .await
        .unwrap();
    h.manager
        .create_booking(&h.guest, second.id, date(1), date(4))
        .await
        .unwrap();

    let all = h
        .manager
        .list_for_host(&h.host, &BookingFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let windowed = h
        .manager
        .list_for_host(
            &h.host,
            &BookingFilter {
                from: Some(date(4)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(windowed.is_empty());
}
