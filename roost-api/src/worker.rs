use roost_booking::HoldSweeper;
use std::time::Duration;
use tracing::{error, info};

/// Periodically reclaim date ranges held by unpaid bookings whose checkout
/// was never completed.
pub async fn start_expiry_worker(sweeper: HoldSweeper, interval: Duration) {
    info!("expiry worker started, sweeping every {}s", interval.as_secs());

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match sweeper.sweep().await {
            Ok(0) => {}
            Ok(released) => info!("released {released} stale pending holds"),
            Err(e) => error!("expiry sweep failed: {e}"),
        }
    }
}
