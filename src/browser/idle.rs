//! Network idle detection

use std::time::Duration;
use tokio::sync::watch;

/// Waits until the number of in-flight requests stays at or below
/// `max_in_flight` for a full `quiet_window`
///
/// The count is published by the capture collector. If the publisher goes
/// away the network is considered idle.
pub async fn wait_for_network_idle(
    mut in_flight: watch::Receiver<usize>,
    quiet_window: Duration,
    max_in_flight: usize,
) {
    loop {
        let current = *in_flight.borrow_and_update();

        if current <= max_in_flight {
            match tokio::time::timeout(quiet_window, wait_until_busy(&mut in_flight, max_in_flight))
                .await
            {
                // Stayed quiet for the whole window
                Err(_) => return,
                // Publisher dropped
                Ok(false) => return,
                Ok(true) => continue,
            }
        } else if in_flight.changed().await.is_err() {
            return;
        }
    }
}

/// Resolves with `true` once the count exceeds `max_in_flight`, or `false` if
/// the sender is dropped first
async fn wait_until_busy(in_flight: &mut watch::Receiver<usize>, max_in_flight: usize) -> bool {
    loop {
        if in_flight.changed().await.is_err() {
            return false;
        }
        if *in_flight.borrow_and_update() > max_in_flight {
            return true;
        }
    }
}
