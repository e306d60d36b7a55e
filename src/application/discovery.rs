use crate::domain::address::Address;
use crate::domain::ports::{OpticalHandle, ProximityHandle};
use crate::error::{PaymentError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Backoff between proximity read attempts that returned nothing.
const PROXIMITY_POLL_BACKOFF: Duration = Duration::from_millis(250);

/// Which channel produced the counterparty address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryChannel {
    Proximity,
    Optical,
}

/// The single result of a discovery session. Produced at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub address: Address,
    pub channel: DiscoveryChannel,
}

/// Cloneable handle for aborting a discovery session from outside
/// (user cancels "looking for counterparty").
#[derive(Clone)]
pub struct DiscoveryCancel(Arc<Notify>);

impl DiscoveryCancel {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

/// Races the proximity channel against the optical channel for one
/// counterparty address.
///
/// Both channels run concurrently; every candidate is validated against the
/// strict address predicate, and the first valid one settles the session.
/// The losing channel is cancelled immediately so a stale callback can never
/// start a second pipeline: results funnel through a single-slot channel
/// that is read exactly once.
pub struct DiscoverySession {
    proximity: ProximityHandle,
    optical: OpticalHandle,
    cancelled: Arc<Notify>,
}

impl DiscoverySession {
    pub fn new(proximity: ProximityHandle, optical: OpticalHandle) -> Self {
        Self {
            proximity,
            optical,
            cancelled: Arc::new(Notify::new()),
        }
    }

    pub fn canceller(&self) -> DiscoveryCancel {
        DiscoveryCancel(Arc::clone(&self.cancelled))
    }

    /// Runs the race until a channel settles, the session is cancelled, or
    /// `timeout` elapses. Both channels are stopped before this returns,
    /// whatever the outcome.
    pub async fn resolve(&self, timeout: Duration) -> Result<DiscoveryResult> {
        let (tx, mut rx) = mpsc::channel::<DiscoveryResult>(1);

        let proximity_task = tokio::spawn(poll_proximity(Arc::clone(&self.proximity), tx.clone()));
        let optical_task = tokio::spawn(scan_optical(Arc::clone(&self.optical), tx));

        let outcome = tokio::select! {
            settled = rx.recv() => settled.ok_or(PaymentError::NoValidAddress),
            () = tokio::time::sleep(timeout) => Err(PaymentError::NoValidAddress),
            () = self.cancelled.notified() => Err(PaymentError::DiscoveryCancelled),
        };

        self.proximity.cancel();
        self.optical.cancel();
        proximity_task.abort();
        optical_task.abort();

        if let Ok(result) = &outcome {
            tracing::info!(
                address = %result.address,
                channel = ?result.channel,
                "discovery settled"
            );
        }
        outcome
    }
}

async fn poll_proximity(reader: ProximityHandle, tx: mpsc::Sender<DiscoveryResult>) {
    loop {
        match reader.read_payload().await {
            Ok(Some(payload)) => {
                if let Ok(address) = Address::parse(&payload) {
                    let _ = tx.try_send(DiscoveryResult {
                        address,
                        channel: DiscoveryChannel::Proximity,
                    });
                    return;
                }
                tracing::debug!(?payload, "proximity payload failed validation");
            }
            Ok(None) => tokio::time::sleep(PROXIMITY_POLL_BACKOFF).await,
            Err(e) => {
                tracing::warn!(error = %e, "proximity read failed");
                tokio::time::sleep(PROXIMITY_POLL_BACKOFF).await;
            }
        }
    }
}

async fn scan_optical(scanner: OpticalHandle, tx: mpsc::Sender<DiscoveryResult>) {
    loop {
        match scanner.next_frame().await {
            Ok(Some(frame)) => {
                if let Some(address) = Address::from_optical_payload(&frame) {
                    let _ = tx.try_send(DiscoveryResult {
                        address,
                        channel: DiscoveryChannel::Optical,
                    });
                    return;
                }
                tracing::debug!(?frame, "optical frame carried no valid address");
            }
            // Scanner shut down; no further frames will arrive.
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "optical scan failed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wallet::SigningKey;
    use crate::infrastructure::in_memory::{ScriptedProximity, ScriptedScanner};

    fn addr() -> Address {
        SigningKey::generate().address()
    }

    #[tokio::test]
    async fn test_proximity_wins_when_faster() {
        let winner = addr();
        let proximity =
            ScriptedProximity::with_payload(winner.to_string(), Duration::from_millis(50));
        let optical = ScriptedScanner::with_frames(vec![(
            Duration::from_millis(200),
            format!("ethereum:{}", addr()),
        )]);

        let session = DiscoverySession::new(Arc::new(proximity.clone()), Arc::new(optical.clone()));
        let result = session.resolve(Duration::from_secs(1)).await.unwrap();

        assert_eq!(result.channel, DiscoveryChannel::Proximity);
        assert_eq!(result.address, winner);
        // The loser was stopped before it would otherwise have resolved.
        assert!(optical.was_cancelled());
    }

    #[tokio::test]
    async fn test_optical_wins_with_scheme_payload() {
        let winner = addr();
        let proximity = ScriptedProximity::silent();
        let optical = ScriptedScanner::with_frames(vec![(
            Duration::from_millis(20),
            format!("ethereum:{winner}@10143"),
        )]);

        let session = DiscoverySession::new(Arc::new(proximity.clone()), Arc::new(optical));
        let result = session.resolve(Duration::from_secs(1)).await.unwrap();

        assert_eq!(result.channel, DiscoveryChannel::Optical);
        assert_eq!(result.address, winner);
        assert!(proximity.was_cancelled());
    }

    #[tokio::test]
    async fn test_invalid_frames_are_skipped() {
        let winner = addr();
        let proximity = ScriptedProximity::silent();
        let optical = ScriptedScanner::with_frames(vec![
            (Duration::from_millis(10), "https://not-an-address".to_string()),
            (Duration::from_millis(10), winner.to_string()),
        ]);

        let session = DiscoverySession::new(Arc::new(proximity), Arc::new(optical));
        let result = session.resolve(Duration::from_secs(1)).await.unwrap();
        assert_eq!(result.address, winner);
    }

    #[tokio::test]
    async fn test_timeout_when_no_channel_settles() {
        let session = DiscoverySession::new(
            Arc::new(ScriptedProximity::silent()),
            Arc::new(ScriptedScanner::silent()),
        );
        let err = session.resolve(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, PaymentError::NoValidAddress));
    }

    #[tokio::test]
    async fn test_external_cancellation_stops_both_channels() {
        let proximity = ScriptedProximity::silent();
        let optical = ScriptedScanner::silent();
        let session = DiscoverySession::new(Arc::new(proximity.clone()), Arc::new(optical.clone()));

        let canceller = session.canceller();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = session.resolve(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, PaymentError::DiscoveryCancelled));
        assert!(proximity.was_cancelled());
        assert!(optical.was_cancelled());
    }
}
