//! Service lifecycle signals and their cluster-wide dispatch

use crate::admin::fanout::fan_out;
use crate::admin::peers::AdminPeer;
use crate::admin::runner::CommandRunner;
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Lifecycle command posted to the process' service loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceSignal {
    Stop,
    Restart,
}

impl std::fmt::Display for ServiceSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceSignal::Stop => write!(f, "stop"),
            ServiceSignal::Restart => write!(f, "restart"),
        }
    }
}

/// Sending half of the process-wide service signal channel.
#[derive(Debug, Clone)]
pub struct ServiceSignalSender {
    tx: mpsc::Sender<ServiceSignal>,
}

pub type ServiceSignalReceiver = mpsc::Receiver<ServiceSignal>;

/// Create the service signal channel. The receiver belongs to whatever
/// performs the actual shutdown or restart.
pub fn service_signal_channel(buffer: usize) -> (ServiceSignalSender, ServiceSignalReceiver) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (ServiceSignalSender { tx }, rx)
}

impl ServiceSignalSender {
    /// Post a signal without waiting. Success means the signal was queued
    /// or a signal is already pending, not that the action has completed.
    pub fn post(&self, signal: ServiceSignal) -> Result<()> {
        match self.tx.try_send(signal) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::debug!(%signal, "service signal already pending, not queued");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(Error::SignalChannelClosed),
        }
    }
}

/// Run one service command on one runner.
pub async fn invoke_service_cmd(runner: &dyn CommandRunner, signal: ServiceSignal) -> Result<()> {
    match signal {
        ServiceSignal::Stop => runner.stop().await,
        ServiceSignal::Restart => runner.restart().await,
    }
}

/// Send a service command to every remote peer concurrently, then to the
/// local peer.
///
/// Best effort: one unreachable node never prevents the rest of the cluster
/// from receiving the command. Per-peer outcomes are returned aligned with
/// `peers` and failures are logged.
pub async fn send_service_cmd(peers: &[AdminPeer], signal: ServiceSignal) -> Vec<Result<()>> {
    let results = fan_out(peers, move |runner: Arc<dyn CommandRunner>| async move {
        invoke_service_cmd(runner.as_ref(), signal).await
    })
    .await;

    for (peer, result) in peers.iter().zip(&results) {
        if let Err(e) = result {
            tracing::warn!(peer = %peer.addr, %signal, "service command failed: {}", e);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_delivered() {
        let (tx, mut rx) = service_signal_channel(1);
        tx.post(ServiceSignal::Restart).unwrap();
        assert_eq!(rx.recv().await, Some(ServiceSignal::Restart));
    }

    #[tokio::test]
    async fn test_post_to_full_channel_does_not_wait() {
        let (tx, mut rx) = service_signal_channel(1);
        tx.post(ServiceSignal::Stop).unwrap();
        tx.post(ServiceSignal::Restart).unwrap();
        tx.post(ServiceSignal::Stop).unwrap();

        assert_eq!(rx.recv().await, Some(ServiceSignal::Stop));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_post_after_receiver_dropped() {
        let (tx, rx) = service_signal_channel(1);
        drop(rx);
        assert_eq!(tx.post(ServiceSignal::Stop), Err(Error::SignalChannelClosed));
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(ServiceSignal::Stop.to_string(), "stop");
        assert_eq!(ServiceSignal::Restart.to_string(), "restart");
    }
}
