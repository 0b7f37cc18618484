//! Simulated backend connection: snapshot channel, control API and feed task.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use swarmview_env::{
    ControlApi, EnvError, RawSnapshot, RemovalAck, RemovalRequest, SnapshotTransport,
    SwarmViewContext,
};

use crate::oracle::SwarmOracle;

/// Oracle shared between the feed task and the control API.
pub type SharedOracle = Arc<Mutex<SwarmOracle>>;

pub fn share(oracle: SwarmOracle) -> SharedOracle {
    Arc::new(Mutex::new(oracle))
}

fn lock(oracle: &SharedOracle) -> MutexGuard<'_, SwarmOracle> {
    oracle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot transport over a tokio channel.
pub struct ChannelTransport {
    /// Receiver behind a tokio mutex so `recv` can take `&self`
    rx: tokio::sync::Mutex<mpsc::Receiver<RawSnapshot>>,
}

impl ChannelTransport {
    /// Creates a transport and the sender the feed writes into.
    pub fn new(capacity: usize) -> (mpsc::Sender<RawSnapshot>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx: tokio::sync::Mutex::new(rx),
            },
        )
    }
}

#[async_trait]
impl SnapshotTransport for ChannelTransport {
    async fn recv(&self) -> Option<RawSnapshot> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

/// Control API answering from the oracle.
pub struct SimControl {
    oracle: SharedOracle,
}

impl SimControl {
    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl ControlApi for SimControl {
    async fn remove_agent(&self, request: RemovalRequest) -> Result<RemovalAck, EnvError> {
        let accepted = lock(&self.oracle).remove_agent(&request.agent_id);
        tracing::debug!(
            "Control API: remove {} -> {}",
            request.agent_id,
            if accepted { "ok" } else { "unknown agent" }
        );
        Ok(RemovalAck {
            request_id: request.request_id,
            agent_id: request.agent_id,
            accepted,
        })
    }
}

/// Control API that is always unreachable.
pub struct OfflineControl;

#[async_trait]
impl ControlApi for OfflineControl {
    async fn remove_agent(&self, _request: RemovalRequest) -> Result<RemovalAck, EnvError> {
        Err(EnvError::control("control API offline"))
    }
}

/// Steps the oracle once per snapshot interval and pushes each frame into
/// the transport, the way the backend broadcasts. Ends after `frames`
/// frames or when the receiving side is dropped.
pub async fn feed<Ctx: SwarmViewContext>(
    ctx: Ctx,
    oracle: SharedOracle,
    tx: mpsc::Sender<RawSnapshot>,
    frames: usize,
) {
    let interval = lock(&oracle).config().snapshot_interval();

    for frame in 0..frames {
        if frame > 0 {
            ctx.sleep(interval).await;
            lock(&oracle).step(interval);
        }

        let bytes = {
            let mut guard = lock(&oracle);
            if frame == 0 {
                guard.initial_state_bytes()
            } else {
                guard.snapshot_bytes()
            }
        };
        let payload = match bytes {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Feed could not encode frame {}: {}", frame, e);
                continue;
            }
        };

        let received_at_ms = ctx.now().as_millis() as u64;
        if tx.send(RawSnapshot::new(payload, received_at_ms)).await.is_err() {
            tracing::debug!("Feed stopped: transport closed");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use swarmview_core::{decode, Delivery, Role};
    use swarmview_env::TokioContext;

    #[tokio::test]
    async fn test_channel_transport_delivers_in_order() {
        let (tx, transport) = ChannelTransport::new(4);
        tx.send(RawSnapshot::new(b"a".to_vec(), 1)).await.unwrap();
        tx.send(RawSnapshot::new(b"b".to_vec(), 2)).await.unwrap();
        drop(tx);

        assert_eq!(transport.recv().await.unwrap().payload, b"a");
        assert_eq!(transport.recv().await.unwrap().payload, b"b");
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_sim_control_acks_removal() {
        let oracle = share(SwarmOracle::new(SimConfig::default()));
        let control = SimControl::new(Arc::clone(&oracle));

        let request = RemovalRequest::new("solver_3");
        let ack = control.remove_agent(request.clone()).await.unwrap();
        assert!(ack.accepted);
        assert_eq!(ack.request_id, request.request_id);
        assert!(!lock(&oracle).contains("solver_3"));

        let again = control.remove_agent(RemovalRequest::new("solver_3")).await.unwrap();
        assert!(!again.accepted);
    }

    #[tokio::test]
    async fn test_offline_control_errors() {
        let result = OfflineControl.remove_agent(RemovalRequest::new("solver_0")).await;
        assert!(matches!(result, Err(EnvError::ControlError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_sends_initial_state_then_updates() {
        let oracle = share(SwarmOracle::new(SimConfig::default()));
        let (tx, transport) = ChannelTransport::new(8);
        tokio::spawn(feed(TokioContext::new(), Arc::clone(&oracle), tx, 3));

        let first = transport.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&first.payload).unwrap();
        assert_eq!(value["type"], "initial_state");

        let mut frames = 1;
        while let Some(raw) = transport.recv().await {
            let Delivery::Snapshot(snapshot) = decode(&raw.payload).unwrap() else {
                panic!("expected a snapshot");
            };
            assert_eq!(snapshot.roster.group(Role::Solver).len(), 6);
            frames += 1;
        }
        assert_eq!(frames, 3);
        assert!((lock(&oracle).time() - 1.0).abs() < 1e-9);
    }
}
