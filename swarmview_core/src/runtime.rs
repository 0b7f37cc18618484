//! SwarmView runtime - the single-context frame loop around the scene.
//!
//! # Architecture
//!
//! ```text
//! transport ──push──▶ SnapshotSender ═══ watch (latest wins) ═══▶ SnapshotInbox
//!                                                                     │
//!   host UI ──on_pointer──▶ pointer queue                             │
//!                                 │                    tick(now) ◀────┘
//!                                 ▼                      │
//!                       ┌───────────────────────────────────────────┐
//!                       │ 1. decode + apply latest snapshot          │
//!                       │ 2. sweep + render one frame                │
//!                       │ 3. resolve queued picks                    │
//!                       └───────────────────────────────────────────┘
//!                                 │                      │
//!              selection watch ◀──┘                      └──▶ removal requests
//! ```
//!
//! Snapshots arriving between ticks coalesce: only the newest one is applied
//! at the next tick boundary. Nothing here blocks; the async driver in
//! `swarmview_sim` owns the only suspension point.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use swarmview_env::{RawSnapshot, RemovalAck, RemovalRequest};

use crate::config::SceneConfig;
use crate::error::SceneError;
use crate::metrics::SceneStats;
use crate::render::SurfaceProvider;
use crate::scene::{ApplyReport, FrameReport, SceneManager};
use crate::snapshot::{self, AgentSnapshot, Delivery, SnapshotError};

// ============================================================================
// SNAPSHOT INBOX
// ============================================================================

#[derive(Debug, Default)]
struct Slot {
    seq: u64,
    raw: Option<RawSnapshot>,
}

/// Producer half of the snapshot inbox, held by the transport side.
#[derive(Debug)]
pub struct SnapshotSender {
    tx: watch::Sender<Slot>,
}

impl SnapshotSender {
    /// Replaces any undelivered snapshot with `raw`. Returns `false` once the
    /// runtime is gone.
    pub fn push(&self, raw: RawSnapshot) -> bool {
        self.tx.send_modify(|slot| {
            slot.seq += 1;
            slot.raw = Some(raw);
        });
        !self.tx.is_closed()
    }
}

/// Consumer half of the snapshot inbox.
#[derive(Debug)]
pub struct SnapshotInbox {
    rx: watch::Receiver<Slot>,
    applied_seq: u64,
}

impl SnapshotInbox {
    /// The newest snapshot not yet taken, if any. Works after the sender is
    /// dropped, so a final snapshot is never lost.
    pub fn take_latest(&mut self) -> Option<RawSnapshot> {
        let slot = self.rx.borrow();
        if slot.seq == self.applied_seq {
            return None;
        }
        let skipped = slot.seq - self.applied_seq - 1;
        if skipped > 0 {
            debug!("Coalesced {} stale snapshot(s)", skipped);
        }
        self.applied_seq = slot.seq;
        slot.raw.clone()
    }
}

pub fn snapshot_channel() -> (SnapshotSender, SnapshotInbox) {
    let (tx, rx) = watch::channel(Slot::default());
    (SnapshotSender { tx }, SnapshotInbox { rx, applied_seq: 0 })
}

// ============================================================================
// RUNTIME
// ============================================================================

/// A pointer press in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub frame: FrameReport,

    /// Set when a snapshot was applied this tick
    pub applied: Option<ApplyReport>,

    /// Set when the newest delivery failed validation; nothing was applied
    pub rejected: Option<SnapshotError>,

    /// The newest delivery was a keep-alive
    pub keep_alive: bool,

    /// Selection after each queued pointer event, in order
    pub picks: Vec<Option<AgentSnapshot>>,
}

pub struct SwarmView<P: SurfaceProvider> {
    scene: SceneManager<P>,
    inbox: SnapshotInbox,
    pointer_queue: VecDeque<PointerEvent>,
    selection_tx: watch::Sender<Option<AgentSnapshot>>,
    outgoing_removals: VecDeque<RemovalRequest>,
    pending_removals: HashMap<String, RemovalRequest>,
}

impl<P: SurfaceProvider> SwarmView<P> {
    /// Creates a runtime and the sender the transport pushes into.
    pub fn new(provider: P, config: SceneConfig) -> (Self, SnapshotSender) {
        let (sender, inbox) = snapshot_channel();
        let (selection_tx, _) = watch::channel(None);
        let view = Self {
            scene: SceneManager::new(provider, config),
            inbox,
            pointer_queue: VecDeque::new(),
            selection_tx,
            outgoing_removals: VecDeque::new(),
            pending_removals: HashMap::new(),
        };
        (view, sender)
    }

    pub fn initialize(&mut self) -> Result<(), SceneError> {
        self.scene.initialize()
    }

    /// Queues a pointer press; it is resolved after the next render.
    pub fn on_pointer(&mut self, x: f32, y: f32) {
        self.pointer_queue.push_back(PointerEvent { x, y });
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SceneError> {
        self.scene.resize(width, height)
    }

    /// Runs one frame: apply → render → picks.
    pub fn tick(&mut self, now: Duration) -> Result<TickReport, SceneError> {
        if self.scene.is_torn_down() {
            return Err(SceneError::TornDown);
        }
        if !self.scene.is_initialized() {
            return Err(SceneError::NotInitialized);
        }

        let mut report = TickReport::default();

        if let Some(raw) = self.inbox.take_latest() {
            match snapshot::decode(&raw.payload) {
                Ok(Delivery::Snapshot(swarm)) => {
                    let applied = self.scene.apply_snapshot(&swarm, now)?;
                    if !applied.reconcile.created.is_empty() {
                        debug!("✨ {} new agent object(s)", applied.reconcile.created.len());
                    }
                    report.applied = Some(applied);
                    self.publish_selection();
                }
                Ok(Delivery::KeepAlive) => report.keep_alive = true,
                Err(e) => {
                    warn!("⚠️  Snapshot rejected ({} bytes): {}", raw.size(), e);
                    self.scene.record_rejected();
                    report.rejected = Some(e);
                }
            }
        }

        report.frame = self.scene.tick(now)?;

        while let Some(event) = self.pointer_queue.pop_front() {
            let picked = self.scene.pick(event.x, event.y, now);
            self.publish_selection();
            report.picks.push(picked);
        }

        Ok(report)
    }

    /// Sets the selection directly (e.g. from a list in the host UI).
    pub fn select(&mut self, agent_id: Option<&str>) -> Option<AgentSnapshot> {
        let selected = self.scene.select(agent_id);
        self.publish_selection();
        selected
    }

    fn publish_selection(&self) {
        let current = self
            .scene
            .registry()
            .selected()
            .map(|object| object.snapshot().clone());
        self.selection_tx.send_if_modified(|slot| {
            if *slot == current {
                false
            } else {
                *slot = current;
                true
            }
        });
    }

    /// Receiver for the host UI's selection panel.
    pub fn subscribe_selection(&self) -> watch::Receiver<Option<AgentSnapshot>> {
        self.selection_tx.subscribe()
    }

    pub fn selection(&self) -> Option<AgentSnapshot> {
        self.selection_tx.borrow().clone()
    }

    /// Asks the control API to terminate an agent. The object stays in the
    /// scene until [`confirm_removal`](Self::confirm_removal) sees an
    /// accepting ack. Returns `None` for unknown or already-pending agents.
    pub fn request_removal(&mut self, agent_id: &str) -> Option<RemovalRequest> {
        if self.scene.is_torn_down()
            || !self.scene.registry().contains(agent_id)
            || self.pending_removals.contains_key(agent_id)
        {
            return None;
        }
        let request = RemovalRequest::new(agent_id);
        info!("📤 Removal requested for {} ({})", agent_id, request.request_id);
        self.pending_removals
            .insert(agent_id.to_owned(), request.clone());
        self.outgoing_removals.push_back(request.clone());
        Some(request)
    }

    /// Requests not yet handed to the control API.
    pub fn drain_removal_requests(&mut self) -> Vec<RemovalRequest> {
        self.outgoing_removals.drain(..).collect()
    }

    pub fn pending_removals(&self) -> usize {
        self.pending_removals.len()
    }

    /// Applies the control API's answer. Returns whether an object was
    /// removed. Acks that do not match a pending request are ignored.
    pub fn confirm_removal(&mut self, ack: &RemovalAck) -> Result<bool, SceneError> {
        let matches = self
            .pending_removals
            .get(&ack.agent_id)
            .is_some_and(|pending| pending.request_id == ack.request_id);
        if !matches {
            debug!("Ignoring unmatched removal ack for {}", ack.agent_id);
            return Ok(false);
        }
        self.pending_removals.remove(&ack.agent_id);

        if !ack.accepted {
            info!("Removal of {} declined by control API", ack.agent_id);
            return Ok(false);
        }
        let removed = self.scene.remove_agent(&ack.agent_id)?;
        self.publish_selection();
        Ok(removed)
    }

    pub fn scene(&self) -> &SceneManager<P> {
        &self.scene
    }

    pub fn stats(&self) -> SceneStats {
        self.scene.stats()
    }

    /// Cancels everything in flight and releases the scene. Safe to call
    /// more than once.
    pub fn teardown(&mut self) -> SceneStats {
        self.pointer_queue.clear();
        self.outgoing_removals.clear();
        self.pending_removals.clear();
        self.scene.teardown();
        self.selection_tx.send_replace(None);
        self.scene.stats()
    }
}
