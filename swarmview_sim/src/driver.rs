//! Async frame loop connecting a transport, a control API and a view.
//!
//! One task multiplexes two event sources with `tokio::select!`:
//! - snapshot frames from the transport, pushed into the view's inbox
//! - the frame timer, on which the view ticks and removal requests are
//!   forwarded to the control API
//!
//! Transport frames are only buffered; nothing reaches the scene until the
//! next tick, so a burst of frames costs one reconciliation.

use std::time::Duration;
use tracing::{debug, info, warn};

use swarmview_core::{SceneStats, SnapshotSender, SurfaceProvider, SwarmView};
use swarmview_env::{ControlApi, RemovalAck, SnapshotTransport, SwarmViewContext};

use crate::error::SimError;

/// Something the host UI does at a given frame.
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    /// Pointer press in canvas pixels
    Pointer { x: f32, y: f32 },
    /// Ask the control API to terminate an agent
    Remove(String),
}

#[derive(Debug, Clone)]
pub struct DriveOptions {
    pub frame_interval: Duration,
    pub max_frames: u64,

    /// (frame number, action), applied before that frame's tick
    pub script: Vec<(u64, HostAction)>,
}

impl DriveOptions {
    pub fn new(frame_interval: Duration, max_frames: u64) -> Self {
        Self {
            frame_interval,
            max_frames,
            script: Vec::new(),
        }
    }

    pub fn with_action(mut self, frame: u64, action: HostAction) -> Self {
        self.script.push((frame, action));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DriveSummary {
    pub frames: u64,
    pub frames_received: u64,
    pub removals_sent: u64,
    pub removals_confirmed: u64,
    pub removals_failed: u64,
    pub stats: SceneStats,
}

/// Runs the view for `opts.max_frames` frames. The view is initialized
/// here; tearing it down is left to the caller.
pub async fn drive<Ctx, T, C, P>(
    ctx: &Ctx,
    transport: &T,
    control: &C,
    view: &mut SwarmView<P>,
    sender: &SnapshotSender,
    opts: &DriveOptions,
) -> Result<DriveSummary, SimError>
where
    Ctx: SwarmViewContext,
    T: SnapshotTransport,
    C: ControlApi,
    P: SurfaceProvider,
{
    view.initialize()?;
    info!("🎬 Driving view for {} frames", opts.max_frames);

    let mut summary = DriveSummary::default();
    let mut transport_open = true;

    while summary.frames < opts.max_frames {
        // One deadline per frame; frames arriving mid-interval do not push it back
        let timer = ctx.sleep(opts.frame_interval);
        tokio::pin!(timer);
        loop {
            tokio::select! {
                biased;

                raw = transport.recv(), if transport_open => match raw {
                    Some(raw) => {
                        summary.frames_received += 1;
                        sender.push(raw);
                    }
                    None => {
                        debug!("Transport closed after {} frame(s)", summary.frames_received);
                        transport_open = false;
                    }
                },

                _ = &mut timer => break,
            }
        }

        for (_, action) in opts.script.iter().filter(|(at, _)| *at == summary.frames) {
            match action {
                HostAction::Pointer { x, y } => view.on_pointer(*x, *y),
                HostAction::Remove(agent_id) => {
                    view.request_removal(agent_id);
                }
            }
        }

        view.tick(ctx.now())?;
        summary.frames += 1;

        for request in view.drain_removal_requests() {
            summary.removals_sent += 1;
            let ack = match control.remove_agent(request.clone()).await {
                Ok(ack) => ack,
                Err(e) => {
                    warn!("⚠️  Removal of {} failed: {}", request.agent_id, e);
                    summary.removals_failed += 1;
                    RemovalAck {
                        request_id: request.request_id,
                        agent_id: request.agent_id,
                        accepted: false,
                    }
                }
            };
            if view.confirm_removal(&ack)? {
                summary.removals_confirmed += 1;
            }
        }
    }

    summary.stats = view.stats();
    Ok(summary)
}
