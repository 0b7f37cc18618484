//! SwarmView Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the SwarmView engine run
//! against a live swarm backend (tokio) or a deterministic simulation.
//!
//! # Core Concept: One Cooperative Timeline
//!
//! The engine never talks to sockets or clocks directly. Everything that
//! would introduce non-determinism is routed through a trait:
//! - Time (`now()`, `sleep()`) via [`SwarmViewContext`]
//! - Snapshot delivery (`recv()`) via [`SnapshotTransport`]
//! - Administrative commands (`remove_agent()`) via [`ControlApi`]
//!
//! # Example
//!
//! ```ignore
//! use swarmview_env::{SwarmViewContext, SnapshotTransport};
//!
//! async fn frame_loop<Ctx: SwarmViewContext, T: SnapshotTransport>(ctx: &Ctx, transport: &T) {
//!     loop {
//!         tokio::select! {
//!             raw = transport.recv() => buffer(raw),
//!             _ = ctx.sleep(Duration::from_millis(16)) => tick(ctx.now()),
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod tokio_impl;
mod transport;
mod types;

pub use context::SwarmViewContext;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
pub use transport::{ControlApi, SnapshotTransport};
pub use types::{RawSnapshot, RemovalAck, RemovalRequest};
