//! Core environment context trait for the SwarmView engine.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for environment interaction.
///
/// This trait abstracts the host so that the scene engine can run both
/// against a live backend (tokio) and inside the deterministic simulator.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - a manually advanced virtual clock
#[async_trait]
pub trait SwarmViewContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// This is the clock the frame loop is driven by: camera orbit,
    /// edge fade and pulse animation are all functions of it.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time (for log lines and exports).
    fn system_time(&self) -> SystemTime;

    /// Suspends until the next frame is due.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task (transport pumps, feed generators).
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
