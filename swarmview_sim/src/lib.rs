//! SwarmView Deterministic Simulation Harness
//!
//! Runs the scene engine against a synthetic marketplace swarm with every
//! source of non-determinism under control:
//! - **Time**: a virtual clock that only moves one frame at a time
//! - **Backend**: an in-process oracle reproducing the broadcast payloads
//! - **Randomness**: all entropy derived from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ScenarioRunner                       │
//! │  ┌────────────┐  snapshot bytes   ┌──────────────────┐   │
//! │  │SwarmOracle │──────────────────►│ SwarmView        │   │
//! │  │ (backend)  │◄──────────────────│ (scene engine)   │   │
//! │  └────────────┘  removal requests └────────┬─────────┘   │
//! │                                            │             │
//! │                                  ┌─────────▼─────────┐   │
//! │                                  │ InvariantChecker  │   │
//! │                                  └───────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use swarmview_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42)
//!     .with_duration(30.0)
//!     .run(ScenarioId::Churn);
//! assert!(result.passed);
//! ```

mod config;
mod context;
mod driver;
mod error;
mod exporter;
mod network;
mod oracle;
mod runner;
pub mod scenarios;

pub use config::SimConfig;
pub use context::SimContext;
pub use driver::{drive, DriveOptions, DriveSummary, HostAction};
pub use error::SimError;
pub use exporter::{AgentFrame, EdgeFrame, MarkerFrame, SimEvent, SimExport, SimFrame};
pub use network::{feed, share, ChannelTransport, OfflineControl, SharedOracle, SimControl};
pub use oracle::{MessageCode, SwarmOracle, TaskType, TransactionRecord};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
