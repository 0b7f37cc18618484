//! SwarmView Simulator CLI
//!
//! Runs chaos scenarios against the scene engine, or drives a live view
//! from the synthetic backend on tokio's clock.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use swarmview_core::{SurfaceProvider, SwarmView};
use swarmview_env::{SwarmViewContext, TokioContext};
use swarmview_sim::scenarios::ScenarioId;
use swarmview_sim::{
    drive, feed, share, ChannelTransport, DriveOptions, DriveSummary, ScenarioResult,
    ScenarioRunner, SimConfig, SimControl, SimError, SwarmOracle,
};

/// SwarmView Deterministic Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "swarmview-sim")]
#[command(about = "Run deterministic simulation tests for SwarmView", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (steady, reorder, corrupt, churn, burst, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Simulated duration in seconds
    #[arg(short, long, default_value = "30")]
    duration: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export scene frames to a JSON file (single scenario only)
    #[arg(long)]
    export: Option<String>,

    /// JSON file overriding swarm and scene settings
    #[arg(short, long)]
    config: Option<String>,

    /// Drive a live view in real time instead of running scenarios
    #[arg(long)]
    drive: bool,

    /// Record the live view to a Rerun `.rrd` file
    #[cfg(feature = "visualization")]
    #[arg(long)]
    rrd: Option<String>,
}

fn load_config(path: Option<&str>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path))?;
    SimConfig::from_json(&text).with_context(|| format!("invalid config file {}", path))
}

/// Feeds a live view from the oracle over a channel transport.
async fn drive_live<P: SurfaceProvider>(
    config: SimConfig,
    duration: f64,
    surface: P,
) -> Result<DriveSummary, SimError> {
    let oracle = share(SwarmOracle::new(config.clone()));
    let (tx, transport) = ChannelTransport::new(16);
    let ctx = TokioContext::new();

    let broadcasts = (duration * 1000.0 / config.snapshot_interval_ms.max(1) as f64) as usize + 1;
    ctx.spawn("feed", feed(TokioContext::new(), Arc::clone(&oracle), tx, broadcasts));

    let (mut view, sender) = SwarmView::new(surface, config.scene.clone());
    let control = SimControl::new(oracle);
    let opts = DriveOptions::new(
        config.frame_interval(),
        (duration * config.frame_rate_hz as f64) as u64,
    );

    let summary = drive(&ctx, &transport, &control, &mut view, &sender, &opts).await;
    view.teardown();
    summary
}

fn run_drive(args: &Args, config: SimConfig) -> Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    info!("Driving live view for {:.0}s (seed={})", args.duration, config.seed);

    #[cfg(feature = "visualization")]
    let summary = match &args.rrd {
        Some(path) => {
            use swarmview_core::visualization::{RerunSurface, RerunTarget};
            let surface = RerunSurface::new("swarmview", RerunTarget::File(path.clone()));
            runtime.block_on(drive_live(config, args.duration, surface))?
        }
        None => runtime.block_on(drive_live(
            config,
            args.duration,
            swarmview_core::HeadlessSurface::new(),
        ))?,
    };

    #[cfg(not(feature = "visualization"))]
    let summary = runtime.block_on(drive_live(
        config,
        args.duration,
        swarmview_core::HeadlessSurface::new(),
    ))?;

    if args.json {
        let report = serde_json::json!({
            "frames": summary.frames,
            "frames_received": summary.frames_received,
            "removals_sent": summary.removals_sent,
            "removals_confirmed": summary.removals_confirmed,
            "stats": summary.stats,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        info!(
            "✓ {} frames, {} snapshots received, {} applied, {} edges spawned",
            summary.frames,
            summary.frames_received,
            summary.stats.snapshots_applied,
            summary.stats.edges_spawned
        );
    }
    Ok(summary.stats.snapshots_applied > 0)
}

fn run_export(
    config: SimConfig,
    scenario: ScenarioId,
    duration: f64,
    export_path: &str,
) -> Result<bool> {
    info!("Running with export to: {}", export_path);

    let seed = config.seed;
    let result = ScenarioRunner::with_config(config)
        .with_duration(duration)
        .with_export(true)
        .run(scenario);

    if let Some(export) = &result.export {
        export
            .write_to_file(export_path)
            .with_context(|| format!("failed to write export to {}", export_path))?;
        info!("Exported {} frames to {}", export.frames.len(), export_path);
    }

    if result.passed {
        info!("✓ {} (seed={}) PASSED - exported to {}", scenario.name(), seed, export_path);
    } else {
        error!(
            "✗ {} FAILED: {}",
            scenario.name(),
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
    Ok(result.passed)
}

fn run_scenarios(args: &Args, config: SimConfig, scenarios: &[ScenarioId]) -> Result<bool> {
    let base_seed = config.seed;
    let mut all_results: Vec<ScenarioResult> = Vec::new();

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::with_config(config.clone().with_seed(seed))
            .with_duration(args.duration);

        for scenario in scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            debug!("  {:?}", result.metrics);
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let failed: Vec<&ScenarioResult> = all_results.iter().filter(|r| !r.passed).collect();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "agents": r.final_agent_count,
                    "failure_reason": r.failure_reason,
                    "metrics": r.metrics,
                    "stats": r.stats,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), total);
            for result in &failed {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(failed.is_empty())
}

fn run(args: Args) -> Result<bool> {
    let mut config = load_config(args.config.as_deref())?;

    config.seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if args.drive {
        return run_drive(&args, config);
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        let scenario = args
            .scenario
            .parse::<ScenarioId>()
            .map_err(SimError::UnknownScenario)
            .context("available scenarios: steady, reorder, corrupt, churn, burst, all")?;
        vec![scenario]
    };

    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            anyhow::bail!("--export only supports a single scenario, not 'all'");
        }
        return run_export(config, scenarios[0], args.duration, export_path);
    }

    run_scenarios(&args, config, &scenarios)
}

fn main() {
    let args = Args::parse();

    // Logs go to stderr so `--json` output stays parseable
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("SwarmView Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
