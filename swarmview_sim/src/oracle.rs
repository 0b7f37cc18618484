//! Synthetic swarm backend for simulation.
//!
//! The oracle plays the role of the live swarm: it runs the task market
//! (announce → bid → assign → solve) on a virtual clock and renders its
//! state in the same envelope format the backend broadcasts:
//! - Coordinators announce a task every few seconds
//! - Solvers bid when the reward clears a skill-dependent threshold
//! - The lowest bid wins once the bidding window closes
//! - Assigned solvers submit a solution after a skill-dependent work time
//!
//! All randomness comes from one seeded `ChaCha8Rng`, so a seed fully
//! determines every snapshot the oracle emits.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use swarmview_core::Role;

use crate::config::SimConfig;

/// Unix seconds of virtual time zero (2024-01-01 00:00:00 UTC).
pub const EPOCH_SECS: f64 = 1_704_067_200.0;

/// Minimum spacing between two event timestamps.
const TIMESTAMP_STEP: f64 = 1e-4;

const BID_THRESHOLD: f64 = 800.0;
const BID_FACTOR: f64 = 0.6;
const REPUTATION_GAIN: f64 = 1.5;
const MAX_REPUTATION: f64 = 200.0;
const INITIAL_REPUTATION: f64 = 100.0;

/// Salt separating the roster-shuffle stream from the market stream.
const SHUFFLE_SALT: u64 = 0x5eed_0f_0dde;

// ============================================================================
// PROTOCOL TYPES
// ============================================================================

/// Kinds of work a coordinator can post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    PrimeFinding,
    HashCracking,
    Sorting,
    DataSearch,
}

impl TaskType {
    pub const ALL: [TaskType; 4] = [
        TaskType::PrimeFinding,
        TaskType::HashCracking,
        TaskType::Sorting,
        TaskType::DataSearch,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            TaskType::PrimeFinding => "prime_finding",
            TaskType::HashCracking => "hash_cracking",
            TaskType::Sorting => "sorting",
            TaskType::DataSearch => "data_search",
        }
    }

    /// Reward range in sompi, inclusive.
    fn reward_range(self) -> (u64, u64) {
        match self {
            TaskType::PrimeFinding => (1000, 3000),
            TaskType::HashCracking => (2000, 5000),
            TaskType::Sorting => (500, 1500),
            TaskType::DataSearch => (500, 1000),
        }
    }
}

/// Backend message codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCode {
    Announcement = 1,
    Bid = 2,
    Assignment = 3,
    Solution = 4,
}

impl MessageCode {
    pub fn wire_name(self) -> &'static str {
        match self {
            MessageCode::Announcement => "task_announcement",
            MessageCode::Bid => "task_bid",
            MessageCode::Assignment => "task_assignment",
            MessageCode::Solution => "solution_submission",
        }
    }
}

/// One entry of the oracle's transaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Unix seconds; strictly increasing across the whole history
    pub timestamp: f64,
    pub from: String,
    pub from_address: String,
    pub code: MessageCode,
    pub task_id: u64,
    pub task_type: Option<TaskType>,

    /// Winner of an assignment (not on the wire)
    pub to: Option<String>,

    /// Amount of a bid (not on the wire)
    pub amount: Option<u64>,
}

impl TransactionRecord {
    fn to_wire(&self, numeric: bool) -> Value {
        let msg_type = if numeric {
            json!(self.code as i64)
        } else {
            json!(self.code.wire_name())
        };
        json!({
            "timestamp": self.timestamp,
            "from": self.from,
            "from_address": self.from_address,
            "msg_type": msg_type,
            "task_id": self.task_id,
            "task_type": self.task_type.map(TaskType::wire_name),
        })
    }
}

// ============================================================================
// AGENTS AND TASKS
// ============================================================================

#[derive(Debug, Clone)]
struct SimAgent {
    id: String,
    role: Role,
    address: String,
    reputation: f64,
    completed_tasks: u64,
    balance: u64,
    total_bids: u64,
    successful_bids: u64,
    active_tasks: Vec<u64>,

    /// Solvers only
    skill: f64,
    specialization: Option<TaskType>,

    /// Coordinators: next announcement time
    next_announce_at: f64,

    /// Solvers: (task, ready time) for assigned work
    work: Vec<(u64, f64)>,
}

impl SimAgent {
    fn new(id: String, role: Role, address: String) -> Self {
        Self {
            id,
            role,
            address,
            reputation: INITIAL_REPUTATION,
            completed_tasks: 0,
            balance: 0,
            total_bids: 0,
            successful_bids: 0,
            active_tasks: Vec::new(),
            skill: 1.0,
            specialization: None,
            next_announce_at: 0.0,
            work: Vec::new(),
        }
    }

    fn drop_task(&mut self, task_id: u64) {
        self.active_tasks.retain(|t| *t != task_id);
        self.work.retain(|(t, _)| *t != task_id);
    }

    fn to_wire(&self) -> Value {
        let success_rate = if self.total_bids > 0 {
            self.successful_bids as f64 / self.total_bids as f64
        } else {
            0.0
        };
        let mut stats = json!({
            "agent_id": self.id,
            "role": match self.role {
                Role::Coordinator => "coordinator",
                Role::Solver => "solver",
            },
            "address": self.address,
            "reputation": self.reputation,
            "active_tasks": self.active_tasks.len(),
            "completed_tasks": self.completed_tasks,
            "balance": self.balance,
            "status": if self.active_tasks.is_empty() { "idle" } else { "working" },
            "total_bids": self.total_bids,
            "successful_bids": self.successful_bids,
            "success_rate": success_rate,
        });
        if self.role == Role::Solver {
            stats["skill_level"] = json!(self.skill);
            stats["specialization"] = json!(self.specialization.map(TaskType::wire_name));
        }
        stats
    }
}

#[derive(Debug, Clone)]
struct Task {
    coordinator: String,
    task_type: TaskType,
    reward: u64,
    bidding_closes_at: f64,
    deadline: f64,
    bids: Vec<(String, u64)>,
    assigned_to: Option<String>,
}

// ============================================================================
// ORACLE
// ============================================================================

/// The synthetic swarm.
pub struct SwarmOracle {
    config: SimConfig,
    rng: ChaCha8Rng,
    shuffle_rng: ChaCha8Rng,
    shuffle_roster: bool,

    /// Seconds since simulation start
    time: f64,

    agents: Vec<SimAgent>,
    tasks: BTreeMap<u64, Task>,
    history: VecDeque<TransactionRecord>,
    next_task_id: u64,
    next_coordinator: usize,
    next_solver: usize,
    last_timestamp: f64,
}

impl SwarmOracle {
    /// Creates the initial swarm described by `config`.
    pub fn new(config: SimConfig) -> Self {
        let mut oracle = Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            shuffle_rng: ChaCha8Rng::seed_from_u64(config.seed ^ SHUFFLE_SALT),
            shuffle_roster: false,
            time: 0.0,
            agents: Vec::new(),
            tasks: BTreeMap::new(),
            history: VecDeque::new(),
            next_task_id: 0,
            next_coordinator: 0,
            next_solver: 0,
            last_timestamp: 0.0,
            config,
        };

        for _ in 0..oracle.config.coordinators {
            oracle.add_agent(Role::Coordinator);
        }
        let solvers = oracle.config.solvers;
        for i in 0..solvers {
            let id = oracle.add_agent(Role::Solver);
            // Skills spread evenly over 0.5..=1.5
            let skill = 0.5 + i as f64 / (solvers.saturating_sub(1)).max(1) as f64;
            if let Some(agent) = oracle.agents.iter_mut().find(|a| a.id == id) {
                agent.skill = skill;
            }
        }
        oracle
    }

    /// Emits the roster groups in a fresh random order on every snapshot.
    pub fn with_shuffled_roster(mut self, shuffle: bool) -> Self {
        self.shuffle_roster = shuffle;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Seconds since simulation start.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Backend wall-clock time of the current instant.
    pub fn unix_time(&self) -> f64 {
        EPOCH_SECS + self.time
    }

    pub fn agent_ids(&self, role: Role) -> Vec<String> {
        self.agents
            .iter()
            .filter(|a| a.role == role)
            .map(|a| a.id.clone())
            .collect()
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.iter().any(|a| a.id == agent_id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn open_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn history(&self) -> &VecDeque<TransactionRecord> {
        &self.history
    }

    /// Joins a new agent and returns its identifier.
    pub fn add_agent(&mut self, role: Role) -> String {
        let id = match role {
            Role::Coordinator => {
                self.next_coordinator += 1;
                format!("coordinator_{}", self.next_coordinator - 1)
            }
            Role::Solver => {
                self.next_solver += 1;
                format!("solver_{}", self.next_solver - 1)
            }
        };
        let address = format!("kaspatest:qq{:040x}", self.rng.gen::<u128>());
        let mut agent = SimAgent::new(id.clone(), role, address);

        match role {
            Role::Coordinator => {
                let (lo, hi) = self.config.task_interval_secs;
                agent.next_announce_at = self.time + self.rng.gen_range(lo..=hi.max(lo));
            }
            Role::Solver => {
                agent.skill = self.rng.gen_range(0.5..=1.5);
                agent.specialization = TaskType::ALL.choose(&mut self.rng).copied();
            }
        }

        self.agents.push(agent);
        id
    }

    /// Terminates an agent. Returns `false` when no such agent exists.
    pub fn remove_agent(&mut self, agent_id: &str) -> bool {
        let Some(index) = self.agents.iter().position(|a| a.id == agent_id) else {
            return false;
        };
        let removed = self.agents.remove(index);

        match removed.role {
            Role::Coordinator => {
                let orphaned: Vec<u64> = self
                    .tasks
                    .iter()
                    .filter(|(_, t)| t.coordinator == removed.id)
                    .map(|(id, _)| *id)
                    .collect();
                for task_id in orphaned {
                    self.discard_task(task_id);
                }
            }
            Role::Solver => {
                for task in self.tasks.values_mut() {
                    task.bids.retain(|(solver, _)| *solver != removed.id);
                    if task.assigned_to.as_deref() == Some(removed.id.as_str()) {
                        task.assigned_to = None;
                    }
                }
            }
        }
        true
    }

    /// Advances the market by `dt`.
    pub fn step(&mut self, dt: Duration) {
        self.time += dt.as_secs_f64();

        let due: Vec<usize> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.role == Role::Coordinator && a.next_announce_at <= self.time)
            .map(|(i, _)| i)
            .collect();
        for index in due {
            self.announce_from(index);
        }

        self.close_bidding();
        self.finish_work();
        self.expire_tasks();
    }

    /// Makes a random coordinator announce a task right now.
    pub fn force_announcement(&mut self) -> Option<u64> {
        let coordinators: Vec<usize> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.role == Role::Coordinator)
            .map(|(i, _)| i)
            .collect();
        let index = *coordinators.choose(&mut self.rng)?;
        Some(self.announce_from(index))
    }

    fn announce_from(&mut self, index: usize) -> u64 {
        let task_type = *TaskType::ALL
            .choose(&mut self.rng)
            .unwrap_or(&TaskType::PrimeFinding);
        let (lo, hi) = task_type.reward_range();
        let reward = self.rng.gen_range(lo..=hi);
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let (interval_lo, interval_hi) = self.config.task_interval_secs;
        let wait = self.rng.gen_range(interval_lo..=interval_hi.max(interval_lo));
        let coordinator = &mut self.agents[index];
        coordinator.active_tasks.push(task_id);
        coordinator.next_announce_at = self.time + wait;
        let coordinator_id = coordinator.id.clone();

        self.tasks.insert(
            task_id,
            Task {
                coordinator: coordinator_id.clone(),
                task_type,
                reward,
                bidding_closes_at: self.time + self.config.bid_window_secs,
                deadline: self.time + self.config.task_deadline_secs,
                bids: Vec::new(),
                assigned_to: None,
            },
        );
        self.record(&coordinator_id, MessageCode::Announcement, task_id, Some(task_type), None, None);

        // Announcements reach every solver
        for i in 0..self.agents.len() {
            if self.agents[i].role != Role::Solver {
                continue;
            }
            let skill = self.agents[i].skill;
            if (reward as f64) <= BID_THRESHOLD / skill {
                continue;
            }
            let jitter: f64 = self.rng.gen_range(0.8..=1.2);
            let amount = (reward as f64 * BID_FACTOR * skill * jitter) as u64;

            let solver = &mut self.agents[i];
            solver.total_bids += 1;
            solver.active_tasks.push(task_id);
            let solver_id = solver.id.clone();

            if let Some(task) = self.tasks.get_mut(&task_id) {
                task.bids.push((solver_id.clone(), amount));
            }
            self.record(&solver_id, MessageCode::Bid, task_id, None, None, Some(amount));
        }
        task_id
    }

    fn close_bidding(&mut self) {
        let closing: Vec<u64> = self
            .tasks
            .iter()
            .filter(|(_, t)| {
                t.assigned_to.is_none() && t.bidding_closes_at <= self.time && !t.bids.is_empty()
            })
            .map(|(id, _)| *id)
            .collect();

        for task_id in closing {
            let Some(task) = self.tasks.get_mut(&task_id) else {
                continue;
            };
            let Some((winner, _)) = task.bids.iter().min_by_key(|(_, amount)| *amount).cloned()
            else {
                continue;
            };
            task.assigned_to = Some(winner.clone());
            let coordinator = task.coordinator.clone();
            let task_type = task.task_type;
            let losers: Vec<String> = task
                .bids
                .iter()
                .map(|(solver, _)| solver.clone())
                .filter(|solver| *solver != winner)
                .collect();

            for agent in self.agents.iter_mut() {
                if losers.contains(&agent.id) {
                    agent.drop_task(task_id);
                }
            }

            let base: f64 = self.rng.gen_range(0.5..=1.5);
            let latency: f64 = self.rng.gen_range(0.0..=2.0);
            if let Some(solver) = self.agents.iter_mut().find(|a| a.id == winner) {
                let speed = if solver.specialization == Some(task_type) { 0.5 } else { 1.0 };
                let ready_at = self.time + latency + base / solver.skill * speed;
                if !solver.active_tasks.contains(&task_id) {
                    solver.active_tasks.push(task_id);
                }
                solver.work.push((task_id, ready_at));
            }
            self.record(&coordinator, MessageCode::Assignment, task_id, None, Some(winner), None);
        }
    }

    fn finish_work(&mut self) {
        let mut finished: Vec<(usize, u64)> = Vec::new();
        for (index, agent) in self.agents.iter().enumerate() {
            for (task_id, ready_at) in &agent.work {
                if *ready_at <= self.time {
                    finished.push((index, *task_id));
                }
            }
        }

        for (index, task_id) in finished {
            let Some(task) = self.tasks.remove(&task_id) else {
                self.agents[index].drop_task(task_id);
                continue;
            };
            let solver = &mut self.agents[index];
            solver.drop_task(task_id);
            solver.completed_tasks += 1;
            solver.successful_bids += 1;
            solver.reputation = (solver.reputation + REPUTATION_GAIN).min(MAX_REPUTATION);
            let accepted = task
                .assigned_to
                .as_deref()
                .map_or(true, |assignee| assignee == solver.id);
            if accepted {
                solver.balance += task.reward;
            }
            let solver_id = solver.id.clone();

            if let Some(coordinator) = self.agents.iter_mut().find(|a| a.id == task.coordinator) {
                coordinator.drop_task(task_id);
                coordinator.completed_tasks += 1;
            }
            self.record(&solver_id, MessageCode::Solution, task_id, None, None, None);
        }
    }

    fn expire_tasks(&mut self) {
        let expired: Vec<u64> = self
            .tasks
            .iter()
            .filter(|(_, t)| t.deadline <= self.time)
            .map(|(id, _)| *id)
            .collect();
        for task_id in expired {
            self.discard_task(task_id);
        }
    }

    fn discard_task(&mut self, task_id: u64) {
        self.tasks.remove(&task_id);
        for agent in self.agents.iter_mut() {
            agent.drop_task(task_id);
        }
    }

    fn record(
        &mut self,
        from: &str,
        code: MessageCode,
        task_id: u64,
        task_type: Option<TaskType>,
        to: Option<String>,
        amount: Option<u64>,
    ) {
        let timestamp = self.unix_time().max(self.last_timestamp + TIMESTAMP_STEP);
        self.last_timestamp = timestamp;
        let from_address = self
            .agents
            .iter()
            .find(|a| a.id == from)
            .map(|a| a.address.clone())
            .unwrap_or_default();

        self.history.push_back(TransactionRecord {
            timestamp,
            from: from.to_owned(),
            from_address,
            code,
            task_id,
            task_type,
            to,
            amount,
        });
        while self.history.len() > self.config.history_len {
            self.history.pop_front();
        }
    }

    /// The current state as the backend's `data` payload.
    pub fn payload(&mut self) -> Value {
        let mut coordinators: Vec<Value> = Vec::new();
        let mut solvers: Vec<Value> = Vec::new();
        for agent in &self.agents {
            match agent.role {
                Role::Coordinator => coordinators.push(agent.to_wire()),
                Role::Solver => solvers.push(agent.to_wire()),
            }
        }
        if self.shuffle_roster {
            coordinators.shuffle(&mut self.shuffle_rng);
            solvers.shuffle(&mut self.shuffle_rng);
        }

        let numeric = self.config.numeric_msg_types;
        let transactions: Vec<Value> = self.history.iter().map(|t| t.to_wire(numeric)).collect();
        let completed: u64 = self.agents.iter().map(|a| a.completed_tasks).sum();
        let active: usize = self.agents.iter().map(|a| a.active_tasks.len()).sum();

        json!({
            "timestamp": self.unix_time(),
            "total_agents": self.agents.len(),
            "coordinators_count": coordinators.len(),
            "solvers_count": solvers.len(),
            "active_tasks": active,
            "completed_tasks": completed,
            "mode": "mock",
            "transactions": transactions,
            "agents": {
                "coordinators": coordinators,
                "solvers": solvers,
            },
        })
    }

    /// One `swarm_update` frame.
    pub fn snapshot_bytes(&mut self) -> Result<Vec<u8>, serde_json::Error> {
        let data = self.payload();
        serde_json::to_vec(&json!({ "type": "swarm_update", "data": data }))
    }

    /// The frame sent to a freshly connected client.
    pub fn initial_state_bytes(&mut self) -> Result<Vec<u8>, serde_json::Error> {
        let data = self.payload();
        serde_json::to_vec(&json!({ "type": "initial_state", "data": data }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use swarmview_core::{decode, Delivery, MessageKind};

    fn run(oracle: &mut SwarmOracle, secs: u64) {
        for _ in 0..secs * 10 {
            oracle.step(Duration::from_millis(100));
        }
    }

    fn long_history() -> SimConfig {
        SimConfig {
            history_len: 10_000,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_initial_roster() {
        let oracle = SwarmOracle::new(SimConfig::default());
        assert_eq!(oracle.agent_ids(Role::Coordinator), vec!["coordinator_0", "coordinator_1"]);
        assert_eq!(oracle.agent_ids(Role::Solver).len(), 6);
        assert_eq!(oracle.agents[2].skill, 0.5);
        assert_eq!(oracle.agents[7].skill, 1.5);
    }

    #[test]
    fn test_same_seed_same_frames() {
        let mut a = SwarmOracle::new(SimConfig::default());
        let mut b = SwarmOracle::new(SimConfig::default());
        run(&mut a, 60);
        run(&mut b, 60);
        assert_eq!(a.snapshot_bytes().unwrap(), b.snapshot_bytes().unwrap());

        let mut c = SwarmOracle::new(SimConfig::default().with_seed(7));
        run(&mut c, 60);
        assert_ne!(a.snapshot_bytes().unwrap(), c.snapshot_bytes().unwrap());
    }

    #[test]
    fn test_frames_decode() {
        let mut oracle = SwarmOracle::new(SimConfig::default());
        run(&mut oracle, 30);
        let bytes = oracle.snapshot_bytes().unwrap();
        let Delivery::Snapshot(snapshot) = decode(&bytes).unwrap() else {
            panic!("expected a snapshot");
        };
        assert_eq!(snapshot.roster.coordinators.len(), 2);
        assert_eq!(snapshot.roster.solvers.len(), 6);
        assert_eq!(snapshot.transactions.len(), oracle.history().len());
        assert!(snapshot
            .transactions
            .iter()
            .any(|t| t.kind == MessageKind::TaskAnnouncement));
        assert!(snapshot.roster.solvers.iter().all(|s| s.skill_level.is_some()));
    }

    #[test]
    fn test_named_msg_types_decode() {
        let config = SimConfig {
            numeric_msg_types: false,
            ..SimConfig::default()
        };
        let mut oracle = SwarmOracle::new(config);
        run(&mut oracle, 30);
        let Delivery::Snapshot(snapshot) = decode(&oracle.initial_state_bytes().unwrap()).unwrap()
        else {
            panic!("expected a snapshot");
        };
        assert!(snapshot
            .transactions
            .iter()
            .any(|t| t.kind == MessageKind::TaskBid));
    }

    #[test]
    fn test_history_bounded_and_increasing() {
        let mut oracle = SwarmOracle::new(SimConfig::default());
        run(&mut oracle, 300);
        assert_eq!(oracle.history().len(), 30);
        let stamps: Vec<f64> = oracle.history().iter().map(|t| t.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_lowest_bid_wins() {
        let mut oracle = SwarmOracle::new(long_history());
        run(&mut oracle, 120);

        let assignments: Vec<&TransactionRecord> = oracle
            .history()
            .iter()
            .filter(|t| t.code == MessageCode::Assignment)
            .collect();
        assert!(!assignments.is_empty());

        for assignment in assignments {
            let lowest = oracle
                .history()
                .iter()
                .filter(|t| t.code == MessageCode::Bid && t.task_id == assignment.task_id)
                .min_by_key(|t| t.amount)
                .map(|t| t.from.clone());
            assert_eq!(assignment.to, lowest);
        }
    }

    #[test]
    fn test_solutions_raise_reputation() {
        let mut oracle = SwarmOracle::new(long_history());
        run(&mut oracle, 300);

        let solved = oracle
            .history()
            .iter()
            .filter(|t| t.code == MessageCode::Solution)
            .count();
        assert!(solved > 0);
        for agent in oracle.agents.iter().filter(|a| a.role == Role::Solver) {
            let expected = (INITIAL_REPUTATION + REPUTATION_GAIN * agent.completed_tasks as f64)
                .min(MAX_REPUTATION);
            assert!((agent.reputation - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_add_and_remove_agents() {
        let mut oracle = SwarmOracle::new(SimConfig::default());
        let id = oracle.add_agent(Role::Solver);
        assert_eq!(id, "solver_6");
        assert!(oracle.contains(&id));

        run(&mut oracle, 40);
        assert!(oracle.remove_agent("coordinator_0"));
        assert!(!oracle.remove_agent("coordinator_0"));
        assert!(oracle
            .tasks
            .values()
            .all(|t| t.coordinator != "coordinator_0"));

        // Identifiers are never reused
        assert_eq!(oracle.add_agent(Role::Coordinator), "coordinator_2");
    }

    #[test]
    fn test_shuffled_roster_keeps_members() {
        let mut oracle = SwarmOracle::new(SimConfig::default()).with_shuffled_roster(true);
        let mut orders = std::collections::HashSet::new();
        for _ in 0..10 {
            let payload = oracle.payload();
            let ids: Vec<String> = payload["agents"]["solvers"]
                .as_array()
                .unwrap()
                .iter()
                .map(|s| s["agent_id"].as_str().unwrap().to_owned())
                .collect();
            let mut sorted = ids.clone();
            sorted.sort();
            assert_eq!(sorted.len(), 6);
            orders.insert(ids);
        }
        assert!(orders.len() > 1);
    }

    proptest! {
        #[test]
        fn prop_every_snapshot_decodes(seed in any::<u64>(), secs in 1u64..40) {
            let mut oracle = SwarmOracle::new(SimConfig::default().with_seed(seed));
            run(&mut oracle, secs);

            let bytes = oracle.snapshot_bytes().unwrap();
            let Ok(Delivery::Snapshot(snapshot)) = decode(&bytes) else {
                panic!("oracle frame failed to decode");
            };
            prop_assert_eq!(snapshot.roster.len(), oracle.agent_count());
            prop_assert!(snapshot
                .transactions
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp));
        }
    }
}
