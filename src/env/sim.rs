//! Discrete-event edge simulation: arrivals, auction rounds, admission,
//! completions and per-round records

use crate::auction::{Demand, VcgAuction, capacity_filter};
use crate::config::SimConfig;
use crate::env::device::Device;
use crate::env::generator::{TaskGenerator, device_importances};
use crate::env::node::ResourceLedger;
use crate::error::{Error, Result};
use crate::metrics::{avg_latency, gini_coefficient, jain_fairness_index};
use crate::rewards::RewardShaper;
use crate::types::{DeviceId, NodeId, Priority, Task, TaskId};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info};

/// Per-node admission gate chosen by that node's agent each round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeAction {
    /// Admit any feasible task
    Accept,
    /// Admit nothing this round
    Reject,
    /// Admit only high-priority tasks
    HighPriorityOnly,
    /// Admit only low- and medium-priority tasks
    LowPriorityOnly,
}

impl NodeAction {
    pub const COUNT: usize = 4;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(NodeAction::Accept),
            1 => Some(NodeAction::Reject),
            2 => Some(NodeAction::HighPriorityOnly),
            3 => Some(NodeAction::LowPriorityOnly),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            NodeAction::Accept => 0,
            NodeAction::Reject => 1,
            NodeAction::HighPriorityOnly => 2,
            NodeAction::LowPriorityOnly => 3,
        }
    }

    fn admits(&self, priority: Priority) -> bool {
        match self {
            NodeAction::Accept => true,
            NodeAction::Reject => false,
            NodeAction::HighPriorityOnly => priority == Priority::High,
            NodeAction::LowPriorityOnly => priority != Priority::High,
        }
    }
}

/// Read-only view of the network state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: u64,
    pub pending_tasks: usize,
    pub node_loads: Vec<f64>,
    /// (cpu, memory) still available per node
    pub available_resources: Vec<(u32, u32)>,
}

/// What one environment step produced
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub next_state: Snapshot,
    /// One shaped reward per node agent
    pub rewards: Vec<f64>,
    /// Latencies of tasks completed this round
    pub latencies: Vec<f64>,
    pub accepted: usize,
    pub rejected: usize,
}

/// Flat per-round record consumed by external persistence collaborators;
/// the schema is stable, the storage format is theirs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub time: u64,
    pub accepted: usize,
    pub rejected: usize,
    pub avg_latency: f64,
    pub social_welfare: f64,
    pub gini_payment: f64,
    pub fairness_index: f64,
    pub node_loads: Vec<f64>,
}

/// The edge network simulation
///
/// One logical thread of control: arrivals, the auction round, admission,
/// completions and reward shaping run synchronously per step, and all
/// capacity mutations of a round settle before the next round's arrivals.
/// Node failure and recovery are only observable at round boundaries.
pub struct EdgeSim {
    config: SimConfig,
    ledger: ResourceLedger,
    devices: Vec<Device>,
    generator: TaskGenerator,
    auction: VcgAuction,
    shaper: RewardShaper,
    time: u64,
    pending: VecDeque<Task>,
    /// Accepted tasks still executing: task -> owning device
    executing: HashMap<TaskId, DeviceId>,
    history: Vec<RoundRecord>,
    last_accept_rate: f64,
}

/// Length of the per-agent observation vector
pub const OBS_SIZE: usize = 8;

impl EdgeSim {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let ledger = ResourceLedger::new(config.env.num_nodes, &config.node)?;
        let importances = device_importances(config.env.num_devices, config.env.seed);
        let devices = importances
            .into_iter()
            .enumerate()
            .map(|(i, w)| Device::new(DeviceId(i), w))
            .collect();
        let generator = TaskGenerator::new(
            config.task_gen.clone(),
            config.env.num_devices,
            config.env.arrival_rate,
            config.env.seed,
        )?;
        let auction = VcgAuction::new(config.env.num_devices, config.env.num_nodes)?;
        let shaper = RewardShaper::new(config.reward.clone());
        info!(
            nodes = config.env.num_nodes,
            devices = config.env.num_devices,
            arrival_rate = config.env.arrival_rate,
            "edge simulation initialized"
        );
        Ok(Self {
            config,
            ledger,
            devices,
            generator,
            auction,
            shaper,
            time: 0,
            pending: VecDeque::new(),
            executing: HashMap::new(),
            history: Vec::new(),
            last_accept_rate: 0.0,
        })
    }

    /// Reset mutable round state, keeping devices and auction history
    pub fn reset(&mut self) -> Result<Snapshot> {
        self.ledger = ResourceLedger::new(self.config.env.num_nodes, &self.config.node)?;
        self.time = 0;
        self.pending.clear();
        self.executing.clear();
        self.last_accept_rate = 0.0;
        Ok(self.get_state())
    }

    pub fn get_state(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            pending_tasks: self.pending.len(),
            node_loads: self.ledger.loads(),
            available_resources: self
                .ledger
                .nodes()
                .iter()
                .map(|n| (n.cpu_available(), n.memory_available()))
                .collect(),
        }
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn auction(&self) -> &VcgAuction {
        &self.auction
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn num_agents(&self) -> usize {
        self.config.env.num_nodes
    }

    pub fn fail_node(&mut self, id: NodeId) -> Result<()> {
        self.ledger.fail_node(id)
    }

    pub fn recover_node(&mut self, id: NodeId) -> Result<()> {
        self.ledger.recover_node(id)
    }

    /// Per-agent observations for the current state
    pub fn observations(&self) -> Vec<Vec<f64>> {
        let loads = self.ledger.loads();
        let n = loads.len();
        let pending_norm =
            (self.pending.len() as f64 / self.config.env.num_devices as f64).min(1.0);
        let time_norm = (self.time % self.config.env.max_steps_per_episode as u64) as f64
            / self.config.env.max_steps_per_episode as f64;
        self.ledger
            .nodes()
            .iter()
            .enumerate()
            .map(|(j, node)| {
                let other_load = if n > 1 {
                    (loads.iter().sum::<f64>() - loads[j]) / (n as f64 - 1.0)
                } else {
                    0.0
                };
                vec![
                    loads[j],
                    node.cpu_available() as f64 / node.cpu_capacity() as f64,
                    node.memory_available() as f64 / self.config.node.memory_capacity as f64,
                    if node.is_active() { 1.0 } else { 0.0 },
                    pending_norm,
                    other_load,
                    self.last_accept_rate,
                    time_norm,
                ]
            })
            .collect()
    }

    /// Advance the simulation one round under the given joint action
    pub fn step(&mut self, joint_action: &[NodeAction]) -> Result<StepOutcome> {
        if joint_action.len() != self.config.env.num_nodes {
            return Err(Error::ValidationError(format!(
                "expected {} actions, got {}",
                self.config.env.num_nodes,
                joint_action.len()
            )));
        }
        self.time += 1;
        let now = self.time;

        // Arrivals; expired backlog drops out as rejected.
        for task in self.generator.generate(now) {
            self.devices[task.device.0].submit(task.clone());
            self.pending.push_back(task);
        }
        let mut rejected = 0usize;
        let expired: Vec<Task> = self
            .pending
            .iter()
            .filter(|t| t.is_expired(now))
            .cloned()
            .collect();
        self.pending.retain(|t| !t.is_expired(now));
        for task in expired {
            self.devices[task.device.0].task_rejected(task);
            rejected += 1;
        }

        // At most one bidding task per device per round; the rest of the
        // backlog waits.
        let m = self.config.env.num_devices;
        let n = self.config.env.num_nodes;
        let mut bidders: Vec<Option<Task>> = vec![None; m];
        let mut waiting = VecDeque::new();
        while let Some(task) = self.pending.pop_front() {
            let slot = &mut bidders[task.device.0];
            if slot.is_none() {
                *slot = Some(task);
            } else {
                waiting.push_back(task);
            }
        }
        self.pending = waiting;

        // Valuation and cost matrices for this round's auction.
        let mut valuations = Array2::<f64>::zeros((m, n));
        let mut costs = Array2::<f64>::zeros((m, n));
        let loads = self.ledger.loads();
        for (i, slot) in bidders.iter().enumerate() {
            let Some(task) = slot else { continue };
            for (j, node) in self.ledger.nodes().iter().enumerate() {
                valuations[[i, j]] = task.value();
                costs[[i, j]] = if node.is_active() {
                    self.config.auction.time_cost_weight
                        * task.processing_time(node.cpu_capacity())
                        + self.config.auction.load_cost_weight * loads[j]
                } else {
                    // Finite deterrent margin; an inactive node never wins
                    // the argmax and the payment matrices stay NaN-free.
                    task.value() + 1.0
                };
            }
        }

        // Unconstrained auction round: allocation, payments, welfare.
        let round = self.auction.run_auction(&valuations, &costs, now)?;

        // Feasibility: capacity post-pass, then the per-node action gate.
        let demands: Vec<Demand> = bidders
            .iter()
            .map(|slot| match slot {
                Some(task) => Demand {
                    cpu: task.cpu_required,
                    memory: task.memory_required,
                },
                None => Demand::default(),
            })
            .collect();
        let feasible = capacity_filter(
            &round.allocation,
            &valuations,
            &costs,
            &demands,
            &self.ledger.residuals(),
        )?;

        let mut accepted = 0usize;
        let mut local_rewards = vec![0.0; n];
        for (i, slot) in bidders.iter().enumerate() {
            let Some(task) = slot else { continue };
            let raw_target = (0..n).find(|j| round.allocation[[i, *j]] > 0.0);
            let feasible_target = (0..n).find(|j| feasible[[i, *j]] > 0.0);

            let mut admitted = None;
            if let Some(j) = feasible_target
                && joint_action[j].admits(task.priority)
                && self.ledger.try_admit(NodeId(j), task)?
            {
                admitted = Some(j);
            }

            if let Some(j) = admitted {
                let node_cpu = self.ledger.node(NodeId(j))?.cpu_capacity();
                accepted += 1;
                self.executing.insert(task.id, task.device);
                local_rewards[j] += self.shaper.local_reward(
                    true,
                    task.value(),
                    task.processing_time(node_cpu),
                    self.shaper.energy_used(task.cpu_required),
                );
            } else {
                rejected += 1;
                self.devices[task.device.0].task_rejected(task.clone());
                // Charge the rejection to the node the raw allocation
                // wanted; auction-level rejections have no culprit.
                if let Some(j) = raw_target {
                    local_rewards[j] += self.shaper.local_reward(false, 0.0, 0.0, 0.0);
                }
            }
        }

        // Credit payments to devices.
        if self.config.auction.enabled {
            for (i, device) in self.devices.iter_mut().enumerate() {
                let p = round.payments[i];
                if p != 0.0 {
                    device.receive_payment(p * self.config.auction.payment_scaling);
                }
            }
        }

        // Advance executing tasks, release capacity, record completions.
        let mut latencies = Vec::new();
        for (_node, completion) in self.ledger.step(now) {
            if let Some(device) = self.executing.remove(&completion.task_id) {
                latencies.push(completion.latency);
                let done = self.devices[device.0]
                    .submitted
                    .iter()
                    .find(|t| t.id == completion.task_id)
                    .cloned();
                if let Some(task) = done {
                    self.devices[device.0].task_completed(task);
                }
            }
        }

        // Fairness and shaped rewards.
        let positive_payments: Vec<f64> = round
            .payments
            .iter()
            .copied()
            .filter(|p| *p > 0.0)
            .collect();
        let gini = gini_coefficient(&positive_payments);
        let shares: Vec<f64> = (0..m).map(|i| round.allocation.row(i).sum()).collect();
        let fairness = jain_fairness_index(&shares);
        let team = self
            .shaper
            .team_reward(round.social_welfare, fairness, gini);

        // Per-node payment aggregates feed the VCG blend.
        let mut node_payments = vec![0.0; n];
        for i in 0..m {
            for (j, node_payment) in node_payments.iter_mut().enumerate() {
                if round.allocation[[i, j]] > 0.0 {
                    *node_payment += round.payments[i];
                }
            }
        }
        if self.config.auction.enabled {
            self.shaper
                .integrate_payments(&mut local_rewards, &node_payments);
        }
        let rewards: Vec<f64> = local_rewards
            .iter()
            .map(|r| r + team / n as f64)
            .collect();

        let attempted = accepted + rejected;
        self.last_accept_rate = if attempted > 0 {
            accepted as f64 / attempted as f64
        } else {
            0.0
        };

        let record = RoundRecord {
            time: now,
            accepted,
            rejected,
            avg_latency: avg_latency(&latencies),
            social_welfare: round.social_welfare,
            gini_payment: gini,
            fairness_index: fairness,
            node_loads: self.ledger.loads(),
        };
        debug!(
            time = now,
            accepted,
            rejected,
            social_welfare = record.social_welfare,
            "round complete"
        );
        self.history.push(record);

        Ok(StepOutcome {
            next_state: self.get_state(),
            rewards,
            latencies,
            accepted,
            rejected,
        })
    }
}
