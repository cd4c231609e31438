//! Configuration structures for the simulation, auction and training loops
//!
//! Every component takes an explicit, immutable configuration value at
//! construction. Fatal misconfiguration is rejected by [`SimConfig::validate`]
//! before any component is built.

use anyhow::Context;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::Path;

use crate::error::{Error, Result};

/// Environment shape: node/device counts and the arrival process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Number of edge nodes (agents)
    pub num_nodes: usize,
    /// Number of task-submitting devices
    pub num_devices: usize,
    /// Poisson arrival intensity, tasks per round
    pub arrival_rate: f64,
    /// Episode horizon in rounds
    pub max_steps_per_episode: usize,
    /// RNG seed for the arrival process and device importance draws
    pub seed: Option<u64>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            num_nodes: 4,
            num_devices: 100,
            arrival_rate: 2.5,
            max_steps_per_episode: 500,
            seed: None,
        }
    }
}

impl EnvConfig {
    pub fn with_nodes(mut self, num_nodes: usize) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn with_devices(mut self, num_devices: usize) -> Self {
        self.num_devices = num_devices;
        self
    }

    pub fn with_arrival_rate(mut self, arrival_rate: f64) -> Self {
        self.arrival_rate = arrival_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Per-node resource capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// CPU cycles available per node
    pub cpu_capacity: u32,
    /// Memory available per node (MB)
    pub memory_capacity: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cpu_capacity: 1000,
            memory_capacity: 4096,
        }
    }
}

/// Stochastic task generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskGenConfig {
    pub cpu_range: (u32, u32),
    pub memory_range: (u32, u32),
    pub importance_range: (f64, f64),
    /// Deadline assigned to every generated task, in rounds
    pub deadline: u64,
}

impl Default for TaskGenConfig {
    fn default() -> Self {
        Self {
            cpu_range: (10, 100),
            memory_range: (32, 512),
            importance_range: (0.5, 1.0),
            deadline: 5000,
        }
    }
}

/// Auction-side knobs: bid cost model and payment scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionConfig {
    pub enabled: bool,
    /// Weight of estimated processing time in the cost matrix
    pub time_cost_weight: f64,
    /// Weight of current node load in the cost matrix
    pub load_cost_weight: f64,
    /// Scaling applied to payments credited to devices
    pub payment_scaling: f64,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_cost_weight: 0.1,
            load_cost_weight: 0.5,
            payment_scaling: 1.0,
        }
    }
}

/// Reward shaping weights and fairness thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Local penalty when a task is rejected
    pub rejection_penalty: f64,
    /// Weight of processing time in the local reward
    pub time_penalty_weight: f64,
    /// Weight of consumed energy in the local reward
    pub energy_penalty_weight: f64,
    /// Energy consumed per required CPU cycle
    pub energy_per_cpu: f64,
    /// Jain index below which the team reward is penalized
    pub fairness_target: f64,
    pub fairness_penalty_scale: f64,
    /// Gini coefficient above which the team reward is penalized
    pub gini_target: f64,
    pub gini_penalty_scale: f64,
    /// Blend weight of normalized payments into local rewards
    pub vcg_weight: f64,
    /// Guard for the empty-positive-payment-set case
    pub payment_epsilon: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            rejection_penalty: -0.5,
            time_penalty_weight: 0.1,
            energy_penalty_weight: 0.05,
            energy_per_cpu: 0.01,
            fairness_target: 0.85,
            fairness_penalty_scale: 10.0,
            gini_target: 0.3,
            gini_penalty_scale: 5.0,
            vcg_weight: 0.5,
            payment_epsilon: 1e-8,
        }
    }
}

/// Training-loop hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub learning_rate: f64,
    /// Discount factor
    pub gamma: f64,
    pub batch_size: usize,
    pub buffer_size: usize,
    /// Hard-sync target parameters every N training steps
    pub target_update_freq: u64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    pub epsilon_decay: f64,
    /// Per-agent observation length
    pub obs_size: usize,
    /// Recurrent feature width
    pub hidden_size: usize,
    /// RNG seed for exploration, sampling and weight initialization
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            gamma: 0.99,
            batch_size: 32,
            buffer_size: 10_000,
            target_update_freq: 100,
            epsilon_start: 1.0,
            epsilon_end: 0.05,
            epsilon_decay: 0.995,
            obs_size: 8,
            hidden_size: 64,
            seed: None,
        }
    }
}

impl TrainConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_target_update_freq(mut self, freq: u64) -> Self {
        self.target_update_freq = freq;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Aggregated configuration passed to the simulation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    pub env: EnvConfig,
    pub node: NodeConfig,
    pub task_gen: TaskGenConfig,
    pub auction: AuctionConfig,
    pub reward: RewardConfig,
    pub train: TrainConfig,
}

impl SimConfig {
    /// Reject malformed configuration before any component is built
    pub fn validate(&self) -> Result<()> {
        if self.env.num_nodes == 0 {
            return Err(Error::InvalidConfig("num_nodes must be positive".into()));
        }
        if self.env.num_devices == 0 {
            return Err(Error::InvalidConfig("num_devices must be positive".into()));
        }
        if self.env.arrival_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "arrival_rate must be positive, got {}",
                self.env.arrival_rate
            )));
        }
        if self.node.cpu_capacity == 0 || self.node.memory_capacity == 0 {
            return Err(Error::InvalidConfig(
                "node capacities must be positive".into(),
            ));
        }
        if self.task_gen.cpu_range.0 == 0 || self.task_gen.cpu_range.0 > self.task_gen.cpu_range.1 {
            return Err(Error::InvalidConfig(format!(
                "invalid cpu_range {:?}",
                self.task_gen.cpu_range
            )));
        }
        if self.task_gen.memory_range.0 == 0
            || self.task_gen.memory_range.0 > self.task_gen.memory_range.1
        {
            return Err(Error::InvalidConfig(format!(
                "invalid memory_range {:?}",
                self.task_gen.memory_range
            )));
        }
        if !(0.0..=1.0).contains(&self.train.gamma) {
            return Err(Error::InvalidConfig(format!(
                "gamma must be in [0, 1], got {}",
                self.train.gamma
            )));
        }
        if self.train.batch_size == 0 || self.train.buffer_size < self.train.batch_size {
            return Err(Error::InvalidConfig(
                "buffer_size must be at least batch_size".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.train.epsilon_end)
            || self.train.epsilon_start < self.train.epsilon_end
            || !(0.0..=1.0).contains(&self.train.epsilon_decay)
        {
            return Err(Error::InvalidConfig(
                "epsilon schedule must satisfy 0 <= end <= start and decay in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        load_json(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        save_json(self, path)
    }
}

pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let value = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse config json {}", path.display()))?;
    Ok(value)
}

pub fn save_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value).context("failed to serialize config")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_fatal() {
        let mut cfg = SimConfig::default();
        cfg.node.cpu_capacity = 0;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn buffer_smaller_than_batch_is_fatal() {
        let mut cfg = SimConfig::default();
        cfg.train = cfg.train.with_batch_size(64).with_buffer_size(32);
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn builder_methods_compose() {
        let env = EnvConfig::default()
            .with_nodes(3)
            .with_devices(5)
            .with_seed(7);
        assert_eq!(env.num_nodes, 3);
        assert_eq!(env.num_devices, 5);
        assert_eq!(env.seed, Some(7));
    }
}
