//! Edge nodes and the per-round resource ledger

use crate::auction::Residual;
use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::types::{NodeId, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A task currently executing on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InFlight {
    remaining: f64,
    cpu: u32,
    memory: u32,
    arrival_time: u64,
}

/// A finished task reported by [`EdgeNode::step`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Completion {
    pub task_id: TaskId,
    /// Rounds elapsed since the task arrived in the system
    pub latency: f64,
}

/// One edge node: fixed capacities, a used-resource vector and the set of
/// in-flight tasks
///
/// Nodes live in a fixed-size arena; failure flips `active` instead of
/// removing the slot, so matrix dimensions stay stable across failure
/// events. Invariant: used <= capacity on every dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeNode {
    pub id: NodeId,
    cpu_capacity: u32,
    memory_capacity: u32,
    cpu_used: u32,
    memory_used: u32,
    in_flight: HashMap<TaskId, InFlight>,
    active: bool,
}

impl EdgeNode {
    pub fn new(id: NodeId, config: &NodeConfig) -> Result<Self> {
        if config.cpu_capacity == 0 || config.memory_capacity == 0 {
            return Err(Error::InvalidConfig(format!(
                "node {id} capacities must be positive"
            )));
        }
        Ok(Self {
            id,
            cpu_capacity: config.cpu_capacity,
            memory_capacity: config.memory_capacity,
            cpu_used: 0,
            memory_used: 0,
            in_flight: HashMap::new(),
            active: true,
        })
    }

    pub fn cpu_capacity(&self) -> u32 {
        self.cpu_capacity
    }

    pub fn cpu_available(&self) -> u32 {
        self.cpu_capacity - self.cpu_used
    }

    pub fn memory_available(&self) -> u32 {
        self.memory_capacity - self.memory_used
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Mean utilization across resource dimensions, in [0, 1]
    pub fn load(&self) -> f64 {
        (self.cpu_used as f64 / self.cpu_capacity as f64
            + self.memory_used as f64 / self.memory_capacity as f64)
            / 2.0
    }

    /// Residual capacity as the feasibility filter sees it; inactive nodes
    /// report zero
    pub fn residual(&self) -> Residual {
        if !self.active {
            return Residual::default();
        }
        Residual {
            cpu: self.cpu_available(),
            memory: self.memory_available(),
        }
    }

    pub fn can_accept(&self, task: &Task) -> bool {
        self.active
            && self.cpu_available() >= task.cpu_required
            && self.memory_available() >= task.memory_required
    }

    /// Reserve capacity for a task and start executing it
    ///
    /// Returns false (no state change) when the node is inactive or the
    /// task does not fit; admission failure is a rejection, not an error.
    pub fn try_admit(&mut self, task: &Task) -> bool {
        if !self.can_accept(task) {
            return false;
        }
        self.cpu_used += task.cpu_required;
        self.memory_used += task.memory_required;
        self.in_flight.insert(
            task.id,
            InFlight {
                remaining: task.processing_time(self.cpu_capacity),
                cpu: task.cpu_required,
                memory: task.memory_required,
                arrival_time: task.arrival_time,
            },
        );
        true
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Advance every in-flight task by one round, releasing the resources
    /// of those that finish
    pub fn step(&mut self, now: u64) -> Vec<Completion> {
        let mut completed = Vec::new();
        self.in_flight.retain(|task_id, exec| {
            exec.remaining -= 1.0;
            if exec.remaining <= 0.0 {
                completed.push((*task_id, exec.arrival_time, exec.cpu, exec.memory));
                false
            } else {
                true
            }
        });

        let mut out = Vec::with_capacity(completed.len());
        for (task_id, arrival_time, cpu, memory) in completed {
            self.cpu_used -= cpu;
            self.memory_used -= memory;
            out.push(Completion {
                task_id,
                latency: now.saturating_sub(arrival_time) as f64,
            });
        }
        out
    }
}

/// Fixed arena of edge nodes; the single shared mutable resource per round
///
/// Capacity changes are transactional at round granularity: one round's
/// admissions and releases fully apply before the next round's arrivals.
#[derive(Debug, Clone)]
pub struct ResourceLedger {
    nodes: Vec<EdgeNode>,
}

impl ResourceLedger {
    pub fn new(num_nodes: usize, config: &NodeConfig) -> Result<Self> {
        if num_nodes == 0 {
            return Err(Error::InvalidConfig(
                "ledger needs at least one node".into(),
            ));
        }
        let nodes = (0..num_nodes)
            .map(|i| EdgeNode::new(NodeId(i), config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&EdgeNode> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id.0))
    }

    pub fn nodes(&self) -> &[EdgeNode] {
        &self.nodes
    }

    pub fn residuals(&self) -> Vec<Residual> {
        self.nodes.iter().map(|n| n.residual()).collect()
    }

    pub fn loads(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.load()).collect()
    }

    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    pub fn try_admit(&mut self, node: NodeId, task: &Task) -> Result<bool> {
        let node = self
            .nodes
            .get_mut(node.0)
            .ok_or(Error::UnknownNode(node.0))?;
        Ok(node.try_admit(task))
    }

    /// Advance all nodes one round; returns (node, completion) pairs
    pub fn step(&mut self, now: u64) -> Vec<(NodeId, Completion)> {
        let mut out = Vec::new();
        for node in &mut self.nodes {
            for completion in node.step(now) {
                out.push((node.id, completion));
            }
        }
        out
    }

    /// Mark a node failed between rounds; its in-flight work is kept and
    /// resumes on recovery, but no new task may land on it
    pub fn fail_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get_mut(id.0).ok_or(Error::UnknownNode(id.0))?;
        node.set_active(false);
        debug!(node = %id, "node failed");
        Ok(())
    }

    pub fn recover_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.nodes.get_mut(id.0).ok_or(Error::UnknownNode(id.0))?;
        node.set_active(true);
        debug!(node = %id, "node recovered");
        Ok(())
    }
}
