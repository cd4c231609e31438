//! Task-submitting device bookkeeping

use crate::types::{DeviceId, Task};
use serde::{Deserialize, Serialize};

/// A task-submitting device
///
/// Mutated only through the accept/reject/payment entry points below;
/// never destroyed during a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Importance weight in [0, 1], drawn at network initialization
    pub importance: f64,
    pub submitted: Vec<Task>,
    pub completed: Vec<Task>,
    pub rejected: Vec<Task>,
    pub total_payment: f64,
    pub last_payment: f64,
}

impl Device {
    pub fn new(id: DeviceId, importance: f64) -> Self {
        Self {
            id,
            importance,
            submitted: Vec::new(),
            completed: Vec::new(),
            rejected: Vec::new(),
            total_payment: 0.0,
            last_payment: 0.0,
        }
    }

    pub fn submit(&mut self, task: Task) {
        self.submitted.push(task);
    }

    pub fn task_completed(&mut self, task: Task) {
        self.completed.push(task);
    }

    pub fn task_rejected(&mut self, task: Task) {
        self.rejected.push(task);
    }

    pub fn receive_payment(&mut self, amount: f64) {
        self.total_payment += amount;
        self.last_payment = amount;
    }

    /// Fraction of submitted tasks that completed
    pub fn success_rate(&self) -> f64 {
        if self.submitted.is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 / self.submitted.len() as f64
    }

    /// Mean payment per completed task
    pub fn avg_payment(&self) -> f64 {
        if self.completed.is_empty() {
            return 0.0;
        }
        self.total_payment / self.completed.len() as f64
    }
}
