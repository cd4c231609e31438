//! Core domain types: identifiers, task priorities and tasks

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "D{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Task priority class, ordered LOW < MEDIUM < HIGH
///
/// Each class carries a fixed value multiplier used when computing the
/// task's realized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn multiplier(&self) -> f64 {
        match self {
            Priority::Low => 0.5,
            Priority::Medium => 1.0,
            Priority::High => 2.0,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// A unit of work submitted by a device
///
/// Immutable once created; consumed by exactly one allocation decision
/// (accepted or rejected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub device: DeviceId,
    /// Required CPU cycles
    pub cpu_required: u32,
    /// Required memory (MB)
    pub memory_required: u32,
    pub priority: Priority,
    /// Simulation round the task entered the system
    pub arrival_time: u64,
    /// Completion deadline, in rounds after arrival
    pub deadline: u64,
    /// Importance for the owning device, in [0, 1]
    pub importance: f64,
}

impl Task {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        device: DeviceId,
        cpu_required: u32,
        memory_required: u32,
        priority: Priority,
        arrival_time: u64,
        deadline: u64,
        importance: f64,
    ) -> Result<Self> {
        if cpu_required == 0 || memory_required == 0 {
            return Err(Error::ValidationError(
                "task resource demand must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&importance) {
            return Err(Error::ValidationError(format!(
                "importance must be in [0, 1], got {importance}"
            )));
        }
        Ok(Self {
            id,
            device,
            cpu_required,
            memory_required,
            priority,
            arrival_time,
            deadline,
            importance,
        })
    }

    /// Realized value of the task for its device
    pub fn value(&self) -> f64 {
        self.priority.multiplier() * self.importance
    }

    /// Estimated processing time on a node with the given CPU capacity
    pub fn processing_time(&self, cpu_capacity: u32) -> f64 {
        self.cpu_required as f64 / cpu_capacity as f64
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.arrival_time + self.deadline
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.id, self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_and_multipliers() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::Low.multiplier(), 0.5);
        assert_eq!(Priority::Medium.multiplier(), 1.0);
        assert_eq!(Priority::High.multiplier(), 2.0);
    }

    #[test]
    fn task_value_combines_priority_and_importance() {
        let task = Task::new(
            TaskId(1),
            DeviceId(0),
            50,
            128,
            Priority::High,
            0,
            5000,
            0.8,
        )
        .unwrap();
        assert!((task.value() - 1.6).abs() < 1e-12);
    }

    #[test]
    fn task_rejects_out_of_range_importance() {
        let res = Task::new(
            TaskId(1),
            DeviceId(0),
            50,
            128,
            Priority::Low,
            0,
            5000,
            1.5,
        );
        assert!(matches!(res, Err(Error::ValidationError(_))));
    }

    #[test]
    fn task_expiry_is_relative_to_arrival() {
        let task =
            Task::new(TaskId(2), DeviceId(1), 10, 32, Priority::Medium, 100, 50, 1.0).unwrap();
        assert!(!task.is_expired(150));
        assert!(task.is_expired(151));
    }
}
