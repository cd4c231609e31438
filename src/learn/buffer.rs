//! Fixed-capacity experience store with uniform sampling

use crate::error::{Error, Result};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One stored interaction, immutable after insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Per-agent observations before the joint action
    pub obs: Vec<Vec<f64>>,
    /// One action index per agent
    pub actions: Vec<usize>,
    /// One shaped reward per agent
    pub rewards: Vec<f64>,
    /// Per-agent observations after the step
    pub next_obs: Vec<Vec<f64>>,
    pub done: bool,
}

/// Ring buffer of transitions; oldest evicted first once full
#[derive(Debug, Clone)]
pub struct ExperienceStore {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ExperienceStore {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "experience store capacity must be positive".into(),
            ));
        }
        Ok(Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// O(1) amortized insert; evicts the oldest transition when full
    pub fn add(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether enough experience is stored for a batch of size `k`
    pub fn is_ready(&self, k: usize) -> bool {
        self.buffer.len() >= k
    }

    /// Draw `k` distinct transitions uniformly without replacement
    ///
    /// Errors when `k` exceeds the current size; never silently truncates.
    /// No ordering guarantee on the returned batch.
    pub fn sample(&self, rng: &mut StdRng, k: usize) -> Result<Vec<&Transition>> {
        if k > self.buffer.len() {
            return Err(Error::InsufficientExperience {
                requested: k,
                stored: self.buffer.len(),
            });
        }
        let indices = rand::seq::index::sample(rng, self.buffer.len(), k);
        Ok(indices.into_iter().map(|i| &self.buffer[i]).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}
