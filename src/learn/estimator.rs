//! Per-agent value estimation
//!
//! The trainer only depends on the [`ValueEstimator`] contract: any
//! approximator that maps an observation plus recurrent context to
//! per-action values, exposes its trainable parameters for hard target
//! sync, and accepts a semi-gradient adjustment can plug into the mixing
//! and training protocol.

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Recurrent memory for one agent
///
/// Owned and threaded by the coordinator, never shared across agents,
/// zeroed at the start of each episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    pub hidden: Vec<f64>,
}

impl AgentContext {
    pub fn zeros(hidden_size: usize) -> Self {
        Self {
            hidden: vec![0.0; hidden_size],
        }
    }
}

/// Contract between the trainer and any per-agent approximator
pub trait ValueEstimator {
    /// Per-action values for an observation under the given context,
    /// plus the successor context
    fn forward(&self, obs: &[f64], ctx: &AgentContext) -> (Vec<f64>, AgentContext);

    fn num_actions(&self) -> usize;

    fn hidden_size(&self) -> usize;

    /// Trainable parameters, flattened; used for target equality checks
    fn params(&self) -> Vec<f64>;

    /// Hard-sync trainable parameters from another estimator of the same
    /// shape
    fn sync_from(&mut self, other: &Self);

    /// One semi-gradient step: move the chosen action's value by
    /// `-lr * delta` along the value's parameter gradient
    fn adjust(&mut self, obs: &[f64], ctx: &AgentContext, action: usize, delta: f64, lr: f64);
}

/// Recurrent estimator: fixed random recurrent features with a trainable
/// linear readout per action
///
/// The feature map `h' = tanh(W_in x + W_rec h)` is drawn once at
/// construction and frozen; only the readout learns. Gives history
/// dependence without backpropagation through time.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentEstimator {
    obs_size: usize,
    hidden_size: usize,
    num_actions: usize,
    /// hidden_size x obs_size, frozen
    w_in: Vec<f64>,
    /// hidden_size x hidden_size, frozen
    w_rec: Vec<f64>,
    /// num_actions x hidden_size, trainable
    readout_w: Vec<f64>,
    /// num_actions, trainable
    readout_b: Vec<f64>,
}

impl RecurrentEstimator {
    pub fn new(obs_size: usize, hidden_size: usize, num_actions: usize, rng: &mut StdRng) -> Self {
        // Contractive scales keep the recurrence stable.
        let in_scale = 1.0 / (obs_size.max(1) as f64).sqrt();
        let rec_scale = 0.9 / (hidden_size.max(1) as f64).sqrt();
        let w_in = (0..hidden_size * obs_size)
            .map(|_| rng.random_range(-in_scale..in_scale))
            .collect();
        let w_rec = (0..hidden_size * hidden_size)
            .map(|_| rng.random_range(-rec_scale..rec_scale))
            .collect();
        Self {
            obs_size,
            hidden_size,
            num_actions,
            w_in,
            w_rec,
            readout_w: vec![0.0; num_actions * hidden_size],
            readout_b: vec![0.0; num_actions],
        }
    }

    /// Successor hidden features for an observation
    fn features(&self, obs: &[f64], ctx: &AgentContext) -> Vec<f64> {
        let mut next = vec![0.0; self.hidden_size];
        for (k, slot) in next.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (i, x) in obs.iter().enumerate().take(self.obs_size) {
                acc += self.w_in[k * self.obs_size + i] * x;
            }
            for (j, h) in ctx.hidden.iter().enumerate().take(self.hidden_size) {
                acc += self.w_rec[k * self.hidden_size + j] * h;
            }
            *slot = acc.tanh();
        }
        next
    }
}

impl ValueEstimator for RecurrentEstimator {
    fn forward(&self, obs: &[f64], ctx: &AgentContext) -> (Vec<f64>, AgentContext) {
        let features = self.features(obs, ctx);
        let mut values = vec![0.0; self.num_actions];
        for (a, value) in values.iter_mut().enumerate() {
            let mut acc = self.readout_b[a];
            for (k, f) in features.iter().enumerate() {
                acc += self.readout_w[a * self.hidden_size + k] * f;
            }
            *value = acc;
        }
        (values, AgentContext { hidden: features })
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn params(&self) -> Vec<f64> {
        let mut params = self.readout_w.clone();
        params.extend_from_slice(&self.readout_b);
        params
    }

    fn sync_from(&mut self, other: &Self) {
        self.readout_w.copy_from_slice(&other.readout_w);
        self.readout_b.copy_from_slice(&other.readout_b);
    }

    fn adjust(&mut self, obs: &[f64], ctx: &AgentContext, action: usize, delta: f64, lr: f64) {
        let features = self.features(obs, ctx);
        for (k, f) in features.iter().enumerate() {
            self.readout_w[action * self.hidden_size + k] -= lr * delta * f;
        }
        self.readout_b[action] -= lr * delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn estimator(seed: u64) -> RecurrentEstimator {
        let mut rng = StdRng::seed_from_u64(seed);
        RecurrentEstimator::new(4, 16, 3, &mut rng)
    }

    #[test]
    fn forward_produces_one_value_per_action() {
        let est = estimator(0);
        let ctx = AgentContext::zeros(16);
        let (values, next) = est.forward(&[0.1, 0.2, 0.3, 0.4], &ctx);
        assert_eq!(values.len(), 3);
        assert_eq!(next.hidden.len(), 16);
    }

    #[test]
    fn context_carries_history() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut est = estimator(2);
        // Make the readout non-trivial so value differences are visible.
        for w in est.readout_w.iter_mut() {
            *w = rng.random_range(-0.5..0.5);
        }
        let obs = [0.5, -0.2, 0.1, 0.9];
        let ctx0 = AgentContext::zeros(16);
        let (_, ctx1) = est.forward(&obs, &ctx0);
        let (v_fresh, _) = est.forward(&obs, &ctx0);
        let (v_hist, _) = est.forward(&obs, &ctx1);
        assert_ne!(v_fresh, v_hist);
    }

    #[test]
    fn sync_makes_outputs_identical() {
        let mut online = estimator(3);
        let mut target = online.clone();
        let ctx = AgentContext::zeros(16);
        let obs = [1.0, 0.0, -1.0, 0.5];
        online.adjust(&obs, &ctx, 1, 0.7, 0.1);
        assert_ne!(online.params(), target.params());
        target.sync_from(&online);
        assert_eq!(online.params(), target.params());
        let (a, _) = online.forward(&obs, &ctx);
        let (b, _) = target.forward(&obs, &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn adjust_moves_the_chosen_action_value_down_the_error() {
        let mut est = estimator(4);
        let ctx = AgentContext::zeros(16);
        let obs = [0.3, 0.3, 0.3, 0.3];
        let (before, _) = est.forward(&obs, &ctx);
        // Positive delta means the prediction was too high.
        est.adjust(&obs, &ctx, 2, 1.0, 0.05);
        let (after, _) = est.forward(&obs, &ctx);
        assert!(after[2] < before[2]);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], before[1]);
    }
}
