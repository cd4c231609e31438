//! Monotone mixing of per-agent values into a joint value

use rand::Rng;
use rand::rngs::StdRng;

/// State-conditioned monotone combiner
///
/// Per-agent mixing weights are produced by a linear generator over the
/// global-state summary and passed through `abs`, so they are never
/// negative: raising any agent's value can never lower the joint value.
/// That monotonicity is what keeps greedy per-agent action selection
/// consistent with the joint optimum.
#[derive(Debug, Clone, PartialEq)]
pub struct MixingFunction {
    num_agents: usize,
    state_size: usize,
    /// num_agents x state_size weight generator
    gen_w: Vec<f64>,
    /// num_agents generator biases
    gen_b: Vec<f64>,
    /// state-conditioned output bias
    bias_w: Vec<f64>,
    bias_b: f64,
}

impl MixingFunction {
    pub fn new(num_agents: usize, state_size: usize, rng: &mut StdRng) -> Self {
        let scale = 1.0 / (state_size.max(1) as f64).sqrt();
        let gen_w = (0..num_agents * state_size)
            .map(|_| rng.random_range(-scale..scale))
            .collect();
        // Positive generator biases start every agent with real weight.
        let gen_b = vec![1.0 / num_agents.max(1) as f64; num_agents];
        Self {
            num_agents,
            state_size,
            gen_w,
            gen_b,
            bias_w: vec![0.0; state_size],
            bias_b: 0.0,
        }
    }

    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    /// Pre-activation weight logits for a state summary
    fn logits(&self, state: &[f64]) -> Vec<f64> {
        (0..self.num_agents)
            .map(|i| {
                let mut z = self.gen_b[i];
                for (k, s) in state.iter().enumerate().take(self.state_size) {
                    z += self.gen_w[i * self.state_size + k] * s;
                }
                z
            })
            .collect()
    }

    /// Non-negative per-agent mixing weights
    pub fn weights(&self, state: &[f64]) -> Vec<f64> {
        self.logits(state).iter().map(|z| z.abs()).collect()
    }

    /// Combine per-agent values into one joint value
    pub fn mix(&self, agent_values: &[f64], state: &[f64]) -> f64 {
        let weights = self.weights(state);
        let mut joint = self.bias_b;
        for (k, s) in state.iter().enumerate().take(self.state_size) {
            joint += self.bias_w[k] * s;
        }
        for (w, q) in weights.iter().zip(agent_values) {
            joint += w * q;
        }
        joint
    }

    pub fn params(&self) -> Vec<f64> {
        let mut params = self.gen_w.clone();
        params.extend_from_slice(&self.gen_b);
        params.extend_from_slice(&self.bias_w);
        params.push(self.bias_b);
        params
    }

    pub fn sync_from(&mut self, other: &Self) {
        self.gen_w.copy_from_slice(&other.gen_w);
        self.gen_b.copy_from_slice(&other.gen_b);
        self.bias_w.copy_from_slice(&other.bias_w);
        self.bias_b = other.bias_b;
    }

    /// One gradient step on the generator and bias parameters
    ///
    /// `delta` is dLoss/dJoint at the current output; the chain through
    /// `abs` contributes the logit's sign.
    pub fn adjust(&mut self, agent_values: &[f64], state: &[f64], delta: f64, lr: f64) {
        let logits = self.logits(state);
        for (i, q) in agent_values.iter().enumerate().take(self.num_agents) {
            let sign = if logits[i] > 0.0 {
                1.0
            } else if logits[i] < 0.0 {
                -1.0
            } else {
                0.0
            };
            let upstream = delta * q * sign;
            for (k, s) in state.iter().enumerate().take(self.state_size) {
                self.gen_w[i * self.state_size + k] -= lr * upstream * s;
            }
            self.gen_b[i] -= lr * upstream;
        }
        for (k, s) in state.iter().enumerate().take(self.state_size) {
            self.bias_w[k] -= lr * delta * s;
        }
        self.bias_b -= lr * delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn mixer(seed: u64) -> MixingFunction {
        let mut rng = StdRng::seed_from_u64(seed);
        MixingFunction::new(3, 4, &mut rng)
    }

    #[test]
    fn weights_are_never_negative() {
        let m = mixer(0);
        for scale in [-2.0, -0.5, 0.0, 0.5, 2.0] {
            let state = vec![scale; 4];
            assert!(m.weights(&state).iter().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn raising_any_agent_value_never_lowers_the_joint_value() {
        let m = mixer(1);
        let state = vec![0.3, -0.7, 0.2, 0.9];
        let base = vec![0.1, -0.4, 0.6];
        let joint = m.mix(&base, &state);
        for i in 0..3 {
            let mut raised = base.clone();
            raised[i] += 1.0;
            assert!(m.mix(&raised, &state) >= joint);
        }
    }

    #[test]
    fn sync_makes_mixers_identical() {
        let mut online = mixer(2);
        let mut target = online.clone();
        online.adjust(&[1.0, 2.0, 3.0], &[0.1, 0.2, 0.3, 0.4], 0.5, 0.01);
        assert_ne!(online.params(), target.params());
        target.sync_from(&online);
        assert_eq!(online.params(), target.params());
    }

    #[test]
    fn adjust_reduces_squared_error() {
        let mut m = mixer(3);
        let state = vec![0.5, 0.5, -0.5, 0.1];
        let values = vec![0.2, 0.8, -0.3];
        let target = 2.0;
        let before = (m.mix(&values, &state) - target).powi(2);
        for _ in 0..200 {
            let delta = 2.0 * (m.mix(&values, &state) - target);
            m.adjust(&values, &state, delta, 0.01);
        }
        let after = (m.mix(&values, &state) - target).powi(2);
        assert!(after < before);
    }
}
