//! Reward shaping: local task outcomes, team welfare and payment blending

use crate::config::RewardConfig;

/// Turns allocation outcomes, payments and fairness into per-agent and
/// team rewards
#[derive(Debug, Clone)]
pub struct RewardShaper {
    config: RewardConfig,
}

impl RewardShaper {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Local reward for one task outcome
    ///
    /// Rejection costs a flat penalty; acceptance earns the task's value
    /// minus weighted processing-time and energy charges.
    pub fn local_reward(
        &self,
        accepted: bool,
        task_value: f64,
        processing_time: f64,
        energy_used: f64,
    ) -> f64 {
        if !accepted {
            return self.config.rejection_penalty;
        }
        task_value
            - self.config.time_penalty_weight * processing_time
            - self.config.energy_penalty_weight * energy_used
    }

    /// Energy charged for a task, proxied by its CPU demand
    pub fn energy_used(&self, cpu_required: u32) -> f64 {
        cpu_required as f64 * self.config.energy_per_cpu
    }

    /// Team reward: social welfare minus fairness and inequality penalties
    pub fn team_reward(&self, social_welfare: f64, fairness_index: f64, gini: f64) -> f64 {
        let fairness_penalty = if fairness_index > self.config.fairness_target {
            0.0
        } else {
            (self.config.fairness_target - fairness_index) * self.config.fairness_penalty_scale
        };
        let gini_penalty = if gini < self.config.gini_target {
            0.0
        } else {
            (gini - self.config.gini_target) * self.config.gini_penalty_scale
        };
        social_welfare - fairness_penalty - gini_penalty
    }

    /// Blend normalized payments into local rewards
    ///
    /// Payments are normalized by the mean of the strictly-positive subset;
    /// when that subset is empty the epsilon guard keeps the shift at zero
    /// instead of dividing by nothing.
    pub fn integrate_payments(&self, local_rewards: &mut [f64], payments: &[f64]) {
        let positive: Vec<f64> = payments.iter().copied().filter(|p| *p > 0.0).collect();
        let mean_positive = if positive.is_empty() {
            0.0
        } else {
            positive.iter().sum::<f64>() / positive.len() as f64
        };
        let denom = mean_positive + self.config.payment_epsilon;
        for (reward, payment) in local_rewards.iter_mut().zip(payments) {
            *reward += self.config.vcg_weight * payment / denom;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaper() -> RewardShaper {
        RewardShaper::new(RewardConfig::default())
    }

    #[test]
    fn rejection_earns_the_flat_penalty() {
        assert_eq!(shaper().local_reward(false, 2.0, 1.0, 1.0), -0.5);
    }

    #[test]
    fn accepted_reward_charges_time_and_energy() {
        let r = shaper().local_reward(true, 1.0, 2.0, 4.0);
        // 1.0 - 0.1*2.0 - 0.05*4.0
        assert!((r - 0.6).abs() < 1e-12);
    }

    #[test]
    fn team_reward_is_unpenalized_above_thresholds() {
        let r = shaper().team_reward(3.5, 0.9, 0.1);
        assert!((r - 3.5).abs() < 1e-12);
    }

    #[test]
    fn team_reward_penalizes_unfairness_and_inequality() {
        let r = shaper().team_reward(3.5, 0.75, 0.5);
        // fairness penalty (0.85-0.75)*10 = 1.0, gini penalty (0.5-0.3)*5 = 1.0
        assert!((r - 1.5).abs() < 1e-12);
    }

    #[test]
    fn payment_blending_normalizes_by_positive_mean() {
        let mut rewards = vec![0.0, 0.0];
        shaper().integrate_payments(&mut rewards, &[0.3, 0.3]);
        // mean positive = 0.3, each shift = 0.5 * 0.3 / (0.3 + eps) ~ 0.5
        assert!((rewards[0] - 0.5).abs() < 1e-6);
        assert!((rewards[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_positive_set_leaves_rewards_almost_unchanged() {
        let mut rewards = vec![1.0, 1.0];
        shaper().integrate_payments(&mut rewards, &[0.0, -0.2]);
        assert!((rewards[0] - 1.0).abs() < 1e-6);
        // With no positive payments the denominator is the epsilon guard
        // alone; the shift is still finite.
        assert!(rewards[1].is_finite());
    }
}
