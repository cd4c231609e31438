//! Coordinator: exploration, experience, and the temporal-difference update
//!
//! Centralized training, decentralized execution: each agent acts from its
//! own observation and private recurrent context, while the training step
//! mixes all agents' values under a global-state summary.

use crate::config::TrainConfig;
use crate::error::{Error, Result};
use crate::learn::buffer::{ExperienceStore, Transition};
use crate::learn::estimator::{AgentContext, ValueEstimator};
use crate::learn::mixer::MixingFunction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Element-wise mean of per-agent observations; the global-state summary
/// the mixer conditions on
fn state_summary(obs: &[Vec<f64>]) -> Vec<f64> {
    if obs.is_empty() {
        return Vec::new();
    }
    let len = obs[0].len();
    let mut summary = vec![0.0; len];
    for agent_obs in obs {
        for (k, x) in agent_obs.iter().enumerate().take(len) {
            summary[k] += x;
        }
    }
    for s in &mut summary {
        *s /= obs.len() as f64;
    }
    summary
}

/// Orchestrates per-agent estimators, their targets, the mixer and the
/// experience store
pub struct Coordinator<E: ValueEstimator + Clone> {
    config: TrainConfig,
    num_agents: usize,
    agents: Vec<E>,
    targets: Vec<E>,
    mixer: MixingFunction,
    target_mixer: MixingFunction,
    store: ExperienceStore,
    contexts: Vec<AgentContext>,
    epsilon: f64,
    update_counter: u64,
    rng: StdRng,
}

impl<E: ValueEstimator + Clone> Coordinator<E> {
    /// Build a coordinator from online estimators; targets start as exact
    /// copies
    pub fn new(config: TrainConfig, agents: Vec<E>) -> Result<Self> {
        if agents.is_empty() {
            return Err(Error::InvalidConfig(
                "coordinator needs at least one agent".into(),
            ));
        }
        let num_agents = agents.len();
        let num_actions = agents[0].num_actions();
        if agents.iter().any(|a| a.num_actions() != num_actions) {
            return Err(Error::InvalidConfig(
                "agents disagree on action-space size".into(),
            ));
        }
        let store = ExperienceStore::new(config.buffer_size)?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mixer = MixingFunction::new(num_agents, config.obs_size, &mut rng);
        let target_mixer = mixer.clone();
        let targets = agents.clone();
        let contexts = agents
            .iter()
            .map(|a| AgentContext::zeros(a.hidden_size()))
            .collect();
        let epsilon = config.epsilon_start;
        Ok(Self {
            config,
            num_agents,
            agents,
            targets,
            mixer,
            target_mixer,
            store,
            contexts,
            epsilon,
            update_counter: 0,
            rng,
        })
    }

    pub fn num_agents(&self) -> usize {
        self.num_agents
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn store(&self) -> &ExperienceStore {
        &self.store
    }

    pub fn agents(&self) -> &[E] {
        &self.agents
    }

    pub fn targets(&self) -> &[E] {
        &self.targets
    }

    pub fn mixer(&self) -> &MixingFunction {
        &self.mixer
    }

    pub fn target_mixer(&self) -> &MixingFunction {
        &self.target_mixer
    }

    /// Zero every agent's recurrent context at an episode boundary
    pub fn reset_contexts(&mut self) {
        for (agent, ctx) in self.agents.iter().zip(self.contexts.iter_mut()) {
            *ctx = AgentContext::zeros(agent.hidden_size());
        }
    }

    /// Epsilon-greedy joint action selection
    ///
    /// Each agent sees only its own observation and private context; all
    /// value computations complete before any action is applied, so the
    /// joint action is conceptually simultaneous.
    pub fn select_actions(&mut self, observations: &[Vec<f64>]) -> Result<Vec<usize>> {
        if observations.len() != self.num_agents {
            return Err(Error::ValidationError(format!(
                "expected {} observations, got {}",
                self.num_agents,
                observations.len()
            )));
        }
        let mut actions = Vec::with_capacity(self.num_agents);
        for (i, obs) in observations.iter().enumerate() {
            let (values, next_ctx) = self.agents[i].forward(obs, &self.contexts[i]);
            self.contexts[i] = next_ctx;
            let action = if self.rng.random::<f64>() < self.epsilon {
                self.rng.random_range(0..values.len())
            } else {
                argmax(&values)
            };
            actions.push(action);
        }
        trace!(?actions, epsilon = self.epsilon, "joint action selected");
        Ok(actions)
    }

    pub fn store_experience(&mut self, transition: Transition) {
        self.store.add(transition);
    }

    /// One temporal-difference training step
    ///
    /// Strict no-op returning `None` while the store holds fewer than
    /// `batch_size` transitions.
    pub fn train_step(&mut self) -> Result<Option<f64>> {
        if !self.store.is_ready(self.config.batch_size) {
            return Ok(None);
        }
        let batch: Vec<Transition> = self
            .store
            .sample(&mut self.rng, self.config.batch_size)?
            .into_iter()
            .cloned()
            .collect();

        let lr = self.config.learning_rate;
        let gamma = self.config.gamma;
        let mut total_loss = 0.0;

        for transition in &batch {
            let summary = state_summary(&transition.obs);
            let next_summary = state_summary(&transition.next_obs);

            // Online values at the stored actions; stored transitions are
            // replayed from a fresh context.
            let mut chosen = Vec::with_capacity(self.num_agents);
            let mut fresh_ctx = Vec::with_capacity(self.num_agents);
            for (i, agent) in self.agents.iter().enumerate() {
                let ctx = AgentContext::zeros(agent.hidden_size());
                let (values, _) = agent.forward(&transition.obs[i], &ctx);
                chosen.push(values[transition.actions[i]]);
                fresh_ctx.push(ctx);
            }
            let joint = self.mixer.mix(&chosen, &summary);

            // Greedy per-agent target values; monotone mixing makes this
            // the joint maximum.
            let mut next_best = Vec::with_capacity(self.num_agents);
            for (i, target) in self.targets.iter().enumerate() {
                let ctx = AgentContext::zeros(target.hidden_size());
                let (values, _) = target.forward(&transition.next_obs[i], &ctx);
                next_best.push(values[argmax(&values)]);
            }
            let joint_next = self.target_mixer.mix(&next_best, &next_summary);

            let mean_reward =
                transition.rewards.iter().sum::<f64>() / transition.rewards.len() as f64;
            let done = if transition.done { 1.0 } else { 0.0 };
            let target = mean_reward + gamma * joint_next * (1.0 - done);

            let error = joint - target;
            total_loss += error * error;
            let delta = 2.0 * error / self.config.batch_size as f64;

            // Online-only updates: mixer generator, then each readout
            // scaled by its mixing weight.
            let weights = self.mixer.weights(&summary);
            self.mixer.adjust(&chosen, &summary, delta, lr);
            for (i, agent) in self.agents.iter_mut().enumerate() {
                agent.adjust(
                    &transition.obs[i],
                    &fresh_ctx[i],
                    transition.actions[i],
                    delta * weights[i],
                    lr,
                );
            }
        }

        self.update_counter += 1;
        if self.update_counter % self.config.target_update_freq == 0 {
            self.sync_targets();
        }
        self.decay_epsilon();

        let loss = total_loss / self.config.batch_size as f64;
        debug!(
            step = self.update_counter,
            loss,
            epsilon = self.epsilon,
            "training step complete"
        );
        Ok(Some(loss))
    }

    /// Hard-sync every target from its online counterpart
    pub fn sync_targets(&mut self) {
        for (target, agent) in self.targets.iter_mut().zip(&self.agents) {
            target.sync_from(agent);
        }
        self.target_mixer.sync_from(&self.mixer);
        debug!(step = self.update_counter, "targets synchronized");
    }

    fn decay_epsilon(&mut self) {
        self.epsilon = self
            .config
            .epsilon_end
            .max(self.epsilon * self.config.epsilon_decay);
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learn::estimator::RecurrentEstimator;

    const NUM_AGENTS: usize = 3;
    const OBS: usize = 4;
    const ACTIONS: usize = 4;

    fn coordinator(seed: u64) -> Coordinator<RecurrentEstimator> {
        let config = TrainConfig {
            obs_size: OBS,
            hidden_size: 16,
            batch_size: 8,
            buffer_size: 64,
            target_update_freq: 5,
            seed: Some(seed),
            ..TrainConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let agents = (0..NUM_AGENTS)
            .map(|_| RecurrentEstimator::new(OBS, 16, ACTIONS, &mut rng))
            .collect();
        Coordinator::new(config, agents).unwrap()
    }

    fn transition(seed: u64) -> Transition {
        let mut rng = StdRng::seed_from_u64(seed);
        let obs = (0..NUM_AGENTS)
            .map(|_| (0..OBS).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect::<Vec<Vec<f64>>>();
        let next_obs = (0..NUM_AGENTS)
            .map(|_| (0..OBS).map(|_| rng.random_range(-1.0..1.0)).collect())
            .collect::<Vec<Vec<f64>>>();
        Transition {
            obs,
            actions: vec![rng.random_range(0..ACTIONS); NUM_AGENTS],
            rewards: vec![rng.random_range(-0.5..1.5); NUM_AGENTS],
            next_obs,
            done: false,
        }
    }

    #[test]
    fn train_before_ready_is_a_no_op() {
        let mut coord = coordinator(0);
        assert_eq!(coord.train_step().unwrap(), None);
        coord.store_experience(transition(1));
        assert_eq!(coord.train_step().unwrap(), None);
        // Epsilon untouched by no-op steps.
        assert_eq!(coord.epsilon(), 1.0);
    }

    #[test]
    fn train_returns_a_loss_once_ready() {
        let mut coord = coordinator(1);
        for i in 0..8 {
            coord.store_experience(transition(i));
        }
        let loss = coord.train_step().unwrap();
        assert!(loss.is_some());
        assert!(loss.unwrap().is_finite());
    }

    #[test]
    fn epsilon_decays_monotonically_to_its_floor() {
        let mut coord = coordinator(2);
        for i in 0..8 {
            coord.store_experience(transition(i));
        }
        let mut last = coord.epsilon();
        for _ in 0..2000 {
            coord.train_step().unwrap();
            let eps = coord.epsilon();
            assert!(eps <= last);
            assert!(eps >= coord.config.epsilon_end);
            last = eps;
        }
        assert!((coord.epsilon() - coord.config.epsilon_end).abs() < 1e-12);
    }

    #[test]
    fn targets_match_online_after_sync() {
        let mut coord = coordinator(3);
        for i in 0..8 {
            coord.store_experience(transition(i));
        }
        // target_update_freq = 5: after 5 steps a sync has happened.
        for _ in 0..5 {
            coord.train_step().unwrap();
        }
        for (agent, target) in coord.agents().iter().zip(coord.targets()) {
            assert_eq!(agent.params(), target.params());
        }
        assert_eq!(coord.mixer().params(), coord.target_mixer().params());
    }

    #[test]
    fn targets_lag_online_between_syncs() {
        let mut coord = coordinator(4);
        for i in 0..8 {
            coord.store_experience(transition(i));
        }
        coord.train_step().unwrap();
        // One step in, targets still hold their initial copies.
        let diverged = coord
            .agents()
            .iter()
            .zip(coord.targets())
            .any(|(a, t)| a.params() != t.params());
        assert!(diverged);
    }

    #[test]
    fn select_actions_threads_contexts_and_validates_arity() {
        let mut coord = coordinator(5);
        let obs: Vec<Vec<f64>> = (0..NUM_AGENTS).map(|_| vec![0.1; OBS]).collect();
        let actions = coord.select_actions(&obs).unwrap();
        assert_eq!(actions.len(), NUM_AGENTS);
        assert!(actions.iter().all(|a| *a < ACTIONS));
        assert!(coord.select_actions(&obs[..1].to_vec()).is_err());
    }

    #[test]
    fn greedy_selection_is_deterministic_at_zero_epsilon() {
        let mut coord = coordinator(6);
        coord.epsilon = 0.0;
        let obs: Vec<Vec<f64>> = (0..NUM_AGENTS).map(|_| vec![0.2; OBS]).collect();
        coord.reset_contexts();
        let a = coord.select_actions(&obs).unwrap();
        coord.reset_contexts();
        let b = coord.select_actions(&obs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mismatched_action_spaces_are_fatal() {
        let mut rng = StdRng::seed_from_u64(7);
        let agents = vec![
            RecurrentEstimator::new(OBS, 16, 3, &mut rng),
            RecurrentEstimator::new(OBS, 16, 4, &mut rng),
        ];
        let config = TrainConfig {
            obs_size: OBS,
            seed: Some(7),
            ..TrainConfig::default()
        };
        assert!(matches!(
            Coordinator::new(config, agents),
            Err(Error::InvalidConfig(_))
        ));
    }
}
