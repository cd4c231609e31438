//! Stochastic task arrivals

use crate::config::TaskGenConfig;
use crate::error::{Error, Result};
use crate::types::{DeviceId, Priority, Task, TaskId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution, Poisson};

/// Poisson arrival process producing tasks on behalf of random devices
///
/// Deterministic for a fixed seed; the generator owns its RNG so the
/// environment step sequence replays exactly.
#[derive(Debug)]
pub struct TaskGenerator {
    config: TaskGenConfig,
    arrivals: Poisson<f64>,
    num_devices: usize,
    rng: StdRng,
    next_id: u64,
}

impl TaskGenerator {
    pub fn new(
        config: TaskGenConfig,
        num_devices: usize,
        arrival_rate: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if num_devices == 0 {
            return Err(Error::InvalidConfig(
                "generator needs at least one device".into(),
            ));
        }
        let arrivals = Poisson::new(arrival_rate).map_err(|e| {
            Error::InvalidConfig(format!("invalid arrival rate {arrival_rate}: {e}"))
        })?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config,
            arrivals,
            num_devices,
            rng,
            next_id: 0,
        })
    }

    /// Draw this round's arrivals
    pub fn generate(&mut self, now: u64) -> Vec<Task> {
        let count = self.arrivals.sample(&mut self.rng) as usize;
        let mut tasks = Vec::with_capacity(count);
        for _ in 0..count {
            let device = DeviceId(self.rng.random_range(0..self.num_devices));
            let cpu = self
                .rng
                .random_range(self.config.cpu_range.0..=self.config.cpu_range.1);
            let memory = self
                .rng
                .random_range(self.config.memory_range.0..=self.config.memory_range.1);
            let priority = match self.rng.random_range(0..3) {
                0 => Priority::Low,
                1 => Priority::Medium,
                _ => Priority::High,
            };
            let importance = self
                .rng
                .random_range(self.config.importance_range.0..=self.config.importance_range.1);
            if let Ok(task) = Task::new(
                TaskId(self.next_id),
                device,
                cpu,
                memory,
                priority,
                now,
                self.config.deadline,
                importance,
            ) {
                self.next_id += 1;
                tasks.push(task);
            }
        }
        tasks
    }

    pub fn generated_count(&self) -> u64 {
        self.next_id
    }
}

/// Draw per-device importance weights from Beta(2, 5)
///
/// Skews most devices toward low importance with a heavy tail, matching a
/// small number of high-stakes submitters.
pub fn device_importances(num_devices: usize, seed: Option<u64>) -> Vec<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let beta = Beta::new(2.0, 5.0).expect("valid fixed shape parameters");
    (0..num_devices).map(|_| beta.sample(&mut rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> TaskGenerator {
        TaskGenerator::new(TaskGenConfig::default(), 10, 2.5, Some(seed)).unwrap()
    }

    #[test]
    fn same_seed_replays_the_same_arrivals() {
        let mut a = generator(42);
        let mut b = generator(42);
        for now in 0..20 {
            assert_eq!(a.generate(now), b.generate(now));
        }
    }

    #[test]
    fn demands_stay_inside_configured_ranges() {
        let mut g = generator(7);
        let cfg = TaskGenConfig::default();
        for now in 0..50 {
            for task in g.generate(now) {
                assert!((cfg.cpu_range.0..=cfg.cpu_range.1).contains(&task.cpu_required));
                assert!((cfg.memory_range.0..=cfg.memory_range.1).contains(&task.memory_required));
                assert!(
                    (cfg.importance_range.0..=cfg.importance_range.1).contains(&task.importance)
                );
                assert_eq!(task.arrival_time, now);
            }
        }
    }

    #[test]
    fn task_ids_are_unique_and_dense() {
        let mut g = generator(3);
        let mut total = 0;
        for now in 0..30 {
            total += g.generate(now).len() as u64;
        }
        assert_eq!(g.generated_count(), total);
    }

    #[test]
    fn invalid_arrival_rate_is_fatal() {
        let res = TaskGenerator::new(TaskGenConfig::default(), 10, -1.0, Some(0));
        assert!(matches!(res, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn importances_are_unit_interval() {
        let importances = device_importances(100, Some(1));
        assert_eq!(importances.len(), 100);
        assert!(importances.iter().all(|w| (0.0..=1.0).contains(w)));
    }
}
