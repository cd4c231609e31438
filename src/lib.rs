//! # edgemix - VCG-auctioned edge resource allocation with multi-agent learning
//!
//! edgemix simulates a small set of edge nodes serving many competing
//! task-submitting devices. A repeated Vickrey-Clarke-Groves auction decides
//! what gets run and who pays each round, with fairness accounting over the
//! payment stream; a population of per-node learning agents decides how
//! nodes behave over time, trained centrally through a monotone mixing
//! function while acting on local observations only.
//!
//! ## Modules
//!
//! - [`auction`] - greedy allocation, VCG payments and the round history
//! - [`env`] - devices, edge nodes, task arrivals and the simulation loop
//! - [`learn`] - experience store, value estimators, mixing and training
//! - [`metrics`] - Gini, Jain fairness and welfare metrics
//! - [`rewards`] - local/team reward shaping and payment blending
//! - [`config`] - explicit immutable configuration for every component
//! - [`types`] - task, priority and identifier types
//! - [`error`] - error types and handling
//! - [`logger`] - tracing initialization
//!
//! ## Quick start
//!
//! ```rust
//! use edgemix::*;
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let mut config = SimConfig::default();
//! config.env = config.env.with_nodes(3).with_devices(10).with_seed(42);
//! config.train.seed = Some(42);
//!
//! let mut sim = EdgeSim::new(config.clone()).unwrap();
//! let mut rng = StdRng::seed_from_u64(42);
//! let agents: Vec<RecurrentEstimator> = (0..sim.num_agents())
//!     .map(|_| {
//!         RecurrentEstimator::new(
//!             OBS_SIZE,
//!             config.train.hidden_size,
//!             NodeAction::COUNT,
//!             &mut rng,
//!         )
//!     })
//!     .collect();
//! let mut coordinator = Coordinator::new(config.train.clone(), agents).unwrap();
//!
//! let obs = sim.observations();
//! let actions = coordinator.select_actions(&obs).unwrap();
//! let joint: Vec<NodeAction> = actions
//!     .iter()
//!     .map(|a| NodeAction::from_index(*a).unwrap())
//!     .collect();
//! let outcome = sim.step(&joint).unwrap();
//! assert_eq!(outcome.rewards.len(), 3);
//! ```

pub mod auction;
pub mod config;
pub mod env;
pub mod error;
pub mod learn;
pub mod logger;
pub mod metrics;
pub mod rewards;
pub mod types;

pub use auction::*;
pub use config::*;
pub use env::*;
pub use error::*;
pub use learn::*;
pub use rewards::*;
pub use types::*;
