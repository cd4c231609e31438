//! Multi-agent value learning: experience, estimation, mixing, training

pub mod buffer;
pub mod estimator;
pub mod mixer;
pub mod trainer;

pub use buffer::{ExperienceStore, Transition};
pub use estimator::{AgentContext, RecurrentEstimator, ValueEstimator};
pub use mixer::MixingFunction;
pub use trainer::Coordinator;
