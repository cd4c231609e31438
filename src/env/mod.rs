//! Simulation environment: devices, edge nodes, arrivals and the round loop

pub mod device;
pub mod generator;
pub mod node;
pub mod sim;

pub use device::Device;
pub use generator::{TaskGenerator, device_importances};
pub use node::{Completion, EdgeNode, ResourceLedger};
pub use sim::{EdgeSim, NodeAction, OBS_SIZE, RoundRecord, Snapshot, StepOutcome};
