//! Repeated VCG auction: allocation, payments and round history

pub mod allocation;
pub mod payments;

pub use allocation::{Demand, Residual, capacity_filter, compute_allocation};
pub use payments::vcg_payments;

use crate::error::{Error, Result};
use crate::metrics::gini_coefficient;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Immutable snapshot of one auction round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionRound {
    /// Devices x nodes, rows one-hot or all-zero
    pub allocation: Array2<f64>,
    /// One externality payment per device
    pub payments: Array1<f64>,
    pub social_welfare: f64,
    pub timestamp: u64,
}

/// Repeated VCG auction over a fixed device/node population
#[derive(Debug, Clone)]
pub struct VcgAuction {
    num_devices: usize,
    num_nodes: usize,
    history: Vec<AuctionRound>,
}

impl VcgAuction {
    pub fn new(num_devices: usize, num_nodes: usize) -> Result<Self> {
        if num_devices == 0 || num_nodes == 0 {
            return Err(Error::InvalidConfig(format!(
                "auction needs at least one device and one node, got {num_devices}x{num_nodes}"
            )));
        }
        Ok(Self {
            num_devices,
            num_nodes,
            history: Vec::new(),
        })
    }

    /// Run one auction round and append its snapshot to the history
    pub fn run_auction(
        &mut self,
        valuations: &Array2<f64>,
        costs: &Array2<f64>,
        timestamp: u64,
    ) -> Result<AuctionRound> {
        let expected = (self.num_devices, self.num_nodes);
        if valuations.dim() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                got: valuations.dim(),
            });
        }
        let allocation = compute_allocation(valuations, costs)?;
        let (payments, social_welfare) = vcg_payments(&allocation, valuations, costs)?;
        debug!(
            timestamp,
            social_welfare,
            allocated = allocation.sum() as usize,
            "auction round complete"
        );
        let round = AuctionRound {
            allocation,
            payments,
            social_welfare,
            timestamp,
        };
        self.history.push(round.clone());
        Ok(round)
    }

    pub fn history(&self) -> &[AuctionRound] {
        &self.history
    }

    pub fn num_devices(&self) -> usize {
        self.num_devices
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Mean payment Gini over all historical rounds with more than one
    /// positive payment
    pub fn average_gini(&self) -> f64 {
        let mut ginis = Vec::new();
        for round in &self.history {
            let positive: Vec<f64> = round
                .payments
                .iter()
                .copied()
                .filter(|p| *p > 0.0)
                .collect();
            if positive.len() > 1 {
                ginis.push(gini_coefficient(&positive));
            }
        }
        if ginis.is_empty() {
            return 0.0;
        }
        ginis.iter().sum::<f64>() / ginis.len() as f64
    }
}
