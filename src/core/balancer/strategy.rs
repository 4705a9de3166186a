//! Load-balancing strategy selector
//!
//! Strategies are configured by name; an unknown selector is rejected
//! eagerly at configuration time, never at selection time.

use std::fmt;
use std::str::FromStr;

use crate::utils::error::GatewayError;

/// How the balancer orders eligible candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Strict rotation, one position per call, cursor per service type
    #[default]
    RoundRobin,
    /// Random draw proportional to provider weight, without replacement
    Weighted,
    /// Highest `success_rate / average_latency` first, unknowns explored first
    LeastCost,
}

impl Strategy {
    /// Canonical selector string
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::Weighted => "weighted",
            Strategy::LeastCost => "least-cost",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round-robin" => Ok(Strategy::RoundRobin),
            "weighted" => Ok(Strategy::Weighted),
            "least-cost" => Ok(Strategy::LeastCost),
            other => Err(GatewayError::UnknownStrategy(other.to_string())),
        }
    }
}
