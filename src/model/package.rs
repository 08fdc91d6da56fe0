//! Packaging options and their weight and cost rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving a package type or checking a parcel's weight.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackageError {
    #[error("unsupported package type: {0:?}")]
    Unsupported(String),

    /// Zero, negative, NaN or infinite weight.
    #[error("weight must be a positive finite number: got {0} kg")]
    NonPositiveWeight(f64),

    /// Negative, NaN or infinite order cost.
    #[error("cost must be a non-negative finite number: got {0}")]
    InvalidCost(f64),

    #[error("weight exceeds {limit} kg limit: got {weight} kg")]
    WeightExceedsLimit { limit: f64, weight: f64 },
}

/// The packaging an order arrives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    None,
    Standard,
    Box,
    Film,
}

impl PackageType {
    pub const ALL: [PackageType; 4] = [
        PackageType::None,
        PackageType::Standard,
        PackageType::Box,
        PackageType::Film,
    ];

    /// Heaviest parcel this packaging accepts, `None` when unbounded.
    pub const fn max_weight(self) -> Option<f64> {
        match self {
            PackageType::Standard => Some(10.0),
            PackageType::Box => Some(30.0),
            PackageType::None | PackageType::Film => None,
        }
    }

    /// Flat surcharge added to the order.
    pub const fn cost(self) -> f64 {
        match self {
            PackageType::Standard => 5.0,
            PackageType::Box => 20.0,
            PackageType::None | PackageType::Film => 0.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PackageType::None => "none",
            PackageType::Standard => "package",
            PackageType::Box => "box",
            PackageType::Film => "film",
        }
    }

    pub fn validate_weight(self, weight: f64) -> Result<(), PackageError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(PackageError::NonPositiveWeight(weight));
        }
        match self.max_weight() {
            Some(limit) if weight > limit => Err(PackageError::WeightExceedsLimit { limit, weight }),
            _ => Ok(()),
        }
    }
}

/// Checks the declared order cost. Zero is allowed.
pub fn validate_cost(cost: f64) -> Result<(), PackageError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(PackageError::InvalidCost(cost));
    }
    Ok(())
}

impl FromStr for PackageType {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "without package" => Ok(PackageType::None),
            "package" | "standard" => Ok(PackageType::Standard),
            "box" => Ok(PackageType::Box),
            "film" => Ok(PackageType::Film),
            _ => Err(PackageError::Unsupported(s.to_string())),
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
