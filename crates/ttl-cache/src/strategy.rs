use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

use crate::error::CacheError;

/// Which entry to drop when a full cache receives a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum EvictionStrategy {
    /// Least recently used.
    #[default]
    Lru,
    /// Least frequently used, measured in read hits.
    Lfu,
}

impl EvictionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionStrategy::Lru => "LRU",
            EvictionStrategy::Lfu => "LFU",
        }
    }

    /// Parses a strategy name, falling back to [`EvictionStrategy::Lru`] for
    /// anything unrecognized.
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(strategy = name, "Unknown eviction strategy, using LRU");
            EvictionStrategy::Lru
        })
    }
}

impl FromStr for EvictionStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LRU" => Ok(EvictionStrategy::Lru),
            "LFU" => Ok(EvictionStrategy::Lfu),
            _ => Err(CacheError::UnknownStrategy(s.to_string())),
        }
    }
}

impl From<String> for EvictionStrategy {
    fn from(name: String) -> Self {
        EvictionStrategy::parse_or_default(&name)
    }
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("lru".parse::<EvictionStrategy>(), Ok(EvictionStrategy::Lru));
        assert_eq!(" LFU ".parse::<EvictionStrategy>(), Ok(EvictionStrategy::Lfu));
    }

    #[test]
    fn unknown_name_falls_back_to_lru() {
        assert!("ARC".parse::<EvictionStrategy>().is_err());
        assert_eq!(EvictionStrategy::parse_or_default("ARC"), EvictionStrategy::Lru);
        assert_eq!(EvictionStrategy::from(String::new()), EvictionStrategy::Lru);
    }
}
