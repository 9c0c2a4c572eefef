// ── Core identity type ──
//
// Every board, device, group and command is identified by a non-negative
// integer assigned by the controller. The UI never allocates ids.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical identifier for any Hermes entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Parent id of top-level groups.
    pub const ROOT: Self = Self(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot maps arrive keyed by the id rendered as a string.
impl FromStr for EntityId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_keys() {
        let id: EntityId = "7".parse().unwrap();
        assert_eq!(id, EntityId::new(7));
        assert!("seven".parse::<EntityId>().is_err());
        assert!("-1".parse::<EntityId>().is_err());
    }

    #[test]
    fn serializes_as_bare_integer() {
        assert_eq!(serde_json::to_string(&EntityId::new(42)).unwrap(), "42");
        let id: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn zero_is_root() {
        assert!(EntityId::ROOT.is_root());
        assert!(!EntityId::new(1).is_root());
        assert_eq!(EntityId::default(), EntityId::ROOT);
    }
}
