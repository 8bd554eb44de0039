use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user_{}", self.0)
    }
}

/// Spendable points of one user.
///
/// `current` never goes negative. It grows only when a processed order is
/// credited; withdrawals (which decrease it) live outside this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub current: f64,
    pub withdrawn: f64,
}
