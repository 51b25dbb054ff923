// 1.0: all the primitives live here. nothing in the engine works without these types.
// pool ids, addresses, position ids, timestamps. each is a newtype so the compiler catches mixups.
// fixed point amounts (Wad/Ray/Rad) live in math.rs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One collateral type (e.g. WXDC). Pools are created once and never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u32);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

// 1.1: anything that can hold balances: users, position handlers, protocol modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    /// Default holder of protocol surplus and bad debt.
    pub const SYSTEM_DEBT_ENGINE: Address = Address(u64::MAX);
    /// Default deployer / owner of a fresh engine.
    pub const DEPLOYER: Address = Address(u64::MAX - 1);
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Opaque handle issued by the position registry. Resolves to a position address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

// 1.2: second timestamp. stability fees compound per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp().max(0) as u64)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds from `self` to `later`, zero if `later` is not after `self`.
    pub fn elapsed_until(&self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0)
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_never_negative() {
        let t0 = Timestamp::from_secs(1_000);
        let t1 = Timestamp::from_secs(1_600);
        assert_eq!(t0.elapsed_until(t1), 600);
        assert_eq!(t1.elapsed_until(t0), 0);
    }

    #[test]
    fn now_reads_the_wall_clock() {
        // 2020-09-13
        assert!(Timestamp::now().as_secs() > 1_600_000_000);
    }

    #[test]
    fn system_addresses_are_distinct() {
        assert_ne!(Address::SYSTEM_DEBT_ENGINE, Address::DEPLOYER);
        assert_eq!(Address(255).to_string(), "0x00000000000000ff");
    }
}
