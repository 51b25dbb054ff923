// 3.0: capability checks. roles are a closed set, checked inline with has_role.
// administration of who holds what is out of scope, the table is just grant/revoke.

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner,
    Gov,
    PriceOracle,
    PositionManager,
    Liquidator,
    CollateralAdapter,
    Mintable,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Owner,
        Role::Gov,
        Role::PriceOracle,
        Role::PositionManager,
        Role::Liquidator,
        Role::CollateralAdapter,
        Role::Mintable,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "OWNER_ROLE",
            Role::Gov => "GOV_ROLE",
            Role::PriceOracle => "PRICE_ORACLE_ROLE",
            Role::PositionManager => "POSITION_MANAGER_ROLE",
            Role::Liquidator => "LIQUIDATION_ENGINE_ROLE",
            Role::CollateralAdapter => "ADAPTER_ROLE",
            Role::Mintable => "MINTABLE_ROLE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    grants: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    /// Table with every role granted to `owner`.
    pub fn with_owner(owner: Address) -> Self {
        let mut table = Self::default();
        for role in Role::ALL {
            table.grant_role(role, owner);
        }
        table
    }

    pub fn has_role(&self, who: Address, role: Role) -> bool {
        self.grants.get(&role).map_or(false, |holders| holders.contains(&who))
    }

    /// Returns false if `who` already held the role.
    pub fn grant_role(&mut self, role: Role, who: Address) -> bool {
        self.grants.entry(role).or_default().insert(who)
    }

    /// Returns false if `who` did not hold the role.
    pub fn revoke_role(&mut self, role: Role, who: Address) -> bool {
        self.grants.get_mut(&role).map_or(false, |holders| holders.remove(&who))
    }

    pub fn holders(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.grants.get(&role).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_table_holds_every_role() {
        let owner = Address(1);
        let table = AccessControl::with_owner(owner);
        for role in Role::ALL {
            assert!(table.has_role(owner, role), "{} missing", role);
        }
        assert!(!table.has_role(Address(2), Role::Liquidator));
    }

    #[test]
    fn grant_and_revoke_are_idempotent() {
        let mut table = AccessControl::default();
        let keeper = Address(7);
        assert!(table.grant_role(Role::Liquidator, keeper));
        assert!(!table.grant_role(Role::Liquidator, keeper));
        assert_eq!(table.holders(Role::Liquidator).count(), 1);

        assert!(table.revoke_role(Role::Liquidator, keeper));
        assert!(!table.revoke_role(Role::Liquidator, keeper));
        assert!(!table.has_role(keeper, Role::Liquidator));
    }
}
