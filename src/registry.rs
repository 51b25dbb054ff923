//! Position ownership registry.
//!
//! The ledger keys positions by address. Users hold opaque [`PositionId`]s, and
//! the registry resolves an id to the position address and answers who may act
//! on it. [`InMemoryPositionRegistry`] keeps records in an arena indexed by id
//! with an ordered per-owner index for enumeration.

use crate::types::{Address, PoolId, PositionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Position addresses are allocated above this base so they never collide with user addresses.
pub const POSITION_ADDRESS_BASE: u64 = 1 << 48;

pub trait PositionRegistry {
    /// Position address for `id`, if it exists.
    fn resolve(&self, id: PositionId) -> Option<Address>;

    fn owner_of(&self, id: PositionId) -> Option<Address>;

    fn pool_of(&self, id: PositionId) -> Option<PoolId>;

    /// True when `owner` owns `id` and `caller` is that owner or an approved manager.
    fn is_authorized(&self, owner: Address, id: PositionId, caller: Address) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: PositionId,
    pub pool: PoolId,
    pub position_address: Address,
    pub owner: Address,
    pub managers: BTreeSet<Address>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryPositionRegistry {
    // index = id - 1
    records: Vec<PositionRecord>,
    by_owner: BTreeMap<Address, BTreeSet<PositionId>>,
}

impl InMemoryPositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, owner: Address, pool: PoolId) -> PositionId {
        let id = PositionId(self.records.len() as u64 + 1);
        self.records.push(PositionRecord {
            id,
            pool,
            position_address: Address(POSITION_ADDRESS_BASE + id.0),
            owner,
            managers: BTreeSet::new(),
        });
        self.by_owner.entry(owner).or_default().insert(id);
        id
    }

    pub fn record(&self, id: PositionId) -> Option<&PositionRecord> {
        let index = id.0.checked_sub(1)? as usize;
        self.records.get(index)
    }

    fn record_mut(&mut self, id: PositionId) -> Result<&mut PositionRecord, RegistryError> {
        let index = id.0.checked_sub(1).ok_or(RegistryError::UnknownPosition(id))? as usize;
        self.records.get_mut(index).ok_or(RegistryError::UnknownPosition(id))
    }

    /// Ids owned by `owner`, ascending.
    pub fn positions_of(&self, owner: Address) -> Vec<PositionId> {
        self.by_owner
            .get(&owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Only the current owner may transfer. Managers are cleared on transfer.
    pub fn transfer(&mut self, id: PositionId, caller: Address, to: Address) -> Result<(), RegistryError> {
        let record = self.record_mut(id)?;
        if record.owner != caller {
            return Err(RegistryError::NotOwner { id, caller });
        }
        let from = record.owner;
        record.owner = to;
        record.managers.clear();

        if let Some(ids) = self.by_owner.get_mut(&from) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_owner.remove(&from);
            }
        }
        self.by_owner.entry(to).or_default().insert(id);
        Ok(())
    }

    pub fn set_manager(
        &mut self,
        id: PositionId,
        caller: Address,
        manager: Address,
        allowed: bool,
    ) -> Result<(), RegistryError> {
        let record = self.record_mut(id)?;
        if record.owner != caller {
            return Err(RegistryError::NotOwner { id, caller });
        }
        if allowed {
            record.managers.insert(manager);
        } else {
            record.managers.remove(&manager);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PositionRegistry for InMemoryPositionRegistry {
    fn resolve(&self, id: PositionId) -> Option<Address> {
        self.record(id).map(|r| r.position_address)
    }

    fn owner_of(&self, id: PositionId) -> Option<Address> {
        self.record(id).map(|r| r.owner)
    }

    fn pool_of(&self, id: PositionId) -> Option<PoolId> {
        self.record(id).map(|r| r.pool)
    }

    fn is_authorized(&self, owner: Address, id: PositionId, caller: Address) -> bool {
        match self.record(id) {
            Some(record) if record.owner == owner => {
                caller == owner || record.managers.contains(&caller)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Position {0:?} not found")]
    UnknownPosition(PositionId),

    #[error("{caller} does not own position {id:?}")]
    NotOwner { id: PositionId, caller: Address },
}
