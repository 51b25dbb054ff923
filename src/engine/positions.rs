//! Position management and balance transfers.
//!
//! Two ways in: direct ledger calls keyed by address, checked against ledger
//! consent, and registry calls keyed by [`PositionId`], checked against the
//! position registry. Registry calls act as the position's own address, so
//! collateral is staged on that address and minted stablecoin lands there
//! until moved out with [`Engine::move_stablecoin_from_position`].

use super::core::Engine;
use super::results::EngineError;
use crate::access::Role;
use crate::events::{
    CollateralAddedEvent, CollateralMovedEvent, EventPayload, PositionMovedEvent, PositionOpenedEvent,
    StablecoinMovedEvent,
};
use crate::ledger::{PositionAdjustment, PositionChange};
use crate::math::{Rad, SignedWad, Wad};
use crate::position::Position;
use crate::registry::{PositionRecord, PositionRegistry};
use crate::types::{Address, PoolId, PositionId};

impl Engine {
    /// Allocates a new position in `pool` owned by `owner`. Opening on someone
    /// else's behalf needs the position manager role.
    pub fn open_position(&mut self, caller: Address, owner: Address, pool: PoolId) -> Result<PositionId, EngineError> {
        self.require_live()?;
        if caller != owner {
            self.require_role(caller, Role::PositionManager)?;
        }
        self.pools.get(pool)?;

        let id = self.positions.open(owner, pool);
        let position = self.positions.resolve(id).ok_or(EngineError::PositionNotFound(id))?;
        self.emit_event(
            caller,
            EventPayload::PositionOpened(PositionOpenedEvent {
                id,
                pool,
                owner,
                position,
            }),
        );
        Ok(id)
    }

    pub fn position_record(&self, id: PositionId) -> Option<&PositionRecord> {
        self.positions.record(id)
    }

    pub fn positions_of(&self, owner: Address) -> Vec<PositionId> {
        self.positions.positions_of(owner)
    }

    pub fn transfer_position(&mut self, caller: Address, id: PositionId, to: Address) -> Result<(), EngineError> {
        self.require_unpaused()?;
        self.positions.transfer(id, caller, to)?;
        Ok(())
    }

    pub fn set_position_manager(
        &mut self,
        caller: Address,
        id: PositionId,
        manager: Address,
        allowed: bool,
    ) -> Result<(), EngineError> {
        self.require_unpaused()?;
        self.positions.set_manager(id, caller, manager, allowed)?;
        Ok(())
    }

    /// Resolves `id` and checks `caller` may act on it. Returns `(pool, position address)`.
    fn authorize_position(&self, caller: Address, id: PositionId) -> Result<(PoolId, Address), EngineError> {
        let registry = &self.positions;
        let (Some(owner), Some(pool), Some(position)) = (registry.owner_of(id), registry.pool_of(id), registry.resolve(id))
        else {
            return Err(EngineError::PositionNotFound(id));
        };
        if !registry.is_authorized(owner, id, caller) {
            return Err(EngineError::NotPositionOwner { caller, id });
        }
        Ok((pool, position))
    }

    // 8.8: direct ledger path

    /// Signed change to `owner`'s free collateral. Collateral adapters only.
    pub fn add_collateral(
        &mut self,
        caller: Address,
        pool: PoolId,
        owner: Address,
        delta: SignedWad,
    ) -> Result<Wad, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::CollateralAdapter)?;
        let new_balance = self.ledger.add_collateral(&self.pools, pool, owner, delta)?;
        self.emit_event(
            caller,
            EventPayload::CollateralAdded(CollateralAddedEvent {
                pool,
                owner,
                delta,
                new_balance,
            }),
        );
        Ok(new_balance)
    }

    pub fn adjust_position(
        &mut self,
        caller: Address,
        adjustment: &PositionAdjustment,
    ) -> Result<PositionChange, EngineError> {
        self.require_live()?;
        let change = self.ledger.adjust_position(&mut self.pools, caller, adjustment)?;
        tracing::debug!(
            pool = %change.pool,
            position = %change.position,
            collateral_delta = %change.collateral_delta,
            debt_share_delta = %change.debt_share_delta,
            "position adjusted"
        );
        self.emit_event(caller, EventPayload::PositionAdjusted(change.clone()));
        Ok(change)
    }

    pub fn move_position(
        &mut self,
        caller: Address,
        pool: PoolId,
        src: Address,
        dst: Address,
        collateral_delta: SignedWad,
        debt_share_delta: SignedWad,
    ) -> Result<(Position, Position), EngineError> {
        self.require_live()?;
        let result = self
            .ledger
            .move_position(&self.pools, caller, pool, src, dst, collateral_delta, debt_share_delta)?;
        self.emit_event(
            caller,
            EventPayload::PositionMoved(PositionMovedEvent {
                pool,
                src,
                dst,
                collateral_delta,
                debt_share_delta,
            }),
        );
        Ok(result)
    }

    pub fn move_collateral(
        &mut self,
        caller: Address,
        pool: PoolId,
        src: Address,
        dst: Address,
        amount: Wad,
    ) -> Result<(), EngineError> {
        self.require_unpaused()?;
        self.ledger.move_collateral(caller, pool, src, dst, amount)?;
        self.emit_event(
            caller,
            EventPayload::CollateralMoved(CollateralMovedEvent { pool, src, dst, amount }),
        );
        Ok(())
    }

    pub fn move_stablecoin(&mut self, caller: Address, src: Address, dst: Address, amount: Rad) -> Result<(), EngineError> {
        self.require_unpaused()?;
        self.ledger.move_stablecoin(caller, src, dst, amount)?;
        self.emit_event(caller, EventPayload::StablecoinMoved(StablecoinMovedEvent { src, dst, amount }));
        Ok(())
    }

    // 8.9: registry path. the position address is both the position and the
    // holder of its staged collateral and minted stablecoin

    pub fn adjust_position_by_id(
        &mut self,
        caller: Address,
        id: PositionId,
        collateral_delta: SignedWad,
        debt_share_delta: SignedWad,
    ) -> Result<PositionChange, EngineError> {
        self.require_live()?;
        let (pool, position) = self.authorize_position(caller, id)?;
        let adjustment = PositionAdjustment::by_owner(pool, position, collateral_delta, debt_share_delta);
        let change = self.ledger.adjust_position(&mut self.pools, position, &adjustment)?;
        self.emit_event(caller, EventPayload::PositionAdjusted(change.clone()));
        Ok(change)
    }

    pub fn move_collateral_from_position(
        &mut self,
        caller: Address,
        id: PositionId,
        dst: Address,
        amount: Wad,
    ) -> Result<(), EngineError> {
        self.require_unpaused()?;
        let (pool, position) = self.authorize_position(caller, id)?;
        self.ledger.move_collateral(position, pool, position, dst, amount)?;
        self.emit_event(
            caller,
            EventPayload::CollateralMoved(CollateralMovedEvent {
                pool,
                src: position,
                dst,
                amount,
            }),
        );
        Ok(())
    }

    pub fn move_stablecoin_from_position(
        &mut self,
        caller: Address,
        id: PositionId,
        dst: Address,
        amount: Rad,
    ) -> Result<(), EngineError> {
        self.require_unpaused()?;
        let (_, position) = self.authorize_position(caller, id)?;
        self.ledger.move_stablecoin(position, position, dst, amount)?;
        self.emit_event(
            caller,
            EventPayload::StablecoinMoved(StablecoinMovedEvent {
                src: position,
                dst,
                amount,
            }),
        );
        Ok(())
    }

    /// Ledger position behind `id`.
    pub fn position_by_id(&self, id: PositionId) -> Option<Position> {
        let record = self.positions.record(id)?;
        Some(self.ledger.position(record.pool, record.position_address))
    }
}
