//! Collateral, position, stablecoin and bad-debt accounting.
//!
//! The ledger is the single source of truth for balances. Every other
//! component moves value through the transitions defined here. Each transition
//! computes and checks all resulting values first and writes only once
//! everything has passed, so a rejected call leaves the ledger untouched.
//!
//! Conservation, after every call:
//! - `total_stablecoin_issued = Σ stablecoin balances`
//! - `total_unbacked_stablecoin = Σ bad-debt balances`
//! - `total_stablecoin_issued = total_unbacked_stablecoin + Σ pool.total_debt_share × pool.debt_accumulated_rate`
//! - `pool.total_debt_share = Σ position.debt_share` over the pool

use crate::liquidation::LiquidationOutcome;
use crate::math::{MathError, Rad, Ray, SignedWad, Wad};
use crate::pool::{CollateralPoolRegistry, PoolError};
use crate::position::Position;
use crate::types::{Address, PoolId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Arguments of [`Ledger::adjust_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAdjustment {
    pub pool: PoolId,
    pub position: Address,
    /// Free collateral is taken from (or returned to) this address.
    pub collateral_owner: Address,
    /// Minted stablecoin goes to (or repayment comes from) this address.
    pub stablecoin_owner: Address,
    pub collateral_delta: SignedWad,
    pub debt_share_delta: SignedWad,
}

impl PositionAdjustment {
    /// Position, collateral and stablecoin all held by `owner`.
    pub fn by_owner(pool: PoolId, owner: Address, collateral_delta: SignedWad, debt_share_delta: SignedWad) -> Self {
        Self {
            pool,
            position: owner,
            collateral_owner: owner,
            stablecoin_owner: owner,
            collateral_delta,
            debt_share_delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChange {
    pub pool: PoolId,
    pub position: Address,
    pub collateral_delta: SignedWad,
    pub debt_share_delta: SignedWad,
    /// Stablecoin minted (debt up) or burned (debt down), magnitude only.
    pub debt_value_delta: Rad,
    pub after: Position,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    collateral: BTreeMap<(PoolId, Address), Wad>,
    stablecoin: BTreeMap<Address, Rad>,
    system_bad_debt: BTreeMap<Address, Rad>,
    positions: BTreeMap<(PoolId, Address), Position>,
    total_stablecoin_issued: Rad,
    total_unbacked_stablecoin: Rad,
    total_debt_ceiling: Rad,
    // owner -> addresses allowed to move the owner's balances
    whitelist: BTreeMap<Address, BTreeSet<Address>>,
}

impl Ledger {
    pub fn new(total_debt_ceiling: Rad) -> Self {
        Self {
            total_debt_ceiling,
            ..Self::default()
        }
    }

    // 6.0: reads

    pub fn collateral(&self, pool: PoolId, owner: Address) -> Wad {
        self.collateral.get(&(pool, owner)).copied().unwrap_or_default()
    }

    pub fn stablecoin(&self, owner: Address) -> Rad {
        self.stablecoin.get(&owner).copied().unwrap_or_default()
    }

    pub fn system_bad_debt(&self, owner: Address) -> Rad {
        self.system_bad_debt.get(&owner).copied().unwrap_or_default()
    }

    /// Untouched positions read as empty.
    pub fn position(&self, pool: PoolId, position: Address) -> Position {
        self.positions.get(&(pool, position)).copied().unwrap_or_default()
    }

    pub fn positions(&self) -> impl Iterator<Item = (&(PoolId, Address), &Position)> {
        self.positions.iter()
    }

    pub fn pool_positions(&self, pool: PoolId) -> impl Iterator<Item = (Address, &Position)> {
        self.positions
            .range((pool, Address(0))..=(pool, Address(u64::MAX)))
            .map(|((_, address), position)| (*address, position))
    }

    pub fn total_stablecoin_issued(&self) -> Rad {
        self.total_stablecoin_issued
    }

    pub fn total_unbacked_stablecoin(&self) -> Rad {
        self.total_unbacked_stablecoin
    }

    pub fn total_debt_ceiling(&self) -> Rad {
        self.total_debt_ceiling
    }

    pub fn set_total_debt_ceiling(&mut self, value: Rad) -> Rad {
        std::mem::replace(&mut self.total_debt_ceiling, value)
    }

    // 6.1: consent. an owner always acts for itself and may whitelist others.

    pub fn can_modify(&self, owner: Address, caller: Address) -> bool {
        owner == caller
            || self
                .whitelist
                .get(&owner)
                .map_or(false, |allowed| allowed.contains(&caller))
    }

    /// Returns false if `usr` was already allowed.
    pub fn whitelist(&mut self, owner: Address, usr: Address) -> bool {
        self.whitelist.entry(owner).or_default().insert(usr)
    }

    /// Returns false if `usr` was not allowed.
    pub fn blacklist(&mut self, owner: Address, usr: Address) -> bool {
        let Some(allowed) = self.whitelist.get_mut(&owner) else {
            return false;
        };
        let removed = allowed.remove(&usr);
        if allowed.is_empty() {
            self.whitelist.remove(&owner);
        }
        removed
    }

    fn require_consent(&self, owner: Address, caller: Address) -> Result<(), LedgerError> {
        if !self.can_modify(owner, caller) {
            return Err(LedgerError::NotAllowed { owner, caller });
        }
        Ok(())
    }

    // 6.2: balance arithmetic helpers. none of these write.

    fn collateral_after(&self, pool: PoolId, owner: Address, delta: SignedWad) -> Result<Wad, LedgerError> {
        let available = self.collateral(pool, owner);
        delta.apply(available).map_err(|_| LedgerError::InsufficientCollateral {
            owner,
            available,
            requested: delta.magnitude(),
        })
    }

    fn stablecoin_debited(&self, owner: Address, amount: Rad) -> Result<Rad, LedgerError> {
        let available = self.stablecoin(owner);
        available
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientStablecoin {
                owner,
                available,
                requested: amount,
            })
    }

    fn bad_debt_debited(&self, owner: Address, amount: Rad) -> Result<Rad, LedgerError> {
        let available = self.system_bad_debt(owner);
        available
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientBadDebt {
                owner,
                available,
                requested: amount,
            })
    }

    /// Signed free-collateral change. Reserved for collateral adapters.
    pub fn add_collateral(
        &mut self,
        pools: &CollateralPoolRegistry,
        pool: PoolId,
        owner: Address,
        delta: SignedWad,
    ) -> Result<Wad, LedgerError> {
        pools.get(pool)?;
        let next = self.collateral_after(pool, owner, delta)?;
        self.collateral.insert((pool, owner), next);
        Ok(next)
    }

    pub fn move_collateral(
        &mut self,
        caller: Address,
        pool: PoolId,
        src: Address,
        dst: Address,
        amount: Wad,
    ) -> Result<(), LedgerError> {
        self.require_consent(src, caller)?;
        let src_next = self.collateral_after(pool, src, SignedWad::decrease(amount)?)?;
        if src == dst {
            return Ok(());
        }
        let dst_next = self.collateral(pool, dst).checked_add(amount)?;
        self.collateral.insert((pool, src), src_next);
        self.collateral.insert((pool, dst), dst_next);
        Ok(())
    }

    pub fn move_stablecoin(
        &mut self,
        caller: Address,
        src: Address,
        dst: Address,
        amount: Rad,
    ) -> Result<(), LedgerError> {
        self.require_consent(src, caller)?;
        let src_next = self.stablecoin_debited(src, amount)?;
        if src == dst {
            return Ok(());
        }
        let dst_next = self.stablecoin(dst).checked_add(amount)?;
        self.stablecoin.insert(src, src_next);
        self.stablecoin.insert(dst, dst_next);
        Ok(())
    }

    // 6.3: the main position transition. check order:
    //   pool initialized, ceilings (debt up), position ceiling (debt up),
    //   safety (risk up), position consent (risk up), collateral consent (locking),
    //   stablecoin consent (repaying), debt floor, funds
    pub fn adjust_position(
        &mut self,
        pools: &mut CollateralPoolRegistry,
        caller: Address,
        adjustment: &PositionAdjustment,
    ) -> Result<PositionChange, LedgerError> {
        let PositionAdjustment {
            pool: pool_id,
            position: position_address,
            collateral_owner,
            stablecoin_owner,
            collateral_delta,
            debt_share_delta,
        } = *adjustment;

        let pool = pools.get(pool_id)?;
        let rate = pool.debt_accumulated_rate;
        let before = self.position(pool_id, position_address);

        let after = before
            .adjusted(collateral_delta, debt_share_delta)
            .map_err(|_| LedgerError::PositionUnderflow {
                pool: pool_id,
                position: position_address,
            })?;
        let total_debt_share = debt_share_delta.apply(pool.total_debt_share)?;
        let debt_value_delta = debt_share_delta.magnitude().mul_ray(rate)?;
        let position_debt = after.debt_value(rate)?;

        let issued = if debt_share_delta.is_negative() {
            self.total_stablecoin_issued.checked_sub(debt_value_delta)?
        } else {
            self.total_stablecoin_issued.checked_add(debt_value_delta)?
        };

        if debt_share_delta.is_positive() {
            let pool_debt = total_debt_share.mul_ray(rate)?;
            if pool_debt > pool.debt_ceiling {
                return Err(LedgerError::PoolCeilingExceeded {
                    pool: pool_id,
                    debt: pool_debt,
                    ceiling: pool.debt_ceiling,
                });
            }
            if issued > self.total_debt_ceiling {
                return Err(LedgerError::GlobalCeilingExceeded {
                    issued,
                    ceiling: self.total_debt_ceiling,
                });
            }
            if position_debt > pool.position_debt_ceiling {
                return Err(LedgerError::PositionCeilingExceeded {
                    pool: pool_id,
                    debt: position_debt,
                    ceiling: pool.position_debt_ceiling,
                });
            }
        }

        if Position::risk_increases(collateral_delta, debt_share_delta) {
            if !pool.is_safe(after.locked_collateral, after.debt_share)? {
                return Err(LedgerError::NotSafe {
                    pool: pool_id,
                    position: position_address,
                });
            }
            self.require_consent(position_address, caller)?;
        }
        if collateral_delta.is_positive() {
            self.require_consent(collateral_owner, caller)?;
        }
        if debt_share_delta.is_negative() {
            self.require_consent(stablecoin_owner, caller)?;
        }

        if !after.respects_floor(rate, pool.debt_floor)? {
            return Err(LedgerError::BelowDebtFloor {
                pool: pool_id,
                position: position_address,
                debt: position_debt,
                floor: pool.debt_floor,
            });
        }

        // locking collateral debits the free balance, unlocking credits it
        let free_delta = collateral_delta.checked_neg()?;
        let collateral_next = self.collateral_after(pool_id, collateral_owner, free_delta)?;
        let stablecoin_next = if debt_share_delta.is_negative() {
            self.stablecoin_debited(stablecoin_owner, debt_value_delta)?
        } else {
            self.stablecoin(stablecoin_owner).checked_add(debt_value_delta)?
        };

        // all checks passed
        pools.get_mut(pool_id)?.total_debt_share = total_debt_share;
        self.positions.insert((pool_id, position_address), after);
        self.collateral.insert((pool_id, collateral_owner), collateral_next);
        self.stablecoin.insert(stablecoin_owner, stablecoin_next);
        self.total_stablecoin_issued = issued;

        Ok(PositionChange {
            pool: pool_id,
            position: position_address,
            collateral_delta,
            debt_share_delta,
            debt_value_delta,
            after,
        })
    }

    /// Moves collateral and debt share from `src` to `dst` within one pool.
    /// Both sides must consent and both results must be safe and above the floor.
    pub fn move_position(
        &mut self,
        pools: &CollateralPoolRegistry,
        caller: Address,
        pool: PoolId,
        src: Address,
        dst: Address,
        collateral_delta: SignedWad,
        debt_share_delta: SignedWad,
    ) -> Result<(Position, Position), LedgerError> {
        let record = pools.get(pool)?;
        let rate = record.debt_accumulated_rate;
        if src == dst {
            self.require_consent(src, caller)?;
            let current = self.position(pool, src);
            return Ok((current, current));
        }

        let src_after = self
            .position(pool, src)
            .adjusted(collateral_delta.checked_neg()?, debt_share_delta.checked_neg()?)
            .map_err(|_| LedgerError::PositionUnderflow { pool, position: src })?;
        let dst_after = self
            .position(pool, dst)
            .adjusted(collateral_delta, debt_share_delta)
            .map_err(|_| LedgerError::PositionUnderflow { pool, position: dst })?;

        self.require_consent(src, caller)?;
        self.require_consent(dst, caller)?;

        for (address, after) in [(src, src_after), (dst, dst_after)] {
            if !record.is_safe(after.locked_collateral, after.debt_share)? {
                return Err(LedgerError::NotSafe { pool, position: address });
            }
            if !after.respects_floor(rate, record.debt_floor)? {
                return Err(LedgerError::BelowDebtFloor {
                    pool,
                    position: address,
                    debt: after.debt_value(rate)?,
                    floor: record.debt_floor,
                });
            }
        }

        self.positions.insert((pool, src), src_after);
        self.positions.insert((pool, dst), dst_after);
        Ok((src_after, dst_after))
    }

    // 6.4: liquidation settlement. confiscates the liquidated share without safety or
    // consent checks, collects the repayment from the liquidator, burns it against the
    // confiscated debt and splits the seized collateral. one write phase for all of it.
    pub fn apply_liquidation(
        &mut self,
        pools: &mut CollateralPoolRegistry,
        pool: PoolId,
        position: Address,
        liquidator: Address,
        recipient: Address,
        surplus_engine: Address,
        outcome: &LiquidationOutcome,
    ) -> Result<Position, LedgerError> {
        let record = pools.get(pool)?;
        let before = self.position(pool, position);
        let after = Position {
            locked_collateral: before
                .locked_collateral
                .checked_sub(outcome.collateral_seized)
                .map_err(|_| LedgerError::PositionUnderflow { pool, position })?,
            debt_share: before
                .debt_share
                .checked_sub(outcome.debt_share_liquidated)
                .map_err(|_| LedgerError::PositionUnderflow { pool, position })?,
        };
        let total_debt_share = record.total_debt_share.checked_sub(outcome.debt_share_liquidated)?;
        let debt_value = outcome.debt_share_liquidated.mul_ray(record.debt_accumulated_rate)?;
        let repaid = outcome.actual_debt_value_repaid;

        // confiscated value becomes bad debt, the repayment settles it straight away
        let bad_debt = self
            .system_bad_debt(surplus_engine)
            .checked_add(debt_value)?
            .checked_sub(repaid)?;
        let unbacked = self
            .total_unbacked_stablecoin
            .checked_add(debt_value)?
            .checked_sub(repaid)?;
        let liquidator_stablecoin = self.stablecoin_debited(liquidator, repaid)?;
        let issued = self.total_stablecoin_issued.checked_sub(repaid)?;

        let split = outcome
            .collateral_to_liquidator
            .checked_add(outcome.treasury_fee)?;
        if split != outcome.collateral_seized {
            return Err(LedgerError::UnbalancedSeizure {
                seized: outcome.collateral_seized,
                distributed: split,
            });
        }
        let recipient_collateral = self
            .collateral(pool, recipient)
            .checked_add(outcome.collateral_to_liquidator)?;
        // recipient and surplus engine may coincide
        let surplus_base = if recipient == surplus_engine {
            recipient_collateral
        } else {
            self.collateral(pool, surplus_engine)
        };
        let surplus_collateral = surplus_base.checked_add(outcome.treasury_fee)?;

        pools.get_mut(pool)?.total_debt_share = total_debt_share;
        self.positions.insert((pool, position), after);
        self.system_bad_debt.insert(surplus_engine, bad_debt);
        self.total_unbacked_stablecoin = unbacked;
        self.stablecoin.insert(liquidator, liquidator_stablecoin);
        self.total_stablecoin_issued = issued;
        self.collateral.insert((pool, recipient), recipient_collateral);
        self.collateral.insert((pool, surplus_engine), surplus_collateral);
        Ok(after)
    }

    /// Creates stablecoin against bad debt recorded on `debt_holder`.
    pub fn mint_unbacked_stablecoin(
        &mut self,
        debt_holder: Address,
        to: Address,
        amount: Rad,
    ) -> Result<(), LedgerError> {
        let bad_debt = self.system_bad_debt(debt_holder).checked_add(amount)?;
        let unbacked = self.total_unbacked_stablecoin.checked_add(amount)?;
        let balance = self.stablecoin(to).checked_add(amount)?;
        let issued = self.total_stablecoin_issued.checked_add(amount)?;

        self.system_bad_debt.insert(debt_holder, bad_debt);
        self.total_unbacked_stablecoin = unbacked;
        self.stablecoin.insert(to, balance);
        self.total_stablecoin_issued = issued;
        Ok(())
    }

    /// Burns `amount` of both stablecoin and bad debt held by `holder`.
    pub fn settle_system_bad_debt(&mut self, holder: Address, amount: Rad) -> Result<(), LedgerError> {
        let balance = self.stablecoin_debited(holder, amount)?;
        let bad_debt = self.bad_debt_debited(holder, amount)?;
        let unbacked = self.total_unbacked_stablecoin.checked_sub(amount)?;
        let issued = self.total_stablecoin_issued.checked_sub(amount)?;

        self.stablecoin.insert(holder, balance);
        self.system_bad_debt.insert(holder, bad_debt);
        self.total_unbacked_stablecoin = unbacked;
        self.total_stablecoin_issued = issued;
        Ok(())
    }

    /// Raises the pool's accumulated rate to `new_rate` and credits the growth of
    /// existing debt to `surplus`. Returns the accrued value.
    pub fn accrue_stability_fee(
        &mut self,
        pools: &mut CollateralPoolRegistry,
        pool: PoolId,
        surplus: Address,
        new_rate: Ray,
        now: Timestamp,
    ) -> Result<Rad, LedgerError> {
        let record = pools.get(pool)?;
        let rate_delta = new_rate
            .checked_sub(record.debt_accumulated_rate)
            .map_err(|_| LedgerError::RateDecrease { pool })?;
        let accrued = record.total_debt_share.mul_ray(rate_delta)?;
        let balance = self.stablecoin(surplus).checked_add(accrued)?;
        let issued = self.total_stablecoin_issued.checked_add(accrued)?;

        let record = pools.get_mut(pool)?;
        record.debt_accumulated_rate = new_rate;
        record.last_accrual_time = now;
        self.stablecoin.insert(surplus, balance);
        self.total_stablecoin_issued = issued;
        Ok(accrued)
    }

    // 6.5: conservation check, used by tests and the simulator after every step
    pub fn check_invariants(&self, pools: &CollateralPoolRegistry) -> Result<(), String> {
        let stablecoin_sum = sum_rad(self.stablecoin.values())?;
        if stablecoin_sum != self.total_stablecoin_issued {
            return Err(format!(
                "stablecoin balances {} != issued {}",
                stablecoin_sum, self.total_stablecoin_issued
            ));
        }

        let bad_debt_sum = sum_rad(self.system_bad_debt.values())?;
        if bad_debt_sum != self.total_unbacked_stablecoin {
            return Err(format!(
                "bad debt balances {} != unbacked {}",
                bad_debt_sum, self.total_unbacked_stablecoin
            ));
        }

        let mut backed = Rad::zero();
        for pool in pools.pools() {
            let share_sum = self
                .pool_positions(pool.id)
                .try_fold(Wad::zero(), |acc, (_, p)| acc.checked_add(p.debt_share))
                .map_err(|e| e.to_string())?;
            if share_sum != pool.total_debt_share {
                return Err(format!(
                    "{} positions hold {} share, pool records {}",
                    pool.id, share_sum, pool.total_debt_share
                ));
            }
            let value = pool.total_debt_value().map_err(|e| e.to_string())?;
            backed = backed.checked_add(value).map_err(|e| e.to_string())?;
        }
        let expected = backed
            .checked_add(self.total_unbacked_stablecoin)
            .map_err(|e| e.to_string())?;
        if expected != self.total_stablecoin_issued {
            return Err(format!(
                "issued {} != unbacked {} + pool debt {}",
                self.total_stablecoin_issued, self.total_unbacked_stablecoin, backed
            ));
        }
        Ok(())
    }
}

fn sum_rad<'a>(mut values: impl Iterator<Item = &'a Rad>) -> Result<Rad, String> {
    values.try_fold(Rad::zero(), |acc, v| acc.checked_add(*v).map_err(|e| e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error("{caller} is not allowed to modify {owner}")]
    NotAllowed { owner: Address, caller: Address },

    #[error("{pool} debt {debt} over ceiling {ceiling}")]
    PoolCeilingExceeded { pool: PoolId, debt: Rad, ceiling: Rad },

    #[error("Total issuance {issued} over global ceiling {ceiling}")]
    GlobalCeilingExceeded { issued: Rad, ceiling: Rad },

    #[error("{pool} position debt {debt} over position ceiling {ceiling}")]
    PositionCeilingExceeded { pool: PoolId, debt: Rad, ceiling: Rad },

    #[error("Position {position} in {pool} would not be safe")]
    NotSafe { pool: PoolId, position: Address },

    #[error("Position {position} in {pool} debt {debt} under floor {floor}")]
    BelowDebtFloor { pool: PoolId, position: Address, debt: Rad, floor: Rad },

    #[error("Position {position} in {pool} cannot go below zero")]
    PositionUnderflow { pool: PoolId, position: Address },

    #[error("{owner} has {available} free collateral, needs {requested}")]
    InsufficientCollateral { owner: Address, available: Wad, requested: Wad },

    #[error("{owner} has {available} stablecoin, needs {requested}")]
    InsufficientStablecoin { owner: Address, available: Rad, requested: Rad },

    #[error("{owner} has {available} bad debt, cannot settle {requested}")]
    InsufficientBadDebt { owner: Address, available: Rad, requested: Rad },

    #[error("Accumulated rate of {pool} cannot decrease")]
    RateDecrease { pool: PoolId },

    #[error("Seized {seized} but distributed {distributed}")]
    UnbalancedSeizure { seized: Wad, distributed: Wad },
}
