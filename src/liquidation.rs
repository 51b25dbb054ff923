//! Fixed-spread liquidation.
//!
//! A liquidator repays part of an unsafe position's debt and receives collateral
//! worth the repaid value plus a fixed incentive. Three caps interact:
//!
//! 1. collateral exhaustion: if repaying the whole debt would need more
//!    collateral than is locked, everything is seized, the whole debt is written
//!    off and the uncovered part becomes bad debt. This overrides the other two.
//! 2. close factor: at most `close_factor_bps / 10000` of the debt share per call.
//! 3. debt floor: if the clamped repayment would leave `0 < debt < floor`, the
//!    position is closed fully instead.
//!
//! This module only computes the outcome. The ledger applies it atomically.

use crate::math::{MathError, Rad, Ray, Wad};
use crate::pool::CollateralPool;
use crate::position::Position;
use serde::{Deserialize, Serialize};

/// Pool parameters the strategy reads, detached from the pool record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedSpreadParams {
    pub debt_accumulated_rate: Ray,
    pub debt_floor: Rad,
    pub close_factor_bps: u32,
    pub liquidator_incentive_bps: u32,
    pub treasury_fee_bps: u32,
}

impl From<&CollateralPool> for FixedSpreadParams {
    fn from(pool: &CollateralPool) -> Self {
        Self {
            debt_accumulated_rate: pool.debt_accumulated_rate,
            debt_floor: pool.debt_floor,
            close_factor_bps: pool.close_factor_bps,
            liquidator_incentive_bps: pool.liquidator_incentive_bps,
            treasury_fee_bps: pool.treasury_fee_bps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Debt share removed from the position.
    pub debt_share_liquidated: Wad,
    /// Value of the removed share at the current rate.
    pub debt_value_liquidated: Rad,
    /// Stablecoin the liquidator pays.
    pub actual_debt_value_repaid: Rad,
    pub collateral_seized: Wad,
    /// Seized collateral above the repaid value.
    pub liquidator_incentive: Wad,
    /// Protocol cut of the incentive.
    pub treasury_fee: Wad,
    pub collateral_to_liquidator: Wad,
    /// `debt_value_liquidated - actual_debt_value_repaid`
    pub bad_debt: Rad,
    pub full_closure: bool,
    pub collateral_exhausted: bool,
}

impl LiquidationOutcome {
    pub fn is_empty(&self) -> bool {
        self.debt_share_liquidated.is_zero()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSpreadStrategy;

impl FixedSpreadStrategy {
    /// Outcome of liquidating `position` with `debt_share_requested` at the
    /// unmargined `raw_price` (RAY).
    pub fn execute(
        &self,
        params: &FixedSpreadParams,
        position: &Position,
        debt_share_requested: Wad,
        raw_price: Ray,
    ) -> Result<LiquidationOutcome, MathError> {
        let rate = params.debt_accumulated_rate;
        let incentive_bps = params.liquidator_incentive_bps;
        let position_debt_value = position.debt_value(rate)?;

        // whole-debt seizure decides exhaustion before any clamp
        let full_seizure = position_debt_value.mul_bps(incentive_bps)?.div_ray(raw_price)?;

        let (debt_share, debt_value, repaid, seized, full_closure, exhausted) =
            if full_seizure > position.locked_collateral {
                let seized = position.locked_collateral;
                let repaid = seized.mul_ray(raw_price)?.div_bps(incentive_bps)?;
                (position.debt_share, position_debt_value, repaid, seized, true, true)
            } else {
                let close_factor_cap = position.debt_share.mul_bps(params.close_factor_bps)?;
                let mut clamped = debt_share_requested.min(close_factor_cap);

                let remaining_value = position.debt_share.checked_sub(clamped)?.mul_ray(rate)?;
                if !remaining_value.is_zero() && remaining_value < params.debt_floor {
                    clamped = position.debt_share;
                }

                let value = clamped.mul_ray(rate)?;
                let seized = value.mul_bps(incentive_bps)?.div_ray(raw_price)?;
                (clamped, value, value, seized, clamped == position.debt_share, false)
            };

        let (liquidator_incentive, treasury_fee, collateral_to_liquidator) =
            split_seizure(seized, incentive_bps, params.treasury_fee_bps)?;

        Ok(LiquidationOutcome {
            debt_share_liquidated: debt_share,
            debt_value_liquidated: debt_value,
            actual_debt_value_repaid: repaid,
            collateral_seized: seized,
            liquidator_incentive,
            treasury_fee,
            collateral_to_liquidator,
            bad_debt: debt_value.checked_sub(repaid)?,
            full_closure: full_closure && !debt_share.is_zero(),
            collateral_exhausted: exhausted,
        })
    }
}

/// `(incentive, treasury_fee, to_liquidator)`. `to_liquidator + treasury_fee == seized` exactly.
pub fn split_seizure(seized: Wad, incentive_bps: u32, treasury_fee_bps: u32) -> Result<(Wad, Wad, Wad), MathError> {
    let incentive = seized.checked_sub(seized.div_bps(incentive_bps)?)?;
    let treasury_fee = incentive.mul_bps(treasury_fee_bps)?;
    let to_liquidator = seized.checked_sub(treasury_fee)?;
    Ok((incentive, treasury_fee, to_liquidator))
}
