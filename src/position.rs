// 5.0: a position is locked collateral plus debt share inside one pool.
// debt value is never stored, it is debt_share * the pool's accumulated rate.

use crate::math::{MathError, Rad, Ray, SignedWad, Wad};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub locked_collateral: Wad,
    pub debt_share: Wad,
}

impl Position {
    pub fn new(locked_collateral: Wad, debt_share: Wad) -> Self {
        Self {
            locked_collateral,
            debt_share,
        }
    }

    /// No debt left. Collateral may still be locked.
    pub fn is_closed(&self) -> bool {
        self.debt_share.is_zero()
    }

    pub fn is_empty(&self) -> bool {
        self.locked_collateral.is_zero() && self.debt_share.is_zero()
    }

    pub fn debt_value(&self, rate: Ray) -> Result<Rad, MathError> {
        self.debt_share.mul_ray(rate)
    }

    // 5.1: new position after signed deltas. fails if either side would go negative.
    pub fn adjusted(&self, collateral_delta: SignedWad, debt_share_delta: SignedWad) -> Result<Position, MathError> {
        Ok(Position {
            locked_collateral: collateral_delta.apply(self.locked_collateral)?,
            debt_share: debt_share_delta.apply(self.debt_share)?,
        })
    }

    /// Risk goes up when debt grows or collateral shrinks.
    pub fn risk_increases(collateral_delta: SignedWad, debt_share_delta: SignedWad) -> bool {
        debt_share_delta.is_positive() || collateral_delta.is_negative()
    }

    // 5.2: debt floor. a position is either closed or carries at least the floor in value.
    pub fn respects_floor(&self, rate: Ray, debt_floor: Rad) -> Result<bool, MathError> {
        Ok(self.is_closed() || self.debt_value(rate)? >= debt_floor)
    }
}
