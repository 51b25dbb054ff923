// 7.0: stability fee accrual. each pool compounds its per-second fee into the
// shared accumulated rate. debt shares never change, their value grows with the rate.
// 7.1 is the accrual calculation, the engine applies it through the ledger.

use crate::math::{MathError, Rad, Ray};
use crate::pool::CollateralPool;
use crate::types::{PoolId, Timestamp};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_YEAR: u64 = 31_536_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccrual {
    pub pool: PoolId,
    pub elapsed: u64,
    pub previous_rate: Ray,
    pub new_rate: Ray,
    /// `total_debt_share * (new_rate - previous_rate)`, credited to surplus.
    pub accrued: Rad,
}

// 7.1: new_rate = old * fee^elapsed. None when no time has passed.
pub fn compute_accrual(pool: &CollateralPool, now: Timestamp) -> Result<Option<FeeAccrual>, MathError> {
    let elapsed = pool.last_accrual_time.elapsed_until(now);
    if elapsed == 0 {
        return Ok(None);
    }
    let previous_rate = pool.debt_accumulated_rate;
    let new_rate = previous_rate.rmul(pool.stability_fee_rate.rpow(elapsed)?)?;
    let accrued = pool.total_debt_share.mul_ray(new_rate.checked_sub(previous_rate)?)?;
    Ok(Some(FeeAccrual {
        pool: pool.id,
        elapsed,
        previous_rate,
        new_rate,
        accrued,
    }))
}

/// Growth factor of a per-second rate over one year.
pub fn annualized(per_second: Ray) -> Result<Ray, MathError> {
    per_second.rpow(SECONDS_PER_YEAR)
}
