// Price Source Interface
//
// The engine never discovers prices. It reads one synchronous quote per pool
// from whatever implements PriceSource (an oracle adapter, a TWAP keeper, a test
// mock) and applies its own staleness policy to the returned timestamp.

use crate::math::{MathError, Ray, Wad};
use crate::types::{PoolId, Timestamp};
use serde::{Deserialize, Serialize};

/// One reading from a price source. `value` is collateral priced in the reference unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub value: Wad,
    /// Source-side health flag. A quote with `ok = false` must not be acted on.
    pub ok: bool,
    pub timestamp: Timestamp,
}

impl PriceQuote {
    pub fn new(value: Wad, timestamp: Timestamp) -> Self {
        Self { value, ok: true, timestamp }
    }

    pub fn age(&self, now: Timestamp) -> u64 {
        self.timestamp.elapsed_until(now)
    }

    /// Healthy and no older than `max_age` seconds at `now`.
    pub fn is_fresh(&self, now: Timestamp, max_age: u64) -> bool {
        self.ok && self.age(now) <= max_age
    }

    /// Source price over the stablecoin reference price, in RAY.
    pub fn raw_price(&self, reference_price: Ray) -> Result<Ray, MathError> {
        self.value.to_ray()?.rdiv(reference_price)
    }
}

/// Raw price discounted by the pool's liquidation ratio.
pub fn price_with_safety_margin(raw_price: Ray, liquidation_ratio: Ray) -> Result<Ray, MathError> {
    raw_price.rdiv(liquidation_ratio)
}

/// Trait for price sources. One source serves one pool.
pub trait PriceSource {
    /// The pool this source is wired to.
    fn pool_id(&self) -> PoolId;

    /// Latest quote. Never blocks.
    fn get_price(&self) -> PriceQuote;
}

/// Mock source for tests and the simulator.
#[derive(Debug, Clone)]
pub struct MockPriceSource {
    pool_id: PoolId,
    quote: PriceQuote,
}

impl MockPriceSource {
    pub fn new(pool_id: PoolId, price: Wad, timestamp: Timestamp) -> Self {
        Self {
            pool_id,
            quote: PriceQuote::new(price, timestamp),
        }
    }

    pub fn set_price(&mut self, price: Wad, timestamp: Timestamp) {
        self.quote.value = price;
        self.quote.timestamp = timestamp;
    }

    pub fn set_healthy(&mut self, healthy: bool) {
        self.quote.ok = healthy;
    }

    /// Points the source at another pool, for mismatch checks.
    pub fn rewire(&mut self, pool_id: PoolId) {
        self.pool_id = pool_id;
    }
}

impl PriceSource for MockPriceSource {
    fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    fn get_price(&self) -> PriceQuote {
        self.quote
    }
}
