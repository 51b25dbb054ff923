//! Price update operations.

use super::core::Engine;
use super::results::{EngineError, PokeResult};
use crate::access::Role;
use crate::events::{EventPayload, PriceUpdatedEvent};
use crate::math::Ray;
use crate::price_feed::{price_with_safety_margin, PriceSource};
use crate::types::{Address, PoolId};

impl Engine {
    /// Reads `source` and refreshes the pool's margined price. An unhealthy
    /// reading stores zero, which blocks new debt until the next healthy poke.
    pub fn poke_price(
        &mut self,
        caller: Address,
        pool: PoolId,
        source: &impl PriceSource,
    ) -> Result<PokeResult, EngineError> {
        self.require_live()?;
        if source.pool_id() != pool {
            return Err(EngineError::PriceSourceMismatch {
                pool,
                source_pool: source.pool_id(),
            });
        }
        let liquidation_ratio = self.pools.get(pool)?.liquidation_ratio;
        let quote = source.get_price();

        let margined = if quote.ok {
            price_with_safety_margin(quote.raw_price(self.reference_price)?, liquidation_ratio)?
        } else {
            tracing::warn!(%pool, "price source unhealthy, new debt disabled");
            Ray::zero()
        };
        self.pools.set_price_with_safety_margin(pool, margined)?;

        self.emit_event(
            caller,
            EventPayload::PriceUpdated(PriceUpdatedEvent {
                pool,
                source_price: quote.value,
                source_ok: quote.ok,
                price_with_safety_margin: margined,
            }),
        );

        Ok(PokeResult {
            pool,
            source_price: quote.value,
            source_ok: quote.ok,
            price_with_safety_margin: margined,
        })
    }

    /// Stablecoin target price used to scale every source price. Pools pick it
    /// up at their next poke.
    pub fn set_stablecoin_reference_price(&mut self, caller: Address, value: Ray) -> Result<Ray, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        if value.is_zero() {
            return Err(EngineError::InvalidReferencePrice);
        }
        let old = std::mem::replace(&mut self.reference_price, value);
        self.emit_event(caller, EventPayload::ReferencePriceUpdated { old, new: value });
        Ok(old)
    }
}
