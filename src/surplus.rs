//! Protocol surplus and bad debt.
//!
//! Stability fees and liquidation treasury fees accrue to the surplus engine's
//! address in the ledger. Liquidation shortfalls land there as bad debt. The
//! surplus engine nets the two and releases surplus only once bad debt is gone.

use crate::ledger::{Ledger, LedgerError};
use crate::math::{Rad, Wad};
use crate::types::{Address, PoolId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurplusEngine {
    pub address: Address,
    /// Stablecoin that must stay behind after a surplus withdrawal.
    pub surplus_buffer: Rad,
}

impl SurplusEngine {
    pub fn new(address: Address, surplus_buffer: Rad) -> Self {
        Self {
            address,
            surplus_buffer,
        }
    }

    pub fn surplus(&self, ledger: &Ledger) -> Rad {
        ledger.stablecoin(self.address)
    }

    pub fn bad_debt(&self, ledger: &Ledger) -> Rad {
        ledger.system_bad_debt(self.address)
    }

    pub fn collateral(&self, ledger: &Ledger, pool: PoolId) -> Wad {
        ledger.collateral(pool, self.address)
    }

    /// Burns `amount` of surplus against the same amount of bad debt.
    pub fn settle_system_bad_debt(&self, ledger: &mut Ledger, amount: Rad) -> Result<(), SurplusError> {
        let surplus = self.surplus(ledger);
        if surplus < amount {
            return Err(SurplusError::InsufficientSurplus {
                available: surplus,
                requested: amount,
            });
        }
        let bad_debt = self.bad_debt(ledger);
        if bad_debt < amount {
            return Err(SurplusError::InsufficientDebt {
                available: bad_debt,
                requested: amount,
            });
        }
        ledger.settle_system_bad_debt(self.address, amount)?;
        Ok(())
    }

    /// Settles as much bad debt as surplus allows. Returns the settled amount.
    pub fn settle_max(&self, ledger: &mut Ledger) -> Result<Rad, SurplusError> {
        let amount = self.surplus(ledger).min(self.bad_debt(ledger));
        if !amount.is_zero() {
            ledger.settle_system_bad_debt(self.address, amount)?;
        }
        Ok(amount)
    }

    pub fn withdraw_stablecoin_surplus(&self, ledger: &mut Ledger, to: Address, amount: Rad) -> Result<(), SurplusError> {
        let bad_debt = self.bad_debt(ledger);
        if !bad_debt.is_zero() {
            return Err(SurplusError::OutstandingBadDebt(bad_debt));
        }
        let surplus = self.surplus(ledger);
        let remaining = surplus
            .checked_sub(amount)
            .map_err(|_| SurplusError::InsufficientSurplus {
                available: surplus,
                requested: amount,
            })?;
        if remaining < self.surplus_buffer {
            return Err(SurplusError::BufferBreached {
                remaining,
                buffer: self.surplus_buffer,
            });
        }
        ledger.move_stablecoin(self.address, self.address, to, amount)?;
        Ok(())
    }

    /// Treasury collateral has no bad-debt precondition.
    pub fn withdraw_collateral_surplus(
        &self,
        ledger: &mut Ledger,
        pool: PoolId,
        to: Address,
        amount: Wad,
    ) -> Result<(), SurplusError> {
        ledger.move_collateral(self.address, pool, self.address, to, amount)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurplusError {
    #[error("Insufficient surplus: {available} available, {requested} requested")]
    InsufficientSurplus { available: Rad, requested: Rad },

    #[error("Insufficient bad debt: {available} recorded, {requested} requested")]
    InsufficientDebt { available: Rad, requested: Rad },

    #[error("Bad debt {0} must be settled first")]
    OutstandingBadDebt(Rad),

    #[error("Withdrawal leaves {remaining}, buffer is {buffer}")]
    BufferBreached { remaining: Rad, buffer: Rad },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGINE: Address = Address(99);
    const TREASURY: Address = Address(5);

    fn ledger_with(surplus: u128, bad_debt: u128) -> Ledger {
        let mut ledger = Ledger::new(Rad::from_integer(1_000_000));
        // unbacked mint against a scratch holder gives the engine plain surplus
        ledger
            .mint_unbacked_stablecoin(Address(1_000), ENGINE, Rad::from_integer(surplus))
            .unwrap();
        if bad_debt > 0 {
            ledger
                .mint_unbacked_stablecoin(ENGINE, Address(1_001), Rad::from_integer(bad_debt))
                .unwrap();
        }
        ledger
    }

    #[test]
    fn settle_checks_surplus_then_debt() {
        let engine = SurplusEngine::new(ENGINE, Rad::zero());
        let mut ledger = ledger_with(50, 80);

        assert!(matches!(
            engine.settle_system_bad_debt(&mut ledger, Rad::from_integer(60)),
            Err(SurplusError::InsufficientSurplus { .. })
        ));
        engine.settle_system_bad_debt(&mut ledger, Rad::from_integer(50)).unwrap();
        assert_eq!(engine.bad_debt(&ledger), Rad::from_integer(30));
        assert!(engine.surplus(&ledger).is_zero());

        let mut ledger = ledger_with(100, 10);
        assert!(matches!(
            engine.settle_system_bad_debt(&mut ledger, Rad::from_integer(20)),
            Err(SurplusError::InsufficientDebt { .. })
        ));
    }

    #[test]
    fn settle_max_nets_the_smaller_side() {
        let engine = SurplusEngine::new(ENGINE, Rad::zero());
        let mut ledger = ledger_with(100, 30);
        assert_eq!(engine.settle_max(&mut ledger).unwrap(), Rad::from_integer(30));
        assert_eq!(engine.surplus(&ledger), Rad::from_integer(70));
        assert!(engine.bad_debt(&ledger).is_zero());
    }

    #[test]
    fn withdrawal_requires_no_bad_debt_and_respects_buffer() {
        let engine = SurplusEngine::new(ENGINE, Rad::from_integer(40));

        let mut ledger = ledger_with(100, 1);
        assert!(matches!(
            engine.withdraw_stablecoin_surplus(&mut ledger, TREASURY, Rad::from_integer(10)),
            Err(SurplusError::OutstandingBadDebt(_))
        ));

        let mut ledger = ledger_with(100, 0);
        assert!(matches!(
            engine.withdraw_stablecoin_surplus(&mut ledger, TREASURY, Rad::from_integer(61)),
            Err(SurplusError::BufferBreached { .. })
        ));
        engine
            .withdraw_stablecoin_surplus(&mut ledger, TREASURY, Rad::from_integer(60))
            .unwrap();
        assert_eq!(ledger.stablecoin(TREASURY), Rad::from_integer(60));
        assert_eq!(engine.surplus(&ledger), Rad::from_integer(40));
    }
}
