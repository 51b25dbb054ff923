// 8.0 engine/core.rs: the engine handle. owns pools, ledger, roles, surplus engine,
// position registry and the event log. one instance per deployment, no globals.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::access::{AccessControl, Role};
use crate::events::{Event, EventId, EventPayload};
use crate::ledger::Ledger;
use crate::math::{Rad, Ray, Wad};
use crate::pool::{CollateralPool, CollateralPoolRegistry};
use crate::position::Position;
use crate::registry::InMemoryPositionRegistry;
use crate::surplus::SurplusEngine;
use crate::types::{Address, PoolId, Timestamp};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) access: AccessControl,
    pub(super) pools: CollateralPoolRegistry,
    pub(super) ledger: Ledger,
    pub(super) surplus: SurplusEngine,
    pub(super) positions: InMemoryPositionRegistry,
    pub(super) reference_price: Ray,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
    pub(super) paused: bool,
    pub(super) live: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let access = AccessControl::with_owner(config.owner);
        let ledger = Ledger::new(config.total_debt_ceiling);
        let surplus = SurplusEngine::new(config.surplus_engine, config.surplus_buffer);
        let reference_price = config.reference_price;
        Self {
            config,
            access,
            pools: CollateralPoolRegistry::new(),
            ledger,
            surplus,
            positions: InMemoryPositionRegistry::new(),
            reference_price,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_secs(0),
            paused: false,
            live: true,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    // 8.2: guards. pause is always checked before anything else

    pub(super) fn require_unpaused(&self) -> Result<(), EngineError> {
        if self.paused {
            return Err(EngineError::Paused);
        }
        Ok(())
    }

    pub(super) fn require_live(&self) -> Result<(), EngineError> {
        self.require_unpaused()?;
        if !self.live {
            return Err(EngineError::NotLive);
        }
        Ok(())
    }

    pub(super) fn require_role(&self, caller: Address, role: Role) -> Result<(), EngineError> {
        if !self.access.has_role(caller, role) {
            return Err(EngineError::MissingRole { caller, role });
        }
        Ok(())
    }

    /// Owner or Gov. Reports `Gov` as the missing role.
    pub(super) fn require_governance(&self, caller: Address) -> Result<(), EngineError> {
        if self.access.has_role(caller, Role::Owner) {
            return Ok(());
        }
        self.require_role(caller, Role::Gov)
    }

    // 8.3: lifecycle

    pub fn pause(&mut self, caller: Address) -> Result<(), EngineError> {
        self.require_governance(caller)?;
        if !self.paused {
            self.paused = true;
            tracing::warn!(%caller, "engine paused");
            self.emit_event(caller, EventPayload::Paused);
        }
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), EngineError> {
        self.require_governance(caller)?;
        if self.paused {
            self.paused = false;
            tracing::info!(%caller, "engine unpaused");
            self.emit_event(caller, EventPayload::Unpaused);
        }
        Ok(())
    }

    /// Permanently stops debt issuance, fee accrual and liquidation.
    /// Balance transfers and surplus operations keep working.
    pub fn cage(&mut self, caller: Address) -> Result<(), EngineError> {
        self.require_role(caller, Role::Owner)?;
        if self.live {
            self.live = false;
            tracing::warn!(%caller, "engine caged");
            self.emit_event(caller, EventPayload::Caged);
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool, EngineError> {
        self.require_role(caller, Role::Owner)?;
        let granted = self.access.grant_role(role, account);
        if granted {
            self.emit_event(caller, EventPayload::RoleGranted { role, account });
        }
        Ok(granted)
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool, EngineError> {
        self.require_role(caller, Role::Owner)?;
        let revoked = self.access.revoke_role(role, account);
        if revoked {
            self.emit_event(caller, EventPayload::RoleRevoked { role, account });
        }
        Ok(revoked)
    }

    pub fn has_role(&self, who: Address, role: Role) -> bool {
        self.access.has_role(who, role)
    }

    pub fn set_total_debt_ceiling(&mut self, caller: Address, value: Rad) -> Result<Rad, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.ledger.set_total_debt_ceiling(value);
        self.emit_event(caller, EventPayload::TotalDebtCeilingUpdated { old, new: value });
        Ok(old)
    }

    // 8.4: consent. owner lets `usr` act on its balances and positions
    pub fn whitelist(&mut self, owner: Address, usr: Address) -> Result<(), EngineError> {
        self.require_unpaused()?;
        if self.ledger.whitelist(owner, usr) {
            tracing::debug!(%owner, %usr, "consent granted");
            self.emit_event(owner, EventPayload::ConsentGranted { owner, usr });
        }
        Ok(())
    }

    pub fn blacklist(&mut self, owner: Address, usr: Address) -> Result<(), EngineError> {
        self.require_unpaused()?;
        if self.ledger.blacklist(owner, usr) {
            tracing::debug!(%owner, %usr, "consent revoked");
            self.emit_event(owner, EventPayload::ConsentRevoked { owner, usr });
        }
        Ok(())
    }

    // 8.5: read accessors

    pub fn pool(&self, pool: PoolId) -> Option<&CollateralPool> {
        self.pools.get(pool).ok()
    }

    pub fn pools(&self) -> &CollateralPoolRegistry {
        &self.pools
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn position(&self, pool: PoolId, position: Address) -> Position {
        self.ledger.position(pool, position)
    }

    pub fn collateral(&self, pool: PoolId, owner: Address) -> Wad {
        self.ledger.collateral(pool, owner)
    }

    pub fn stablecoin(&self, owner: Address) -> Rad {
        self.ledger.stablecoin(owner)
    }

    pub fn system_bad_debt(&self, owner: Address) -> Rad {
        self.ledger.system_bad_debt(owner)
    }

    pub fn surplus_engine(&self) -> &SurplusEngine {
        &self.surplus
    }

    pub fn reference_price(&self) -> Ray {
        self.reference_price
    }

    /// Conservation and pool accounting checks over the whole ledger.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.ledger.check_invariants(&self.pools)
    }

    // 8.6: event log

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, actor: Address, payload: EventPayload) {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        tracing::debug!(event_id = id.0, %actor, ?payload, "event");
        self.events.push(Event::new(id, self.current_time, actor, payload));

        if self.events.len() > self.config.max_events {
            let excess = self.events.len() - self.config.max_events;
            self.events.drain(0..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address(1);
    const GOV: Address = Address(2);
    const STRANGER: Address = Address(3);

    fn engine() -> Engine {
        Engine::new(EngineConfig {
            owner: OWNER,
            max_events: 4,
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_owner_holds_every_role() {
        let engine = engine();
        for role in Role::ALL {
            assert!(engine.has_role(OWNER, role));
        }
        assert!(!engine.has_role(STRANGER, Role::Owner));
    }

    #[test]
    fn test_pause_requires_owner_or_gov() {
        let mut engine = engine();
        assert!(matches!(
            engine.pause(STRANGER),
            Err(EngineError::MissingRole { role: Role::Gov, .. })
        ));

        engine.grant_role(OWNER, Role::Gov, GOV).unwrap();
        engine.pause(GOV).unwrap();
        assert!(engine.is_paused());
        assert!(matches!(
            engine.set_total_debt_ceiling(OWNER, Rad::from_integer(1)),
            Err(EngineError::Paused)
        ));
        engine.unpause(GOV).unwrap();
        assert!(!engine.is_paused());
    }

    #[test]
    fn test_cage_is_one_way() {
        let mut engine = engine();
        assert!(engine.cage(STRANGER).is_err());
        engine.cage(OWNER).unwrap();
        assert!(!engine.is_live());
        assert!(matches!(engine.require_live(), Err(EngineError::NotLive)));
    }

    #[test]
    fn test_role_changes_emit_once() {
        let mut engine = engine();
        assert!(engine.grant_role(OWNER, Role::Liquidator, STRANGER).unwrap());
        assert!(!engine.grant_role(OWNER, Role::Liquidator, STRANGER).unwrap());
        assert_eq!(engine.events().len(), 1);

        assert!(engine.revoke_role(OWNER, Role::Liquidator, STRANGER).unwrap());
        assert!(!engine.has_role(STRANGER, Role::Liquidator));
        assert!(engine.grant_role(STRANGER, Role::Owner, STRANGER).is_err());
    }

    #[test]
    fn test_consent_is_gated_by_pause() {
        let mut engine = engine();
        engine.pause(OWNER).unwrap();
        let events = engine.events().len();
        assert!(matches!(engine.whitelist(OWNER, STRANGER), Err(EngineError::Paused)));
        assert!(!engine.ledger().can_modify(OWNER, STRANGER));
        assert_eq!(engine.events().len(), events);

        engine.unpause(OWNER).unwrap();
        engine.whitelist(OWNER, STRANGER).unwrap();
        engine.whitelist(OWNER, STRANGER).unwrap();
        assert!(engine.ledger().can_modify(OWNER, STRANGER));
        assert_eq!(
            engine.events().last().map(|event| &event.payload),
            Some(&EventPayload::ConsentGranted { owner: OWNER, usr: STRANGER })
        );

        engine.pause(OWNER).unwrap();
        assert!(matches!(engine.blacklist(OWNER, STRANGER), Err(EngineError::Paused)));
        assert!(engine.ledger().can_modify(OWNER, STRANGER));
        engine.unpause(OWNER).unwrap();
        engine.blacklist(OWNER, STRANGER).unwrap();
        assert!(!engine.ledger().can_modify(OWNER, STRANGER));
        assert_eq!(
            engine.events().last().map(|event| &event.payload),
            Some(&EventPayload::ConsentRevoked { owner: OWNER, usr: STRANGER })
        );
    }

    #[test]
    fn test_event_log_is_capped() {
        let mut engine = engine();
        for i in 0..6u128 {
            engine.set_total_debt_ceiling(OWNER, Rad::from_integer(i + 1)).unwrap();
        }
        assert_eq!(engine.events().len(), 4);
        assert_eq!(engine.events()[0].id, EventId(3));
        assert_eq!(engine.recent_events(2).len(), 2);
        assert_eq!(engine.recent_events(2)[1].id, EventId(6));
    }

    #[test]
    fn test_clock() {
        let mut engine = engine();
        engine.set_time(Timestamp::from_secs(100));
        engine.advance_time(50);
        assert_eq!(engine.time(), Timestamp::from_secs(150));
    }
}
