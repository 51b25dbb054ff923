// cdp-core: collateralized debt position engine.
// solvency-first: every transition is checked in full before any write, and the
// ledger's conservation invariants hold after every call.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: PoolId, Address, PositionId, Timestamp
//   2.x  math.rs: WAD/RAY/RAD fixed point, rpow, signed deltas
//   3.x  access.rs: roles and the grant table
//   4.x  pool.rs: collateral pool parameters, validation, registry
//   5.x  position.rs: locked collateral + debt share, safety helpers
//   6.x  ledger.rs: balances, positions, bad debt, conservation checks
//   6.4  liquidation.rs: fixed spread strategy (pure calculation)
//   7.x  fee.rs: stability fee accrual
//   7.2  surplus.rs: surplus engine, bad debt settlement
//   8.x  engine/: the engine handle: pools, pricing, fees, positions, liquidations, surplus
//   9.x  config.rs: human-unit pool/protocol config, env presets
//   10.x price_feed.rs: price source trait, quotes, safety margin
//   10.1 registry.rs: position id registry
//   11.x events.rs: state transition events for audit

// accounting core
pub mod ledger;
pub mod math;
pub mod pool;
pub mod position;
pub mod types;

// risk and settlement
pub mod fee;
pub mod liquidation;
pub mod surplus;

// engine and integration
pub mod access;
pub mod config;
pub mod engine;
pub mod events;
pub mod price_feed;
pub mod registry;

// re exports for convenience
pub use access::*;
pub use engine::*;
pub use events::*;
pub use fee::*;
pub use ledger::*;
pub use liquidation::*;
pub use math::*;
pub use pool::*;
pub use position::*;
pub use surplus::*;
pub use types::*;
pub use config::{ConfigError, Environment, PoolConfig, ProtocolConfig};
pub use price_feed::{MockPriceSource, PriceQuote, PriceSource};
pub use registry::{InMemoryPositionRegistry, PositionRecord, PositionRegistry, RegistryError};
