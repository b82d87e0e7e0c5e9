//! Skinfall - wagering and economy engine for a virtual-item casino.
//!
//! Four coordinated components over one persistent account store:
//! weighted-random reward generation (cases, slots, upgrades), a timed
//! multi-participant coin-flip game, a player-to-player marketplace, and the
//! account/balance ledger every currency movement flows through.

pub mod api;
pub mod broadcast;
pub mod clock;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod marketplace;
pub mod rewards;
pub mod round;
pub mod store;
pub mod types;

pub use broadcast::{ChannelBroadcaster, EventBroadcaster, GameEvent, NullBroadcaster};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigLoader, EngineConfig};
pub use errors::{EngineError, EngineResult};
pub use ledger::LedgerService;
pub use marketplace::MarketplaceExchange;
pub use round::RoundCoordinator;
pub use store::{MemoryStore, PersistenceStore};
