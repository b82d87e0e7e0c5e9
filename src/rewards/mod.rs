//! Weighted-random outcome generation.
//!
//! Pure functions over an injected `Rng`: case-opening item selection, slot
//! grid generation and payline scoring, and rarity-upgrade success rolls. No
//! shared state lives here; the ledger applies whatever these draw.

pub mod case;
pub mod rarity;
pub mod slot;
pub mod upgrade;

pub use case::draw_case_item;
pub use rarity::{drop_weight, upgrade_chance, DROP_WEIGHTS};
pub use slot::{spin_slot, LineWin, SlotSymbol, SpinOutcome};
pub use upgrade::{roll_upgrade, upgrade_success_chance};
