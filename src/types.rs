//! Domain model for the wagering economy.
//!
//! Wire names follow the original platform's camelCase JSON so existing
//! clients keep working. Accounts are only ever mutated through the
//! `LedgerService`; everything here is plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

pub type AccountId = Uuid;
pub type CaseId = Uuid;
pub type ItemTemplateId = Uuid;
pub type ListingId = Uuid;
pub type RoundId = Uuid;

/// Rarity tier 1 (common) through 5 (legendary).
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct RarityTier(pub u8);

impl RarityTier {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(tier: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&tier).then_some(Self(tier))
    }

    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog item definition. Read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemTemplate {
    pub id: ItemTemplateId,
    pub name: String,
    pub image: String,
    pub rarity: RarityTier,
    #[serde(rename = "caseId", skip_serializing_if = "Option::is_none")]
    pub case_id: Option<CaseId>,
}

/// A unique, non-fungible copy of an `ItemTemplate`.
///
/// Invariant: at any instant an instance is owned by exactly one of an
/// account's inventory or an open listing, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemInstance {
    /// Back-reference to the template this was stamped from.
    pub id: ItemTemplateId,
    pub name: String,
    pub image: String,
    pub rarity: RarityTier,
    #[serde(rename = "uniqueId")]
    pub unique_id: Uuid,
    #[serde(rename = "createdAt")]
    pub acquired_at: DateTime<Utc>,
}

impl ItemInstance {
    /// Stamp a fresh instance from a template. Every draw gets a new
    /// `unique_id`, even for the same template drawn twice.
    pub fn stamp(template: &ItemTemplate, now: DateTime<Utc>) -> Self {
        Self {
            id: template.id,
            name: template.name.clone(),
            image: template.image.clone(),
            rarity: template.rarity,
            unique_id: Uuid::new_v4(),
            acquired_at: now,
        }
    }
}

/// Loot case: a price and a pool of templates partitioned by rarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseTemplate {
    pub id: CaseId,
    pub title: String,
    pub description: String,
    pub image: String,
    pub price: f64,
    pub items: Vec<ItemTemplate>,
}

impl CaseTemplate {
    /// Group the case pool by rarity tier.
    pub fn items_by_rarity(&self) -> HashMap<RarityTier, Vec<&ItemTemplate>> {
        let mut grouped: HashMap<RarityTier, Vec<&ItemTemplate>> = HashMap::new();
        for item in &self.items {
            grouped.entry(item.rarity).or_default().push(item);
        }
        grouped
    }
}

/// Single highlighted inventory item with a free-text note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedItem {
    pub item: ItemInstance,
    pub note: String,
}

/// A player account. Balance, XP, inventory and winnings are mutated only
/// through the `LedgerService`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    #[serde(rename = "walletBalance")]
    pub balance: f64,
    pub xp: u64,
    pub level: u32,
    pub inventory: Vec<ItemInstance>,
    #[serde(rename = "fixedItem", skip_serializing_if = "Option::is_none")]
    pub fixed_item: Option<FixedItem>,
    #[serde(rename = "weeklyWinnings")]
    pub weekly_winnings: f64,
    #[serde(rename = "nextBonus")]
    pub next_bonus_at: DateTime<Utc>,
    #[serde(rename = "bonusAmount")]
    pub bonus_amount: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Fresh account with the platform's registration defaults.
    pub fn register(username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            balance: 200.0,
            xp: 0,
            level: 0,
            inventory: Vec::new(),
            fixed_item: None,
            weekly_winnings: 0.0,
            // First bonus is claimable immediately.
            next_bonus_at: now - chrono::Duration::days(1),
            bonus_amount: 1000.0,
            created_at: now,
        }
    }

    pub fn find_item(&self, unique_id: Uuid) -> Option<&ItemInstance> {
        self.inventory.iter().find(|i| i.unique_id == unique_id)
    }
}

/// Which side of the coin a participant backs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

/// Round lifecycle. Transitions are driven solely by the coordinator's timer,
/// in strict order; clients cannot advance phases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    OpenForBets,
    Locked,
    Resolving,
    PaidOut,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::OpenForBets => write!(f, "open_for_bets"),
            RoundPhase::Locked => write!(f, "locked"),
            RoundPhase::Resolving => write!(f, "resolving"),
            RoundPhase::PaidOut => write!(f, "paid_out"),
        }
    }
}

/// One timed betting round. Lives for a single cycle; a fresh `Round` replaces
/// it after payout, nothing is reused.
#[derive(Debug, Clone)]
pub struct Round {
    pub id: RoundId,
    pub phase: RoundPhase,
    pub bets: HashMap<AccountId, f64>,
    pub choices: HashMap<AccountId, CoinSide>,
    /// Accounts already settled this round. Guards against double payout.
    pub paid: HashSet<AccountId>,
    pub outcome: Option<CoinSide>,
    pub started_at: DateTime<Utc>,
}

impl Round {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: RoundPhase::OpenForBets,
            bets: HashMap::new(),
            choices: HashMap::new(),
            paid: HashSet::new(),
            outcome: None,
            started_at: now,
        }
    }

    /// Immutable view for broadcasting. The round itself never escapes the
    /// coordinator.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round_id: self.id,
            phase: self.phase,
            bets: self.bets.clone(),
            choices: self.choices.clone(),
            outcome: self.outcome,
            started_at: self.started_at,
        }
    }
}

/// Read-only round state pushed to clients as `coinFlip:gameState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    #[serde(rename = "roundId")]
    pub round_id: RoundId,
    pub phase: RoundPhase,
    pub bets: HashMap<AccountId, f64>,
    pub choices: HashMap<AccountId, CoinSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CoinSide>,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

/// Marketplace offer: snapshotted item fields plus an asking price.
/// Created on sell, destroyed on buy or cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    #[serde(rename = "sellerId")]
    pub seller_id: AccountId,
    pub item: ItemInstance,
    pub price: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_tier_bounds() {
        assert!(RarityTier::new(0).is_none());
        assert!(RarityTier::new(6).is_none());
        assert_eq!(RarityTier::new(3), Some(RarityTier(3)));
        assert_eq!(RarityTier(5).index(), 4);
    }

    #[test]
    fn test_stamp_generates_fresh_unique_ids() {
        let template = ItemTemplate {
            id: Uuid::new_v4(),
            name: "Hakkero".to_string(),
            image: "hakkero.png".to_string(),
            rarity: RarityTier(4),
            case_id: None,
        };
        let now = Utc::now();
        let a = ItemInstance::stamp(&template, now);
        let b = ItemInstance::stamp(&template, now);
        assert_eq!(a.id, b.id);
        assert_ne!(a.unique_id, b.unique_id);
    }

    #[test]
    fn test_registration_defaults() {
        let now = Utc::now();
        let account = Account::register("marisa", now);
        assert_eq!(account.balance, 200.0);
        assert_eq!(account.level, 0);
        assert!(account.inventory.is_empty());
        // The first bonus must be claimable right away.
        assert!(account.next_bonus_at < now);
    }

    #[test]
    fn test_round_snapshot_reflects_state() {
        let mut round = Round::fresh(Utc::now());
        let player = Uuid::new_v4();
        round.bets.insert(player, 50.0);
        round.choices.insert(player, CoinSide::Heads);

        let snap = round.snapshot();
        assert_eq!(snap.round_id, round.id);
        assert_eq!(snap.phase, RoundPhase::OpenForBets);
        assert_eq!(snap.bets.get(&player), Some(&50.0));
    }

    #[test]
    fn test_account_wire_field_names() {
        let account = Account::register("reimu", Utc::now());
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("walletBalance").is_some());
        assert!(json.get("weeklyWinnings").is_some());
        assert!(json.get("nextBonus").is_some());
        assert!(json.get("bonusAmount").is_some());
    }
}
