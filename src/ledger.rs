//! LedgerService: the only component allowed to mutate an account's balance,
//! progression and inventory.
//!
//! Every operation is serialized per account through a lock table, so two
//! concurrent debits can never both succeed against a balance that covers only
//! one of them. Multi-account operations acquire locks in ascending account-id
//! order to rule out circular waits under reciprocal trades. Locks are never
//! held across broadcast or other unbounded external calls; callers get back a
//! summary and notify afterwards.

use crate::config::BonusConfig;
use crate::errors::{EngineError, EngineResult};
use crate::store::PersistenceStore;
use crate::types::{Account, AccountId, FixedItem, ItemInstance, Listing};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// XP needed per level. Wagers grant 1 XP per whole currency unit.
const XP_PER_LEVEL: u64 = 1000;

/// Post-operation account state for `userDataUpdated` events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountSummary {
    pub id: AccountId,
    pub balance: f64,
    pub xp: u64,
    pub level: u32,
}

impl AccountSummary {
    fn of(account: &Account) -> Self {
        Self {
            id: account.id,
            balance: account.balance,
            xp: account.xp,
            level: account.level,
        }
    }
}

/// Result of a bonus claim.
#[derive(Debug, Clone)]
pub struct BonusClaim {
    pub amount: f64,
    pub next_bonus_at: DateTime<Utc>,
    pub summary: AccountSummary,
}

pub struct LedgerService {
    store: Arc<dyn PersistenceStore>,
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
    bonus: BonusConfig,
}

impl LedgerService {
    pub fn new(store: Arc<dyn PersistenceStore>, bonus: BonusConfig) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            bonus,
        }
    }

    fn lock_handle(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn validate_amount(amount: f64) -> EngineResult<()> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EngineError::validation(format!(
                "Amount must be a positive number, got {}",
                amount
            )));
        }
        Ok(())
    }

    /// Apply wager-driven progression: 1 XP per whole unit wagered.
    fn grant_wager_xp(account: &mut Account, wager: f64) {
        account.xp += wager.floor() as u64;
        account.level = (account.xp / XP_PER_LEVEL) as u32;
    }

    /// Read-only account snapshot.
    pub async fn account(&self, id: AccountId) -> EngineResult<Account> {
        self.store.load_account(id).await
    }

    pub async fn register(&self, username: &str, now: DateTime<Utc>) -> EngineResult<Account> {
        let account = Account::register(username, now);
        self.store.insert_account(account.clone()).await?;
        info!(account = %account.id, username, "Account registered");
        Ok(account)
    }

    /// Remove `amount` from the balance. Fails with `InsufficientFunds` if the
    /// balance cannot cover it; never clamps to zero silently.
    pub async fn debit(&self, id: AccountId, amount: f64) -> EngineResult<AccountSummary> {
        Self::validate_amount(amount)?;
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        if account.balance < amount {
            return Err(EngineError::InsufficientFunds);
        }
        account.balance -= amount;
        self.store.save_account(&account).await?;
        debug!(account = %id, amount, balance = account.balance, "Debit applied");
        Ok(AccountSummary::of(&account))
    }

    /// Debit a stake and grant wager XP in one serialized step.
    pub async fn debit_wager(&self, id: AccountId, stake: f64) -> EngineResult<AccountSummary> {
        Self::validate_amount(stake)?;
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        if account.balance < stake {
            return Err(EngineError::InsufficientFunds);
        }
        account.balance -= stake;
        Self::grant_wager_xp(&mut account, stake);
        self.store.save_account(&account).await?;
        debug!(account = %id, stake, balance = account.balance, "Wager debited");
        Ok(AccountSummary::of(&account))
    }

    pub async fn credit(&self, id: AccountId, amount: f64) -> EngineResult<AccountSummary> {
        Self::validate_amount(amount)?;
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        account.balance += amount;
        self.store.save_account(&account).await?;
        debug!(account = %id, amount, balance = account.balance, "Credit applied");
        Ok(AccountSummary::of(&account))
    }

    /// Credit a game payout and accumulate weekly winnings.
    pub async fn credit_winnings(
        &self,
        id: AccountId,
        amount: f64,
    ) -> EngineResult<AccountSummary> {
        Self::validate_amount(amount)?;
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        account.balance += amount;
        account.weekly_winnings += amount;
        self.store.save_account(&account).await?;
        debug!(account = %id, amount, "Winnings credited");
        Ok(AccountSummary::of(&account))
    }

    pub async fn add_item(&self, id: AccountId, item: ItemInstance) -> EngineResult<()> {
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        account.inventory.push(item);
        self.store.save_account(&account).await
    }

    /// Pull an item out of the inventory, returning it for hand-off to a
    /// listing. `NotFound` when the instance is not currently owned.
    pub async fn remove_item(
        &self,
        id: AccountId,
        unique_id: Uuid,
    ) -> EngineResult<ItemInstance> {
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        let position = account
            .inventory
            .iter()
            .position(|item| item.unique_id == unique_id)
            .ok_or(EngineError::NotFound("Item"))?;
        let item = account.inventory.remove(position);
        self.store.save_account(&account).await?;
        Ok(item)
    }

    /// Charge a case-opening and append the drawn items in one atomic step.
    /// With balance exactly equal to the cost this succeeds and zeroes the
    /// balance.
    pub async fn apply_case_open(
        &self,
        id: AccountId,
        cost: f64,
        items: Vec<ItemInstance>,
    ) -> EngineResult<AccountSummary> {
        Self::validate_amount(cost)?;
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        if account.balance < cost {
            return Err(EngineError::InsufficientFunds);
        }
        account.balance -= cost;
        Self::grant_wager_xp(&mut account, cost);
        account.inventory.extend(items);
        self.store.save_account(&account).await?;
        info!(account = %id, cost, "Case opening charged");
        Ok(AccountSummary::of(&account))
    }

    /// Debit a slot stake and credit its payout (if any) in one step.
    pub async fn apply_slot_spin(
        &self,
        id: AccountId,
        stake: f64,
        payout: f64,
    ) -> EngineResult<AccountSummary> {
        Self::validate_amount(stake)?;
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        if account.balance < stake {
            return Err(EngineError::InsufficientFunds);
        }
        account.balance -= stake;
        Self::grant_wager_xp(&mut account, stake);
        if payout > 0.0 {
            account.balance += payout;
            account.weekly_winnings += payout;
        }
        self.store.save_account(&account).await?;
        Ok(AccountSummary::of(&account))
    }

    /// Consume upgrade source items and mint the upgraded instance on success.
    /// All source instances must be owned, or nothing changes.
    pub async fn apply_upgrade(
        &self,
        id: AccountId,
        consumed: &[Uuid],
        minted: Option<ItemInstance>,
    ) -> EngineResult<AccountSummary> {
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        for unique_id in consumed {
            if !account
                .inventory
                .iter()
                .any(|item| item.unique_id == *unique_id)
            {
                return Err(EngineError::NotFound("Item"));
            }
        }
        account
            .inventory
            .retain(|item| !consumed.contains(&item.unique_id));
        if let Some(item) = minted {
            account.inventory.push(item);
        }
        self.store.save_account(&account).await?;
        Ok(AccountSummary::of(&account))
    }

    /// Pin an owned inventory item as the profile highlight. The note on the
    /// previous highlight carries over.
    pub async fn set_fixed_item(
        &self,
        id: AccountId,
        unique_id: Uuid,
    ) -> EngineResult<FixedItem> {
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        let item = account
            .find_item(unique_id)
            .cloned()
            .ok_or(EngineError::NotFound("Item"))?;
        let note = account
            .fixed_item
            .take()
            .map(|fixed| fixed.note)
            .unwrap_or_default();
        let fixed = FixedItem { item, note };
        account.fixed_item = Some(fixed.clone());
        self.store.save_account(&account).await?;
        Ok(fixed)
    }

    /// Update the note on the highlighted item. Truncated to 50 characters.
    pub async fn set_fixed_item_note(
        &self,
        id: AccountId,
        note: &str,
    ) -> EngineResult<FixedItem> {
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        let fixed = account
            .fixed_item
            .as_mut()
            .ok_or(EngineError::NotFound("Fixed item"))?;
        fixed.note = note.chars().take(50).collect();
        let updated = fixed.clone();
        self.store.save_account(&account).await?;
        Ok(updated)
    }

    /// Claim the periodic balance bonus. Rejects before the cooldown expires;
    /// on success reschedules and scales the next bonus off the current level.
    pub async fn claim_bonus(&self, id: AccountId, now: DateTime<Utc>) -> EngineResult<BonusClaim> {
        let lock = self.lock_handle(id);
        let _guard = lock.lock().await;

        let mut account = self.store.load_account(id).await?;
        if now < account.next_bonus_at {
            return Err(EngineError::forbidden("Bonus is not available yet"));
        }

        let amount = account.bonus_amount;
        account.balance += amount;
        account.next_bonus_at = now + ChronoDuration::seconds(self.bonus.cooldown_secs as i64);
        account.bonus_amount =
            (self.bonus.base_amount * (1.0 + 0.1 * account.level as f64)).floor();
        self.store.save_account(&account).await?;
        info!(account = %id, amount, "Bonus claimed");

        Ok(BonusClaim {
            amount,
            next_bonus_at: account.next_bonus_at,
            summary: AccountSummary::of(&account),
        })
    }

    /// Execute a marketplace purchase as one atomic transaction: debit buyer,
    /// credit seller, delete the listing, append the item to the buyer's
    /// inventory. Both account locks are taken in ascending id order; the
    /// listing row is removed while both are held, so a concurrent buyer of
    /// the same listing fails before any balance moves. If a later write
    /// fails, earlier writes are rolled back.
    pub async fn transfer_purchase(
        &self,
        buyer_id: AccountId,
        listing: &Listing,
    ) -> EngineResult<(AccountSummary, AccountSummary)> {
        let seller_id = listing.seller_id;
        if buyer_id == seller_id {
            return Err(EngineError::forbidden("You cannot buy your own listing"));
        }

        let first_lock;
        let second_lock;
        if buyer_id < seller_id {
            first_lock = self.lock_handle(buyer_id);
            second_lock = self.lock_handle(seller_id);
        } else {
            first_lock = self.lock_handle(seller_id);
            second_lock = self.lock_handle(buyer_id);
        }
        let _first = first_lock.lock().await;
        let _second = second_lock.lock().await;

        let mut buyer = self.store.load_account(buyer_id).await?;
        let mut seller = self.store.load_account(seller_id).await?;
        if buyer.balance < listing.price {
            return Err(EngineError::InsufficientFunds);
        }

        // Atomic take: a concurrent purchase of the same listing loses here,
        // before any balance has changed.
        let listing_row = self.store.remove_listing(listing.id).await?;

        let buyer_before = buyer.clone();
        buyer.balance -= listing_row.price;
        buyer.inventory.push(listing_row.item.clone());
        seller.balance += listing_row.price;

        if let Err(e) = self.store.save_account(&buyer).await {
            self.store.insert_listing(listing_row).await.ok();
            return Err(EngineError::transaction(e.to_string()));
        }
        if let Err(e) = self.store.save_account(&seller).await {
            self.store.save_account(&buyer_before).await.ok();
            self.store.insert_listing(listing_row).await.ok();
            return Err(EngineError::transaction(e.to_string()));
        }

        info!(
            buyer = %buyer_id,
            seller = %seller_id,
            listing = %listing.id,
            price = listing.price,
            "Purchase settled"
        );
        Ok((AccountSummary::of(&buyer), AccountSummary::of(&seller)))
    }
}
