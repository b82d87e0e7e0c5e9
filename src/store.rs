//! Persistence contract and in-memory reference implementation.
//!
//! Durable storage is an external collaborator; the engine only needs
//! read/modify/write access to account, catalog and listing rows. The ledger
//! layers per-account serialization on top, so the store itself only has to
//! make individual row operations atomic.

use crate::errors::{EngineError, EngineResult};
use crate::types::{Account, AccountId, CaseId, CaseTemplate, Listing, ListingId};
use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn load_account(&self, id: AccountId) -> EngineResult<Account>;
    async fn save_account(&self, account: &Account) -> EngineResult<()>;
    async fn insert_account(&self, account: Account) -> EngineResult<()>;

    async fn load_case(&self, id: CaseId) -> EngineResult<CaseTemplate>;
    async fn insert_case(&self, case: CaseTemplate) -> EngineResult<()>;
    async fn cases(&self) -> EngineResult<Vec<CaseTemplate>>;

    async fn load_listing(&self, id: ListingId) -> EngineResult<Listing>;
    async fn insert_listing(&self, listing: Listing) -> EngineResult<()>;
    /// Remove and return a listing; `NotFound` if absent.
    async fn remove_listing(&self, id: ListingId) -> EngineResult<Listing>;
    async fn listings(&self) -> EngineResult<Vec<Listing>>;
}

/// Concurrent in-memory store. Row-level atomicity comes from DashMap shard
/// locking; cross-row atomicity is the ledger's job.
#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<AccountId, Account>,
    cases: DashMap<CaseId, CaseTemplate>,
    listings: DashMap<ListingId, Listing>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn load_account(&self, id: AccountId) -> EngineResult<Account> {
        self.accounts
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound("Account"))
    }

    async fn save_account(&self, account: &Account) -> EngineResult<()> {
        if !self.accounts.contains_key(&account.id) {
            return Err(EngineError::NotFound("Account"));
        }
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn insert_account(&self, account: Account) -> EngineResult<()> {
        if self.accounts.contains_key(&account.id) {
            return Err(EngineError::duplicate("Account already exists"));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    async fn load_case(&self, id: CaseId) -> EngineResult<CaseTemplate> {
        self.cases
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound("Case"))
    }

    async fn insert_case(&self, case: CaseTemplate) -> EngineResult<()> {
        self.cases.insert(case.id, case);
        Ok(())
    }

    async fn cases(&self) -> EngineResult<Vec<CaseTemplate>> {
        Ok(self.cases.iter().map(|entry| entry.clone()).collect())
    }

    async fn load_listing(&self, id: ListingId) -> EngineResult<Listing> {
        self.listings
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(EngineError::NotFound("Listing"))
    }

    async fn insert_listing(&self, listing: Listing) -> EngineResult<()> {
        self.listings.insert(listing.id, listing);
        Ok(())
    }

    async fn remove_listing(&self, id: ListingId) -> EngineResult<Listing> {
        self.listings
            .remove(&id)
            .map(|(_, listing)| listing)
            .ok_or(EngineError::NotFound("Listing"))
    }

    async fn listings(&self) -> EngineResult<Vec<Listing>> {
        Ok(self.listings.iter().map(|entry| entry.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemInstance, ItemTemplate, RarityTier};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_listing(seller: AccountId) -> Listing {
        let template = ItemTemplate {
            id: Uuid::new_v4(),
            name: "Yin-Yang Orb".to_string(),
            image: "orb.png".to_string(),
            rarity: RarityTier(3),
            case_id: None,
        };
        Listing {
            id: Uuid::new_v4(),
            seller_id: seller,
            item: ItemInstance::stamp(&template, Utc::now()),
            price: 250.0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_account_round_trip() {
        let store = MemoryStore::new();
        let account = Account::register("sakuya", Utc::now());
        let id = account.id;

        store.insert_account(account).await.unwrap();
        let mut loaded = store.load_account(id).await.unwrap();
        loaded.balance = 150.0;
        store.save_account(&loaded).await.unwrap();

        assert_eq!(store.load_account(id).await.unwrap().balance, 150.0);
    }

    #[tokio::test]
    async fn test_save_unknown_account_fails() {
        let store = MemoryStore::new();
        let account = Account::register("youmu", Utc::now());
        assert!(matches!(
            store.save_account(&account).await,
            Err(EngineError::NotFound("Account"))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let account = Account::register("remilia", Utc::now());
        store.insert_account(account.clone()).await.unwrap();
        assert!(matches!(
            store.insert_account(account).await,
            Err(EngineError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_listing_returns_row() {
        let store = MemoryStore::new();
        let listing = sample_listing(Uuid::new_v4());
        let id = listing.id;

        store.insert_listing(listing).await.unwrap();
        let removed = store.remove_listing(id).await.unwrap();
        assert_eq!(removed.id, id);

        // Second removal must report the row gone.
        assert!(matches!(
            store.remove_listing(id).await,
            Err(EngineError::NotFound("Listing"))
        ));
    }
}
