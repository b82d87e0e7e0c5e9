//! Marketplace exchange: listing, buying and cancelling player-to-player
//! item sales.
//!
//! Level gates are checked at operation time, so an account that levels up
//! mid-session gains access without reconnecting. The two-account money and
//! item movement of a purchase lives in the ledger; this layer owns listing
//! lifecycle and the gates around it.

use crate::broadcast::{EventBroadcaster, GameEvent};
use crate::clock::Clock;
use crate::config::MarketplaceConfig;
use crate::errors::{EngineError, EngineResult};
use crate::ledger::LedgerService;
use crate::store::PersistenceStore;
use crate::types::{AccountId, Listing, ListingId};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct MarketplaceExchange {
    store: Arc<dyn PersistenceStore>,
    ledger: Arc<LedgerService>,
    broadcaster: Arc<dyn EventBroadcaster>,
    clock: Arc<dyn Clock>,
    config: MarketplaceConfig,
}

impl MarketplaceExchange {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        ledger: Arc<LedgerService>,
        broadcaster: Arc<dyn EventBroadcaster>,
        clock: Arc<dyn Clock>,
        config: MarketplaceConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            broadcaster,
            clock,
            config,
        }
    }

    /// All open listings, newest first.
    pub async fn listings(&self) -> EngineResult<Vec<Listing>> {
        let mut listings = self.store.listings().await?;
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listings)
    }

    /// Put an owned item up for sale. The item leaves the seller's inventory
    /// the moment the listing exists, so it cannot be sold twice or used in
    /// an upgrade while listed.
    pub async fn list(
        &self,
        seller: AccountId,
        unique_id: Uuid,
        price: f64,
    ) -> EngineResult<Listing> {
        if !price.is_finite()
            || price < self.config.min_price
            || price > self.config.max_price
        {
            return Err(EngineError::validation(format!(
                "Price must be between {} and {}",
                self.config.min_price, self.config.max_price
            )));
        }

        let account = self.ledger.account(seller).await?;
        if account.level < self.config.sell_level {
            return Err(EngineError::forbidden(format!(
                "Selling requires level {}",
                self.config.sell_level
            )));
        }

        let item = self.ledger.remove_item(seller, unique_id).await?;
        let listing = Listing {
            id: Uuid::new_v4(),
            seller_id: seller,
            item,
            price,
            created_at: self.clock.now(),
        };
        if let Err(e) = self.store.insert_listing(listing.clone()).await {
            // Hand the item back rather than losing it.
            self.ledger.add_item(seller, listing.item).await?;
            return Err(e);
        }

        info!(%seller, listing = %listing.id, price, "Item listed");
        Ok(listing)
    }

    /// Buy a listing. Funds and the item move atomically through the ledger;
    /// losing a race for the same listing surfaces as `NotFound`.
    pub async fn buy(&self, buyer: AccountId, listing_id: ListingId) -> EngineResult<Listing> {
        let account = self.ledger.account(buyer).await?;
        if account.level < self.config.buy_level {
            return Err(EngineError::forbidden(format!(
                "Buying requires level {}",
                self.config.buy_level
            )));
        }

        let listing = self.store.load_listing(listing_id).await?;
        let (buyer_summary, seller_summary) =
            self.ledger.transfer_purchase(buyer, &listing).await?;

        // Best-effort notifications; the purchase already settled.
        self.broadcaster.send_to(
            listing.seller_id,
            GameEvent::Notification {
                message: format!("Your {} sold for {}", listing.item.name, listing.price),
            },
        );
        self.broadcaster.send_to(
            listing.seller_id,
            GameEvent::UserDataUpdated {
                wallet_balance: seller_summary.balance,
                xp: seller_summary.xp,
                level: seller_summary.level,
            },
        );
        self.broadcaster.send_to(
            buyer,
            GameEvent::UserDataUpdated {
                wallet_balance: buyer_summary.balance,
                xp: buyer_summary.xp,
                level: buyer_summary.level,
            },
        );
        Ok(listing)
    }

    /// Withdraw an own listing; the item returns to the seller's inventory.
    pub async fn cancel(&self, seller: AccountId, listing_id: ListingId) -> EngineResult<()> {
        let listing = self.store.load_listing(listing_id).await?;
        if listing.seller_id != seller {
            return Err(EngineError::forbidden("Only the seller can cancel a listing"));
        }

        let removed = self.store.remove_listing(listing_id).await?;
        self.ledger.add_item(seller, removed.item).await?;
        info!(%seller, listing = %listing_id, "Listing cancelled");
        Ok(())
    }
}
