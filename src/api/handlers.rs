//! Request handlers.
//!
//! Identity comes from the `x-account-id` header; the gateway in front of the
//! engine is expected to have authenticated the caller and stamped it. Every
//! handler validates input, delegates to a service, and maps the result onto
//! a wire DTO.

use super::{errors::ApiError, models::*};
use crate::broadcast::{EventBroadcaster, GameEvent, OpenerInfo};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::ledger::LedgerService;
use crate::marketplace::MarketplaceExchange;
use crate::rewards::{draw_case_item, roll_upgrade, spin_slot, upgrade_success_chance};
use crate::round::RoundCoordinator;
use crate::store::PersistenceStore;
use crate::types::{
    Account, AccountId, CaseTemplate, FixedItem, ItemInstance, Listing, ListingId,
    RarityTier, RoundSnapshot,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use rand::Rng;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub config: EngineConfig,
    pub store: Arc<dyn PersistenceStore>,
    pub ledger: Arc<LedgerService>,
    pub round: Arc<RoundCoordinator>,
    pub marketplace: Arc<MarketplaceExchange>,
    pub broadcaster: Arc<crate::broadcast::ChannelBroadcaster>,
    pub clock: Arc<dyn Clock>,
}

pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Pull the caller's account id out of the headers.
fn account_from_headers(headers: &HeaderMap) -> Result<AccountId, ApiError> {
    let raw = headers
        .get(ACCOUNT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError(EngineError::validation("Missing x-account-id header"))
        })?;
    Uuid::parse_str(raw)
        .map_err(|_| ApiError(EngineError::validation("Invalid x-account-id header")))
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
    })
}

/// POST /user/register
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Account>, ApiError> {
    let username = request.username.trim();
    if username.is_empty() || username.len() > 32 {
        return Err(ApiError(EngineError::validation(
            "Username must be 1 to 32 characters",
        )));
    }
    let account = state.ledger.register(username, state.clock.now()).await?;
    Ok(Json(account))
}

/// GET /user/me
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Account>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let account = state.ledger.account(account_id).await?;
    Ok(Json(account))
}

/// POST /user/bonus
pub async fn bonus_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BonusResponse>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let claim = state
        .ledger
        .claim_bonus(account_id, state.clock.now())
        .await?;

    state.broadcaster.send_to(
        account_id,
        GameEvent::UserDataUpdated {
            wallet_balance: claim.summary.balance,
            xp: claim.summary.xp,
            level: claim.summary.level,
        },
    );
    Ok(Json(BonusResponse::from_claim(
        claim.amount,
        claim.next_bonus_at,
        &claim.summary,
    )))
}

/// PUT /user/fixedItem
pub async fn fixed_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<FixedItemRequest>,
) -> Result<Json<FixedItem>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let fixed = state
        .ledger
        .set_fixed_item(account_id, request.unique_id)
        .await?;
    Ok(Json(fixed))
}

/// PUT /user/fixedItem/description
pub async fn fixed_item_note_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<FixedItemNoteRequest>,
) -> Result<Json<FixedItem>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let fixed = state
        .ledger
        .set_fixed_item_note(account_id, &request.description)
        .await?;
    Ok(Json(fixed))
}

/// GET /game/cases
pub async fn cases_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CaseTemplate>>, ApiError> {
    let cases = state.store.cases().await?;
    Ok(Json(cases))
}

/// POST /game/openCase/:case_id
pub async fn open_case_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(case_id): Path<Uuid>,
    Json(request): Json<OpenCaseRequest>,
) -> Result<Json<OpenCaseResponse>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let max = state.config.cases.max_open_quantity;
    if request.quantity < 1 || request.quantity > max {
        return Err(ApiError(EngineError::validation(format!(
            "Quantity must be between 1 and {}",
            max
        ))));
    }

    let case = state.store.load_case(case_id).await?;
    let now = state.clock.now();

    // The rng scope ends before any await point.
    let items: Vec<ItemInstance> = {
        let mut rng = rand::thread_rng();
        let mut drawn = Vec::with_capacity(request.quantity as usize);
        for _ in 0..request.quantity {
            drawn.push(draw_case_item(&case, &mut rng, now)?);
        }
        drawn
    };

    let cost = case.price * request.quantity as f64;
    let summary = state
        .ledger
        .apply_case_open(account_id, cost, items.clone())
        .await?;

    let account = state.ledger.account(account_id).await?;
    state.broadcaster.broadcast(GameEvent::CaseOpened {
        winning_items: items.clone(),
        user: OpenerInfo {
            id: account.id,
            name: account.username.clone(),
        },
        case_image: case.image.clone(),
    });
    state.broadcaster.send_to(
        account_id,
        GameEvent::UserDataUpdated {
            wallet_balance: summary.balance,
            xp: summary.xp,
            level: summary.level,
        },
    );

    info!(account = %account_id, case = %case_id, quantity = request.quantity, "Case opened");
    Ok(Json(OpenCaseResponse {
        items,
        wallet_balance: summary.balance,
    }))
}

/// POST /game/slots
pub async fn slots_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SlotsRequest>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let bet = request.bet_amount;
    let limits = &state.config.slots;
    if !bet.is_finite() || bet < limits.min_bet || bet > limits.max_bet {
        return Err(ApiError(EngineError::validation(format!(
            "Bet must be between {} and {}",
            limits.min_bet, limits.max_bet
        ))));
    }

    let outcome = {
        let mut rng = rand::thread_rng();
        spin_slot(&mut rng)
    };
    let total_payout = bet * outcome.total_multiplier;

    let summary = state
        .ledger
        .apply_slot_spin(account_id, bet, total_payout)
        .await?;

    state.broadcaster.send_to(
        account_id,
        GameEvent::UserDataUpdated {
            wallet_balance: summary.balance,
            xp: summary.xp,
            level: summary.level,
        },
    );

    Ok(Json(SlotsResponse {
        user_id: account_id,
        bet_amount: bet,
        grid_state: outcome.grid.iter().map(|s| s.to_string()).collect(),
        last_spin_result: outcome.wins,
        maneki_neko_feature: outcome.maneki_neko,
        total_payout,
        wallet_balance: summary.balance,
    }))
}

/// POST /game/upgrade
pub async fn upgrade_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<UpgradeRequest>,
) -> Result<Json<UpgradeResponse>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    if request.selected_items_ids.is_empty() {
        return Err(ApiError(EngineError::validation(
            "At least one item must be selected",
        )));
    }
    let mut deduped = request.selected_items_ids.clone();
    deduped.sort();
    deduped.dedup();
    if deduped.len() != request.selected_items_ids.len() {
        return Err(ApiError(EngineError::validation(
            "Duplicate items in selection",
        )));
    }
    let target = RarityTier::new(request.target_rarity_id)
        .ok_or_else(|| ApiError(EngineError::validation("Unknown target rarity")))?;

    let account = state.ledger.account(account_id).await?;
    let mut sources = Vec::with_capacity(request.selected_items_ids.len());
    for unique_id in &request.selected_items_ids {
        let item = account
            .find_item(*unique_id)
            .ok_or(ApiError(EngineError::NotFound("Item")))?;
        sources.push(item.rarity);
    }

    // The upgraded item is drawn from every template of the target rarity
    // across the whole catalog.
    let cases = state.store.cases().await?;
    let pool: Vec<_> = cases
        .iter()
        .flat_map(|case| case.items.iter())
        .filter(|template| template.rarity == target)
        .collect();
    if pool.is_empty() {
        return Err(ApiError(EngineError::validation(
            "No items exist at the target rarity",
        )));
    }

    let chance = upgrade_success_chance(&sources, target);
    let (success, minted) = {
        let mut rng = rand::thread_rng();
        if roll_upgrade(&sources, target, &mut rng) {
            let template = pool[rng.gen_range(0..pool.len())];
            (true, Some(ItemInstance::stamp(template, state.clock.now())))
        } else {
            (false, None)
        }
    };

    let summary = state
        .ledger
        .apply_upgrade(account_id, &request.selected_items_ids, minted.clone())
        .await?;

    state.broadcaster.send_to(
        account_id,
        GameEvent::UserDataUpdated {
            wallet_balance: summary.balance,
            xp: summary.xp,
            level: summary.level,
        },
    );

    info!(account = %account_id, %target, success, "Upgrade rolled");
    Ok(Json(UpgradeResponse {
        success,
        item: minted,
        success_chance: chance,
    }))
}

/// GET /game/coinflip
pub async fn coinflip_state_handler(
    State(state): State<Arc<AppState>>,
) -> Json<RoundSnapshot> {
    Json(state.round.snapshot().await)
}

/// GET /marketplace/
pub async fn listings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let listings = state.marketplace.listings().await?;
    Ok(Json(ListingsResponse { listings }))
}

/// POST /marketplace/
pub async fn list_item_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ListItemRequest>,
) -> Result<Json<Listing>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let listing = state
        .marketplace
        .list(account_id, request.unique_id, request.price)
        .await?;
    Ok(Json(listing))
}

/// POST /marketplace/buy/:listing_id
pub async fn buy_listing_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(listing_id): Path<ListingId>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    let listing = state.marketplace.buy(account_id, listing_id).await?;
    let account = state.ledger.account(account_id).await?;
    Ok(Json(PurchaseResponse {
        item: listing.item,
        price: listing.price,
        wallet_balance: account.balance,
    }))
}

/// DELETE /marketplace/:listing_id
pub async fn cancel_listing_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(listing_id): Path<ListingId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id = account_from_headers(&headers)?;
    state.marketplace.cancel(account_id, listing_id).await?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}
