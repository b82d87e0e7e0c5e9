//! Route definitions.

use super::{handlers::*, websocket::websocket_handler};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Account lifecycle and progression
        .route("/user/register", post(register_handler))
        .route("/user/me", get(me_handler))
        .route("/user/bonus", post(bonus_handler))
        .route("/user/fixedItem", put(fixed_item_handler))
        .route("/user/fixedItem/description", put(fixed_item_note_handler))
        // Games
        .route("/game/cases", get(cases_handler))
        .route("/game/openCase/:case_id", post(open_case_handler))
        .route("/game/slots", post(slots_handler))
        .route("/game/upgrade", post(upgrade_handler))
        .route("/game/coinflip", get(coinflip_state_handler))
        // Marketplace
        .route("/marketplace/", get(listings_handler).post(list_item_handler))
        .route("/marketplace/buy/:listing_id", post(buy_listing_handler))
        .route("/marketplace/:listing_id", delete(cancel_listing_handler))
        // Real-time events
        .route("/ws", get(websocket_handler))
        .with_state(state)
}
