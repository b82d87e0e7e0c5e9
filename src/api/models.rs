//! Request and response bodies for the HTTP API.
//!
//! Wire field names are camelCase; domain types already rename their own
//! fields, so only the DTOs defined here need explicit renames.

use crate::ledger::AccountSummary;
use crate::rewards::LineWin;
use crate::types::{AccountId, ItemInstance, Listing};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenCaseRequest {
    /// Cases opened in one request; defaults to a single case.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenCaseResponse {
    pub items: Vec<ItemInstance>,
    #[serde(rename = "walletBalance")]
    pub wallet_balance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlotsRequest {
    #[serde(rename = "betAmount")]
    pub bet_amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlotsResponse {
    #[serde(rename = "userId")]
    pub user_id: AccountId,
    #[serde(rename = "betAmount")]
    pub bet_amount: f64,
    /// Nine symbol names, rows top to bottom.
    #[serde(rename = "gridState")]
    pub grid_state: Vec<String>,
    #[serde(rename = "lastSpinResult")]
    pub last_spin_result: Vec<LineWin>,
    #[serde(rename = "manekiNekoFeature")]
    pub maneki_neko_feature: bool,
    #[serde(rename = "totalPayout")]
    pub total_payout: f64,
    #[serde(rename = "walletBalance")]
    pub wallet_balance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpgradeRequest {
    #[serde(rename = "selectedItemsIds")]
    pub selected_items_ids: Vec<Uuid>,
    #[serde(rename = "targetRarityId")]
    pub target_rarity_id: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpgradeResponse {
    pub success: bool,
    /// Present only on a successful upgrade.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemInstance>,
    #[serde(rename = "successChance")]
    pub success_chance: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListItemRequest {
    #[serde(rename = "uniqueId")]
    pub unique_id: Uuid,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FixedItemRequest {
    #[serde(rename = "uniqueId")]
    pub unique_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FixedItemNoteRequest {
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BonusResponse {
    pub amount: f64,
    #[serde(rename = "nextBonus")]
    pub next_bonus_at: DateTime<Utc>,
    #[serde(rename = "walletBalance")]
    pub wallet_balance: f64,
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub item: ItemInstance,
    pub price: f64,
    #[serde(rename = "walletBalance")]
    pub wallet_balance: f64,
}

impl BonusResponse {
    pub fn from_claim(amount: f64, next_bonus_at: DateTime<Utc>, summary: &AccountSummary) -> Self {
        Self {
            amount,
            next_bonus_at,
            wallet_balance: summary.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_case_quantity_defaults_to_one() {
        let request: OpenCaseRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.quantity, 1);
    }

    #[test]
    fn test_slots_request_wire_name() {
        let request: SlotsRequest = serde_json::from_str(r#"{"betAmount": 12.5}"#).unwrap();
        assert_eq!(request.bet_amount, 12.5);
    }

    #[test]
    fn test_upgrade_request_wire_names() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"selectedItemsIds": ["{}"], "targetRarityId": 3}}"#,
            id
        );
        let request: UpgradeRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(request.selected_items_ids, vec![id]);
        assert_eq!(request.target_rarity_id, 3);
    }
}
