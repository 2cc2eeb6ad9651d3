//! Append-only asset movement history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryKind {
    Assignment,
    Return,
    Replacement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetHistory {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

impl AssetHistory {
    pub fn new(
        asset_id: Uuid,
        user_id: Uuid,
        kind: HistoryKind,
        timestamp: DateTime<Utc>,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id,
            user_id,
            kind,
            timestamp,
            note,
        }
    }
}
