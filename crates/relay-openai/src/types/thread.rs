use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server-side conversation context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

/// Paginated list envelope used by every `GET` collection endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,

    #[serde(default)]
    pub first_id: Option<String>,

    #[serde(default)]
    pub last_id: Option<String>,

    #[serde(default)]
    pub has_more: bool,
}
