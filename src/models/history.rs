use crate::models::StampFields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedResult {
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
}

impl GeneratedResult {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One persisted generation. Stored as
/// `{"id","timestamp"(ms),"prompt","formData":{..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub form_data: StampFields,
}
