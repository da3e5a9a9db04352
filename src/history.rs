use crate::{
    error::{Result, StampError},
    form::FormState,
    models::{FormData, HistoryItem},
    storage::KeyValueStorage,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const HISTORY_KEY: &str = "stamp_gen_history";
pub const CLEAR_QUESTION: &str = "Are you sure you want to clear the entire history?";

/// Yes/no prompt shown before destructive operations.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Millisecond timestamp followed by nine random lowercase alphanumerics.
pub fn new_history_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("{}{}", Utc::now().timestamp_millis(), suffix)
}

/// Past generations, newest first, mirrored to one storage key.
pub struct HistoryStore {
    storage: Arc<dyn KeyValueStorage>,
    items: Vec<HistoryItem>,
}

impl HistoryStore {
    /// Reads the persisted list. Unreadable or corrupt data is logged and
    /// replaced by an empty history.
    pub async fn load(storage: Arc<dyn KeyValueStorage>) -> Self {
        let items = match Self::read(storage.as_ref()).await {
            Ok(items) => items,
            Err(e) => {
                log::error!("Failed to load history, starting empty: {}", e);
                Vec::new()
            }
        };
        log::debug!("Loaded {} history item(s)", items.len());
        Self { storage, items }
    }

    async fn read(storage: &dyn KeyValueStorage) -> Result<Vec<HistoryItem>> {
        match storage.get(HISTORY_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .map_err(|e| StampError::StorageParse(e.to_string())),
            _ => Ok(Vec::new()),
        }
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryItem> {
        self.items.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Prepends a new item (images dropped) and rewrites the stored list.
    pub async fn record(&mut self, prompt: &str, form: &FormData) -> Result<&HistoryItem> {
        let item = HistoryItem {
            id: new_history_id(),
            timestamp: Utc::now(),
            prompt: prompt.to_string(),
            form_data: form.fields.clone(),
        };
        log::debug!("Recording history item {}", item.id);

        self.items.insert(0, item);
        self.persist().await?;
        Ok(&self.items[0])
    }

    async fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.items)?;
        self.storage.set(HISTORY_KEY, &raw).await
    }

    /// Loads the item's fields into `form` and empties its images.
    pub fn restore(&self, item: &HistoryItem, form: &mut FormState) {
        form.restore(&item.form_data);
    }

    /// Empties the history after `confirm` agrees. Returns whether it did.
    pub async fn clear(&mut self, confirm: &mut dyn Confirm) -> Result<bool> {
        if !confirm.confirm(CLEAR_QUESTION) {
            return Ok(false);
        }
        self.storage.remove(HISTORY_KEY).await?;
        self.items.clear();
        log::info!("History cleared");
        Ok(true)
    }
}
