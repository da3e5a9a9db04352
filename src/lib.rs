pub mod config;
pub mod error;
pub mod form;
pub mod gemini;
pub mod history;
pub mod logger;
pub mod models;
pub mod presenter;
pub mod session;
pub mod storage;

pub use config::{resolve_api_key, Config, CredentialSource, GeminiConfig};
pub use error::{Result, StampError};
pub use form::{FormField, FormState};
pub use gemini::{GenerativeBackend, PromptClient, TextClient};
pub use history::{Confirm, HistoryStore, HISTORY_KEY};
pub use models::{
    FormData, GeneratedResult, HistoryItem, ImageAttachment, InlinePayload, ProcessingState,
    StampFields,
};
pub use presenter::{Clipboard, HistoryPanel, ResultPresenter, SessionClipboard, SystemClipboard};
pub use session::Session;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
