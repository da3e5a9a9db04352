use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingState {
    #[default]
    Idle,
    Generating,
    Success,
    Error,
}

impl ProcessingState {
    pub fn is_generating(&self) -> bool {
        matches!(self, ProcessingState::Generating)
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingState::Idle => "idle",
            ProcessingState::Generating => "generating",
            ProcessingState::Success => "success",
            ProcessingState::Error => "error",
        };
        f.write_str(s)
    }
}

/// One image ready to be sent inline: base64 bytes plus MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinePayload {
    pub mime_type: String,
    pub data: String,
}
