use crate::models::ImageAttachment;
use serde::{Deserialize, Serialize};

/// The scalar part of a form: everything that is safe to persist.
/// Missing keys load as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampFields {
    pub name: String,
    pub theme: String,
    pub colors: String,
    pub effects: String,
}

impl StampFields {
    pub fn new(
        name: impl Into<String>,
        theme: impl Into<String>,
        colors: impl Into<String>,
        effects: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            theme: theme.into(),
            colors: colors.into(),
            effects: effects.into(),
        }
    }
}

/// Full form contents. Not serializable: images never leave the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub fields: StampFields,
    pub images: Vec<ImageAttachment>,
}

impl FormData {
    pub fn new(fields: StampFields) -> Self {
        Self {
            fields,
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}
