use crate::{
    error::{Result, StampError},
    models::{FormData, ImageAttachment, StampFields},
};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Theme,
    Colors,
    Effects,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Name,
        FormField::Theme,
        FormField::Colors,
        FormField::Effects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Theme => "theme",
            FormField::Colors => "colors",
            FormField::Effects => "effects",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Name => "Stamp name (central text)",
            FormField::Theme => "Theme",
            FormField::Colors => "Main colors",
            FormField::Effects => "Desired effects",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormField {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(FormField::Name),
            "theme" => Ok(FormField::Theme),
            "colors" | "colours" => Ok(FormField::Colors),
            "effects" => Ok(FormField::Effects),
            other => Err(StampError::Validation(format!(
                "unknown field '{}' (expected name, theme, colors or effects)",
                other
            ))),
        }
    }
}

/// Holds the form being edited, including pending image attachments.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    data: FormData,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn fields(&self) -> &StampFields {
        &self.data.fields
    }

    pub fn images(&self) -> &[ImageAttachment] {
        &self.data.images
    }

    pub fn get(&self, field: FormField) -> &str {
        let fields = &self.data.fields;
        match field {
            FormField::Name => &fields.name,
            FormField::Theme => &fields.theme,
            FormField::Colors => &fields.colors,
            FormField::Effects => &fields.effects,
        }
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        let fields = &mut self.data.fields;
        match field {
            FormField::Name => fields.name = value,
            FormField::Theme => fields.theme = value,
            FormField::Colors => fields.colors = value,
            FormField::Effects => fields.effects = value,
        }
    }

    pub fn add_images<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.data
            .images
            .extend(paths.into_iter().map(ImageAttachment::from_path));
    }

    pub fn add_attachment(&mut self, attachment: ImageAttachment) {
        self.data.images.push(attachment);
    }

    /// Removes the image at `index`. Out-of-range indexes are ignored.
    pub fn remove_image(&mut self, index: usize) -> Option<ImageAttachment> {
        if index < self.data.images.len() {
            Some(self.data.images.remove(index))
        } else {
            None
        }
    }

    /// Replaces every scalar field and drops all pending images.
    pub fn restore(&mut self, fields: &StampFields) {
        self.data.fields = fields.clone();
        self.data.images.clear();
    }

    pub fn validate(&self) -> Result<()> {
        let fields = &self.data.fields;
        if fields.name.trim().is_empty() || fields.theme.trim().is_empty() {
            return Err(StampError::Validation(
                "Name and theme are required.".to_string(),
            ));
        }
        Ok(())
    }
}
