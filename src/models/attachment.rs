use std::path::{Path, PathBuf};

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A reference image picked by the user. Only the path is kept; bytes are
/// read when the form is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub path: PathBuf,
    pub mime_type: String,
}

impl ImageAttachment {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mime_type = mime_type_for(&path).to_string();
        Self { path, mime_type }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("svg") => "image/svg+xml",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => FALLBACK_MIME_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_comes_from_extension() {
        assert_eq!(ImageAttachment::from_path("a/b/ref.PNG").mime_type, "image/png");
        assert_eq!(ImageAttachment::from_path("photo.jpeg").mime_type, "image/jpeg");
        assert_eq!(ImageAttachment::from_path("photo.jpg").mime_type, "image/jpeg");
        assert_eq!(ImageAttachment::from_path("noext").mime_type, FALLBACK_MIME_TYPE);
    }

    #[test]
    fn file_name_is_last_component() {
        let attachment = ImageAttachment::from_path("/refs/pumpkin.webp");
        assert_eq!(attachment.file_name(), "pumpkin.webp");
    }
}
