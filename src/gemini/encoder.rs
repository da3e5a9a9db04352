use crate::{
    error::{Result, StampError},
    models::{ImageAttachment, InlinePayload},
};
use base64::{engine::general_purpose, Engine as _};
use futures::future::try_join_all;

pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> InlinePayload {
    InlinePayload {
        mime_type: mime_type.to_string(),
        data: general_purpose::STANDARD.encode(bytes),
    }
}

pub async fn encode_attachment(attachment: &ImageAttachment) -> Result<InlinePayload> {
    let bytes = tokio::fs::read(&attachment.path)
        .await
        .map_err(|e| StampError::io(&attachment.path, e))?;

    log::debug!(
        "Encoded {} ({} bytes, {})",
        attachment.file_name(),
        bytes.len(),
        attachment.mime_type
    );

    Ok(encode_bytes(&bytes, &attachment.mime_type))
}

/// Reads and encodes every attachment concurrently. The output keeps the
/// input order; the first unreadable file fails the whole batch.
pub async fn encode_all(attachments: &[ImageAttachment]) -> Result<Vec<InlinePayload>> {
    try_join_all(attachments.iter().map(encode_attachment)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn encodes_standard_base64() {
        let payload = encode_bytes(&[0x89, b'P', b'N', b'G'], "image/png");
        assert_eq!(payload.data, "iVBORw==");
        assert_eq!(payload.mime_type, "image/png");
    }

    #[tokio::test]
    async fn keeps_attachment_order() {
        let dir = TempDir::new().unwrap();
        let mut attachments = Vec::new();
        for (name, body) in [
            ("one.png", b"first".as_slice()),
            ("two.jpg", b"second".as_slice()),
            ("three.webp", b"third".as_slice()),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            attachments.push(ImageAttachment::from_path(path));
        }

        let payloads = encode_all(&attachments).await.unwrap();
        let decoded: Vec<Vec<u8>> = payloads
            .iter()
            .map(|p| general_purpose::STANDARD.decode(&p.data).unwrap())
            .collect();
        assert_eq!(decoded, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
        assert_eq!(payloads[1].mime_type, "image/jpeg");
        assert_eq!(payloads[2].mime_type, "image/webp");
    }

    #[tokio::test]
    async fn unreadable_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let ok = dir.path().join("ok.png");
        std::fs::write(&ok, b"x").unwrap();
        let missing = dir.path().join("missing.png");

        let err = encode_all(&[
            ImageAttachment::from_path(ok),
            ImageAttachment::from_path(&missing),
        ])
        .await
        .unwrap_err();

        match err {
            StampError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_attachments_is_empty() {
        assert!(encode_all(&[]).await.unwrap().is_empty());
    }
}
