use crate::{
    error::{Result, StampError},
    gemini::{
        wire::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse},
        GenerativeBackend,
    },
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

/// Calls the Gemini REST API over HTTPS.
#[derive(Clone)]
pub struct TextClient {
    client: Client,
    endpoint: String,
}

impl TextClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

/// Message to surface for a non-2xx reply: the provider's own message when
/// the body carries one, otherwise the status and raw body.
pub fn upstream_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.trim().is_empty() => envelope.error.message,
        _ if body.trim().is_empty() => format!("Gemini API returned {}", status),
        _ => format!("Gemini API returned {}: {}", status, body.trim()),
    }
}

#[async_trait]
impl GenerativeBackend for TextClient {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.url_for(model);
        log::info!("Invoking model: {}", model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini request failed: {:?}", e);
                StampError::Upstream(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StampError::Upstream(e.to_string()))?;

        if !status.is_success() {
            let message = upstream_error_message(status, &body);
            log::error!("Gemini API error ({}): {}", status, message);
            return Err(StampError::Upstream(message));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!("Unexpected Gemini response body: {}", body);
            StampError::Upstream(format!("could not parse Gemini response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::wire::Content;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one HTTP reply on a local port and hands back the raw request.
    async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/v1beta", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (endpoint, handle)
    }

    fn request() -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content::text("system"),
            contents: vec![Content::user(vec![crate::gemini::wire::Part::text("hello")])],
            generation_config: crate::gemini::wire::GenerationConfig { temperature: 0.7 },
        }
    }

    #[tokio::test]
    async fn success_reply_is_parsed_and_key_sent_in_header() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Selo 3D"}]},"finishReason":"STOP"}]}"#;
        let (endpoint, server) = serve_once("200 OK", body).await;

        let response = TextClient::new(endpoint)
            .generate_content("gemini-2.5-flash", "secret-key", &request())
            .await
            .unwrap();
        assert_eq!(response.text(), "Selo 3D");

        let raw = server.await.unwrap();
        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /v1beta/models/gemini-2.5-flash:generateContent HTTP/1.1"));
        assert!(lower.contains("x-goog-api-key: secret-key"));
        assert!(!raw.contains("key=secret-key"));
        assert!(raw.contains(r#""temperature":0.7"#));
        assert!(raw.contains(r#""systemInstruction""#));
    }

    #[tokio::test]
    async fn error_status_surfaces_provider_message() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#;
        let (endpoint, server) = serve_once("429 Too Many Requests", body).await;

        let err = TextClient::new(endpoint)
            .generate_content("gemini-2.5-flash", "k", &request())
            .await
            .unwrap_err();
        match err {
            StampError::Upstream(message) => {
                assert_eq!(message, "Resource has been exhausted (e.g. check quota).")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unparseable_success_body_is_an_upstream_error() {
        let (endpoint, server) = serve_once("200 OK", "<html>gateway</html>").await;

        let err = TextClient::new(endpoint)
            .generate_content("gemini-2.5-flash", "k", &request())
            .await
            .unwrap_err();
        assert!(matches!(err, StampError::Upstream(ref m) if m.contains("could not parse")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_an_upstream_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = TextClient::new(endpoint)
            .generate_content("gemini-2.5-flash", "k", &request())
            .await
            .unwrap_err();
        match err {
            StampError::Upstream(message) => assert!(!message.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn url_includes_model_and_method() {
        let client = TextClient::new("https://generativelanguage.googleapis.com/v1beta/");
        assert_eq!(
            client.url_for("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn provider_message_is_preferred() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            upstream_error_message(StatusCode::BAD_REQUEST, body),
            "API key not valid. Please pass a valid API key."
        );
    }

    #[test]
    fn raw_body_when_no_provider_message() {
        let message = upstream_error_message(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(message.contains("502"));
        assert!(message.contains("upstream down"));

        let message = upstream_error_message(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(message.contains("429"));
    }
}
