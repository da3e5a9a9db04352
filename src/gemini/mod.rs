pub mod encoder;
pub mod instruction;
pub mod text_client;
pub mod wire;

use crate::{
    config::GeminiConfig,
    error::{Result, StampError},
    logger,
    models::{FormData, InlinePayload},
};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

pub use instruction::{build_user_prompt, EMPTY_RESPONSE_FALLBACK, SYSTEM_INSTRUCTION};
pub use text_client::TextClient;
use wire::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};

/// Anything that can answer a `generateContent` call.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

/// Single-slot guard: at most one generation may be outstanding.
#[derive(Clone, Default)]
pub struct GenerationSlot {
    busy: Arc<AtomicBool>,
}

impl GenerationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<SlotGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StampError::Busy)?;
        Ok(SlotGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Turns form contents into a stamp prompt. Clones share one [`GenerationSlot`].
#[derive(Clone)]
pub struct PromptClient {
    config: GeminiConfig,
    backend: Arc<dyn GenerativeBackend>,
    slot: GenerationSlot,
}

impl PromptClient {
    pub fn new(config: GeminiConfig) -> Self {
        let backend = TextClient::new(config.endpoint.clone());
        Self::with_backend(config, Arc::new(backend))
    }

    pub fn with_backend(config: GeminiConfig, backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            config,
            backend,
            slot: GenerationSlot::new(),
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    /// Claims the in-flight slot. Fails with [`StampError::Busy`] while another
    /// generation holds it.
    pub fn reserve(&self) -> Result<Reservation<'_>> {
        let guard = self.slot.try_acquire()?;
        Ok(Reservation {
            client: self,
            _guard: guard,
        })
    }

    pub async fn generate(&self, form: &FormData) -> Result<String> {
        self.reserve()?.generate(form).await
    }

    pub fn build_request(
        &self,
        form: &FormData,
        images: Vec<InlinePayload>,
    ) -> GenerateContentRequest {
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::text(build_user_prompt(&form.fields, form.has_images())));
        parts.extend(images.into_iter().map(Part::inline));

        GenerateContentRequest {
            system_instruction: Content::text(SYSTEM_INSTRUCTION),
            contents: vec![Content::user(parts)],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        }
    }
}

/// A claimed slot; dropping it frees the slot.
pub struct Reservation<'a> {
    client: &'a PromptClient,
    _guard: SlotGuard,
}

impl Reservation<'_> {
    pub async fn generate(self, form: &FormData) -> Result<String> {
        let client = self.client;
        let api_key = client.config.require_api_key()?;

        let images = encoder::encode_all(&form.images).await?;
        let request = client.build_request(form, images);

        let _timer = logger::timer("gemini generateContent");
        let response = client
            .backend
            .generate_content(&client.config.model, api_key, &request)
            .await?;

        let text = response.text();
        if text.trim().is_empty() {
            log::warn!("Model returned an empty response, using fallback text");
            return Ok(EMPTY_RESPONSE_FALLBACK.to_string());
        }
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    pub enum Reply {
        Text(String),
        Fail(String),
        /// Echo the user text part back.
        Echo,
    }

    /// In-process backend that records every request it receives.
    pub struct FakeBackend {
        reply: Reply,
        pub calls: Mutex<Vec<GenerateContentRequest>>,
        pub gate: Option<Arc<Notify>>,
    }

    impl FakeBackend {
        pub fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        pub fn gated(reply: Reply, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(reply)
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeBackend for FakeBackend {
        async fn generate_content(
            &self,
            _model: &str,
            _api_key: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match &self.reply {
                Reply::Text(text) => Ok(GenerateContentResponse::from_text(text.clone())),
                Reply::Fail(message) => Err(StampError::Upstream(message.clone())),
                Reply::Echo => Ok(GenerateContentResponse::from_text(
                    request.contents[0].joined_text(),
                )),
            }
        }
    }

    pub fn client_with(backend: Arc<FakeBackend>) -> PromptClient {
        PromptClient::with_backend(GeminiConfig::new().with_api_key("test-key"), backend)
    }
}
