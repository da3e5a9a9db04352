use crate::{
    error::{Result, StampError},
    form::FormState,
    gemini::PromptClient,
    history::{Confirm, HistoryStore},
    models::{GeneratedResult, HistoryItem, ProcessingState},
};
use tokio::sync::watch;

/// One user's working session: the form, the processing state machine, the
/// last result and the history store.
///
/// State transitions:
/// `Idle | Success | Error --submit(valid)--> Generating --> Success | Error`.
/// A rejected submit (invalid form, or another generation holding the
/// client's slot) leaves the state where it was.
pub struct Session {
    form: FormState,
    client: PromptClient,
    history: HistoryStore,
    result: Option<GeneratedResult>,
    error_message: Option<String>,
    state: watch::Sender<ProcessingState>,
}

impl Session {
    pub fn new(client: PromptClient, history: HistoryStore) -> Self {
        let (state, _) = watch::channel(ProcessingState::Idle);
        Self {
            form: FormState::new(),
            client,
            history,
            result: None,
            error_message: None,
            state,
        }
    }

    pub fn state(&self) -> ProcessingState {
        *self.state.borrow()
    }

    /// Receives every state change.
    pub fn subscribe(&self) -> watch::Receiver<ProcessingState> {
        self.state.subscribe()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn result(&self) -> Option<&GeneratedResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    fn transition(&self, next: ProcessingState) {
        let previous = self.state.send_replace(next);
        log::debug!("State {} -> {}", previous, next);
    }

    pub async fn submit(&mut self) -> Result<&GeneratedResult> {
        if let Err(e) = self.form.validate() {
            self.error_message = Some(e.to_string());
            return Err(e);
        }

        let reservation = match self.client.reserve() {
            Ok(reservation) => reservation,
            Err(e) => {
                self.error_message = Some(e.to_string());
                return Err(e);
            }
        };

        self.transition(ProcessingState::Generating);
        self.error_message = None;
        self.result = None;

        let form = self.form.data().clone();
        match reservation.generate(&form).await {
            Ok(prompt) => {
                if let Err(e) = self.history.record(&prompt, &form).await {
                    log::warn!("Generated prompt could not be saved to history: {}", e);
                }
                self.transition(ProcessingState::Success);
                Ok(self.result.insert(GeneratedResult::new(prompt)))
            }
            Err(e) => {
                log::error!("Generation failed: {}", e);
                self.error_message = Some(e.to_string());
                self.transition(ProcessingState::Error);
                Err(e)
            }
        }
    }

    /// Loads the history item at `index` back into the form.
    pub fn restore(&mut self, index: usize) -> Result<&HistoryItem> {
        let item = self.history.get(index).ok_or_else(|| {
            StampError::Validation(format!("no history item #{}", index + 1))
        })?;
        self.history.restore(item, &mut self.form);
        Ok(item)
    }

    pub async fn clear_history(&mut self, confirm: &mut dyn Confirm) -> Result<bool> {
        self.history.clear(confirm).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;
    use crate::form::FormField;
    use crate::gemini::testing::{client_with, FakeBackend, Reply};
    use crate::gemini::GenerativeBackend;
    use crate::gemini::wire::{GenerateContentRequest, GenerateContentResponse};
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    async fn session_with(backend: Arc<FakeBackend>, storage: MemoryStorage) -> Session {
        let history = HistoryStore::load(Arc::new(storage)).await;
        Session::new(client_with(backend), history)
    }

    fn fill(session: &mut Session) {
        let form = session.form_mut();
        form.set_field(FormField::Name, "NOITADA DE TRAVESSURAS");
        form.set_field(FormField::Theme, "Halloween");
        form.set_field(FormField::Colors, "Laranja, Roxo");
        form.set_field(FormField::Effects, "Glow, Fogo");
    }

    /// Records the session state the backend observes while it is called.
    struct StateWatcher {
        rx: Mutex<Option<watch::Receiver<ProcessingState>>>,
        seen: Mutex<Vec<ProcessingState>>,
        fail: bool,
    }

    impl StateWatcher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(StateWatcher {
                rx: Mutex::new(None),
                seen: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    async fn watched_session(watcher: Arc<StateWatcher>) -> Session {
        let client = PromptClient::with_backend(
            GeminiConfig::new().with_api_key("k"),
            watcher.clone(),
        );
        let history = HistoryStore::load(Arc::new(MemoryStorage::new())).await;
        let mut session = Session::new(client, history);
        *watcher.rx.lock().unwrap() = Some(session.subscribe());
        fill(&mut session);
        session
    }

    #[async_trait]
    impl GenerativeBackend for StateWatcher {
        async fn generate_content(
            &self,
            _model: &str,
            _api_key: &str,
            _request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            let state = self.rx.lock().unwrap().as_ref().map(|rx| *rx.borrow());
            if let Some(state) = state {
                self.seen.lock().unwrap().push(state);
            }
            if self.fail {
                return Err(StampError::Upstream("model overloaded".into()));
            }
            Ok(GenerateContentResponse::from_text("watched"))
        }
    }

    #[tokio::test]
    async fn successful_submit_goes_through_generating() {
        let watcher = StateWatcher::new(false);
        let mut session = watched_session(watcher.clone()).await;

        assert_eq!(session.state(), ProcessingState::Idle);
        session.submit().await.unwrap();

        assert_eq!(*watcher.seen.lock().unwrap(), vec![ProcessingState::Generating]);
        assert_eq!(session.state(), ProcessingState::Success);
        assert_eq!(session.result().unwrap().prompt, "watched");
        assert!(session.error_message().is_none());
    }

    #[tokio::test]
    async fn failed_submit_goes_through_generating() {
        let watcher = StateWatcher::new(true);
        let mut session = watched_session(watcher.clone()).await;
        let mut states = session.subscribe();

        assert!(session.submit().await.is_err());

        assert_eq!(*watcher.seen.lock().unwrap(), vec![ProcessingState::Generating]);
        assert_eq!(session.state(), ProcessingState::Error);
        assert_eq!(session.error_message(), Some("model overloaded"));
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), ProcessingState::Error);

        assert!(session.submit().await.is_err());
        assert_eq!(watcher.seen.lock().unwrap().len(), 2);
        assert!(watcher.seen.lock().unwrap().iter().all(|s| s.is_generating()));
    }

    #[tokio::test]
    async fn example_generation_is_recorded() {
        let storage = MemoryStorage::new();
        let mut session = session_with(Arc::new(FakeBackend::new(Reply::Echo)), storage.clone()).await;
        fill(&mut session);

        let prompt = session.submit().await.unwrap().prompt.clone();
        assert!(prompt.contains("NOITADA DE TRAVESSURAS"));

        session.submit().await.unwrap();
        let items = session.history().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].form_data, session.form().fields().clone());
        assert_ne!(items[0].id, items[1].id);

        let reloaded = HistoryStore::load(Arc::new(storage)).await;
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn invalid_submit_keeps_state_and_sets_message() {
        let backend = Arc::new(FakeBackend::new(Reply::Echo));
        let mut session = session_with(backend.clone(), MemoryStorage::new()).await;
        session.form_mut().set_field(FormField::Name, "ONLY NAME");

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, StampError::Validation(_)));
        assert_eq!(session.state(), ProcessingState::Idle);
        assert!(session.error_message().is_some());
        assert_eq!(backend.call_count(), 0);

        fill(&mut session);
        session.submit().await.unwrap();
        session.form_mut().set_field(FormField::Theme, "");
        assert!(session.submit().await.is_err());
        assert_eq!(session.state(), ProcessingState::Success);
        assert!(session.result().is_some());
    }

    #[tokio::test]
    async fn upstream_failure_ends_in_error_and_allows_resubmit() {
        let backend = Arc::new(FakeBackend::new(Reply::Fail("quota exceeded".into())));
        let storage = MemoryStorage::new();
        let mut session = session_with(backend.clone(), storage.clone()).await;
        fill(&mut session);

        assert!(session.submit().await.is_err());
        assert_eq!(session.state(), ProcessingState::Error);
        assert_eq!(session.error_message(), Some("quota exceeded"));
        assert!(session.result().is_none());
        assert!(session.history().is_empty());

        assert!(session.submit().await.is_err());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_credential_is_an_error_state() {
        let backend = Arc::new(FakeBackend::new(Reply::Echo));
        let client = PromptClient::with_backend(GeminiConfig::new(), backend.clone());
        let history = HistoryStore::load(Arc::new(MemoryStorage::new())).await;
        let mut session = Session::new(client, history);
        fill(&mut session);

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, StampError::Auth(_)));
        assert_eq!(session.state(), ProcessingState::Error);
        assert!(session.error_message().unwrap().contains("API key not found"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn busy_client_rejects_without_transition() {
        let backend = Arc::new(FakeBackend::new(Reply::Echo));
        let client = client_with(backend);
        let history = HistoryStore::load(Arc::new(MemoryStorage::new())).await;
        let mut session = Session::new(client.clone(), history);
        fill(&mut session);

        let held = client.reserve().unwrap();
        assert!(matches!(session.submit().await, Err(StampError::Busy)));
        assert_eq!(session.state(), ProcessingState::Idle);
        drop(held);

        session.submit().await.unwrap();
        assert_eq!(session.state(), ProcessingState::Success);
    }

    #[tokio::test]
    async fn restore_from_history_resets_images() {
        let mut session =
            session_with(Arc::new(FakeBackend::new(Reply::Text("ok".into()))), MemoryStorage::new()).await;
        fill(&mut session);
        session.submit().await.unwrap();
        let saved = session.form().fields().clone();

        session.form_mut().set_field(FormField::Name, "OUTRO");
        session.form_mut().add_images(["ref.png"]);
        let restored = session.restore(0).unwrap().form_data.clone();

        assert_eq!(restored, saved);
        assert_eq!(session.form().fields(), &saved);
        assert!(session.form().images().is_empty());
        assert!(session.restore(5).is_err());
    }

    #[tokio::test]
    async fn clear_history_through_session() {
        let mut session =
            session_with(Arc::new(FakeBackend::new(Reply::Text("ok".into()))), MemoryStorage::new()).await;
        fill(&mut session);
        session.submit().await.unwrap();

        assert!(!session.clear_history(&mut |_: &str| false).await.unwrap());
        assert_eq!(session.history().len(), 1);
        assert!(session.clear_history(&mut |_: &str| true).await.unwrap());
        assert!(session.history().is_empty());
    }
}
