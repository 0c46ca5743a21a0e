//! Mock gateway and store-level tests
//!
//! The mock returns queued outcomes and can hold every call until the test
//! releases it, which is how in-flight behavior is exercised.

use super::ConversationStore;
use crate::llm::{GatewayError, GenerationGateway, TextRequest};
use crate::state_machine::SessionSnapshot;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

type Outcome = Result<Option<String>, GatewayError>;

// ============================================================================
// Mock Gateway
// ============================================================================

/// Gateway that replays queued outcomes and records every request
pub struct MockGateway {
    text_outcomes: Mutex<VecDeque<Outcome>>,
    image_outcomes: Mutex<VecDeque<Outcome>>,
    text_requests: Mutex<Vec<TextRequest>>,
    image_prompts: Mutex<Vec<String>>,
    /// When set, each call waits for a permit before answering
    gate: Option<Arc<Semaphore>>,
}

#[allow(dead_code)]
impl MockGateway {
    pub fn new() -> Self {
        Self {
            text_outcomes: Mutex::new(VecDeque::new()),
            image_outcomes: Mutex::new(VecDeque::new()),
            text_requests: Mutex::new(Vec::new()),
            image_prompts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// A gateway whose calls block until [`MockGateway::release`]
    pub fn held() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    /// Let `n` held calls finish
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn queue_text(&self, text: Option<&str>) {
        self.text_outcomes
            .lock()
            .unwrap()
            .push_back(Ok(text.map(str::to_string)));
    }

    pub fn queue_text_error(&self, error: GatewayError) {
        self.text_outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_image(&self, url: Option<&str>) {
        self.image_outcomes
            .lock()
            .unwrap()
            .push_back(Ok(url.map(str::to_string)));
    }

    pub fn queue_image_error(&self, error: GatewayError) {
        self.image_outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_text_requests(&self) -> Vec<TextRequest> {
        self.text_requests.lock().unwrap().clone()
    }

    pub fn recorded_image_prompts(&self) -> Vec<String> {
        self.image_prompts.lock().unwrap().clone()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationGateway for MockGateway {
    async fn generate_text(&self, request: &TextRequest) -> Result<Option<String>, GatewayError> {
        self.text_requests.lock().unwrap().push(request.clone());
        self.wait_for_gate().await;
        self.text_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::network("No mock response queued")))
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, GatewayError> {
        self.image_prompts.lock().unwrap().push(prompt.to_string());
        self.wait_for_gate().await;
        self.image_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::network("No mock response queued")))
    }

    fn text_model(&self) -> &str {
        "mock-text"
    }

    fn image_model(&self) -> &str {
        "mock-image"
    }
}

/// Wait until no gateway call is outstanding
pub async fn wait_settled(store: &ConversationStore, timeout: Duration) -> SessionSnapshot {
    let mut rx = store.subscribe();
    let snapshot = tokio::time::timeout(
        timeout,
        rx.wait_for(|s| !s.is_typing && !s.is_generating_image),
    )
    .await
    .expect("store did not settle in time")
    .expect("store dropped")
    .clone();
    snapshot
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{GatewayErrorKind, LoggingGateway, MessageRole};
    use crate::runtime::SseEvent;
    use crate::state_machine::state::Operation;
    use crate::state_machine::transition::FALLBACK_REPLY;

    const WAIT: Duration = Duration::from_secs(2);

    fn store_with(gateway: &Arc<MockGateway>) -> ConversationStore {
        ConversationStore::new(gateway.clone())
    }

    fn contents(snapshot: &SessionSnapshot) -> Vec<(MessageRole, String)> {
        snapshot
            .messages
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_mock_gateway_queue() {
        let mock = MockGateway::new();
        mock.queue_text(Some("Hello"));

        let request = TextRequest {
            message: "hi".to_string(),
            history: vec![],
            force_language: false,
        };
        assert_eq!(mock.generate_text(&request).await.unwrap().as_deref(), Some("Hello"));

        // Nothing left
        assert!(mock.generate_text(&request).await.is_err());
        assert_eq!(mock.recorded_text_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text(Some("hello"));
        let store = store_with(&gateway);

        assert!(store.submit_user_message("hi"));
        let snapshot = wait_settled(&store, WAIT).await;

        assert_eq!(
            contents(&snapshot),
            vec![
                (MessageRole::User, "hi".to_string()),
                (MessageRole::Assistant, "hello".to_string())
            ]
        );
        assert_eq!(snapshot.chaos.level, 5);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_blank_submissions_ignored() {
        let gateway = Arc::new(MockGateway::new());
        let store = store_with(&gateway);

        for text in ["", "  ", "\n"] {
            assert!(!store.submit_user_message(text));
        }
        let snapshot = store.snapshot();
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.chaos.level, 0);
        assert!(gateway.recorded_text_requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_completion_uses_fallback() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text(None);
        let store = store_with(&gateway);

        store.submit_user_message("hi");
        let snapshot = wait_settled(&store, WAIT).await;
        assert_eq!(snapshot.messages[1].content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_user_message() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text_error(GatewayError::auth("bad key"));
        let store = store_with(&gateway);

        assert!(store.submit_user_message("hi"));
        let snapshot = wait_settled(&store, WAIT).await;

        assert_eq!(contents(&snapshot), vec![(MessageRole::User, "hi".to_string())]);
        assert_eq!(snapshot.chaos.level, 5);
        assert!(!snapshot.is_typing);
        let report = snapshot.last_error.unwrap();
        assert_eq!(report.operation, Operation::Text);
        assert_eq!(report.kind, GatewayErrorKind::Auth);
        assert_eq!(report.message, "bad key");
    }

    #[tokio::test]
    async fn test_second_submission_while_pending_ignored() {
        let gateway = Arc::new(MockGateway::held());
        gateway.queue_text(Some("first reply"));
        let store = store_with(&gateway);

        assert!(store.submit_user_message("first"));
        assert!(store.snapshot().is_typing);
        assert!(!store.submit_user_message("second"));
        assert_eq!(store.snapshot().messages.len(), 1);

        gateway.release(1);
        let snapshot = wait_settled(&store, WAIT).await;
        assert_eq!(
            contents(&snapshot),
            vec![
                (MessageRole::User, "first".to_string()),
                (MessageRole::Assistant, "first reply".to_string())
            ]
        );
        assert_eq!(gateway.recorded_text_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_forced_language_is_one_shot() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text_error(GatewayError::server_error("overloaded"));
        gateway.queue_text(Some("hello"));
        let store = store_with(&gateway);

        assert!(store.toggle_forced_language());
        store.submit_user_message("مرحبا");
        let snapshot = wait_settled(&store, WAIT).await;
        assert!(!snapshot.force_arabic, "flag is consumed even when the call fails");

        store.submit_user_message("again");
        wait_settled(&store, WAIT).await;

        let requests = gateway.recorded_text_requests();
        assert!(requests[0].force_language);
        assert!(!requests[1].force_language);
        assert_eq!(requests[1].history.len(), 1);
    }

    #[test]
    fn test_concurrent_toggles_report_their_own_value() {
        let store = store_with(&Arc::new(MockGateway::new()));

        let results: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    scope.spawn(move || {
                        (0..50)
                            .map(|_| store.toggle_forced_language())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        // Each toggle produces a distinct state, so the values alternate globally
        let on = results.iter().filter(|v| **v).count();
        assert_eq!(on, results.len() / 2);
        assert!(!store.snapshot().force_arabic);
    }

    #[tokio::test]
    async fn test_toggle_notifies_language() {
        let store = store_with(&Arc::new(MockGateway::new()));
        let mut events = store.events();

        store.toggle_forced_language();

        let mut notified = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SseEvent::Notify { event_type, data } = event {
                notified.push((event_type, data["force_arabic"].as_bool()));
            }
        }
        assert_eq!(notified, vec![("language".to_string(), Some(true))]);
    }

    #[tokio::test]
    async fn test_timeout_failure_releases_latch() {
        let gateway = Arc::new(MockGateway::held());
        gateway.queue_text_error(GatewayError::network("Request timeout: deadline elapsed"));
        gateway.queue_text(Some("back again"));
        let store = store_with(&gateway);

        assert!(store.submit_user_message("are you there"));
        assert!(!store.submit_user_message("hello?"));

        gateway.release(1);
        let snapshot = wait_settled(&store, WAIT).await;
        assert!(!snapshot.is_typing);
        assert_eq!(snapshot.last_error.as_ref().map(|r| r.kind), Some(GatewayErrorKind::Network));

        assert!(store.submit_user_message("hello?"));
        gateway.release(1);
        let snapshot = wait_settled(&store, WAIT).await;
        assert_eq!(snapshot.messages.len(), 3);
        assert_eq!(snapshot.messages[2].content, "back again");
    }

    #[tokio::test]
    async fn test_image_requires_messages() {
        let gateway = Arc::new(MockGateway::new());
        let store = store_with(&gateway);

        assert!(!store.trigger_image_generation());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.chaos.level, 0);
        assert!(snapshot.image.is_none());
        assert!(gateway.recorded_image_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_image_generation() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text(Some("hello"));
        gateway.queue_image(Some("data:image/png;base64,Zm9v"));
        let store = store_with(&gateway);

        store.submit_user_message("hi");
        wait_settled(&store, WAIT).await;
        assert!(store.trigger_image_generation());
        let snapshot = wait_settled(&store, WAIT).await;

        assert_eq!(snapshot.chaos.level, 25);
        let image = snapshot.image.unwrap();
        assert_eq!(image.prompt, "hello");
        assert_eq!(image.url, "data:image/png;base64,Zm9v");
        assert_eq!(gateway.recorded_image_prompts(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_image_without_payload_keeps_previous() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text(Some("hello"));
        gateway.queue_image(Some("data:image/png;base64,T0xE"));
        gateway.queue_image(None);
        gateway.queue_image_error(GatewayError::rate_limit("quota"));
        let store = store_with(&gateway);

        store.submit_user_message("hi");
        wait_settled(&store, WAIT).await;
        store.trigger_image_generation();
        let first = wait_settled(&store, WAIT).await.image;

        store.trigger_image_generation();
        let snapshot = wait_settled(&store, WAIT).await;
        assert_eq!(snapshot.image, first);
        assert!(snapshot.last_error.is_none());

        store.trigger_image_generation();
        let snapshot = wait_settled(&store, WAIT).await;
        assert_eq!(snapshot.image, first);
        assert_eq!(snapshot.last_error.unwrap().operation, Operation::Image);
        assert_eq!(snapshot.chaos.level, 65);
    }

    #[tokio::test]
    async fn test_text_and_image_run_together() {
        let gateway = Arc::new(MockGateway::held());
        gateway.queue_text(Some("reply"));
        gateway.queue_image(Some("data:image/png;base64,QQ=="));
        let store = store_with(&gateway);

        assert!(store.submit_user_message("hi"));
        assert!(store.trigger_image_generation());
        let snapshot = store.snapshot();
        assert!(snapshot.is_typing);
        assert!(snapshot.is_generating_image);
        assert!(!store.trigger_image_generation());

        gateway.release(2);
        let snapshot = wait_settled(&store, WAIT).await;
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.image.unwrap().prompt, "hi");
    }

    #[tokio::test]
    async fn test_reset_discards_late_reply() {
        let gateway = Arc::new(MockGateway::held());
        gateway.queue_text(Some("from the past"));
        let store = store_with(&gateway);

        store.submit_user_message("hi");
        store.reset();
        let snapshot = store.snapshot();
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.chaos.level, 0);
        assert!(snapshot.is_typing, "the call is still outstanding");

        gateway.release(1);
        let snapshot = wait_settled(&store, WAIT).await;
        assert!(snapshot.messages.is_empty());
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text(Some("hello"));
        gateway.queue_image(Some("data:image/png;base64,QQ=="));
        let store = store_with(&gateway);

        store.submit_user_message("hi");
        wait_settled(&store, WAIT).await;
        store.trigger_image_generation();
        wait_settled(&store, WAIT).await;
        store.toggle_forced_language();

        store.reset();
        let snapshot = store.snapshot();
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.chaos.level, 0);
        assert!(!snapshot.chaos.is_glitching);
        assert!(snapshot.image.is_none());
        assert!(!snapshot.force_arabic);
    }

    #[tokio::test]
    async fn test_notifications_broadcast() {
        let gateway = Arc::new(MockGateway::new());
        gateway.queue_text(Some("hello"));
        let store = store_with(&gateway);
        let mut events = store.events();

        store.submit_user_message("hi");
        wait_settled(&store, WAIT).await;

        let mut notified = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SseEvent::Notify { event_type, data } = event {
                notified.push((event_type, data["content"].as_str().map(str::to_string)));
            }
        }
        assert_eq!(
            notified,
            vec![
                ("message".to_string(), Some("hi".to_string())),
                ("message".to_string(), Some("hello".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_logging_gateway_is_transparent() {
        let mock = Arc::new(MockGateway::new());
        mock.queue_text(Some("logged"));
        let store = ConversationStore::new(Arc::new(LoggingGateway::new(mock.clone())));

        store.submit_user_message("hi");
        let snapshot = wait_settled(&store, WAIT).await;
        assert_eq!(snapshot.messages[1].content, "logged");
        assert_eq!(mock.recorded_text_requests().len(), 1);
    }
}
