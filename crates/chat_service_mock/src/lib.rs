//! Deterministic mock implementations of the shared `chat_service` contracts.
//!
//! This crate contains no transport logic and is intended for local
//! development and contract-level integration testing.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chat_service::{
    CancelSignal, ChatService, CompletionRequest, Credential, CredentialStore, ModelDescriptor,
    ServiceError, StoreError,
};

/// Stable service identifier used for explicit startup selection.
pub const MOCK_SERVICE_ID: &str = "mock";

const HOLD_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Scripted chat service used by controller tests and offline runs.
///
/// Scripted outcomes are consumed in FIFO order; once a queue is empty the
/// service falls back to its default catalog or a canned markdown reply.
#[derive(Debug)]
pub struct MockChatService {
    default_models: Vec<ModelDescriptor>,
    scripted_models: Mutex<VecDeque<Result<Vec<ModelDescriptor>, ServiceError>>>,
    scripted_replies: Mutex<VecDeque<Result<String, ServiceError>>>,
    hold_replies: AtomicBool,
    list_models_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    observed_requests: Mutex<Vec<CompletionRequest>>,
}

impl MockChatService {
    /// Creates a mock with the default two-model catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_models(vec![
            ModelDescriptor::new("mock-small", 0.15, 0.6, "USD per 1M tokens"),
            ModelDescriptor::new("mock-large", 2.5, 10.0, "USD per 1M tokens"),
        ])
    }

    /// Creates a mock whose catalog call returns `models` unless scripted otherwise.
    #[must_use]
    pub fn with_models(models: Vec<ModelDescriptor>) -> Self {
        Self {
            default_models: models,
            scripted_models: Mutex::new(VecDeque::new()),
            scripted_replies: Mutex::new(VecDeque::new()),
            hold_replies: AtomicBool::new(false),
            list_models_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            observed_requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues the outcome of the next unscripted catalog call.
    pub fn push_models_result(&self, result: Result<Vec<ModelDescriptor>, ServiceError>) {
        lock_unpoisoned(&self.scripted_models).push_back(result);
    }

    /// Queues the outcome of the next unscripted completion.
    pub fn push_reply(&self, result: Result<String, ServiceError>) {
        lock_unpoisoned(&self.scripted_replies).push_back(result);
    }

    /// Makes completions block until [`MockChatService::release_replies`] or cancellation.
    pub fn hold_replies(&self) {
        self.hold_replies.store(true, Ordering::SeqCst);
    }

    pub fn release_replies(&self) {
        self.hold_replies.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn list_models_calls(&self) -> usize {
        self.list_models_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    /// Returns completion requests in the order they were received.
    #[must_use]
    pub fn observed_requests(&self) -> Vec<CompletionRequest> {
        lock_unpoisoned(&self.observed_requests).clone()
    }

    fn canned_reply(request: &CompletionRequest) -> String {
        let preview = request
            .prompt
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default();

        format!(
            "## Mocked reply from `{}`\n\nYou asked:\n\n> {}\n\n```text\nno remote service was contacted\n```\n",
            request.model,
            preview.trim()
        )
    }
}

impl Default for MockChatService {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatService for MockChatService {
    fn service_id(&self) -> &str {
        MOCK_SERVICE_ID
    }

    fn list_models(&self, _credential: &Credential) -> Result<Vec<ModelDescriptor>, ServiceError> {
        self.list_models_calls.fetch_add(1, Ordering::SeqCst);

        match lock_unpoisoned(&self.scripted_models).pop_front() {
            Some(result) => result,
            None => Ok(self.default_models.clone()),
        }
    }

    fn complete(
        &self,
        _credential: &Credential,
        request: &CompletionRequest,
        cancel: CancelSignal,
    ) -> Result<String, ServiceError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        lock_unpoisoned(&self.observed_requests).push(request.clone());

        while self.hold_replies.load(Ordering::SeqCst) {
            if cancel.load(Ordering::SeqCst) {
                return Err(ServiceError::Cancelled);
            }
            thread::sleep(HOLD_POLL_INTERVAL);
        }

        if cancel.load(Ordering::SeqCst) {
            return Err(ServiceError::Cancelled);
        }

        match lock_unpoisoned(&self.scripted_replies).pop_front() {
            Some(result) => result,
            None => Ok(Self::canned_reply(request)),
        }
    }
}

/// Volatile key/value store standing in for host-provided settings.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    values: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        lock_unpoisoned(&store.values).insert(key.into(), value.into());
        store
    }

    /// Makes subsequent `set` calls fail without touching stored values.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(lock_unpoisoned(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new(format!("write of '{key}' rejected")));
        }

        let mut values = lock_unpoisoned(&self.values);
        if value.is_empty() {
            values.remove(key);
        } else {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
