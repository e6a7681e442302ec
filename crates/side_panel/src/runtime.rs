use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use chat_service::{
    CancelSignal, ChatService, CompletionRequest, Credential, CredentialStore, ModelDescriptor,
    ServiceError,
};
use tracing::{debug, info};

use crate::events::{PanelAction, PanelEvent};
use crate::session::{ChatSession, RequestId, SessionHost};

/// Receives every outbound event, on the host thread.
pub type EventSink = Box<dyn FnMut(PanelEvent)>;

/// Called from a worker thread when outcomes are waiting for
/// [`PanelRuntime::flush_pending`].
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

pub const ERROR_REQUEST_IN_FLIGHT: &str = "request already in flight";

#[derive(Debug)]
struct CompletionOutcome {
    request_id: RequestId,
    result: Result<String, ServiceError>,
}

struct PendingOutcomes {
    queue: Mutex<VecDeque<CompletionOutcome>>,
    wake: WakeCallback,
}

impl PendingOutcomes {
    fn push(&self, outcome: CompletionOutcome) {
        let should_wake = {
            let mut queue = lock_unpoisoned(&self.queue);
            let should_wake = queue.is_empty();
            queue.push_back(outcome);
            should_wake
        };

        if should_wake {
            (self.wake)();
        }
    }

    fn pop(&self) -> Option<CompletionOutcome> {
        lock_unpoisoned(&self.queue).pop_front()
    }

    fn clear(&self) {
        lock_unpoisoned(&self.queue).clear();
    }
}

struct ActiveRequest {
    request_id: RequestId,
    cancel: CancelSignal,
    join_handle: Option<JoinHandle<()>>,
}

impl ActiveRequest {
    fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// Host side of the session: remote calls, worker bookkeeping and the event sink.
struct RuntimeHost {
    service: Arc<dyn ChatService>,
    pending: Arc<PendingOutcomes>,
    active: Option<ActiveRequest>,
    next_request_id: RequestId,
    sink: EventSink,
}

impl RuntimeHost {
    fn spawn_worker(
        &self,
        request_id: RequestId,
        credential: Credential,
        request: CompletionRequest,
        cancel: CancelSignal,
    ) -> Result<JoinHandle<()>, String> {
        let service = Arc::clone(&self.service);
        let pending = Arc::clone(&self.pending);

        thread::Builder::new()
            .name(format!("sidechat-request-{request_id}"))
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    service.complete(&credential, &request, cancel)
                }))
                .unwrap_or_else(|_| {
                    Err(ServiceError::Transient("chat service panicked".to_string()))
                });

                pending.push(CompletionOutcome { request_id, result });
            })
            .map_err(|error| format!("failed to spawn request worker: {error}"))
    }

    fn release_active(&mut self, request_id: RequestId) {
        let matches = self.active.as_ref().map(|active| active.request_id) == Some(request_id);
        if !matches {
            return;
        }

        let Some(mut completed) = self.active.take() else {
            return;
        };

        if let Some(join_handle) = completed.join_handle.take() {
            if join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    /// Signals the worker but keeps it registered, so no second worker
    /// starts until its outcome has been flushed.
    fn cancel_active(&mut self) {
        if let Some(active) = self.active.as_ref() {
            debug!(request_id = active.request_id, "cancelling active request");
            active.cancel();
        }
    }

    fn detach_active(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(request_id = active.request_id, "detaching active request");
            active.cancel();
        }
    }
}

impl SessionHost for RuntimeHost {
    fn list_models(
        &mut self,
        credential: &Credential,
    ) -> Result<Vec<ModelDescriptor>, ServiceError> {
        self.service.list_models(credential)
    }

    fn start_completion(
        &mut self,
        credential: Credential,
        request: CompletionRequest,
    ) -> Result<RequestId, String> {
        if self.active.is_some() {
            return Err(ERROR_REQUEST_IN_FLIGHT.to_string());
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let join_handle = self.spawn_worker(request_id, credential, request, Arc::clone(&cancel))?;

        self.active = Some(ActiveRequest {
            request_id,
            cancel,
            join_handle: Some(join_handle),
        });
        Ok(request_id)
    }

    fn abandon_completion(&mut self, request_id: RequestId) {
        let matches = self.active.as_ref().map(|active| active.request_id) == Some(request_id);
        if matches {
            self.cancel_active();
        }
    }

    fn emit(&mut self, event: PanelEvent) {
        (self.sink)(event);
    }
}

/// Owns one panel's session and runs its completions off the host thread.
///
/// Workers only ever push outcomes onto a queue and call the wake callback;
/// the session is mutated exclusively by [`PanelRuntime::handle`] and
/// [`PanelRuntime::flush_pending`], both called from the host thread.
pub struct PanelRuntime {
    session: ChatSession,
    store: Arc<dyn CredentialStore>,
    host: RuntimeHost,
    disposed: bool,
}

impl PanelRuntime {
    pub fn new(
        service: Arc<dyn ChatService>,
        store: Arc<dyn CredentialStore>,
        sink: EventSink,
        wake: WakeCallback,
    ) -> Self {
        debug!(service = service.service_id(), "panel runtime created");
        Self {
            session: ChatSession::new(),
            store,
            host: RuntimeHost {
                service,
                pending: Arc::new(PendingOutcomes {
                    queue: Mutex::new(VecDeque::new()),
                    wake,
                }),
                active: None,
                next_request_id: 1,
                sink,
            },
            disposed: false,
        }
    }

    #[must_use]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// True while a worker is running or its outcome is still queued.
    #[must_use]
    pub fn has_active_request(&self) -> bool {
        self.host.active.is_some()
    }

    pub fn handle(&mut self, action: PanelAction) {
        if self.disposed {
            debug!("ignoring action after dispose");
            return;
        }

        match action {
            PanelAction::Show => {
                self.session
                    .initialize_from_store(self.store.as_ref(), &mut self.host);
            }
            PanelAction::SetCredential { secret } => {
                self.session
                    .set_credential(&secret, self.store.as_ref(), &mut self.host);
            }
            PanelAction::Submit {
                text,
                model,
                context,
            } => {
                self.session.submit(&text, &model, &context, &mut self.host);
            }
            PanelAction::ClearHistory => self.session.clear_history(&mut self.host),
            PanelAction::Dispose => self.dispose(),
        }
    }

    /// Applies queued completion outcomes to the session.
    ///
    /// Returns the number of outcomes drained, including stale ones.
    pub fn flush_pending(&mut self) -> usize {
        if self.disposed {
            self.host.pending.clear();
            return 0;
        }

        let mut drained = 0usize;
        while let Some(CompletionOutcome { request_id, result }) = self.host.pending.pop() {
            self.host.release_active(request_id);
            match result {
                Ok(content) => {
                    self.session
                        .on_completion_succeeded(request_id, content, &mut self.host);
                }
                Err(error) => {
                    self.session
                        .on_completion_failed(request_id, &error, &mut self.host);
                }
            }
            drained += 1;
        }

        drained
    }

    fn dispose(&mut self) {
        info!("panel disposed");
        self.disposed = true;
        self.host.detach_active();
        self.host.pending.clear();
        self.session = ChatSession::new();
    }
}

impl Drop for PanelRuntime {
    fn drop(&mut self) {
        if self.host.active.is_some() {
            debug!("panel runtime dropped with a request in flight");
            self.host.detach_active();
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
