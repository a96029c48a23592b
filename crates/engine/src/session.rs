use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use super::error::LogResult;
use super::ids::MessageId;
use super::log::MessageLog;
use super::message::Message;
use super::service::{ModelService, ReplyEvent};

/// Fixed localized text shown in place of a reply that failed to stream.
pub const REPLY_ERROR_TEXT: &str = "عذراً يا صاحبي، حصلت مشكلة صغيرة. جرب تاني بعد شوية.";

/// Terminal outcome of one send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    Completed,
    Failed,
}

#[derive(Default)]
struct SessionState {
    log: MessageLog,
    loading: bool,
}

struct SessionShared {
    state: Mutex<SessionState>,
    revision: watch::Sender<u64>,
}

impl SessionShared {
    fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(SessionState::default()),
            revision,
        }
    }

    // State is only ever locked for short synchronous sections, never across
    // an await point.
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision
            .send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

/// Read-only view of a session for the presentation layer.
///
/// Pull-based: wait on [`SessionViewer::subscribe`] for a revision change,
/// then re-read [`SessionViewer::snapshot`] and [`SessionViewer::loading`].
#[derive(Clone)]
pub struct SessionViewer {
    shared: Arc<SessionShared>,
}

impl SessionViewer {
    /// Full ordered transcript, reflecting all prior mutations.
    pub fn snapshot(&self) -> Vec<Message> {
        self.shared.lock_state().log.snapshot()
    }

    /// True exactly while a send cycle is consuming its stream.
    pub fn loading(&self) -> bool {
        self.shared.lock_state().loading
    }

    /// Revision counter bumped after every state mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

/// Session controller: sole writer of the message log and owner of the
/// single-flight `loading` flag.
///
/// One instance per conversation, explicitly constructed; there is no
/// ambient global session.
pub struct ChatSession {
    service: Arc<dyn ModelService>,
    shared: Arc<SessionShared>,
}

impl ChatSession {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self {
            service,
            shared: Arc::new(SessionShared::new()),
        }
    }

    /// Returns a cloneable read-only view for rendering.
    pub fn viewer(&self) -> SessionViewer {
        SessionViewer {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.shared.lock_state().log.snapshot()
    }

    pub fn loading(&self) -> bool {
        self.shared.lock_state().loading
    }

    /// Runs one full send cycle for `text`.
    ///
    /// Blank-after-trim input is a silent no-op. Otherwise the user message
    /// and an empty model placeholder are appended, `loading` flips true,
    /// and the service's chunk stream is consumed to its terminal outcome:
    /// every chunk patches the placeholder with the accumulated text in
    /// delivery order, a stream failure replaces it with
    /// [`REPLY_ERROR_TEXT`], and both paths restore `loading = false`.
    ///
    /// The cycle never propagates an error to the caller. There is no
    /// internal re-entry guard: callers must not invoke `send` while
    /// [`ChatSession::loading`] is true, by disabling the input affordance.
    pub async fn send(&self, text: &str) {
        // Trimming gates emptiness only; the stored content stays verbatim.
        if text.trim().is_empty() {
            return;
        }

        let user_id = MessageId::new_v7();
        let reply_id = MessageId::new_v7();

        {
            let mut state = self.shared.lock_state();
            Self::apply_log_op("append-user", state.log.append(Message::user(user_id, text)));
        }
        self.shared.notify();

        {
            let mut state = self.shared.lock_state();
            Self::apply_log_op(
                "append-placeholder",
                state.log.append(Message::model_placeholder(reply_id)),
            );
            state.loading = true;
        }
        self.shared.notify();

        tracing::debug!(%user_id, %reply_id, "send cycle started");
        let outcome = self.consume_reply_stream(text, reply_id).await;

        {
            let mut state = self.shared.lock_state();
            if outcome == CycleOutcome::Failed {
                Self::apply_log_op("mark-error", state.log.mark_error(reply_id, REPLY_ERROR_TEXT));
            }
            state.loading = false;
        }
        self.shared.notify();
        tracing::debug!(%reply_id, ?outcome, "send cycle finished");
    }

    /// Instructs the service to drop its context, then clears the local log.
    ///
    /// Best-effort: a `reset_context` failure is logged and the local log is
    /// cleared anyway, accepting stale remote context as residual risk.
    /// Non-empty-log and user-confirmation preconditions belong to the
    /// caller, as does not resetting while `loading` is true.
    pub async fn reset(&self) {
        if let Err(error) = self.service.reset_context().await {
            tracing::warn!(%error, "failed to discard remote conversation context");
        }

        self.shared.lock_state().log.clear();
        self.shared.notify();
    }

    async fn consume_reply_stream(&self, user_text: &str, reply_id: MessageId) -> CycleOutcome {
        let handle = match self.service.stream_reply(user_text) {
            Ok(handle) => handle,
            Err(error) => {
                tracing::warn!(%reply_id, %error, "failed to open reply stream");
                return CycleOutcome::Failed;
            }
        };

        tokio::spawn(handle.worker);
        let mut stream = handle.stream;
        let mut accumulated = String::new();

        loop {
            match stream.next_event().await {
                Some(ReplyEvent::Chunk(chunk)) => {
                    // One patch per chunk, in delivery order; no coalescing.
                    accumulated.push_str(&chunk);
                    {
                        let mut state = self.shared.lock_state();
                        Self::apply_log_op(
                            "patch-chunk",
                            state.log.patch_content(reply_id, accumulated.clone()),
                        );
                    }
                    self.shared.notify();
                }
                Some(ReplyEvent::Done) => break CycleOutcome::Completed,
                Some(ReplyEvent::Failed(message)) => {
                    tracing::warn!(%reply_id, error = %message, "reply stream failed");
                    break CycleOutcome::Failed;
                }
                None => {
                    tracing::warn!(%reply_id, "reply stream ended without a terminal event");
                    break CycleOutcome::Failed;
                }
            }
        }
    }

    // Log contract violations are controller bugs, never user-facing: log
    // them loudly and trip debug builds.
    fn apply_log_op(stage: &'static str, result: LogResult<()>) {
        if let Err(error) = result {
            tracing::error!(stage, %error, "message log rejected a controller operation");
            debug_assert!(false, "message log contract violated at `{stage}`: {error}");
        }
    }
}
