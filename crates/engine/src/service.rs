use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;
use tokio::sync::mpsc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type ServiceWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures surfaced by a model service implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ServiceError {
    #[snafu(display("model service is not configured: {details}"))]
    NotConfigured { details: String },
    #[snafu(display("failed to open reply stream on `{stage}`: {details}"))]
    StreamOpen {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("failed to discard model context on `{stage}`: {details}"))]
    ResetContext {
        stage: &'static str,
        details: String,
    },
}

/// One event of a reply stream.
///
/// A stream yields zero or more `Chunk`s followed by at most one terminal
/// event. Chunks concatenate into the full reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    Chunk(String),
    Done,
    Failed(String),
}

/// Consumer end of one reply stream.
///
/// Finite and non-restartable; each `next_event` call suspends until the
/// service produces the next event. A `None` return means the producer went
/// away without a terminal event, which consumers treat as a failure.
pub struct ReplyStream {
    events: mpsc::UnboundedReceiver<ReplyEvent>,
}

impl ReplyStream {
    pub async fn next_event(&mut self) -> Option<ReplyEvent> {
        self.events.recv().await
    }
}

/// A reply stream paired with the worker future that feeds it.
///
/// The consumer spawns `worker` and reads `stream`; keeping the two split
/// lets callers pick the runtime the worker runs on.
pub struct ReplyStreamHandle {
    pub stream: ReplyStream,
    pub worker: ServiceWorker,
}

/// Model service consumed by the session controller.
///
/// The service owns conversation context continuity across calls: the engine
/// passes only the new user text per request, and `reset_context` starts the
/// next reply from a fresh context.
pub trait ModelService: Send + Sync {
    /// Opens the chunk stream for one logical reply to `user_text`.
    fn stream_reply(&self, user_text: &str) -> ServiceResult<ReplyStreamHandle>;

    /// Discards any service-held conversation history.
    fn reset_context<'a>(&'a self) -> BoxFuture<'a, ServiceResult<()>>;
}

/// Builds the sender/stream pair a service implementation feeds events into.
pub fn make_reply_stream() -> (mpsc::UnboundedSender<ReplyEvent>, ReplyStream) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (event_tx, ReplyStream { events: event_rx })
}
