use std::sync::Arc;

use aboraya_engine::{
    BoxFuture, ModelService, ReplyEvent, ReplyStreamHandle, ServiceError, ServiceResult,
    ServiceWorker, make_reply_stream,
};
use futures::StreamExt;
use rig::completion::{CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use rig::streaming::StreamedAssistantContent;
use tokio::sync::{Mutex, mpsc};

use super::settings::GeminiSettings;

type GeminiStreamingResponse = rig::streaming::StreamingCompletionResponse<
    <gemini::completion::CompletionModel as CompletionModel>::StreamingResponse,
>;

/// One committed conversation turn, kept decoupled from rig's message types.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Turn {
    User(String),
    Model(String),
}

impl Turn {
    fn to_rig_message(&self) -> RigMessage {
        match self {
            Self::User(content) => RigMessage::user(content.clone()),
            Self::Model(content) => RigMessage::assistant(content.clone()),
        }
    }
}

/// Gemini-backed model service.
///
/// The Gemini REST API is stateless, so conversation context is the turn
/// history this service holds and resends with every request. A turn pair is
/// committed only after its reply streamed to completion; failed replies
/// never pollute context.
pub struct GeminiService {
    settings: GeminiSettings,
    history: Arc<Mutex<Vec<Turn>>>,
}

impl GeminiService {
    pub fn new(settings: GeminiSettings) -> ServiceResult<Self> {
        if !settings.is_configured() {
            return Err(ServiceError::NotConfigured {
                details: "missing Gemini API key (set GEMINI_API_KEY or the settings file)"
                    .to_string(),
            });
        }

        Ok(Self {
            settings,
            history: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn build_client(settings: &GeminiSettings) -> ServiceResult<gemini::Client> {
        gemini::Client::builder()
            .api_key(settings.api_key.trim())
            .build()
            .map_err(|source| ServiceError::StreamOpen {
                stage: "build-client",
                details: source.to_string(),
            })
    }

    async fn open_stream(
        settings: &GeminiSettings,
        history: &[Turn],
        user_text: &str,
    ) -> ServiceResult<GeminiStreamingResponse> {
        let client = Self::build_client(settings)?;
        let model = client.completion_model(settings.model.as_str());

        let prior = history.iter().map(Turn::to_rig_message).collect::<Vec<_>>();
        let mut builder = model
            .completion_request(RigMessage::user(user_text.to_string()))
            .messages(prior);

        if let Some(instruction) = &settings.system_instruction
            && !instruction.trim().is_empty()
        {
            builder = builder.preamble(instruction.clone());
        }

        builder
            .stream()
            .await
            .map_err(|source| ServiceError::StreamOpen {
                stage: "open-stream",
                details: source.to_string(),
            })
    }

    /// Extracts reply text from one stream item.
    ///
    /// Reasoning and tool-call fragments are not reply text and are skipped.
    fn map_delta<R>(item: StreamedAssistantContent<R>) -> Option<String>
    where
        R: Clone + Unpin,
    {
        match item {
            StreamedAssistantContent::Text(text) => Some(text.text),
            StreamedAssistantContent::Reasoning(_)
            | StreamedAssistantContent::ReasoningDelta { .. }
            | StreamedAssistantContent::ToolCall { .. }
            | StreamedAssistantContent::ToolCallDelta { .. }
            | StreamedAssistantContent::Final(_) => None,
        }
    }

    async fn run_stream_worker(
        settings: GeminiSettings,
        history: Arc<Mutex<Vec<Turn>>>,
        user_text: String,
        event_tx: mpsc::UnboundedSender<ReplyEvent>,
    ) {
        let prior = history.lock().await.clone();
        let mut stream = match Self::open_stream(&settings, &prior, &user_text).await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::error!(model = %settings.model, %error, "failed to open Gemini stream");
                let _ = event_tx.send(ReplyEvent::Failed(error.to_string()));
                return;
            }
        };

        let mut reply = String::new();
        loop {
            match stream.next().await {
                Some(Ok(item)) => {
                    if let Some(delta) = Self::map_delta(item) {
                        reply.push_str(&delta);
                        if event_tx.send(ReplyEvent::Chunk(delta)).is_err() {
                            // Consumer went away; nothing to commit.
                            return;
                        }
                    }
                }
                Some(Err(source)) => {
                    tracing::warn!(error = %source, "Gemini stream emitted an error chunk");
                    let _ = event_tx.send(ReplyEvent::Failed(source.to_string()));
                    return;
                }
                None => break,
            }
        }

        {
            let mut turns = history.lock().await;
            turns.push(Turn::User(user_text));
            turns.push(Turn::Model(reply));
        }
        let _ = event_tx.send(ReplyEvent::Done);
    }
}

impl ModelService for GeminiService {
    fn stream_reply(&self, user_text: &str) -> ServiceResult<ReplyStreamHandle> {
        let (event_tx, stream) = make_reply_stream();
        let worker: ServiceWorker = Box::pin(Self::run_stream_worker(
            self.settings.clone(),
            Arc::clone(&self.history),
            user_text.to_string(),
            event_tx,
        ));

        Ok(ReplyStreamHandle { stream, worker })
    }

    fn reset_context<'a>(&'a self) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move {
            let mut turns = self.history.lock().await;
            let dropped_turns = turns.len();
            turns.clear();
            tracing::debug!(dropped_turns, "discarded Gemini conversation context");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_an_api_key() {
        let rejected = GeminiService::new(GeminiSettings::default());
        assert!(matches!(rejected, Err(ServiceError::NotConfigured { .. })));

        let settings = GeminiSettings {
            api_key: "k-123".to_string(),
            ..GeminiSettings::default()
        };
        assert!(GeminiService::new(settings).is_ok());
    }

    #[tokio::test]
    async fn reset_context_discards_held_turns() {
        let settings = GeminiSettings {
            api_key: "k-123".to_string(),
            ..GeminiSettings::default()
        };
        let service = GeminiService::new(settings).unwrap();

        {
            let mut turns = service.history.lock().await;
            turns.push(Turn::User("hello".to_string()));
            turns.push(Turn::Model("hi".to_string()));
        }

        service.reset_context().await.unwrap();

        assert!(service.history.lock().await.is_empty());
    }
}
