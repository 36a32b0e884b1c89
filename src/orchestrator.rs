//! Turns one user turn into a finished answer.
//!
//! [`ChatOrchestrator::ask`] appends the turn to history, streams an answer for
//! the most recent message and stores the answer back into history. When the
//! backend reports that the conversation no longer fits the model's input
//! budget, history is shrunk and the same turn is sent again until the answer
//! succeeds or shrinking stops making progress.

use chat_stream::{is_cancelled, CancellationSignal, ChatStream, EventQueue};
use tracing::{debug, info};

use crate::answer::{ChatChunk, ChatRequest};
use crate::error::{is_token_limit_exceeded, ChatError};
use crate::history::{HistoryStore, Message};
use crate::sink::RenderSink;

/// Placeholder conversation id used until the server assigns one.
pub const TEMPORARY_CONVERSATION_ID: &str = "temporary-chat";

/// Decides whether an error means the request exceeded the token budget.
pub type TokenLimitPredicate = Box<dyn Fn(&ChatError) -> bool + Send + Sync>;

/// Per-call switches for [`ChatOrchestrator::ask`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AskOptions {
    /// Forget prior history before this turn.
    pub oneshot: bool,
    /// Fail on token-limit errors instead of shrinking history and retrying.
    pub disable_auto_shrink: bool,
}

enum Step {
    Retry,
    Fail(ChatError),
    Succeed(String),
}

pub struct ChatOrchestrator<C, H, S> {
    client: C,
    history: H,
    sink: S,
    conversation_id: String,
    adopted: bool,
    is_token_limit: TokenLimitPredicate,
}

impl<C, H, S> ChatOrchestrator<C, H, S>
where
    C: ChatStream<ChatRequest, ChatChunk>,
    H: HistoryStore,
    S: RenderSink,
{
    pub fn new(client: C, history: H, sink: S) -> Self {
        Self {
            client,
            history,
            sink,
            conversation_id: TEMPORARY_CONVERSATION_ID.to_owned(),
            adopted: false,
            is_token_limit: Box::new(is_token_limit_exceeded),
        }
    }

    /// Replaces the default `context_length_exceeded` detection.
    pub fn with_token_limit_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ChatError) -> bool + Send + Sync + 'static,
    {
        self.is_token_limit = Box::new(predicate);
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn is_temporary(&self) -> bool {
        self.conversation_id.starts_with(TEMPORARY_CONVERSATION_ID)
    }

    /// Starts over with a placeholder id; the next server-issued id is adopted.
    pub fn new_conversation(&mut self) {
        self.conversation_id = TEMPORARY_CONVERSATION_ID.to_owned();
        self.adopted = false;
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Streams an answer for `text` (or for the pending history if `text` is
    /// empty). Returns an empty answer when there is nothing to ask or the
    /// call was cancelled.
    pub async fn ask(
        &mut self,
        cancel: &CancellationSignal,
        text: &str,
        options: &AskOptions,
    ) -> Result<String, ChatError> {
        if options.oneshot {
            self.history.clear();
        }
        if !text.is_empty() {
            self.history.append(Message::user(text));
        }
        if self.history.all().is_empty() {
            return Ok(String::new());
        }

        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            match self.attempt(cancel, options, attempt).await {
                Step::Retry => continue,
                Step::Fail(error) => return Err(error),
                Step::Succeed(answer) => return Ok(answer),
            }
        }
    }

    async fn attempt(
        &mut self,
        cancel: &CancellationSignal,
        options: &AskOptions,
        attempt: u32,
    ) -> Step {
        let request = self.build_request();
        debug!(
            attempt,
            conversation_id = %request.conversation_id,
            history = self.history.all().len(),
            "asking"
        );

        let mut queue = match self.client.stream(&request, cancel).await {
            Ok(queue) => queue,
            Err(error) if error.is_cancelled() => return Step::Succeed(String::new()),
            Err(error) => return Step::Fail(error.into()),
        };

        let consumed = self.consume(&mut queue).await;
        if is_cancelled(cancel) {
            debug!(attempt, "ask cancelled");
            return Step::Succeed(String::new());
        }

        match consumed {
            Ok(answer) => self.complete(answer),
            Err(error) if (self.is_token_limit)(&error) => self.shrink_for_retry(error, options),
            Err(error) => Step::Fail(error),
        }
    }

    fn build_request(&self) -> ChatRequest {
        let prompt = self
            .history
            .all()
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        ChatRequest::new(self.conversation_id.clone(), prompt)
    }

    async fn consume(&mut self, queue: &mut EventQueue<ChatChunk>) -> Result<String, ChatError> {
        let mut answer = String::new();
        while let Some(chunk) = queue.recv().await {
            self.adopt_conversation(&chunk.conversation_id);
            if let Some(error) = chunk.error() {
                return Err(ChatError::backend(
                    error.kind.clone(),
                    error.code.clone(),
                    error.message.clone(),
                ));
            }
            self.sink.fragment(&chunk.content)?;
            answer.push_str(&chunk.content);
        }
        Ok(answer)
    }

    fn adopt_conversation(&mut self, conversation_id: &str) {
        if self.adopted || conversation_id.is_empty() || !self.is_temporary() {
            return;
        }
        debug!(conversation_id, "conversation id assigned");
        self.conversation_id = conversation_id.to_owned();
        self.adopted = true;
    }

    fn complete(&mut self, answer: String) -> Step {
        if let Err(error) = self.sink.finish(&answer) {
            return Step::Fail(error.into());
        }
        self.history.append(Message::assistant(answer.clone()));
        Step::Succeed(answer)
    }

    fn shrink_for_retry(&mut self, error: ChatError, options: &AskOptions) -> Step {
        if options.disable_auto_shrink {
            return Step::Fail(ChatError::TokenLimitManual {
                source: Box::new(error),
            });
        }

        let removed = self.history.auto_shrink();
        // The latest message alone exceeds the limit.
        if removed == 0 {
            return Step::Fail(error);
        }

        let word = if removed > 1 { "messages" } else { "message" };
        if let Err(error) = self
            .sink
            .status(&format!("{removed} {word} shrinked because of tokens limitation"))
        {
            return Step::Fail(error.into());
        }
        info!(removed, "token limit exceeded; retrying with shrunk history");
        Step::Retry
    }
}
