use std::future::Future;
use std::marker::PhantomData;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, Url};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::codec::{AnswerChunk, Question};
use crate::config::StreamConfig;
use crate::endpoint::resolve_endpoint;
use crate::error::ChatStreamError;
use crate::headers::build_headers;
use crate::lines::{LineDecoder, StreamLine, MAX_LINE_BYTES};

/// Cancellation signal shared by the caller, the request and the reader task.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);
const QUEUE_CAPACITY: usize = 1;

/// Something that can turn one request into a queue of decoded events.
pub trait ChatStream<Q, E>: Send + Sync {
    fn stream(
        &self,
        request: &Q,
        cancel: &CancellationSignal,
    ) -> impl Future<Output = Result<EventQueue<E>, ChatStreamError>> + Send;
}

/// Ordered single-consumer queue of events produced by one stream call.
///
/// The queue reports closure as soon as the cancellation signal fires, even if
/// the producer already buffered another event.
#[derive(Debug)]
pub struct EventQueue<E> {
    receiver: mpsc::Receiver<E>,
    cancel: CancellationSignal,
}

impl<E> EventQueue<E> {
    /// Creates a queue and the sender feeding it.
    pub fn channel(cancel: &CancellationSignal) -> (mpsc::Sender<E>, Self) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        (
            sender,
            Self {
                receiver,
                cancel: Arc::clone(cancel),
            },
        )
    }

    /// Receives the next event, or `None` once the producer is done or the
    /// call was cancelled.
    pub async fn recv(&mut self) -> Option<E> {
        if is_cancelled(&self.cancel) {
            self.receiver.close();
            return None;
        }

        match await_or_cancel(self.receiver.recv(), &self.cancel).await {
            Ok(Some(event)) => Some(event),
            Ok(None) => None,
            Err(_) => {
                self.receiver.close();
                None
            }
        }
    }
}

/// Streaming client generic over its request and event payloads.
#[derive(Debug)]
pub struct StreamClient<Q, E> {
    http: Client,
    endpoint: Url,
    headers: HeaderMap,
    config: StreamConfig,
    _payloads: PhantomData<fn(&Q) -> E>,
}

impl<Q, E> StreamClient<Q, E>
where
    Q: Question,
    E: AnswerChunk,
{
    pub fn new(config: StreamConfig) -> Result<Self, ChatStreamError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatStreamError::from)?;
        Self::with_http_client(http, config)
    }

    /// Uses a caller-supplied HTTP client; the config timeout is not applied.
    pub fn with_http_client(http: Client, config: StreamConfig) -> Result<Self, ChatStreamError> {
        let endpoint = resolve_endpoint(&config.endpoint)?;
        let headers = header_map(&config)?;
        Ok(Self {
            http,
            endpoint,
            headers,
            config,
            _payloads: PhantomData,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn build_request(&self, request: &Q) -> Result<reqwest::RequestBuilder, ChatStreamError> {
        let body = request.encode()?;
        Ok(self
            .http
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(body))
    }

    /// Sends `request` and returns once the response head arrives.
    ///
    /// The body is read by a spawned task that feeds the returned queue and
    /// closes it when the body ends, a terminator or malformed event is seen,
    /// or `cancel` fires.
    pub async fn stream(
        &self,
        request: &Q,
        cancel: &CancellationSignal,
    ) -> Result<EventQueue<E>, ChatStreamError> {
        if is_cancelled(cancel) {
            return Err(ChatStreamError::Cancelled);
        }

        let builder = self.build_request(request)?;
        debug!(endpoint = %self.endpoint, "sending chat request");

        let response = await_or_cancel(builder.send(), cancel)
            .await?
            .map_err(ChatStreamError::from)?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "chat stream opened");
        } else {
            warn!(%status, "chat endpoint answered with a non-success status");
        }

        let (sender, queue) = EventQueue::channel(cancel);
        let pump = EventPump {
            sender,
            cancel: Arc::clone(cancel),
            error_buffer: String::new(),
            error_overflow: false,
            delivered: 0,
        };
        tokio::spawn(pump.run(response));

        Ok(queue)
    }
}

impl<Q, E> ChatStream<Q, E> for StreamClient<Q, E>
where
    Q: Question,
    E: AnswerChunk,
{
    fn stream(
        &self,
        request: &Q,
        cancel: &CancellationSignal,
    ) -> impl Future<Output = Result<EventQueue<E>, ChatStreamError>> + Send {
        StreamClient::stream(self, request, cancel)
    }
}

fn header_map(config: &StreamConfig) -> Result<HeaderMap, ChatStreamError> {
    let mut out = HeaderMap::new();
    for (key, value) in build_headers(config) {
        out.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ChatStreamError::InvalidHeader(format!("invalid header key: {key}")))?,
            HeaderValue::from_str(&value).map_err(|_| {
                ChatStreamError::InvalidHeader(format!("invalid header value for {key}"))
            })?,
        );
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Reader side of one stream call. Dropping it closes the queue and releases
/// the connection.
struct EventPump<E> {
    sender: mpsc::Sender<E>,
    cancel: CancellationSignal,
    error_buffer: String,
    error_overflow: bool,
    delivered: usize,
}

impl<E: AnswerChunk> EventPump<E> {
    async fn run(mut self, response: Response) {
        let mut body = response.bytes_stream();
        let mut decoder = LineDecoder::default();
        let mut failure = None;

        'read: loop {
            let Some(next) = self.until_stopped(body.next()).await else {
                debug!(delivered = self.delivered, "chat stream abandoned while reading");
                return;
            };
            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(error)) => {
                    warn!(%error, "chat stream read failed");
                    failure = Some(ChatStreamError::from(error));
                    break;
                }
                None => break,
            };
            decoder.push(&chunk);
            while let Some(line) = decoder.next_line() {
                match line {
                    Ok(line) => {
                        if self.handle(line).await == Flow::Stop {
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "chat stream framing failed");
                        failure = Some(error);
                        break 'read;
                    }
                }
            }
        }

        if failure.is_none() {
            if let Some(line) = decoder.finish() {
                if self.handle(line).await == Flow::Stop {
                    return;
                }
            }
        }

        if self.flush_error_buffer().await == Flow::Stop {
            return;
        }
        match failure {
            Some(error) => {
                if let Some(event) = E::from_stream_error(&error) {
                    self.deliver(event).await;
                }
            }
            None => debug!(delivered = self.delivered, "chat stream ended without terminator"),
        }
    }

    async fn handle(&mut self, line: StreamLine) -> Flow {
        match line {
            StreamLine::Raw(text) => {
                self.buffer_error_text(&text);
                Flow::Continue
            }
            StreamLine::Done => {
                debug!(delivered = self.delivered, "chat stream finished");
                Flow::Stop
            }
            StreamLine::Data(payload) => match E::decode_new(payload.as_bytes()) {
                Ok(event) => self.deliver(event).await,
                Err(error) => {
                    warn!(%error, delivered = self.delivered, "malformed chat event; closing stream");
                    Flow::Stop
                }
            },
        }
    }

    fn buffer_error_text(&mut self, text: &str) {
        if self.error_buffer.len() + text.len() > MAX_LINE_BYTES {
            if !self.error_overflow {
                warn!(limit = MAX_LINE_BYTES, "raw error text over limit; dropping the rest");
                self.error_overflow = true;
            }
            return;
        }
        self.error_buffer.push_str(text);
    }

    async fn deliver(&mut self, event: E) -> Flow {
        match self.until_stopped(self.sender.send(event)).await {
            Some(Ok(())) => {
                self.delivered += 1;
                Flow::Continue
            }
            Some(Err(_)) | None => {
                debug!(delivered = self.delivered, "chat stream abandoned while delivering");
                Flow::Stop
            }
        }
    }

    async fn flush_error_buffer(&mut self) -> Flow {
        if self.error_buffer.is_empty() {
            return Flow::Continue;
        }

        match E::decode_new(self.error_buffer.as_bytes()) {
            Ok(event) => self.deliver(event).await,
            Err(error) => {
                debug!(%error, bytes = self.error_buffer.len(), "undecodable error text dropped");
                Flow::Continue
            }
        }
    }

    /// Awaits `future` unless the call is cancelled or the consumer has
    /// dropped its queue.
    async fn until_stopped<F: Future>(&self, future: F) -> Option<F::Output> {
        await_unless(future, || is_cancelled(&self.cancel) || self.sender.is_closed()).await
    }
}

pub fn is_cancelled(cancel: &CancellationSignal) -> bool {
    cancel.load(Ordering::Acquire)
}

async fn await_or_cancel<F>(future: F, cancel: &CancellationSignal) -> Result<F::Output, ChatStreamError>
where
    F: Future,
{
    await_unless(future, || is_cancelled(cancel))
        .await
        .ok_or(ChatStreamError::Cancelled)
}

/// Polls `future` in short slices and gives up once `stopped` reports true.
async fn await_unless<F, S>(future: F, stopped: S) -> Option<F::Output>
where
    F: Future,
    S: Fn() -> bool,
{
    let mut future = Box::pin(future);

    loop {
        if stopped() {
            return None;
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if stopped() {
                return None;
            }
            return Some(output);
        }
    }
}
