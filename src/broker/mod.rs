pub mod repository;
pub mod services;
pub mod subscriptions;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::error::{AdapterError, Result};
use crate::message::{Message, VERSION};
use crate::ports::{MessageQueue, MessageTopic, ReceivedMessage};
use crate::validator::Validator;

pub use repository::{InMemoryRepository, RecordStatus, Repository, RepositoryRecord};
pub use subscriptions::{MessageHandler, Subscriptions};

/// Number of messages requested per receive call.
const MAX_NUMBER_OF_MESSAGES: i32 = 1;

/// Longest wait on each receive poll.
const WAIT_TIME: Duration = Duration::from_secs(1);

/// Addresses of the three outbound channels. An empty invalid or error
/// address disables that redirection with a warning.
#[derive(Debug, Clone, Default)]
pub struct TopicAddresses {
    pub main: String,
    pub invalid: String,
    pub error: String,
}

/// Client of the message bus.
///
/// Messages received from the inbound queue are written to an internal
/// channel of capacity one, so the receiver controls how often the queue is
/// polled. The dispatcher is unbounded: each message is processed on its own
/// task.
///
/// The processor extracts, validates and decodes the payload, rejects
/// messages seen before, runs the designated handler and captures the
/// returned error. Ill-formed inputs go to the invalid channel, handler
/// failures to the error channel, and messages are deleted from the queue as
/// soon as they reach a terminal disposition. The queue's visibility timeout
/// is assumed to cover the handler's worst case.
pub struct Broker {
    validator: Arc<dyn Validator>,
    queue: Arc<dyn MessageQueue>,
    topic: Arc<dyn MessageTopic>,
    addresses: TopicAddresses,
    repository: Arc<dyn Repository>,
    subscriptions: Subscriptions,
    token: CancellationToken,
    incoming_messages: AtomicU64,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Broker {
    pub fn new(
        validator: Arc<dyn Validator>,
        queue: Arc<dyn MessageQueue>,
        topic: Arc<dyn MessageTopic>,
        addresses: TopicAddresses,
        repository: Arc<dyn Repository>,
    ) -> Broker {
        Broker {
            validator,
            queue,
            topic,
            addresses,
            repository,
            subscriptions: Subscriptions::new(),
            token: CancellationToken::new(),
            incoming_messages: AtomicU64::new(0),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Subscribes a handler to a message type, replacing any prior handler.
    pub fn subscribe(
        &self,
        message_type: crate::message::MessageType,
        handler: Arc<dyn MessageHandler>,
    ) {
        self.subscriptions.subscribe(message_type, handler);
    }

    /// Cancellation token shared with every outbound request.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Total number of messages received so far.
    pub fn incoming_count(&self) -> u64 {
        self.incoming_messages.load(Ordering::Relaxed)
    }

    /// Starts the poll and dispatch tasks.
    pub async fn run(self: Arc<Broker>) {
        let (tx, mut rx) = mpsc::channel::<ReceivedMessage>(1);

        let broker = Arc::clone(&self);
        let poll = tokio::spawn(async move { broker.poll_loop(tx).await });

        let broker = Arc::clone(&self);
        let dispatch = tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move { broker.process_message(raw).await });
            }
        });

        let mut tasks = self.tasks.lock().await;
        tasks.push(poll);
        tasks.push(dispatch);
    }

    /// Stops the broker and blocks until the poll and dispatch tasks have
    /// drained. In-flight handler tasks are not awaited.
    pub async fn stop(&self) {
        self.token.cancel();
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            let _ = task.await;
        }
    }

    async fn poll_loop(&self, tx: mpsc::Sender<ReceivedMessage>) {
        loop {
            tokio::select! {
                _ = self.token.cancelled() => return,
                received = self.queue.receive(MAX_NUMBER_OF_MESSAGES, WAIT_TIME) => match received {
                    Ok(messages) => {
                        for raw in messages {
                            // The send blocks until the dispatcher accepts
                            // the previous message.
                            if tx.send(raw).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        error!("Error receiving a message from the inbound queue: {err}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }

    async fn process_message(&self, raw: ReceivedMessage) {
        self.incoming_messages.fetch_add(1, Ordering::Relaxed);

        // Pass the message through the validation/transformation service.
        // Schema issues send the original body to the invalid channel; other
        // failures (service down) keep the original stream.
        let stream = match self.validator.validate(&self.token, &raw.body).await {
            Ok(canonical) => canonical,
            Err(err @ AdapterError::Validation(_)) => {
                warn!("Validation service reported schema issues: {err}");
                self.invalid_message(&raw).await;
                return;
            }
            Err(err) => {
                warn!("Validation service reported a problem: {err}");
                raw.body.clone()
            }
        };

        let msg: Message = match serde_json::from_slice(&stream) {
            Ok(msg) => msg,
            Err(err) => {
                warn!("Message payload could not be decoded: {err}");
                self.invalid_message(&raw).await;
                return;
            }
        };

        if msg.message_header.version != VERSION {
            warn!(
                version = %msg.message_header.version,
                "Version is not supported, only {VERSION}"
            );
            self.invalid_message(&raw).await;
            return;
        }

        // Not having access to the local data repository is not a reason to
        // prevent processing.
        match self.repository.seen_before_or_store(&msg).await {
            Ok(true) => {
                warn!(message_id = %msg.id(), "Message found in the local data repository.");
                self.delete_message(&raw.receipt_handle).await;
                return;
            }
            Ok(false) => {}
            Err(err) => warn!("Local data repository check failed: {err}"),
        }

        let span = info_span!(
            "handler",
            message_id = %msg.id(),
            message_type = %msg.message_header.message_type,
            message_class = %msg.message_header.message_class,
        );
        match self.handle_message(&msg).instrument(span).await {
            Ok(()) => self.delete_message(&raw.receipt_handle).await,
            Err(err) => {
                error!("Handler failure: {err}");
                self.error_message(msg, err, &raw.receipt_handle).await;
            }
        }
    }

    /// Runs the registered handler on its own task so a panic can be caught
    /// and treated as a handler failure.
    async fn handle_message(&self, msg: &Message) -> Result<()> {
        let handler = self
            .subscriptions
            .handler_for(msg.message_header.message_type)
            .ok_or(AdapterError::UnassignedHandler(msg.message_header.message_type))?;
        let msg = msg.clone();
        let task = tokio::spawn(async move { handler.handle(&msg).await });
        match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                Err(AdapterError::Handler(format!("handler task panic! {err}")))
            }
            Err(err) => Err(AdapterError::Handler(err.to_string())),
        }
    }

    /// Best-effort deletion of an inbound message.
    async fn delete_message(&self, receipt_handle: &str) {
        if let Err(err) = self.queue.delete(receipt_handle).await {
            error!("Message could not be removed from the inbound queue: {err}");
        }
    }

    /// Redirects the original body of an ill-formed message to the invalid
    /// channel and deletes it from the inbound queue.
    async fn invalid_message(&self, raw: &ReceivedMessage) {
        if self.addresses.invalid.is_empty() {
            warn!(channel = "invalid[disabled]", "Invalid message not redirected");
        } else {
            let payload = String::from_utf8_lossy(&raw.body);
            match self.topic.publish(&self.addresses.invalid, &payload).await {
                Ok(()) => debug!("Message sent to the invalid message channel"),
                Err(err) => {
                    error!("A message could not be sent to the invalid message channel: {err}")
                }
            }
        }
        self.delete_message(&raw.receipt_handle).await;
    }

    /// Tags the message with the failure and republishes it on the error
    /// channel, then deletes it from the inbound queue.
    async fn error_message(&self, mut msg: Message, err: AdapterError, receipt_handle: &str) {
        if self.addresses.error.is_empty() {
            warn!(channel = "error[disabled]", "{err}");
            self.delete_message(receipt_handle).await;
            return;
        }
        msg.tag_error(&err);
        match serde_json::to_string(&msg) {
            Ok(payload) => match self.topic.publish(&self.addresses.error, &payload).await {
                Ok(()) => debug!("Message sent to the error message channel"),
                Err(err) => {
                    error!("A message could not be sent to the error message channel: {err}")
                }
            },
            Err(err) => error!(
                "A message could not be marshalled before sending to the error message channel: {err}"
            ),
        }
        self.delete_message(receipt_handle).await;
    }

    /// Sends a fire-and-forget message to the main outbound channel.
    pub async fn request(&self, msg: &Message) -> Result<()> {
        let payload = serde_json::to_string(msg)?;
        self.topic.publish(&self.addresses.main, &payload).await
    }

    /// Request/response over the bus is reserved for a future iteration.
    pub async fn request_response(&self, _msg: &Message) -> Result<Message> {
        Err(AdapterError::NotImplemented("request_response"))
    }
}
