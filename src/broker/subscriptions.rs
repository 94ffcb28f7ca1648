use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{Message, MessageType};

/// Callback supplied by message subscribers.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, msg: &Message) -> Result<()>;
}

/// Associates message handlers to message types. Reads and writes are
/// serialized by a reader/writer lock; handlers run outside the lock.
#[derive(Default)]
pub struct Subscriptions {
    handlers: RwLock<HashMap<MessageType, Arc<dyn MessageHandler>>>,
}

impl Subscriptions {
    pub fn new() -> Subscriptions {
        Subscriptions::default()
    }

    /// Subscribes a handler to a specific message type, replacing any
    /// previous handler for that type.
    pub fn subscribe(&self, message_type: MessageType, handler: Arc<dyn MessageHandler>) {
        let mut handlers = self.handlers.write().unwrap();
        handlers.insert(message_type, handler);
    }

    /// Returns the handler registered for the message type, if any.
    pub fn handler_for(&self, message_type: MessageType) -> Option<Arc<dyn MessageHandler>> {
        let handlers = self.handlers.read().unwrap();
        handlers.get(&message_type).cloned()
    }
}
