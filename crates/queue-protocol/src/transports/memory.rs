//! In-memory queue transport for testing and development.
//!
//! Implements the backend side of the lease protocol faithfully enough to
//! validate client behavior against it:
//! - visibility windows and receipt rotation on get/update
//! - dequeue counts incremented by get only (never by peek or update)
//! - TTL expiry with lazy purging
//! - stale receipts rejected with 412, absent messages with 404
//! - marker-paged queue listing honoring advisory page sizes

use crate::message::{QueueName, Timestamp};
use crate::policy::SignedIdentifier;
use crate::transport::{
    EnqueuedMessage, QueueItem, QueueItemPage, QueueTransport, TransportError, UpdateReceipt,
    WireMessage,
};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Storage for all queues in the simulated account
struct QueueStore {
    queues: HashMap<QueueName, StoredQueue>,
}

impl QueueStore {
    fn new() -> Self {
        Self {
            queues: HashMap::new(),
        }
    }

    fn queue(&self, name: &QueueName) -> Result<&StoredQueue, TransportError> {
        self.queues.get(name).ok_or_else(|| queue_not_found(name))
    }

    fn queue_mut(&mut self, name: &QueueName) -> Result<&mut StoredQueue, TransportError> {
        self.queues
            .get_mut(name)
            .ok_or_else(|| queue_not_found(name))
    }
}

/// State of a single queue
struct StoredQueue {
    /// Messages in FIFO order; leased messages stay in place, hidden by
    /// their visibility window
    messages: Vec<StoredMessage>,
    metadata: HashMap<String, String>,
    access_policies: Vec<SignedIdentifier>,
}

impl StoredQueue {
    fn new(metadata: HashMap<String, String>) -> Self {
        Self {
            messages: Vec::new(),
            metadata,
            access_policies: Vec::new(),
        }
    }

    /// Drop messages whose TTL has elapsed
    fn purge_expired(&mut self) {
        let now = Timestamp::now();
        self.messages.retain(|m| !m.is_expired(now));
    }
}

/// A message held by the backend
struct StoredMessage {
    message_id: String,
    message_text: String,
    insertion_time: Timestamp,
    /// None for infinite TTL
    expires_at: Option<Timestamp>,
    /// Rotated on every get and update; the previous value turns stale
    pop_receipt: String,
    time_next_visible: Timestamp,
    dequeue_count: u32,
}

impl StoredMessage {
    fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }

    fn is_visible(&self, now: Timestamp) -> bool {
        now >= self.time_next_visible
    }

    /// Expiration timestamp reported on the wire; infinite TTL surfaces as
    /// the service's far-future sentinel
    fn wire_expiration(&self) -> Timestamp {
        self.expires_at
            .unwrap_or_else(|| Timestamp::now() + Duration::days(365 * 100))
    }
}

// ============================================================================
// Error constructors matching the service's status codes
// ============================================================================

fn queue_not_found(queue: &QueueName) -> TransportError {
    TransportError::new(
        404,
        "QueueNotFound",
        format!("The specified queue '{}' does not exist", queue),
    )
}

fn queue_already_exists(queue: &QueueName) -> TransportError {
    TransportError::new(
        409,
        "QueueAlreadyExists",
        format!("The specified queue '{}' already exists", queue),
    )
}

fn message_not_found(message_id: &str) -> TransportError {
    TransportError::new(
        404,
        "MessageNotFound",
        format!("The specified message '{}' does not exist", message_id),
    )
}

fn pop_receipt_mismatch(message_id: &str) -> TransportError {
    TransportError::new(
        412,
        "PopReceiptMismatch",
        format!(
            "The pop receipt for message '{}' does not match the current lease",
            message_id
        ),
    )
}

fn storage_lock_poisoned() -> TransportError {
    TransportError::new(500, "InternalError", "storage lock poisoned")
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Thread-safe in-memory transport backing one simulated storage account
#[derive(Clone)]
pub struct MemoryTransport {
    store: Arc<RwLock<QueueStore>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(QueueStore::new())),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, QueueStore>, TransportError> {
        self.store.read().map_err(|_| storage_lock_poisoned())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, QueueStore>, TransportError> {
        self.store.write().map_err(|_| storage_lock_poisoned())
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueTransport for MemoryTransport {
    async fn put_message(
        &self,
        queue: &QueueName,
        message_text: &str,
        visibility_timeout: Duration,
        time_to_live_seconds: i64,
    ) -> Result<EnqueuedMessage, TransportError> {
        let mut store = self.write()?;
        let stored_queue = store.queue_mut(queue)?;
        stored_queue.purge_expired();

        let now = Timestamp::now();
        let expires_at = if time_to_live_seconds < 0 {
            None
        } else {
            Some(now + Duration::seconds(time_to_live_seconds))
        };

        let message = StoredMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            message_text: message_text.to_string(),
            insertion_time: now,
            expires_at,
            pop_receipt: uuid::Uuid::new_v4().to_string(),
            time_next_visible: now + visibility_timeout,
            dequeue_count: 0,
        };

        let enqueued = EnqueuedMessage {
            message_id: message.message_id.clone(),
            insertion_time: message.insertion_time,
            expiration_time: message.wire_expiration(),
            pop_receipt: message.pop_receipt.clone(),
            time_next_visible: message.time_next_visible,
        };
        stored_queue.messages.push(message);

        Ok(enqueued)
    }

    async fn get_messages(
        &self,
        queue: &QueueName,
        number_of_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<WireMessage>, TransportError> {
        let mut store = self.write()?;
        let stored_queue = store.queue_mut(queue)?;
        stored_queue.purge_expired();

        let now = Timestamp::now();
        let mut received = Vec::new();

        for message in stored_queue
            .messages
            .iter_mut()
            .filter(|m| m.is_visible(now))
            .take(number_of_messages as usize)
        {
            message.dequeue_count += 1;
            message.pop_receipt = uuid::Uuid::new_v4().to_string();
            message.time_next_visible = now + visibility_timeout;

            received.push(WireMessage {
                message_id: message.message_id.clone(),
                message_text: message.message_text.clone(),
                insertion_time: message.insertion_time,
                expiration_time: message.wire_expiration(),
                pop_receipt: Some(message.pop_receipt.clone()),
                time_next_visible: Some(message.time_next_visible),
                dequeue_count: message.dequeue_count,
            });
        }

        Ok(received)
    }

    async fn peek_messages(
        &self,
        queue: &QueueName,
        number_of_messages: u32,
    ) -> Result<Vec<WireMessage>, TransportError> {
        let mut store = self.write()?;
        let stored_queue = store.queue_mut(queue)?;
        stored_queue.purge_expired();

        let now = Timestamp::now();

        Ok(stored_queue
            .messages
            .iter()
            .filter(|m| m.is_visible(now))
            .take(number_of_messages as usize)
            .map(|message| WireMessage {
                message_id: message.message_id.clone(),
                message_text: message.message_text.clone(),
                insertion_time: message.insertion_time,
                expiration_time: message.wire_expiration(),
                pop_receipt: None,
                time_next_visible: None,
                dequeue_count: message.dequeue_count,
            })
            .collect())
    }

    async fn update_message(
        &self,
        queue: &QueueName,
        message_id: &str,
        pop_receipt: &str,
        visibility_timeout: Duration,
        message_text: Option<&str>,
    ) -> Result<UpdateReceipt, TransportError> {
        let mut store = self.write()?;
        let stored_queue = store.queue_mut(queue)?;
        stored_queue.purge_expired();

        let message = stored_queue
            .messages
            .iter_mut()
            .find(|m| m.message_id == message_id)
            .ok_or_else(|| message_not_found(message_id))?;

        if message.pop_receipt != pop_receipt {
            return Err(pop_receipt_mismatch(message_id));
        }

        if let Some(text) = message_text {
            message.message_text = text.to_string();
        }
        message.pop_receipt = uuid::Uuid::new_v4().to_string();
        message.time_next_visible = Timestamp::now() + visibility_timeout;

        Ok(UpdateReceipt {
            pop_receipt: message.pop_receipt.clone(),
            time_next_visible: message.time_next_visible,
        })
    }

    async fn delete_message(
        &self,
        queue: &QueueName,
        message_id: &str,
        pop_receipt: &str,
    ) -> Result<(), TransportError> {
        let mut store = self.write()?;
        let stored_queue = store.queue_mut(queue)?;
        stored_queue.purge_expired();

        let position = stored_queue
            .messages
            .iter()
            .position(|m| m.message_id == message_id)
            .ok_or_else(|| message_not_found(message_id))?;

        if stored_queue.messages[position].pop_receipt != pop_receipt {
            return Err(pop_receipt_mismatch(message_id));
        }

        stored_queue.messages.remove(position);
        Ok(())
    }

    async fn clear_messages(&self, queue: &QueueName) -> Result<(), TransportError> {
        let mut store = self.write()?;
        store.queue_mut(queue)?.messages.clear();
        Ok(())
    }

    async fn create_queue(
        &self,
        queue: &QueueName,
        metadata: &HashMap<String, String>,
    ) -> Result<(), TransportError> {
        let mut store = self.write()?;
        if store.queues.contains_key(queue) {
            return Err(queue_already_exists(queue));
        }

        store
            .queues
            .insert(queue.clone(), StoredQueue::new(metadata.clone()));
        Ok(())
    }

    async fn delete_queue(&self, queue: &QueueName) -> Result<(), TransportError> {
        let mut store = self.write()?;
        store
            .queues
            .remove(queue)
            .map(|_| ())
            .ok_or_else(|| queue_not_found(queue))
    }

    async fn get_queue_metadata(
        &self,
        queue: &QueueName,
    ) -> Result<HashMap<String, String>, TransportError> {
        let store = self.read()?;
        Ok(store.queue(queue)?.metadata.clone())
    }

    async fn set_queue_metadata(
        &self,
        queue: &QueueName,
        metadata: &HashMap<String, String>,
    ) -> Result<(), TransportError> {
        let mut store = self.write()?;
        store.queue_mut(queue)?.metadata = metadata.clone();
        Ok(())
    }

    async fn get_access_policy(
        &self,
        queue: &QueueName,
    ) -> Result<Vec<SignedIdentifier>, TransportError> {
        let store = self.read()?;
        Ok(store.queue(queue)?.access_policies.clone())
    }

    async fn set_access_policy(
        &self,
        queue: &QueueName,
        identifiers: Vec<SignedIdentifier>,
    ) -> Result<(), TransportError> {
        let mut store = self.write()?;
        store.queue_mut(queue)?.access_policies = identifiers;
        Ok(())
    }

    async fn list_queues(
        &self,
        prefix: Option<&str>,
        marker: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<QueueItemPage, TransportError> {
        if max_results == Some(0) {
            return Err(TransportError::new(
                400,
                "OutOfRangeQueryParameterValue",
                "max_results must be at least 1",
            ));
        }

        let store = self.read()?;

        // Listing order is lexicographic by name; the marker names the first
        // queue of the next page
        let mut names: Vec<&QueueName> = store
            .queues
            .keys()
            .filter(|name| prefix.map_or(true, |p| name.as_str().starts_with(p)))
            .collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let start = match marker {
            Some(marker) => names
                .iter()
                .position(|name| name.as_str() >= marker)
                .unwrap_or(names.len()),
            None => 0,
        };

        let page_len = max_results.map(|m| m as usize).unwrap_or(names.len());
        let end = (start + page_len).min(names.len());

        let items = names[start..end]
            .iter()
            .map(|name| QueueItem {
                name: name.as_str().to_string(),
                metadata: store.queues[*name].metadata.clone(),
            })
            .collect();

        let next_marker = names.get(end).map(|name| name.as_str().to_string());

        Ok(QueueItemPage { items, next_marker })
    }
}
