//! Queue clients implementing the message lease protocol.
//!
//! [`QueueClient`] owns operations against one queue: enqueue, leased
//! receive, peek, lease renewal via update, delete by receipt, plus queue
//! management and stored access policies. [`QueueServiceClient`] covers
//! account-level listing. Both hold no server-side state locally; correctness
//! under concurrency rests entirely on server-side receipt validation
//! (apply-after-confirm, nothing mutated before a response arrives).

use crate::codec::{MessageCodec, TextCodec};
use crate::error::{QueueError, ValidationError};
use crate::message::{
    validate_batch_size, validate_visibility_timeout, MessageHandle, MessageId, PopReceipt,
    QueueMessage, QueueName, TimeToLive,
};
use crate::paging::{ContinuationToken, Page, PageFetcher, Paged};
use crate::policy::{
    decode_access_policies, encode_access_policies, AccessPolicy, QUEUE_MAX_ACCESS_POLICIES,
};
use crate::transport::{QueueItem, QueueTransport, WireMessage};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Marker used between receive pages. Dequeueing has no positional cursor on
/// the backend; any non-terminal marker re-issues a dequeue, which continues
/// with whatever is visible next.
const RECEIVE_CONTINUATION_MARKER: &str = "more-messages";

/// Default visibility window applied to received messages (server default)
const DEFAULT_RECEIVE_VISIBILITY: Duration = Duration::seconds(30);

/// Build a [`QueueMessage`] from its wire form, decoding the body
fn message_from_wire(
    codec: &dyn MessageCodec,
    wire: WireMessage,
) -> Result<QueueMessage, QueueError> {
    Ok(QueueMessage {
        id: MessageId::new(wire.message_id)?,
        content: codec.decode(&wire.message_text)?,
        insertion_time: Some(wire.insertion_time),
        expiration_time: Some(wire.expiration_time),
        pop_receipt: wire.pop_receipt.map(PopReceipt::new),
        time_next_visible: wire.time_next_visible,
        dequeue_count: wire.dequeue_count,
    })
}

// ============================================================================
// QueueClient
// ============================================================================

/// Client for the lease protocol against a single queue.
///
/// The message codec is fixed at construction; there is no per-call override.
#[derive(Clone)]
pub struct QueueClient {
    queue_name: QueueName,
    transport: Arc<dyn QueueTransport>,
    codec: Arc<dyn MessageCodec>,
}

impl std::fmt::Debug for QueueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueClient")
            .field("queue_name", &self.queue_name)
            .finish_non_exhaustive()
    }
}

impl QueueClient {
    /// Create a client for the given queue using the text codec
    pub fn new(transport: Arc<dyn QueueTransport>, queue_name: QueueName) -> Self {
        Self {
            queue_name,
            transport,
            codec: Arc::new(TextCodec),
        }
    }

    /// Replace the message codec; only valid at construction time
    pub fn with_codec(mut self, codec: impl MessageCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Get the queue this client operates on
    pub fn queue_name(&self) -> &QueueName {
        &self.queue_name
    }

    /// Add a new message to the back of the queue.
    ///
    /// `visibility_timeout` defaults to 0 (immediately visible);
    /// `time_to_live` defaults to 7 days. A visibility timeout exceeding a
    /// bounded TTL fails validation before the transport call: the lease
    /// cannot outlive the message. The server enforces the same condition
    /// authoritatively; a server-side rejection is surfaced, not suppressed.
    pub async fn enqueue_message(
        &self,
        content: Bytes,
        visibility_timeout: Option<Duration>,
        time_to_live: Option<TimeToLive>,
    ) -> Result<QueueMessage, QueueError> {
        let visibility = visibility_timeout.unwrap_or_else(Duration::zero);
        validate_visibility_timeout(visibility)?;

        let ttl = time_to_live.unwrap_or_default();
        ttl.validate()?;
        if let TimeToLive::Bounded(lifetime) = ttl {
            if visibility > lifetime {
                return Err(ValidationError::OutOfRange {
                    field: "visibility_timeout".to_string(),
                    message: "cannot exceed the message time-to-live".to_string(),
                }
                .into());
            }
        }

        let message_text = self.codec.encode(&content)?;
        let enqueued = self
            .transport
            .put_message(&self.queue_name, &message_text, visibility, ttl.as_seconds())
            .await
            .map_err(|e| {
                QueueError::from_transport("enqueue_message", self.queue_name.as_str(), e)
            })?;

        debug!(
            queue = %self.queue_name,
            message_id = %enqueued.message_id,
            "message enqueued"
        );

        Ok(QueueMessage {
            id: MessageId::new(enqueued.message_id)?,
            content,
            insertion_time: Some(enqueued.insertion_time),
            expiration_time: Some(enqueued.expiration_time),
            pop_receipt: Some(PopReceipt::new(enqueued.pop_receipt)),
            time_next_visible: Some(enqueued.time_next_visible),
            dequeue_count: 0,
        })
    }

    /// Remove messages from the front of the queue under a lease.
    ///
    /// Returns a paged sequence; each page pull performs one dequeue call
    /// requesting up to `max_messages` (1-32, default 1) messages, each
    /// carrying a fresh pop receipt and its server-incremented dequeue
    /// count. Iteration ends when a dequeue returns an empty batch.
    pub fn receive_messages(
        &self,
        max_messages: Option<u32>,
        visibility_timeout: Option<Duration>,
    ) -> Result<Paged<QueueMessage>, QueueError> {
        let per_page = max_messages.unwrap_or(1);
        validate_batch_size(per_page)?;

        let visibility = visibility_timeout.unwrap_or(DEFAULT_RECEIVE_VISIBILITY);
        validate_visibility_timeout(visibility)?;

        let fetcher = ReceivePager {
            transport: Arc::clone(&self.transport),
            codec: Arc::clone(&self.codec),
            queue_name: self.queue_name.clone(),
            visibility_timeout: visibility,
        };

        Ok(Paged::new(fetcher, Some(per_page)))
    }

    /// Inspect messages at the front of the queue without leasing them.
    ///
    /// Peeked messages never carry a pop receipt or visibility window, and
    /// their dequeue count reflects the current server value unincremented.
    pub async fn peek_messages(
        &self,
        max_messages: Option<u32>,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let count = max_messages.unwrap_or(1);
        validate_batch_size(count)?;

        let peeked = self
            .transport
            .peek_messages(&self.queue_name, count)
            .await
            .map_err(|e| {
                QueueError::from_transport("peek_messages", self.queue_name.as_str(), e)
            })?;

        peeked
            .into_iter()
            .map(|wire| {
                let mut message = message_from_wire(self.codec.as_ref(), wire)?;
                // Peeking must never grant or imply a lease
                message.pop_receipt = None;
                message.time_next_visible = None;
                Ok(message)
            })
            .collect()
    }

    /// Update a leased message's visibility window and optionally its body.
    ///
    /// The receipt from the most recent receive or update must be used; the
    /// explicit `pop_receipt` argument overrides the handle's own. On success
    /// the returned message carries the fresh receipt and visibility window,
    /// with insertion/expiration/dequeue metadata preserved from the handle
    /// rather than recomputed. Omitting `content` preserves the prior body
    /// server-side. A stale receipt fails with a precondition error exactly
    /// as delete does.
    pub async fn update_message(
        &self,
        handle: impl Into<MessageHandle>,
        visibility_timeout: Duration,
        content: Option<Bytes>,
        pop_receipt: Option<PopReceipt>,
    ) -> Result<QueueMessage, QueueError> {
        validate_visibility_timeout(visibility_timeout)?;

        let handle = handle.into();
        let (insertion_time, expiration_time, dequeue_count, prior_content) = match &handle {
            MessageHandle::Message(message) => (
                message.insertion_time,
                message.expiration_time,
                message.dequeue_count,
                Some(message.content.clone()),
            ),
            MessageHandle::Id { .. } => (None, None, 0, None),
        };

        let (id, receipt) = handle.resolve(pop_receipt, "update_message")?;

        let message_text = match &content {
            Some(bytes) => Some(self.codec.encode(bytes)?),
            None => None,
        };

        let updated = self
            .transport
            .update_message(
                &self.queue_name,
                id.as_str(),
                receipt.as_str(),
                visibility_timeout,
                message_text.as_deref(),
            )
            .await
            .map_err(|e| QueueError::from_transport("update_message", id.as_str(), e))?;

        debug!(queue = %self.queue_name, message_id = %id, "message updated");

        Ok(QueueMessage {
            id,
            content: content.or(prior_content).unwrap_or_default(),
            insertion_time,
            expiration_time,
            pop_receipt: Some(PopReceipt::new(updated.pop_receipt)),
            time_next_visible: Some(updated.time_next_visible),
            dequeue_count,
        })
    }

    /// Delete a leased message.
    ///
    /// Requires the receipt from the most recent receive or update; the
    /// explicit `pop_receipt` argument overrides the handle's own.
    pub async fn delete_message(
        &self,
        handle: impl Into<MessageHandle>,
        pop_receipt: Option<PopReceipt>,
    ) -> Result<(), QueueError> {
        let (id, receipt) = handle.into().resolve(pop_receipt, "delete_message")?;

        self.transport
            .delete_message(&self.queue_name, id.as_str(), receipt.as_str())
            .await
            .map_err(|e| QueueError::from_transport("delete_message", id.as_str(), e))?;

        debug!(queue = %self.queue_name, message_id = %id, "message deleted");
        Ok(())
    }

    /// Best-effort delete for cleanup paths: swallows not-found, propagates
    /// everything else (including stale-receipt preconditions)
    pub async fn delete_message_if_exists(
        &self,
        handle: impl Into<MessageHandle>,
        pop_receipt: Option<PopReceipt>,
    ) -> Result<(), QueueError> {
        match self.delete_message(handle, pop_receipt).await {
            Err(QueueError::ResourceNotFound { resource }) => {
                debug!(queue = %self.queue_name, %resource, "delete skipped, message absent");
                Ok(())
            }
            other => other,
        }
    }

    /// Delete all messages in the queue
    pub async fn clear_messages(&self) -> Result<(), QueueError> {
        self.transport
            .clear_messages(&self.queue_name)
            .await
            .map_err(|e| {
                QueueError::from_transport("clear_messages", self.queue_name.as_str(), e)
            })
    }

    /// Create this queue. Fails with [`QueueError::ResourceExists`] if a
    /// queue with the same name already exists.
    pub async fn create_queue(
        &self,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<(), QueueError> {
        self.transport
            .create_queue(&self.queue_name, &metadata.unwrap_or_default())
            .await
            .map_err(|e| QueueError::from_transport("create_queue", self.queue_name.as_str(), e))
    }

    /// Delete this queue and all messages it contains
    pub async fn delete_queue(&self) -> Result<(), QueueError> {
        self.transport
            .delete_queue(&self.queue_name)
            .await
            .map_err(|e| QueueError::from_transport("delete_queue", self.queue_name.as_str(), e))
    }

    /// Fetch user-defined metadata for this queue
    pub async fn get_queue_metadata(&self) -> Result<HashMap<String, String>, QueueError> {
        self.transport
            .get_queue_metadata(&self.queue_name)
            .await
            .map_err(|e| {
                QueueError::from_transport("get_queue_metadata", self.queue_name.as_str(), e)
            })
    }

    /// Replace user-defined metadata on this queue
    pub async fn set_queue_metadata(
        &self,
        metadata: HashMap<String, String>,
    ) -> Result<(), QueueError> {
        self.transport
            .set_queue_metadata(&self.queue_name, &metadata)
            .await
            .map_err(|e| {
                QueueError::from_transport("set_queue_metadata", self.queue_name.as_str(), e)
            })
    }

    /// Fetch the stored access policies on this queue.
    ///
    /// Identifiers without a policy body decode to a default policy so the
    /// result can always be indexed by name.
    pub async fn get_access_policy(&self) -> Result<HashMap<String, AccessPolicy>, QueueError> {
        let identifiers = self
            .transport
            .get_access_policy(&self.queue_name)
            .await
            .map_err(|e| {
                QueueError::from_transport("get_access_policy", self.queue_name.as_str(), e)
            })?;

        Ok(decode_access_policies(identifiers)?)
    }

    /// Replace the stored access policies on this queue.
    ///
    /// At most [`QUEUE_MAX_ACCESS_POLICIES`] entries; violating the ceiling
    /// fails before any transport call. An empty mapping clears all policies.
    pub async fn set_access_policy(
        &self,
        policies: &HashMap<String, AccessPolicy>,
    ) -> Result<(), QueueError> {
        let identifiers = encode_access_policies(policies, QUEUE_MAX_ACCESS_POLICIES)?;

        self.transport
            .set_access_policy(&self.queue_name, identifiers)
            .await
            .map_err(|e| {
                QueueError::from_transport("set_access_policy", self.queue_name.as_str(), e)
            })
    }
}

/// Page fetcher dequeuing one leased batch per pull
struct ReceivePager {
    transport: Arc<dyn QueueTransport>,
    codec: Arc<dyn MessageCodec>,
    queue_name: QueueName,
    visibility_timeout: Duration,
}

#[async_trait]
impl PageFetcher<QueueMessage> for ReceivePager {
    async fn fetch(
        &self,
        _token: Option<&ContinuationToken>,
        page_size: Option<u32>,
    ) -> Result<Page<QueueMessage>, QueueError> {
        let batch = self
            .transport
            .get_messages(
                &self.queue_name,
                page_size.unwrap_or(1),
                self.visibility_timeout,
            )
            .await
            .map_err(|e| {
                QueueError::from_transport("receive_messages", self.queue_name.as_str(), e)
            })?;

        let items: Vec<QueueMessage> = batch
            .into_iter()
            .map(|wire| message_from_wire(self.codec.as_ref(), wire))
            .collect::<Result<_, _>>()?;

        if items.is_empty() {
            Ok(Page::last(items))
        } else {
            Ok(Page::new(
                items,
                Some(ContinuationToken::new(
                    RECEIVE_CONTINUATION_MARKER.to_string(),
                )),
            ))
        }
    }
}

// ============================================================================
// QueueServiceClient
// ============================================================================

/// Account-level client: queue creation, deletion, and paged listing
#[derive(Clone)]
pub struct QueueServiceClient {
    transport: Arc<dyn QueueTransport>,
}

impl QueueServiceClient {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self { transport }
    }

    /// Get a client for one queue under this account
    pub fn queue_client(&self, queue_name: QueueName) -> QueueClient {
        QueueClient::new(Arc::clone(&self.transport), queue_name)
    }

    /// Create a queue and return a client for it
    pub async fn create_queue(&self, queue_name: QueueName) -> Result<QueueClient, QueueError> {
        let client = self.queue_client(queue_name);
        client.create_queue(None).await?;
        Ok(client)
    }

    /// Delete a queue and all messages it contains
    pub async fn delete_queue(&self, queue_name: QueueName) -> Result<(), QueueError> {
        self.queue_client(queue_name).delete_queue().await
    }

    /// List queues in the account as a lazy paged sequence.
    ///
    /// `page_size` is an advisory cap per fetch; `prefix` filters by name.
    pub fn list_queues(&self, prefix: Option<String>, page_size: Option<u32>) -> Paged<QueueItem> {
        let fetcher = QueueListPager {
            transport: Arc::clone(&self.transport),
            prefix,
        };
        Paged::new(fetcher, page_size)
    }

    /// Resume a queue listing from an externally stored continuation token
    pub fn list_queues_from(
        &self,
        prefix: Option<String>,
        page_size: Option<u32>,
        token: ContinuationToken,
    ) -> Paged<QueueItem> {
        let fetcher = QueueListPager {
            transport: Arc::clone(&self.transport),
            prefix,
        };
        Paged::resume_from(fetcher, page_size, token)
    }
}

/// Page fetcher over the account's marker-paged queue listing
struct QueueListPager {
    transport: Arc<dyn QueueTransport>,
    prefix: Option<String>,
}

#[async_trait]
impl PageFetcher<QueueItem> for QueueListPager {
    async fn fetch(
        &self,
        token: Option<&ContinuationToken>,
        page_size: Option<u32>,
    ) -> Result<Page<QueueItem>, QueueError> {
        let listed = self
            .transport
            .list_queues(
                self.prefix.as_deref(),
                token.map(ContinuationToken::as_str),
                page_size,
            )
            .await
            .map_err(|e| QueueError::from_transport("list_queues", "account", e))?;

        Ok(Page::new(
            listed.items,
            listed.next_marker.map(ContinuationToken::new),
        ))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
