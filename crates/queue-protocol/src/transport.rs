//! Transport capability consumed by the protocol engines.
//!
//! The transport owns request encoding, authentication, and retry policy;
//! the protocol core only sees typed wire DTOs and structured status codes.
//! Receipts and continuation markers cross this boundary as opaque strings.

use crate::message::{QueueName, Timestamp};
use crate::policy::SignedIdentifier;
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Structured failure from a transport call.
///
/// `status` carries the HTTP-status-equivalent so the core can map 404/409/412
/// to domain error kinds; `code` is the backend's error code string.
#[derive(Debug, Clone, Error)]
#[error("{status} {code}: {message}")]
pub struct TransportError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl TransportError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Message metadata as returned by get and peek calls.
///
/// `pop_receipt` and `time_next_visible` are populated by get (a lease was
/// granted) and absent from peek responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub message_id: String,
    pub message_text: String,
    pub insertion_time: Timestamp,
    pub expiration_time: Timestamp,
    pub pop_receipt: Option<String>,
    pub time_next_visible: Option<Timestamp>,
    pub dequeue_count: u32,
}

/// Response to a successful put-message call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueuedMessage {
    pub message_id: String,
    pub insertion_time: Timestamp,
    pub expiration_time: Timestamp,
    pub pop_receipt: String,
    pub time_next_visible: Timestamp,
}

/// Fresh lease state returned by a successful update call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReceipt {
    pub pop_receipt: String,
    pub time_next_visible: Timestamp,
}

/// One queue in an account-level listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub name: String,
    pub metadata: HashMap<String, String>,
}

/// One page of an account-level queue listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItemPage {
    pub items: Vec<QueueItem>,
    pub next_marker: Option<String>,
}

/// Backend operations the protocol core calls through.
///
/// One method per service operation; implementations translate these into
/// whatever wire format the backend speaks. Time-to-live travels in seconds
/// with -1 meaning infinite, matching the service contract.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Add a message to the back of the queue
    async fn put_message(
        &self,
        queue: &QueueName,
        message_text: &str,
        visibility_timeout: Duration,
        time_to_live_seconds: i64,
    ) -> Result<EnqueuedMessage, TransportError>;

    /// Dequeue up to `number_of_messages` visible messages, leasing each
    async fn get_messages(
        &self,
        queue: &QueueName,
        number_of_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<WireMessage>, TransportError>;

    /// Inspect up to `number_of_messages` visible messages without leasing
    async fn peek_messages(
        &self,
        queue: &QueueName,
        number_of_messages: u32,
    ) -> Result<Vec<WireMessage>, TransportError>;

    /// Extend or modify a leased message; `message_text = None` keeps the body
    async fn update_message(
        &self,
        queue: &QueueName,
        message_id: &str,
        pop_receipt: &str,
        visibility_timeout: Duration,
        message_text: Option<&str>,
    ) -> Result<UpdateReceipt, TransportError>;

    /// Delete a leased message by id and receipt
    async fn delete_message(
        &self,
        queue: &QueueName,
        message_id: &str,
        pop_receipt: &str,
    ) -> Result<(), TransportError>;

    /// Delete all messages in the queue
    async fn clear_messages(&self, queue: &QueueName) -> Result<(), TransportError>;

    /// Create the queue with the given metadata
    async fn create_queue(
        &self,
        queue: &QueueName,
        metadata: &HashMap<String, String>,
    ) -> Result<(), TransportError>;

    /// Delete the queue and all messages it contains
    async fn delete_queue(&self, queue: &QueueName) -> Result<(), TransportError>;

    /// Fetch user-defined queue metadata
    async fn get_queue_metadata(
        &self,
        queue: &QueueName,
    ) -> Result<HashMap<String, String>, TransportError>;

    /// Replace user-defined queue metadata
    async fn set_queue_metadata(
        &self,
        queue: &QueueName,
        metadata: &HashMap<String, String>,
    ) -> Result<(), TransportError>;

    /// Fetch the stored access policies on the queue
    async fn get_access_policy(
        &self,
        queue: &QueueName,
    ) -> Result<Vec<SignedIdentifier>, TransportError>;

    /// Replace the stored access policies; an empty list clears them
    async fn set_access_policy(
        &self,
        queue: &QueueName,
        identifiers: Vec<SignedIdentifier>,
    ) -> Result<(), TransportError>;

    /// List queues in the account, marker-paged and prefix-filterable
    async fn list_queues(
        &self,
        prefix: Option<&str>,
        marker: Option<&str>,
        max_results: Option<u32>,
    ) -> Result<QueueItemPage, TransportError>;
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
