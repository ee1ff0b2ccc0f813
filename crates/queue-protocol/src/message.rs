//! Message types and core domain identifiers for queue operations.

use crate::error::{QueueError, ValidationError};
use bytes::Bytes;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Protocol Limits
// ============================================================================

/// Maximum visibility timeout accepted by the service (7 days)
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::days(7);

/// Maximum number of messages a single receive or peek call may request
pub const MAX_MESSAGES_PER_BATCH: u32 = 32;

/// Default time-to-live applied when none is given (7 days)
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::days(7);

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name following storage queue naming rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        if name.len() < 3 || name.len() > 63 {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: "must be 3-63 characters".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only lowercase ASCII alphanumeric and hyphens allowed".to_string(),
            });
        }

        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "no leading/trailing hyphens or consecutive hyphens".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Opaque server-assigned message identifier, stable across lease renewals
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a server-assigned identifier
    pub fn new(id: String) -> Result<Self, ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(id))
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Opaque token proving the holder currently has a valid message lease.
///
/// A pop receipt is replaced on every successful receive or update and is
/// required for update and delete. Only presence and equality are observable;
/// the internal structure is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopReceipt(String);

impl PopReceipt {
    /// Wrap a receipt value returned by the service
    pub fn new(receipt: String) -> Self {
        Self(receipt)
    }

    /// Get receipt as string for transport calls
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// UTC timestamp wrapper for consistent time handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Serialize as ISO-8601 UTC, keeping sub-second precision when present
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Parse an ISO-8601 timestamp
    pub fn from_iso8601(s: &str) -> Result<Self, ValidationError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| ValidationError::InvalidFormat {
                field: "timestamp".to_string(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_iso8601())
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

// ============================================================================
// Time To Live
// ============================================================================

/// How long a message may exist in the queue before automatic removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeToLive {
    /// Message expires after the given positive duration
    Bounded(Duration),
    /// Message never expires (wire value -1)
    Infinite,
}

impl TimeToLive {
    /// Validate the TTL: a bounded TTL must be strictly positive
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Bounded(d) if *d <= Duration::zero() => Err(ValidationError::OutOfRange {
                field: "time_to_live".to_string(),
                message: "must be positive or infinite".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Wire representation in seconds, -1 for infinite
    pub fn as_seconds(&self) -> i64 {
        match self {
            Self::Bounded(d) => d.num_seconds(),
            Self::Infinite => -1,
        }
    }
}

impl Default for TimeToLive {
    fn default() -> Self {
        Self::Bounded(DEFAULT_TIME_TO_LIVE)
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// One unit in a queue, as seen by the client.
///
/// Instances are produced by enqueue, receive, and peek. `pop_receipt` and
/// `time_next_visible` are only present while the holder has a lease; peeked
/// messages never carry them. `dequeue_count` is propagated from service
/// responses and never recomputed locally.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: MessageId,
    pub content: Bytes,
    pub insertion_time: Option<Timestamp>,
    pub expiration_time: Option<Timestamp>,
    pub pop_receipt: Option<PopReceipt>,
    pub time_next_visible: Option<Timestamp>,
    pub dequeue_count: u32,
}

impl QueueMessage {
    /// Check whether the message currently carries a lease receipt
    pub fn has_receipt(&self) -> bool {
        self.pop_receipt.is_some()
    }
}

/// Identifies a message in an update or delete call.
///
/// Accepts either a full message (receipt taken from its `pop_receipt` field)
/// or a bare id with an optional receipt. Resolution happens once at the call
/// boundary; an explicit receipt argument always overrides the handle's own.
#[derive(Debug, Clone)]
pub enum MessageHandle {
    /// A full message previously returned by receive or update
    Message(QueueMessage),
    /// A bare id plus whatever receipt the caller stored alongside it
    Id {
        id: MessageId,
        pop_receipt: Option<PopReceipt>,
    },
}

impl MessageHandle {
    /// Resolve to (id, receipt) for the given operation.
    ///
    /// Fails with [`QueueError::MissingReceipt`] before any transport call
    /// when neither the handle nor the override provides a receipt.
    pub fn resolve(
        self,
        override_receipt: Option<PopReceipt>,
        operation: &str,
    ) -> Result<(MessageId, PopReceipt), QueueError> {
        let (id, handle_receipt) = match self {
            Self::Message(message) => (message.id, message.pop_receipt),
            Self::Id { id, pop_receipt } => (id, pop_receipt),
        };

        let receipt =
            override_receipt
                .or(handle_receipt)
                .ok_or_else(|| QueueError::MissingReceipt {
                    operation: operation.to_string(),
                })?;

        Ok((id, receipt))
    }

    /// Get the message id without consuming the handle
    pub fn id(&self) -> &MessageId {
        match self {
            Self::Message(message) => &message.id,
            Self::Id { id, .. } => id,
        }
    }
}

impl From<QueueMessage> for MessageHandle {
    fn from(message: QueueMessage) -> Self {
        Self::Message(message)
    }
}

impl From<MessageId> for MessageHandle {
    fn from(id: MessageId) -> Self {
        Self::Id {
            id,
            pop_receipt: None,
        }
    }
}

impl From<(MessageId, PopReceipt)> for MessageHandle {
    fn from((id, pop_receipt): (MessageId, PopReceipt)) -> Self {
        Self::Id {
            id,
            pop_receipt: Some(pop_receipt),
        }
    }
}

/// Validate a visibility timeout against the service ceiling
pub fn validate_visibility_timeout(timeout: Duration) -> Result<(), ValidationError> {
    if timeout < Duration::zero() || timeout > MAX_VISIBILITY_TIMEOUT {
        return Err(ValidationError::OutOfRange {
            field: "visibility_timeout".to_string(),
            message: "must be between 0 seconds and 7 days".to_string(),
        });
    }

    Ok(())
}

/// Validate a receive/peek batch size against the service ceiling
pub fn validate_batch_size(max_messages: u32) -> Result<(), ValidationError> {
    if !(1..=MAX_MESSAGES_PER_BATCH).contains(&max_messages) {
        return Err(ValidationError::OutOfRange {
            field: "max_messages".to_string(),
            message: format!("must be between 1 and {}", MAX_MESSAGES_PER_BATCH),
        });
    }

    Ok(())
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
