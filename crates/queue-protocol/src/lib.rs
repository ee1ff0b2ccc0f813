//! # Queue Protocol
//!
//! Client-side storage-queue protocol library: the message visibility/lease
//! state machine, continuation-token paging, and stored access policies, all
//! behind a pluggable transport capability.
//!
//! This library provides:
//! - Lease-protocol operations (enqueue, receive-with-lease, peek, update,
//!   delete-by-receipt) with client-side pre-flight validation
//! - A generic, resumable paged-listing engine driven by opaque
//!   continuation tokens
//! - Stored-access-policy encoding with per-resource cardinality ceilings
//! - Pluggable message codecs (text, base64) fixed per client instance
//! - An in-memory transport implementing the backend contract for tests
//!   and development
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message structures, identifiers, and lease handles
//! - [`codec`] - Message content codecs
//! - [`policy`] - Stored access policies and their wire codec
//! - [`paging`] - Continuation-token paging engine
//! - [`transport`] - Transport capability trait and wire DTOs
//! - [`transports`] - Transport implementations
//! - [`client`] - Queue and service clients

// Module declarations
pub mod client;
pub mod codec;
pub mod error;
pub mod message;
pub mod paging;
pub mod policy;
pub mod transport;
pub mod transports;

// Re-export commonly used types at crate root for convenience
pub use client::{QueueClient, QueueServiceClient};
pub use codec::{Base64Codec, MessageCodec, TextCodec};
pub use error::{EncodingError, QueueError, ValidationError};
pub use message::{
    MessageHandle, MessageId, PopReceipt, QueueMessage, QueueName, TimeToLive, Timestamp,
    DEFAULT_TIME_TO_LIVE, MAX_MESSAGES_PER_BATCH, MAX_VISIBILITY_TIMEOUT,
};
pub use paging::{ContinuationToken, Page, PageFetcher, Paged};
pub use policy::{AccessPolicy, SignedIdentifier, QUEUE_MAX_ACCESS_POLICIES};
pub use transport::{QueueItem, QueueTransport, TransportError};
pub use transports::MemoryTransport;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
