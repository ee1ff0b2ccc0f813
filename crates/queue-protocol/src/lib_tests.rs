//! Tests for the crate root exports.

use super::*;
use bytes::Bytes;
use std::sync::Arc;

#[test]
fn test_protocol_limits() {
    assert_eq!(MAX_MESSAGES_PER_BATCH, 32);
    assert_eq!(MAX_VISIBILITY_TIMEOUT.num_days(), 7);
    assert_eq!(DEFAULT_TIME_TO_LIVE.num_days(), 7);
    assert_eq!(QUEUE_MAX_ACCESS_POLICIES, 5);
}

/// Verify the re-exported types compose into a working round trip.
#[tokio::test]
async fn test_end_to_end_round_trip() {
    let transport = Arc::new(MemoryTransport::new());
    let service = QueueServiceClient::new(transport);

    let client = service
        .create_queue(QueueName::new("smoke".to_string()).unwrap())
        .await
        .unwrap();

    client
        .enqueue_message(Bytes::from("ping"), None, None)
        .await
        .unwrap();

    let mut paged = client
        .receive_messages(None, Some(chrono::Duration::seconds(30)))
        .unwrap();
    let message = paged.next_item().await.unwrap().unwrap();
    assert_eq!(message.content, Bytes::from("ping"));

    client.delete_message(message, None).await.unwrap();

    let mut listing = service.list_queues(None, None);
    let queues = listing.collect_items().await.unwrap();
    assert_eq!(queues.len(), 1);
    assert_eq!(queues[0].name, "smoke");
}
