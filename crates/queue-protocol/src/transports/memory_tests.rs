//! Tests for the in-memory queue transport.

use super::*;
use crate::transport::QueueTransport;

fn queue(name: &str) -> QueueName {
    QueueName::new(name.to_string()).unwrap()
}

async fn transport_with_queue(name: &str) -> MemoryTransport {
    let transport = MemoryTransport::new();
    transport
        .create_queue(&queue(name), &HashMap::new())
        .await
        .unwrap();
    transport
}

// ============================================================================
// Queue Management Tests
// ============================================================================

mod queue_management {
    use super::*;

    /// Verify creating a queue twice reports a 409 conflict.
    #[tokio::test]
    async fn test_create_duplicate_queue_conflicts() {
        let transport = transport_with_queue("orders").await;

        let error = transport
            .create_queue(&queue("orders"), &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(error.status, 409);
        assert_eq!(error.code, "QueueAlreadyExists");
    }

    /// Verify operations against a missing queue report a 404.
    #[tokio::test]
    async fn test_missing_queue_not_found() {
        let transport = MemoryTransport::new();

        let error = transport
            .peek_messages(&queue("nowhere"), 1)
            .await
            .unwrap_err();
        assert_eq!(error.status, 404);
        assert_eq!(error.code, "QueueNotFound");

        let error = transport.delete_queue(&queue("nowhere")).await.unwrap_err();
        assert_eq!(error.status, 404);
    }

    /// Verify metadata survives a set/get round trip.
    #[tokio::test]
    async fn test_metadata_round_trip() {
        let transport = transport_with_queue("orders").await;

        let mut metadata = HashMap::new();
        metadata.insert("owner".to_string(), "billing".to_string());
        transport
            .set_queue_metadata(&queue("orders"), &metadata)
            .await
            .unwrap();

        let fetched = transport.get_queue_metadata(&queue("orders")).await.unwrap();
        assert_eq!(fetched, metadata);
    }

    /// Verify deleting a queue removes its contents.
    #[tokio::test]
    async fn test_delete_queue_removes_messages() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "m", Duration::zero(), -1)
            .await
            .unwrap();

        transport.delete_queue(&queue("orders")).await.unwrap();

        let error = transport
            .peek_messages(&queue("orders"), 1)
            .await
            .unwrap_err();
        assert_eq!(error.status, 404);
    }
}

// ============================================================================
// Lease Protocol Tests
// ============================================================================

mod lease_protocol {
    use super::*;

    /// Verify get leases a message: receipt rotates, the count increments,
    /// and the message is hidden for the visibility window.
    #[tokio::test]
    async fn test_get_rotates_receipt_and_hides_message() {
        let transport = transport_with_queue("orders").await;
        let enqueued = transport
            .put_message(&queue("orders"), "task", Duration::zero(), -1)
            .await
            .unwrap();

        let batch = transport
            .get_messages(&queue("orders"), 1, Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].dequeue_count, 1);
        // A fresh lease means a fresh receipt
        assert_ne!(batch[0].pop_receipt.as_deref(), Some(enqueued.pop_receipt.as_str()));

        // Hidden while leased: another get sees nothing
        let again = transport
            .get_messages(&queue("orders"), 1, Duration::seconds(30))
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    /// Verify peek neither leases nor mutates.
    #[tokio::test]
    async fn test_peek_is_read_only() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "task", Duration::zero(), -1)
            .await
            .unwrap();

        let first = transport.peek_messages(&queue("orders"), 1).await.unwrap();
        let second = transport.peek_messages(&queue("orders"), 1).await.unwrap();

        assert_eq!(first[0].dequeue_count, 0);
        assert_eq!(second[0].dequeue_count, 0);
        assert!(first[0].pop_receipt.is_none());
        assert!(first[0].time_next_visible.is_none());
    }

    /// Verify update rejects a stale receipt with 412 and accepts the
    /// current one.
    #[tokio::test]
    async fn test_update_requires_current_receipt() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "task", Duration::zero(), -1)
            .await
            .unwrap();

        let batch = transport
            .get_messages(&queue("orders"), 1, Duration::seconds(30))
            .await
            .unwrap();
        let id = batch[0].message_id.clone();
        let r1 = batch[0].pop_receipt.clone().unwrap();

        let updated = transport
            .update_message(&queue("orders"), &id, &r1, Duration::seconds(60), None)
            .await
            .unwrap();
        assert_ne!(updated.pop_receipt, r1);

        // The old receipt is now stale
        let error = transport
            .update_message(&queue("orders"), &id, &r1, Duration::seconds(60), None)
            .await
            .unwrap_err();
        assert_eq!(error.status, 412);
        assert_eq!(error.code, "PopReceiptMismatch");
    }

    /// Verify update can replace the body while keeping the count.
    #[tokio::test]
    async fn test_update_replaces_body_preserves_count() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "before", Duration::zero(), -1)
            .await
            .unwrap();

        let batch = transport
            .get_messages(&queue("orders"), 1, Duration::zero())
            .await
            .unwrap();
        let id = batch[0].message_id.clone();
        let receipt = batch[0].pop_receipt.clone().unwrap();

        transport
            .update_message(&queue("orders"), &id, &receipt, Duration::zero(), Some("after"))
            .await
            .unwrap();

        let peeked = transport.peek_messages(&queue("orders"), 1).await.unwrap();
        assert_eq!(peeked[0].message_text, "after");
        // Update is not a delivery
        assert_eq!(peeked[0].dequeue_count, 1);
    }

    /// Verify delete distinguishes stale receipts (412) from absent
    /// messages (404).
    #[tokio::test]
    async fn test_delete_distinguishes_stale_from_absent() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "task", Duration::zero(), -1)
            .await
            .unwrap();

        let batch = transport
            .get_messages(&queue("orders"), 1, Duration::seconds(30))
            .await
            .unwrap();
        let id = batch[0].message_id.clone();
        let receipt = batch[0].pop_receipt.clone().unwrap();

        let error = transport
            .delete_message(&queue("orders"), &id, "bogus-receipt")
            .await
            .unwrap_err();
        assert_eq!(error.status, 412);

        transport
            .delete_message(&queue("orders"), &id, &receipt)
            .await
            .unwrap();

        let error = transport
            .delete_message(&queue("orders"), &id, &receipt)
            .await
            .unwrap_err();
        assert_eq!(error.status, 404);
        assert_eq!(error.code, "MessageNotFound");
    }

    /// Verify an elapsed TTL removes the message.
    #[tokio::test]
    async fn test_ttl_expiry_purges_message() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "ephemeral", Duration::zero(), 0)
            .await
            .unwrap();

        let peeked = transport.peek_messages(&queue("orders"), 1).await.unwrap();
        assert!(peeked.is_empty());
    }

    /// Verify infinite TTL messages survive with a far-future expiration.
    #[tokio::test]
    async fn test_infinite_ttl_survives() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "durable", Duration::zero(), -1)
            .await
            .unwrap();

        let peeked = transport.peek_messages(&queue("orders"), 1).await.unwrap();
        assert_eq!(peeked.len(), 1);
        assert!(peeked[0].expiration_time > Timestamp::now());
    }

    /// Verify an enqueue-time visibility delay hides the message.
    #[tokio::test]
    async fn test_initial_visibility_delay() {
        let transport = transport_with_queue("orders").await;
        transport
            .put_message(&queue("orders"), "later", Duration::hours(1), -1)
            .await
            .unwrap();

        let peeked = transport.peek_messages(&queue("orders"), 1).await.unwrap();
        assert!(peeked.is_empty());
    }

    /// Verify clear removes every message.
    #[tokio::test]
    async fn test_clear_messages() {
        let transport = transport_with_queue("orders").await;
        for text in ["a", "b", "c"] {
            transport
                .put_message(&queue("orders"), text, Duration::zero(), -1)
                .await
                .unwrap();
        }

        transport.clear_messages(&queue("orders")).await.unwrap();

        let peeked = transport.peek_messages(&queue("orders"), 32).await.unwrap();
        assert!(peeked.is_empty());
    }
}

// ============================================================================
// Listing Tests
// ============================================================================

mod listing {
    use super::*;

    async fn transport_with_queues(names: &[&str]) -> MemoryTransport {
        let transport = MemoryTransport::new();
        for name in names {
            transport
                .create_queue(&queue(name), &HashMap::new())
                .await
                .unwrap();
        }
        transport
    }

    /// Verify listing is lexicographic and marker-paged.
    #[tokio::test]
    async fn test_marker_paging() {
        let transport = transport_with_queues(&["delta", "alpha", "echo", "bravo", "charlie"]).await;

        let first = transport.list_queues(None, None, Some(2)).await.unwrap();
        let names: Vec<&str> = first.items.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo"]);
        let marker = first.next_marker.unwrap();

        let second = transport
            .list_queues(None, Some(&marker), Some(2))
            .await
            .unwrap();
        let names: Vec<&str> = second.items.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["charlie", "delta"]);

        let third = transport
            .list_queues(None, second.next_marker.as_deref(), Some(2))
            .await
            .unwrap();
        let names: Vec<&str> = third.items.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["echo"]);
        assert!(third.next_marker.is_none());
    }

    /// Verify prefix filtering.
    #[tokio::test]
    async fn test_prefix_filter() {
        let transport = transport_with_queues(&["orders-eu", "orders-us", "payments"]).await;

        let page = transport.list_queues(Some("orders-"), None, None).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["orders-eu", "orders-us"]);
        assert!(page.next_marker.is_none());
    }

    /// Verify an empty account lists an empty terminal page.
    #[tokio::test]
    async fn test_empty_account() {
        let transport = MemoryTransport::new();

        let page = transport.list_queues(None, None, Some(10)).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_marker.is_none());
    }
}
