use event_broadcaster::EventBroadcaster;

#[tokio::test]
async fn broadcast_delivers_to_all_subscribers_in_order() {
    let eb: EventBroadcaster<u32> = EventBroadcaster::new();
    let (_id_a, mut rx_a) = eb.subscribe();
    let (_id_b, mut rx_b) = eb.subscribe();

    eb.broadcast(1);
    eb.broadcast(2);

    assert_eq!(rx_a.recv().await, Some(1));
    assert_eq!(rx_a.recv().await, Some(2));
    assert_eq!(rx_b.recv().await, Some(1));
    assert_eq!(rx_b.recv().await, Some(2));
}

#[tokio::test]
async fn full_buffer_drops_rather_than_blocks() {
    let eb: EventBroadcaster<u32> = EventBroadcaster::new();
    let (_id, mut rx) = eb.subscribe();

    // Fill the buffer (depth 10) and one extra that must be dropped, not
    // block this task forever.
    for i in 0..11 {
        eb.broadcast(i);
    }

    let mut received = Vec::new();
    while let Ok(v) = rx.try_recv() {
        received.push(v);
    }
    assert_eq!(received.len(), 10);
    assert_eq!(received[0], 0);
}

#[tokio::test]
async fn unsubscribe_closes_the_channel() {
    let eb: EventBroadcaster<u32> = EventBroadcaster::new();
    let (id, mut rx) = eb.subscribe();
    eb.unsubscribe(id);
    assert_eq!(rx.recv().await, None);
    assert_eq!(eb.subscriber_count(), 0);
}

#[tokio::test]
async fn trigger_is_level_triggered_and_coalesces() {
    let eb: EventBroadcaster<u32> = EventBroadcaster::new();
    let mut rx = eb.triggered();
    rx.borrow_and_update();

    eb.trigger();
    eb.trigger();
    eb.trigger();

    // Multiple triggers before a single observation collapse to one change.
    rx.changed().await.unwrap();
    rx.borrow_and_update();
    assert!(tokio::time::timeout(std::time::Duration::from_millis(50), rx.changed())
        .await
        .is_err());
}
