use super::*;

#[tokio::test]
async fn test_enqueue_delivers_job() {
    let (queue, mut receiver) = ChannelWebhookQueue::new(4);

    let outcome = queue.enqueue(WebhookJob::for_event("evt-1")).await.unwrap();
    assert_eq!(outcome, EnqueueOutcome::Enqueued);

    let job = receiver.recv().await.unwrap();
    assert_eq!(job.job_id, "webhook:evt-1");
}

#[tokio::test]
async fn test_same_job_id_is_not_queued_twice() {
    let (queue, mut receiver) = ChannelWebhookQueue::new(4);

    queue.enqueue(WebhookJob::for_event("evt-1")).await.unwrap();
    let second = queue.enqueue(WebhookJob::for_event("evt-1")).await.unwrap();
    assert_eq!(second, EnqueueOutcome::AlreadyQueued);
    assert_eq!(queue.in_flight_count().await, 1);

    receiver.recv().await.unwrap();
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_complete_releases_job_id() {
    let (queue, _receiver) = ChannelWebhookQueue::new(4);

    queue.enqueue(WebhookJob::for_event("evt-1")).await.unwrap();
    queue.complete("webhook:evt-1").await;
    assert_eq!(queue.in_flight_count().await, 0);

    let again = queue.enqueue(WebhookJob::for_event("evt-1")).await.unwrap();
    assert_eq!(again, EnqueueOutcome::Enqueued);
}

#[tokio::test]
async fn test_full_queue_reports_error_and_forgets_job() {
    let (queue, _receiver) = ChannelWebhookQueue::new(1);

    queue.enqueue(WebhookJob::for_event("evt-1")).await.unwrap();
    let result = queue.enqueue(WebhookJob::for_event("evt-2")).await;
    assert!(matches!(result, Err(QueueError::Full)));
    assert_eq!(queue.in_flight_count().await, 1);
}

#[tokio::test]
async fn test_dropped_receiver_makes_queue_unavailable() {
    let (queue, receiver) = ChannelWebhookQueue::new(1);
    assert!(queue.is_available());
    drop(receiver);
    assert!(!queue.is_available());
    assert!(matches!(
        queue.enqueue(WebhookJob::for_event("evt-1")).await,
        Err(QueueError::Closed)
    ));
}
