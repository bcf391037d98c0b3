use report_core::{ReportPeriod, ReportRequest, UserId};
use report_queue::{partition_for, SqliteQueue};
use sqlx::sqlite::SqlitePoolOptions;

async fn queue(partitions: u32) -> SqliteQueue {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    SqliteQueue::with_pool(pool, partitions).await.unwrap()
}

#[tokio::test]
async fn unacked_messages_are_redelivered() {
    let queue = queue(2).await;
    let producer = queue.producer();
    producer
        .send(&ReportRequest::new(UserId(1), ReportPeriod::Week))
        .await
        .unwrap();

    let consumer = queue.consumer("reporter", 0, 1).unwrap();
    let first = consumer.claim(10).await.unwrap();
    let again = consumer.claim(10).await.unwrap();
    assert_eq!(first, again);

    consumer.ack(&first[0]).await.unwrap();
    assert!(consumer.claim(10).await.unwrap().is_empty());
    assert_eq!(consumer.lag().await.unwrap(), 0);
}

#[tokio::test]
async fn partition_order_is_preserved() {
    let queue = queue(4).await;
    let producer = queue.producer();
    for period in [ReportPeriod::Week, ReportPeriod::Month, ReportPeriod::Year] {
        producer
            .send(&ReportRequest::new(UserId(6), period))
            .await
            .unwrap();
    }

    let consumer = queue.consumer("reporter", 0, 1).unwrap();
    let claimed = consumer.claim(10).await.unwrap();
    let periods: Vec<_> = claimed
        .iter()
        .map(|m| ReportRequest::decode(&m.payload).unwrap().period)
        .collect();

    assert_eq!(
        periods,
        [ReportPeriod::Week, ReportPeriod::Month, ReportPeriod::Year]
    );
    assert!(claimed
        .iter()
        .all(|m| m.partition == partition_for(UserId(6), 4)));
}

#[tokio::test]
async fn groups_consume_independently() {
    let queue = queue(1).await;
    queue
        .producer()
        .send(&ReportRequest::new(UserId(3), ReportPeriod::AllTime))
        .await
        .unwrap();

    let reporters = queue.consumer("reporter", 0, 1).unwrap();
    let auditors = queue.consumer("audit", 0, 1).unwrap();

    let claimed = reporters.claim(1).await.unwrap();
    reporters.ack(&claimed[0]).await.unwrap();

    assert!(reporters.claim(1).await.unwrap().is_empty());
    assert_eq!(auditors.claim(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn members_of_a_group_do_not_overlap() {
    let queue = queue(4).await;
    let producer = queue.producer();
    for id in 0..8 {
        producer
            .send(&ReportRequest::new(UserId(id), ReportPeriod::Month))
            .await
            .unwrap();
    }

    let a = queue.consumer("reporter", 0, 2).unwrap();
    let b = queue.consumer("reporter", 1, 2).unwrap();
    let from_a = a.claim(100).await.unwrap();
    let from_b = b.claim(100).await.unwrap();

    assert_eq!(from_a.len() + from_b.len(), 8);
    assert!(from_a
        .iter()
        .all(|m| from_b.iter().all(|n| n.seq != m.seq)));
}

#[tokio::test]
async fn offsets_survive_a_new_consumer() {
    let queue = queue(1).await;
    let producer = queue.producer();
    for id in 0..3 {
        producer
            .send(&ReportRequest::new(UserId(id), ReportPeriod::Year))
            .await
            .unwrap();
    }

    let consumer = queue.consumer("reporter", 0, 1).unwrap();
    let claimed = consumer.claim(2).await.unwrap();
    for message in &claimed {
        consumer.ack(message).await.unwrap();
    }
    drop(consumer);

    // A restarted consumer continues after the committed offset
    let restarted = queue.consumer("reporter", 0, 1).unwrap();
    let rest = restarted.claim(10).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(ReportRequest::decode(&rest[0].payload).unwrap().user_id, UserId(2));

    // Acking an older message never moves the offset back
    restarted.ack(&claimed[0]).await.unwrap();
    assert_eq!(restarted.committed(0).await.unwrap(), claimed[1].seq);
}

#[tokio::test]
async fn busy_partition_does_not_starve_the_others() {
    let queue = queue(2).await;
    let producer = queue.producer();
    let waiting = UserId(1);
    assert_eq!(partition_for(waiting, 2), 1);
    producer
        .send(&ReportRequest::new(waiting, ReportPeriod::Week))
        .await
        .unwrap();

    let consumer = queue.consumer("reporter", 0, 1).unwrap();
    let mut served_after = None;
    for cycle in 0..4 {
        // Partition 0 always has a full batch waiting
        for _ in 0..4 {
            producer.send_raw(0, b"busy").await.unwrap();
        }
        let claimed = consumer.claim(4).await.unwrap();
        for message in &claimed {
            consumer.ack(message).await.unwrap();
        }
        if claimed.iter().any(|m| m.partition == 1) {
            served_after = Some(cycle);
            break;
        }
    }

    assert!(served_after.is_some_and(|cycle| cycle < 2));
}
