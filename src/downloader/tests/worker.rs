use super::*;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_pool_processes_tasks_in_parallel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"data".to_vec())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let source = MockSource::new();
    for bvid in ["BV1a", "BV1b", "BV1c", "BV1d"] {
        source.set_playable(bvid, &format!("{}/{bvid}.flv", server.uri()));
    }
    let (downloader, _temp_dir) =
        create_test_downloader_with(source, |c| c.download.concurrent = 4).await;

    let mut ids = Vec::new();
    for bvid in ["BV1a", "BV1b", "BV1c", "BV1d"] {
        ids.push(downloader.add_task(bvid, "t").await.unwrap());
    }

    let start = std::time::Instant::now();
    downloader.start_workers().await;
    for id in &ids {
        let task = wait_for_terminal(&downloader, id, Duration::from_secs(10)).await;
        assert_eq!(task.status, TaskStatus::Completed);
    }
    // Four 300ms transfers on four workers overlap
    assert!(
        start.elapsed() < Duration::from_millis(1100),
        "took {:?}",
        start.elapsed()
    );
    downloader.shutdown().await;
}

#[tokio::test]
async fn test_pacing_delays_next_task_on_same_worker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let source = MockSource::new();
    source.set_playable("BV1first", &format!("{}/1.flv", server.uri()));
    source.set_playable("BV1second", &format!("{}/2.flv", server.uri()));
    let (downloader, _temp_dir) = create_test_downloader_with(source, |c| {
        c.download.concurrent = 1;
        c.download.pacing = Duration::from_millis(300);
    })
    .await;

    let first = downloader.add_task("BV1first", "t").await.unwrap();
    let second = downloader.add_task("BV1second", "t").await.unwrap();
    downloader.start_workers().await;

    let first_task = wait_for_terminal(&downloader, &first, Duration::from_secs(5)).await;
    let second_task = wait_for_terminal(&downloader, &second, Duration::from_secs(5)).await;
    assert_eq!(second_task.status, TaskStatus::Completed);

    let gap = second_task.updated_at - first_task.updated_at;
    assert!(
        gap >= chrono::Duration::milliseconds(300),
        "second task finished only {gap:?} after the first"
    );
    downloader.shutdown().await;
}

#[tokio::test]
async fn test_panicking_task_fails_and_worker_keeps_going() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let source = MockSource::new();
    source.set_panicking("BV1boom");
    source.set_playable("BV1after", &format!("{}/after.flv", server.uri()));
    let (downloader, _temp_dir) =
        create_test_downloader_with(source, |c| c.download.concurrent = 1).await;

    let boom = downloader.add_task("BV1boom", "t").await.unwrap();
    let after = downloader.add_task("BV1after", "t").await.unwrap();
    downloader.start_workers().await;

    let boom_task = wait_for_terminal(&downloader, &boom, Duration::from_secs(5)).await;
    assert_eq!(boom_task.status, TaskStatus::Failed);
    assert!(
        boom_task
            .error
            .as_deref()
            .is_some_and(|e| e.contains("worker fault")),
        "unexpected error: {:?}",
        boom_task.error
    );

    // The single worker survived and picked up the next task
    let after_task = wait_for_terminal(&downloader, &after, Duration::from_secs(5)).await;
    assert_eq!(after_task.status, TaskStatus::Completed);
    assert!(!downloader.registry().in_flight_bvids().await.contains("BV1boom"));
    downloader.shutdown().await;
}

#[tokio::test]
async fn test_start_workers_is_idempotent() {
    let (downloader, _temp_dir) =
        create_test_downloader_with(MockSource::new(), |c| c.download.concurrent = 3).await;

    downloader.start_workers().await;
    downloader.start_workers().await;

    assert_eq!(downloader.queue.workers.lock().await.len(), 3);
    downloader.shutdown().await;
}
