use super::*;

#[tokio::test]
async fn test_add_task_registers_queued_task() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let id = downloader.add_task("BV1aa", "first video").await.unwrap();

    let task = downloader.get_task(&id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Queued);
    assert_eq!(task.bvid, "BV1aa");
    assert_eq!(task.title, "first video");
    assert_eq!(task.progress, 0.0);
    assert!(id.as_str().starts_with("task_BV1aa_"));
}

#[tokio::test]
async fn test_add_task_copies_cover_from_ledger() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    downloader
        .db
        .insert_or_replace_video(&ledger_video("BV1aa", false))
        .await
        .unwrap();

    let id = downloader.add_task("BV1aa", "t").await.unwrap();

    let task = downloader.get_task(&id).await.unwrap();
    assert_eq!(task.cover, "/downloads/covers/BV1aa.jpg");
}

#[tokio::test]
async fn test_unknown_video_has_empty_cover() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let id = downloader.add_task("BV1new", "t").await.unwrap();
    assert_eq!(downloader.get_task(&id).await.unwrap().cover, "");
}

#[tokio::test]
async fn test_queue_full_rejects_and_leaves_no_task() {
    let (downloader, _temp_dir) =
        create_test_downloader_with(MockSource::new(), |c| c.download.queue_capacity = 2).await;

    downloader.add_task("BV1a", "a").await.unwrap();
    downloader.add_task("BV1b", "b").await.unwrap();

    let err = downloader.add_task("BV1c", "c").await.unwrap_err();
    assert!(matches!(
        err,
        crate::Error::Download(DownloadError::QueueFull { capacity: 2 })
    ));

    let tasks = downloader.list_tasks().await;
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.bvid != "BV1c"));
    // The rejected video can be submitted again once space frees up
    assert!(!downloader.registry().in_flight_bvids().await.contains("BV1c"));
}

#[tokio::test]
async fn test_duplicate_in_flight_submission_is_rejected() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let first = downloader.add_task("BV1aa", "t").await.unwrap();
    let err = downloader.add_task("BV1aa", "t").await.unwrap_err();

    match err {
        crate::Error::Download(DownloadError::AlreadyScheduled { task_id, .. }) => {
            assert_eq!(task_id, first)
        }
        other => panic!("expected AlreadyScheduled, got {other:?}"),
    }
    assert_eq!(downloader.list_tasks().await.len(), 1);
}

#[tokio::test]
async fn test_list_active_tasks_skips_terminal() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let done = downloader.add_task("BV1done", "t").await.unwrap();
    downloader.add_task("BV1wait", "t").await.unwrap();
    downloader
        .registry
        .update_status(&done, TaskStatus::Downloading, 0.0)
        .await
        .unwrap();
    downloader
        .registry
        .update_status(&done, TaskStatus::Completed, 100.0)
        .await
        .unwrap();

    let active = downloader.list_active_tasks().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].bvid, "BV1wait");
    assert_eq!(downloader.list_tasks().await.len(), 2);
}

#[tokio::test]
async fn test_active_task_by_bvid_requires_downloading() {
    let (downloader, _temp_dir) = create_test_downloader().await;
    let id = downloader.add_task("BV1aa", "t").await.unwrap();

    assert!(downloader.active_task_by_bvid("BV1aa").await.is_none());

    downloader
        .registry
        .update_status(&id, TaskStatus::Downloading, 0.0)
        .await
        .unwrap();
    assert_eq!(
        downloader.active_task_by_bvid("BV1aa").await.unwrap().id,
        id
    );
    assert!(downloader.active_task_by_bvid("BV1other").await.is_none());
}
