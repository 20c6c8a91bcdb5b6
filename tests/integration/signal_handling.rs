use std::time::Duration;

use research_data_downloader::downloader::schedule::wait_for_next_run;
use research_data_downloader::downloader::Schedule;
use research_data_downloader::fetcher::retry::{RetryGate, RetryPolicy};
use research_data_downloader::fetcher::FetcherError;
use research_data_downloader::shutdown::ShutdownCoordinator;

#[tokio::test]
async fn shutdown_notifies_waiters() {
    let shutdown = ShutdownCoordinator::shared();
    let waiter = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            handle.wait_for_shutdown().await;
            true
        })
    };

    // Give the task time to start waiting
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request_shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn shutdown_requested_before_wait_does_not_block() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), shutdown.wait_for_shutdown()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn shutdown_interrupts_unbounded_retry() {
    let shutdown = ShutdownCoordinator::shared();
    let gate = RetryGate::new(RetryPolicy::unbounded().with_interval(Duration::from_secs(60)))
        .with_shutdown(Some(shutdown.clone()));

    let trigger = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.request_shutdown();
        })
    };

    let result: Result<(), FetcherError> = tokio::time::timeout(
        Duration::from_secs(5),
        gate.run("page 1", || async { Err(FetcherError::Transport("down".into())) }),
    )
    .await
    .expect("retry wait was not interrupted");

    assert!(matches!(result, Err(FetcherError::Shutdown)));
    trigger.await.unwrap();
}

#[tokio::test]
async fn shutdown_interrupts_schedule_wait() {
    let shutdown = ShutdownCoordinator::shared();
    let trigger = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.request_shutdown();
        })
    };

    // A daily wait is hours long unless interrupted
    let completed = tokio::time::timeout(
        Duration::from_secs(5),
        wait_for_next_run(Schedule::Daily, Some(&shutdown)),
    )
    .await
    .expect("schedule wait was not interrupted");

    assert!(!completed);
    trigger.await.unwrap();
}
