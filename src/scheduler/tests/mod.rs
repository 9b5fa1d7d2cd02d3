use super::*;
use crate::config::ExecutorConfig;
use crate::downloader::test_helpers::{ScriptedExecutor, locator_for, video};
use crate::types::{Event, QueueSnapshot, TaskStatus, VideoId};
use std::time::Duration;
use tokio::sync::broadcast;

struct Harness {
    store: Arc<QueueStore>,
    executor: Arc<ScriptedExecutor>,
    cancel: CancellationToken,
    events: broadcast::Receiver<Event>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn start(budget: usize, trust: bool, completion_deadline: Duration) -> Harness {
    let (event_tx, events) = broadcast::channel(1000);
    let store = Arc::new(QueueStore::new(budget, event_tx));
    let executor = ScriptedExecutor::new();
    let config = ExecutorConfig {
        request_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(5),
        completion_deadline,
        ..ExecutorConfig::default()
    };
    let client = ExecutorClient::new(executor.clone(), &config);
    let cancel = CancellationToken::new();
    Scheduler::new(store.clone(), client, trust, cancel.clone()).spawn();

    Harness {
        store,
        executor,
        cancel,
        events,
    }
}

fn harness(budget: usize) -> Harness {
    start(budget, false, Duration::from_secs(30))
}

impl Harness {
    fn enqueue(&self, ids: &[&str]) {
        self.store
            .dispatch(Intent::Enqueue(ids.iter().map(|id| video(id)).collect()));
    }

    async fn wait_until<F>(&self, predicate: F) -> Arc<QueueSnapshot>
    where
        F: Fn(&QueueSnapshot) -> bool,
    {
        let mut rx = self.store.subscribe();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                if predicate(&snapshot) {
                    return snapshot;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("queue never reached the expected state")
    }

    async fn wait_for_status(&self, id: &str, status: TaskStatus) -> Arc<QueueSnapshot> {
        let id = VideoId::from(id);
        self.wait_until(|q| q.get(&id).is_some_and(|t| t.status == status))
            .await
    }

    fn task(&self, id: &str) -> Option<crate::types::Task> {
        self.store.snapshot().get(&VideoId::from(id)).cloned()
    }

    fn drain_events(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

#[tokio::test]
async fn acknowledged_task_waits_for_completion_before_ready() {
    let h = harness(2);
    h.enqueue(&["a"]);

    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::InProgress).await;
    let task = h.task("a").unwrap();
    assert_eq!(task.download_locator, None, "locator is only exposed once ready");

    h.executor.progress("a", 40);
    h.wait_until(|q| q.get(&VideoId::from("a")).is_some_and(|t| t.progress == 40))
        .await;
    assert_eq!(h.store.overall_progress(), 40.0);

    h.executor.complete("a");
    h.wait_for_status("a", TaskStatus::Ready).await;
    let task = h.task("a").unwrap();
    assert_eq!(task.download_locator, Some(locator_for("a")));
    assert_eq!(task.effective_progress(), 100);
    assert_eq!(h.store.overall_progress(), 100.0);
}

#[tokio::test]
async fn trusted_acknowledgement_is_ready_immediately() {
    let h = start(2, true, Duration::from_secs(30));
    h.enqueue(&["a"]);

    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::Ready).await;
    assert_eq!(h.task("a").unwrap().download_locator, Some(locator_for("a")));
}

#[tokio::test]
async fn rejection_message_is_kept_verbatim_and_retry_starts_a_new_attempt() {
    let h = harness(1);
    h.enqueue(&["a"]);

    h.executor.reject("a", "yt-dlp exited with code 1").await;
    h.wait_for_status("a", TaskStatus::Error).await;
    let task = h.task("a").unwrap();
    assert_eq!(task.error_message.as_deref(), Some("yt-dlp exited with code 1"));
    assert_eq!(task.attempt, 1);

    h.store.dispatch(Intent::Retry(VideoId::from("a")));
    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::InProgress).await;
    let task = h.task("a").unwrap();
    assert_eq!(task.attempt, 2);
    assert_eq!(task.error_message, None);
    assert_eq!(h.executor.started().len(), 2);
}

#[tokio::test]
async fn failure_after_acceptance_marks_error() {
    let h = harness(1);
    h.enqueue(&["a", "b"]);

    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::InProgress).await;
    h.executor.fail("a", "yt-dlp exited with code 1");
    h.wait_for_status("a", TaskStatus::Error).await;
    assert_eq!(
        h.task("a").unwrap().error_message.as_deref(),
        Some("yt-dlp exited with code 1")
    );

    // The freed slot goes to the next queued task
    h.executor.wait_for_start("b").await;
}

#[tokio::test]
async fn admission_is_fifo_and_never_exceeds_budget() {
    let h = harness(2);
    h.enqueue(&["a", "b", "c", "d"]);

    h.executor.wait_for_start("a").await;
    h.executor.wait_for_start("b").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.executor.blocked(), 2);
    assert_eq!(h.store.snapshot().in_flight(), 2);

    h.executor.accept("a").await;
    h.executor.complete("a");
    h.executor.wait_for_start("c").await;
    assert!(h.store.snapshot().in_flight() <= 2);

    let order: Vec<String> = h
        .executor
        .started()
        .iter()
        .map(|r| r.video_id.to_string())
        .collect();
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn lowering_budget_keeps_in_flight_tasks() {
    let h = harness(2);
    h.enqueue(&["a", "b", "c"]);
    h.executor.wait_for_start("a").await;
    h.executor.wait_for_start("b").await;

    h.store.dispatch(Intent::SetBudget(1));
    assert_eq!(h.store.snapshot().in_flight(), 2);

    h.executor.accept("a").await;
    h.executor.complete("a");
    h.wait_for_status("a", TaskStatus::Ready).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.task("c").unwrap().status, TaskStatus::Queued, "still over budget");

    h.executor.reject("b", "boom").await;
    h.executor.wait_for_start("c").await;
}

#[tokio::test]
async fn removed_task_ignores_late_results() {
    let mut h = harness(1);
    h.enqueue(&["a", "b"]);

    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::InProgress).await;
    h.store.dispatch(Intent::Remove(VideoId::from("a")));

    // The slot is released right away
    h.executor.wait_for_start("b").await;

    h.executor.complete("a");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.task("a").is_none());
    assert!(
        !h.drain_events()
            .iter()
            .any(|e| matches!(e, Event::Ready { id, .. } if id.as_str() == "a"))
    );
}

#[tokio::test]
async fn removal_while_starting_drops_the_acknowledgement() {
    let h = harness(1);
    h.enqueue(&["a"]);
    h.executor.wait_for_start("a").await;

    h.store.dispatch(Intent::Remove(VideoId::from("a")));
    h.executor.accept("a").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(h.store.snapshot().tasks.is_empty());
}

#[tokio::test]
async fn paused_then_resumed_task_gets_a_fresh_attempt() {
    let h = harness(1);
    h.enqueue(&["a"]);

    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::InProgress).await;
    h.executor.progress("a", 30);
    h.wait_until(|q| q.get(&VideoId::from("a")).is_some_and(|t| t.progress == 30))
        .await;

    h.store.dispatch(Intent::Pause(VideoId::from("a")));
    let task = h.task("a").unwrap();
    assert_eq!(task.status, TaskStatus::Paused);
    assert_eq!(task.progress, 30, "pause keeps progress");

    h.store.dispatch(Intent::Resume(VideoId::from("a")));
    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::InProgress).await;
    assert_eq!(h.task("a").unwrap().attempt, 2);

    h.executor.complete("a");
    h.wait_for_status("a", TaskStatus::Ready).await;
}

#[tokio::test]
async fn completion_deadline_fails_the_task() {
    let h = start(1, false, Duration::from_millis(50));
    h.enqueue(&["a"]);

    h.executor.accept("a").await;
    h.wait_for_status("a", TaskStatus::Error).await;
    assert!(
        h.task("a")
            .unwrap()
            .error_message
            .unwrap()
            .starts_with("download did not complete within")
    );
}

#[tokio::test]
async fn cancelled_scheduler_stops_admitting() {
    let h = harness(1);
    h.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;

    h.enqueue(&["a"]);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.task("a").unwrap().status, TaskStatus::Queued);
    assert!(h.executor.started().is_empty());
}

#[tokio::test]
async fn cancellation_stops_a_job_waiting_on_start() {
    let h = harness(1);
    h.enqueue(&["a", "b"]);
    h.executor.wait_for_start("a").await;

    h.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(h.task("a").unwrap().status, TaskStatus::Starting);
    assert_eq!(h.task("b").unwrap().status, TaskStatus::Queued);
    assert_eq!(h.executor.started().len(), 1);
}
