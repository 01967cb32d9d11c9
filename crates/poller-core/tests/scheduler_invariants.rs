mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use poller_core::adapters::SourceAdapter;
use poller_core::models::JobState;
use poller_core::scheduling::{CancellationToken, PollJob, ReadyQueue};
use poller_core::sink::Sink;

use support::{Behavior, FakeAdapter, RecordingSink, every, scheduler};

fn standalone_job(
    adapter: &Arc<FakeAdapter>,
    sink: &Arc<RecordingSink>,
    queue: &ReadyQueue,
    interval: Duration,
) -> Arc<PollJob> {
    Arc::new(PollJob::new(
        Arc::clone(adapter) as Arc<dyn SourceAdapter>,
        Arc::clone(sink) as Arc<dyn Sink>,
        queue.clone(),
        interval,
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn occupied_slots_never_exceed_max_concurrency() {
    let names = ["s1", "s2", "s3", "s4", "s5", "s6"];
    let adapters: Vec<_> = names
        .iter()
        .map(|name| FakeAdapter::new(name, Behavior::Slow(Duration::from_millis(20))))
        .collect();
    let sink = RecordingSink::new();
    let scheduler = scheduler(2, every(&names, Duration::from_millis(30)), &adapters, &sink);
    scheduler.start().unwrap();

    let deadline = Instant::now() + Duration::from_millis(600);
    while Instant::now() < deadline {
        let snapshot = scheduler.snapshot();
        let in_flight = snapshot
            .jobs
            .iter()
            .filter(|job| job.state.is_in_flight())
            .count();
        assert!(snapshot.occupied <= 2, "occupied {}", snapshot.occupied);
        assert!(in_flight <= 2, "in flight {in_flight}");
        tokio::time::sleep(Duration::from_millis(3)).await;
    }

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.peak_occupancy, 2);
    assert!(adapters.iter().all(|adapter| adapter.calls() >= 1));
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_slot_keeps_other_sources_waiting() {
    let names = ["a", "b", "c"];
    let adapters: Vec<_> = names
        .iter()
        .map(|name| FakeAdapter::new(name, Behavior::Empty))
        .collect();
    let sink = RecordingSink::new();
    let scheduler = scheduler(1, every(&names, Duration::from_millis(200)), &adapters, &sink);
    scheduler.start().unwrap();

    let mut saw_two_waiting = false;
    let deadline = Instant::now() + Duration::from_millis(700);
    while Instant::now() < deadline {
        let snapshot = scheduler.snapshot();
        let in_flight = snapshot
            .jobs
            .iter()
            .filter(|job| job.state.is_in_flight())
            .count();
        assert!(in_flight <= 1, "in flight {in_flight}");
        saw_two_waiting |= snapshot.ready.len() == 2;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let total: usize = adapters.iter().map(|adapter| adapter.calls()).sum();
    assert!((3..=4).contains(&total), "total fetches {total}");
    assert!(adapters.iter().all(|adapter| adapter.calls() >= 1));
    assert!(saw_two_waiting);
    assert_eq!(scheduler.snapshot().peak_occupancy, 1);
    assert_eq!(sink.total_appends(), 0);
    scheduler.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_outcome_requeues_once_per_activation() {
    let adapters = vec![
        FakeAdapter::new("records", Behavior::OneRecord),
        FakeAdapter::new("empty", Behavior::Empty),
        FakeAdapter::new("failing", Behavior::Fails),
        FakeAdapter::new("panicking", Behavior::Panics),
    ];
    let sink = RecordingSink::new();
    let scheduler = scheduler(
        4,
        every(
            &["records", "empty", "failing", "panicking"],
            Duration::from_millis(50),
        ),
        &adapters,
        &sink,
    );
    scheduler.start().unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = scheduler.snapshot();
    scheduler.shutdown().await;

    for adapter in &adapters {
        assert!(adapter.calls() >= 3, "{} ran {}", adapter.name(), adapter.calls());
    }
    for job in &snapshot.jobs {
        assert!(
            job.requeues + 1 >= job.activations && job.requeues <= job.activations,
            "{}: {} activations, {} requeues",
            job.source,
            job.activations,
            job.requeues
        );
    }

    for source in ["failing", "panicking"] {
        let job = snapshot.jobs.iter().find(|job| job.source == source).unwrap();
        assert!(job.failures >= 2, "{source} failures {}", job.failures);
        assert!(job.failures + 1 >= job.activations);
    }
    assert!(sink.appends_for("records") >= 3);
    assert!(sink.batch_sizes_for("records").iter().all(|size| *size == 1));
}

#[tokio::test]
async fn completed_activation_requeues_exactly_once() {
    let adapter = FakeAdapter::new("news", Behavior::OneRecord);
    let sink = RecordingSink::new();
    let queue = ReadyQueue::new();
    let job = standalone_job(&adapter, &sink, &queue, Duration::from_millis(10));

    Arc::clone(&job).activate(CancellationToken::new()).await;

    assert_eq!(queue.queued_sources(), vec!["news"]);
    assert_eq!(job.state(), JobState::Queued);
    let snapshot = job.snapshot();
    assert_eq!(snapshot.activations, 1);
    assert_eq!(snapshot.requeues, 1);
    assert_eq!(snapshot.records_forwarded, 1);
    queue.clear();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_during_fetch_finishes_cycle_without_requeue() {
    let adapter = FakeAdapter::new("slow", Behavior::Slow(Duration::from_millis(150)));
    let sink = RecordingSink::new();
    let queue = ReadyQueue::new();
    let job = standalone_job(&adapter, &sink, &queue, Duration::from_millis(10));

    let activation = tokio::spawn(Arc::clone(&job).activate(CancellationToken::new()));
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(job.state(), JobState::Running);
    job.stop();
    job.stop();
    activation.await.unwrap();

    assert!(queue.is_empty());
    assert_eq!(job.state(), JobState::Stopped);
    assert_eq!(adapter.calls(), 1);
    assert_eq!(sink.appends_for("slow"), 1);
    assert_eq!(job.snapshot().requeues, 0);
}

#[tokio::test]
async fn job_stopped_while_queued_skips_fetch() {
    let adapter = FakeAdapter::new("news", Behavior::OneRecord);
    let sink = RecordingSink::new();
    let queue = ReadyQueue::new();
    let job = standalone_job(&adapter, &sink, &queue, Duration::from_millis(10));

    job.stop();
    Arc::clone(&job).activate(CancellationToken::new()).await;

    assert_eq!(adapter.calls(), 0);
    assert_eq!(sink.total_appends(), 0);
    assert!(queue.is_empty());
    assert_eq!(job.state(), JobState::Stopped);
    assert_eq!(job.snapshot().activations, 0);
}

#[tokio::test]
async fn stop_during_sleep_prevents_requeue() {
    let adapter = FakeAdapter::new("quiet", Behavior::Empty);
    let sink = RecordingSink::new();
    let queue = ReadyQueue::new();
    let job = standalone_job(&adapter, &sink, &queue, Duration::from_millis(150));

    let activation = tokio::spawn(Arc::clone(&job).activate(CancellationToken::new()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(job.state(), JobState::Sleeping);
    job.stop();
    activation.await.unwrap();

    assert!(queue.is_empty());
    assert_eq!(job.state(), JobState::Stopped);
    assert!(job.is_stopped());
}

#[tokio::test]
async fn interrupt_cuts_sleep_short() {
    let adapter = FakeAdapter::new("quiet", Behavior::Empty);
    let sink = RecordingSink::new();
    let queue = ReadyQueue::new();
    let job = standalone_job(&adapter, &sink, &queue, Duration::from_secs(30));
    let interrupt = CancellationToken::new();

    let activation = tokio::spawn(Arc::clone(&job).activate(interrupt.clone()));
    tokio::time::sleep(Duration::from_millis(30)).await;
    let interrupted_at = Instant::now();
    interrupt.cancel();
    tokio::time::timeout(Duration::from_secs(1), activation)
        .await
        .expect("sleep should be interrupted")
        .unwrap();

    assert!(interrupted_at.elapsed() < Duration::from_millis(500));
    assert!(queue.is_empty());
    assert_eq!(job.state(), JobState::Stopped);
}
