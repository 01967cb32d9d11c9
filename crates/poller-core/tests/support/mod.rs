#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use poller_core::adapters::{AdapterResult, SourceAdapter, SourceResolver};
use poller_core::models::{CoreError, CoreErrorKind, NewsRecord, Record};
use poller_core::scheduling::{PollScheduler, ScheduledSource, SchedulerSettings};
use poller_core::sink::{Sink, SinkResult};

#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    /// One fresh record per call.
    OneRecord,
    Empty,
    Fails,
    Panics,
    /// Blocks inside fetch for the given time, then returns one record.
    Slow(Duration),
}

pub struct FakeAdapter {
    name: String,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeAdapter {
    pub fn new(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceAdapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> AdapterResult<Vec<Record>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.behavior {
            Behavior::OneRecord => Ok(vec![record(&self.name, call)]),
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Fails => Err(CoreError::new(
                CoreErrorKind::Transport,
                "connection refused",
            )),
            Behavior::Panics => panic!("adapter {} exploded", self.name),
            Behavior::Slow(delay) => {
                std::thread::sleep(delay);
                Ok(vec![record(&self.name, call)])
            }
        }
    }
}

pub fn record(source: &str, call: usize) -> Record {
    Record::News(NewsRecord {
        title: format!("{source} item {call}"),
        description: String::new(),
        url: format!("https://example.com/{source}/{call}"),
        source: source.to_string(),
        published_at: "2024-05-01T00:00:00Z".to_string(),
        author: "test".to_string(),
    })
}

/// Resolves names against a fixed set of fakes; unknown names do not resolve.
#[derive(Default)]
pub struct FakeResolver {
    adapters: Vec<Arc<FakeAdapter>>,
}

impl FakeResolver {
    pub fn with(adapters: &[Arc<FakeAdapter>]) -> Arc<Self> {
        Arc::new(Self {
            adapters: adapters.to_vec(),
        })
    }
}

impl SourceResolver for FakeResolver {
    fn resolve(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.name() == name)
            .map(|adapter| Arc::clone(adapter) as Arc<dyn SourceAdapter>)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    appends: Mutex<Vec<(String, usize)>>,
    closes: AtomicUsize,
    fail_appends: bool,
    fail_close: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_appends: true,
            fail_close: true,
            ..Self::default()
        })
    }

    /// Number of `append` calls carrying records from `source`.
    pub fn appends_for(&self, source: &str) -> usize {
        self.appends
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == source)
            .count()
    }

    pub fn batch_sizes_for(&self, source: &str) -> Vec<usize> {
        self.appends
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == source)
            .map(|(_, size)| *size)
            .collect()
    }

    pub fn total_appends(&self) -> usize {
        self.appends.lock().unwrap().len()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Sink for RecordingSink {
    fn append(&self, records: &[Record]) -> SinkResult<()> {
        if self.fail_appends {
            return Err(CoreError::new(CoreErrorKind::StorageFailure, "disk full"));
        }
        let source = match records.first() {
            Some(Record::News(record)) => record.source.clone(),
            _ => String::new(),
        };
        self.appends.lock().unwrap().push((source, records.len()));
        Ok(())
    }

    fn close(&self) -> SinkResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(CoreError::new(CoreErrorKind::StorageFailure, "flush failed"));
        }
        Ok(())
    }
}

pub fn settings(max_concurrency: usize) -> SchedulerSettings {
    SchedulerSettings {
        max_concurrency,
        coordinator_tick: Duration::from_millis(10),
        shutdown_grace: Duration::from_secs(1),
    }
}

pub fn every(names: &[&str], interval: Duration) -> Vec<ScheduledSource> {
    names
        .iter()
        .map(|name| ScheduledSource::new(*name, interval))
        .collect()
}

pub fn scheduler(
    max_concurrency: usize,
    sources: Vec<ScheduledSource>,
    adapters: &[Arc<FakeAdapter>],
    sink: &Arc<RecordingSink>,
) -> PollScheduler {
    PollScheduler::new(
        settings(max_concurrency),
        sources,
        FakeResolver::with(adapters),
        Arc::clone(sink) as Arc<dyn Sink>,
    )
    .unwrap()
}
