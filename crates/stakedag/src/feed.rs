//! Cancellable polling of a DAG view.
//!
//! A node exposes its current DAG as an opaque rendering (text, DOT, JSON;
//! the format is not interpreted here). The poller samples it at a fixed
//! interval and forwards each sample that differs from the previous one.
//!
//! Polling stops when:
//! - two consecutive samples are byte-equal (the DAG is stable)
//! - the handle is cancelled or dropped
//! - `max_polls` samples have been taken
//! - the receiving side of the update channel is closed

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{BoxError, ClientError, Result};

/// Source of DAG snapshots.
#[async_trait]
pub trait DagFeed: Send + Sync {
    /// Fetch the current rendering of the DAG.
    async fn sample(&self) -> std::result::Result<Bytes, BoxError>;
}

/// Why a poller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStop {
    /// Two consecutive samples were equal.
    Stable,
    Cancelled,
    /// The poll budget ran out.
    MaxPolls,
    /// Nobody is listening for updates.
    ReceiverClosed,
}

/// Handle to a spawned poller.
pub struct FeedHandle {
    /// Changed samples, in order.
    pub updates: mpsc::Receiver<Bytes>,
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<FeedStop>>,
}

impl FeedHandle {
    /// Ask the poller to stop. Interrupts a sample or send in progress.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Drop the update channel and wait for the poller to finish.
    pub async fn join(self) -> Result<FeedStop> {
        let FeedHandle {
            updates,
            cancel,
            task,
        } = self;
        // A poller blocked on a full channel sees it closed. The cancel
        // sender stays alive so the poller does not read its drop as a cancel.
        drop(updates);
        let stop = task.await.map_err(|e| ClientError::Feed(Box::new(e)))?;
        drop(cancel);
        stop
    }
}

/// Spawn a poller on the current tokio runtime.
pub fn spawn_feed<F>(feed: Arc<F>, config: &ClientConfig) -> FeedHandle
where
    F: DagFeed + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interval = config.poll_interval;
    let max_polls = config.max_polls;

    let task = tokio::spawn(async move {
        run_feed(feed.as_ref(), interval, max_polls, tx, cancel_rx).await
    });

    FeedHandle {
        updates: rx,
        cancel: cancel_tx,
        task,
    }
}

/// The polling loop. Runs on the caller's task.
///
/// Each poll starts `interval` after the previous sample returned, however
/// long that sample took. Cancellation interrupts a pending sample or send.
pub async fn run_feed<F>(
    feed: &F,
    interval: Duration,
    max_polls: Option<u64>,
    updates: mpsc::Sender<Bytes>,
    mut cancel: watch::Receiver<bool>,
) -> Result<FeedStop>
where
    F: DagFeed + ?Sized,
{
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Bytes> = None;
    let mut polls: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!(polls, "feed cancelled");
                return Ok(FeedStop::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        if max_polls.is_some_and(|max| polls >= max) {
            debug!(polls, "feed poll budget exhausted");
            return Ok(FeedStop::MaxPolls);
        }
        polls += 1;

        let sample = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!(polls, "feed cancelled during sample");
                return Ok(FeedStop::Cancelled);
            }
            sample = feed.sample() => sample.map_err(ClientError::Feed)?,
        };
        ticker.reset();

        if last.as_ref() == Some(&sample) {
            debug!(polls, "feed stable");
            return Ok(FeedStop::Stable);
        }

        debug!(polls, len = sample.len(), "feed changed");
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                debug!(polls, "feed cancelled during send");
                return Ok(FeedStop::Cancelled);
            }
            sent = updates.send(sample.clone()) => {
                if sent.is_err() {
                    return Ok(FeedStop::ReceiverClosed);
                }
            }
        }
        last = Some(sample);
    }
}

/// Resolves once cancellation is requested or the handle is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plays back a script, repeating its last entry forever.
    struct Scripted {
        frames: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(frames: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                frames,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DagFeed for Scripted {
        async fn sample(&self) -> std::result::Result<Bytes, BoxError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            let frame = self.frames[i.min(self.frames.len() - 1)];
            Ok(Bytes::from_static(frame.as_bytes()))
        }
    }

    /// Never repeats.
    struct Counter(AtomicUsize);

    #[async_trait]
    impl DagFeed for Counter {
        async fn sample(&self) -> std::result::Result<Bytes, BoxError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(n.to_string()))
        }
    }

    /// A node that never answers.
    struct Silent;

    #[async_trait]
    impl DagFeed for Silent {
        async fn sample(&self) -> std::result::Result<Bytes, BoxError> {
            std::future::pending().await
        }
    }

    /// First sample is slow; records when each sample starts.
    struct SlowStart {
        delay: Duration,
        starts: std::sync::Mutex<Vec<tokio::time::Instant>>,
    }

    #[async_trait]
    impl DagFeed for SlowStart {
        async fn sample(&self) -> std::result::Result<Bytes, BoxError> {
            let n = {
                let mut starts = self.starts.lock().unwrap();
                starts.push(tokio::time::Instant::now());
                starts.len()
            };
            if n == 1 {
                tokio::time::sleep(self.delay).await;
            }
            Ok(Bytes::from(n.to_string()))
        }
    }

    struct Broken;

    #[async_trait]
    impl DagFeed for Broken {
        async fn sample(&self) -> std::result::Result<Bytes, BoxError> {
            Err("node unreachable".into())
        }
    }

    fn fast() -> ClientConfig {
        ClientConfig {
            poll_interval: Duration::from_millis(5),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_stops_when_stable() {
        let feed = Scripted::new(vec!["a", "b", "b"]);
        let mut handle = spawn_feed(feed, &fast());

        assert_eq!(handle.updates.recv().await.unwrap(), Bytes::from_static(b"a"));
        assert_eq!(handle.updates.recv().await.unwrap(), Bytes::from_static(b"b"));
        assert_eq!(handle.join().await.unwrap(), FeedStop::Stable);
    }

    #[tokio::test]
    async fn test_cancel() {
        let feed = Arc::new(Counter(AtomicUsize::new(0)));
        let mut handle = spawn_feed(feed, &fast());

        handle.updates.recv().await.unwrap();
        handle.cancel();
        assert_eq!(handle.join().await.unwrap(), FeedStop::Cancelled);
    }

    #[tokio::test]
    async fn test_max_polls() {
        let feed = Arc::new(Counter(AtomicUsize::new(0)));
        let config = ClientConfig {
            max_polls: Some(3),
            ..fast()
        };
        let mut handle = spawn_feed(feed, &config);

        let mut seen = Vec::new();
        while let Some(sample) = handle.updates.recv().await {
            seen.push(sample);
            if seen.len() == 3 {
                break;
            }
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(handle.join().await.unwrap(), FeedStop::MaxPolls);
    }

    #[tokio::test]
    async fn test_feed_error_propagates() {
        let handle = spawn_feed(Arc::new(Broken), &fast());
        let err = handle.join().await.unwrap_err();
        assert!(matches!(err, ClientError::Feed(_)));
    }

    #[tokio::test]
    async fn test_receiver_closed() {
        let feed = Arc::new(Counter(AtomicUsize::new(0)));
        let (tx, rx) = mpsc::channel(1);
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        drop(rx);

        let stop = run_feed(feed.as_ref(), Duration::from_millis(1), None, tx, cancel_rx)
            .await
            .unwrap();
        assert_eq!(stop, FeedStop::ReceiverClosed);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_sample() {
        let handle = spawn_feed(Arc::new(Silent), &fast());

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
        let stop = tokio::time::timeout(Duration::from_millis(500), handle.join())
            .await
            .expect("join returns after cancel")
            .unwrap();
        assert_eq!(stop, FeedStop::Cancelled);
    }

    #[tokio::test]
    async fn test_dropped_handle_stops_pending_sample() {
        let (tx, _rx) = mpsc::channel(1);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            run_feed(&Silent, Duration::from_millis(1), None, tx, cancel_rx).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(cancel_tx);
        let stop = tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .expect("poller stops once the cancel sender is gone")
            .unwrap()
            .unwrap();
        assert_eq!(stop, FeedStop::Cancelled);
    }

    #[tokio::test]
    async fn test_slow_sample_keeps_poll_delay() {
        let interval = Duration::from_millis(30);
        let feed = Arc::new(SlowStart {
            delay: Duration::from_millis(100),
            starts: std::sync::Mutex::new(Vec::new()),
        });
        let config = ClientConfig {
            poll_interval: interval,
            max_polls: Some(4),
            ..ClientConfig::default()
        };

        let mut handle = spawn_feed(feed.clone(), &config);
        while handle.updates.recv().await.is_some() {}
        assert_eq!(handle.join().await.unwrap(), FeedStop::MaxPolls);

        let starts = feed.starts.lock().unwrap().clone();
        assert_eq!(starts.len(), 4);
        assert!(starts[1] - starts[0] >= Duration::from_millis(100) + interval);
        for pair in starts[1..].windows(2) {
            assert!(pair[1] - pair[0] >= interval, "gap {:?}", pair[1] - pair[0]);
        }
    }
}
