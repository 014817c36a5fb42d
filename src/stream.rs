//! Streams and connectors: the transport layer of the dataflow graph.
//!
//! A [`DataStream`] is a bounded FIFO channel of point batches between
//! exactly one producing connector and one consuming connector. The bound
//! plus suspension is the overflow policy: a producer pushing into a full
//! stream parks until the consumer drains, which is what keeps a fast
//! acquisition loop from outrunning a slow sink.
//!
//! An [`OutputConnector`] owns a descriptor and fans each pushed batch out
//! to every attached stream; the push completes only once the batch is
//! enqueued on all of them. An [`InputConnector`] merges its inbound
//! streams by arrival order and reports end-of-data only when every stream
//! has been marked exhausted, so completion propagates through the graph
//! node by node.
//!
//! Batches travel as whole messages, so cancellation can never leave a
//! partially written batch in a queue.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::axis::DataStreamDescriptor;
use crate::error::{SweepError, SweepResult};

/// Default per-stream queue capacity, in batches.
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// One batch of measured points, in emission order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    /// The points themselves; samples are normalized to `f64`.
    pub values: Vec<f64>,
}

impl DataBatch {
    /// Number of points in the batch.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the batch carries no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<f64> for DataBatch {
    fn from(v: f64) -> Self {
        DataBatch { values: vec![v] }
    }
}

impl From<Vec<f64>> for DataBatch {
    fn from(values: Vec<f64>) -> Self {
        DataBatch { values }
    }
}

impl From<&[f64]> for DataBatch {
    fn from(values: &[f64]) -> Self {
        DataBatch {
            values: values.to_vec(),
        }
    }
}

enum StreamMessage {
    Points(DataBatch),
    Done,
}

/// Bounded single-writer/single-reader FIFO of point batches.
pub struct DataStream {
    name: String,
    capacity: usize,
    tx: RwLock<mpsc::Sender<StreamMessage>>,
    rx: Mutex<mpsc::Receiver<StreamMessage>>,
    descriptor: RwLock<DataStreamDescriptor>,
    points_taken: AtomicUsize,
    exhausted: AtomicBool,
}

impl DataStream {
    /// Create a stream with the default queue capacity.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_STREAM_CAPACITY)
    }

    /// Create a stream with an explicit queue capacity (in batches).
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            name: name.into(),
            capacity,
            tx: RwLock::new(tx),
            rx: Mutex::new(rx),
            descriptor: RwLock::new(DataStreamDescriptor::new()),
            points_taken: AtomicUsize::new(0),
            exhausted: AtomicBool::new(false),
        }
    }

    /// Stream name (`{source}_TO_{sink}`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the propagated shape contract.
    pub fn set_descriptor(&self, descriptor: DataStreamDescriptor) {
        *self.descriptor.write() = descriptor;
    }

    /// Current shape contract.
    pub fn descriptor(&self) -> DataStreamDescriptor {
        self.descriptor.read().clone()
    }

    /// Total points the descriptor declares for a complete run.
    pub fn num_points(&self) -> usize {
        self.descriptor.read().num_points()
    }

    /// Points enqueued by the producer so far this run.
    pub fn points_taken(&self) -> usize {
        self.points_taken.load(Ordering::SeqCst)
    }

    /// Whether the declared point total has been produced.
    pub fn done(&self) -> bool {
        self.points_taken() >= self.num_points()
    }

    /// Whether the consumer has seen the end of this run's data.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    /// Enqueue one batch, suspending while the queue is full.
    pub async fn push(&self, batch: DataBatch) -> SweepResult<()> {
        let count = batch.len();
        let tx = self.tx.read().clone();
        tx.send(StreamMessage::Points(batch))
            .await
            .map_err(|_| SweepError::Graph(format!("stream '{}' is closed", self.name)))?;
        self.points_taken.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }

    /// Mark the producing side complete for this run.
    ///
    /// A consumer that already went away (cancelled run) is not an error.
    pub async fn push_done(&self) {
        let tx = self.tx.read().clone();
        let _ = tx.send(StreamMessage::Done).await;
    }

    /// Dequeue the next batch; `None` once the stream is exhausted.
    pub async fn recv(&self) -> Option<DataBatch> {
        if self.is_exhausted() {
            return None;
        }
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(StreamMessage::Points(batch)) => Some(batch),
            Some(StreamMessage::Done) | None => {
                self.exhausted.store(true, Ordering::SeqCst);
                None
            }
        }
    }

    /// Discard queued batches and counters, readying the stream for a new
    /// run. Fails if a consumer still holds the receiving side.
    pub fn reset(&self) -> SweepResult<()> {
        let mut rx = self.rx.try_lock().map_err(|_| {
            SweepError::Configuration(format!(
                "stream '{}' cannot reset while a consumer holds it",
                self.name
            ))
        })?;
        let (tx, new_rx) = mpsc::channel(self.capacity);
        *rx = new_rx;
        *self.tx.write() = tx;
        self.points_taken.store(0, Ordering::SeqCst);
        self.exhausted.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for DataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStream")
            .field("name", &self.name)
            .field("points_taken", &self.points_taken())
            .field("num_points", &self.num_points())
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

/// Named port through which a node emits data.
pub struct OutputConnector {
    name: String,
    node: RwLock<String>,
    descriptor: RwLock<DataStreamDescriptor>,
    streams: RwLock<Vec<Arc<DataStream>>>,
}

impl OutputConnector {
    /// Create an output connector with an empty descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: RwLock::new(String::new()),
            descriptor: RwLock::new(DataStreamDescriptor::new()),
            streams: RwLock::new(Vec::new()),
        }
    }

    /// Connector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label of the owning node.
    pub fn node(&self) -> String {
        self.node.read().clone()
    }

    pub(crate) fn set_node(&self, label: &str) {
        *self.node.write() = label.to_string();
    }

    /// Current shape contract of this connector.
    pub fn descriptor(&self) -> DataStreamDescriptor {
        self.descriptor.read().clone()
    }

    /// Replace the descriptor. Only the owning node may do this.
    pub fn set_descriptor(&self, descriptor: DataStreamDescriptor) {
        *self.descriptor.write() = descriptor;
    }

    /// Append an axis to the descriptor.
    pub fn add_axis(&self, axis: crate::axis::SharedAxis) {
        self.descriptor.write().add_axis(axis);
    }

    pub(crate) fn add_output_stream(&self, stream: Arc<DataStream>) {
        self.streams.write().push(stream);
    }

    /// Streams currently attached downstream.
    pub fn streams(&self) -> Vec<Arc<DataStream>> {
        self.streams.read().clone()
    }

    /// Rebroadcast the current descriptor to every attached stream.
    pub fn update_descriptors(&self) {
        let descriptor = self.descriptor();
        debug!(
            connector = %self.name,
            axes = ?descriptor.axis_names(),
            points = descriptor.num_points(),
            "rebroadcasting descriptor"
        );
        for stream in self.streams.read().iter() {
            stream.set_descriptor(descriptor.clone());
        }
    }

    /// Push one batch to every attached stream.
    ///
    /// Suspends until the batch is enqueued on all of them; a full stream
    /// exerts backpressure on the producing node.
    pub async fn push(&self, batch: impl Into<DataBatch>) -> SweepResult<()> {
        let batch = batch.into();
        let streams = self.streams();
        for stream in &streams {
            stream.push(batch.clone()).await?;
        }
        Ok(())
    }

    /// Propagate end-of-run to every attached stream.
    pub async fn push_done(&self) {
        for stream in self.streams() {
            stream.push_done().await;
        }
    }
}

/// Named port through which a node receives data.
pub struct InputConnector {
    name: String,
    node: RwLock<String>,
    descriptor: RwLock<DataStreamDescriptor>,
    streams: RwLock<Vec<Arc<DataStream>>>,
}

impl InputConnector {
    /// Create an input connector with no attached streams.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node: RwLock::new(String::new()),
            descriptor: RwLock::new(DataStreamDescriptor::new()),
            streams: RwLock::new(Vec::new()),
        }
    }

    /// Connector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label of the owning node.
    pub fn node(&self) -> String {
        self.node.read().clone()
    }

    pub(crate) fn set_node(&self, label: &str) {
        *self.node.write() = label.to_string();
    }

    pub(crate) fn add_input_stream(&self, stream: Arc<DataStream>) {
        self.streams.write().push(stream);
    }

    /// Streams currently attached upstream.
    pub fn streams(&self) -> Vec<Arc<DataStream>> {
        self.streams.read().clone()
    }

    /// Number of inbound streams.
    pub fn stream_count(&self) -> usize {
        self.streams.read().len()
    }

    /// Aggregated shape view over the inbound streams.
    pub fn descriptor(&self) -> DataStreamDescriptor {
        self.descriptor.read().clone()
    }

    /// Recompute the aggregated view from the inbound stream descriptors.
    ///
    /// Fans-in must agree on their total point count; a disagreement is a
    /// shape error in the graph configuration.
    pub(crate) fn refresh_descriptor(&self) -> SweepResult<()> {
        let streams = self.streams();
        let Some(first) = streams.first() else {
            return Ok(());
        };
        let descriptor = first.descriptor();
        for other in &streams[1..] {
            let total = other.descriptor().num_points();
            if total != descriptor.num_points() {
                return Err(SweepError::Graph(format!(
                    "input '{}' receives {} points from '{}' but {} from '{}'",
                    self.name,
                    descriptor.num_points(),
                    first.name(),
                    total,
                    other.name(),
                )));
            }
        }
        *self.descriptor.write() = descriptor;
        Ok(())
    }

    /// Whether every inbound stream has been exhausted.
    pub fn all_exhausted(&self) -> bool {
        self.streams.read().iter().all(|s| s.is_exhausted())
    }

    /// Receive the next batch from any inbound stream.
    ///
    /// Streams are merged by arrival order; no cross-stream ordering is
    /// guaranteed. Returns `None` only when every inbound stream is
    /// exhausted.
    pub async fn recv(&self) -> Option<DataBatch> {
        loop {
            let live: Vec<Arc<DataStream>> = self
                .streams
                .read()
                .iter()
                .filter(|s| !s.is_exhausted())
                .cloned()
                .collect();
            if live.is_empty() {
                return None;
            }
            let pending: Vec<_> = live.iter().map(|s| Box::pin(s.recv())).collect();
            let (next, _index, _rest) = futures::future::select_all(pending).await;
            match next {
                Some(batch) => return Some(batch),
                // That stream just exhausted; go around with the rest.
                None => continue,
            }
        }
    }

    /// Receive from one specific inbound stream.
    ///
    /// For multi-input filters that define their own merge policy.
    pub async fn recv_from(&self, index: usize) -> Option<DataBatch> {
        let stream = self.streams.read().get(index).cloned()?;
        stream.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{DataAxis, SharedAxis};
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_stream_is_fifo() {
        let stream = DataStream::new("a_TO_b");
        for i in 0..5 {
            stream.push(DataBatch::from(i as f64)).await.unwrap();
        }
        stream.push_done().await;
        let mut seen = Vec::new();
        while let Some(batch) = stream.recv().await {
            seen.extend(batch.values);
        }
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(stream.is_exhausted());
    }

    #[tokio::test]
    async fn test_points_taken_counts_batch_lengths() {
        let stream = DataStream::new("a_TO_b");
        let mut d = DataStreamDescriptor::new();
        d.add_axis(SharedAxis::new(DataAxis::new("t", vec![0.0, 1.0, 2.0])));
        stream.set_descriptor(d);
        stream.push(DataBatch::from(vec![1.0, 2.0])).await.unwrap();
        assert_eq!(stream.points_taken(), 2);
        assert!(!stream.done());
        stream.push(DataBatch::from(3.0)).await.unwrap();
        assert!(stream.done());
    }

    #[tokio::test]
    async fn test_reset_clears_queue_and_counters() {
        let stream = DataStream::new("a_TO_b");
        stream.push(DataBatch::from(1.0)).await.unwrap();
        stream.push_done().await;
        assert_ok!(stream.reset());
        assert_eq!(stream.points_taken(), 0);
        assert!(!stream.is_exhausted());
        stream.push(DataBatch::from(9.0)).await.unwrap();
        stream.push_done().await;
        let first = stream.recv().await.unwrap();
        assert_eq!(first.values, vec![9.0]);
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_output_fans_out_to_all_streams() {
        let oc = OutputConnector::new("source");
        let s1 = Arc::new(DataStream::new("source_TO_a"));
        let s2 = Arc::new(DataStream::new("source_TO_b"));
        oc.add_output_stream(s1.clone());
        oc.add_output_stream(s2.clone());
        oc.push(vec![1.0, 2.0]).await.unwrap();
        assert_eq!(s1.points_taken(), 2);
        assert_eq!(s2.points_taken(), 2);
    }

    #[tokio::test]
    async fn test_input_drains_until_all_exhausted() {
        let ic = InputConnector::new("sink");
        let s1 = Arc::new(DataStream::new("a_TO_sink"));
        let s2 = Arc::new(DataStream::new("b_TO_sink"));
        ic.add_input_stream(s1.clone());
        ic.add_input_stream(s2.clone());

        s1.push(DataBatch::from(1.0)).await.unwrap();
        s2.push(DataBatch::from(2.0)).await.unwrap();
        s1.push_done().await;

        let mut total = 0;
        let mut saw = Vec::new();
        while let Some(batch) = ic.recv().await {
            saw.extend(batch.values);
            total += 1;
            if total == 2 {
                s2.push_done().await;
            }
        }
        saw.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(saw, vec![1.0, 2.0]);
        assert!(ic.all_exhausted());
    }

    #[tokio::test]
    async fn test_backpressure_suspends_producer() {
        let stream = Arc::new(DataStream::with_capacity("a_TO_b", 1));
        stream.push(DataBatch::from(0.0)).await.unwrap();
        // Queue is full: a second push must not complete until we drain.
        let pusher = {
            let stream = stream.clone();
            tokio::spawn(async move { stream.push(DataBatch::from(1.0)).await })
        };
        tokio::task::yield_now().await;
        assert!(!pusher.is_finished());
        let first = stream.recv().await.unwrap();
        assert_eq!(first.values, vec![0.0]);
        pusher.await.unwrap().unwrap();
        assert_eq!(stream.points_taken(), 2);
    }
}
