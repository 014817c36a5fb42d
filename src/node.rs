//! The node contract every graph participant implements.
//!
//! Filters and sinks compose with the sweep controller by exposing their
//! connectors and a `run()` future that drains inputs until exhaustion.
//! All node futures are interleaved on the experiment's single cooperative
//! scheduler, so implementations must suspend at channel operations rather
//! than block.
//!
//! Two small concrete nodes live here: [`RelayFilter`], a shape-preserving
//! pass-through used to compose multi-stage graphs, and [`BufferSink`], a
//! terminal sink that collects batches in memory. Both double as the mock
//! collaborators the test suites and demos are built on.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::stream::{DataBatch, InputConnector, OutputConnector};

/// A graph participant: measurement driver, filter, or terminal sink.
#[async_trait(?Send)]
pub trait Node {
    /// Node label, used in stream names and error reports.
    fn name(&self) -> &str;

    /// Input connectors, in declaration order.
    fn inputs(&self) -> Vec<Arc<InputConnector>> {
        Vec::new()
    }

    /// Output connectors, in declaration order.
    fn outputs(&self) -> Vec<Arc<OutputConnector>> {
        Vec::new()
    }

    /// Recompute output descriptors from the aggregated input view.
    ///
    /// The default is shape-preserving: the first input's descriptor is
    /// copied onto every output and rebroadcast to the attached streams.
    /// Filters that reshape data (an averager dropping an axis, say)
    /// override this.
    fn update_descriptors(&self) {
        let inputs = self.inputs();
        let Some(first) = inputs.first() else {
            return;
        };
        let descriptor = first.descriptor();
        for output in self.outputs() {
            output.set_descriptor(descriptor.clone());
            output.update_descriptors();
        }
    }

    /// Consume inbound streams until exhausted, re-emitting as appropriate.
    ///
    /// A fault returned here is fatal to the whole run: sibling node tasks
    /// are cancelled and the error surfaces to the caller.
    async fn run(&mut self) -> Result<()>;
}

/// Shape-preserving filter that relays every batch from its sink to its
/// source connector.
pub struct RelayFilter {
    name: String,
    sink: Arc<InputConnector>,
    source: Arc<OutputConnector>,
}

impl RelayFilter {
    /// Create a relay with the conventional `sink`/`source` connectors.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink: Arc::new(InputConnector::new("sink")),
            source: Arc::new(OutputConnector::new("source")),
        }
    }

    /// The inbound connector.
    pub fn sink(&self) -> Arc<InputConnector> {
        self.sink.clone()
    }

    /// The outbound connector.
    pub fn source(&self) -> Arc<OutputConnector> {
        self.source.clone()
    }
}

#[async_trait(?Send)]
impl Node for RelayFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<Arc<InputConnector>> {
        vec![self.sink.clone()]
    }

    fn outputs(&self) -> Vec<Arc<OutputConnector>> {
        vec![self.source.clone()]
    }

    async fn run(&mut self) -> Result<()> {
        while let Some(batch) = self.sink.recv().await {
            self.source.push(batch).await?;
        }
        self.source.push_done().await;
        Ok(())
    }
}

/// Terminal sink that drains its input connector into memory.
pub struct BufferSink {
    name: String,
    sink: Arc<InputConnector>,
    batches: Arc<Mutex<Vec<DataBatch>>>,
}

impl BufferSink {
    /// Create a sink with the conventional `sink` connector.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink: Arc::new(InputConnector::new("sink")),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The inbound connector.
    pub fn sink(&self) -> Arc<InputConnector> {
        self.sink.clone()
    }

    /// Handle to the collected batches; stays valid after the sink is
    /// boxed into an experiment.
    pub fn data(&self) -> Arc<Mutex<Vec<DataBatch>>> {
        self.batches.clone()
    }
}

#[async_trait(?Send)]
impl Node for BufferSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<Arc<InputConnector>> {
        vec![self.sink.clone()]
    }

    async fn run(&mut self) -> Result<()> {
        while let Some(batch) = self.sink.recv().await {
            self.batches.lock().push(batch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DataStream;

    #[tokio::test]
    async fn test_relay_forwards_and_completes() {
        let mut relay = RelayFilter::new("relay");
        let upstream = Arc::new(DataStream::new("exp_TO_relay"));
        let downstream = Arc::new(DataStream::new("relay_TO_sink"));
        relay.sink().add_input_stream(upstream.clone());
        relay.source().add_output_stream(downstream.clone());

        upstream.push(DataBatch::from(vec![1.0, 2.0])).await.unwrap();
        upstream.push_done().await;
        relay.run().await.unwrap();

        let batch = downstream.recv().await.unwrap();
        assert_eq!(batch.values, vec![1.0, 2.0]);
        assert!(downstream.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_buffer_sink_collects_in_order() {
        let mut sink = BufferSink::new("writer");
        let data = sink.data();
        let stream = Arc::new(DataStream::new("exp_TO_writer"));
        sink.sink().add_input_stream(stream.clone());

        for i in 0..3 {
            stream.push(DataBatch::from(i as f64)).await.unwrap();
        }
        stream.push_done().await;
        sink.run().await.unwrap();

        let collected = data.lock();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[2].values, vec![2.0]);
    }
}
