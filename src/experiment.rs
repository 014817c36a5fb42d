//! The experiment node and its sweep controller.
//!
//! An [`Experiment`] wraps a user [`Measurement`] — the declared
//! parameters, quantities and output connectors plus the `run()` body that
//! performs one acquisition cycle — and drives it across every registered
//! sweep. The controller owns the cooperative scheduler: a current-thread
//! tokio runtime built once at construction and reused for every run, on
//! which the sweep driver and all filter/sink node tasks are interleaved.
//!
//! # Lifecycle
//!
//! ```text
//! Configured --run_sweeps()--> Running --+--> Done
//!      ^                                 +--> Failed
//!      +------------- reset() -----------+
//! ```
//!
//! There is no implicit re-entry: a completed or failed run must be
//! `reset()` (stream queues cleared, descriptors recomputed, tuple list
//! rebuilt) before the experiment can run again.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut exp = Experiment::new(Ramp::new())?;
//! let sink = BufferSink::new("writer");
//! let sink_id = exp.add_node(Box::new(sink));
//! exp.set_graph(&[edge(EXPERIMENT_NODE, "voltage", sink_id, "sink")])?;
//! exp.add_sweep(&bias, [0.0, 1.0, 2.0])?;
//! let summary = exp.run_sweeps()?;
//! ```

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::axis::{DataAxis, SharedAxis};
use crate::error::{SweepError, SweepResult};
use crate::graph::{EdgeDef, ExperimentGraph, GraphEdge, NodeId, EXPERIMENT_NODE};
use crate::node::Node;
use crate::parameter::{Parameter, Quantity};
use crate::stream::{DataStream, InputConnector, OutputConnector};
use crate::sweep::{generate_tuples, RefineFn, SweptItem, SweptParameter, SweptParameterGroup};
use crate::value::Value;

/// Lifecycle state of an experiment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Ready to run: graph and sweeps may still be registered.
    Configured,
    /// A sweep run is in flight.
    Running,
    /// The last run completed and passed its integrity checks.
    Done,
    /// The last run aborted on a fault.
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Configured => "configured",
            RunState::Running => "running",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Record of one completed sweep run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Name of the measurement that was driven.
    pub experiment: String,
    /// When the run started.
    pub started: DateTime<Utc>,
    /// When the run finished.
    pub finished: DateTime<Utc>,
    /// Sweep tuples executed, including refinement passes.
    pub tuples_executed: usize,
    /// Points pushed through the experiment's own output connectors.
    pub points_produced: usize,
}

/// The user-defined measurement body of an experiment.
///
/// Implementations declare their endpoints through the registration
/// accessors — an explicit, construction-time enumeration of the typed
/// fields the struct already owns — and perform one acquisition cycle per
/// `run()` call, pushing exactly the point count the connectors declare
/// for a cycle.
#[async_trait(?Send)]
pub trait Measurement {
    /// Measurement name; becomes the experiment node's label.
    fn name(&self) -> &str;

    /// Declared control parameters, in declaration order.
    fn parameters(&self) -> Vec<Arc<Parameter>> {
        Vec::new()
    }

    /// Declared measured quantities, in declaration order.
    fn quantities(&self) -> Vec<Arc<Quantity>> {
        Vec::new()
    }

    /// Declared output connectors, in declaration order.
    fn output_connectors(&self) -> Vec<Arc<OutputConnector>>;

    /// Establish base per-cycle axes on the output connectors.
    ///
    /// Runs once, when the experiment is constructed.
    fn init_streams(&mut self) {}

    /// Prepare instruments before a sweep run starts.
    async fn init_instruments(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release instruments after a sweep run ends, successful or not.
    async fn shutdown_instruments(&mut self) -> Result<()> {
        Ok(())
    }

    /// One acquisition cycle: the smallest unit repeated per sweep tuple.
    async fn run(&mut self) -> Result<()>;
}

/// The sweep controller: owns the measurement, the node arena, the graph,
/// the registered sweeps and the cooperative scheduler.
pub struct Experiment<M: Measurement> {
    measurement: M,
    nodes: Vec<Box<dyn Node>>,
    swept: Vec<SweptItem>,
    tuples: Vec<Vec<Value>>,
    graph: Option<ExperimentGraph>,
    state: RunState,
    scheduler: Option<tokio::runtime::Runtime>,
}

impl<M: Measurement> Experiment<M> {
    /// Wrap a measurement and build its scheduler.
    ///
    /// The runtime is current-thread: every node task and the sweep driver
    /// are interleaved cooperatively on one thread for the lifetime of the
    /// experiment.
    pub fn new(mut measurement: M) -> SweepResult<Self> {
        let scheduler = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(SweepError::Scheduler)?;
        measurement.init_streams();
        let label = measurement.name().to_string();
        for connector in measurement.output_connectors() {
            connector.set_node(&label);
        }
        Ok(Self {
            measurement,
            nodes: Vec::new(),
            swept: Vec::new(),
            tuples: generate_tuples(&[]),
            graph: None,
            state: RunState::Configured,
            scheduler: Some(scheduler),
        })
    }

    /// The experiment's own node handle.
    pub fn node_id(&self) -> NodeId {
        EXPERIMENT_NODE
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The wrapped measurement.
    pub fn measurement(&self) -> &M {
        &self.measurement
    }

    /// Mutable access to the wrapped measurement.
    pub fn measurement_mut(&mut self) -> &mut M {
        &mut self.measurement
    }

    /// The graph, once [`set_graph`](Self::set_graph) has been called.
    pub fn graph(&self) -> Option<&ExperimentGraph> {
        self.graph.as_ref()
    }

    /// The registered sweeps, in declaration order.
    pub fn swept(&self) -> &[SweptItem] {
        &self.swept
    }

    /// The currently generated sweep tuples.
    pub fn sweep_tuples(&self) -> &[Vec<Value>] {
        &self.tuples
    }

    /// Look up a declared parameter by name.
    pub fn parameter(&self, name: &str) -> Option<Arc<Parameter>> {
        self.measurement
            .parameters()
            .into_iter()
            .find(|p| p.name() == name)
    }

    /// Look up a declared quantity by name.
    pub fn quantity(&self, name: &str) -> Option<Arc<Quantity>> {
        self.measurement
            .quantities()
            .into_iter()
            .find(|q| q.name() == name)
    }

    /// Add a filter or sink node to the arena, returning its handle.
    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeId {
        let label = node.name().to_string();
        for connector in node.inputs() {
            connector.set_node(&label);
        }
        for connector in node.outputs() {
            connector.set_node(&label);
        }
        self.nodes.push(node);
        NodeId(self.nodes.len())
    }

    fn node(&self, id: NodeId) -> SweepResult<&dyn Node> {
        match id.index().checked_sub(1).and_then(|i| self.nodes.get(i)) {
            Some(node) => Ok(node.as_ref()),
            None => Err(SweepError::Graph(format!(
                "unknown node id {}",
                id.index()
            ))),
        }
    }

    fn output_connector(&self, id: NodeId, name: &str) -> SweepResult<Arc<OutputConnector>> {
        let connectors = if id == EXPERIMENT_NODE {
            self.measurement.output_connectors()
        } else {
            self.node(id)?.outputs()
        };
        connectors
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| {
                SweepError::Graph(format!(
                    "node {} has no output connector '{name}'",
                    id.index()
                ))
            })
    }

    fn input_connector(&self, id: NodeId, name: &str) -> SweepResult<Arc<InputConnector>> {
        if id == EXPERIMENT_NODE {
            return Err(SweepError::Graph(
                "the experiment node has no input connectors".to_string(),
            ));
        }
        self.node(id)?
            .inputs()
            .into_iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| {
                SweepError::Graph(format!(
                    "node {} has no input connector '{name}'",
                    id.index()
                ))
            })
    }

    /// Build the stream graph from an explicit edge list.
    ///
    /// Creates one stream per edge, registers it on both connectors, then
    /// runs the descriptor-propagation pass. The graph is built once per
    /// run configuration; streams are reset, not rebuilt, between runs.
    pub fn set_graph(&mut self, edges: &[EdgeDef]) -> SweepResult<()> {
        if self.graph.is_some() {
            return Err(SweepError::Graph(
                "graph is already set; streams are reset between runs, not rebuilt".to_string(),
            ));
        }
        let mut resolved = Vec::with_capacity(edges.len());
        for def in edges {
            let source = self.output_connector(def.source_node, &def.source_connector)?;
            let sink = self.input_connector(def.sink_node, &def.sink_connector)?;
            let stream = Arc::new(DataStream::new(format!(
                "{}_TO_{}",
                source.name(),
                sink.name()
            )));
            source.add_output_stream(stream.clone());
            sink.add_input_stream(stream.clone());
            resolved.push(GraphEdge {
                source: def.source_node,
                sink: def.sink_node,
                source_connector: source,
                sink_connector: sink,
                stream,
            });
        }
        self.graph = Some(ExperimentGraph::build(resolved));
        self.update_descriptors()
    }

    /// Recompute every connector's descriptor and rebroadcast it to the
    /// attached streams, in depth-first edge order so a descriptor is
    /// always computed before it is consumed downstream.
    pub fn update_descriptors(&self) -> SweepResult<()> {
        debug!("starting descriptor update");
        for connector in self.measurement.output_connectors() {
            connector.update_descriptors();
        }
        if let Some(graph) = &self.graph {
            for index in graph.dfs_edges() {
                let edge = &graph.edges()[index];
                edge.stream()
                    .set_descriptor(edge.source_connector().descriptor());
                edge.sink_connector().refresh_descriptor()?;
                if edge.sink() != EXPERIMENT_NODE {
                    self.nodes[edge.sink().index() - 1].update_descriptors();
                }
            }
        }
        Ok(())
    }

    /// Register a sweep over one parameter.
    ///
    /// Wraps the parameter and value sequence into a [`SweptParameter`],
    /// appends the canonical axis to every output connector descriptor,
    /// and regenerates the tuple list. Values are coerced against the
    /// parameter's declared kind eagerly, so a malformed sweep fails here
    /// rather than mid-run. Returns the axis handle.
    pub fn add_sweep<V: Into<Value>>(
        &mut self,
        parameter: &Arc<Parameter>,
        values: impl IntoIterator<Item = V>,
    ) -> SweepResult<SharedAxis> {
        self.register_sweep(parameter, values, None)
    }

    /// Register an adaptive sweep: `refine` is invoked once per exhausted
    /// pass over the axis and may append points through the handle it
    /// receives; returning `false` stops further generation.
    pub fn add_sweep_with_refinement<V: Into<Value>>(
        &mut self,
        parameter: &Arc<Parameter>,
        values: impl IntoIterator<Item = V>,
        refine: impl FnMut(SharedAxis) -> BoxFuture<'static, Result<bool>> + Send + 'static,
    ) -> SweepResult<SharedAxis> {
        self.register_sweep(parameter, values, Some(Box::new(refine)))
    }

    fn register_sweep<V: Into<Value>>(
        &mut self,
        parameter: &Arc<Parameter>,
        values: impl IntoIterator<Item = V>,
        refine: Option<RefineFn>,
    ) -> SweepResult<SharedAxis> {
        self.require_configured()?;
        let mut coerced = Vec::new();
        for value in values {
            coerced.push(value.into().coerce(parameter.kind(), parameter.name())?);
        }
        let mut axis = DataAxis::new(parameter.name(), coerced);
        if let Some(unit) = parameter.unit() {
            axis = axis.with_unit(unit);
        }
        let axis = SharedAxis::new(axis);
        debug!(sweep = parameter.name(), points = axis.len(), "adding sweep");
        self.swept.push(SweptItem::Single(SweptParameter::new(
            parameter.clone(),
            axis.clone(),
            refine,
        )));
        self.attach_axis(&axis)?;
        Ok(axis)
    }

    /// Register a joint mesh sweep over several parameters.
    ///
    /// Each coordinate row sets every member parameter; iteration is by
    /// row index. The resulting axis is unstructured, with the parameter
    /// names as its coordinate names.
    pub fn add_unstructured_sweep<V: Into<Value>>(
        &mut self,
        parameters: &[Arc<Parameter>],
        rows: Vec<Vec<V>>,
    ) -> SweepResult<SharedAxis> {
        self.require_configured()?;
        if parameters.is_empty() {
            return Err(SweepError::MalformedSweep(
                "a group sweep needs at least one parameter".to_string(),
            ));
        }
        let mut coerced_rows = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != parameters.len() {
                return Err(SweepError::MalformedSweep(format!(
                    "coordinate row {index} has {} components for {} parameters",
                    row.len(),
                    parameters.len()
                )));
            }
            let mut coerced = Vec::with_capacity(row.len());
            for (value, parameter) in row.into_iter().zip(parameters) {
                coerced.push(value.into().coerce(parameter.kind(), parameter.name())?);
            }
            coerced_rows.push(coerced);
        }
        let coord_names = parameters.iter().map(|p| p.name().to_string()).collect();
        let axis = SharedAxis::new(DataAxis::unstructured(
            "unstructured",
            coerced_rows,
            coord_names,
        ));
        debug!(rows = axis.len(), "adding unstructured sweep");
        self.swept.push(SweptItem::Group(SweptParameterGroup::new(
            parameters.to_vec(),
            axis.clone(),
        )));
        self.attach_axis(&axis)?;
        Ok(axis)
    }

    fn attach_axis(&mut self, axis: &SharedAxis) -> SweepResult<()> {
        for connector in self.measurement.output_connectors() {
            connector.add_axis(axis.clone());
        }
        self.generate_sweep();
        self.update_descriptors()
    }

    fn require_configured(&self) -> SweepResult<()> {
        if self.state != RunState::Configured {
            return Err(SweepError::InvalidState {
                expected: RunState::Configured,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Rebuild the sweep tuple list from every sweep's current values.
    ///
    /// Must be re-invoked whenever any sweep's value sequence changes; the
    /// driver does so automatically after each refinement pass.
    pub fn generate_sweep(&mut self) {
        self.tuples = generate_tuples(&self.swept);
    }

    /// Ready the experiment for another run: clear stream queues,
    /// recompute descriptors, rebuild the tuple list.
    pub fn reset(&mut self) -> SweepResult<()> {
        if let Some(graph) = &self.graph {
            graph.reset()?;
        }
        self.update_descriptors()?;
        self.generate_sweep();
        self.state = RunState::Configured;
        Ok(())
    }

    /// Run the full sweep on the experiment's own scheduler, blocking
    /// until every node task completes.
    pub fn run_sweeps(&mut self) -> SweepResult<RunSummary> {
        let scheduler = self.scheduler.take().ok_or_else(|| {
            SweepError::Configuration("scheduler is already driving this experiment".to_string())
        })?;
        let result = scheduler.block_on(self.run_sweeps_on());
        self.scheduler = Some(scheduler);
        result
    }

    /// Async body of [`run_sweeps`](Self::run_sweeps), for embedding in an
    /// already-running runtime.
    ///
    /// Schedules the sweep driver concurrently with one task per graph
    /// node and joins them fail-fast: the first node fault cancels every
    /// sibling and fails the run.
    pub async fn run_sweeps_on(&mut self) -> SweepResult<RunSummary> {
        self.require_configured()?;
        self.state = RunState::Running;
        let run_id = Uuid::new_v4();
        let started = Utc::now();
        info!(%run_id, experiment = self.measurement.name(), "starting sweep run");

        let outcome: SweepResult<usize> = {
            let Self {
                measurement,
                nodes,
                swept,
                tuples,
                ..
            } = self;
            match measurement.init_instruments().await {
                Err(e) => Err(SweepError::Node {
                    node: measurement.name().to_string(),
                    source: e,
                }),
                Ok(()) => {
                    let joined = {
                        let driver = drive_sweeps(&mut *measurement, swept, tuples);
                        let node_tasks = nodes.iter_mut().map(|node| {
                            let label = node.name().to_string();
                            async move {
                                node.run().await.map_err(|e| SweepError::Node {
                                    node: label,
                                    source: e,
                                })
                            }
                        });
                        future::try_join(driver, future::try_join_all(node_tasks)).await
                    };
                    let shutdown = measurement.shutdown_instruments().await;
                    match (joined, shutdown) {
                        (Err(e), _) => Err(e),
                        (Ok(_), Err(e)) => Err(SweepError::Node {
                            node: measurement.name().to_string(),
                            source: e,
                        }),
                        (Ok((executed, _)), Ok(())) => Ok(executed),
                    }
                }
            }
        };

        match outcome {
            Ok(tuples_executed) => {
                if let Some(graph) = &self.graph {
                    if let Err(e) = graph.integrity_check() {
                        error!(%run_id, error = %e, "sweep run failed integrity check");
                        self.state = RunState::Failed;
                        return Err(e);
                    }
                }
                let points_produced = self
                    .measurement
                    .output_connectors()
                    .iter()
                    .flat_map(|c| c.streams())
                    .map(|s| s.points_taken())
                    .sum();
                self.state = RunState::Done;
                let summary = RunSummary {
                    run_id,
                    experiment: self.measurement.name().to_string(),
                    started,
                    finished: Utc::now(),
                    tuples_executed,
                    points_produced,
                };
                info!(
                    %run_id,
                    tuples = summary.tuples_executed,
                    points = summary.points_produced,
                    "sweep run complete"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(%run_id, error = %e, "sweep run failed");
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }
}

/// The sweep driver: enumerate tuples, update only changed parameters,
/// await one acquisition cycle per tuple, refine exhausted axes, and
/// finally propagate completion downstream.
///
/// Tuple components are compared with exact `Value` equality. That is
/// sound — not fragile — because an unchanged component is a clone of the
/// same element of the same generated sequence; it is never recomputed.
async fn drive_sweeps<M: Measurement>(
    measurement: &mut M,
    swept: &mut [SweptItem],
    tuples: &mut Vec<Vec<Value>>,
) -> SweepResult<usize> {
    let mut executed = 0usize;
    let mut last: Option<Vec<Value>> = None;
    loop {
        while executed < tuples.len() {
            let tuple = tuples[executed].clone();
            for (i, item) in swept.iter().enumerate() {
                let changed = match &last {
                    None => true,
                    Some(previous) => previous[i] != tuple[i],
                };
                if changed {
                    debug!(sweep = %item.label(), value = %tuple[i], "updating swept parameter");
                    item.apply(&tuple[i]).await?;
                }
            }
            last = Some(tuple);
            executed += 1;
            measurement.run().await.map_err(|e| SweepError::Node {
                node: measurement.name().to_string(),
                source: e,
            })?;
        }

        // Pass complete: give every adaptive axis one chance to grow, then
        // resume past the tuples already consumed.
        let mut grew = false;
        for item in swept.iter_mut() {
            if item.run_refinement().await? {
                grew = true;
            }
        }
        if !grew {
            break;
        }
        *tuples = generate_tuples(swept);
    }

    for connector in measurement.output_connectors() {
        connector.push_done().await;
    }
    Ok(executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    struct NullMeasurement {
        voltage: Arc<OutputConnector>,
        bias: Arc<Parameter>,
    }

    impl NullMeasurement {
        fn new() -> Self {
            Self {
                voltage: Arc::new(OutputConnector::new("voltage")),
                bias: Arc::new(
                    Parameter::new_abstract("bias")
                        .with_unit("V")
                        .with_kind(ValueKind::Float),
                ),
            }
        }
    }

    #[async_trait(?Send)]
    impl Measurement for NullMeasurement {
        fn name(&self) -> &str {
            "null"
        }

        fn parameters(&self) -> Vec<Arc<Parameter>> {
            vec![self.bias.clone()]
        }

        fn output_connectors(&self) -> Vec<Arc<OutputConnector>> {
            vec![self.voltage.clone()]
        }

        async fn run(&mut self) -> Result<()> {
            self.voltage.push(0.0).await?;
            Ok(())
        }
    }

    #[test]
    fn test_add_sweep_appends_axis_to_connectors() {
        let mut exp = Experiment::new(NullMeasurement::new()).unwrap();
        let bias = exp.parameter("bias").unwrap();
        let axis = exp.add_sweep(&bias, [0.0, 1.0, 2.0]).unwrap();
        let descriptor = exp.measurement().voltage.descriptor();
        assert_eq!(descriptor.axis_count(), 1);
        assert!(descriptor.axes()[0].same_axis(&axis));
        assert_eq!(descriptor.num_points(), 3);
        assert_eq!(exp.sweep_tuples().len(), 3);
    }

    #[test]
    fn test_sweep_values_coerced_eagerly() {
        let mut exp = Experiment::new(NullMeasurement::new()).unwrap();
        let bias = exp.parameter("bias").unwrap();
        let err = exp.add_sweep(&bias, [Value::Bool(true)]).unwrap_err();
        assert!(matches!(err, SweepError::ValueKind { .. }));
        assert!(exp.swept().is_empty());
    }

    #[test]
    fn test_unstructured_sweep_rejects_ragged_rows() {
        let mut exp = Experiment::new(NullMeasurement::new()).unwrap();
        let bias = exp.parameter("bias").unwrap();
        let other = Arc::new(Parameter::new_abstract("other"));
        let err = exp
            .add_unstructured_sweep(&[bias, other], vec![vec![0.0, 1.0], vec![2.0]])
            .unwrap_err();
        assert!(matches!(err, SweepError::MalformedSweep(_)));
    }

    #[test]
    fn test_set_graph_twice_fails() {
        let mut exp = Experiment::new(NullMeasurement::new()).unwrap();
        let sink_id = exp.add_node(Box::new(crate::node::BufferSink::new("writer")));
        let edges = [crate::graph::edge(EXPERIMENT_NODE, "voltage", sink_id, "sink")];
        exp.set_graph(&edges).unwrap();
        assert!(exp.set_graph(&edges).is_err());
    }

    #[test]
    fn test_rerun_requires_reset() {
        let mut exp = Experiment::new(NullMeasurement::new()).unwrap();
        exp.run_sweeps().unwrap();
        assert_eq!(exp.state(), RunState::Done);
        let err = exp.run_sweeps().unwrap_err();
        assert!(matches!(
            err,
            SweepError::InvalidState {
                actual: RunState::Done,
                ..
            }
        ));
        exp.reset().unwrap();
        assert_eq!(exp.state(), RunState::Configured);
        exp.run_sweeps().unwrap();
    }

    #[test]
    fn test_node_fault_fails_run() {
        struct FailingSink;

        #[async_trait(?Send)]
        impl Node for FailingSink {
            fn name(&self) -> &str {
                "bad_sink"
            }
            async fn run(&mut self) -> Result<()> {
                Err(anyhow::anyhow!("disk full"))
            }
        }

        let mut exp = Experiment::new(NullMeasurement::new()).unwrap();
        exp.add_node(Box::new(FailingSink));
        let err = exp.run_sweeps().unwrap_err();
        assert!(matches!(err, SweepError::Node { .. }));
        assert_eq!(exp.state(), RunState::Failed);
    }

    #[test]
    fn test_update_descriptors_is_idempotent() {
        let mut exp = Experiment::new(NullMeasurement::new()).unwrap();
        let sink_id = exp.add_node(Box::new(crate::node::BufferSink::new("writer")));
        exp.set_graph(&[crate::graph::edge(
            EXPERIMENT_NODE,
            "voltage",
            sink_id,
            "sink",
        )])
        .unwrap();
        let bias = exp.parameter("bias").unwrap();
        exp.add_sweep(&bias, [0.0, 1.0]).unwrap();

        exp.update_descriptors().unwrap();
        let first = exp.graph().unwrap().streams()[0].descriptor();
        exp.update_descriptors().unwrap();
        let second = exp.graph().unwrap().streams()[0].descriptor();
        assert_eq!(first.axis_names(), second.axis_names());
        assert_eq!(first.num_points(), second.num_points());
    }
}
