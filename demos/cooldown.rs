//! Adaptive cooldown acquisition: sweep a dummy index axis and keep
//! extending it until the cryostat reaches base temperature.
//!
//! A four-channel multiplexer measures sheet resistance while a
//! temperature monitor decides, once per exhausted pass, whether the
//! sweep should keep growing. Run with `cargo run --example cooldown`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use sweepflow::axis::{DataAxis, SharedAxis};
use sweepflow::experiment::{Experiment, Measurement};
use sweepflow::graph::{edge, EXPERIMENT_NODE};
use sweepflow::node::BufferSink;
use sweepflow::parameter::Parameter;
use sweepflow::stream::OutputConnector;
use sweepflow::value::ValueKind;

const CHANNELS: [i64; 4] = [101, 102, 103, 104];
const BASE_TEMP_K: f64 = 5.0;

/// Simulated cryostat: cools a little every acquisition cycle.
struct Cryostat {
    kelvin: Mutex<f64>,
}

impl Cryostat {
    fn new() -> Self {
        Self {
            kelvin: Mutex::new(300.0),
        }
    }

    fn cool(&self) -> f64 {
        let mut k = self.kelvin.lock();
        *k *= 0.62;
        *k
    }

    fn temperature(&self) -> f64 {
        *self.kelvin.lock()
    }
}

struct CooldownScan {
    sheet_res: Arc<OutputConnector>,
    temp: Arc<OutputConnector>,
    index: Arc<Parameter>,
    cryostat: Arc<Cryostat>,
}

impl CooldownScan {
    fn new(cryostat: Arc<Cryostat>) -> Self {
        Self {
            sheet_res: Arc::new(OutputConnector::new("sheet_res")),
            temp: Arc::new(OutputConnector::new("temp")),
            index: Arc::new(Parameter::new_abstract("index").with_kind(ValueKind::Int)),
            cryostat,
        }
    }
}

#[async_trait(?Send)]
impl Measurement for CooldownScan {
    fn name(&self) -> &str {
        "cooldown"
    }

    fn parameters(&self) -> Vec<Arc<Parameter>> {
        vec![self.index.clone()]
    }

    fn output_connectors(&self) -> Vec<Arc<OutputConnector>> {
        vec![self.sheet_res.clone(), self.temp.clone()]
    }

    fn init_streams(&mut self) {
        // The mux scans its channels itself, so the channel number is an
        // explicit per-cycle axis on the resistance measurement.
        self.sheet_res
            .add_axis(SharedAxis::new(DataAxis::new("channel", CHANNELS)));
    }

    async fn run(&mut self) -> Result<()> {
        let kelvin = self.cryostat.cool();
        // Sheet resistance rises as the film cools; one reading per channel.
        let readings: Vec<f64> = CHANNELS
            .iter()
            .map(|ch| 17.0 + (*ch as f64 - 100.0) + 400.0 / kelvin)
            .collect();
        self.sheet_res.push(readings).await?;
        self.temp.push(kelvin).await?;
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cryostat = Arc::new(Cryostat::new());
    let mut exp = Experiment::new(CooldownScan::new(cryostat.clone()))?;

    let res_writer = BufferSink::new("res_writer");
    let temp_writer = BufferSink::new("temp_writer");
    let res_data = res_writer.data();
    let temp_data = temp_writer.data();
    let res_id = exp.add_node(Box::new(res_writer));
    let temp_id = exp.add_node(Box::new(temp_writer));
    exp.set_graph(&[
        edge(EXPERIMENT_NODE, "sheet_res", res_id, "sink"),
        edge(EXPERIMENT_NODE, "temp", temp_id, "sink"),
    ])?;

    // Add points ten at a time until base temperature is reached.
    let index = exp
        .parameter("index")
        .ok_or_else(|| anyhow::anyhow!("index parameter not declared"))?;
    let refine_cryostat = cryostat.clone();
    exp.add_sweep_with_refinement(&index, [0], move |axis| {
        let cryostat = refine_cryostat.clone();
        Box::pin(async move {
            if cryostat.temperature() < BASE_TEMP_K {
                return Ok(false);
            }
            let next = axis.len() as i64;
            axis.add_points((next..next + 10).collect::<Vec<_>>());
            Ok(true)
        })
    })?;

    let summary = exp.run_sweeps()?;
    println!(
        "run {} finished: {} cycles, {} points, final temperature {:.2} K",
        summary.run_id,
        summary.tuples_executed,
        summary.points_produced,
        cryostat.temperature()
    );
    println!(
        "collected {} resistance batches and {} temperature points",
        res_data.lock().len(),
        temp_data.lock().len()
    );
    Ok(())
}
