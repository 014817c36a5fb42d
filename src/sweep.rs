//! Swept parameters and sweep-tuple generation.
//!
//! A [`SweptParameter`] couples one parameter to the canonical [`SharedAxis`]
//! holding its value sequence; the axis is the single source of truth, so a
//! refinement that appends points immediately lengthens both the sweep and
//! every descriptor carrying the axis. A [`SweptParameterGroup`] does the
//! same for a joint mesh sweep over unstructured coordinate rows, iterated
//! by row index.
//!
//! Tuple generation is the Cartesian product of every sweep's current value
//! sequence in declaration order — the first-registered sweep varies
//! slowest, exactly a nested loop.

use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

use crate::axis::SharedAxis;
use crate::error::{SweepError, SweepResult};
use crate::parameter::Parameter;
use crate::value::Value;

/// Feedback callable deciding whether a sweep axis keeps growing.
///
/// Invoked once per exhausted pass over the axis. It may append points via
/// the handle it receives; returning `false` stops further generation for
/// that axis. Instrument handles needed for the decision are captured by
/// the closure.
pub type RefineFn = Box<dyn FnMut(SharedAxis) -> BoxFuture<'static, Result<bool>> + Send>;

/// One parameter swept over the value sequence held by its axis.
pub struct SweptParameter {
    parameter: Arc<Parameter>,
    axis: SharedAxis,
    refine: Option<RefineFn>,
    refine_active: bool,
}

impl SweptParameter {
    /// Couple a parameter to the axis holding its value sequence.
    pub fn new(parameter: Arc<Parameter>, axis: SharedAxis, refine: Option<RefineFn>) -> Self {
        let refine_active = refine.is_some();
        Self {
            parameter,
            axis,
            refine,
            refine_active,
        }
    }

    /// The swept parameter.
    pub fn parameter(&self) -> &Arc<Parameter> {
        &self.parameter
    }
}

/// Several parameters swept jointly over unstructured coordinate rows.
pub struct SweptParameterGroup {
    parameters: Vec<Arc<Parameter>>,
    axis: SharedAxis,
}

impl SweptParameterGroup {
    /// Couple several parameters to an unstructured axis of coordinate rows.
    pub fn new(parameters: Vec<Arc<Parameter>>, axis: SharedAxis) -> Self {
        Self { parameters, axis }
    }

    /// The member parameters, in row-component order.
    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }
}

/// A registered sweep: a single parameter or a joint group.
pub enum SweptItem {
    /// One parameter over an ordered value sequence.
    Single(SweptParameter),
    /// A mesh sweep iterated by row index.
    Group(SweptParameterGroup),
}

impl SweptItem {
    /// Human-readable label for logs and errors.
    pub fn label(&self) -> String {
        match self {
            SweptItem::Single(s) => s.parameter.name().to_string(),
            SweptItem::Group(g) => g
                .parameters
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join("+"),
        }
    }

    /// The canonical axis tracking this sweep's value sequence.
    pub fn axis(&self) -> SharedAxis {
        match self {
            SweptItem::Single(s) => s.axis.clone(),
            SweptItem::Group(g) => g.axis.clone(),
        }
    }

    /// Current iteration values: the axis points for a single sweep, the
    /// row indices for a group.
    pub fn values(&self) -> Vec<Value> {
        match self {
            SweptItem::Single(s) => s
                .axis
                .with(|a| a.scalar_points().map(<[Value]>::to_vec))
                .unwrap_or_default(),
            SweptItem::Group(g) => (0..g.axis.len()).map(|i| Value::Int(i as i64)).collect(),
        }
    }

    /// Current number of iteration values.
    pub fn len(&self) -> usize {
        self.axis().len()
    }

    /// Whether the sweep currently has no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the component parameter(s) from one tuple component and push.
    pub(crate) async fn apply(&self, component: &Value) -> SweepResult<()> {
        match self {
            SweptItem::Single(s) => {
                s.parameter.set(component.clone())?;
                s.parameter.push().await
            }
            SweptItem::Group(g) => {
                let index = component.as_i64().ok_or_else(|| {
                    SweepError::MalformedSweep(format!(
                        "group sweep '{}' iterated with non-index value {component}",
                        self.label()
                    ))
                })? as usize;
                let row = g.axis.with(|a| {
                    a.rows().and_then(|rows| rows.get(index).cloned())
                });
                let row = row.ok_or_else(|| {
                    SweepError::MalformedSweep(format!(
                        "group sweep '{}' has no coordinate row {index}",
                        self.label()
                    ))
                })?;
                for (parameter, value) in g.parameters.iter().zip(row) {
                    parameter.set(value)?;
                }
                for parameter in &g.parameters {
                    parameter.push().await?;
                }
                Ok(())
            }
        }
    }

    /// Run this sweep's refinement after an exhausted pass.
    ///
    /// Returns whether the axis grew. A refine that returns `true` without
    /// appending anything is treated as finished — the sweep must not spin
    /// on a pass that adds no work.
    pub(crate) async fn run_refinement(&mut self) -> SweepResult<bool> {
        let SweptItem::Single(s) = self else {
            return Ok(false);
        };
        if !s.refine_active {
            return Ok(false);
        }
        let Some(refine) = s.refine.as_mut() else {
            return Ok(false);
        };
        let before = s.axis.len();
        let keep_going = refine(s.axis.clone())
            .await
            .map_err(|e| SweepError::Refine {
                axis: s.axis.name(),
                source: e,
            })?;
        let grew = s.axis.len() > before;
        if !keep_going || !grew {
            debug!(axis = %s.axis.name(), keep_going, grew, "refinement finished");
            s.refine_active = false;
        }
        Ok(keep_going && grew)
    }
}

/// The Cartesian product of every sweep's current values, in declaration
/// order: the first item varies slowest, exactly as nested loops would.
///
/// With no sweeps registered the product is a single empty tuple — one
/// acquisition cycle, no parameter updates.
pub fn generate_tuples(items: &[SweptItem]) -> Vec<Vec<Value>> {
    let mut tuples: Vec<Vec<Value>> = vec![Vec::new()];
    for item in items {
        let values = item.values();
        let mut next = Vec::with_capacity(tuples.len() * values.len());
        for prefix in &tuples {
            for value in &values {
                let mut tuple = prefix.clone();
                tuple.push(value.clone());
                next.push(tuple);
            }
        }
        tuples = next;
    }
    tuples
}
