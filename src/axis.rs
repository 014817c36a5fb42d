//! Axis and descriptor: the logical shape of streamed data.
//!
//! A [`DataAxis`] is one named, ordered dimension — either a plain
//! coordinate sequence or an unstructured set of coordinate rows with
//! per-element names (a mesh sweep). A [`DataStreamDescriptor`] is an
//! ordered list of axes plus the element kind, and its total point count is
//! the product of the axis lengths.
//!
//! Axes grow at runtime: adaptive refinement appends points to a sweep axis
//! mid-run. To make that growth visible everywhere at once, each sweep owns
//! exactly one canonical axis wrapped in [`SharedAxis`], and every
//! descriptor that carries the dimension holds a handle to the same axis.
//! The total point count is therefore recomputed from the live axes on each
//! query rather than cached.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Coordinates of one axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AxisPoints {
    /// One scalar coordinate per point.
    Scalar(Vec<Value>),
    /// Unstructured coordinate rows; one row per point.
    Tuples(Vec<Vec<Value>>),
}

/// One named, ordered dimension of a measurement's logical shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataAxis {
    name: String,
    points: AxisPoints,
    unit: Option<String>,
    /// Free-form per-point annotations.
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Vec<serde_json::Value>>,
    /// Per-element coordinate names; empty for structured axes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    coord_names: Vec<String>,
}

impl DataAxis {
    /// A structured axis over an ordered coordinate sequence.
    pub fn new(
        name: impl Into<String>,
        points: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        Self {
            name: name.into(),
            points: AxisPoints::Scalar(points.into_iter().map(Into::into).collect()),
            unit: None,
            metadata: None,
            coord_names: Vec::new(),
        }
    }

    /// An unstructured axis over coordinate rows, one per point.
    pub fn unstructured(
        name: impl Into<String>,
        rows: Vec<Vec<Value>>,
        coord_names: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            points: AxisPoints::Tuples(rows),
            unit: None,
            metadata: None,
            coord_names,
        }
    }

    /// Set the physical unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attach per-point metadata (parallel to the point sequence).
    pub fn with_metadata(mut self, metadata: Vec<serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical unit label, if declared.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Number of points (row count for an unstructured axis).
    pub fn len(&self) -> usize {
        match &self.points {
            AxisPoints::Scalar(p) => p.len(),
            AxisPoints::Tuples(rows) => rows.len(),
        }
    }

    /// Whether the axis currently has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this axis carries unstructured coordinate rows.
    pub fn is_unstructured(&self) -> bool {
        matches!(self.points, AxisPoints::Tuples(_))
    }

    /// The coordinates themselves.
    pub fn points(&self) -> &AxisPoints {
        &self.points
    }

    /// Scalar coordinates; `None` for an unstructured axis.
    pub fn scalar_points(&self) -> Option<&[Value]> {
        match &self.points {
            AxisPoints::Scalar(p) => Some(p),
            AxisPoints::Tuples(_) => None,
        }
    }

    /// Coordinate rows; `None` for a structured axis.
    pub fn rows(&self) -> Option<&[Vec<Value>]> {
        match &self.points {
            AxisPoints::Scalar(_) => None,
            AxisPoints::Tuples(rows) => Some(rows),
        }
    }

    /// Per-element coordinate names (empty for structured axes).
    pub fn coord_names(&self) -> &[String] {
        &self.coord_names
    }

    /// Per-point metadata, if attached.
    pub fn metadata(&self) -> Option<&[serde_json::Value]> {
        self.metadata.as_deref()
    }

    /// Append points to a structured axis in place.
    pub fn add_points(&mut self, points: impl IntoIterator<Item = impl Into<Value>>) {
        match &mut self.points {
            AxisPoints::Scalar(p) => p.extend(points.into_iter().map(Into::into)),
            AxisPoints::Tuples(_) => {
                tracing::warn!(axis = %self.name, "add_points on an unstructured axis ignored");
            }
        }
    }

    /// Append coordinate rows to an unstructured axis in place.
    pub fn add_rows(&mut self, rows: Vec<Vec<Value>>) {
        match &mut self.points {
            AxisPoints::Tuples(r) => r.extend(rows),
            AxisPoints::Scalar(_) => {
                tracing::warn!(axis = %self.name, "add_rows on a structured axis ignored");
            }
        }
    }

    /// Replace the coordinate sequence of a structured axis.
    pub fn set_points(&mut self, points: impl IntoIterator<Item = impl Into<Value>>) {
        self.points = AxisPoints::Scalar(points.into_iter().map(Into::into).collect());
    }
}

/// Shared handle to one canonical [`DataAxis`].
///
/// Sweep refinement mutates the axis through this handle; every descriptor
/// holding the same handle observes the new length immediately.
#[derive(Clone, Debug)]
pub struct SharedAxis(Arc<RwLock<DataAxis>>);

impl SharedAxis {
    /// Wrap an axis for shared ownership.
    pub fn new(axis: DataAxis) -> Self {
        Self(Arc::new(RwLock::new(axis)))
    }

    /// Axis name (cloned out of the lock).
    pub fn name(&self) -> String {
        self.0.read().name().to_string()
    }

    /// Current point count.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the axis currently has no points.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether the axis carries unstructured coordinate rows.
    pub fn is_unstructured(&self) -> bool {
        self.0.read().is_unstructured()
    }

    /// Run a closure against the live axis.
    pub fn with<R>(&self, f: impl FnOnce(&DataAxis) -> R) -> R {
        f(&self.0.read())
    }

    /// Owned copy of the current axis state.
    pub fn snapshot(&self) -> DataAxis {
        self.0.read().clone()
    }

    /// Append points to the shared axis (structured axes).
    pub fn add_points(&self, points: impl IntoIterator<Item = impl Into<Value>>) {
        self.0.write().add_points(points);
    }

    /// Append coordinate rows to the shared axis (unstructured axes).
    pub fn add_rows(&self, rows: Vec<Vec<Value>>) {
        self.0.write().add_rows(rows);
    }

    /// Replace the coordinate sequence of a structured axis.
    pub fn set_points(&self, points: impl IntoIterator<Item = impl Into<Value>>) {
        self.0.write().set_points(points);
    }

    /// Whether two handles refer to the same canonical axis.
    pub fn same_axis(&self, other: &SharedAxis) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Element kind of the points a connector emits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    /// 64-bit floating point samples.
    #[default]
    F64,
    /// 64-bit integer samples (counts, indices).
    I64,
}

/// Ordered axis list plus element kind: the shape contract of a connector.
#[derive(Clone, Debug, Default)]
pub struct DataStreamDescriptor {
    axes: Vec<SharedAxis>,
    element: ElementKind,
}

impl DataStreamDescriptor {
    /// An empty descriptor (zero axes, one point per cycle).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the element kind.
    pub fn with_element(mut self, element: ElementKind) -> Self {
        self.element = element;
        self
    }

    /// Append an axis. The descriptor's total grows multiplicatively.
    pub fn add_axis(&mut self, axis: SharedAxis) {
        self.axes.push(axis);
    }

    /// The ordered axis handles.
    pub fn axes(&self) -> &[SharedAxis] {
        &self.axes
    }

    /// Number of axes.
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Axis names in order.
    pub fn axis_names(&self) -> Vec<String> {
        self.axes.iter().map(SharedAxis::name).collect()
    }

    /// Element kind of the emitted points.
    pub fn element(&self) -> ElementKind {
        self.element
    }

    /// Total point count: the product of the live axis lengths.
    ///
    /// An axis may have grown since the descriptor was built, so this is
    /// recomputed on every call; with no axes the product is 1 (one point
    /// per acquisition cycle).
    pub fn num_points(&self) -> usize {
        self.axes.iter().map(SharedAxis::len).product()
    }

    /// Owned copies of the current axis states, for serialization by sinks.
    pub fn snapshot(&self) -> Vec<DataAxis> {
        self.axes.iter().map(SharedAxis::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_points_is_axis_product() {
        let mut d = DataStreamDescriptor::new();
        d.add_axis(SharedAxis::new(DataAxis::new("freq", vec![1.0, 2.0, 3.0])));
        d.add_axis(SharedAxis::new(DataAxis::new("power", vec![0.0, 1.0])));
        assert_eq!(d.num_points(), 6);
    }

    #[test]
    fn test_empty_descriptor_declares_one_point() {
        assert_eq!(DataStreamDescriptor::new().num_points(), 1);
    }

    #[test]
    fn test_shared_axis_growth_visible_in_descriptor() {
        let axis = SharedAxis::new(DataAxis::new("index", vec![0, 1]));
        let mut d = DataStreamDescriptor::new();
        d.add_axis(axis.clone());
        assert_eq!(d.num_points(), 2);
        axis.add_points(vec![2, 3, 4]);
        assert_eq!(d.num_points(), 5);
    }

    #[test]
    fn test_unstructured_axis_counts_rows() {
        let rows = vec![
            vec![Value::Float(0.0), Value::Float(0.0)],
            vec![Value::Float(1.0), Value::Float(0.5)],
            vec![Value::Float(2.0), Value::Float(1.0)],
        ];
        let axis = DataAxis::unstructured("mesh", rows, vec!["x".into(), "y".into()]);
        assert_eq!(axis.len(), 3);
        assert!(axis.is_unstructured());
        assert_eq!(axis.coord_names(), ["x", "y"]);
    }

    #[test]
    fn test_unstructured_axis_serializes_coord_names() {
        let axis = DataAxis::unstructured(
            "mesh",
            vec![vec![Value::Int(0), Value::Int(1)]],
            vec!["x".into(), "y".into()],
        );
        let json = serde_json::to_value(&axis).unwrap();
        assert_eq!(json["coord_names"][1], "y");
    }

    #[test]
    fn test_descriptor_snapshot_is_detached() {
        let axis = SharedAxis::new(DataAxis::new("t", vec![0.0]).with_unit("s"));
        let mut d = DataStreamDescriptor::new();
        d.add_axis(axis.clone());
        let snap = d.snapshot();
        axis.add_points(vec![1.0]);
        assert_eq!(snap[0].len(), 1);
        assert_eq!(d.num_points(), 2);
    }
}
