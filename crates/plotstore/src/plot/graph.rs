//! Named graph: one record stream plus a running bounding box
//!
//! Outside painting mode X is time and must be non-negative and increasing
//! along each record. Records with negative X are refused; inverted corners
//! are reordered. Both cases are logged as geometry anomalies. Nothing is
//! written to the stream until a record has passed validation.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{error, trace, warn};

use crate::core::{ArrowFlags, Extent, LinePattern, Result, Rgb, StoreError};
use crate::store::{
    ChunkManager, Geometry, GraphicalObject, Label, RecordRef, StoreConfig, HEADER_LEN,
};

/// Objects assumed when no estimate is given
pub const DEFAULT_ESTIMATED_OBJECTS: usize = 1024;
/// Bytes reserved per estimated object when sizing chunks
pub const RECORD_SIZE_ESTIMATE: usize = HEADER_LEN + 10;

static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

/// What a graph stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphRole {
    Plain,
    /// Message and execution records of a sequence diagram
    SequenceDiagram,
    /// Life-lines and fixed annotations shared by a sub-plot
    Decorator,
}

/// Chunk sizing derived from an object-count estimate
pub fn config_for_estimate(estimated_objects: usize) -> StoreConfig {
    StoreConfig::new(estimated_objects.max(1).saturating_mul(RECORD_SIZE_ESTIMATE))
}

/// A named record stream belonging to one sub-plot
#[derive(Debug)]
pub struct Graph {
    id: usize,
    name: String,
    sub_plot_id: usize,
    role: GraphRole,
    store: ChunkManager,
    object_count: usize,
    extents: Option<Extent>,
    enabled: bool,
    painting: bool,
    override_color: Option<Rgb>,
    line_pattern: LinePattern,
}

impl Graph {
    pub fn new(name: impl Into<String>, sub_plot_id: usize, estimated_objects: usize) -> Self {
        Self::with_config(name, sub_plot_id, config_for_estimate(estimated_objects))
    }

    pub fn with_config(name: impl Into<String>, sub_plot_id: usize, config: StoreConfig) -> Self {
        let name = name.into();
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            store: ChunkManager::new(name.clone(), config),
            name,
            sub_plot_id,
            role: GraphRole::Plain,
            object_count: 0,
            extents: None,
            enabled: true,
            painting: false,
            override_color: None,
            line_pattern: LinePattern::None,
        }
    }

    pub(crate) fn with_role(mut self, role: GraphRole) -> Self {
        self.role = role;
        self
    }

    /// Process-unique id
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_plot_id(&self) -> usize {
        self.sub_plot_id
    }

    pub fn role(&self) -> GraphRole {
        self.role
    }

    pub fn object_count(&self) -> usize {
        self.object_count
    }

    /// Bounding box of every stored record, `None` before the first one
    pub fn extents(&self) -> Option<Extent> {
        self.extents
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    /// Painting mode lifts the X ordering and non-negativity checks
    pub fn set_painting(&mut self, painting: bool) {
        self.painting = painting;
    }

    pub fn override_color(&self) -> Option<Rgb> {
        self.override_color
    }

    pub fn set_override_color(&mut self, color: Rgb) {
        self.override_color = Some(color);
    }

    pub fn line_pattern(&self) -> LinePattern {
        self.line_pattern
    }

    pub fn set_line_pattern(&mut self, pattern: LinePattern) {
        self.line_pattern = pattern;
    }

    /// Underlying chunk stream, for capacity inspection
    pub fn store(&self) -> &ChunkManager {
        &self.store
    }

    pub fn add_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, row: i32) -> bool {
        let outcome = self.try_append(GraphicalObject::Line {
            geometry: Geometry::new(x1, y1, x2, y2, row),
        });
        self.report("add_line", outcome)
    }

    /// Line with a text label, color and arrow ends
    #[allow(clippy::too_many_arguments)]
    pub fn add_line_ex(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        row: i32,
        label: impl Into<Label>,
        color: Rgb,
        relative_x: f64,
        arrows: ArrowFlags,
    ) -> bool {
        let outcome = self.try_append(GraphicalObject::LineEx {
            geometry: Geometry::new(x1, y1, x2, y2, row),
            color,
            relative_x,
            arrows,
            label: label.into(),
        });
        self.report("add_line_ex", outcome)
    }

    /// Line labelled by an index into the sub-plot label table
    #[allow(clippy::too_many_arguments)]
    pub fn add_line_by_label_index(
        &mut self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        row: i32,
        label_index: i32,
        color: Rgb,
        relative_x: f64,
        arrows: ArrowFlags,
    ) -> bool {
        self.add_line_ex(
            x1,
            y1,
            x2,
            y2,
            row,
            Label::Index(label_index),
            color,
            relative_x,
            arrows,
        )
    }

    /// Box spanning two rows
    pub fn add_box(&mut self, x1: f64, y1: f64, row1: i32, x2: f64, y2: f64, row2: i32) -> bool {
        let outcome = self.try_append(GraphicalObject::Box {
            geometry: Geometry::new(x1, y1, x2, y2, row1),
            row2,
        });
        self.report("add_box", outcome)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_box_ex(
        &mut self,
        x1: f64,
        y1: f64,
        row1: i32,
        x2: f64,
        y2: f64,
        row2: i32,
        label: impl Into<Label>,
        fill: Rgb,
    ) -> bool {
        let outcome = self.try_append(GraphicalObject::BoxEx {
            geometry: Geometry::new(x1, y1, x2, y2, row1),
            row2,
            fill,
            label: label.into(),
        });
        self.report("add_box_ex", outcome)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_box_by_label_index(
        &mut self,
        x1: f64,
        y1: f64,
        row1: i32,
        x2: f64,
        y2: f64,
        row2: i32,
        label_index: i32,
        fill: Rgb,
    ) -> bool {
        self.add_box_ex(x1, y1, row1, x2, y2, row2, Label::Index(label_index), fill)
    }

    /// Validate, normalize and store one record
    ///
    /// On error nothing has been written and the extents are unchanged.
    pub fn try_append(&mut self, mut object: GraphicalObject) -> Result<RecordRef> {
        self.check_finite(&object)?;
        if !self.painting {
            self.normalize(&mut object)?;
        }

        let len = object.encoded_len();
        let (record, slot) = self.store.append(len)?;
        object.encode_into(slot)?;

        let g = object.geometry();
        let seen = Extent::from_corners(g.x1, g.y1, g.x2, g.y2);
        match self.extents.as_mut() {
            Some(extents) => extents.include(&seen),
            None => self.extents = Some(seen),
        }
        self.object_count += 1;

        trace!(
            graph = %self.name,
            kind = %object.kind(),
            x1 = g.x1,
            x2 = g.x2,
            row = g.row,
            "Stored record"
        );
        Ok(record)
    }

    /// NaN or infinite corners would poison the extents, painting or not
    fn check_finite(&self, object: &GraphicalObject) -> Result<()> {
        let g = object.geometry();
        if [g.x1, g.y1, g.x2, g.y2].iter().all(|v| v.is_finite()) {
            return Ok(());
        }
        warn!(graph = %self.name, x1 = g.x1, y1 = g.y1, x2 = g.x2, y2 = g.y2, "Refusing non-finite record");
        Err(StoreError::geometry(format!(
            "non-finite coordinates ({}, {}, {}, {}) in graph '{}'",
            g.x1, g.y1, g.x2, g.y2, self.name
        )))
    }

    fn normalize(&self, object: &mut GraphicalObject) -> Result<()> {
        let (g, boxed) = match object {
            GraphicalObject::Box { geometry, .. } | GraphicalObject::BoxEx { geometry, .. } => {
                (geometry, true)
            }
            GraphicalObject::Line { geometry } | GraphicalObject::LineEx { geometry, .. } => {
                (geometry, false)
            }
            GraphicalObject::LifeLineBox { .. } | GraphicalObject::LifeLineLine { .. } => {
                return Ok(())
            }
        };

        if g.x1 < 0.0 || g.x2 < 0.0 {
            let anomaly = StoreError::geometry(format!(
                "x1 ({}) or x2 ({}) less than 0 in graph '{}'",
                g.x1, g.x2, self.name
            ));
            warn!(graph = %self.name, x1 = g.x1, x2 = g.x2, "Refusing record with negative x");
            return Err(anomaly);
        }

        if g.x1 > g.x2 {
            warn!(graph = %self.name, x1 = g.x1, x2 = g.x2, "Swapping inverted x");
            std::mem::swap(&mut g.x1, &mut g.x2);
        }

        if boxed && g.y1 > g.y2 {
            warn!(graph = %self.name, y1 = g.y1, y2 = g.y2, "Swapping inverted box y");
            std::mem::swap(&mut g.y1, &mut g.y2);
        }
        Ok(())
    }

    fn report(&self, operation: &str, outcome: Result<RecordRef>) -> bool {
        match outcome {
            Ok(_) => true,
            Err(err @ StoreError::GeometryAnomaly { .. }) => {
                warn!(graph = %self.name, operation, error = %err, "Record not added");
                false
            }
            Err(err) => {
                error!(graph = %self.name, operation, error = %err, "Record not added");
                false
            }
        }
    }

    /// Rewind replay to the first record
    pub fn reset_read(&mut self) {
        self.store.reset_read();
    }

    /// Next record in insertion order, `Ok(None)` once the stream is exhausted
    pub fn replay_next(&mut self) -> Result<Option<(RecordRef, GraphicalObject)>> {
        match self.store.replay_next()? {
            Some((record, payload)) => {
                let object = GraphicalObject::decode(payload, record.offset)?;
                Ok(Some((record, object)))
            }
            None => Ok(None),
        }
    }

    /// Reset and iterate over every record
    ///
    /// Yields at most one error, after which iteration ends.
    pub fn objects(&mut self) -> Objects<'_> {
        self.reset_read();
        Objects {
            graph: self,
            done: false,
        }
    }

    /// Decode the record behind a handle
    pub fn resolve(&self, record: RecordRef) -> Result<GraphicalObject> {
        let payload = self.store.resolve(record)?;
        GraphicalObject::decode(payload, record.offset)
    }

    /// Move the X span of every decorator record; returns how many were moved
    pub fn reposition_decorators(&mut self, x1: f64, x2: f64) -> Result<usize> {
        let mut targets = Vec::new();
        self.reset_read();
        while let Some((record, object)) = self.replay_next()? {
            if object.is_decorator() {
                targets.push(record);
            }
        }

        for record in &targets {
            let payload = self.store.resolve_mut(*record)?;
            crate::store::record::write_x_span(payload, x1, x2)?;
        }
        Ok(targets.len())
    }

    /// Drop every record; handles into this graph become stale
    pub fn clean(&mut self) {
        self.store.clear();
        self.object_count = 0;
        self.extents = None;
    }
}

/// Replay iterator returned by [`Graph::objects`]
pub struct Objects<'a> {
    graph: &'a mut Graph,
    done: bool,
}

impl Iterator for Objects<'_> {
    type Item = Result<GraphicalObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.graph.replay_next() {
            Ok(Some((_, object))) => Some(Ok(object)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(graph: &mut Graph) -> Vec<GraphicalObject> {
        graph.objects().collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_inverted_line_is_swapped() {
        let mut graph = Graph::new("g", 0, 16);
        assert!(graph.add_line(5.0, 0.0, 1.0, 0.0, 3));
        let objects = all(&mut graph);
        assert_eq!(objects[0].geometry(), &Geometry::new(1.0, 0.0, 5.0, 0.0, 3));
    }

    #[test]
    fn test_painting_keeps_inverted_line() {
        let mut graph = Graph::new("g", 0, 16);
        graph.set_painting(true);
        assert!(graph.add_line(5.0, 0.0, 1.0, 0.0, 3));
        assert!(graph.add_line(-2.0, 0.0, -1.0, 0.0, 3));
        let objects = all(&mut graph);
        assert_eq!(objects[0].geometry().x1, 5.0);
        assert_eq!(objects[0].geometry().x2, 1.0);
        assert_eq!(graph.extents().unwrap().x_min, -2.0);
    }

    #[test]
    fn test_negative_x_refused_without_side_effects() {
        let mut graph = Graph::new("g", 0, 16);
        assert!(graph.add_line(1.0, 1.0, 2.0, 1.0, 0));
        let before = graph.extents();
        assert!(!graph.add_line(-1.0, 9.0, 2.0, 9.0, 0));
        let err = graph
            .try_append(GraphicalObject::Line {
                geometry: Geometry::new(0.0, 0.0, -3.0, 0.0, 0),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::GeometryAnomaly { .. }));
        assert_eq!(graph.object_count(), 1);
        assert_eq!(graph.store().record_count(), 1);
        assert_eq!(graph.extents(), before);
    }

    #[test]
    fn test_inverted_box_swaps_coordinates_not_rows() {
        let mut graph = Graph::new("g", 0, 16);
        assert!(graph.add_box_ex(4.0, 9.0, 40, 2.0, 1.0, 20, "b", Rgb(1)));
        match &all(&mut graph)[0] {
            GraphicalObject::BoxEx { geometry, row2, .. } => {
                assert_eq!((geometry.x1, geometry.x2), (2.0, 4.0));
                assert_eq!((geometry.y1, geometry.y2), (1.0, 9.0));
                assert_eq!((geometry.row, *row2), (40, 20));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_refused_in_every_mode() {
        let mut graph = Graph::new("g", 0, 16);
        assert!(graph.add_line(1.0, 1.0, 2.0, 2.0, 0));
        assert!(!graph.add_line(1.0, f64::NAN, 2.0, 1.0, 1));
        assert!(!graph.add_box(f64::INFINITY, 0.0, 0, 3.0, 1.0, 0));

        graph.set_painting(true);
        assert!(!graph.add_line(f64::NAN, 0.0, 1.0, 0.0, 2));
        assert_eq!(graph.object_count(), 1);
        assert_eq!(graph.extents(), Some(Extent::new(1.0, 2.0, 1.0, 2.0)));
    }

    #[test]
    fn test_extents_seed_then_grow() {
        let mut graph = Graph::new("g", 0, 16);
        assert_eq!(graph.extents(), None);
        graph.add_line(2.0, 5.0, 3.0, 1.0, 0);
        assert_eq!(graph.extents(), Some(Extent::new(2.0, 3.0, 1.0, 5.0)));
        graph.add_box(2.5, 2.0, 0, 2.6, 3.0, 0);
        assert_eq!(graph.extents(), Some(Extent::new(2.0, 3.0, 1.0, 5.0)));
        graph.add_line(0.5, -1.0, 10.0, 0.0, 0);
        assert_eq!(graph.extents(), Some(Extent::new(0.5, 10.0, -1.0, 5.0)));
    }

    #[test]
    fn test_label_index_variants() {
        let mut graph = Graph::new("g", 0, 16);
        graph.add_line_by_label_index(0.0, 0.0, 1.0, 1.0, 1, 4, Rgb(2), 0.5, ArrowFlags::OPEN_END);
        graph.add_box_by_label_index(0.0, 0.0, 1, 1.0, 1.0, 2, 5, Rgb(3));
        let objects = all(&mut graph);
        assert_eq!(objects[0].label(), Some(&Label::Index(4)));
        assert_eq!(objects[0].arrows(), ArrowFlags::OPEN_END);
        assert_eq!(objects[1].label(), Some(&Label::Index(5)));
    }

    #[test]
    fn test_out_of_memory_reported_as_false() {
        let config = StoreConfig::new(64).with_memory_limit(64);
        let mut graph = Graph::with_config("tiny", 0, config);
        assert!(graph.add_line(0.0, 0.0, 1.0, 1.0, 0));
        assert!(!graph.add_line(1.0, 0.0, 2.0, 1.0, 1));
        assert_eq!(graph.object_count(), 1);
        assert_eq!(all(&mut graph).len(), 1);
    }

    #[test]
    fn test_metadata_setters_leave_records_alone() {
        let mut graph = Graph::new("g", 2, 16);
        graph.add_line(0.0, 0.0, 1.0, 1.0, 0);
        graph.set_override_color(Rgb::new(9, 9, 9));
        graph.set_line_pattern(LinePattern::Dot);
        graph.set_enabled(false);
        assert_eq!(graph.override_color(), Some(Rgb::new(9, 9, 9)));
        assert_eq!(graph.line_pattern(), LinePattern::Dot);
        assert!(!graph.is_enabled());
        assert_eq!(graph.sub_plot_id(), 2);
        assert_eq!(graph.object_count(), 1);
    }

    #[test]
    fn test_clean_invalidates_handles() {
        let mut graph = Graph::new("g", 0, 16);
        let record = graph
            .try_append(GraphicalObject::Line {
                geometry: Geometry::new(0.0, 0.0, 1.0, 1.0, 0),
            })
            .unwrap();
        assert!(graph.resolve(record).is_ok());
        graph.clean();
        assert!(graph.resolve(record).is_err());
        assert_eq!(graph.extents(), None);
        assert_eq!(graph.object_count(), 0);
    }

    #[test]
    fn test_reposition_decorators() {
        let mut graph = Graph::new("Decoration", 0, 16).with_role(GraphRole::Decorator);
        graph
            .try_append(GraphicalObject::LifeLineLine {
                geometry: Geometry::new(0.0, 1.0, 0.0, 1.0, 0),
                color: Rgb(0),
                relative_x: 0.2,
                label: Label::text("l"),
            })
            .unwrap();
        graph.add_line(0.0, 0.0, 1.0, 0.0, 0);
        assert_eq!(graph.reposition_decorators(-0.5, 0.0).unwrap(), 1);
        let objects = all(&mut graph);
        assert_eq!(objects[0].geometry().x1, -0.5);
        assert_eq!(objects[1].geometry().x1, 0.0);
    }
}
