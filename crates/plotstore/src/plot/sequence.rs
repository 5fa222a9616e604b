//! Sequence diagrams on top of a graph and its sub-plot decorator
//!
//! Life-lines live in the decorator as a box plus a centre line. Messages,
//! events and executions are ordinary line and box records in the diagram's
//! own graph, with Y derived from the life-lines they connect.

use tracing::{error, trace};

use super::graph::Graph;
use crate::core::{ArrowFlags, Result, Rgb, StoreError};
use crate::store::{Geometry, GraphicalObject, Label, RecordRef};

/// Fraction of a life-line's half height covered by an execution bar
pub const EXEC_HEIGHT_RATIO: f64 = 0.3;
/// Label position along message and event lines
pub const MESSAGE_LABEL_POSITION: f64 = 0.5;
/// Label position along a life-line's centre line
pub const LIFELINE_LABEL_POSITION: f64 = 0.2;

/// Handle to a life-line stored in a decorator
///
/// Valid until the owning sub-plot is cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifeLine {
    record: RecordRef,
}

impl LifeLine {
    pub fn record(&self) -> RecordRef {
        self.record
    }
}

/// Vertical coordinates derived from a life-line's span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeLineGeometry {
    pub y1: f64,
    pub y2: f64,
    pub y_center: f64,
    pub y_exec_top: f64,
    pub y_exec_bottom: f64,
}

impl LifeLineGeometry {
    pub fn from_span(y1: f64, y2: f64) -> Self {
        let half = (y2 - y1) / 2.0;
        let y_center = y1 + half;
        Self {
            y1,
            y2,
            y_center,
            y_exec_top: y_center + half * EXEC_HEIGHT_RATIO,
            y_exec_bottom: y_center - half * EXEC_HEIGHT_RATIO,
        }
    }

    /// True when the life-line's span runs downwards (y1 above y2)
    fn descends(&self) -> bool {
        self.y1 > self.y2
    }
}

/// Mutable view pairing a sequence-diagram graph with its decorator
pub struct SequenceDiagram<'a> {
    graph: &'a mut Graph,
    decorator: &'a mut Graph,
}

impl<'a> SequenceDiagram<'a> {
    pub(crate) fn new(graph: &'a mut Graph, decorator: &'a mut Graph) -> Self {
        Self { graph, decorator }
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    pub fn decorator(&self) -> &Graph {
        self.decorator
    }

    /// Add a life-line spanning `y1..y2`; `None` (logged) if it could not be stored
    pub fn add_life_line(&mut self, y1: f64, y2: f64, label: &str, color: Rgb) -> Option<LifeLine> {
        match self.try_add_life_line(y1, y2, label, color) {
            Ok(life_line) => Some(life_line),
            Err(err) => {
                error!(diagram = %self.graph.name(), error = %err, "Life-line not added");
                None
            }
        }
    }

    pub fn try_add_life_line(
        &mut self,
        y1: f64,
        y2: f64,
        label: &str,
        color: Rgb,
    ) -> Result<LifeLine> {
        let derived = LifeLineGeometry::from_span(y1, y2);

        let record = self.decorator.try_append(GraphicalObject::LifeLineBox {
            geometry: Geometry::new(0.0, y1, 0.0, y2, 0),
            y_center: derived.y_center,
            y_exec_top: derived.y_exec_top,
            y_exec_bottom: derived.y_exec_bottom,
            fill: color,
            relative_x: 0.0,
            label: Label::text(label),
        })?;

        self.decorator.try_append(GraphicalObject::LifeLineLine {
            geometry: Geometry::new(0.0, derived.y_center, 0.0, derived.y_center, 0),
            color,
            relative_x: LIFELINE_LABEL_POSITION,
            label: Label::text(label),
        })?;

        trace!(label, y_center = derived.y_center, "Added life-line");
        Ok(LifeLine { record })
    }

    /// Derived coordinates of a life-line
    pub fn life_line(&self, life_line: LifeLine) -> Result<LifeLineGeometry> {
        match self.decorator.resolve(life_line.record)? {
            GraphicalObject::LifeLineBox {
                geometry,
                y_center,
                y_exec_top,
                y_exec_bottom,
                ..
            } => Ok(LifeLineGeometry {
                y1: geometry.y1,
                y2: geometry.y2,
                y_center,
                y_exec_top,
                y_exec_bottom,
            }),
            other => Err(StoreError::stale_handle(format!(
                "life-line handle points at a {} record",
                other.kind()
            ))),
        }
    }

    /// Message from one life-line to another at time `x`
    ///
    /// Synced messages get a solid arrow head. A message that starts an
    /// execution ends on the near edge of the target's execution bar.
    #[allow(clippy::too_many_arguments)]
    pub fn add_message(
        &mut self,
        from: LifeLine,
        x: f64,
        to: LifeLine,
        row: i32,
        label: impl Into<Label>,
        color: Rgb,
        synced: bool,
        starts_execution: bool,
    ) -> bool {
        let (src, dest) = match self.resolve_pair(from, to) {
            Some(pair) => pair,
            None => return false,
        };

        let arrows = if synced {
            ArrowFlags::SOLID_END
        } else {
            ArrowFlags::OPEN_END
        };
        let y_dest = if !starts_execution {
            dest.y_center
        } else if src.descends() {
            dest.y_exec_top
        } else {
            dest.y_exec_bottom
        };

        self.graph.add_line_ex(
            x,
            src.y_center,
            x,
            y_dest,
            row,
            label,
            color,
            MESSAGE_LABEL_POSITION,
            arrows,
        )
    }

    /// Reply message; may leave from and land on execution bars
    #[allow(clippy::too_many_arguments)]
    pub fn add_return_message(
        &mut self,
        from: LifeLine,
        x: f64,
        to: LifeLine,
        row: i32,
        label: impl Into<Label>,
        color: Rgb,
        from_execution: bool,
        starts_execution: bool,
    ) -> bool {
        let (src, dest) = match self.resolve_pair(from, to) {
            Some(pair) => pair,
            None => return false,
        };

        let above = src.y1 > dest.y1;
        let y_src = match (from_execution, above) {
            (false, _) => src.y_center,
            (true, true) => src.y_exec_bottom,
            (true, false) => src.y_exec_top,
        };
        let y_dest = match (starts_execution, above) {
            (false, _) => dest.y_center,
            (true, true) => dest.y_exec_top,
            (true, false) => dest.y_exec_bottom,
        };

        self.graph.add_line_ex(
            x,
            y_src,
            x,
            y_dest,
            row,
            label,
            color,
            MESSAGE_LABEL_POSITION,
            ArrowFlags::OPEN_END,
        )
    }

    /// External event arriving at a life-line from beyond its `y2` edge
    pub fn add_event(
        &mut self,
        at: LifeLine,
        x: f64,
        row: i32,
        label: impl Into<Label>,
        color: Rgb,
        starts_execution: bool,
    ) -> bool {
        let target = match self.resolve_logged(at) {
            Some(target) => target,
            None => return false,
        };

        let start = target.y2 + (target.y2 - target.y_center);
        let end = if starts_execution {
            target.y_exec_top
        } else {
            target.y_center
        };

        self.graph.add_line_ex(
            x,
            start,
            x,
            end,
            row,
            label,
            color,
            MESSAGE_LABEL_POSITION,
            ArrowFlags::OPEN_END,
        )
    }

    /// Execution bar on a life-line between `x1` and `x2`
    pub fn add_execution(
        &mut self,
        at: LifeLine,
        x1: f64,
        x2: f64,
        row: i32,
        label: impl Into<Label>,
        color: Rgb,
    ) -> bool {
        let target = match self.resolve_logged(at) {
            Some(target) => target,
            None => return false,
        };

        self.graph.add_box_ex(
            x1,
            target.y_exec_bottom,
            row,
            x2,
            target.y_exec_top,
            row,
            label,
            color,
        )
    }

    fn resolve_pair(
        &self,
        from: LifeLine,
        to: LifeLine,
    ) -> Option<(LifeLineGeometry, LifeLineGeometry)> {
        Some((self.resolve_logged(from)?, self.resolve_logged(to)?))
    }

    fn resolve_logged(&self, life_line: LifeLine) -> Option<LifeLineGeometry> {
        self.life_line(life_line)
            .inspect_err(|err| {
                error!(diagram = %self.graph.name(), error = %err, "Unusable life-line handle");
            })
            .ok()
    }
}
