//! Sub-plot: graphs sharing one Y axis, an optional decorator and a label table

use tracing::{debug, error, info};

use super::graph::{Graph, GraphRole};
use super::sequence::SequenceDiagram;
use crate::core::{Extent, IntrusiveList, NodeId, Result, StoreError, SubPlotProperties};
use crate::store::truncate_label;

/// Handle to a graph inside its sub-plot
pub type GraphId = NodeId;

/// Name of the per-sub-plot decorator graph
pub const DECORATOR_NAME: &str = "Decoration";
pub const DECORATOR_ESTIMATED_OBJECTS: usize = 100;
/// Share of the plot width reserved left of the data for life-line boxes
pub const LIFELINE_MARGIN_RATIO: f64 = 0.1;

#[derive(Debug)]
pub struct SubPlot {
    id: usize,
    title: String,
    y_label: String,
    properties: SubPlotProperties,
    graphs: IntrusiveList<Graph>,
    decorator: Option<Graph>,
    labels: Vec<String>,
    extents: Option<Extent>,
}

impl SubPlot {
    pub fn new(id: usize, title: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            y_label: y_label.into(),
            properties: SubPlotProperties::NONE,
            graphs: IntrusiveList::new(),
            decorator: None,
            labels: Vec::new(),
            extents: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn y_label(&self) -> &str {
        &self.y_label
    }

    pub fn properties(&self) -> SubPlotProperties {
        self.properties
    }

    /// Replace the property bits; painting is pushed down to existing graphs
    pub fn set_properties(&mut self, properties: SubPlotProperties) {
        self.properties = properties;
        let painting = self.is_painting();
        for id in self.graphs.ids() {
            if let Some(graph) = self.graphs.get_mut(id) {
                graph.set_painting(painting);
            }
        }
        if let Some(decorator) = self.decorator.as_mut() {
            decorator.set_painting(painting);
        }
    }

    pub fn is_painting(&self) -> bool {
        self.properties.contains(SubPlotProperties::PAINTING)
    }

    /// Create a graph, inheriting the painting property
    pub fn add_graph(&mut self, name: impl Into<String>, estimated_objects: usize) -> GraphId {
        self.insert_graph(name.into(), estimated_objects, GraphRole::Plain)
    }

    /// Create the decorator on first use; later calls return the same one
    pub fn add_decorator(&mut self) -> &mut Graph {
        let painting = self.is_painting();
        let id = self.id;
        self.decorator.get_or_insert_with(|| {
            debug!(sub_plot = id, "Creating decorator");
            let mut decorator = Graph::new(DECORATOR_NAME, id, DECORATOR_ESTIMATED_OBJECTS)
                .with_role(GraphRole::Decorator);
            decorator.set_painting(painting);
            decorator
        })
    }

    pub fn decorator(&self) -> Option<&Graph> {
        self.decorator.as_ref()
    }

    pub fn decorator_mut(&mut self) -> Option<&mut Graph> {
        self.decorator.as_mut()
    }

    /// Create a sequence-diagram graph bound to the decorator
    pub fn add_sequence_diagram(
        &mut self,
        name: impl Into<String>,
        estimated_objects: usize,
    ) -> GraphId {
        self.add_decorator();
        self.insert_graph(name.into(), estimated_objects, GraphRole::SequenceDiagram)
    }

    /// Borrow a sequence diagram together with the decorator it draws life-lines in
    pub fn sequence_diagram(&mut self, id: GraphId) -> Result<SequenceDiagram<'_>> {
        let graph = self
            .graphs
            .get_mut(id)
            .ok_or_else(|| StoreError::unknown_graph(format!("{:?} in sub-plot {}", id, self.id)))?;
        if graph.role() != GraphRole::SequenceDiagram {
            return Err(StoreError::unknown_graph(format!(
                "'{}' is not a sequence diagram",
                graph.name()
            )));
        }
        let decorator = self
            .decorator
            .as_mut()
            .ok_or_else(|| StoreError::unknown_graph("sequence diagram without decorator"))?;
        Ok(SequenceDiagram::new(graph, decorator))
    }

    pub fn graph(&self, id: GraphId) -> Option<&Graph> {
        self.graphs.get(id)
    }

    pub fn graph_mut(&mut self, id: GraphId) -> Option<&mut Graph> {
        self.graphs.get_mut(id)
    }

    /// Look a graph up by name
    pub fn find_graph(&self, name: &str) -> Option<GraphId> {
        self.graphs
            .iter()
            .find(|(_, g)| g.name() == name)
            .map(|(id, _)| id)
    }

    /// Graphs in creation order
    pub fn graphs(&self) -> impl Iterator<Item = (GraphId, &Graph)> {
        self.graphs.iter()
    }

    pub fn graph_ids(&self) -> Vec<GraphId> {
        self.graphs.ids()
    }

    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    /// Detach a graph and hand it to the caller
    pub fn remove_graph(&mut self, id: GraphId) -> Option<Graph> {
        self.graphs.take_out(id)
    }

    /// Register a label; returns its index for label-index records
    pub fn add_label(&mut self, text: &str) -> Result<i32> {
        if text.is_empty() {
            return Err(StoreError::invalid_label("empty label"));
        }
        self.labels.push(truncate_label(text).to_string());
        Ok((self.labels.len() - 1) as i32)
    }

    pub fn label(&self, index: i32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Last computed bounding box, `None` when no graph holds records
    pub fn extents(&self) -> Option<Extent> {
        self.extents
    }

    /// Fold graph extents into the sub-plot extent
    ///
    /// Sequence sub-plots with life-lines also get a left margin of
    /// [`LIFELINE_MARGIN_RATIO`] of the width, and every life-line record
    /// is moved into that margin.
    pub fn calc_extents(&mut self) -> Option<Extent> {
        let folded = self
            .graphs
            .iter()
            .filter_map(|(_, g)| g.extents())
            .reduce(|acc, e| acc.union(&e));
        self.extents = folded;

        if !self.properties.contains(SubPlotProperties::SEQUENCE) {
            return self.extents;
        }
        let (Some(mut extents), Some(decorator)) = (folded, self.decorator.as_mut()) else {
            return self.extents;
        };
        if decorator.object_count() == 0 {
            return self.extents;
        }

        if extents.x_min < 0.0 {
            extents.x_min = 0.0;
        }
        let margin = extents.width() * LIFELINE_MARGIN_RATIO;
        extents.x_min -= margin;

        match decorator.reposition_decorators(extents.x_min, extents.x_min + margin) {
            Ok(0) => {}
            Ok(moved) => {
                debug!(sub_plot = self.id, moved, margin, "Placed life-lines in margin");
                self.extents = Some(extents);
            }
            Err(err) => {
                error!(sub_plot = self.id, error = %err, "Life-line placement failed");
            }
        }
        self.extents
    }

    /// Drop every graph, the decorator and the extents
    ///
    /// Graph ids and life-line handles issued before this call become stale.
    pub fn clean(&mut self) {
        info!(sub_plot = self.id, graphs = self.graphs.len(), "Cleaning sub-plot");
        self.graphs.delete_all();
        if let Some(decorator) = self.decorator.as_mut() {
            decorator.clean();
        }
        self.extents = None;
    }

    fn insert_graph(&mut self, name: String, estimated_objects: usize, role: GraphRole) -> GraphId {
        let mut graph = Graph::new(name, self.id, estimated_objects).with_role(role);
        graph.set_painting(self.is_painting());
        debug!(sub_plot = self.id, graph = %graph.name(), ?role, "Adding graph");
        self.graphs.insert_tail(graph)
    }
}
