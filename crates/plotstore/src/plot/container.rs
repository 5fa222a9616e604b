//! Plot: registered sub-plots plus the producer pass lifecycle
//!
//! A pass is `clean -> begin -> row* -> end`. Sub-plots survive `clean`,
//! their graphs and records do not.

use anyhow::{Context, Result};
use tracing::{debug, info, span, warn, Level};

use super::graph::Graph;
use super::sub_plot::{GraphId, SubPlot};
use crate::core::{
    CancellationToken, Extent, IntrusiveList, NodeId, StoreError, SubPlotProperties,
};

/// Index of a sub-plot in registration order
pub type SubPlotId = usize;

/// Rows processed between two cancellation checks
pub const CANCEL_POLL_INTERVAL: usize = 256;

/// Something that turns log rows into graphical objects
pub trait PlotProducer {
    /// Short name used on the command line and in logs
    fn name(&self) -> &'static str;

    /// One-time setup: title and sub-plots
    fn register(&mut self, plot: &mut Plot) -> Result<()>;

    /// Start of a pass; graphs are created here
    fn begin(&mut self, plot: &mut Plot) -> Result<()>;

    /// Called once per log row
    fn row(&mut self, plot: &mut Plot, row_index: i32, text: &str) -> Result<()>;

    /// End of a pass, before extents are computed
    fn end(&mut self, _plot: &mut Plot) -> Result<()> {
        Ok(())
    }
}

/// How a pass finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { rows: usize },
    /// Cancelled before `rows`; the plot has been cleaned
    Cancelled { rows: usize },
}

#[derive(Debug)]
pub struct Plot {
    title: String,
    x_axis_label: String,
    sub_plots: IntrusiveList<SubPlot>,
    registry: Vec<NodeId>,
    extents: Option<Extent>,
}

impl Plot {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            x_axis_label: String::new(),
            sub_plots: IntrusiveList::new(),
            registry: Vec::new(),
            extents: None,
        }
    }

    /// Plot set up by a producer's `register`
    pub fn with_producer(producer: &mut dyn PlotProducer) -> Result<Self> {
        let mut plot = Self::new();
        producer
            .register(&mut plot)
            .with_context(|| format!("registering producer '{}'", producer.name()))?;
        Ok(plot)
    }

    pub fn set_title(&mut self, title: impl Into<String>, x_axis_label: impl Into<String>) {
        self.title = title.into();
        self.x_axis_label = x_axis_label.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn x_axis_label(&self) -> &str {
        &self.x_axis_label
    }

    pub fn register_sub_plot(
        &mut self,
        title: impl Into<String>,
        y_label: impl Into<String>,
    ) -> SubPlotId {
        let id = self.registry.len();
        let node = self.sub_plots.insert_tail(SubPlot::new(id, title, y_label));
        self.registry.push(node);
        debug!(sub_plot = id, "Registered sub-plot");
        id
    }

    pub fn set_sub_plot_properties(
        &mut self,
        id: SubPlotId,
        properties: SubPlotProperties,
    ) -> Result<(), StoreError> {
        self.sub_plot_mut(id)?.set_properties(properties);
        Ok(())
    }

    pub fn sub_plot(&self, id: SubPlotId) -> Result<&SubPlot, StoreError> {
        self.registry
            .get(id)
            .and_then(|node| self.sub_plots.get(*node))
            .ok_or(StoreError::UnknownSubPlot { id })
    }

    pub fn sub_plot_mut(&mut self, id: SubPlotId) -> Result<&mut SubPlot, StoreError> {
        let node = *self
            .registry
            .get(id)
            .ok_or(StoreError::UnknownSubPlot { id })?;
        self.sub_plots
            .get_mut(node)
            .ok_or(StoreError::UnknownSubPlot { id })
    }

    /// Sub-plots in registration order
    pub fn sub_plots(&self) -> impl Iterator<Item = &SubPlot> {
        self.sub_plots.iter().map(|(_, s)| s)
    }

    pub fn sub_plot_count(&self) -> usize {
        self.sub_plots.len()
    }

    pub fn add_graph(
        &mut self,
        sub_plot: SubPlotId,
        name: impl Into<String>,
        estimated_objects: usize,
    ) -> Result<GraphId, StoreError> {
        Ok(self.sub_plot_mut(sub_plot)?.add_graph(name, estimated_objects))
    }

    pub fn add_decorator(&mut self, sub_plot: SubPlotId) -> Result<&mut Graph, StoreError> {
        Ok(self.sub_plot_mut(sub_plot)?.add_decorator())
    }

    pub fn add_sequence_diagram(
        &mut self,
        sub_plot: SubPlotId,
        name: impl Into<String>,
        estimated_objects: usize,
    ) -> Result<GraphId, StoreError> {
        Ok(self
            .sub_plot_mut(sub_plot)?
            .add_sequence_diagram(name, estimated_objects))
    }

    /// Register a sub-plot label, truncated to 255 bytes
    pub fn add_label(&mut self, sub_plot: SubPlotId, text: &str) -> Result<i32, StoreError> {
        self.sub_plot_mut(sub_plot)?.add_label(text)
    }

    pub fn graph_mut(&mut self, sub_plot: SubPlotId, graph: GraphId) -> Result<&mut Graph, StoreError> {
        self.sub_plot_mut(sub_plot)?
            .graph_mut(graph)
            .ok_or_else(|| StoreError::unknown_graph(format!("{:?} in sub-plot {}", graph, sub_plot)))
    }

    /// Union of all sub-plot extents from the last `end`
    pub fn extents(&self) -> Option<Extent> {
        self.extents
    }

    pub fn begin(&mut self) {
        info!(title = %self.title, sub_plots = self.sub_plots.len(), "Plot pass begin");
    }

    /// Finish a pass: compute every sub-plot's extents and the plot's
    pub fn end(&mut self) -> Option<Extent> {
        let mut total: Option<Extent> = None;
        for node in self.sub_plots.ids() {
            if let Some(extents) = self.sub_plots.get_mut(node).and_then(SubPlot::calc_extents) {
                total = Some(total.map_or(extents, |t| t.union(&extents)));
            }
        }
        self.extents = total;
        info!(title = %self.title, extents = ?self.extents, "Plot pass end");
        self.extents
    }

    /// Discard every graph and record; registered sub-plots stay
    pub fn clean(&mut self) {
        for node in self.sub_plots.ids() {
            if let Some(sub_plot) = self.sub_plots.get_mut(node) {
                sub_plot.clean();
            }
        }
        self.extents = None;
    }

    /// Run one full pass of `producer` over `rows`
    ///
    /// Cancellation is checked every [`CANCEL_POLL_INTERVAL`] rows.
    pub fn run<I, S>(
        &mut self,
        producer: &mut dyn PlotProducer,
        rows: I,
        token: &CancellationToken,
    ) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_with_poll(producer, rows, token, CANCEL_POLL_INTERVAL)
    }

    /// Like [`Plot::run`], checking `token` every `poll_interval` rows (at least every row)
    pub fn run_with_poll<I, S>(
        &mut self,
        producer: &mut dyn PlotProducer,
        rows: I,
        token: &CancellationToken,
        poll_interval: usize,
    ) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let poll_interval = poll_interval.max(1);
        let span = span!(Level::INFO, "plot_run", producer = producer.name());
        let _enter = span.enter();

        self.clean();
        self.begin();
        producer
            .begin(self)
            .with_context(|| format!("starting pass of '{}'", producer.name()))?;

        let mut processed = 0;
        for (index, row) in rows.into_iter().enumerate() {
            if index % poll_interval == 0 && token.is_cancelled() {
                warn!(rows = index, "Pass cancelled, discarding partial plot");
                self.clean();
                return Ok(RunOutcome::Cancelled { rows: index });
            }
            let row_index = i32::try_from(index).context("row index overflow")?;
            producer
                .row(self, row_index, row.as_ref())
                .with_context(|| format!("row {}", index))?;
            processed = index + 1;
        }

        producer
            .end(self)
            .with_context(|| format!("ending pass of '{}'", producer.name()))?;
        self.end();
        info!(rows = processed, "Pass completed");
        Ok(RunOutcome::Completed { rows: processed })
    }
}

impl Default for Plot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Draws one unit line per row on a single graph
    struct StepProducer {
        sub_plot: SubPlotId,
        graph: Option<GraphId>,
    }

    impl PlotProducer for StepProducer {
        fn name(&self) -> &'static str {
            "step"
        }

        fn register(&mut self, plot: &mut Plot) -> Result<()> {
            plot.set_title("Steps", "time");
            self.sub_plot = plot.register_sub_plot("steps", "value");
            Ok(())
        }

        fn begin(&mut self, plot: &mut Plot) -> Result<()> {
            self.graph = Some(plot.add_graph(self.sub_plot, "step graph", 16)?);
            Ok(())
        }

        fn row(&mut self, plot: &mut Plot, row_index: i32, _text: &str) -> Result<()> {
            let graph = self.graph.context("no graph")?;
            let x = f64::from(row_index);
            plot.graph_mut(self.sub_plot, graph)?
                .add_line(x, 0.0, x + 1.0, 1.0, row_index);
            Ok(())
        }
    }

    fn producer() -> StepProducer {
        StepProducer {
            sub_plot: 0,
            graph: None,
        }
    }

    #[test]
    fn test_run_completes_and_sets_extents() {
        let mut producer = producer();
        let mut plot = Plot::with_producer(&mut producer).unwrap();
        let rows = vec!["a", "b", "c"];
        let outcome = plot.run(&mut producer, &rows, &CancellationToken::new()).unwrap();
        assert_eq!(outcome, RunOutcome::Completed { rows: 3 });
        assert_eq!(plot.extents(), Some(Extent::new(0.0, 3.0, 0.0, 1.0)));
        assert_eq!(plot.title(), "Steps");
        assert_eq!(plot.x_axis_label(), "time");
    }

    #[test]
    fn test_second_pass_starts_clean() {
        let mut producer = producer();
        let mut plot = Plot::with_producer(&mut producer).unwrap();
        let token = CancellationToken::new();
        plot.run(&mut producer, ["a", "b"], &token).unwrap();
        plot.run(&mut producer, ["a"], &token).unwrap();
        let sub_plot = plot.sub_plot(0).unwrap();
        assert_eq!(sub_plot.graph_count(), 1);
        let (_, graph) = sub_plot.graphs().next().unwrap();
        assert_eq!(graph.object_count(), 1);
    }

    #[test]
    fn test_cancelled_run_discards_partial_data() {
        let mut producer = producer();
        let mut plot = Plot::with_producer(&mut producer).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let rows: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
        let outcome = plot.run(&mut producer, &rows, &token).unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled { rows: 0 });
        assert_eq!(plot.sub_plot(0).unwrap().graph_count(), 0);
        assert_eq!(plot.extents(), None);
    }

    #[test]
    fn test_run_with_poll_cancels_mid_pass() {
        let mut producer = producer();
        let mut plot = Plot::with_producer(&mut producer).unwrap();
        let token = CancellationToken::new();
        let trigger = token.clone();
        let rows = (0..10).map(|i| {
            if i == 5 {
                trigger.cancel();
            }
            i.to_string()
        });
        let outcome = plot.run_with_poll(&mut producer, rows, &token, 1).unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled { rows: 5 });
        assert_eq!(plot.sub_plot(0).unwrap().graph_count(), 0);
    }

    #[test]
    fn test_default_poll_misses_late_cancel_on_short_input() {
        let mut producer = producer();
        let mut plot = Plot::with_producer(&mut producer).unwrap();
        let token = CancellationToken::new();
        let trigger = token.clone();
        let rows = (0..10).map(|i| {
            if i == 5 {
                trigger.cancel();
            }
            i.to_string()
        });
        let outcome = plot.run(&mut producer, rows, &token).unwrap();
        assert_eq!(outcome, RunOutcome::Completed { rows: 10 });
    }

    #[test]
    fn test_unknown_sub_plot() {
        let mut plot = Plot::new();
        assert!(matches!(
            plot.add_graph(3, "g", 1),
            Err(StoreError::UnknownSubPlot { id: 3 })
        ));
        assert!(plot.set_sub_plot_properties(0, SubPlotProperties::SEQUENCE).is_err());
    }

    #[test]
    fn test_add_label_truncates() {
        let mut plot = Plot::new();
        let id = plot.register_sub_plot("s", "y");
        let idx = plot.add_label(id, &"z".repeat(300)).unwrap();
        assert_eq!(plot.sub_plot(id).unwrap().label(idx).unwrap().len(), 255);
    }
}
