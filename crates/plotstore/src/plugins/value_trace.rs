//! Value trace producer
//!
//! Plots `Time:<int> Value:<int>` rows as one polyline. Rows without both
//! fields are skipped.

use anyhow::{Context, Result};
use tracing::trace;

use super::text_parser::RowFields;
use crate::plot::{GraphId, Plot, PlotProducer, SubPlotId};

pub const VALUE_SUB_PLOT: &str = "Value trace";
pub const VALUE_GRAPH: &str = "Value graph";
pub const VALUE_GRAPH_ESTIMATE: usize = 1000;

#[derive(Debug, Default)]
pub struct ValueTraceProducer {
    sub_plot: SubPlotId,
    graph: Option<GraphId>,
    previous: Option<(i32, i32)>,
}

impl ValueTraceProducer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlotProducer for ValueTraceProducer {
    fn name(&self) -> &'static str {
        "value"
    }

    fn register(&mut self, plot: &mut Plot) -> Result<()> {
        plot.set_title("Value trace", "Time");
        self.sub_plot = plot.register_sub_plot(VALUE_SUB_PLOT, "Unit");
        Ok(())
    }

    fn begin(&mut self, plot: &mut Plot) -> Result<()> {
        self.graph = Some(plot.add_graph(self.sub_plot, VALUE_GRAPH, VALUE_GRAPH_ESTIMATE)?);
        self.previous = None;
        Ok(())
    }

    fn row(&mut self, plot: &mut Plot, row_index: i32, text: &str) -> Result<()> {
        let fields = RowFields::parse(text);
        let (time, value) = match (fields.int("Time"), fields.int("Value")) {
            (Some(time), Some(value)) => (time, value),
            _ => {
                trace!(row = row_index, "No sample on row");
                return Ok(());
            }
        };

        let (prev_time, prev_value) = self.previous.unwrap_or((time, value));
        let graph = self.graph.context("value graph missing, begin not called")?;
        plot.graph_mut(self.sub_plot, graph)?.add_line(
            f64::from(prev_time),
            f64::from(prev_value),
            f64::from(time),
            f64::from(value),
            row_index,
        );
        self.previous = Some((time, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CancellationToken, Extent};
    use crate::store::GraphicalObject;

    fn run(rows: &[&str]) -> Plot {
        let mut producer = ValueTraceProducer::new();
        let mut plot = Plot::with_producer(&mut producer).unwrap();
        plot.run(&mut producer, rows, &CancellationToken::new())
            .unwrap();
        plot
    }

    #[test]
    fn test_polyline_from_samples() {
        let mut plot = run(&["Time:0 Value:1", "noise", "Time:2 Value:5", "Time:3 Value:2"]);
        assert_eq!(plot.extents(), Some(Extent::new(0.0, 3.0, 1.0, 5.0)));

        let sub_plot = plot.sub_plot_mut(0).unwrap();
        let id = sub_plot.find_graph(VALUE_GRAPH).unwrap();
        let graph = sub_plot.graph_mut(id).unwrap();
        assert_eq!(graph.object_count(), 3);

        let objects: Vec<_> = graph.objects().collect::<Result<_, _>>().unwrap();
        let rows: Vec<i32> = objects.iter().map(|o| o.geometry().row).collect();
        assert_eq!(rows, vec![0, 2, 3]);
        match &objects[1] {
            GraphicalObject::Line { geometry } => {
                assert_eq!((geometry.x1, geometry.y1), (0.0, 1.0));
                assert_eq!((geometry.x2, geometry.y2), (2.0, 5.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negative_time_rejected() {
        let plot = run(&["Time:-1 Value:1", "Time:1 Value:1"]);
        let sub_plot = plot.sub_plot(0).unwrap();
        let (_, graph) = sub_plot.graphs().next().unwrap();
        // first sample refused, second draws from (-1, 1) and is refused too
        assert_eq!(graph.object_count(), 0);
    }

    #[test]
    fn test_rerun_resets_previous_sample() {
        let mut producer = ValueTraceProducer::new();
        let mut plot = Plot::with_producer(&mut producer).unwrap();
        let token = CancellationToken::new();
        plot.run(&mut producer, ["Time:0 Value:0", "Time:10 Value:10"], &token)
            .unwrap();
        plot.run(&mut producer, ["Time:5 Value:3"], &token).unwrap();
        assert_eq!(plot.extents(), Some(Extent::new(5.0, 5.0, 3.0, 3.0)));
    }
}
