//! Serializable snapshot of a finished plot pass

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;

use plotstore::plot::{Graph, Plot, RunOutcome};
use plotstore::store::GraphicalObject;
use plotstore::Extent;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ObjectReport {
    pub kind: String,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub row: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl From<&GraphicalObject> for ObjectReport {
    fn from(object: &GraphicalObject) -> Self {
        let g = object.geometry();
        Self {
            kind: object.kind().to_string(),
            x1: g.x1,
            y1: g.y1,
            x2: g.x2,
            y2: g.y2,
            row: g.row,
            label: object.label().map(|l| l.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphReport {
    pub name: String,
    pub object_count: usize,
    pub extents: Option<Extent>,
    pub objects: Vec<ObjectReport>,
}

impl GraphReport {
    /// Replays every record of `graph`; a corrupt chunk fails the report
    fn collect(graph: &mut Graph) -> Result<Self> {
        let objects = graph
            .objects()
            .map(|object| object.map(|o| ObjectReport::from(&o)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: graph.name().to_string(),
            object_count: graph.object_count(),
            extents: graph.extents(),
            objects,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubPlotReport {
    pub id: usize,
    pub title: String,
    pub y_label: String,
    pub properties: String,
    pub extents: Option<Extent>,
    pub graphs: Vec<GraphReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decorator: Option<GraphReport>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlotReport {
    pub producer: String,
    pub title: String,
    pub x_axis_label: String,
    pub cancelled: bool,
    pub rows: usize,
    pub extents: Option<Extent>,
    pub sub_plots: Vec<SubPlotReport>,
}

impl PlotReport {
    pub fn collect(producer: &str, plot: &mut Plot, outcome: RunOutcome) -> Result<Self> {
        let (cancelled, rows) = match outcome {
            RunOutcome::Completed { rows } => (false, rows),
            RunOutcome::Cancelled { rows } => (true, rows),
        };

        let mut sub_plots = Vec::with_capacity(plot.sub_plot_count());
        for id in 0..plot.sub_plot_count() {
            let sub_plot = plot.sub_plot_mut(id)?;
            let mut graphs = Vec::new();
            for graph_id in sub_plot.graph_ids() {
                if let Some(graph) = sub_plot.graph_mut(graph_id) {
                    graphs.push(GraphReport::collect(graph)?);
                }
            }
            let decorator = match sub_plot.decorator_mut() {
                Some(decorator) if decorator.object_count() > 0 => {
                    Some(GraphReport::collect(decorator)?)
                }
                _ => None,
            };
            sub_plots.push(SubPlotReport {
                id,
                title: sub_plot.title().to_string(),
                y_label: sub_plot.y_label().to_string(),
                properties: sub_plot.properties().to_string(),
                extents: sub_plot.extents(),
                graphs,
                decorator,
            });
        }

        Ok(Self {
            producer: producer.to_string(),
            title: plot.title().to_string(),
            x_axis_label: plot.x_axis_label().to_string(),
            cancelled,
            rows,
            extents: plot.extents(),
            sub_plots,
        })
    }

    /// Plain-text rendering, one line per plot, sub-plot, graph and record
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let status = if self.cancelled { "cancelled" } else { "completed" };
        let _ = writeln!(
            out,
            "Plot \"{}\" ({}) {} after {} rows, extents {}",
            self.title,
            self.producer,
            status,
            self.rows,
            extent_text(self.extents.as_ref())
        );
        for sub_plot in &self.sub_plots {
            let _ = writeln!(
                out,
                "  Sub-plot {} \"{}\" [{}] extents {}",
                sub_plot.id,
                sub_plot.title,
                sub_plot.properties,
                extent_text(sub_plot.extents.as_ref())
            );
            for graph in &sub_plot.graphs {
                write_graph(&mut out, "Graph", graph);
            }
            if let Some(decorator) = &sub_plot.decorator {
                write_graph(&mut out, "Decorator", decorator);
            }
        }
        out
    }
}

fn extent_text(extents: Option<&Extent>) -> String {
    match extents {
        Some(e) => format!("[{}, {}] x [{}, {}]", e.x_min, e.x_max, e.y_min, e.y_max),
        None => "empty".to_string(),
    }
}

fn write_graph(out: &mut String, heading: &str, graph: &GraphReport) {
    let _ = writeln!(
        out,
        "    {} \"{}\" {} objects, extents {}",
        heading,
        graph.name,
        graph.object_count,
        extent_text(graph.extents.as_ref())
    );
    for object in &graph.objects {
        let _ = write!(
            out,
            "      {} row {} {},{},{},{}",
            object.kind, object.row, object.x1, object.y1, object.x2, object.y2
        );
        match &object.label {
            Some(label) => {
                let _ = writeln!(out, " \"{}\"", label);
            }
            None => out.push('\n'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(producer: &str, input: &str) -> PlotReport {
        let mut plot = plotstore::run_producer(producer, input).unwrap();
        PlotReport::collect(producer, &mut plot, RunOutcome::Completed { rows: 0 }).unwrap()
    }

    #[test]
    fn test_value_report() {
        let report = report("value", "Time:0 Value:1\nTime:2 Value:3");
        assert_eq!(report.sub_plots.len(), 1);
        let graph = &report.sub_plots[0].graphs[0];
        assert_eq!(graph.name, "Value graph");
        assert_eq!(graph.objects.len(), 2);
        assert!(report.sub_plots[0].decorator.is_none());
    }

    #[test]
    fn test_sequence_report_has_decorator() {
        let report = report(
            "sequence",
            "lifeline 1\nlifeline 2\ntime:5 op:msg id:9 src:1 dest:2",
        );
        let sub_plot = &report.sub_plots[0];
        assert_eq!(sub_plot.properties, "sequence");
        assert_eq!(sub_plot.decorator.as_ref().unwrap().objects.len(), 4);
        assert_eq!(
            sub_plot.graphs[0].objects[0].label.as_deref(),
            Some("9")
        );
    }

    #[test]
    fn test_text_rendering() {
        let text = report("value", "Time:0 Value:1\nTime:2 Value:3").to_text();
        assert!(text.starts_with("Plot \"Value trace\" (value) completed"));
        assert!(text.contains("Graph \"Value graph\" 2 objects"));
        assert!(text.contains("row 1 0,1,2,3"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(report("value", "Time:1 Value:1")).unwrap();
        assert_eq!(json["producer"], "value");
        assert_eq!(json["cancelled"], false);
        assert_eq!(json["sub_plots"][0]["graphs"][0]["object_count"], 1);
        assert!(json["sub_plots"][0].get("decorator").is_none());
    }

    #[test]
    fn test_json_extents_are_bounds() {
        let json = serde_json::to_value(report("value", "Time:0 Value:1\nTime:2 Value:3")).unwrap();
        let extents = &json["sub_plots"][0]["graphs"][0]["extents"];
        assert_eq!(extents["x_min"], 0.0);
        assert_eq!(extents["x_max"], 2.0);
        assert_eq!(extents["y_max"], 3.0);
    }
}
