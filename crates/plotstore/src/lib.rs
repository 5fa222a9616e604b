//! Plotstore - chunked append-only storage for graphical objects
//!
//! Producers turn rows of a text log into lines, boxes and sequence-diagram
//! elements. Every graph stores its records in a chain of byte chunks with
//! guard tags around each record, so records can be replayed in insertion
//! order and patched in place.
//!
//! # Quick Start
//!
//! ```rust
//! use plotstore::prelude::*;
//!
//! let mut plot = Plot::new();
//! let sub_plot = plot.register_sub_plot("Values", "Unit");
//! let graph = plot.add_graph(sub_plot, "samples", 16).unwrap();
//!
//! let samples = plot.graph_mut(sub_plot, graph).unwrap();
//! assert!(samples.add_line(0.0, 1.0, 2.0, 5.0, 0));
//! assert!(samples.add_line(2.0, 5.0, 3.0, 2.0, 1));
//!
//! let extents = plot.end().unwrap();
//! assert_eq!(extents, Extent::new(0.0, 3.0, 1.0, 5.0));
//! ```
//!
//! # Producers
//!
//! ```rust
//! use plotstore::prelude::*;
//! use plotstore::plugins::producer_by_name;
//!
//! let mut producer = producer_by_name("value").unwrap();
//! let mut plot = Plot::with_producer(producer.as_mut()).unwrap();
//! let rows = ["Time:0 Value:1", "Time:1 Value:3"];
//! let outcome = plot
//!     .run(producer.as_mut(), rows, &CancellationToken::new())
//!     .unwrap();
//! assert_eq!(outcome, RunOutcome::Completed { rows: 2 });
//! ```

pub mod core;
pub mod plot;
pub mod plugins;
pub mod store;

pub use crate::core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        ArrowFlags, CancellationToken, Extent, LinePattern, Rgb, StoreError, SubPlotProperties,
    };
    pub use crate::plot::{
        Graph, GraphId, LifeLine, Plot, PlotProducer, RunOutcome, SequenceDiagram, SubPlot,
        SubPlotId,
    };
    pub use crate::store::{ChunkManager, GraphicalObject, Label, ObjectKind, StoreConfig};
}

/// Run the named producer over `input` and return the finished plot
///
/// Rows are the lines of `input`.
///
/// # Example
/// ```rust
/// let plot = plotstore::run_producer("sequence", "lifeline 1\nlifeline 2\ntime:3 op:msg id:7 src:1 dest:2").unwrap();
/// assert_eq!(plot.sub_plot_count(), 1);
/// ```
pub fn run_producer(name: &str, input: &str) -> anyhow::Result<plot::Plot> {
    let mut producer = plugins::producer_by_name(name)
        .ok_or_else(|| anyhow::anyhow!("unknown producer '{}'", name))?;
    let mut plot = plot::Plot::with_producer(producer.as_mut())?;
    plot.run(producer.as_mut(), input.lines(), &CancellationToken::new())?;
    Ok(plot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_producer_value() {
        let plot = run_producer("value", "Time:0 Value:1\nTime:4 Value:2").unwrap();
        assert_eq!(plot.extents(), Some(Extent::new(0.0, 4.0, 1.0, 2.0)));
    }

    #[test]
    fn test_run_producer_unknown() {
        let err = run_producer("gantt", "").unwrap_err();
        assert!(err.to_string().contains("gantt"));
    }
}
