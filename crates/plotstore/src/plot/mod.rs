//! Plot layer: graphs, sub-plots, sequence diagrams and the pass runner

mod container;
mod graph;
mod sequence;
mod sub_plot;

pub use container::*;
pub use graph::*;
pub use sequence::*;
pub use sub_plot::*;
