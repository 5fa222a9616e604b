//! Reference producers
//!
//! Each producer turns rows of a text log into graphical objects on a
//! [`Plot`](crate::plot::Plot). Producers are looked up by name.

pub mod sequence_trace;
pub mod text_parser;
pub mod value_trace;

pub use sequence_trace::SequenceTraceProducer;
pub use text_parser::{tokenize, RowFields, Token};
pub use value_trace::ValueTraceProducer;

use crate::plot::PlotProducer;

const PRODUCER_NAMES: &[&str] = &["value", "sequence"];

/// Names accepted by [`producer_by_name`]
pub fn producer_names() -> &'static [&'static str] {
    PRODUCER_NAMES
}

pub fn producer_by_name(name: &str) -> Option<Box<dyn PlotProducer>> {
    match name {
        "value" => Some(Box::new(ValueTraceProducer::new())),
        "sequence" => Some(Box::new(SequenceTraceProducer::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_resolves() {
        for name in producer_names() {
            let producer = producer_by_name(name).unwrap();
            assert_eq!(producer.name(), *name);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!(producer_by_name("flowchart").is_none());
    }
}
