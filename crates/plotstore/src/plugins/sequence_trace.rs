//! Sequence trace producer
//!
//! Rows describe life-lines and the traffic between them:
//!
//! ```text
//! lifeline 1
//! lifeline 2
//! time:1 op:event          id:100        dest:1
//! time:2 op:msg            id:200  src:1 dest:2
//! time:4 op:exec_msg       id:1000 src:1 dest:2 exec_id:read   exec_duration:2
//! time:8 op:sync_exec_msg  id:1003 src:1 dest:2 exec_id:reload exec_duration:2
//! ```
//!
//! `exec_msg` starts an execution bar on `dest`. `sync_exec_msg` does the
//! same and adds a "done" return message when the execution ends.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::debug;

use super::text_parser::RowFields;
use crate::core::{Rgb, SubPlotProperties};
use crate::plot::{GraphId, LifeLine, Plot, PlotProducer, SequenceDiagram, SubPlotId};

pub const SEQUENCE_SUB_PLOT: &str = "Sequence Diagram";
pub const SEQUENCE_DIAGRAM: &str = "Test";
pub const SEQUENCE_DIAGRAM_ESTIMATE: usize = 1000;
/// Half height of a life-line around its index
pub const LIFELINE_HALF_HEIGHT: f64 = 0.25;

const MESSAGE_COLOR: Rgb = Rgb::new(90, 90, 90);
const RETURN_LABEL: &str = "done";

/// Colour of life-line `index`
pub fn life_line_color(index: i32) -> Rgb {
    let shade = (20 + 20 * i64::from(index)).clamp(0, 255) as u8;
    Rgb::new(85, shade, shade)
}

/// Display name of an execution message id
pub fn message_name(id: Option<i32>) -> &'static str {
    match id {
        Some(1000) => "Start",
        Some(1001) => "Stop",
        Some(1003) => "Reload",
        _ => "???",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Event,
    Message,
    ExecMessage { sync: bool },
}

impl Op {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "event" => Some(Op::Event),
            "msg" => Some(Op::Message),
            "exec_msg" => Some(Op::ExecMessage { sync: false }),
            "sync_exec_msg" => Some(Op::ExecMessage { sync: true }),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SequenceTraceProducer {
    sub_plot: SubPlotId,
    diagram: Option<GraphId>,
    life_lines: HashMap<i32, LifeLine>,
}

impl SequenceTraceProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Life-lines declared so far in this pass
    pub fn life_line_count(&self) -> usize {
        self.life_lines.len()
    }

    fn diagram<'p>(&self, plot: &'p mut Plot) -> Result<SequenceDiagram<'p>> {
        let id = self
            .diagram
            .context("sequence diagram missing, begin not called")?;
        Ok(plot.sub_plot_mut(self.sub_plot)?.sequence_diagram(id)?)
    }

    fn life_line(&self, fields: &RowFields<'_>, key: &str, row: i32) -> Option<LifeLine> {
        let index = fields.int(key)?;
        let life_line = self.life_lines.get(&index).copied();
        if life_line.is_none() {
            debug!(row, index, "Row refers to an undeclared life-line");
        }
        life_line
    }

    fn declare(&mut self, plot: &mut Plot, index: i32) -> Result<()> {
        let name = format!("LifeLine:{}", index);
        let center = f64::from(index);
        let handle = self.diagram(plot)?.add_life_line(
            center - LIFELINE_HALF_HEIGHT,
            center + LIFELINE_HALF_HEIGHT,
            &name,
            life_line_color(index),
        );
        if let Some(handle) = handle {
            self.life_lines.insert(index, handle);
        }
        Ok(())
    }

    fn operation(&self, plot: &mut Plot, op: Op, fields: &RowFields<'_>, row: i32) -> Result<()> {
        let Some(time) = fields.int("time") else {
            debug!(row, "Operation without time");
            return Ok(());
        };
        let x = f64::from(time);
        let Some(dest) = self.life_line(fields, "dest", row) else {
            return Ok(());
        };

        if op == Op::Event {
            let label = fields.get("id").unwrap_or_default();
            self.diagram(plot)?
                .add_event(dest, x, row, label, MESSAGE_COLOR, false);
            return Ok(());
        }

        let Some(src) = self.life_line(fields, "src", row) else {
            return Ok(());
        };
        let mut diagram = self.diagram(plot)?;

        match op {
            Op::Message => {
                let label = fields.get("id").unwrap_or_default();
                diagram.add_message(src, x, dest, row, label, MESSAGE_COLOR, false, false);
            }
            Op::ExecMessage { sync } => {
                let name = message_name(fields.int("id"));
                let exec_name = fields.get("exec_id").unwrap_or_default();
                let end = x + f64::from(fields.int("exec_duration").unwrap_or(0));

                diagram.add_message(src, x, dest, row, name, MESSAGE_COLOR, sync, true);
                diagram.add_execution(dest, x, end, row, exec_name, MESSAGE_COLOR);
                if sync {
                    diagram.add_return_message(
                        dest,
                        end,
                        src,
                        row,
                        RETURN_LABEL,
                        MESSAGE_COLOR,
                        true,
                        false,
                    );
                }
            }
            Op::Event => {}
        }
        Ok(())
    }
}

impl PlotProducer for SequenceTraceProducer {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn register(&mut self, plot: &mut Plot) -> Result<()> {
        plot.set_title("Sequence trace", "Time");
        self.sub_plot = plot.register_sub_plot(SEQUENCE_SUB_PLOT, "Unit");
        plot.set_sub_plot_properties(self.sub_plot, SubPlotProperties::SEQUENCE)?;
        Ok(())
    }

    fn begin(&mut self, plot: &mut Plot) -> Result<()> {
        self.life_lines.clear();
        self.diagram = Some(plot.add_sequence_diagram(
            self.sub_plot,
            SEQUENCE_DIAGRAM,
            SEQUENCE_DIAGRAM_ESTIMATE,
        )?);
        Ok(())
    }

    fn row(&mut self, plot: &mut Plot, row_index: i32, text: &str) -> Result<()> {
        let fields = RowFields::parse(text);
        if let Some(index) = fields.lifeline() {
            return self.declare(plot, index);
        }
        match fields.get("op").and_then(Op::parse) {
            Some(op) => self.operation(plot, op, &fields, row_index),
            None => Ok(()),
        }
    }
}
