//! Terminal colorization for the text report
//!
//! Applies ANSI escape codes using crossterm:
//! - Plot headers: Cyan
//! - Sub-plot headers: Magenta
//! - Graph and decorator headers: Green
//! - Record kinds: Yellow
//! - Quoted labels: default colour

use crossterm::style::{Color, Stylize};

const KINDS: &[&str] = &[
    "lifeline-line",
    "lifeline-box",
    "line-ex",
    "box-ex",
    "line",
    "box",
];

pub fn colorize_output(input: &str) -> String {
    let mut result = String::with_capacity(input.len() * 2);

    for line in input.lines() {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        result.push_str(indent);

        let heading = [
            ("Plot ", Color::Cyan),
            ("Sub-plot ", Color::Magenta),
            ("Graph ", Color::Green),
            ("Decorator ", Color::Green),
        ]
        .into_iter()
        .find(|(prefix, _)| trimmed.starts_with(prefix));

        match heading {
            Some((_, color)) => result.push_str(&format!("{}", trimmed.to_string().with(color))),
            None => result.push_str(&colorize_record(trimmed)),
        }
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    result
}

fn colorize_record(line: &str) -> String {
    let kind = line.split(' ').next().unwrap_or_default();
    if KINDS.contains(&kind) {
        format!("{}{}", kind.to_string().with(Color::Yellow), &line[kind.len()..])
    } else {
        line.to_string()
    }
}
