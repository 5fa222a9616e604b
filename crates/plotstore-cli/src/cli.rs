//! Command-line interface for the plotstore utility
//!
//! Runs a producer over a text log and prints what ended up in the store.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::colorizer::colorize_output;
use crate::report::PlotReport;
use plotstore::plot::Plot;
use plotstore::plugins::{producer_by_name, producer_names};
use plotstore::CancellationToken;

/// Plotstore - run plot producers over text logs
#[derive(Parser)]
#[command(name = "plotstore")]
#[command(about = "Run plot producers over text logs and dump the stored graphical objects")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error); PLOTSTORE_LOG_LEVEL otherwise
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Set log format (compact|pretty|json); PLOTSTORE_LOG_FORMAT otherwise
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a producer over a log file and print the stored objects
    Run {
        /// Log file to read, one row per line (use - for stdin)
        input: PathBuf,

        /// Producer turning rows into graphical objects
        #[arg(short, long, value_enum, default_value_t = ProducerChoice::Value)]
        producer: ProducerChoice,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,

        /// Request cancellation once this many rows have been read
        #[arg(long)]
        cancel_after: Option<usize>,

        /// When to use colors in the text report
        #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
        color: ColorChoice,
    },

    /// List the available producers
    Producers {
        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Producers selectable on the command line
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum ProducerChoice {
    Value,
    Sequence,
}

impl ProducerChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducerChoice::Value => "value",
            ProducerChoice::Sequence => "sequence",
        }
    }
}

/// When to colorize output
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if output is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Settings of one `run` invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub producer: ProducerChoice,
    pub json: bool,
    pub cancel_after: Option<usize>,
    pub colorize: bool,
}

/// Main CLI application
#[derive(Debug, Default)]
pub struct PlotstoreApp;

impl PlotstoreApp {
    pub fn new() -> Self {
        Self
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        if cli.verbose {
            eprintln!("Plotstore v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Run {
                input,
                producer,
                output,
                json,
                cancel_after,
                color,
            } => {
                let content = self.read_input(&input)?;
                if cli.verbose {
                    eprintln!("Read {} bytes of input", content.len());
                }
                let options = RunOptions {
                    producer,
                    json,
                    cancel_after,
                    colorize: !json && self.should_colorize(output.as_deref(), color),
                };
                let rendered = self.run_command(&content, &options)?;
                self.write_output(output.as_deref(), &rendered)
            }
            Commands::Producers { json } => {
                let listing = self.producers_command(json)?;
                self.write_output(None, &listing)
            }
        }
    }

    /// Run the selected producer over `content` and render the report
    pub fn run_command(&self, content: &str, options: &RunOptions) -> Result<String> {
        let name = options.producer.as_str();
        let mut producer =
            producer_by_name(name).ok_or_else(|| anyhow!("Unknown producer '{}'", name))?;
        let mut plot = Plot::with_producer(producer.as_mut())?;

        let token = CancellationToken::new();
        let trigger = token.clone();
        let cancel_after = options.cancel_after;
        let rows = content.lines().enumerate().map(move |(index, row)| {
            if Some(index) == cancel_after {
                debug!(rows = index, "Cancel threshold reached");
                trigger.cancel();
            }
            row
        });

        // Poll every row so the threshold is honoured exactly
        let outcome = plot
            .run_with_poll(producer.as_mut(), rows, &token, 1)
            .with_context(|| format!("Producer '{}' failed", name))?;
        info!(producer = name, ?outcome, "Run finished");

        let report = PlotReport::collect(name, &mut plot, outcome)?;
        if options.json {
            return Ok(serde_json::to_string_pretty(&report)?);
        }
        let text = report.to_text();
        Ok(if options.colorize {
            colorize_output(&text)
        } else {
            text
        })
    }

    /// List producer names, one per line or as JSON
    pub fn producers_command(&self, json: bool) -> Result<String> {
        if json {
            let listing = serde_json::json!({
                "producers": producer_names(),
                "total": producer_names().len(),
            });
            return Ok(serde_json::to_string_pretty(&listing)?);
        }
        let mut text = String::from("Available producers:\n");
        for name in producer_names() {
            text.push_str("  ");
            text.push_str(name);
            text.push('\n');
        }
        Ok(text)
    }

    /// Determine if we should colorize based on color choice and output destination
    fn should_colorize(&self, output: Option<&Path>, color: ColorChoice) -> bool {
        match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if std::env::var("NO_COLOR").is_ok() {
                    return false;
                }
                match output {
                    None => crossterm::tty::IsTty::is_tty(&std::io::stdout()),
                    Some(p) if p.to_str() == Some("-") => {
                        crossterm::tty::IsTty::is_tty(&std::io::stdout())
                    }
                    Some(_) => false,
                }
            }
        }
    }

    /// Read input from a file, or stdin for `-`
    pub fn read_input(&self, input: &Path) -> Result<String> {
        if input.to_string_lossy() == "-" {
            let mut content = String::new();
            io::stdin().read_to_string(&mut content)?;
            return Ok(content);
        }
        fs::read_to_string(input)
            .map_err(|e| anyhow!("Failed to read input file '{}': {}", input.display(), e))
    }

    /// Write output to a file, or stdout for `None` and `-`
    pub fn write_output(&self, output: Option<&Path>, content: &str) -> Result<()> {
        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                if !content.is_empty() && !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
            }
        }
        Ok(())
    }
}
