//! Interactive `watch` mode: stdin lines drive the chart pipeline.

use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use stockscope_core::{ChartConfig, ChartPipeline, ChartView, FilterSpec, MarketDataClient};
use tracing::debug;

/// How long the loop waits for input before pumping completions.
const POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Filter(&'static str),
    Symbol(String),
    Clear,
    Refresh,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<WatchCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or_default();
    let command = match head.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => WatchCommand::Quit,
        "clear" => WatchCommand::Clear,
        "refresh" => WatchCommand::Refresh,
        "symbol" | "s" => match words.next() {
            Some(sym) => WatchCommand::Symbol(sym.to_ascii_uppercase()),
            None => return Err("usage: symbol <SYM>".into()),
        },
        _ => {
            let name = head.to_ascii_uppercase();
            match FilterSpec::find(&name) {
                Some(spec) => WatchCommand::Filter(spec.name),
                None => {
                    let names: Vec<&str> = FilterSpec::names().collect();
                    return Err(format!(
                        "unknown command '{head}'. Filters: {}; commands: symbol <SYM>, clear, refresh, quit",
                        names.join(", ")
                    ));
                }
            }
        }
    };

    if words.next().is_some() {
        return Err(format!("unexpected arguments after '{head}'"));
    }
    Ok(Some(command))
}

/// One-line rendering of a published view.
pub fn describe_view(view: &ChartView) -> String {
    if view.loading {
        return "loading...".to_string();
    }
    if let Some(error) = &view.error {
        return format!("error: {error}");
    }
    match (view.data.first(), view.data.last()) {
        (Some(first), Some(last)) => format!(
            "{} points  {} {}  ->  {} {}",
            view.data.len(),
            first.date,
            first.value,
            last.date,
            last.value
        ),
        _ => "no data".to_string(),
    }
}

pub fn run(
    client: Arc<dyn MarketDataClient>,
    config: &ChartConfig,
    symbol: Option<String>,
) -> Result<()> {
    let mut pipeline = ChartPipeline::new(client, config);
    pipeline.subscribe(|view| println!("  {}", describe_view(view)));

    println!("Filters:  {}", pipeline.filter_names().join(" "));
    println!("Commands: <filter> | symbol <SYM> | clear | refresh | quit");
    if let Some(symbol) = symbol {
        pipeline.set_symbol(Some(&symbol.to_ascii_uppercase()));
        print_inputs(&pipeline);
    }

    let (tx, rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("stockscope-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;

    loop {
        match rx.recv_timeout(POLL) {
            Ok(line) => match parse_command(&line) {
                Ok(Some(WatchCommand::Quit)) => break,
                Ok(Some(command)) => {
                    apply(&mut pipeline, command);
                    print_inputs(&pipeline);
                }
                Ok(None) => {}
                Err(message) => eprintln!("{message}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Input closed: let the current request settle, then exit.
                debug!("stdin closed");
                pipeline.wait_next(None);
                break;
            }
        }
        pipeline.pump();
    }

    pipeline.shutdown();
    Ok(())
}

fn apply(pipeline: &mut ChartPipeline, command: WatchCommand) {
    match command {
        WatchCommand::Filter(name) => {
            pipeline.set_filter(name);
        }
        WatchCommand::Symbol(symbol) => {
            pipeline.set_symbol(Some(&symbol));
        }
        WatchCommand::Clear => {
            pipeline.set_symbol(None);
        }
        WatchCommand::Refresh => {
            pipeline.refresh();
        }
        WatchCommand::Quit => {}
    }
}

fn print_inputs(pipeline: &ChartPipeline) {
    println!(
        "[{} {}]",
        pipeline.symbol().unwrap_or("-"),
        pipeline.filter()
    );
}
