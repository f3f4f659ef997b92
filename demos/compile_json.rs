//! Compile a JSON command stream and dump the resulting sections.
//!
//! A front end serializes its `ParsedChart` as JSON; this example compiles it, prints every
//! section of every course, and renders the diagnostics against the chart text when it is
//! given.
//!
//! Usage:
//!   cargo run --example `compile_json` --features serde -- <`chart.json`> [--source <`chart.tja`>]

use std::path::PathBuf;

use clap::Parser;
use tja_rs::{
    diagnostics::emit_diagnostics,
    dump::section_print,
    tja::{ParsedChart, compile},
};

#[derive(Debug, Parser)]
#[command(about = "Compile a JSON command stream of a TJA chart")]
struct Args {
    /// The serialized `ParsedChart`.
    chart: PathBuf,
    /// The chart text, used to render diagnostics with context.
    #[arg(long)]
    source: Option<PathBuf>,
    /// Print the time of every event in seconds as well.
    #[arg(long)]
    seconds: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let json = std::fs::read_to_string(&args.chart)?;
    let chart: ParsedChart = serde_json::from_str(&json)?;
    let output = compile(&chart);

    let name = chart.filename.as_deref().unwrap_or("<unknown>");
    match &args.source {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            emit_diagnostics(name, &text, &output.diagnostics);
        }
        None => {
            for diagnostic in &output.diagnostics {
                eprintln!("{}", diagnostic.render(name));
            }
        }
    }

    let Some(set) = output.courseset else {
        return Err("chart did not compile".into());
    };
    println!("# {}", set.title());
    for course in set.courses() {
        println!("## {:?} level {}", course.class(), course.level());
        for (side, branch, section) in course.sections() {
            println!("### {side:?} {branch} ({} ticks per measure)", section.tickrate());
            if args.seconds {
                for event in section {
                    println!("{:>10.4}s {:?}", section.event_seconds(event), event.event_type());
                }
            } else {
                print!("{}", section_print(section));
            }
        }
    }
    Ok(())
}
