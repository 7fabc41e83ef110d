// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use datapoint_rs::{DataPoint, ReducerInput, ResolveOptions};
use dotenv::dotenv;
use serde_json::{Map, Value};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a reducer against a JSON input
    Transform {
        /// Entity definitions file (YAML or JSON)
        #[arg(short, long)]
        file: Option<String>,

        /// Entity id or JSON reducer source, e.g. `hash:person` or `"$a.b"`
        #[arg(short, long)]
        reducer: String,

        /// JSON input value
        #[arg(short, long, default_value = "null")]
        input: String,

        /// JSON object made available as `$..locals`
        #[arg(short, long)]
        locals: Option<String>,

        /// Log per-entity timings
        #[arg(short, long)]
        trace: bool,

        /// Print the whole accumulator instead of just the value
        #[arg(long)]
        accumulator: bool,
    },
    /// Validate a definitions file and list its entities
    Check {
        /// Entity definitions file (YAML or JSON)
        #[arg(short, long)]
        file: String,
    },
}

/// A bare id or path is used as is; anything else must be JSON
fn parse_reducer(source: &str) -> ReducerInput {
    serde_json::from_str::<Value>(source)
        .map(ReducerInput::from)
        .unwrap_or_else(|_| ReducerInput::from(source))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Transform {
            file,
            reducer,
            input,
            locals,
            trace,
            accumulator,
        } => {
            let dp = DataPoint::new()?;
            if let Some(file) = file {
                dp.load_file(&file).await?;
            }

            let input: Value = serde_json::from_str(&input)?;
            let locals: Map<String, Value> = match locals {
                Some(locals) => serde_json::from_str(&locals)?,
                None => Map::new(),
            };
            let options = ResolveOptions::new().with_locals(locals).with_trace(trace);

            let acc = dp.transform(parse_reducer(&reducer), input, options).await?;
            let out = if accumulator {
                acc.to_json()
            } else {
                acc.value
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Check { file } => {
            let dp = DataPoint::new()?;
            let count = dp.load_file(&file).await?;
            println!("{} entities OK", count);
            for id in dp.entities().ids().await {
                println!("  {}", id);
            }
        }
    }

    Ok(())
}
