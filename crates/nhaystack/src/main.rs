//! NHaystack CLI
//!
//! Loads a station fixture, starts the station worker and runs one
//! Haystack op against it, printing the response grid as JSON.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use haystack_types::{Ref, Value};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use nhaystack::{HaystackConfig, Op, StationWorker};
use nhaystack_station::StationFixture;

/// Project Haystack adapter for a station fixture
#[derive(Parser, Debug)]
#[command(name = "nhaystack")]
#[command(about = "Project Haystack adapter for a station fixture", long_about = None)]
struct Args {
    /// Path to the station fixture (TOML)
    #[arg(short, long)]
    station: PathBuf,

    /// Path to the adapter configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Server summary
    About,
    /// Supported operations
    Ops,
    /// Supported grid formats
    Formats,
    /// Entities matching a filter, up to an optional limit
    Read {
        filter: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Every entity matching a filter
    ReadAll { filter: String },
    /// Entities by id
    ReadById {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Navigation tree; the roots when no navId is given
    Nav { nav_id: Option<String> },
    /// Samples of a history, or of a point's history
    HisRead { id: String, range: String },
    /// Write a priority level; without a level, show the priority array
    PointWrite {
        id: String,
        level: Option<i64>,
        /// `true`, `false`, a number, or a Haystack JSON string such as `n:70 °F`
        val: Option<String>,
        #[arg(long)]
        who: Option<String>,
    },
}

impl Command {
    fn into_op(self) -> Result<Op> {
        let op = match self {
            Command::About => Op::About,
            Command::Ops => Op::Ops,
            Command::Formats => Op::Formats,
            Command::Read { filter, limit } => Op::Read { filter, limit },
            Command::ReadAll { filter } => Op::Read {
                filter,
                limit: None,
            },
            Command::ReadById { ids } => Op::ReadById {
                ids: ids.into_iter().map(Ref::new).collect(),
            },
            Command::Nav { nav_id } => Op::Nav { nav_id },
            Command::HisRead { id, range } => Op::HisRead {
                id: Ref::new(id),
                range,
            },
            Command::PointWrite {
                id,
                level,
                val,
                who,
            } => Op::PointWrite {
                id: Ref::new(id),
                level,
                val: val.as_deref().map(parse_value).transpose()?,
                who: who.or_else(|| Some("nhaystack-cli".to_string())),
            },
        };
        Ok(op)
    }
}

fn parse_value(s: &str) -> Result<Value> {
    match s {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => match s.parse::<f64>() {
            Ok(n) => Ok(Value::num(n)),
            Err(_) => Ok(Value::from_json_str(s)?),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nhaystack=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    info!("Starting nhaystack v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            HaystackConfig::load(path)?
        }
        None => HaystackConfig::default(),
    };
    let fixture = StationFixture::load(&args.station)?;

    let worker = StationWorker::spawn(fixture.station, fixture.historian, config)?;
    let handle = worker.handle();

    let grid = handle.call(args.command.into_op()?).await?;
    println!("{}", serde_json::to_string_pretty(&grid)?);

    worker.shutdown();
    Ok(())
}
