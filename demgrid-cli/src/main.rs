use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// DEM elevation mosaic CLI tool
#[derive(Parser)]
#[command(name = "demgrid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory containing tile files
    #[arg(short, long, env = "DEM_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Elevation product preset: hgt or bil
    #[arg(short, long, env = "DEM_PRODUCT", default_value = "hgt", global = true)]
    pub product: String,

    /// Maximum tiles in cache (0 disables caching)
    #[arg(
        short,
        long,
        env = "DEM_CACHE_SIZE",
        default_value = "100",
        global = true
    )]
    pub cache_size: u64,

    /// Base URL to download missing tiles from
    #[arg(long, env = "DEM_DOWNLOAD_URL", global = true)]
    pub download_url: Option<String>,
}

/// A point (`--lat`/`--lon`) or a bounding box.
#[derive(Args, Debug, Clone)]
pub struct CoordArgs {
    /// Latitude of a point; selects its whole tile
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude of a point
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<f64>,

    /// Northern latitude of the box
    #[arg(long, allow_hyphen_values = true, conflicts_with = "lat")]
    pub top: Option<f64>,

    /// Southern latitude of the box
    #[arg(long, allow_hyphen_values = true, conflicts_with = "lat")]
    pub bottom: Option<f64>,

    /// Western longitude of the box
    #[arg(long, allow_hyphen_values = true, conflicts_with = "lat")]
    pub left: Option<f64>,

    /// Eastern longitude of the box
    #[arg(long, allow_hyphen_values = true, conflicts_with = "lat")]
    pub right: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// {"grid": [...], "lines": n, "columns": m}
    Json,
    /// One CSV row per scan line
    Csv,
    /// Little-endian signed 16-bit samples, row-major
    Raw,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the elevation grid for a point or bounding box
    Mosaic {
        #[command(flatten)]
        coords: CoordArgs,

        /// Round each axis' segment count up to a multiple of this value
        #[arg(long, conflicts_with_all = ["lines", "columns"])]
        multiple_of: Option<usize>,

        /// Output lines (requires --columns)
        #[arg(long, requires = "columns")]
        lines: Option<usize>,

        /// Output columns (requires --lines)
        #[arg(long, requires = "lines")]
        columns: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the tiles a point or bounding box needs
    Tiles {
        #[command(flatten)]
        coords: CoordArgs,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Display information about a tile file
    Info {
        /// Path to a tile file, or a tile name inside the data directory
        tile: String,
    },

    /// List available tiles
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demgrid=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mosaic {
            coords,
            multiple_of,
            lines,
            columns,
            format,
            output,
        } => commands::mosaic::run(
            &cli.global,
            &coords,
            multiple_of,
            lines,
            columns,
            format,
            output,
        ),
        Commands::Tiles { coords, json } => commands::tiles::run(&cli.global, &coords, json),
        Commands::Info { tile } => commands::info::run(&cli.global, &tile),
        Commands::List => commands::list::run(&cli.global),
    }
}
