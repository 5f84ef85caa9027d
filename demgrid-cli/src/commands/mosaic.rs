use anyhow::{Context, Result};
use demgrid::{ElevationGrid, ResamplePolicy};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::{CoordArgs, GlobalArgs, OutputFormat};

#[derive(Serialize)]
struct MosaicResponse<'a> {
    grid: &'a [i16],
    lines: usize,
    columns: usize,
}

pub fn run(
    global: &GlobalArgs,
    coords: &CoordArgs,
    multiple_of: Option<usize>,
    lines: Option<usize>,
    columns: Option<usize>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let query = coords.query();
    let policy = ResamplePolicy::from_parts(multiple_of, lines, columns)
        .context("Invalid resampling options")?;

    let service = global
        .service_builder()?
        .build()
        .context("Failed to create elevation service")?;

    let plan = service.plan(&query).context("Invalid coordinates")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Assembling {} tile(s)", plan.len()));

    let result = service.get_dem_blocking(&query, policy);
    spinner.finish_and_clear();
    let grid = result.context("Failed to assemble elevation grid")?;

    tracing::info!(
        lines = grid.lines,
        columns = grid.columns,
        tiles = plan.len(),
        "Mosaic assembled"
    );

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_grid(&grid, format, BufWriter::new(file))?;
            eprintln!(
                "Wrote {}x{} grid to {}",
                grid.lines,
                grid.columns,
                path.display()
            );
        }
        None => write_grid(&grid, format, io::stdout().lock())?,
    }

    Ok(())
}

fn write_grid<W: Write>(grid: &ElevationGrid, format: OutputFormat, mut writer: W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let response = MosaicResponse {
                grid: &grid.samples,
                lines: grid.lines,
                columns: grid.columns,
            };
            serde_json::to_writer(&mut writer, &response)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => {
            let mut csv = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut writer);
            for line in 0..grid.lines {
                csv.write_record(grid.row(line).iter().map(|v| v.to_string()))?;
            }
            csv.flush()?;
        }
        OutputFormat::Raw => writer.write_all(&grid.to_le_bytes())?,
    }
    writer.flush()?;
    Ok(())
}
