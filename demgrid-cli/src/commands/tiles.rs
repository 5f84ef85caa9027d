use anyhow::{Context, Result};
use demgrid::plan_tiles;
use serde::Serialize;

use crate::{CoordArgs, GlobalArgs};

#[derive(Serialize)]
struct TilesResponse {
    addresses: Vec<String>,
    h_squares: usize,
    v_squares: usize,
    limits: LimitsResponse,
    overlap: bool,
}

#[derive(Serialize)]
struct LimitsResponse {
    min_lat: i32,
    max_lat: i32,
    min_lon: i32,
    max_lon: i32,
}

pub fn run(global: &GlobalArgs, coords: &CoordArgs, json: bool) -> Result<()> {
    let product = global.product_config()?;
    let resolved = coords.query().validate().context("Invalid coordinates")?;
    let plan = plan_tiles(&resolved, &product);

    if json {
        let response = TilesResponse {
            h_squares: plan.h_squares,
            v_squares: plan.v_squares,
            limits: LimitsResponse {
                min_lat: plan.limits.min_lat,
                max_lat: plan.limits.max_lat,
                min_lon: plan.limits.min_lon,
                max_lon: plan.limits.max_lon,
            },
            overlap: plan.overlap,
            addresses: plan.addresses,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Area: {}", plan.requested_area);
    println!(
        "Grid: {} x {} tile(s), overlap {}",
        plan.v_squares,
        plan.h_squares,
        if plan.overlap { "on" } else { "off" }
    );
    println!();
    for (cell, address) in plan.tiles.iter().zip(&plan.addresses) {
        println!("{:>4} {:>5}  {}", cell.lat, cell.lon, address);
    }

    Ok(())
}
