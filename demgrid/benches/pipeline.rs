use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use demgrid::mosaic::concat_tiles;
use demgrid::resample::resample;
use demgrid::tile::decode_tile;
use demgrid::{ByteOrder, CoordsQuery, DemServiceBuilder, ElevationGrid, ResamplePolicy};
use tempfile::TempDir;

const SRTM3_SAMPLES: usize = 1201;

/// Big-endian SRTM3 tile bytes with a simple elevation gradient.
fn tile_bytes(offset: usize) -> Vec<u8> {
    (0..SRTM3_SAMPLES * SRTM3_SAMPLES)
        .flat_map(|i| {
            let (row, col) = (i / SRTM3_SAMPLES, i % SRTM3_SAMPLES);
            (((row + col + offset) % 4000) as i16).to_be_bytes()
        })
        .collect()
}

fn create_tile(dir: &std::path::Path, filename: &str, offset: usize) {
    let mut file = std::fs::File::create(dir.join(filename)).unwrap();
    file.write_all(&tile_bytes(offset)).unwrap();
}

fn grid(offset: usize) -> ElevationGrid {
    decode_tile("bench", &tile_bytes(offset), ByteOrder::Big)
        .unwrap()
        .grid
}

fn bench_decode(c: &mut Criterion) {
    let bytes = tile_bytes(0);
    c.bench_function("decode_srtm3", |b| {
        b.iter(|| black_box(decode_tile("bench", black_box(&bytes), ByteOrder::Big).unwrap()));
    });
}

fn bench_mosaic(c: &mut Criterion) {
    let tiles = [grid(0), grid(1), grid(2), grid(3)];
    c.bench_function("concat_2x2_overlap", |b| {
        b.iter(|| black_box(concat_tiles(2, 2, black_box(&tiles), true).unwrap()));
    });
}

fn bench_resample(c: &mut Criterion) {
    let source = grid(0);
    let policy = ResamplePolicy::Explicit {
        lines: 257,
        columns: 257,
    };
    c.bench_function("resample_1201_to_257", |b| {
        b.iter(|| black_box(resample(source.clone(), black_box(policy))));
    });
}

fn bench_pipeline_cached(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    create_tile(tmp.path(), "N35E138.hgt", 0);
    create_tile(tmp.path(), "N35E139.hgt", 1);
    let builder = DemServiceBuilder::new(tmp.path()).cache_size(10);
    let service = builder.build().unwrap();
    let query = CoordsQuery::area(35.8, 35.2, 138.5, 139.5);
    let policy = ResamplePolicy::from_parts(Some(64), None, None).unwrap();

    // Warm the cache
    let _ = service.get_dem_blocking(&query, policy);

    c.bench_function("get_dem_two_tiles_cached", |b| {
        b.iter(|| black_box(service.get_dem_blocking(black_box(&query), policy).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_decode,
    bench_mosaic,
    bench_resample,
    bench_pipeline_cached
);
criterion_main!(benches);
