//! Benchmarks for poster composition and output encoding.
//!
//! Run with: cargo bench --package renderer --bench poster_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo_types::LineString;

use osm_data::{StreetEdge, StreetNetwork};
use poster_common::{LatLon, OutputFormat, PosterRequest, Theme};
use renderer::{compose, png, FontContext, PosterData};

const CENTER: LatLon = LatLon {
    lat: 43.7833,
    lon: 5.3167,
};

/// Dense street grid of `n` by `n` ways spanning about 4 km.
fn grid_network(n: usize) -> StreetNetwork {
    let span = 0.04;
    let step = span / n as f64;
    let classes = ["motorway", "primary", "secondary", "tertiary", "residential", "service"];
    let mut edges = Vec::with_capacity(n * 2);
    for i in 0..n {
        let offset = -span / 2.0 + i as f64 * step;
        let highway = Some(classes[i % classes.len()].to_string());
        edges.push(StreetEdge {
            way_id: (i * 2) as i64,
            highway: highway.clone(),
            geometry: LineString::from(vec![
                (CENTER.lon - span / 2.0, CENTER.lat + offset),
                (CENTER.lon + span / 2.0, CENTER.lat + offset),
            ]),
        });
        edges.push(StreetEdge {
            way_id: (i * 2 + 1) as i64,
            highway,
            geometry: LineString::from(vec![
                (CENTER.lon + offset, CENTER.lat - span / 2.0),
                (CENTER.lon + offset, CENTER.lat + span / 2.0),
            ]),
        });
    }
    StreetNetwork { edges }
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    let request = PosterRequest::new("Lauris", "France", CENTER);
    let theme = Theme::terracotta();

    for n in [50, 200, 800] {
        let data = PosterData::new(grid_network(n));
        group.throughput(Throughput::Elements((n * 2) as u64));
        group.bench_with_input(BenchmarkId::new("grid", n), &data, |b, data| {
            b.iter(|| compose(black_box(&request), &theme, data, "Roboto").unwrap())
        });
    }
    group.finish();
}

fn bench_rasterize(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize");
    group.sample_size(10);

    let fonts = FontContext::empty();
    let mut request = PosterRequest::new("Lauris", "France", CENTER);
    request.width_in = 3.0;
    request.height_in = 4.0;
    let svg = compose(&request, &Theme::terracotta(), &PosterData::new(grid_network(200)), "Roboto").unwrap();

    for dpi in [72, 150, 300] {
        group.bench_with_input(BenchmarkId::new("png", dpi), &dpi, |b, &dpi| {
            b.iter(|| fonts.encode(black_box(&svg), OutputFormat::Png, dpi).unwrap())
        });
    }
    group.bench_function("pdf", |b| {
        b.iter(|| fonts.encode(black_box(&svg), OutputFormat::Pdf, 300).unwrap())
    });
    group.finish();
}

fn bench_png_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encode");
    for (w, h) in [(900, 1200), (3600, 4800)] {
        let pixels = vec![200u8; w * h * 4];
        group.throughput(Throughput::Bytes(pixels.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("rgba", format!("{}x{}", w, h)),
            &pixels,
            |b, pixels| b.iter(|| png::encode_rgba(black_box(pixels), w, h, Some(300)).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_compose, bench_rasterize, bench_png_encoding);
criterion_main!(benches);
