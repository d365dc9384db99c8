use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo_types::{LineString, MultiPolygon, Polygon};
use ndarray::Array2;
use zonal_processor::models::{Zone, ZoneGeometry, ZoneSet};
use zonal_processor::processors::{compute_statistics, ZonalStatsEngine};
use zonal_processor::readers::{GeoTransform, Raster};

// Synthetic grid with a sprinkling of nodata cells
fn create_test_raster(size: usize) -> Raster {
    let data = Array2::from_shape_fn((size, size), |(r, c)| {
        if (r * 31 + c * 17) % 97 == 0 {
            -1.0
        } else {
            ((r * size + c) % 1000) as f64
        }
    });
    Raster::new(data, GeoTransform::north_up(140.0, -20.0, 0.05), -1.0)
}

// Small buffered-site polygons scattered over the grid extent
fn create_test_zones(count: usize, size: usize) -> ZoneSet {
    let extent = size as f64 * 0.05;
    let zones = (0..count)
        .map(|i| {
            let x = 140.0 + (i as f64 * 0.37) % (extent - 0.3);
            let y = -20.0 - (i as f64 * 0.53) % (extent - 0.3);
            let ring = LineString::from(vec![
                (x, y),
                (x + 0.17, y - 0.02),
                (x + 0.21, y - 0.19),
                (x + 0.03, y - 0.23),
                (x, y),
            ]);
            Zone::new(
                i as u32 + 1,
                format!("SITE{:03}", i),
                ZoneGeometry::Polygons(MultiPolygon::new(vec![Polygon::new(ring, vec![])])),
            )
        })
        .collect();
    ZoneSet::new(zones).unwrap()
}

fn benchmark_statistic_battery(c: &mut Criterion) {
    let values: Vec<f64> = (0..10_000).map(|i| ((i * 7919) % 10_007) as f64).collect();

    c.bench_function("statistic_battery_10k", |b| {
        b.iter(|| {
            let mut sample = values.clone();
            black_box(compute_statistics(&mut sample))
        })
    });
}

fn benchmark_overlay_by_zone_count(c: &mut Criterion) {
    let raster = create_test_raster(400);
    let engine = ZonalStatsEngine::new(-1.0);
    let mut group = c.benchmark_group("overlay_by_zones");

    for &count in &[10, 100, 500] {
        let zones = create_test_zones(count, 400);
        group.bench_with_input(BenchmarkId::new("zones", count), &zones, |b, zones| {
            b.iter(|| {
                let records =
                    engine.compute_with(&raster, zones, "bench_202001cor.tif", "202001", "bench");
                black_box(records.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_statistic_battery,
    benchmark_overlay_by_zone_count
);
criterion_main!(benches);
