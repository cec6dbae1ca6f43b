use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tafl_gpkg::models::{RawRow, Schema};
use tafl_gpkg::processors::{map_row, DatasetBuilder};
use tafl_gpkg::utils::coordinates::parse_coordinate;
use tafl_gpkg::utils::constants::TAFL_FIELD_COUNT;
use tafl_gpkg::writers::geometry::encode_point;
use tafl_gpkg::models::GeoPoint;

// Synthetic TAFL rows spread over southern Canada
fn create_test_rows(count: usize) -> Vec<RawRow> {
    (0..count)
        .map(|i| {
            let mut cells = vec![String::new(); TAFL_FIELD_COUNT];
            cells[0] = "FX".to_string();
            cells[1] = format!("{:.4}", 150.0 + (i as f64) * 0.0125);
            cells[21] = "Motorola".to_string();
            cells[31] = format!("Site {}", i);
            cells[33] = format!("VX{:05}", i);
            cells[39] = "ON".to_string();
            cells[40] = format!("{:.4}", 43.0 + (i % 1000) as f64 * 0.01);
            cells[41] = format!("{:.4}", -79.0 - (i % 1000) as f64 * 0.01);
            cells[52] = "2015-06-30".to_string();
            RawRow::new(i as u64 + 1, cells)
        })
        .collect()
}

fn benchmark_map_row(c: &mut Criterion) {
    let schema = Schema::tafl();
    let mut group = c.benchmark_group("map_row");

    for count in [1_000, 10_000].iter() {
        let rows = create_test_rows(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &rows, |b, rows| {
            b.iter(|| {
                for row in rows.iter().cloned() {
                    black_box(map_row(&schema, row).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn benchmark_process_row(c: &mut Criterion) {
    let builder = DatasetBuilder::default();
    let mut group = c.benchmark_group("process_row");

    for count in [1_000, 10_000].iter() {
        let rows = create_test_rows(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &rows, |b, rows| {
            b.iter(|| {
                for row in rows.iter().cloned() {
                    black_box(builder.process_row(row).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn benchmark_geometry(c: &mut Criterion) {
    c.bench_function("parse_coordinate", |b| {
        b.iter(|| parse_coordinate(black_box("-123.1207")))
    });

    let point = GeoPoint::new(-73.5673, 45.5017);
    c.bench_function("encode_point", |b| {
        b.iter(|| encode_point(black_box(point), 4326).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_map_row,
    benchmark_process_row,
    benchmark_geometry
);
criterion_main!(benches);
