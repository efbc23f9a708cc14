//! Layout benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_core::{CellSpan, GridSpec};
use trellis_layout::{run_layout, Decorations, MemFigure};

fn grid_layout(n: usize) {
    let (mut figure, renderer) = MemFigure::new(1280.0, 960.0);
    let grid = figure.add_grid(GridSpec::new(n, n));
    for cell in 0..n * n {
        let panel = figure.add_panel(grid, CellSpan::cell(cell));
        figure.set_decorations(
            panel,
            Decorations {
                left: 40.0,
                bottom: 30.0,
                top: 15.0,
                ..Decorations::default()
            },
        );
    }
    run_layout(&mut figure, &renderer, 0.01, 0.01).unwrap();
}

fn layout_2x2(c: &mut Criterion) {
    c.bench_function("layout_2x2", |b| b.iter(|| grid_layout(black_box(2))));
}

fn layout_4x4(c: &mut Criterion) {
    c.bench_function("layout_4x4", |b| b.iter(|| grid_layout(black_box(4))));
}

criterion_group!(benches, layout_2x2, layout_4x4);
criterion_main!(benches);
