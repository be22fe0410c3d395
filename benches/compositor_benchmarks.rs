//! Performance benchmarks for tether
//!
//! These benchmarks cover the per-turn hot paths: the synchronized commit
//! cascade, capability broadcasts to many bindings and model updates.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tether::{
    config::TetherConfig,
    display::Display,
    model::WindowModel,
    protocol::{Interface, Request},
    seat::Capability,
    surface::{Rect, SurfaceDelta, SurfaceId, SurfaceTree},
    window::{WindowEvent, WindowId, WindowState},
};
use tokio::sync::mpsc;

/// Root with `width` children, each with `width` synchronized grandchildren,
/// every non-root node holding a cached commit
fn build_tree(width: usize) -> (SurfaceTree, SurfaceId) {
    let mut tree = SurfaceTree::new();
    let root = tree.create();
    for _ in 0..width {
        let child = tree.create();
        tree.make_subsurface(child, root).unwrap();
        for _ in 0..width {
            let grandchild = tree.create();
            tree.make_subsurface(grandchild, child).unwrap();
            tree.mutate_pending(grandchild, SurfaceDelta::Damage(Rect::new(0, 0, 8, 8)))
                .unwrap();
            tree.commit(grandchild).unwrap();
        }
        tree.commit(child).unwrap();
    }
    (tree, root)
}

/// Benchmark the commit cascade through synchronized subtrees
fn bench_commit_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_cascade");

    for width in [4, 16, 32].iter() {
        group.bench_with_input(
            format!("root_commit_{}_nodes", width * width + width + 1),
            width,
            |b, &width| {
                b.iter_batched(
                    || build_tree(width),
                    |(mut tree, root)| black_box(tree.commit(root).unwrap()),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark capability broadcasts to many seat bindings
fn bench_seat_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("seat_broadcast");

    for clients in [10, 100, 500].iter() {
        let mut display = Display::new(&TetherConfig::default());
        let seat = display.global_of(Interface::Seat).unwrap();
        for _ in 0..*clients {
            let client = display.connect();
            display
                .dispatch(client, Request::Bind { name: seat, version: 3 })
                .unwrap();
        }
        display.take_all_events();

        let mut present = false;
        group.bench_function(format!("toggle_touch_{}_bindings", clients), |b| {
            b.iter(|| {
                present = !present;
                black_box(display.set_seat_capability(seat, Capability::Touch, present));
                black_box(display.take_all_events());
            });
        });
    }

    group.finish();
}

/// Benchmark model updates from window events
fn bench_model_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_model");

    for rows in [10, 100, 1000].iter() {
        group.bench_with_input(format!("populate_{}_rows", rows), rows, |b, &rows| {
            b.iter_batched(
                || WindowModel::new(mpsc::unbounded_channel().0),
                |mut model| {
                    for index in 1..=rows as u32 {
                        let id = WindowId(index);
                        model.handle_event(WindowEvent::Created(id));
                        model.handle_event(WindowEvent::TitleChanged(id, "bench".into()));
                    }
                    black_box(model.row_count())
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(format!("state_change_last_of_{}", rows), rows, |b, &rows| {
            let mut model = WindowModel::new(mpsc::unbounded_channel().0);
            for index in 1..=rows as u32 {
                model.handle_event(WindowEvent::Created(WindowId(index)));
            }
            let last = WindowId(rows as u32);
            let mut state = WindowState::empty();
            b.iter(|| {
                state.toggle(WindowState::MINIMIZED | WindowState::DEMANDS_ATTENTION);
                model.handle_event(WindowEvent::StateChanged(last, state));
            });
        });
    }

    group.finish();
}

/// Benchmark configuration operations
fn bench_configuration(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");

    let serialized = toml::to_string(&TetherConfig::default()).unwrap();

    group.bench_function("parse_config", |b| {
        b.iter(|| {
            let config: TetherConfig = toml::from_str(black_box(&serialized)).unwrap();
            black_box(config)
        });
    });

    group.bench_function("validate_config", |b| {
        let config = TetherConfig::default();
        b.iter(|| black_box(config.validate().is_ok()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_commit_cascade,
    bench_seat_broadcast,
    bench_model_updates,
    bench_configuration
);

criterion_main!(benches);
