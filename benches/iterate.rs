use criterion::*;
use std::hint::black_box;

use sparse_ecs::World;

mod common;
use common::*;

fn iterate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    group.bench_function("view_position_velocity_100k", |b| {
        b.iter_batched(
            || {
                let world = World::new();
                populate(&world, ENTITIES_MED);
                world
            },
            |world| {
                let mut view = world.new_view::<(Position, Velocity)>();
                while view.valid() {
                    let velocity = view.get::<Velocity>();
                    let position = view.get_mut::<Position>();
                    position.x += velocity.dx;
                    position.y += velocity.dy;
                    view.next();
                }
                drop(view);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("view_three_way_intersection_100k", |b| {
        b.iter_batched(
            || {
                let world = World::new();
                populate(&world, ENTITIES_MED);
                world
            },
            |world| {
                let mut total = 0.0f32;
                let mut view = world.new_view::<(Position, Velocity, Health)>();
                while view.valid() {
                    total += view.get::<Health>().value;
                    view.next();
                }
                drop(view);
                black_box(total);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.bench_function("membership_probe_100k", |b| {
        b.iter_batched(
            || {
                let world = World::new();
                populate(&world, ENTITIES_MED);
                world
            },
            |world| {
                let mut present = 0usize;
                for i in 0..ENTITIES_MED {
                    if world.at(i).has::<Health>() {
                        present += 1;
                    }
                }
                black_box(present);
                black_box(world);
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, iterate_benchmark);
criterion_main!(benches);
