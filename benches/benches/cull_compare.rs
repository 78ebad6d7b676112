// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::convert::Infallible;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use understory_cull::{Cullable, CullerConfig, GridCuller, Scene};

struct Sprite {
    pos: Point,
    size: (f64, f64),
    dirty: bool,
    visible: bool,
}

impl Cullable for Sprite {
    fn position(&self) -> Point {
        self.pos
    }

    fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.size.0, self.size.1)
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

struct Sprites(Vec<Sprite>);

impl Scene for Sprites {
    type ObjectId = usize;
    type ContainerId = Infallible;
    type Object = Sprite;

    fn object(&self, id: usize) -> Option<&Sprite> {
        self.0.get(id)
    }

    fn object_mut(&mut self, id: usize) -> Option<&mut Sprite> {
        self.0.get_mut(id)
    }
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_sprites(count: usize, world: f64, max_size: f64) -> Sprites {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    let sprites = (0..count)
        .map(|_| Sprite {
            pos: Point::new(rng.next_f64() * world, rng.next_f64() * world),
            size: (
                1.0 + rng.next_f64() * max_size,
                1.0 + rng.next_f64() * max_size,
            ),
            dirty: false,
            visible: false,
        })
        .collect();
    Sprites(sprites)
}

fn build_culler(scene: &mut Sprites, config: CullerConfig) -> GridCuller<usize, Infallible> {
    let mut culler = GridCuller::new(config).unwrap();
    for id in 0..scene.0.len() {
        culler.register_object(scene, id, false).unwrap();
    }
    culler
}

/// The baseline: test every object's world box against the viewport.
fn linear_cull(scene: &mut Sprites, viewport: Rect) -> usize {
    let mut visible = 0;
    for s in &mut scene.0 {
        let aabb = Rect::from_origin_size(s.pos, s.size);
        s.visible = aabb.x1 > viewport.x0
            && aabb.x0 < viewport.x1
            && aabb.y1 > viewport.y0
            && aabb.y0 < viewport.y1;
        visible += usize::from(s.visible);
    }
    visible
}

const WORLD: f64 = 20_000.0;

fn viewport() -> Rect {
    Rect::from_origin_size((8_000.0, 8_000.0), (1920.0, 1080.0))
}

fn bench_static_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("static_scene");
    for &n in &[1_000usize, 10_000, 50_000] {
        group.throughput(Throughput::Elements(n as u64));

        let mut scene = gen_sprites(n, WORLD, 100.0);
        group.bench_function(format!("linear_n{n}"), |b| {
            b.iter(|| black_box(linear_cull(&mut scene, black_box(viewport()))));
        });

        let mut scene = gen_sprites(n, WORLD, 100.0);
        let mut precise = build_culler(&mut scene, CullerConfig::new());
        group.bench_function(format!("grid_simple_test_n{n}"), |b| {
            b.iter(|| black_box(precise.cull(&mut scene, black_box(viewport()), false)));
        });

        let mut scene = gen_sprites(n, WORLD, 100.0);
        let mut coarse = build_culler(&mut scene, CullerConfig::new().simple_test(false));
        group.bench_function(format!("grid_buckets_only_n{n}"), |b| {
            b.iter(|| black_box(coarse.cull(&mut scene, black_box(viewport()), false)));
        });
    }
    group.finish();
}

fn bench_moving_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("moving_scene");
    let n = 10_000;
    for &cell in &[250.0, 1000.0, 4000.0] {
        group.bench_function(format!("move_tenth_and_cull_cell{cell}"), |b| {
            b.iter_batched(
                || {
                    let mut scene = gen_sprites(n, WORLD, 100.0);
                    let culler = build_culler(&mut scene, CullerConfig::new().with_cell_size(cell));
                    (scene, culler)
                },
                |(mut scene, mut culler)| {
                    for s in scene.0.iter_mut().step_by(10) {
                        s.pos.x = (s.pos.x + 300.0) % WORLD;
                        s.dirty = true;
                    }
                    black_box(culler.cull(&mut scene, viewport(), false));
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("register");
    let n = 10_000;
    group.throughput(Throughput::Elements(n as u64));
    group.bench_function("register_n10000", |b| {
        b.iter_batched(
            || gen_sprites(n, WORLD, 100.0),
            |mut scene| black_box(build_culler(&mut scene, CullerConfig::new())),
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_static_scene, bench_moving_scene, bench_register);
criterion_main!(benches);
