// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! BVH any-hit throughput: a BLAS over a dense triangle grid against a
//! linear brute-force scan of the same triangles, for a fixed batch of
//! rays cast from below the grid toward a light plane above it.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use luxera::{Triangle, TrianglePayload, Vector3};

const NUM_TRIANGLES: usize = 5_000;
const NUM_RAYS: usize = 1_200;

/// A grid of upward-facing triangles tiling the XY plane at z=0, dense
/// enough that most cast rays pass near several of them.
fn build_triangles(n: usize) -> Vec<Triangle> {
    let side = (n as f64).sqrt().ceil() as usize;
    let mut triangles = Vec::with_capacity(n);
    'outer: for i in 0..side {
        for j in 0..side {
            if triangles.len() >= n {
                break 'outer;
            }
            let x = i as f64;
            let y = j as f64;
            triangles.push(Triangle {
                a: Vector3::new(x, y, 0.0),
                b: Vector3::new(x + 1.0, y, 0.0),
                c: Vector3::new(x, y + 1.0, 0.0),
                payload: TrianglePayload {
                    instance_id: 0,
                    mesh_id: 0,
                    surface_id: (i * side + j) as u32,
                },
                two_sided: true,
            });
        }
    }
    triangles
}

fn build_rays(n: usize, extent: f64) -> Vec<(Vector3, Vector3)> {
    (0..n)
        .map(|i| {
            let t = i as f64 / n as f64;
            let x = (t * extent) % extent;
            let y = ((t * 7.0).fract()) * extent;
            (Vector3::new(x, y, -10.0), Vector3::UNIT_Z)
        })
        .collect()
}

fn brute_force_any_hit(triangles: &[Triangle], origin: Vector3, direction: Vector3) -> bool {
    triangles.iter().any(|tri| tri.intersect(origin, direction, 0.0, f64::INFINITY).is_some())
}

fn bench_bvh_vs_brute_force(c: &mut Criterion) {
    let triangles = build_triangles(NUM_TRIANGLES);
    let side = (NUM_TRIANGLES as f64).sqrt().ceil();
    let rays = build_rays(NUM_RAYS, side);
    let blas = luxera::bvh::Blas::build(triangles.clone());

    let mut group = c.benchmark_group("bvh_any_hit");

    group.bench_function("brute_force", |b| {
        b.iter(|| {
            for &(origin, direction) in &rays {
                black_box(brute_force_any_hit(&triangles, origin, direction));
            }
        })
    });

    group.bench_function("bvh", |b| {
        b.iter(|| {
            for &(origin, direction) in &rays {
                black_box(blas.any_hit(origin, direction, 0.0, f64::INFINITY));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_bvh_vs_brute_force);
criterion_main!(benches);
