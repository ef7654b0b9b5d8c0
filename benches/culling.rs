use criterion::{criterion_group, criterion_main, Criterion, black_box};

use zcull::core::camera::Camera;
use zcull::geometry::Triangle;
use zcull::octree::{OctreeBuilder, OctreeConfig};
use zcull::render::{RenderMode, VisibilityEngine};
use zcull::scene::Scene;

use glam::{Mat4, Vec3};

/// `layers` stacked grids of `n x n` small quads facing +z
fn create_test_layers(n: u32, layers: u32) -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity((n * n * layers * 2) as usize);
    for layer in 0..layers {
        let z = -(layer as f32) * 2.0;
        for j in 0..n {
            for i in 0..n {
                let (x, y) = (i as f32 - n as f32 * 0.5, j as f32 - n as f32 * 0.5);
                let a = Vec3::new(x, y, z);
                let b = Vec3::new(x + 0.9, y, z);
                let c = Vec3::new(x + 0.9, y + 0.9, z);
                let d = Vec3::new(x, y + 0.9, z);
                triangles.push(Triangle::new(a, b, c));
                triangles.push(Triangle::new(a, c, d));
            }
        }
    }
    triangles
}

fn engine(triangles: Vec<Triangle>) -> VisibilityEngine {
    let scene = Scene::from_triangles(triangles).unwrap();
    let mut engine = VisibilityEngine::with_viewport(scene, 512, 512).unwrap();
    let camera = Camera::new(Vec3::new(0.0, 0.0, 40.0), 45.0, 1.0, -0.1, -200.0, -Vec3::Z, Vec3::Y).unwrap();
    engine.init_camera(camera);
    engine.set_model_transformation(Mat4::IDENTITY).unwrap();
    engine
}

fn bench_octree_build(c: &mut Criterion) {
    let triangles = create_test_layers(32, 8);

    c.bench_function("octree_build_16k", |b| {
        b.iter(|| {
            let builder = OctreeBuilder::new(black_box(OctreeConfig::default()));
            builder.build(black_box(&triangles))
        });
    });
}

fn bench_render_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_16k");
    group.sample_size(20);

    for mode in RenderMode::ALL {
        let mut engine = engine(create_test_layers(32, 8));
        group.bench_function(mode.name(), |b| {
            b.iter(|| engine.render(black_box(mode)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_octree_build, bench_render_modes);
criterion_main!(benches);
