use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use meridian_core::history::OperationStack;
use meridian_core::math::{TransformSpace, Vec3, quat_from_rotation_z};
use meridian_scene::operations::TranslateOperation;
use meridian_scene::{NodeId, Scene, Selection};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A single parent chain `depth` nodes deep. Returns the deepest node.
fn chain(scene: &mut Scene, depth: usize) -> NodeId {
    let mut parent = scene.root();
    for i in 0..depth {
        let id = scene.create_node(format!("link {i}"));
        scene.add_child(parent, id).unwrap();
        scene.translate(id, Vec3::new(1.0, 0.0, 0.0), TransformSpace::Local);
        scene.rotate(id, quat_from_rotation_z(0.01), TransformSpace::Local);
        parent = id;
    }
    parent
}

/// A tree with `fanout` children per node, `levels` deep.
fn wide_tree(scene: &mut Scene, fanout: usize, levels: usize) {
    let mut frontier = vec![scene.root()];
    for level in 0..levels {
        let mut next = Vec::with_capacity(frontier.len() * fanout);
        for &parent in &frontier {
            for i in 0..fanout {
                let id = scene.create_node(format!("{level}.{i}"));
                scene.add_child(parent, id).unwrap();
                next.push(id);
            }
        }
        frontier = next;
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_world_transform_deep_chain(c: &mut Criterion) {
    let mut scene = Scene::new();
    let leaf = chain(&mut scene, 64);
    c.bench_function("world_transform_chain_64", |b| {
        b.iter(|| scene.world_transformation(black_box(leaf)));
    });
}

fn bench_depth_first(c: &mut Criterion) {
    let mut scene = Scene::new();
    wide_tree(&mut scene, 6, 4);
    let root = scene.root();
    c.bench_function("depth_first_1555_nodes", |b| {
        b.iter(|| scene.depth_first(black_box(root)).count());
    });
}

fn bench_translate_drag(c: &mut Criterion) {
    c.bench_function("translate_drag_100_merged", |b| {
        b.iter_batched(
            || {
                let mut scene = Scene::new();
                let root = scene.root();
                let node = scene.create_node("dragged");
                scene.add_child(root, node).unwrap();
                (scene, node, OperationStack::<Scene>::new())
            },
            |(mut scene, node, stack)| {
                for _ in 0..100 {
                    stack
                        .push(
                            Box::new(TranslateOperation::new(node, Vec3::new(0.1, 0.0, 0.0))),
                            &mut scene,
                        )
                        .unwrap();
                }
                stack.len()
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_selection_apply(c: &mut Criterion) {
    c.bench_function("selection_apply_32_nodes", |b| {
        b.iter_batched(
            || {
                let mut scene = Scene::new();
                let root = scene.root();
                for i in 0..32 {
                    let id = scene.create_node(format!("n{i}"));
                    scene.add_child(root, id).unwrap();
                    scene.select(id);
                }
                (scene, OperationStack::<Scene>::new())
            },
            |(mut scene, stack)| {
                Selection::apply_operation(&mut scene, &stack, |node| {
                    Box::new(TranslateOperation::new(node, Vec3::new(0.0, 1.0, 0.0)))
                })
                .unwrap();
                stack.undo(&mut scene).unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_world_transform_deep_chain,
    bench_depth_first,
    bench_translate_drag,
    bench_selection_apply,
);
criterion_main!(benches);
