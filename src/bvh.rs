//! Median-split bounding volume hierarchy over a snapshot.
//!
//! Hits are ordered by `(t, primitive index)` so the traversal returns the same
//! primitive the linear scan would, including on exact distance ties.

use std::cmp::Ordering;

use crate::aabb::Aabb;
use crate::primitive::EPSILON;
use crate::ray::Ray;
use crate::scene::{Hit, Intersector, SceneSnapshot};

const MAX_LEAF_SIZE: usize = 2;

#[derive(Clone, Copy, Debug)]
enum NodeKind {
    Leaf { first: usize, count: usize },
    Interior { left: usize, right: usize },
}

#[derive(Clone, Copy, Debug)]
struct BvhNode {
    bbox: Aabb,
    kind: NodeKind,
}

pub struct Bvh {
    snapshot: SceneSnapshot,
    nodes: Vec<BvhNode>,
    /// Primitive indices, reordered so every leaf owns a contiguous range.
    indices: Vec<usize>,
    /// Primitives without finite bounds, tested on every query.
    unbounded: Vec<usize>,
}

impl Bvh {
    #[tracing::instrument(skip_all, fields(primitives = snapshot.primitives().len()))]
    pub fn new(snapshot: SceneSnapshot) -> Self {
        let mut bounded = Vec::new();
        let mut unbounded = Vec::new();
        for (index, primitive) in snapshot.primitives().iter().enumerate() {
            match primitive.bounds() {
                Some(bbox) => bounded.push((index, bbox)),
                None => unbounded.push(index),
            }
        }

        let mut nodes = Vec::with_capacity(bounded.len() * 2);
        if !bounded.is_empty() {
            Self::build(&mut bounded, 0, &mut nodes);
        }
        let indices = bounded.iter().map(|(index, _)| *index).collect();
        tracing::debug!(nodes = nodes.len(), unbounded = unbounded.len(), "built bvh");

        Self { snapshot, nodes, indices, unbounded }
    }

    fn build(items: &mut [(usize, Aabb)], offset: usize, nodes: &mut Vec<BvhNode>) -> usize {
        let bbox = items.iter().fold(Aabb::EMPTY, |acc, (_, b)| Aabb::from_boxes(acc, *b));
        let node_index = nodes.len();
        nodes.push(BvhNode { bbox, kind: NodeKind::Leaf { first: offset, count: items.len() } });

        if items.len() <= MAX_LEAF_SIZE {
            return node_index;
        }

        let axis = bbox.longest_axis();
        items.sort_by(|(_, a), (_, b)| {
            a.centroid()[axis].partial_cmp(&b.centroid()[axis]).unwrap_or(Ordering::Equal)
        });

        let mid = items.len() / 2;
        let (lo, hi) = items.split_at_mut(mid);
        let left = Self::build(lo, offset, nodes);
        let right = Self::build(hi, offset + mid, nodes);
        nodes[node_index].kind = NodeKind::Interior { left, right };
        node_index
    }

    fn consider(&self, index: usize, r: &Ray, best: &mut Option<Hit>) {
        let Some((t, normal)) = self.snapshot.primitive(index).intersect(r) else {
            return;
        };
        if t <= EPSILON {
            return;
        }
        let closer = match best {
            None => true,
            Some(hit) => t < hit.t || (t == hit.t && index < hit.primitive),
        };
        if closer {
            *best = Some(Hit { t, normal, primitive: index });
        }
    }
}

impl Intersector for Bvh {
    fn snapshot(&self) -> &SceneSnapshot {
        &self.snapshot
    }

    fn intersect(&self, r: &Ray) -> Option<Hit> {
        self.intersect_cost(r).0
    }

    fn intersect_cost(&self, r: &Ray) -> (Option<Hit>, u32) {
        let mut best = None;
        let mut cost = 0u32;
        for &index in &self.unbounded {
            cost += 1;
            self.consider(index, r, &mut best);
        }

        if self.nodes.is_empty() {
            return (best, cost);
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(0usize);
        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index];
            let t_max = best.map_or(f32::INFINITY, |hit| hit.t);
            cost += 1;
            if !node.bbox.hit(r, 0.0, t_max) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { first, count } => {
                    for &index in &self.indices[first..first + count] {
                        cost += 1;
                        self.consider(index, r, &mut best);
                    }
                }
                NodeKind::Interior { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        (best, cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::primitive::Primitive;
    use crate::scene::Scene;
    use crate::scenes::build_preset;
    use crate::vec3::{unit_vector, Color, Point3, Vec3};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn random_scene(rng: &mut SmallRng) -> Scene {
        let mut scene = Scene::new();
        scene.add(Primitive::plane(Vec3::new(0.0, 1.0, 0.0), -3.0, Material::default()));
        for _ in 0..60 {
            let center = Point3::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-2.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            scene.add(Primitive::sphere(center, rng.gen_range(0.1..0.8), Material::default()));
        }
        for _ in 0..30 {
            let base = Point3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-2.0..5.0), rng.gen_range(-5.0..5.0));
            let a = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let b = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            scene.add(Primitive::triangle(base, base + a, base + b, Material::default()));
        }
        // Exact duplicates force distance ties.
        let twin = Primitive::sphere(Point3::new(0.0, 0.0, 0.0), 1.0, Material::default());
        scene.add(twin);
        scene.add(Primitive { material: Material::diffuse(Color::ONE), ..twin });
        scene.add(
            Primitive::sphere(Point3::new(2.0, 1.0, 0.0), 0.5, Material::default())
                .with_motion(Vec3::new(0.0, 2.0, 0.0)),
        );
        scene
    }

    #[test]
    fn matches_linear_scan() {
        let mut rng = SmallRng::seed_from_u64(42);
        let snapshot = random_scene(&mut rng).snapshot();
        let bvh = Bvh::new(snapshot.clone());

        for _ in 0..5000 {
            let origin = Point3::new(rng.gen_range(-8.0..8.0), rng.gen_range(-2.0..8.0), rng.gen_range(-8.0..8.0));
            let target = Point3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-1.0..3.0), rng.gen_range(-3.0..3.0));
            let ray = Ray::new(origin, unit_vector(target - origin), rng.r#gen());
            assert_eq!(bvh.intersect(&ray), snapshot.intersect(&ray), "ray {ray:?}");
        }
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let mut scene = Scene::new();
        for i in 0..8 {
            let x = 10.0 + 3.0 * i as f32;
            scene.add(Primitive::sphere(Point3::new(x, 0.0, 0.0), 1.0, Material::default()));
        }
        let twin = Primitive::sphere(Point3::new(0.0, 0.0, 5.0), 1.0, Material::default());
        let first = scene.add(twin);
        scene.add(Primitive { material: Material::diffuse(Color::ONE), ..twin });
        scene.add(Primitive::sphere(Point3::new(-10.0, 0.0, 0.0), 1.0, Material::default()));

        let snapshot = scene.snapshot();
        let bvh = Bvh::new(snapshot.clone());
        let ray = Ray::new(Point3::ZERO, Vec3::new(0.0, 0.0, 1.0), 0.0);
        let hit = bvh.intersect(&ray).unwrap();
        assert_eq!(hit.primitive, first);
        assert_eq!(Some(hit), snapshot.intersect(&ray));
    }

    #[test]
    fn empty_and_unbounded_only_scenes() {
        let bvh = Bvh::new(Scene::new().snapshot());
        let ray = Ray::new(Point3::ZERO, Vec3::new(0.0, -1.0, 0.0), 0.0);
        assert!(bvh.intersect(&ray).is_none());

        let mut scene = Scene::new();
        scene.add(Primitive::plane(Vec3::new(0.0, 1.0, 0.0), -1.0, Material::default()));
        let bvh = Bvh::new(scene.snapshot());
        assert_eq!(bvh.intersect(&ray).map(|h| h.primitive), Some(0));
    }

    #[test]
    fn missing_rays_visit_less_than_hits_into_the_spheres() {
        let preset = build_preset("spheres").unwrap();
        let snapshot = preset.scene.snapshot();
        let bvh = Bvh::new(snapshot.clone());
        let eye = preset.camera.position;

        let up = Ray::new(eye, Vec3::new(0.0, 1.0, 0.0), 0.0);
        let (miss, miss_cost) = bvh.intersect_cost(&up);
        assert!(miss.is_none());

        let center = Ray::new(eye, unit_vector(Point3::new(0.0, 1.0, 0.0) - eye), 0.0);
        let (hit, hit_cost) = bvh.intersect_cost(&center);
        assert_eq!(hit.map(|h| h.primitive), Some(2));
        assert!(miss_cost < hit_cost, "miss {miss_cost} hit {hit_cost}");

        // The linear scan always tests every primitive.
        let count = snapshot.primitives().len() as u32;
        assert_eq!(snapshot.intersect_cost(&up).1, count);
        assert_eq!(snapshot.intersect_cost(&center).1, count);
    }
}
