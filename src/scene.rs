//! Host-side scene description and the immutable snapshot the renderers read.

use std::sync::Arc;

use crate::primitive::{Primitive, EPSILON};
use crate::ray::Ray;
use crate::vec3::{Color, Vec3};

/// Mutable scene under construction. Renderers never see it directly; they
/// work from a [`SceneSnapshot`] taken with [`Scene::snapshot`].
#[derive(Clone, Debug, Default)]
pub struct Scene {
    primitives: Vec<Primitive>,
    pub sky: Color,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a primitive and returns its index in future snapshots.
    pub fn add(&mut self, primitive: Primitive) -> usize {
        self.primitives.push(primitive);
        self.primitives.len() - 1
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::new(self.primitives.clone(), self.sky)
    }
}

/// Nearest intersection. `primitive` indexes [`SceneSnapshot::primitives`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub normal: Vec3,
    pub primitive: usize,
}

/// Immutable primitives plus the by-value copy of the light-flagged subset.
#[derive(Clone, Debug)]
pub struct SceneSnapshot {
    primitives: Arc<[Primitive]>,
    lights: Arc<[Primitive]>,
    sky: Color,
}

impl SceneSnapshot {
    pub fn new(primitives: Vec<Primitive>, sky: Color) -> Self {
        let lights: Vec<Primitive> = primitives.iter().filter(|p| p.light).copied().collect();
        Self { primitives: primitives.into(), lights: lights.into(), sky }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, index: usize) -> &Primitive {
        &self.primitives[index]
    }

    pub fn lights(&self) -> &[Primitive] {
        &self.lights
    }

    pub fn sky(&self) -> Color {
        self.sky
    }

    /// Exhaustive nearest-hit scan. Equal distances keep the earlier primitive.
    pub fn intersect(&self, r: &Ray) -> Option<Hit> {
        let mut nearest = None;
        let mut closest = f32::INFINITY;
        for (index, primitive) in self.primitives.iter().enumerate() {
            if let Some((t, normal)) = primitive.intersect(r) {
                if t > EPSILON && t < closest {
                    closest = t;
                    nearest = Some(Hit { t, normal, primitive: index });
                }
            }
        }
        nearest
    }
}

/// Nearest-hit query over a snapshot. Implementations must agree with
/// [`SceneSnapshot::intersect`] exactly, including tie-breaking.
pub trait Intersector: Send + Sync {
    fn snapshot(&self) -> &SceneSnapshot;
    fn intersect(&self, r: &Ray) -> Option<Hit>;

    /// Nearest hit plus the number of bounding boxes and primitives tested.
    fn intersect_cost(&self, r: &Ray) -> (Option<Hit>, u32);
}

impl Intersector for SceneSnapshot {
    fn snapshot(&self) -> &SceneSnapshot {
        self
    }

    fn intersect(&self, r: &Ray) -> Option<Hit> {
        SceneSnapshot::intersect(self, r)
    }

    fn intersect_cost(&self, r: &Ray) -> (Option<Hit>, u32) {
        let cost = u32::try_from(self.primitives.len()).unwrap_or(u32::MAX);
        (SceneSnapshot::intersect(self, r), cost)
    }
}
