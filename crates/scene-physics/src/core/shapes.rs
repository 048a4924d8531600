//! Shape resolution and the shared-shape cache.
//!
//! `resolve` turns an entity's explicit descriptor (or, failing that, its geometry's bounding
//! parameters) into a validated `ShapeDescriptor`. Nothing is allocated in the engine until a
//! body is actually created, so an entity without a usable shape costs nothing.
//!
//! `ShapeCache` hands out one `SharedShape` per distinct descriptor. Colliders hold clones of it;
//! the cache entry is dropped once the last collider using it is gone.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use rapier3d::prelude::*;

use crate::components::geometry::{Geometry, GeometryKind, PrimitiveShape, ShapeDescriptor};
use crate::core::convert::iso_from_parts;

/// Renderer defaults used when a geometry omits a dimension.
const DEFAULT_BOX_SIZE: f32 = 1.0;
const DEFAULT_SPHERE_RADIUS: f32 = 1.0;

/// Derive a collision shape for an entity.
///
/// `explicit` is the entity's own descriptor (or its geometry's). Returns `None` when neither
/// an explicit descriptor nor an inferable geometry exists, or the sizes are unusable.
pub fn resolve(explicit: Option<&ShapeDescriptor>, geometry: Option<&Geometry>) -> Option<ShapeDescriptor> {
    let desc = match explicit {
        Some(desc) => desc.clone(),
        None => infer_from_geometry(geometry?)?,
    };
    if is_valid(&desc) {
        Some(desc)
    } else {
        log::warn!("ignoring degenerate collision shape {:?}", desc);
        None
    }
}

fn infer_from_geometry(geometry: &Geometry) -> Option<ShapeDescriptor> {
    match &geometry.kind {
        GeometryKind::Box { width, height, depth } => Some(ShapeDescriptor::cuboid(Vec3::new(
            width.unwrap_or(DEFAULT_BOX_SIZE) / 2.0,
            height.unwrap_or(DEFAULT_BOX_SIZE) / 2.0,
            depth.unwrap_or(DEFAULT_BOX_SIZE) / 2.0,
        ))),
        GeometryKind::Sphere { radius } | GeometryKind::Icosahedron { radius } => {
            Some(ShapeDescriptor::ball(radius.unwrap_or(DEFAULT_SPHERE_RADIUS)))
        }
        GeometryKind::Other(name) => {
            log::debug!("no collision shape can be inferred from {} geometry", name);
            None
        }
    }
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn primitive_is_valid(shape: &PrimitiveShape) -> bool {
    match *shape {
        PrimitiveShape::Box { half_extents } => half_extents.to_array().iter().all(|&v| positive(v)),
        PrimitiveShape::Sphere { radius } => positive(radius),
    }
}

fn is_valid(desc: &ShapeDescriptor) -> bool {
    match desc {
        ShapeDescriptor::Box { half_extents } => half_extents.to_array().iter().all(|&v| positive(v)),
        ShapeDescriptor::Sphere { radius } => positive(*radius),
        ShapeDescriptor::Compound { parts } => {
            !parts.is_empty()
                && parts.iter().all(|p| {
                    primitive_is_valid(&p.shape) && p.offset.is_finite() && p.rotation.is_finite()
                })
        }
    }
}

/// Hashable identity of a descriptor (exact float bits).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ShapeKey(Vec<u32>);

impl ShapeKey {
    pub(crate) fn of(desc: &ShapeDescriptor) -> Self {
        let mut bits = Vec::with_capacity(4);
        match desc {
            ShapeDescriptor::Box { half_extents } => {
                bits.push(0);
                bits.extend(half_extents.to_array().iter().map(|v| v.to_bits()));
            }
            ShapeDescriptor::Sphere { radius } => {
                bits.push(1);
                bits.push(radius.to_bits());
            }
            ShapeDescriptor::Compound { parts } => {
                bits.push(2);
                for part in parts {
                    match part.shape {
                        PrimitiveShape::Box { half_extents } => {
                            bits.push(0);
                            bits.extend(half_extents.to_array().iter().map(|v| v.to_bits()));
                        }
                        PrimitiveShape::Sphere { radius } => {
                            bits.push(1);
                            bits.push(radius.to_bits());
                        }
                    }
                    bits.extend(part.offset.to_array().iter().map(|v| v.to_bits()));
                    bits.extend(part.rotation.to_array().iter().map(|v| v.to_bits()));
                }
            }
        }
        ShapeKey(bits)
    }
}

fn build_primitive(shape: &PrimitiveShape) -> SharedShape {
    match *shape {
        PrimitiveShape::Box { half_extents } => {
            SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        PrimitiveShape::Sphere { radius } => SharedShape::ball(radius),
    }
}

fn build_shape(desc: &ShapeDescriptor) -> SharedShape {
    match desc {
        ShapeDescriptor::Box { half_extents } => {
            SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        ShapeDescriptor::Sphere { radius } => SharedShape::ball(*radius),
        ShapeDescriptor::Compound { parts } => SharedShape::compound(
            parts
                .iter()
                .map(|p| (iso_from_parts(p.offset, p.rotation), build_primitive(&p.shape)))
                .collect(),
        ),
    }
}

/// Distinct engine shapes currently alive, keyed by descriptor.
#[derive(Default)]
pub struct ShapeCache {
    shapes: HashMap<ShapeKey, SharedShape>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared shape for `desc`, built on first use.
    pub(crate) fn acquire(&mut self, desc: &ShapeDescriptor) -> (ShapeKey, SharedShape) {
        let key = ShapeKey::of(desc);
        let shape = self
            .shapes
            .entry(key.clone())
            .or_insert_with(|| build_shape(desc))
            .clone();
        (key, shape)
    }

    /// Drop the cached shape if nothing but the cache still holds it.
    pub(crate) fn release(&mut self, key: &ShapeKey) -> bool {
        let unused = self
            .shapes
            .get(key)
            .map(|shape| Arc::strong_count(&shape.0) == 1)
            .unwrap_or(false);
        if unused {
            self.shapes.remove(key);
        }
        unused
    }

    /// Number of distinct shapes alive.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Drop every cached shape.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::geometry::ShapePart;

    #[test]
    fn explicit_descriptor_wins() {
        let geometry = Geometry::cuboid(2.0, 2.0, 2.0);
        let shape = resolve(Some(&ShapeDescriptor::ball(0.3)), Some(&geometry));
        assert_eq!(shape, Some(ShapeDescriptor::ball(0.3)));
    }

    #[test]
    fn box_geometry_gives_half_extents() {
        let geometry = Geometry::cuboid(1.0, 0.5, 4.0);
        let shape = resolve(None, Some(&geometry));
        assert_eq!(shape, Some(ShapeDescriptor::cuboid(Vec3::new(0.5, 0.25, 2.0))));
    }

    #[test]
    fn missing_dimensions_use_defaults() {
        let geometry = Geometry::new(GeometryKind::Box {
            width: None,
            height: Some(2.0),
            depth: None,
        });
        assert_eq!(
            resolve(None, Some(&geometry)),
            Some(ShapeDescriptor::cuboid(Vec3::new(0.5, 1.0, 0.5)))
        );

        let geometry = Geometry::new(GeometryKind::Icosahedron { radius: None });
        assert_eq!(resolve(None, Some(&geometry)), Some(ShapeDescriptor::ball(1.0)));
    }

    #[test]
    fn nothing_to_resolve() {
        assert_eq!(resolve(None, None), None);
        let plane = Geometry::new(GeometryKind::Other("plane".into()));
        assert_eq!(resolve(None, Some(&plane)), None);
    }

    #[test]
    fn degenerate_sizes_are_rejected() {
        assert_eq!(resolve(Some(&ShapeDescriptor::ball(0.0)), None), None);
        assert_eq!(resolve(Some(&ShapeDescriptor::ball(f32::NAN)), None), None);
        assert_eq!(
            resolve(Some(&ShapeDescriptor::cuboid(Vec3::new(1.0, -1.0, 1.0))), None),
            None
        );
        assert_eq!(
            resolve(Some(&ShapeDescriptor::Compound { parts: vec![] }), None),
            None
        );
    }

    #[test]
    fn cache_shares_identical_descriptors() {
        let mut cache = ShapeCache::new();
        let (key_a, a) = cache.acquire(&ShapeDescriptor::ball(0.2));
        let (key_b, b) = cache.acquire(&ShapeDescriptor::ball(0.2));
        let (_, _c) = cache.acquire(&ShapeDescriptor::ball(0.3));
        assert_eq!(key_a, key_b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn release_waits_for_last_user() {
        let mut cache = ShapeCache::new();
        let desc = ShapeDescriptor::cuboid(Vec3::splat(0.5));
        let (key, first) = cache.acquire(&desc);
        let (_, second) = cache.acquire(&desc);

        drop(first);
        assert!(!cache.release(&key));
        assert_eq!(cache.len(), 1);

        drop(second);
        assert!(cache.release(&key));
        assert!(cache.is_empty());
    }

    #[test]
    fn compound_builds_all_parts() {
        let desc = ShapeDescriptor::Compound {
            parts: vec![
                ShapePart::new(PrimitiveShape::Box {
                    half_extents: Vec3::new(0.5, 0.25, 0.5),
                })
                .with_offset(Vec3::new(0.0, -0.25, 0.0)),
                ShapePart::new(PrimitiveShape::Sphere { radius: 0.1 })
                    .with_offset(Vec3::new(0.3, 0.0, 0.1)),
            ],
        };
        let mut cache = ShapeCache::new();
        let (_, shape) = cache.acquire(&desc);
        let compound = shape.as_compound().expect("compound shape");
        assert_eq!(compound.shapes().len(), 2);
    }
}
