use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Explicit collision description attached to an entity or its geometry.
///
/// Takes precedence over anything inferred from the geometry's bounding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeDescriptor {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Several primitives rigidly attached to one body.
    Compound { parts: Vec<ShapePart> },
}

impl ShapeDescriptor {
    pub fn cuboid(half_extents: Vec3) -> Self {
        ShapeDescriptor::Box { half_extents }
    }

    pub fn ball(radius: f32) -> Self {
        ShapeDescriptor::Sphere { radius }
    }
}

/// Primitive used inside a compound descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimitiveShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

/// One primitive of a compound shape, placed in the body's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapePart {
    pub shape: PrimitiveShape,
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default = "identity_rotation")]
    pub rotation: Quat,
}

fn identity_rotation() -> Quat {
    Quat::IDENTITY
}

impl ShapePart {
    pub fn new(shape: PrimitiveShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Render geometry parameters. Only the bounding parameters matter here.
/// A missing dimension falls back to the renderer's own default.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryKind {
    Box {
        width: Option<f32>,
        height: Option<f32>,
        depth: Option<f32>,
    },
    Sphere { radius: Option<f32> },
    Icosahedron { radius: Option<f32> },
    /// Anything else (planes, imported meshes). Never inferred into a shape.
    Other(String),
}

/// Geometry of a renderable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub kind: GeometryKind,
    /// Descriptor attached to the geometry itself, shared by every entity using it.
    pub physics: Option<ShapeDescriptor>,
}

impl Geometry {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            physics: None,
        }
    }

    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::new(GeometryKind::Box {
            width: Some(width),
            height: Some(height),
            depth: Some(depth),
        })
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(GeometryKind::Sphere {
            radius: Some(radius),
        })
    }

    pub fn with_physics(mut self, physics: ShapeDescriptor) -> Self {
        self.physics = Some(physics);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_json_is_tagged() {
        let json = r#"{ "kind": "box", "half_extents": [0.5, 1.2, 0.0625] }"#;
        let desc: ShapeDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc, ShapeDescriptor::cuboid(Vec3::new(0.5, 1.2, 0.0625)));

        let json = r#"{ "kind": "sphere", "radius": 0.2 }"#;
        let desc: ShapeDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(desc, ShapeDescriptor::ball(0.2));
    }

    #[test]
    fn compound_parts_default_to_identity_pose() {
        let json = r#"{
            "kind": "compound",
            "parts": [
                { "shape": { "kind": "box", "half_extents": [0.5, 0.25, 0.5] }, "offset": [0.0, -0.25, 0.0] },
                { "shape": { "kind": "sphere", "radius": 0.1 } }
            ]
        }"#;
        let desc: ShapeDescriptor = serde_json::from_str(json).unwrap();
        match desc {
            ShapeDescriptor::Compound { parts } => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].offset, Vec3::new(0.0, -0.25, 0.0));
                assert_eq!(parts[1].offset, Vec3::ZERO);
                assert_eq!(parts[1].rotation, Quat::IDENTITY);
            }
            other => panic!("expected compound, got {:?}", other),
        }
    }
}
