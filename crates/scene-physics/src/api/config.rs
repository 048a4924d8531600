use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::api::error::PhysicsError;

/// Physical material applied to every collider the registry creates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColliderMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

/// Configuration for a physics world. Loaded from JSON or built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector in world units per second squared (Y-up).
    pub gravity: Vec3,
    /// How many times per second the scheduler fires a tick (default: 60).
    pub tick_rate: f32,
    /// Internal engine timestep in seconds (default: 1/60).
    pub fixed_dt: f32,
    /// Maximum engine steps per tick (default: 10).
    pub max_substeps: u32,
    /// Material for all colliders.
    pub material: ColliderMaterial,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.8, 0.0),
            tick_rate: 60.0,
            fixed_dt: 1.0 / 60.0,
            max_substeps: 10,
            material: ColliderMaterial::default(),
        }
    }
}

impl PhysicsConfig {
    /// Parse a config from a JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_tick_rate(mut self, tick_rate: f32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Check the values the engine cannot run with.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "tick_rate must be positive, got {}",
                self.tick_rate
            )));
        }
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "fixed_dt must be positive, got {}",
                self.fixed_dt
            )));
        }
        if self.max_substeps == 0 {
            return Err(PhysicsError::InvalidConfig(
                "max_substeps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
