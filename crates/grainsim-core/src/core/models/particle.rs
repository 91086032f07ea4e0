use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::ids::ParticleTag;

/// Bit set in a particle's group mask when it belongs to the default `all` group.
pub const GROUP_ALL: u32 = 1;

/// A spherical particle as seen by the contact and diagnostic passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub tag: ParticleTag,
    pub particle_type: usize, // 1-based material type
    pub position: Point3<f64>,
    pub velocity: Vector3<f64>,
    pub omega: Vector3<f64>,
    pub radius: f64,
    pub smoothing_length: f64,
    pub group_mask: u32,
}

impl Particle {
    pub fn new(tag: ParticleTag, particle_type: usize, position: Point3<f64>, radius: f64) -> Self {
        Self {
            tag,
            particle_type,
            position,
            velocity: Vector3::zeros(),
            omega: Vector3::zeros(),
            radius,
            smoothing_length: radius,
            group_mask: GROUP_ALL,
        }
    }

    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_omega(mut self, omega: Vector3<f64>) -> Self {
        self.omega = omega;
        self
    }

    pub fn with_smoothing_length(mut self, smoothing_length: f64) -> Self {
        self.smoothing_length = smoothing_length;
        self
    }

    pub fn with_group_mask(mut self, group_mask: u32) -> Self {
        self.group_mask = group_mask;
        self
    }

    #[inline]
    pub fn in_group(&self, group_bit: u32) -> bool {
        self.group_mask & group_bit != 0
    }
}

/// Flat row layout used when particles are read from or written to tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub tag: ParticleTag,
    #[serde(rename = "type")]
    pub particle_type: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    #[serde(default)]
    pub vz: f64,
    #[serde(default)]
    pub wx: f64,
    #[serde(default)]
    pub wy: f64,
    #[serde(default)]
    pub wz: f64,
    pub radius: f64,
    #[serde(default)]
    pub smoothing_length: Option<f64>,
    #[serde(default)]
    pub group: Option<u32>,
}

impl From<ParticleRecord> for Particle {
    fn from(r: ParticleRecord) -> Self {
        Self {
            tag: r.tag,
            particle_type: r.particle_type,
            position: Point3::new(r.x, r.y, r.z),
            velocity: Vector3::new(r.vx, r.vy, r.vz),
            omega: Vector3::new(r.wx, r.wy, r.wz),
            radius: r.radius,
            smoothing_length: r.smoothing_length.unwrap_or(r.radius),
            group_mask: r.group.unwrap_or(GROUP_ALL),
        }
    }
}

impl From<&Particle> for ParticleRecord {
    fn from(p: &Particle) -> Self {
        Self {
            tag: p.tag,
            particle_type: p.particle_type,
            x: p.position.x,
            y: p.position.y,
            z: p.position.z,
            vx: p.velocity.x,
            vy: p.velocity.y,
            vz: p.velocity.z,
            wx: p.omega.x,
            wy: p.omega.y,
            wz: p.omega.z,
            radius: p.radius,
            smoothing_length: Some(p.smoothing_length),
            group: Some(p.group_mask),
        }
    }
}
