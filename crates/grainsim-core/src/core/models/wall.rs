use nalgebra::{Point3, Unit, Vector3};

use super::ids::WallId;
use super::particle::Particle;

/// An infinite plane particles can rest against.
///
/// The normal points into the domain, so a particle touches the wall when its
/// signed distance along the normal is smaller than its radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub id: WallId,
    /// Material type used for wall-particle stiffness lookups; `None` uses the particle's own type.
    pub wall_type: Option<usize>,
    pub point: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
    /// Angular velocity of the wall surface. Walls without it cannot serve rolling models.
    pub angular_velocity: Option<Vector3<f64>>,
}

/// Geometry of a particle measured against a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallProximity {
    pub distance: f64,
    pub overlap: f64,
}

impl Wall {
    /// Returns `None` when `normal` has zero length.
    pub fn new(id: WallId, point: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        let normal = Unit::try_new(normal, f64::EPSILON)?;
        Some(Self {
            id,
            wall_type: None,
            point,
            normal,
            angular_velocity: None,
        })
    }

    pub fn with_wall_type(mut self, wall_type: usize) -> Self {
        self.wall_type = Some(wall_type);
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vector3<f64>) -> Self {
        self.angular_velocity = Some(angular_velocity);
        self
    }

    pub fn signed_distance(&self, position: &Point3<f64>) -> f64 {
        (position - self.point).dot(&self.normal)
    }

    pub fn proximity(&self, particle: &Particle) -> WallProximity {
        let distance = self.signed_distance(&particle.position);
        WallProximity {
            distance,
            overlap: particle.radius - distance,
        }
    }

    /// Spin of `particle` relative to the wall surface, if the wall reports its own spin.
    pub fn relative_spin(&self, particle: &Particle) -> Option<Vector3<f64>> {
        self.angular_velocity.map(|w| particle.omega - w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn floor() -> Wall {
        Wall::new(7, Point3::origin(), Vector3::new(0.0, 0.0, 2.0)).unwrap()
    }

    #[test]
    fn normal_is_normalized() {
        assert!((floor().normal.norm() - 1.0).abs() < TOLERANCE);
        assert!(Wall::new(1, Point3::origin(), Vector3::zeros()).is_none());
    }

    #[test]
    fn proximity_reports_overlap_of_resting_particle() {
        let p = Particle::new(1, 1, Point3::new(3.0, -1.0, 0.4), 0.5);
        let prox = floor().proximity(&p);
        assert!((prox.distance - 0.4).abs() < TOLERANCE);
        assert!((prox.overlap - 0.1).abs() < TOLERANCE);
    }

    #[test]
    fn relative_spin_requires_wall_spin() {
        let p = Particle::new(1, 1, Point3::origin(), 0.5).with_omega(Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(floor().relative_spin(&p), None);
        let spinning = floor().with_angular_velocity(Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(spinning.relative_spin(&p), Some(Vector3::new(0.0, 2.0, 0.0)));
    }
}
