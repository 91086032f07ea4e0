use nalgebra::Vector3;
use std::ops::AddAssign;

use super::flags::TouchFlags;

/// Force and torque increments one contact contributes to one side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ForceData {
    pub delta_f: Vector3<f64>,
    pub delta_torque: Vector3<f64>,
}

impl ForceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl AddAssign for ForceData {
    fn add_assign(&mut self, rhs: Self) {
        self.delta_f += rhs.delta_f;
        self.delta_torque += rhs.delta_torque;
    }
}

/// Everything a model needs to evaluate one touching pair during one step.
///
/// `j` is a particle index for particle-particle contacts and a wall index
/// when `is_wall` is set. `en` is the unit normal pointing from `j` to `i`.
#[derive(Debug)]
pub struct CollisionData<'a> {
    pub i: usize,
    pub j: usize,
    pub is_wall: bool,
    pub itype: usize,
    pub jtype: usize,
    pub radi: f64,
    pub radj: f64,
    pub en: Vector3<f64>,
    pub overlap: f64,
    pub kn: f64,
    pub kt: f64,
    pub normal_force: f64,
    pub omega_i: Vector3<f64>,
    pub omega_j: Vector3<f64>,
    /// Spin of the particle relative to the wall, when the wall supplies it.
    pub wall_relative_spin: Option<Vector3<f64>>,
    pub dt: f64,
    pub touch: &'a mut TouchFlags,
    pub contact_history: &'a mut [f64],
}

/// The reduced view handed to models for a listed pair that is not touching.
#[derive(Debug)]
pub struct ContactData<'a> {
    pub i: usize,
    pub j: usize,
    pub is_wall: bool,
    pub touch: &'a mut TouchFlags,
    pub contact_history: &'a mut [f64],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assign_accumulates_force_and_torque() {
        let mut total = ForceData::new();
        total += ForceData {
            delta_f: Vector3::new(1.0, 0.0, 0.0),
            delta_torque: Vector3::new(0.0, 1.0, 0.0),
        };
        total += ForceData {
            delta_f: Vector3::new(1.0, 2.0, 0.0),
            delta_torque: Vector3::new(0.0, 0.0, 3.0),
        };
        assert_eq!(total.delta_f, Vector3::new(2.0, 2.0, 0.0));
        assert_eq!(total.delta_torque, Vector3::new(0.0, 1.0, 3.0));

        total.reset();
        assert_eq!(total, ForceData::default());
    }
}
