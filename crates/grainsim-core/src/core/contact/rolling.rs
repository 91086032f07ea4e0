//! Elastic-plastic spring-dashpot (EPSD2) rolling resistance.
//!
//! The rolling torque is a spring on the accumulated tangential relative
//! rotation, capped at `|Fn| reff mu_r`. The capped value is what the contact
//! remembers, so sliding past the yield bound permanently relaxes the spring.

use nalgebra::Vector3;
use std::sync::Arc;
use tracing::debug;

use super::ContactError;
use super::data::{CollisionData, ContactData, ForceData};
use super::flags::{Capabilities, TouchFlags};
use super::history::HistorySetup;
use super::model::{ContactModel, ModelEnvironment};
use crate::core::properties::factories::{COEFF_ROLL_FRICT, create_coeff_roll_frict};
use crate::core::properties::registry::PropertyRegistry;
use crate::core::properties::table::PerTypePairMatrix;

pub const STYLE: &str = "epsd2";
pub const MODEL_ID: u32 = 1;
pub const HISTORY_VALUES: usize = 3;

const CALLER: &str = "rolling_model epsd2";

/// Inputs of a single rolling-torque update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingInput {
    /// Torque stored in the contact history at the end of the previous step.
    pub history: Vector3<f64>,
    /// Relative angular velocity of side i with respect to side j.
    pub relative_spin: Vector3<f64>,
    /// Unit contact normal.
    pub normal: Vector3<f64>,
    pub dt: f64,
    pub kt: f64,
    pub reff: f64,
    pub normal_force: f64,
    pub coeff_roll_frict: f64,
}

/// Spring update with Coulomb-like yield cap; returns the torque to apply and store.
pub fn rolling_torque(input: &RollingInput) -> Vector3<f64> {
    let en = input.normal;

    // torsion about the normal does not roll
    let wr_t = input.relative_spin - en * input.relative_spin.dot(&en);

    let kr = input.kt * input.reff * input.reff;
    let mut torque = input.history + wr_t * (input.dt * kr);

    let torque_mag = torque.norm();
    let torque_max = yield_torque(input.normal_force, input.reff, input.coeff_roll_frict);
    if torque_mag > torque_max {
        torque *= torque_max / torque_mag;
    }

    torque
}

/// Largest rolling torque the contact can sustain.
#[inline]
pub fn yield_torque(normal_force: f64, reff: f64, coeff_roll_frict: f64) -> f64 {
    normal_force.abs() * reff * coeff_roll_frict
}

#[inline]
pub fn effective_radius(radi: f64, radj: f64) -> f64 {
    radi * radj / (radi + radj)
}

#[derive(Debug)]
pub struct RollingEpsd2 {
    history_offset: usize,
    coeff_roll_frict: Option<Arc<PerTypePairMatrix>>,
}

impl RollingEpsd2 {
    pub fn new(setup: &mut HistorySetup) -> Self {
        let history_offset = setup.add_history_value("r_torquex_old");
        setup.add_history_value("r_torquey_old");
        setup.add_history_value("r_torquez_old");
        debug!(offset = history_offset, "EPSD2 rolling model loaded.");
        Self {
            history_offset,
            coeff_roll_frict: None,
        }
    }

    pub(crate) fn boxed(setup: &mut HistorySetup) -> Box<dyn ContactModel> {
        Box::new(Self::new(setup))
    }

    pub fn history_offset(&self) -> usize {
        self.history_offset
    }

    fn history_range(&self) -> std::ops::Range<usize> {
        self.history_offset..self.history_offset + HISTORY_VALUES
    }
}

impl ContactModel for RollingEpsd2 {
    fn style(&self) -> &'static str {
        STYLE
    }

    fn id(&self) -> u32 {
        MODEL_ID
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONNECT_TO_PROPERTIES | Capabilities::COLLISION | Capabilities::NO_COLLISION
    }

    fn touch_flag(&self) -> TouchFlags {
        TouchFlags::ROLLING_MODEL
    }

    fn connect_to_properties(
        &mut self,
        registry: &mut PropertyRegistry<'_>,
        env: &ModelEnvironment<'_>,
    ) -> Result<(), ContactError> {
        registry.register_property(COEFF_ROLL_FRICT, create_coeff_roll_frict);
        self.coeff_roll_frict = Some(registry.connect_per_type_pair(COEFF_ROLL_FRICT, CALLER)?);

        if env.coarse_graining.is_active() {
            return Err(ContactError::CoarseGrainingUnsupported {
                model: CALLER.to_string(),
                factor: env.coarse_graining.0,
            });
        }
        Ok(())
    }

    fn collision(
        &self,
        cdata: &mut CollisionData<'_>,
        i_forces: &mut ForceData,
        j_forces: &mut ForceData,
    ) -> Result<(), ContactError> {
        let coeff = self
            .coeff_roll_frict
            .as_ref()
            .ok_or(ContactError::NotConnected { model: CALLER })?;

        *cdata.touch |= TouchFlags::ROLLING_MODEL;

        let (reff, relative_spin) = if cdata.is_wall {
            let spin = cdata
                .wall_relative_spin
                .ok_or(ContactError::MissingWallSpin {
                    model: CALLER,
                    particle: cdata.i,
                    wall: cdata.j,
                })?;
            (cdata.radi, spin)
        } else {
            (
                effective_radius(cdata.radi, cdata.radj),
                cdata.omega_i - cdata.omega_j,
            )
        };

        let range = self.history_range();
        let history = &mut cdata.contact_history[range];

        let r_torque = rolling_torque(&RollingInput {
            history: Vector3::new(history[0], history[1], history[2]),
            relative_spin,
            normal: cdata.en,
            dt: cdata.dt,
            kt: cdata.kt,
            reff,
            normal_force: cdata.normal_force,
            coeff_roll_frict: coeff.get(cdata.itype, cdata.jtype),
        });

        history.copy_from_slice(r_torque.as_slice());

        i_forces.delta_torque -= r_torque;
        j_forces.delta_torque += r_torque;
        Ok(())
    }

    fn no_collision(
        &self,
        cdata: &mut ContactData<'_>,
        _i_forces: &mut ForceData,
        _j_forces: &mut ForceData,
    ) {
        *cdata.touch &= !TouchFlags::ROLLING_MODEL;
        cdata.contact_history[self.history_range()].fill(0.0);
    }
}
