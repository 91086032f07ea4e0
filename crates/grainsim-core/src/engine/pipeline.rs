use nalgebra::Vector3;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace};

use super::config::{ContactConfig, check_unique_wall_ids};
use super::context::StepContext;
use super::error::{EngineError, check_type_range};
use crate::core::contact::data::{CollisionData, ContactData, ForceData};
use crate::core::contact::dispatch::ModelSet;
use crate::core::contact::history::ContactHistoryStore;
use crate::core::contact::model::{ModelEnvironment, Settings};
use crate::core::models::ids::ContactKey;
use crate::core::models::neighbor::NeighborList;
use crate::core::models::system::ParticleSystem;
use crate::core::models::wall::Wall;
use crate::core::properties::registry::PropertyRegistry;
use crate::core::properties::table::{MaterialPropertyTable, PerTypePairMatrix};

const CALLER: &str = "contact pipeline";
pub const NORMAL_STIFFNESS: &str = "kn";
pub const TANGENTIAL_STIFFNESS: &str = "kt";

/// Counts and wall loads of one force sweep on one worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassSummary {
    pub pairs: usize,
    pub touching: usize,
    pub wall_contacts: usize,
    pub pruned: usize,
    /// Reaction on each wall, indexed like the `walls` slice of the sweep.
    pub wall_loads: Vec<ForceData>,
}

/// Host force sweep driving the active contact models over a neighbor list.
///
/// Owns the history rows of every contact this worker evaluates. A pair is
/// evaluated by the worker owning its lower-tagged particle, so each row is
/// written by exactly one worker.
#[derive(Debug)]
pub struct ContactPipeline {
    models: ModelSet,
    settings: Settings,
    store: ContactHistoryStore,
    kn: Arc<PerTypePairMatrix>,
    kt: Arc<PerTypePairMatrix>,
}

impl ContactPipeline {
    pub fn new(config: &ContactConfig, table: &MaterialPropertyTable) -> Result<Self, EngineError> {
        let mut models = ModelSet::from_styles(&config.styles)?;

        let mut settings = Settings::new();
        models.register_settings(&mut settings)?;
        settings.apply(&config.settings)?;

        let mut registry = PropertyRegistry::new(table);
        let env = ModelEnvironment {
            coarse_graining: config.coarse_graining,
            settings: &settings,
        };
        models.connect_to_properties(&mut registry, &env)?;

        let kn = registry.connect_per_type_pair(NORMAL_STIFFNESS, CALLER)?;
        let kt = registry.connect_per_type_pair(TANGENTIAL_STIFFNESS, CALLER)?;

        let store = ContactHistoryStore::new(models.history_width());
        info!(
            models = models.len(),
            history_width = store.width(),
            "Contact pipeline initialized."
        );

        Ok(Self {
            models,
            settings,
            store,
            kn,
            kt,
        })
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &ContactHistoryStore {
        &self.store
    }

    /// Evaluates every listed pair and every wall within `ctx.skin` of an owned particle.
    ///
    /// Forces and torques are added to `forces`, which must have one entry per
    /// particle of `system` (ghosts included).
    ///
    /// `neighbors` must be a full list: a pair is only evaluated from the side
    /// of its lower tag, so a half list loses the pairs stored the other way round.
    #[instrument(skip_all, name = "contact_pass", fields(step = ctx.step))]
    pub fn run_pass(
        &mut self,
        ctx: &StepContext<'_>,
        system: &ParticleSystem,
        neighbors: &NeighborList,
        walls: &[Wall],
        forces: &mut [ForceData],
    ) -> Result<PassSummary, EngineError> {
        if forces.len() != system.len() {
            return Err(EngineError::Internal(format!(
                "force buffer holds {} entries for {} particles",
                forces.len(),
                system.len()
            )));
        }
        check_unique_wall_ids(walls)?;
        let types = system
            .particles()
            .iter()
            .map(|p| p.particle_type)
            .chain(walls.iter().filter_map(|w| w.wall_type));
        check_type_range(types, self.kn.n_types())?;

        let mut summary = PassSummary {
            wall_loads: vec![ForceData::new(); walls.len()],
            ..PassSummary::default()
        };

        self.models.begin_pass();
        self.store.begin_sweep();

        let result = self
            .sweep_pairs(ctx, system, neighbors, forces, &mut summary)
            .and_then(|()| self.sweep_walls(ctx, system, walls, forces, &mut summary));

        self.models.end_pass();
        result?;

        summary.pruned = self.store.prune_unvisited();
        debug!(
            pairs = summary.pairs,
            touching = summary.touching,
            wall_contacts = summary.wall_contacts,
            pruned = summary.pruned,
            "Contact pass complete."
        );
        Ok(summary)
    }

    fn sweep_pairs(
        &mut self,
        ctx: &StepContext<'_>,
        system: &ParticleSystem,
        neighbors: &NeighborList,
        forces: &mut [ForceData],
        summary: &mut PassSummary,
    ) -> Result<(), EngineError> {
        let particles = system.particles();

        for (i, jlist) in neighbors.iter() {
            let pi = &particles[i];
            for &j in jlist {
                let pj = &particles[j];
                if pi.tag >= pj.tag {
                    continue;
                }
                summary.pairs += 1;

                let id = self.store.find_or_insert(ContactKey::pair(pi.tag, pj.tag));
                let (touch, contact_history) = self
                    .store
                    .entry_mut(id)
                    .ok_or_else(|| EngineError::Internal("contact row vanished".to_string()))?;

                let delta = pi.position - pj.position;
                let r = delta.norm();
                let overlap = pi.radius + pj.radius - r;

                let mut i_forces = ForceData::new();
                let mut j_forces = ForceData::new();

                if overlap > 0.0 && r > 0.0 {
                    let en = delta / r;
                    let kn = self.kn.get(pi.particle_type, pj.particle_type);
                    let normal_force = kn * overlap;
                    i_forces.delta_f += en * normal_force;
                    j_forces.delta_f -= en * normal_force;

                    let mut cdata = CollisionData {
                        i,
                        j,
                        is_wall: false,
                        itype: pi.particle_type,
                        jtype: pj.particle_type,
                        radi: pi.radius,
                        radj: pj.radius,
                        en,
                        overlap,
                        kn,
                        kt: self.kt.get(pi.particle_type, pj.particle_type),
                        normal_force,
                        omega_i: pi.omega,
                        omega_j: pj.omega,
                        wall_relative_spin: None,
                        dt: ctx.dt,
                        touch,
                        contact_history,
                    };
                    self.models.collision(&mut cdata, &mut i_forces, &mut j_forces)?;
                    summary.touching += 1;
                } else {
                    if r == 0.0 {
                        trace!(i = pi.tag, j = pj.tag, "Coincident particles have no contact normal.");
                    }
                    let mut cdata = ContactData {
                        i,
                        j,
                        is_wall: false,
                        touch,
                        contact_history,
                    };
                    self.models.no_collision(&mut cdata, &mut i_forces, &mut j_forces);
                }

                forces[i] += i_forces;
                forces[j] += j_forces;
            }
        }
        Ok(())
    }

    fn sweep_walls(
        &mut self,
        ctx: &StepContext<'_>,
        system: &ParticleSystem,
        walls: &[Wall],
        forces: &mut [ForceData],
        summary: &mut PassSummary,
    ) -> Result<(), EngineError> {
        let particles = system.particles();

        for i in system.owned_range() {
            let p = &particles[i];
            for (w, wall) in walls.iter().enumerate() {
                let proximity = wall.proximity(p);
                if proximity.overlap <= -ctx.skin {
                    continue;
                }

                let id = self.store.find_or_insert(ContactKey::wall(p.tag, wall.id));
                let (touch, contact_history) = self
                    .store
                    .entry_mut(id)
                    .ok_or_else(|| EngineError::Internal("contact row vanished".to_string()))?;

                let mut i_forces = ForceData::new();
                let mut wall_forces = ForceData::new();

                if proximity.overlap > 0.0 {
                    let en = wall.normal.into_inner();
                    let wall_type = wall.wall_type.unwrap_or(p.particle_type);
                    let kn = self.kn.get(p.particle_type, wall_type);
                    let normal_force = kn * proximity.overlap;
                    i_forces.delta_f += en * normal_force;
                    wall_forces.delta_f -= en * normal_force;

                    let mut cdata = CollisionData {
                        i,
                        j: w,
                        is_wall: true,
                        itype: p.particle_type,
                        jtype: wall_type,
                        radi: p.radius,
                        radj: 0.0,
                        en,
                        overlap: proximity.overlap,
                        kn,
                        kt: self.kt.get(p.particle_type, wall_type),
                        normal_force,
                        omega_i: p.omega,
                        omega_j: wall.angular_velocity.unwrap_or_else(Vector3::zeros),
                        wall_relative_spin: wall.relative_spin(p),
                        dt: ctx.dt,
                        touch,
                        contact_history,
                    };
                    self.models.collision(&mut cdata, &mut i_forces, &mut wall_forces)?;
                    summary.wall_contacts += 1;
                } else {
                    let mut cdata = ContactData {
                        i,
                        j: w,
                        is_wall: true,
                        touch,
                        contact_history,
                    };
                    self.models.no_collision(&mut cdata, &mut i_forces, &mut wall_forces);
                }

                forces[i] += i_forces;
                summary.wall_loads[w] += wall_forces;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contact::ContactError;
    use crate::engine::config::ConfigError;
    use crate::core::contact::flags::TouchFlags;
    use crate::core::models::particle::Particle;
    use crate::core::properties::PropertyError;
    use crate::engine::context::SingleProcess;
    use crate::engine::progress::ProgressReporter;
    use nalgebra::Point3;

    const TOLERANCE: f64 = 1e-9;

    const MATERIALS: &str = r#"
        n-types = 1

        [per-type-pair]
        kn = [[1000.0]]
        kt = [[100.0]]
        coeffRollFrict = [[0.5]]
    "#;

    fn pipeline() -> ContactPipeline {
        let table = MaterialPropertyTable::from_toml_str(MATERIALS).unwrap();
        let config = ContactConfig {
            styles: vec!["epsd2".to_string()],
            ..ContactConfig::default()
        };
        ContactPipeline::new(&config, &table).unwrap()
    }

    fn spinning_pair(separation: f64) -> ParticleSystem {
        ParticleSystem::new(vec![
            Particle::new(1, 1, Point3::origin(), 0.5).with_omega(Vector3::new(0.0, 0.0, 1.0)),
            Particle::new(2, 1, Point3::new(separation, 0.0, 0.0), 0.5),
        ])
    }

    fn run(
        pipeline: &mut ContactPipeline,
        system: &ParticleSystem,
        walls: &[Wall],
    ) -> Result<(PassSummary, Vec<ForceData>), EngineError> {
        let reporter = ProgressReporter::new();
        let ctx = StepContext::new(0, 1e-3, 0.5, &SingleProcess, &reporter);
        let neighbors = NeighborList::build_brute_force(system, 2.0);
        let mut forces = vec![ForceData::new(); system.len()];
        let summary = pipeline.run_pass(&ctx, system, &neighbors, walls, &mut forces)?;
        Ok((summary, forces))
    }

    fn rolling_history(pipeline: &ContactPipeline, key: ContactKey) -> Vec<f64> {
        let id = pipeline.history().find(key).unwrap();
        pipeline.history().row(id).unwrap().to_vec()
    }

    #[test]
    fn each_pair_is_evaluated_once_with_opposite_normal_forces() {
        let mut pipeline = pipeline();
        let (summary, forces) = run(&mut pipeline, &spinning_pair(0.9), &[]).unwrap();

        assert_eq!(summary.pairs, 1);
        assert_eq!(summary.touching, 1);
        // overlap 0.1, kn 1000
        assert!((forces[0].delta_f.x + 100.0).abs() < TOLERANCE);
        assert!((forces[1].delta_f.x - 100.0).abs() < TOLERANCE);
    }

    #[test]
    fn touching_pair_gets_opposite_rolling_torques_and_history() {
        let mut pipeline = pipeline();
        let (_, forces) = run(&mut pipeline, &spinning_pair(0.9), &[]).unwrap();

        // reff 0.25, kr = 100 * 0.0625, spin 1 about z, dt 1e-3
        let expected = 6.25e-3;
        assert!((forces[0].delta_torque.z + expected).abs() < TOLERANCE);
        assert!((forces[1].delta_torque.z - expected).abs() < TOLERANCE);

        let row = rolling_history(&pipeline, ContactKey::pair(1, 2));
        assert!((row[2] - expected).abs() < TOLERANCE);
        let id = pipeline.history().find(ContactKey::pair(1, 2)).unwrap();
        assert!(pipeline.history().touch(id).unwrap().contains(TouchFlags::ROLLING_MODEL));
    }

    #[test]
    fn history_accumulates_over_consecutive_steps() {
        let mut pipeline = pipeline();
        let system = spinning_pair(0.9);
        run(&mut pipeline, &system, &[]).unwrap();
        run(&mut pipeline, &system, &[]).unwrap();
        let row = rolling_history(&pipeline, ContactKey::pair(1, 2));
        assert!((row[2] - 2.0 * 6.25e-3).abs() < TOLERANCE);
    }

    #[test]
    fn separated_pair_reads_zero_history_and_clears_touch() {
        let mut pipeline = pipeline();
        run(&mut pipeline, &spinning_pair(0.9), &[]).unwrap();
        let (summary, forces) = run(&mut pipeline, &spinning_pair(1.2), &[]).unwrap();

        assert_eq!(summary.touching, 0);
        assert_eq!(forces[0], ForceData::default());
        assert_eq!(rolling_history(&pipeline, ContactKey::pair(1, 2)), vec![0.0; 3]);
        let id = pipeline.history().find(ContactKey::pair(1, 2)).unwrap();
        assert!(pipeline.history().touch(id).unwrap().is_empty());
    }

    #[test]
    fn pairs_leaving_the_neighbor_list_are_pruned() {
        let mut pipeline = pipeline();
        run(&mut pipeline, &spinning_pair(0.9), &[]).unwrap();
        assert_eq!(pipeline.history().len(), 1);

        let (summary, _) = run(&mut pipeline, &spinning_pair(5.0), &[]).unwrap();
        assert_eq!(summary.pruned, 1);
        assert!(pipeline.history().is_empty());
    }

    #[test]
    fn wall_contact_loads_the_wall_with_the_opposite_torque() {
        let mut pipeline = pipeline();
        let floor = Wall::new(3, Point3::origin(), Vector3::z())
            .unwrap()
            .with_angular_velocity(Vector3::zeros());
        let system = ParticleSystem::new(vec![
            Particle::new(1, 1, Point3::new(0.0, 0.0, 0.45), 0.5)
                .with_omega(Vector3::new(1.0, 0.0, 0.0)),
        ]);

        let (summary, forces) = run(&mut pipeline, &system, &[floor]).unwrap();
        assert_eq!(summary.wall_contacts, 1);
        // overlap 0.05, kn 1000
        assert!((forces[0].delta_f.z - 50.0).abs() < TOLERANCE);
        assert!((summary.wall_loads[0].delta_f.z + 50.0).abs() < TOLERANCE);

        // reff = radius 0.5, kr = 100 * 0.25, spin 1 about x
        let expected = 1e-3 * 25.0;
        assert!((forces[0].delta_torque.x + expected).abs() < TOLERANCE);
        assert!((summary.wall_loads[0].delta_torque.x - expected).abs() < TOLERANCE);
        assert!((rolling_history(&pipeline, ContactKey::wall(1, 3))[0] - expected).abs() < TOLERANCE);
    }

    fn floor_and_ceiling(floor_id: u32, ceiling_id: u32) -> [Wall; 2] {
        let floor = Wall::new(floor_id, Point3::origin(), Vector3::z())
            .unwrap()
            .with_angular_velocity(Vector3::zeros());
        let ceiling = Wall::new(ceiling_id, Point3::new(0.0, 0.0, 0.9), -Vector3::z())
            .unwrap()
            .with_angular_velocity(Vector3::zeros());
        [floor, ceiling]
    }

    fn squeezed_particle() -> ParticleSystem {
        ParticleSystem::new(vec![
            Particle::new(1, 1, Point3::new(0.0, 0.0, 0.45), 0.5)
                .with_omega(Vector3::new(1.0, 0.0, 0.0)),
        ])
    }

    #[test]
    fn each_wall_keeps_its_own_history_row() {
        let mut pipeline = pipeline();
        let (summary, forces) =
            run(&mut pipeline, &squeezed_particle(), &floor_and_ceiling(1, 2)).unwrap();

        assert_eq!(summary.wall_contacts, 2);
        let per_wall = 1e-3 * 25.0;
        assert!((forces[0].delta_torque.x + 2.0 * per_wall).abs() < TOLERANCE);
        for load in &summary.wall_loads {
            assert!((load.delta_torque.x - per_wall).abs() < TOLERANCE);
        }
        assert!((rolling_history(&pipeline, ContactKey::wall(1, 1))[0] - per_wall).abs() < TOLERANCE);
        assert!((rolling_history(&pipeline, ContactKey::wall(1, 2))[0] - per_wall).abs() < TOLERANCE);
    }

    #[test]
    fn walls_sharing_an_id_are_rejected() {
        let mut pipeline = pipeline();
        let err = run(&mut pipeline, &squeezed_particle(), &floor_and_ceiling(1, 1)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config {
                source: ConfigError::DuplicateWallId(1)
            }
        ));
        assert!(pipeline.history().is_empty());
    }

    #[test]
    fn particle_type_outside_the_table_is_an_error() {
        let mut pipeline = pipeline();
        let system = ParticleSystem::new(vec![
            Particle::new(1, 1, Point3::origin(), 0.5),
            Particle::new(2, 2, Point3::new(0.9, 0.0, 0.0), 0.5),
        ]);
        assert!(matches!(
            run(&mut pipeline, &system, &[]),
            Err(EngineError::TypeOutOfRange {
                particle_type: 2,
                n_types: 1
            })
        ));

        let untyped = ParticleSystem::new(vec![Particle::new(1, 0, Point3::origin(), 0.5)]);
        assert!(matches!(
            run(&mut pipeline, &untyped, &[]),
            Err(EngineError::TypeOutOfRange { particle_type: 0, .. })
        ));
    }

    #[test]
    fn wall_type_outside_the_table_is_an_error() {
        let mut pipeline = pipeline();
        let [floor, _] = floor_and_ceiling(1, 2);
        let err = run(&mut pipeline, &squeezed_particle(), &[floor.with_wall_type(3)]).unwrap_err();
        assert!(matches!(err, EngineError::TypeOutOfRange { particle_type: 3, .. }));
    }

    #[test]
    fn wall_without_spin_data_fails_the_pass() {
        let mut pipeline = pipeline();
        let floor = Wall::new(3, Point3::origin(), Vector3::z()).unwrap();
        let system = ParticleSystem::new(vec![Particle::new(1, 1, Point3::new(0.0, 0.0, 0.45), 0.5)]);

        let err = run(&mut pipeline, &system, &[floor]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Contact {
                source: ContactError::MissingWallSpin { .. }
            }
        ));
    }

    #[test]
    fn distant_walls_create_no_contact_rows() {
        let mut pipeline = pipeline();
        let floor = Wall::new(3, Point3::new(0.0, 0.0, -10.0), Vector3::z()).unwrap();
        let system = ParticleSystem::new(vec![Particle::new(1, 1, Point3::origin(), 0.5)]);
        let (summary, _) = run(&mut pipeline, &system, &[floor]).unwrap();
        assert_eq!(summary.wall_contacts, 0);
        assert!(pipeline.history().is_empty());
    }

    #[test]
    fn missing_stiffness_names_the_pipeline() {
        let table = MaterialPropertyTable::from_toml_str(
            "n-types = 1\n[per-type-pair]\ncoeffRollFrict = [[0.5]]\n",
        )
        .unwrap();
        let config = ContactConfig {
            styles: vec!["epsd2".to_string()],
            ..ContactConfig::default()
        };
        match ContactPipeline::new(&config, &table) {
            Err(EngineError::Property {
                source: PropertyError::Unresolved { name, caller },
            }) => {
                assert_eq!(name, "kn");
                assert_eq!(caller, "contact pipeline");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_style_is_rejected() {
        let table = MaterialPropertyTable::from_toml_str(MATERIALS).unwrap();
        let config = ContactConfig {
            styles: vec!["hertz-mindlin".to_string()],
            ..ContactConfig::default()
        };
        assert!(matches!(
            ContactPipeline::new(&config, &table),
            Err(EngineError::Contact {
                source: ContactError::UnknownStyle(_)
            })
        ));
    }

    #[test]
    fn force_buffer_must_match_system() {
        let mut pipeline = pipeline();
        let system = spinning_pair(0.9);
        let reporter = ProgressReporter::new();
        let ctx = StepContext::new(0, 1e-3, 0.5, &SingleProcess, &reporter);
        let neighbors = NeighborList::build_brute_force(&system, 2.0);
        let mut forces = vec![ForceData::new(); 1];
        assert!(matches!(
            pipeline.run_pass(&ctx, &system, &neighbors, &[], &mut forces),
            Err(EngineError::Internal(_))
        ));
    }
}
