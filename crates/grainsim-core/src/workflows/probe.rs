use crate::core::contact::data::ForceData;
use crate::core::models::ids::ParticleTag;
use crate::core::models::neighbor::NeighborList;
use crate::core::models::system::ParticleSystem;
use crate::core::properties::registry::PropertyRegistry;
use crate::core::properties::table::MaterialPropertyTable;
use crate::engine::config::{SimulationConfig, SmoothingMode};
use crate::engine::context::{Communicator, LocalCommunicator, LocalGroup, StepContext};
use crate::engine::error::{EngineError, check_type_range};
use crate::engine::monitor::{SMOOTHING_LENGTH, StabilityMonitor, StabilityReport};
use crate::engine::pipeline::{ContactPipeline, PassSummary};
use crate::engine::progress::{Progress, ProgressReporter};
use std::collections::HashMap;
use std::thread;
use tracing::{debug, info, instrument};

/// Contact counts summed over all workers for the last step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactTotals {
    pub pairs: usize,
    pub touching: usize,
    pub wall_contacts: usize,
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Force and torque on every particle after the last step, in input order.
    pub forces: Vec<ForceData>,
    /// Reaction on every configured wall after the last step.
    pub wall_loads: Vec<ForceData>,
    pub contacts: ContactTotals,
    /// Stability samples as seen by the reporting worker.
    pub reports: Vec<StabilityReport>,
}

struct Worker<'s> {
    comm: LocalCommunicator,
    system: ParticleSystem,
    neighbors: NeighborList,
    pipeline: ContactPipeline,
    monitor: Option<StabilityMonitor>,
    reporter: &'s ProgressReporter<'s>,
}

struct WorkerOutput {
    forces: Vec<(ParticleTag, ForceData)>,
    summary: PassSummary,
    reports: Vec<StabilityReport>,
}

/// Runs `config.steps` frozen-kinematics steps over `system`.
///
/// Each step is a contact force sweep followed by the stability monitor, on
/// `config.workers` threads that each own one slab of the particles.
#[instrument(skip_all, name = "probe_workflow")]
pub fn run(
    config: &SimulationConfig,
    system: &ParticleSystem,
    table: &MaterialPropertyTable,
    reporter: &ProgressReporter,
) -> Result<ProbeResult, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    validate_types(config, system, table)?;

    let cutoff = neighbor_cutoff(config, system, table);
    let group = LocalGroup::new(config.workers);
    info!(
        particles = system.len(),
        workers = group.size(),
        steps = config.steps,
        cutoff,
        "Preparing probe."
    );

    let mut workers = Vec::with_capacity(group.size());
    for (comm, part) in group.communicators().into_iter().zip(system.partition(group.size())) {
        let neighbors = NeighborList::build_brute_force(&part, cutoff);
        let pipeline = ContactPipeline::new(&config.contact, table)?;
        let monitor = match &config.monitor {
            Some(monitor_config) => {
                let mut registry = PropertyRegistry::new(table);
                Some(StabilityMonitor::new(monitor_config, &mut registry)?)
            }
            None => None,
        };
        debug!(
            rank = comm.rank(),
            owned = part.n_owned(),
            neighbors = neighbors.total_neighbors(),
            "Worker prepared."
        );
        workers.push(Worker {
            comm,
            system: part,
            neighbors,
            pipeline,
            monitor,
            reporter,
        });
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Stepping ===
    reporter.report(Progress::PhaseStart { name: "Stepping" });
    reporter.report(Progress::TaskStart {
        total_steps: config.steps,
    });

    let outputs: Vec<Result<WorkerOutput, EngineError>> = thread::scope(|s| {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| s.spawn(move || run_worker(worker, config)))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(EngineError::Internal("worker thread panicked".to_string())))
            })
            .collect()
    });

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Merge ===
    let outputs = collect_outputs(outputs)?;
    let result = merge(config, system, outputs);
    info!(
        touching = result.contacts.touching,
        wall_contacts = result.contacts.wall_contacts,
        samples = result.reports.len(),
        "Probe complete."
    );
    Ok(result)
}

fn validate_types(
    config: &SimulationConfig,
    system: &ParticleSystem,
    table: &MaterialPropertyTable,
) -> Result<(), EngineError> {
    let wall_types = config.walls.iter().filter_map(|w| w.wall_type);
    let particle_types = system.particles().iter().map(|p| p.particle_type);
    check_type_range(particle_types.chain(wall_types), table.n_types())
}

/// Distance covering both contact candidates and SPH kernel support, plus the skin.
fn neighbor_cutoff(
    config: &SimulationConfig,
    system: &ParticleSystem,
    table: &MaterialPropertyTable,
) -> f64 {
    let contact_reach = 2.0 * system.max_radius();
    let kernel_reach = config.monitor.as_ref().map_or(0.0, |monitor| {
        let sl = match monitor.smoothing {
            SmoothingMode::PerParticle => system.max_smoothing_length(),
            SmoothingMode::PerType => table
                .per_type(SMOOTHING_LENGTH)
                .map_or(0.0, |sl| sl.values().iter().copied().fold(0.0, f64::max)),
        };
        sl * monitor.kernel.kernel_cut()
    });
    contact_reach.max(kernel_reach) + config.skin
}

fn run_worker(mut worker: Worker<'_>, config: &SimulationConfig) -> Result<WorkerOutput, EngineError> {
    let rank = worker.comm.rank();
    let mut forces = vec![ForceData::new(); worker.system.len()];
    let mut summary = PassSummary::default();
    let mut reports = Vec::new();

    for step in 1..=config.steps {
        let ctx = StepContext::new(step, config.dt, config.skin, &worker.comm, worker.reporter);

        forces.fill(ForceData::new());
        let outcome = worker.pipeline.run_pass(
            &ctx,
            &worker.system,
            &worker.neighbors,
            &config.walls,
            &mut forces,
        );

        // All workers agree on failure before entering the monitor's collectives.
        let failed = worker
            .comm
            .all_reduce_max(if outcome.is_err() { 1.0 } else { 0.0 });
        summary = match outcome {
            Err(e) => return Err(e),
            Ok(_) if failed > 0.0 => return Err(EngineError::PeerFailed { rank, step }),
            Ok(s) => s,
        };

        if let Some(monitor) = worker.monitor.as_mut() {
            if let Some(report) = monitor.end_of_step(&ctx, &worker.system, &worker.neighbors)? {
                if worker.comm.is_reporter() {
                    reports.push(report);
                }
            }
        }

        if worker.comm.is_reporter() {
            worker.reporter.report(Progress::TaskIncrement);
        }
    }

    let forces = worker
        .system
        .particles()
        .iter()
        .map(|p| p.tag)
        .zip(forces)
        .collect();
    Ok(WorkerOutput {
        forces,
        summary,
        reports,
    })
}

/// Prefers the error of the worker that failed over the peers that stopped because of it.
fn collect_outputs(
    outputs: Vec<Result<WorkerOutput, EngineError>>,
) -> Result<Vec<WorkerOutput>, EngineError> {
    let mut peer_failure = None;
    let mut collected = Vec::with_capacity(outputs.len());
    for output in outputs {
        match output {
            Ok(output) => collected.push(output),
            Err(e @ EngineError::PeerFailed { .. }) => {
                peer_failure.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }
    match peer_failure {
        Some(e) => Err(e),
        None => Ok(collected),
    }
}

fn merge(config: &SimulationConfig, system: &ParticleSystem, outputs: Vec<WorkerOutput>) -> ProbeResult {
    let index: HashMap<ParticleTag, usize> = system
        .particles()
        .iter()
        .enumerate()
        .map(|(i, p)| (p.tag, i))
        .collect();

    let mut forces = vec![ForceData::new(); system.len()];
    let mut wall_loads = vec![ForceData::new(); config.walls.len()];
    let mut contacts = ContactTotals::default();
    let mut reports = Vec::new();

    for output in outputs {
        for (tag, force) in output.forces {
            if let Some(&i) = index.get(&tag) {
                forces[i] += force;
            }
        }
        for (total, load) in wall_loads.iter_mut().zip(output.summary.wall_loads) {
            *total += load;
        }
        contacts.pairs += output.summary.pairs;
        contacts.touching += output.summary.touching;
        contacts.wall_contacts += output.summary.wall_contacts;
        reports.extend(output.reports);
    }

    ProbeResult {
        forces,
        wall_loads,
        contacts,
        reports,
    }
}
