use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::config::{CHECK_TIMESTEP_COMMAND, CheckTimestepArgs, MonitorConfig, SmoothingMode};
use super::context::StepContext;
use super::error::{EngineError, check_type_range};
use super::progress::{Advisory, Progress};
use super::tasks::courant_scan::{self, LocalEstimate, ScanParams, SmoothingSource};
use crate::core::models::neighbor::NeighborList;
use crate::core::models::system::ParticleSystem;
use crate::core::properties::registry::PropertyRegistry;
use crate::core::properties::table::{PerTypePairMatrix, PerTypeVector};
use crate::core::sph::SphKernel;

pub const SPEED_OF_SOUND: &str = "speedOfSound";
pub const SMOOTHING_LENGTH: &str = "sl";

/// Particles should not travel more than this fraction of the skin per step.
pub const SKIN_FRACTION_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorPhase {
    #[default]
    Idle,
    Scanning,
    Reducing,
    Reporting,
}

/// Globally reduced stability figures of one sampled step.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityReport {
    pub step: u64,
    pub vmax: f64,
    pub courant_time: f64,
    pub fraction_courant: f64,
    pub fraction_skin: f64,
    /// Advisories this worker emitted; empty on non-reporting workers or with warnings off.
    pub advisories: Vec<Advisory>,
}

/// Returns `(fraction_courant, fraction_skin)`.
pub fn fractions(dt: f64, courant_time: f64, vmax: f64, skin: f64) -> (f64, f64) {
    (dt / courant_time, vmax * dt / skin)
}

/// Advisories due for the given figures, skin first.
pub fn advisories(
    step: u64,
    dt: f64,
    skin: f64,
    vmax: f64,
    fraction_courant: f64,
    courant_fraction_limit: f64,
) -> Vec<Advisory> {
    let mut due = Vec::new();
    if vmax * dt / skin > SKIN_FRACTION_THRESHOLD {
        due.push(Advisory::SkinFraction {
            step,
            travel: vmax * dt,
            limit: SKIN_FRACTION_THRESHOLD * skin,
        });
    }
    if fraction_courant > courant_fraction_limit {
        due.push(Advisory::CourantFraction {
            step,
            fraction: fraction_courant,
            limit: courant_fraction_limit,
        });
    }
    due
}

enum Smoothing {
    PerParticle,
    PerType {
        sl: Arc<PerTypeVector>,
        sl_com: PerTypePairMatrix,
    },
}

/// Periodic Courant and skin diagnostic over an SPH particle group.
///
/// Between samples the monitor only keeps the two most recent fractions.
pub struct StabilityMonitor {
    args: CheckTimestepArgs,
    kernel: SphKernel,
    group_bit: u32,
    speed_of_sound: Arc<PerTypeVector>,
    smoothing: Smoothing,
    phase: MonitorPhase,
    fraction_courant: f64,
    fraction_skin: f64,
}

impl StabilityMonitor {
    pub fn new(
        config: &MonitorConfig,
        registry: &mut PropertyRegistry<'_>,
    ) -> Result<Self, EngineError> {
        let speed_of_sound = registry.connect_per_type(SPEED_OF_SOUND, CHECK_TIMESTEP_COMMAND)?;

        let smoothing = match config.smoothing {
            SmoothingMode::PerParticle => Smoothing::PerParticle,
            SmoothingMode::PerType => {
                let sl = registry.connect_per_type(SMOOTHING_LENGTH, CHECK_TIMESTEP_COMMAND)?;
                let sl_com = PerTypePairMatrix::from_mixing(&sl, courant_scan::interp_dist);
                Smoothing::PerType { sl, sl_com }
            }
        };

        info!(
            every = config.args.sample_interval,
            limit = config.args.courant_fraction_limit,
            warn = config.args.warn,
            kernel = %config.kernel,
            smoothing = ?config.smoothing,
            "Stability monitor armed."
        );

        Ok(Self {
            args: config.args,
            kernel: config.kernel,
            group_bit: config.group_bit,
            speed_of_sound,
            smoothing,
            phase: MonitorPhase::Idle,
            fraction_courant: 0.0,
            fraction_skin: 0.0,
        })
    }

    pub fn args(&self) -> &CheckTimestepArgs {
        &self.args
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn is_due(&self, step: u64) -> bool {
        step % self.args.sample_interval == 0
    }

    /// `0` is the Courant fraction, `1` the skin fraction.
    pub fn compute_vector(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.fraction_courant),
            1 => Some(self.fraction_skin),
            _ => None,
        }
    }

    /// Local part of a sample: no communication.
    pub fn scan(
        &self,
        system: &ParticleSystem,
        neighbors: &NeighborList,
    ) -> Result<LocalEstimate, EngineError> {
        let types = system.particles().iter().map(|p| p.particle_type);
        check_type_range(types, self.speed_of_sound.n_types())?;

        let smoothing = match &self.smoothing {
            Smoothing::PerParticle => SmoothingSource::PerParticle,
            Smoothing::PerType { sl, sl_com } => SmoothingSource::PerType {
                sl: sl.as_ref(),
                sl_com,
            },
        };
        let params = ScanParams {
            group_bit: self.group_bit,
            kernel_cut: self.kernel.kernel_cut(),
            speed_of_sound: self.speed_of_sound.as_ref(),
            smoothing,
        };
        Ok(courant_scan::run(system, neighbors, &params))
    }

    /// Samples the stability figures when `ctx.step` is a multiple of the sample interval.
    ///
    /// Every worker of `ctx.comm` must call this on the same steps, since the
    /// sample ends in blocking reductions. A worker whose scan fails returns its
    /// error; the others return `PeerFailed`.
    #[instrument(skip_all, name = "stability_monitor", fields(step = ctx.step))]
    pub fn end_of_step(
        &mut self,
        ctx: &StepContext<'_>,
        system: &ParticleSystem,
        neighbors: &NeighborList,
    ) -> Result<Option<StabilityReport>, EngineError> {
        if !self.is_due(ctx.step) {
            return Ok(None);
        }

        self.phase = MonitorPhase::Scanning;
        let scanned = self.scan(system, neighbors);

        self.phase = MonitorPhase::Reducing;
        let failed = ctx
            .comm
            .all_reduce_max(if scanned.is_err() { 1.0 } else { 0.0 });
        let local = match scanned {
            Err(e) => {
                self.phase = MonitorPhase::Idle;
                return Err(e);
            }
            Ok(_) if failed > 0.0 => {
                self.phase = MonitorPhase::Idle;
                return Err(EngineError::PeerFailed {
                    rank: ctx.comm.rank(),
                    step: ctx.step,
                });
            }
            Ok(local) => local,
        };
        let vmax = ctx.comm.all_reduce_max(local.vmax);
        let courant_time = ctx.comm.all_reduce_min(local.courant_time);

        self.phase = MonitorPhase::Reporting;
        let (fraction_courant, fraction_skin) = fractions(ctx.dt, courant_time, vmax, ctx.skin);
        self.fraction_courant = fraction_courant;
        self.fraction_skin = fraction_skin;
        debug!(
            vmax,
            courant_time, fraction_courant, fraction_skin, "Stability sample reduced."
        );

        let emitted = if self.args.warn && ctx.comm.is_reporter() {
            let due = advisories(
                ctx.step,
                ctx.dt,
                ctx.skin,
                vmax,
                fraction_courant,
                self.args.courant_fraction_limit,
            );
            for advisory in &due {
                warn!(step = ctx.step, "{}", advisory);
                ctx.reporter.report(Progress::Advisory(*advisory));
            }
            due
        } else {
            Vec::new()
        };

        self.phase = MonitorPhase::Idle;
        Ok(Some(StabilityReport {
            step: ctx.step,
            vmax,
            courant_time,
            fraction_courant,
            fraction_skin,
            advisories: emitted,
        }))
    }
}
