use crate::core::models::neighbor::NeighborList;
use crate::core::models::particle::Particle;
use crate::core::models::system::ParticleSystem;
use crate::core::properties::table::{PerTypePairMatrix, PerTypeVector};
use tracing::{instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Where the characteristic smoothing length of a particle or pair comes from.
#[derive(Debug, Clone, Copy)]
pub enum SmoothingSource<'a> {
    PerParticle,
    PerType {
        sl: &'a PerTypeVector,
        sl_com: &'a PerTypePairMatrix,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ScanParams<'a> {
    pub group_bit: u32,
    pub kernel_cut: f64,
    pub speed_of_sound: &'a PerTypeVector,
    pub smoothing: SmoothingSource<'a>,
}

/// Worker-local maxima and minima before the global reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalEstimate {
    pub vmax: f64,
    pub courant_time: f64,
}

impl LocalEstimate {
    /// Estimate of a worker without particles in the group.
    pub const EMPTY: LocalEstimate = LocalEstimate {
        vmax: 0.0,
        courant_time: f64::INFINITY,
    };

    fn merge(self, other: LocalEstimate) -> LocalEstimate {
        LocalEstimate {
            vmax: self.vmax.max(other.vmax),
            courant_time: self.courant_time.min(other.courant_time),
        }
    }
}

/// Pairwise mean of two smoothing lengths.
#[inline]
pub fn interp_dist(sli: f64, slj: f64) -> f64 {
    0.5 * (sli + slj)
}

/// Scans the owned particles of `system` for the largest speed and the smallest
/// signal crossing time.
#[instrument(skip_all, name = "courant_scan_task")]
pub fn run(
    system: &ParticleSystem,
    neighbors: &NeighborList,
    params: &ScanParams<'_>,
) -> LocalEstimate {
    let particles = system.particles();

    let iterator = 0..neighbors.inum();

    #[cfg(feature = "parallel")]
    let iterator = iterator.into_par_iter();

    let estimates: Vec<LocalEstimate> = iterator
        .map(|ii| {
            let i = neighbors.ilist()[ii];
            estimate_particle(i, neighbors.neighbors_of(ii), particles, params)
        })
        .collect();

    let estimate = estimates
        .into_iter()
        .fold(LocalEstimate::EMPTY, LocalEstimate::merge);
    trace!(
        vmax = estimate.vmax,
        courant_time = estimate.courant_time,
        "Local Courant scan complete."
    );
    estimate
}

fn estimate_particle(
    i: usize,
    jlist: &[usize],
    particles: &[Particle],
    params: &ScanParams<'_>,
) -> LocalEstimate {
    let pi = &particles[i];
    if !pi.in_group(params.group_bit) {
        return LocalEstimate::EMPTY;
    }

    let sli = match params.smoothing {
        SmoothingSource::PerParticle => pi.smoothing_length,
        SmoothingSource::PerType { sl, .. } => sl.get(pi.particle_type),
    };

    let mut mumax = 0.0;
    let mut j_maxmu = None;
    for &j in jlist {
        let pj = &particles[j];
        if !pj.in_group(params.group_bit) {
            continue;
        }

        let sl_com = match params.smoothing {
            SmoothingSource::PerParticle => interp_dist(sli, pj.smoothing_length),
            SmoothingSource::PerType { sl_com, .. } => sl_com.get(pi.particle_type, pj.particle_type),
        };
        let cut = sl_com * params.kernel_cut;

        let dx = pi.position - pj.position;
        let rsq = dx.norm_squared();
        if rsq > 0.0 && rsq < cut * cut {
            let dv = pi.velocity - pj.velocity;
            let mu = sl_com * dv.dot(&dx) / rsq;
            if mu > mumax {
                mumax = mu;
                j_maxmu = Some(j);
            }
        }
    }

    let cs_i = params.speed_of_sound.get(pi.particle_type);
    let cs_j = j_maxmu.map_or(cs_i, |j| {
        params.speed_of_sound.get(particles[j].particle_type)
    });
    let cmean = 0.5 * (cs_i + cs_j);

    LocalEstimate {
        vmax: pi.velocity.norm(),
        courant_time: sli / (cmean + mumax),
    }
}
