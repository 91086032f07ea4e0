use super::system::ParticleSystem;

/// Per-owned-particle candidate lists, built outside the contact core and read-only here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborList {
    ilist: Vec<usize>,
    neighbors: Vec<Vec<usize>>,
}

impl NeighborList {
    /// Wraps ready-made lists; `neighbors[ii]` belongs to particle `ilist[ii]`.
    ///
    /// The lists must be full (every pair listed from both sides). The contact
    /// sweep and the stability scan both rely on it.
    pub fn from_lists(ilist: Vec<usize>, neighbors: Vec<Vec<usize>>) -> Self {
        debug_assert_eq!(ilist.len(), neighbors.len());
        Self { ilist, neighbors }
    }

    /// Full (both-direction) list of every particle within `cutoff` of an owned particle.
    ///
    /// Quadratic in the number of particles; intended for small systems and tests.
    pub fn build_brute_force(system: &ParticleSystem, cutoff: f64) -> Self {
        let cutsq = cutoff * cutoff;
        let particles = system.particles();

        let ilist: Vec<usize> = system.owned_range().collect();
        let neighbors = ilist
            .iter()
            .map(|&i| {
                let xi = particles[i].position;
                particles
                    .iter()
                    .enumerate()
                    .filter(|&(j, pj)| j != i && (xi - pj.position).norm_squared() < cutsq)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();

        Self { ilist, neighbors }
    }

    pub fn inum(&self) -> usize {
        self.ilist.len()
    }

    pub fn ilist(&self) -> &[usize] {
        &self.ilist
    }

    pub fn neighbors_of(&self, ii: usize) -> &[usize] {
        &self.neighbors[ii]
    }

    /// Iterates `(i, neighbors of i)` in list order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.ilist
            .iter()
            .copied()
            .zip(self.neighbors.iter().map(Vec::as_slice))
    }

    pub fn total_neighbors(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }
}
