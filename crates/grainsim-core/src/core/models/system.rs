use super::particle::Particle;
use std::ops::Range;

/// Particles visible to one worker: the owned partition first, then read-only ghosts.
#[derive(Debug, Clone, Default)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    n_owned: usize,
}

impl ParticleSystem {
    /// Creates a system in which every particle is owned locally.
    pub fn new(particles: Vec<Particle>) -> Self {
        let n_owned = particles.len();
        Self { particles, n_owned }
    }

    /// Creates a system from an owned partition plus ghost copies of remote particles.
    pub fn with_ghosts(owned: Vec<Particle>, ghosts: Vec<Particle>) -> Self {
        let n_owned = owned.len();
        let mut particles = owned;
        particles.extend(ghosts);
        Self { particles, n_owned }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn n_owned(&self) -> usize {
        self.n_owned
    }

    pub fn owned_range(&self) -> Range<usize> {
        0..self.n_owned
    }

    pub fn owned(&self) -> &[Particle] {
        &self.particles[..self.n_owned]
    }

    /// Largest particle type present, i.e. the number of types the material table must cover.
    pub fn max_type(&self) -> usize {
        self.particles
            .iter()
            .map(|p| p.particle_type)
            .max()
            .unwrap_or(0)
    }

    pub fn max_radius(&self) -> f64 {
        self.particles.iter().map(|p| p.radius).fold(0.0, f64::max)
    }

    pub fn max_smoothing_length(&self) -> f64 {
        self.particles
            .iter()
            .map(|p| p.smoothing_length)
            .fold(0.0, f64::max)
    }

    /// Splits the owned particles into `workers` contiguous slabs.
    ///
    /// Every returned system owns one slab and carries all remaining particles
    /// as ghosts, so each worker sees the complete neighborhood of its particles.
    pub fn partition(&self, workers: usize) -> Vec<ParticleSystem> {
        let workers = workers.max(1);
        let owned = self.owned();
        let chunk = owned.len().div_ceil(workers).max(1);

        (0..workers)
            .map(|rank| {
                let start = (rank * chunk).min(owned.len());
                let end = ((rank + 1) * chunk).min(owned.len());
                let local = owned[start..end].to_vec();
                let ghosts = owned[..start]
                    .iter()
                    .chain(owned[end..].iter())
                    .chain(self.particles[self.n_owned..].iter())
                    .cloned()
                    .collect();
                ParticleSystem::with_ghosts(local, ghosts)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn particles(n: usize) -> Vec<Particle> {
        (0..n)
            .map(|i| Particle::new(i as u64 + 1, 1 + i % 2, Point3::new(i as f64, 0.0, 0.0), 0.5))
            .collect()
    }

    #[test]
    fn new_system_owns_every_particle() {
        let system = ParticleSystem::new(particles(4));
        assert_eq!(system.n_owned(), 4);
        assert_eq!(system.owned_range(), 0..4);
        assert_eq!(system.max_type(), 2);
    }

    #[test]
    fn partition_covers_every_particle_exactly_once_as_owned() {
        let system = ParticleSystem::new(particles(7));
        let parts = system.partition(3);
        assert_eq!(parts.len(), 3);

        let mut owned_tags: Vec<u64> = parts
            .iter()
            .flat_map(|p| p.owned().iter().map(|q| q.tag))
            .collect();
        owned_tags.sort_unstable();
        assert_eq!(owned_tags, vec![1, 2, 3, 4, 5, 6, 7]);

        for part in &parts {
            assert_eq!(part.len(), 7);
        }
    }

    #[test]
    fn partition_with_more_workers_than_particles_leaves_some_empty() {
        let system = ParticleSystem::new(particles(2));
        let parts = system.partition(4);
        let owned: usize = parts.iter().map(|p| p.n_owned()).sum();
        assert_eq!(owned, 2);
        assert!(parts.iter().any(|p| p.n_owned() == 0));
    }
}
