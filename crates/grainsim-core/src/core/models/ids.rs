use slotmap::new_key_type;

new_key_type! {
    pub struct ContactId;
}

/// Global, partition-independent identifier of a particle.
pub type ParticleTag = u64;

/// Identifier of a wall (plane or mesh) taking part in particle-wall contacts.
pub type WallId = u32;

/// Key identifying a contact independently of which worker or step observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContactKey {
    Pair(ParticleTag, ParticleTag),
    Wall(ParticleTag, WallId),
}

impl ContactKey {
    /// Builds a particle-particle key; the smaller tag always comes first.
    pub fn pair(a: ParticleTag, b: ParticleTag) -> Self {
        if a <= b {
            Self::Pair(a, b)
        } else {
            Self::Pair(b, a)
        }
    }

    pub fn wall(particle: ParticleTag, wall: WallId) -> Self {
        Self::Wall(particle, wall)
    }
}
