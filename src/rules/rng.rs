use crate::entity::EntityId;
use crate::Tick;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Stream selectors, so unrelated draws for one entity never share a sequence
pub mod salt {
    pub const WANDER: u64 = 0x5741_4e44;
    pub const CRIT: u64 = 0x4352_4954;
}

/// Generator for one (tick, entity, purpose) triple, rooted at the config seed.
///
/// Replaying a tick recreates exactly the same draws.
pub fn tick_rng(seed: u64, tick: Tick, entity: EntityId, salt: u64) -> ChaCha8Rng {
    let mut state = splitmix64(seed ^ salt);
    state = splitmix64(state ^ tick);
    state = splitmix64(state ^ entity.0);
    ChaCha8Rng::seed_from_u64(state)
}

fn splitmix64(z: u64) -> u64 {
    let mut x = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
