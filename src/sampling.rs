use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::location::LocationRecord;

/// Draw up to `count` distinct, non-placeholder records uniformly at random.
///
/// Returns every valid record (shuffled) when fewer than `count` exist;
/// detecting the shortfall is the caller's job.
pub fn sample_locations<R: Rng + ?Sized>(
    records: &[LocationRecord],
    count: usize,
    rng: &mut R,
) -> Vec<LocationRecord> {
    let mut seen = HashSet::new();
    let mut pool: Vec<LocationRecord> = records
        .iter()
        .filter(|r| !r.is_placeholder())
        .filter(|r| seen.insert(r.id.clone()))
        .cloned()
        .collect();

    pool.shuffle(rng);
    pool.truncate(count);
    pool
}
