//! SplitMix64 generator for sampling trials. Each trial seeds its own instance, so a
//! run is reproducible for a given base seed no matter how trials are scheduled.
//! Not cryptographically secure.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generator for trial `trial` of a run seeded with `base_seed`.
    pub fn for_trial(base_seed: u64, trial: usize) -> Self {
        let mut mixer = Self::new(base_seed ^ (trial as u64).wrapping_mul(SPLITMIX64_GOLDEN));
        Self::new(mixer.next_u64())
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }

    /// Uniform value in `0..bound`. `bound` must be non-zero.
    #[inline]
    pub fn below(&mut self, bound: usize) -> usize {
        ((u128::from(self.next_u64()) * bound as u128) >> 64) as usize
    }

    /// `count` distinct items drawn uniformly from `items` (partial Fisher-Yates).
    /// Returns every item, shuffled, when `count >= items.len()`.
    pub fn sample<T: Copy>(&mut self, items: &[T], count: usize) -> Vec<T> {
        let mut scratch = items.to_vec();
        let take = count.min(scratch.len());
        for i in 0..take {
            let j = i + self.below(scratch.len() - i);
            scratch.swap(i, j);
        }
        scratch.truncate(take);
        scratch
    }
}
