//! Seedable random sequencer (xorshift64) with unbiased shuffles.
//! Deterministic for a given seed, so sessions and tests can be replayed.

/// Seedable pseudo-random number generator (xorshift64).
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform integer in `[0, bound)`.
    ///
    /// Draws falling in the incomplete last bucket of the `u64` range are
    /// rejected, so every value has exactly the same probability.
    pub fn next_below(&mut self, bound: usize) -> usize {
        if bound <= 1 {
            return 0;
        }
        let bound = bound as u64;
        let zone = u64::MAX - (u64::MAX % bound);
        loop {
            let x = self.next_u64();
            if x < zone {
                return (x % bound) as usize;
            }
        }
    }

    /// Uniform float in `[0, 1)` built from the top 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform float in `[lo, hi)`.
    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_f32() * (hi - lo)
    }

    /// Pick one element uniformly, `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.next_below(items.len()))
        }
    }

    /// Full Fisher–Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i + 1);
            items.swap(i, j);
        }
    }

    /// Partial Fisher–Yates: after the call, `items[..k]` is a uniform random
    /// k-subset of the input in uniform random order. The tail is left in an
    /// unspecified order. `k` larger than the slice is clamped.
    pub fn shuffle_prefix<T>(&mut self, items: &mut [T], k: usize) {
        let n = items.len();
        for i in 0..k.min(n) {
            let j = i + self.next_below(n - i);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_deterministic() {
        let mut rng1 = Rng::new(42);
        let mut rng2 = Rng::new(42);
        for _ in 0..10 {
            assert_eq!(rng1.next_below(1000), rng2.next_below(1000));
        }
    }

    #[test]
    fn rng_zero_seed_handled() {
        let mut rng = Rng::new(0);
        // xorshift would be stuck at zero forever
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn next_f32_in_unit_range() {
        let mut rng = Rng::new(7);
        for _ in 0..1000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f), "got {f}");
        }
    }

    #[test]
    fn shuffle_is_a_permutation_for_all_small_lengths() {
        let mut rng = Rng::new(99);
        for n in 0..20 {
            let mut items: Vec<usize> = (0..n).collect();
            rng.shuffle(&mut items);
            assert_eq!(items.len(), n);
            let mut sorted = items.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffle_positions_are_roughly_uniform() {
        let mut rng = Rng::new(2024);
        let trials = 40_000;
        // counts[value][position]
        let mut counts = [[0u32; 4]; 4];
        for _ in 0..trials {
            let mut items = [0usize, 1, 2, 3];
            rng.shuffle(&mut items);
            for (pos, &value) in items.iter().enumerate() {
                counts[value][pos] += 1;
            }
        }
        let expected = trials as f64 / 4.0;
        for row in counts {
            for c in row {
                let dev = (c as f64 - expected).abs() / expected;
                assert!(dev < 0.05, "count {c} deviates {dev:.3} from {expected}");
            }
        }
    }

    #[test]
    fn shuffle_prefix_picks_distinct_elements() {
        let mut rng = Rng::new(5);
        let mut items: Vec<usize> = (0..35).collect();
        rng.shuffle_prefix(&mut items, 10);
        let mut head = items[..10].to_vec();
        head.sort_unstable();
        head.dedup();
        assert_eq!(head.len(), 10);
        let mut all = items.clone();
        all.sort_unstable();
        assert_eq!(all, (0..35).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_prefix_clamps_k() {
        let mut rng = Rng::new(5);
        let mut items = vec![1, 2, 3];
        rng.shuffle_prefix(&mut items, 10);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn pick_handles_empty() {
        let mut rng = Rng::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        assert_eq!(rng.pick(&[9]), Some(&9));
    }
}
