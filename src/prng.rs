//! Seeded pseudo-random stream used for every content decision in the corpus.
//!
//! The generator is mulberry32: a single 32-bit state word advanced on every
//! draw. Given the same seed and the same sequence of call sites the output is
//! bit-for-bit reproducible, which is what makes two runs of the seeder
//! produce identical databases.

/// Distance the state advances on every draw.
const INCREMENT: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(INCREMENT);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(a | 1);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61)) ^ t;
        f64::from(t ^ (t >> 14)) / TWO_POW_32
    }

    /// Inclusive integer draw in `[min, max]`.
    pub fn int_range(&mut self, min: i64, max: i64) -> i64 {
        debug_assert!(max >= min, "int_range requires max >= min ({min}..={max})");
        let span = (max - min + 1) as f64;
        (self.next_f64() * span).floor() as i64 + min
    }

    /// Bernoulli trial that succeeds with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform pick from `values`.
    ///
    /// Panics when `values` is empty; every pool passed here is a non-empty
    /// constant or has been checked by the caller.
    pub fn choice<'a, T>(&mut self, values: &'a [T]) -> &'a T {
        assert!(!values.is_empty(), "choice from an empty pool");
        let idx = (self.next_f64() * values.len() as f64).floor() as usize;
        &values[idx.min(values.len() - 1)]
    }

    /// Fixture identifier shaped like a UUID (`8-4-4-4-12` hex digits).
    ///
    /// Not a real UUID: every digit is an independent draw.
    pub fn uuid_like(&mut self) -> String {
        let mut digits = String::with_capacity(36);
        for idx in 0..32 {
            if matches!(idx, 8 | 12 | 16 | 20) {
                digits.push('-');
            }
            let nibble = (self.next_f64() * 16.0).floor() as u32;
            digits.push(std::char::from_digit(nibble.min(15), 16).unwrap_or('0'));
        }
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-15
    }

    #[test]
    fn matches_reference_sequence_for_seed_42() {
        let mut rng = Mulberry32::new(42);
        assert!(approx(rng.next_f64(), 0.601_103_751_920_163_6));
        assert!(approx(rng.next_f64(), 0.448_290_558_997_541_67));
        assert!(approx(rng.next_f64(), 0.852_465_793_490_409_9));
    }

    #[test]
    fn matches_reference_sequence_for_seed_1() {
        let mut rng = Mulberry32::new(1);
        assert!(approx(rng.next_f64(), 0.627_073_940_588_161_3));
        assert!(approx(rng.next_f64(), 0.002_735_721_180_215_478));
    }

    #[test]
    fn reseeding_reproduces_stream() {
        let mut a = Mulberry32::new(7);
        let mut b = Mulberry32::new(7);
        let left: Vec<f64> = (0..64).map(|_| a.next_f64()).collect();
        let right: Vec<f64> = (0..64).map(|_| b.next_f64()).collect();
        assert_eq!(left, right);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        assert_ne!(
            Mulberry32::new(42).next_f64(),
            Mulberry32::new(43).next_f64()
        );
    }

    #[test]
    fn uuid_like_has_dashed_layout() {
        let mut rng = Mulberry32::new(42);
        let id = rng.uuid_like();
        let groups: Vec<usize> = id.split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
        assert!(id
            .chars()
            .all(|c| c == '-' || (c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
    }

    #[test]
    fn choice_stays_in_pool() {
        let mut rng = Mulberry32::new(3);
        let pool = ["a", "b", "c"];
        for _ in 0..200 {
            assert!(pool.contains(rng.choice(&pool)));
        }
    }

    #[test]
    #[should_panic(expected = "empty pool")]
    fn choice_rejects_empty_pool() {
        let mut rng = Mulberry32::new(3);
        let empty: [u8; 0] = [];
        rng.choice(&empty);
    }

    proptest! {
        #[test]
        fn next_is_unit_interval(seed in any::<u32>()) {
            let mut rng = Mulberry32::new(seed);
            for _ in 0..32 {
                let v = rng.next_f64();
                prop_assert!((0.0..1.0).contains(&v));
            }
        }

        #[test]
        fn int_range_is_inclusive(seed in any::<u32>(), min in -1000i64..1000, width in 0i64..500) {
            let mut rng = Mulberry32::new(seed);
            let max = min + width;
            for _ in 0..16 {
                let v = rng.int_range(min, max);
                prop_assert!(v >= min && v <= max);
            }
        }
    }
}
