//! The ring of candles on the cake and the policy for blowing them out.

use crate::error::{Error, Result};
use super::sequencer::Rng;

/// Lit/unlit state of every candle in the session.
///
/// Candles only ever go out: the lit count is monotonically non-increasing
/// for the lifetime of the field.
#[derive(Debug, Clone)]
pub struct CandleField {
    lit: Vec<bool>,
}

impl CandleField {
    /// A field of `count` candles, all lit.
    pub fn new(count: usize) -> Self {
        Self {
            lit: vec![true; count],
        }
    }

    pub fn total(&self) -> usize {
        self.lit.len()
    }

    pub fn count_lit(&self) -> usize {
        self.lit.iter().filter(|&&l| l).count()
    }

    pub fn count_blown(&self) -> usize {
        self.total() - self.count_lit()
    }

    pub fn is_lit(&self, index: usize) -> bool {
        self.lit.get(index).copied().unwrap_or(false)
    }

    /// Read-only view of the lit flags, indexed by candle.
    pub fn states(&self) -> &[bool] {
        &self.lit
    }

    /// Blow out candles until `floor(total * fraction)` are out in total.
    ///
    /// `fraction` is cumulative against the whole field. The candles to put
    /// out are chosen uniformly among the ones still lit. If the target is
    /// already met (or a smaller fraction arrives after a larger one) nothing
    /// changes. Returns the newly extinguished indices, ascending.
    pub fn extinguish(&mut self, fraction: f64, rng: &mut Rng) -> Result<Vec<usize>> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidFraction(fraction));
        }

        let total = self.total();
        let target_blown = (total as f64 * fraction).floor() as usize;
        let lit_now = self.count_lit();
        let already_blown = total - lit_now;
        let to_blow = target_blown.saturating_sub(already_blown).min(lit_now);
        if to_blow == 0 {
            return Ok(Vec::new());
        }

        let mut lit_indices: Vec<usize> = self
            .lit
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| l.then_some(i))
            .collect();
        rng.shuffle_prefix(&mut lit_indices, to_blow);

        let mut chosen = lit_indices[..to_blow].to_vec();
        for &i in &chosen {
            self.lit[i] = false;
        }
        chosen.sort_unstable();

        log::debug!(
            "extinguished {} candles (target fraction {}), {} still lit",
            to_blow,
            fraction,
            self.count_lit()
        );
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_field_is_fully_lit() {
        let field = CandleField::new(35);
        assert_eq!(field.total(), 35);
        assert_eq!(field.count_lit(), 35);
        assert!(field.states().iter().all(|&l| l));
    }

    #[test]
    fn cumulative_fractions_match_floor_formula() {
        for total in 1..60usize {
            let mut field = CandleField::new(total);
            let mut rng = Rng::new(total as u64);
            let mut prev_lit = total;
            for f in [0.3, 0.7, 1.0] {
                field.extinguish(f, &mut rng).unwrap();
                let expected = total - (total as f64 * f).floor() as usize;
                assert_eq!(field.count_lit(), expected, "total {total}, fraction {f}");
                assert!(field.count_lit() <= prev_lit);
                prev_lit = field.count_lit();
            }
        }
    }

    #[test]
    fn thirty_five_candles_go_out_in_three_blows() {
        let mut field = CandleField::new(35);
        let mut rng = Rng::new(42);

        let first = field.extinguish(0.3, &mut rng).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(field.count_lit(), 25);

        let second = field.extinguish(0.7, &mut rng).unwrap();
        assert_eq!(second.len(), 14);
        assert_eq!(field.count_lit(), 11);

        let last = field.extinguish(1.0, &mut rng).unwrap();
        assert_eq!(last.len(), 11);
        assert_eq!(field.count_lit(), 0);
    }

    #[test]
    fn only_lit_candles_are_selected() {
        let mut field = CandleField::new(35);
        let mut rng = Rng::new(3);
        for f in [0.3, 0.5, 0.7, 0.9, 1.0] {
            let before = field.states().to_vec();
            let chosen = field.extinguish(f, &mut rng).unwrap();
            for &i in &chosen {
                assert!(before[i], "candle {i} was already out");
                assert!(!field.is_lit(i));
            }
            let mut dedup = chosen.clone();
            dedup.dedup();
            assert_eq!(dedup.len(), chosen.len());
        }
    }

    #[test]
    fn smaller_fraction_after_larger_is_a_no_op() {
        let mut field = CandleField::new(35);
        let mut rng = Rng::new(8);
        field.extinguish(0.7, &mut rng).unwrap();
        let lit = field.count_lit();
        let chosen = field.extinguish(0.3, &mut rng).unwrap();
        assert!(chosen.is_empty());
        assert_eq!(field.count_lit(), lit);
    }

    #[test]
    fn repeating_a_fraction_is_idempotent() {
        let mut field = CandleField::new(20);
        let mut rng = Rng::new(8);
        field.extinguish(0.5, &mut rng).unwrap();
        assert!(field.extinguish(0.5, &mut rng).unwrap().is_empty());
        assert_eq!(field.count_lit(), 10);
    }

    #[test]
    fn out_of_range_fraction_rejected() {
        let mut field = CandleField::new(10);
        let mut rng = Rng::new(1);
        assert!(matches!(field.extinguish(1.5, &mut rng), Err(Error::InvalidFraction(_))));
        assert!(matches!(field.extinguish(-0.1, &mut rng), Err(Error::InvalidFraction(_))));
        assert!(field.extinguish(f64::NAN, &mut rng).is_err());
        assert_eq!(field.count_lit(), 10);
    }

    #[test]
    fn empty_field_is_harmless() {
        let mut field = CandleField::new(0);
        let mut rng = Rng::new(1);
        assert!(field.extinguish(1.0, &mut rng).unwrap().is_empty());
        assert!(!field.is_lit(0));
    }

    #[test]
    fn selection_has_no_positional_bias() {
        let trials = 20_000;
        let mut hits = [0u32; 10];
        let mut rng = Rng::new(77);
        for _ in 0..trials {
            let mut field = CandleField::new(10);
            for i in field.extinguish(0.3, &mut rng).unwrap() {
                hits[i] += 1;
            }
        }
        // each candle is picked with probability 3/10
        let expected = trials as f64 * 0.3;
        for h in hits {
            let dev = (h as f64 - expected).abs() / expected;
            assert!(dev < 0.05, "hit count {h} deviates {dev:.3}");
        }
    }
}
