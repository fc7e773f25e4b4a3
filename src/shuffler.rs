use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::TrackSet;

pub const DEFAULT_PASSES: usize = 10;

/// Randomizes the order of a track set.
///
/// Every pass walks all positions and swaps each with a uniformly drawn
/// position of the whole sequence. A single pass of this walk is slightly
/// biased; repeating it drives the position distribution to uniform.
#[derive(Debug, Clone)]
pub struct Shuffler {
    passes: usize,
    seed: Option<u64>,
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::new(DEFAULT_PASSES)
    }
}

impl Shuffler {
    pub fn new(passes: usize) -> Self {
        Self {
            passes: passes.max(1),
            seed: None,
        }
    }

    /// Makes every shuffle reproducible. Without a seed the thread rng is used,
    /// which is seeded from the operating system.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn shuffle(&self, tracks: TrackSet) -> TrackSet {
        match self.seed {
            Some(seed) => self.shuffle_with(tracks, &mut StdRng::seed_from_u64(seed)),
            None => self.shuffle_with(tracks, &mut rand::rng()),
        }
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&self, mut tracks: TrackSet, rng: &mut R) -> TrackSet {
        let len = tracks.len();
        if len < 2 {
            return tracks;
        }
        for _ in 0..self.passes {
            for i in 0..len {
                let j = rng.random_range(0..len);
                tracks.swap(i, j);
            }
        }
        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackId;

    fn tracks(n: usize) -> TrackSet {
        (0..n).map(|i| TrackId::new(format!("t{i}"))).collect()
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let input = tracks(257);
        let output = Shuffler::default().shuffle(input.clone());

        assert_eq!(output.len(), input.len());
        let mut sorted_in = input.clone();
        let mut sorted_out = output.clone();
        sorted_in.sort();
        sorted_out.sort();
        assert_eq!(sorted_in, sorted_out);
    }

    #[test]
    fn test_shuffle_keeps_duplicates() {
        let input = vec![
            TrackId::new("a"),
            TrackId::new("a"),
            TrackId::new("b"),
            TrackId::new("c"),
        ];
        let mut output = Shuffler::new(3).shuffle(input.clone());
        output.sort();
        assert_eq!(
            output,
            vec![
                TrackId::new("a"),
                TrackId::new("a"),
                TrackId::new("b"),
                TrackId::new("c"),
            ]
        );
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        assert!(Shuffler::default().shuffle(Vec::new()).is_empty());
        assert_eq!(
            Shuffler::default().shuffle(vec![TrackId::new("only")]),
            vec![TrackId::new("only")]
        );
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let shuffler = Shuffler::default().with_seed(Some(42));
        assert_eq!(shuffler.shuffle(tracks(50)), shuffler.shuffle(tracks(50)));
    }

    #[test]
    fn test_passes_clamped_to_one() {
        assert_eq!(Shuffler::new(0).passes(), 1);
    }

    #[test]
    fn test_position_distribution_is_uniform() {
        const LEN: usize = 8;
        const TRIALS: usize = 40_000;

        let shuffler = Shuffler::default();
        let mut rng = StdRng::seed_from_u64(7);
        let input = tracks(LEN);
        let first = input[0].clone();
        let mut counts = [0usize; LEN];

        for _ in 0..TRIALS {
            let output = shuffler.shuffle_with(input.clone(), &mut rng);
            let position = output.iter().position(|t| *t == first).unwrap();
            counts[position] += 1;
        }

        // Chi-squared with 7 degrees of freedom; 24.3 is the 0.001 critical value.
        let expected = TRIALS as f64 / LEN as f64;
        let chi_squared: f64 = counts
            .iter()
            .map(|&count| {
                let diff = count as f64 - expected;
                diff * diff / expected
            })
            .sum();
        assert!(
            chi_squared < 24.3,
            "positions not uniform: {counts:?} (chi^2 = {chi_squared})"
        );
    }
}
