use std::f32::consts::TAU;

use rand::Rng;

/// Sinusoid mapped into `[1 - depth, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillator {
    /// Hz.
    pub freq: f32,
    pub phase: f32,
    pub depth: f32,
}

impl Oscillator {
    pub const FLAT: Oscillator = Oscillator {
        freq: 0.0,
        phase: 0.0,
        depth: 0.0,
    };

    /// Random frequency in `freq` with a uniform phase.
    pub fn random(rng: &mut impl Rng, freq: std::ops::Range<f32>, depth: f32) -> Self {
        Self {
            freq: uniform(rng, freq.start, freq.end),
            phase: rng.random_range(0.0..TAU),
            depth,
        }
    }

    pub fn value(&self, time_s: f32) -> f32 {
        let s = (TAU * self.freq * time_s + self.phase).sin();
        1.0 - self.depth * (0.5 + 0.5 * s)
    }

    /// Raw sine in `[-1, 1]`.
    pub fn wave(&self, time_s: f32) -> f32 {
        (TAU * self.freq * time_s + self.phase).sin()
    }
}

/// Uniform sample in `[lo, hi)`, or `lo` when the range is empty.
pub(crate) fn uniform(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_stays_in_range() {
        let osc = Oscillator {
            freq: 1.7,
            phase: 0.3,
            depth: 0.4,
        };
        for i in 0..200 {
            let v = osc.value(i as f32 * 0.013);
            assert!((0.6 - 1e-6..=1.0 + 1e-6).contains(&v));
        }
    }

    #[test]
    fn flat_is_constant() {
        assert_eq!(Oscillator::FLAT.value(12.3), 1.0);
    }
}
