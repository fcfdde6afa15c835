//! Seedable uniform sources for the belief-update trials.
//!
//! Every generator is built from an explicit `u64` seed so that a run is
//! reproducible bit-for-bit. There is no thread-local variant.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FastRngKind {
    #[default]
    Xoshiro256PlusPlus,
    StdRng,
}

/// xoshiro256++ with its state expanded from the seed by SplitMix64.
#[derive(Debug)]
pub struct Xoshiro256PlusPlus {
    s: [u64; 4],
}

impl Xoshiro256PlusPlus {
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut x = seed;
        let mut s = [0_u64; 4];
        for word in &mut s {
            x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
            *word = splitmix_mix(x);
        }
        // The all-zero state is a fixed point.
        if s == [0; 4] {
            s[0] = 1;
        }
        Self { s }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = self.s;
        let out = s0.wrapping_add(s3).rotate_left(23).wrapping_add(s0);
        let t2 = s2 ^ s0;
        let t3 = s3 ^ s1;
        self.s = [s0 ^ t3, s1 ^ t2, t2 ^ (s1 << 17), t3.rotate_left(45)];
        out
    }

    /// Uniform on `[0, 1)` from the top 53 bits.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * f64::EPSILON / 2.0
    }
}

#[inline]
fn splitmix_mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seeded random source passed explicitly into the belief loop.
#[derive(Debug)]
pub enum FastRng {
    Xoshiro256PlusPlus(Xoshiro256PlusPlus),
    StdRng(StdRng),
}

impl FastRng {
    pub fn from_seed(kind: FastRngKind, seed: u64) -> Self {
        match kind {
            FastRngKind::Xoshiro256PlusPlus => {
                Self::Xoshiro256PlusPlus(Xoshiro256PlusPlus::seed_from_u64(seed))
            }
            FastRngKind::StdRng => Self::StdRng(StdRng::seed_from_u64(seed)),
        }
    }

    /// Uniform draw on `[0, 1)`.
    #[inline]
    pub fn random_f64(&mut self) -> f64 {
        match self {
            Self::Xoshiro256PlusPlus(rng) => rng.next_f64(),
            Self::StdRng(rng) => rng.random::<f64>(),
        }
    }

    /// One Bernoulli trial with success probability `p`.
    ///
    /// Always consumes exactly one uniform draw, so the stream position does not
    /// depend on `p`. `p <= 0` never succeeds and `p >= 1` always does.
    #[inline]
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.random_f64() < p
    }
}
