//! Rhythm generators
//!
//! Pure functions from numeric parameters to a `StepPattern`:
//! - `euclidean` - bucket distribution, first onset on the downbeat
//! - `barlow` - top-k positions by metric indispensability
//! - `wolrab` - the k least indispensable positions
//! - `dilcue` - complement of the Euclidean rhythm
//! - `polygon` - vertices of a regular polygon on the step circle
//! - `random` / `bell_random` - seeded uniform choices

use crate::error_diagnostics::UpiError;
use crate::pattern::{check_steps, gcd, StepPattern, MAX_STEPS};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generators that can drive a progressive transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    Euclidean,
    Barlow,
    Wolrab,
    Dilcue,
}

impl Algorithm {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'e' => Some(Algorithm::Euclidean),
            'b' => Some(Algorithm::Barlow),
            'w' => Some(Algorithm::Wolrab),
            'd' => Some(Algorithm::Dilcue),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Algorithm::Euclidean => 'E',
            Algorithm::Barlow => 'B',
            Algorithm::Wolrab => 'W',
            Algorithm::Dilcue => 'D',
        }
    }

    /// Canonical pattern of this generator for `onsets` over `steps`
    pub fn generate(&self, onsets: usize, steps: usize) -> Result<StepPattern, UpiError> {
        match self {
            Algorithm::Euclidean => euclidean(onsets, steps),
            Algorithm::Barlow => barlow(onsets, steps),
            Algorithm::Wolrab => wolrab(onsets, steps),
            Algorithm::Dilcue => dilcue(onsets, steps),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Euclidean rhythm by bucket accumulation
///
/// The accumulator starts at `steps - onsets` so the first onset lands on
/// step 0: E(3,8) -> 10010010, E(5,8) -> 10101101.
pub fn euclidean(onsets: usize, steps: usize) -> Result<StepPattern, UpiError> {
    let steps = check_steps(steps)?;
    let onsets = onsets.min(steps);
    let mut pattern = StepPattern::silence(steps)?;
    if onsets == 0 {
        return Ok(pattern);
    }

    let mut bucket = steps - onsets;
    for i in 0..steps {
        bucket += onsets;
        if bucket >= steps {
            bucket -= steps;
            pattern.set(i, true);
        }
    }
    Ok(pattern)
}

/// Euclidean rhythm rotated so step `i` moves to `i + rotation`
pub fn euclidean_rotated(
    onsets: usize,
    steps: usize,
    rotation: i64,
) -> Result<StepPattern, UpiError> {
    Ok(euclidean(onsets, steps)?.rotate(rotation))
}

fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            factors.push(p);
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Indispensability of `position` within a cycle of `steps`
///
/// Position 0 is maximal. Otherwise with `q = steps / gcd(position, steps)`
/// the score is the sum of `(p - 1) / p` over the prime factors of `q`,
/// repeated factors included.
pub fn indispensability(position: usize, steps: usize) -> f64 {
    if position % steps == 0 {
        return f64::MAX;
    }
    let q = steps / gcd(position % steps, steps);
    prime_factors(q)
        .into_iter()
        .map(|p| (p as f64 - 1.0) / p as f64)
        .sum()
}

/// Positions ordered by indispensability, most indispensable first
///
/// Ties go to the lower position.
pub fn indispensability_ranking(steps: usize) -> Vec<usize> {
    let scores: Vec<f64> = (0..steps).map(|p| indispensability(p, steps)).collect();
    let mut ranking: Vec<usize> = (0..steps).collect();
    ranking.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    ranking
}

/// Barlow: the `onsets` most indispensable positions
pub fn barlow(onsets: usize, steps: usize) -> Result<StepPattern, UpiError> {
    let steps = check_steps(steps)?;
    let ranking = indispensability_ranking(steps);
    StepPattern::from_onsets(steps, ranking.into_iter().take(onsets.min(steps)))
}

/// Wolrab: the `onsets` least indispensable positions
pub fn wolrab(onsets: usize, steps: usize) -> Result<StepPattern, UpiError> {
    let steps = check_steps(steps)?;
    let scores: Vec<f64> = (0..steps).map(|p| indispensability(p, steps)).collect();
    let mut ranking: Vec<usize> = (0..steps).collect();
    ranking.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]).then(a.cmp(&b)));
    StepPattern::from_onsets(steps, ranking.into_iter().take(onsets.min(steps)))
}

/// Dilcue: complement of E(steps - onsets, steps)
pub fn dilcue(onsets: usize, steps: usize) -> Result<StepPattern, UpiError> {
    let steps = check_steps(steps)?;
    let onsets = onsets.min(steps);
    Ok(euclidean(steps - onsets, steps)?.invert())
}

/// Polygon vertices projected onto `steps`
///
/// Vertex `i` sits at `round(i * steps / sides) + offset` modulo `steps`.
/// Vertices that collide share one onset.
pub fn polygon(sides: usize, offset: i64, steps: usize) -> Result<StepPattern, UpiError> {
    let steps = check_steps(steps)?;
    if sides == 0 || sides > MAX_STEPS {
        return Err(UpiError::InvalidArgument(format!(
            "polygon sides must be in 1..={}, got {}",
            MAX_STEPS, sides
        )));
    }
    let offset = offset.rem_euclid(steps as i64);
    let positions = (0..sides).map(|i| {
        let vertex = ((i * steps) as f64 / sides as f64).round() as i64;
        (vertex + offset).rem_euclid(steps as i64) as usize
    });
    StepPattern::from_onsets(steps, positions)
}

/// `onsets` unique positions chosen uniformly from `steps`
pub fn random(onsets: usize, steps: usize, seed: u64) -> Result<StepPattern, UpiError> {
    let steps = check_steps(steps)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let chosen = rand::seq::index::sample(&mut rng, steps, onsets.min(steps));
    StepPattern::from_onsets(steps, chosen.iter())
}

/// Onset count drawn from a bell curve centred on `steps / 2`
///
/// Three summed uniforms approximate a normal with standard deviation
/// `(steps - 2) / 6`; the draw is clamped to `[1, steps - 1]`.
pub fn bell_onset_count(steps: usize, rng: &mut StdRng) -> usize {
    if steps <= 2 {
        return 1;
    }
    let z = (rng.gen::<f64>() + rng.gen::<f64>() + rng.gen::<f64>() - 1.5) / 0.5;
    let sd = (steps as f64 - 2.0) / 6.0;
    let count = (steps as f64 / 2.0 + z * sd).round();
    count.clamp(1.0, steps as f64 - 1.0) as usize
}

/// Random pattern whose onset count follows `bell_onset_count`
pub fn bell_random(steps: usize, seed: u64) -> Result<StepPattern, UpiError> {
    let steps = check_steps(steps)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let onsets = bell_onset_count(steps, &mut rng);
    let chosen = rand::seq::index::sample(&mut rng, steps, onsets);
    StepPattern::from_onsets(steps, chosen.iter())
}
