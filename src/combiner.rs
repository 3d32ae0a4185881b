//! LCM projection and boolean combination of patterns
//!
//! Operands are rescaled onto a shared grid of `S = lcm(L1, .., LN)` steps
//! with `round(pos * S / len) mod S` before the set operation runs, so
//! `P(7,0)+P(11,0)` lands on 77 steps.

use crate::error_diagnostics::UpiError;
use crate::pattern::{check_steps, lcm, StepPattern, MAX_STEPS};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineOp {
    /// `+`
    Union,
    /// `&`
    Intersection,
    /// `^`
    Xor,
    /// `-`, left minus right
    Difference,
}

impl CombineOp {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(CombineOp::Union),
            '&' => Some(CombineOp::Intersection),
            '^' => Some(CombineOp::Xor),
            '-' => Some(CombineOp::Difference),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            CombineOp::Union => '+',
            CombineOp::Intersection => '&',
            CombineOp::Xor => '^',
            CombineOp::Difference => '-',
        }
    }

    fn apply_bits(&self, left: u128, right: u128) -> u128 {
        match self {
            CombineOp::Union => left | right,
            CombineOp::Intersection => left & right,
            CombineOp::Xor => left ^ right,
            CombineOp::Difference => left & !right,
        }
    }
}

impl fmt::Display for CombineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Shared step count of `lengths`, rejecting grids past 128 steps
pub fn shared_length<I>(lengths: I) -> Result<usize, UpiError>
where
    I: IntoIterator<Item = usize>,
{
    let mut shared = 1usize;
    for len in lengths {
        shared = lcm(shared, len);
        if shared > MAX_STEPS {
            return Err(UpiError::StepCount(shared));
        }
    }
    check_steps(shared)
}

/// Rescale `pattern` onto `target` steps by rounding each onset position
pub fn project(pattern: &StepPattern, target: usize) -> Result<StepPattern, UpiError> {
    let len = pattern.len();
    if len == target {
        return Ok(*pattern);
    }
    let positions = pattern.onsets().map(|pos| {
        let scaled = (pos * target) as f64 / len as f64;
        scaled.round() as usize % target
    });
    StepPattern::from_onsets(target, positions)
}

/// Combine two patterns on their shared grid
pub fn combine(
    left: &StepPattern,
    op: CombineOp,
    right: &StepPattern,
) -> Result<StepPattern, UpiError> {
    let shared = shared_length([left.len(), right.len()])?;
    let left = project(left, shared)?;
    let right = project(right, shared)?;
    StepPattern::from_bits(op.apply_bits(left.bits(), right.bits()), shared)
}

/// Fold `op` over all `patterns` on one grid
pub fn combine_all(patterns: &[StepPattern], op: CombineOp) -> Result<StepPattern, UpiError> {
    let (first, rest) = patterns.split_first().ok_or(UpiError::Empty)?;
    let shared = shared_length(patterns.iter().map(|p| p.len()))?;
    let mut bits = project(first, shared)?.bits();
    for pattern in rest {
        bits = op.apply_bits(bits, project(pattern, shared)?.bits());
    }
    StepPattern::from_bits(bits, shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::{euclidean, polygon};

    #[test]
    fn test_polygon_union_uses_lcm() {
        let seven = polygon(7, 0, 7).unwrap();
        let eleven = polygon(11, 0, 11).unwrap();
        let combined = combine(&seven, CombineOp::Union, &eleven).unwrap();
        assert_eq!(combined.len(), 77);
        // both vertex sets share only the downbeat
        assert_eq!(combined.onset_count(), 7 + 11 - 1);
        assert!(combined.get(11));
        assert!(combined.get(7));
    }

    #[test]
    fn test_difference_is_left_minus_right() {
        let left = StepPattern::from_binary_str("1111").unwrap();
        let right = StepPattern::from_binary_str("1010").unwrap();
        let result = combine(&left, CombineOp::Difference, &right).unwrap();
        assert_eq!(result.to_binary_string(), "0101");
    }

    #[test]
    fn test_intersection_and_xor_on_shared_grid() {
        let a = euclidean(2, 4).unwrap();
        let b = euclidean(3, 6).unwrap();
        let and = combine(&a, CombineOp::Intersection, &b).unwrap();
        assert_eq!(and.len(), 12);
        assert_eq!(and.to_binary_string(), "100000000000");
        let xor = combine(&a, CombineOp::Xor, &b).unwrap();
        assert_eq!(xor.to_binary_string(), "000010101000");
    }

    #[test]
    fn test_grid_too_large() {
        let a = StepPattern::silence(127).unwrap();
        let b = StepPattern::silence(2).unwrap();
        assert_eq!(
            combine(&a, CombineOp::Union, &b),
            Err(UpiError::StepCount(254))
        );
    }
}
