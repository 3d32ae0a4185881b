//! Angular resampling of a pattern onto a new step count
//!
//! Each onset keeps its angle on the circle: position `p` of `L` steps sits
//! at `p / L` of a turn and lands on the nearest of the `new_len` steps.
//! Counter-clockwise resampling mirrors the angle first.

use crate::error_diagnostics::UpiError;
use crate::pattern::{check_steps, StepPattern};
use serde::Serialize;

/// Direction and onset bookkeeping of a quantization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuantizationMeta {
    pub original_steps: usize,
    pub target_steps: usize,
    pub original_onsets: usize,
    pub quantized_onsets: usize,
    pub clockwise: bool,
}

pub fn quantize(
    pattern: &StepPattern,
    new_len: usize,
    clockwise: bool,
) -> Result<StepPattern, UpiError> {
    let new_len = check_steps(new_len)?;
    let len = pattern.len();
    if new_len == len && clockwise {
        return Ok(*pattern);
    }

    // angles are kept as fractions of a turn
    let positions = pattern.onsets().map(|p| {
        let mut turn = p as f64 / len as f64;
        if !clockwise {
            turn = 1.0 - turn;
        }
        (turn * new_len as f64).round() as usize % new_len
    });
    StepPattern::from_onsets(new_len, positions)
}

/// Quantize and report what changed
pub fn quantize_with_meta(
    pattern: &StepPattern,
    new_len: usize,
    clockwise: bool,
) -> Result<(StepPattern, QuantizationMeta), UpiError> {
    let quantized = quantize(pattern, new_len, clockwise)?;
    let meta = QuantizationMeta {
        original_steps: pattern.len(),
        target_steps: quantized.len(),
        original_onsets: pattern.onset_count(),
        quantized_onsets: quantized.onset_count(),
        clockwise,
    };
    Ok((quantized, meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_length_clockwise_is_identity() {
        let pattern = StepPattern::from_binary_str("1101001").unwrap();
        assert_eq!(quantize(&pattern, 7, true).unwrap(), pattern);
    }

    #[test]
    fn test_doubling_spreads_onsets() {
        let pattern = StepPattern::from_binary_str("1010").unwrap();
        let doubled = quantize(&pattern, 8, true).unwrap();
        assert_eq!(doubled.to_binary_string(), "10001000");
    }

    #[test]
    fn test_collisions_collapse() {
        let pattern = StepPattern::from_binary_str("11111111").unwrap();
        let halved = quantize(&pattern, 4, true).unwrap();
        assert_eq!(halved.onset_count(), 4);
    }

    #[test]
    fn test_counter_clockwise_mirrors() {
        let pattern = StepPattern::from_binary_str("11000000").unwrap();
        let mirrored = quantize(&pattern, 8, false).unwrap();
        assert_eq!(mirrored.to_binary_string(), "10000001");
    }

    #[test]
    fn test_rejects_bad_length() {
        let pattern = StepPattern::from_binary_str("1").unwrap();
        assert_eq!(quantize(&pattern, 0, true), Err(UpiError::StepCount(0)));
        assert_eq!(quantize(&pattern, 129, true), Err(UpiError::StepCount(129)));
    }
}
