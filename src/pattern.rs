//! Fixed-length step patterns
//!
//! A `StepPattern` is an ordered sequence of 1..=128 onset/rest steps stored
//! as a bitset: bit `i` of `bits` is step `i`, counted from the downbeat.
//! Bits at or beyond `len` are always clear.

use crate::error_diagnostics::UpiError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Largest step count a pattern may have
pub const MAX_STEPS: usize = 128;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepPattern {
    bits: u128,
    len: u8,
}

fn mask(len: usize) -> u128 {
    if len >= MAX_STEPS {
        u128::MAX
    } else {
        (1u128 << len) - 1
    }
}

/// Check that `len` is a legal step count
pub fn check_steps(len: usize) -> Result<usize, UpiError> {
    if (1..=MAX_STEPS).contains(&len) {
        Ok(len)
    } else {
        Err(UpiError::StepCount(len))
    }
}

impl StepPattern {
    /// All-rest pattern of `len` steps
    pub fn silence(len: usize) -> Result<Self, UpiError> {
        let len = check_steps(len)?;
        Ok(Self {
            bits: 0,
            len: len as u8,
        })
    }

    /// Build from raw bits; bits beyond `len` are discarded
    pub fn from_bits(bits: u128, len: usize) -> Result<Self, UpiError> {
        let len = check_steps(len)?;
        Ok(Self {
            bits: bits & mask(len),
            len: len as u8,
        })
    }

    pub fn from_bools(steps: &[bool]) -> Result<Self, UpiError> {
        let mut pattern = Self::silence(steps.len())?;
        for (i, &on) in steps.iter().enumerate() {
            pattern.set(i, on);
        }
        Ok(pattern)
    }

    /// Build from onset positions, each taken modulo `len`
    pub fn from_onsets<I>(len: usize, onsets: I) -> Result<Self, UpiError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut pattern = Self::silence(len)?;
        for pos in onsets {
            pattern.set(pos % len, true);
        }
        Ok(pattern)
    }

    /// Parse a string of `1`/`0` characters, left to right
    pub fn from_binary_str(text: &str) -> Result<Self, UpiError> {
        let mut steps = Vec::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '1' => steps.push(true),
                '0' => steps.push(false),
                other => {
                    return Err(UpiError::InvalidDigit {
                        digit: other,
                        base: "binary",
                    })
                }
            }
        }
        if steps.is_empty() {
            return Err(UpiError::Empty);
        }
        Self::from_bools(&steps)
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false: a pattern has at least one step
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bits(&self) -> u128 {
        self.bits
    }

    /// Onset at `step`; out-of-range steps read as rests
    pub fn get(&self, step: usize) -> bool {
        step < self.len() && (self.bits >> step) & 1 == 1
    }

    /// Set or clear `step`; out-of-range steps are ignored
    pub fn set(&mut self, step: usize, on: bool) {
        if step >= self.len() {
            return;
        }
        if on {
            self.bits |= 1 << step;
        } else {
            self.bits &= !(1 << step);
        }
    }

    pub fn toggle(&mut self, step: usize) {
        let on = self.get(step);
        self.set(step, !on);
    }

    pub fn onset_count(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Onset positions in ascending order
    pub fn onsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&i| self.get(i))
    }

    pub fn to_bools(&self) -> Vec<bool> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Rotate so that step `i` moves to `(i + offset) mod len`
    pub fn rotate(&self, offset: i64) -> Self {
        let len = self.len();
        let r = offset.rem_euclid(len as i64) as usize;
        if r == 0 {
            return *self;
        }
        let bits = ((self.bits << r) | (self.bits >> (len - r))) & mask(len);
        Self {
            bits,
            len: self.len,
        }
    }

    /// Swap onsets and rests
    pub fn invert(&self) -> Self {
        Self {
            bits: !self.bits & mask(self.len()),
            len: self.len,
        }
    }

    pub fn reverse(&self) -> Self {
        let bits = self.bits.reverse_bits() >> (MAX_STEPS - self.len());
        Self {
            bits,
            len: self.len,
        }
    }

    /// Append `other` after this pattern
    pub fn concat(&self, other: &StepPattern) -> Result<Self, UpiError> {
        let len = check_steps(self.len() + other.len())?;
        Ok(Self {
            bits: self.bits | (other.bits << self.len()),
            len: len as u8,
        })
    }

    /// Keep only the first `len` steps
    pub fn truncate(&self, len: usize) -> Result<Self, UpiError> {
        Self::from_bits(self.bits, len.min(self.len()))
    }

    /// Binary string, step 0 first
    pub fn to_binary_string(&self) -> String {
        (0..self.len())
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Display for StepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_binary_string())
    }
}

impl fmt::Debug for StepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StepPattern({})", self.to_binary_string())
    }
}

impl Serialize for StepPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_binary_string())
    }
}

pub fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

pub fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        0
    } else {
        a / gcd(a, b) * b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> StepPattern {
        StepPattern::from_binary_str(s).unwrap()
    }

    #[test]
    fn test_step_count_bounds() {
        assert!(StepPattern::silence(0).is_err());
        assert!(StepPattern::silence(129).is_err());
        assert_eq!(StepPattern::silence(128).unwrap().len(), 128);
    }

    #[test]
    fn test_rotate_moves_steps_forward() {
        assert_eq!(p("10010010").rotate(2).to_binary_string(), "10100100");
        assert_eq!(p("10010010").rotate(-1).to_binary_string(), "00100101");
    }

    #[test]
    fn test_rotate_full_length_is_identity() {
        let pattern = p("1101001000");
        assert_eq!(pattern.rotate(10), pattern);
        assert_eq!(pattern.rotate(-30), pattern);
    }

    #[test]
    fn test_rotate_at_max_length() {
        let mut pattern = StepPattern::silence(128).unwrap();
        pattern.set(127, true);
        let rotated = pattern.rotate(1);
        assert!(rotated.get(0));
        assert_eq!(rotated.onset_count(), 1);
    }

    #[test]
    fn test_invert_reverse_concat() {
        assert_eq!(p("1100").invert().to_binary_string(), "0011");
        assert_eq!(p("1101").reverse().to_binary_string(), "1011");
        assert_eq!(p("10").concat(&p("011")).unwrap().to_binary_string(), "10011");
    }

    #[test]
    fn test_gcd_lcm() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(lcm(7, 11), 77);
        assert_eq!(lcm(4, 6), 12);
    }
}
