//! Positional and symbolic pattern literals
//!
//! Hex and octal digits are unpacked LSB-first into consecutive groups of
//! 4 or 3 steps, walking the digit string left to right, so `0x94:8` is
//! `10010010`. Decimal values map bit `i` to step `i` (`d73:8` is the same
//! pattern). Steps past an explicit length are dropped; a longer explicit
//! length pads with rests.

use crate::error_diagnostics::UpiError;
use crate::pattern::{check_steps, StepPattern, MAX_STEPS};
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Digit base of a numeric literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Binary,
    Octal,
    Decimal,
    Hex,
}

impl Radix {
    pub fn name(&self) -> &'static str {
        match self {
            Radix::Binary => "binary",
            Radix::Octal => "octal",
            Radix::Decimal => "decimal",
            Radix::Hex => "hex",
        }
    }

    /// Steps per digit for the grouped bases
    pub fn group_width(&self) -> Option<usize> {
        match self {
            Radix::Binary => Some(1),
            Radix::Octal => Some(3),
            Radix::Hex => Some(4),
            Radix::Decimal => None,
        }
    }

    fn digit_value(&self, c: char) -> Result<u32, UpiError> {
        let value = match self {
            Radix::Binary => c.to_digit(2),
            Radix::Octal => c.to_digit(8),
            Radix::Decimal => c.to_digit(10),
            Radix::Hex => c.to_digit(16),
        };
        value.ok_or(UpiError::InvalidDigit {
            digit: c,
            base: self.name(),
        })
    }
}

/// Decode a numeric literal body (no prefix) into a pattern
pub fn decode_literal(
    radix: Radix,
    digits: &str,
    steps: Option<usize>,
) -> Result<StepPattern, UpiError> {
    if digits.is_empty() {
        return Err(UpiError::Empty);
    }
    match radix.group_width() {
        Some(width) => decode_grouped(radix, width, digits, steps),
        None => decode_decimal(digits, steps),
    }
}

fn decode_grouped(
    radix: Radix,
    width: usize,
    digits: &str,
    steps: Option<usize>,
) -> Result<StepPattern, UpiError> {
    let values = digits
        .chars()
        .map(|c| radix.digit_value(c))
        .collect::<Result<Vec<_>, _>>()?;
    let steps = check_steps(steps.unwrap_or(values.len() * width))?;

    let mut pattern = StepPattern::silence(steps)?;
    for (group, value) in values.into_iter().enumerate() {
        for bit in 0..width {
            let step = group * width + bit;
            if step >= steps {
                return Ok(pattern);
            }
            if (value >> bit) & 1 == 1 {
                pattern.set(step, true);
            }
        }
    }
    Ok(pattern)
}

fn decode_decimal(digits: &str, steps: Option<usize>) -> Result<StepPattern, UpiError> {
    let mut value: u128 = 0;
    for c in digits.chars() {
        let digit = Radix::Decimal.digit_value(c)?;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit as u128))
            .ok_or_else(|| {
                UpiError::InvalidArgument(format!(
                    "decimal value {} does not fit in 128 steps",
                    digits
                ))
            })?;
    }
    let steps = check_steps(steps.unwrap_or_else(|| decimal_default_steps(value)))?;
    StepPattern::from_bits(value, steps)
}

/// Default step count of a decimal value
pub fn decimal_default_steps(value: u128) -> usize {
    ((u128::BITS - value.leading_zeros()) as usize).max(8)
}

/// Onset positions such as `[0,3,6]` with an optional length
///
/// Without a length the pattern spans `max(last + 1, 8)` steps.
pub fn decode_array(onsets: &[usize], steps: Option<usize>) -> Result<StepPattern, UpiError> {
    let needed = onsets.iter().max().map_or(0, |&m| m + 1);
    let steps = check_steps(steps.unwrap_or(needed.max(8)))?;
    if let Some(&bad) = onsets.iter().find(|&&pos| pos >= steps) {
        return Err(UpiError::InvalidArgument(format!(
            "onset {} does not fit in {} steps",
            bad, steps
        )));
    }
    StepPattern::from_onsets(steps, onsets.iter().copied())
}

lazy_static! {
    static ref MORSE_TABLE: HashMap<char, &'static str> = {
        let mut table = HashMap::new();
        for (letter, code) in [
            ('a', ".-"), ('b', "-..."), ('c', "-.-."), ('d', "-.."),
            ('e', "."), ('f', "..-."), ('g', "--."), ('h', "...."),
            ('i', ".."), ('j', ".---"), ('k', "-.-"), ('l', ".-.."),
            ('m', "--"), ('n', "-."), ('o', "---"), ('p', ".--."),
            ('q', "--.-"), ('r', ".-."), ('s', "..."), ('t', "-"),
            ('u', "..-"), ('v', "...-"), ('w', ".--"), ('x', "-..-"),
            ('y', "-.--"), ('z', "--.."),
        ] {
            table.insert(letter, code);
        }
        table
    };
}

/// Expand letters to dots and dashes; dots, dashes and spaces pass through
pub fn morse_code(text: &str) -> String {
    match text {
        "sos" => return "...---...".to_string(),
        "cq" => return "-.-.--.-".to_string(),
        _ => {}
    }
    text.chars()
        .map(|c| match MORSE_TABLE.get(&c.to_ascii_lowercase()) {
            Some(code) => code.to_string(),
            None => c.to_string(),
        })
        .collect()
}

/// Morse literal: `.` is an onset, `-` an onset and a rest, space a rest
pub fn decode_morse(text: &str) -> Result<StepPattern, UpiError> {
    let mut steps = Vec::new();
    for c in morse_code(text).chars() {
        match c {
            '.' => steps.push(true),
            '-' => steps.extend([true, false]),
            ' ' => steps.push(false),
            other => {
                return Err(UpiError::InvalidDigit {
                    digit: other,
                    base: "morse",
                })
            }
        }
    }
    if steps.is_empty() {
        return Err(UpiError::Empty);
    }
    if steps.len() > MAX_STEPS {
        return Err(UpiError::StepCount(steps.len()));
    }
    StepPattern::from_bools(&steps)
}
