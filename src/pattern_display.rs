//! Pattern rendering in each base, plus a circular text view
//!
//! Hex and octal walk groups of 4 or 3 steps left to right and emit each
//! group's LSB-first value, the inverse of the literal decoder, so `10010010`
//! renders as `0x94` and `100010` as `o12`. A `:len` suffix is added when
//! the digits alone would not give back the same length.

use crate::codec::decimal_default_steps;
use crate::pattern::StepPattern;
use serde::Serialize;

/// One pattern in every base
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayStrings {
    pub binary: String,
    pub hex: String,
    pub octal: String,
    pub decimal: String,
}

impl DisplayStrings {
    pub fn of(pattern: &StepPattern) -> Self {
        Self {
            binary: pattern.to_binary_string(),
            hex: to_hex_string(pattern),
            octal: to_octal_string(pattern),
            decimal: to_decimal_string(pattern),
        }
    }
}

fn grouped_digits(pattern: &StepPattern, width: usize) -> Vec<u32> {
    (0..pattern.len())
        .step_by(width)
        .map(|start| {
            (0..width)
                .filter(|bit| pattern.get(start + bit))
                .fold(0u32, |digit, bit| digit | (1 << bit))
        })
        .collect()
}

fn length_suffix(pattern: &StepPattern, width: usize) -> String {
    if pattern.len() % width == 0 {
        String::new()
    } else {
        format!(":{}", pattern.len())
    }
}

pub fn to_hex_string(pattern: &StepPattern) -> String {
    let digits: String = grouped_digits(pattern, 4)
        .into_iter()
        .filter_map(|d| char::from_digit(d, 16))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    format!("0x{}{}", digits, length_suffix(pattern, 4))
}

pub fn to_octal_string(pattern: &StepPattern) -> String {
    let digits: String = grouped_digits(pattern, 3)
        .into_iter()
        .filter_map(|d| char::from_digit(d, 8))
        .collect();
    format!("o{}{}", digits, length_suffix(pattern, 3))
}

/// Decimal value with bit `i` taken from step `i`
pub fn to_decimal_string(pattern: &StepPattern) -> String {
    let value = pattern.bits();
    if decimal_default_steps(value) == pattern.len() {
        format!("d{}", value)
    } else {
        format!("d{}:{}", value, pattern.len())
    }
}

/// Steps laid out on a circle, clockwise from the top
///
/// Onsets are `x`, accented onsets `X`, rests `.`.
pub fn render_circle(pattern: &StepPattern, accents: Option<&StepPattern>) -> String {
    let len = pattern.len();
    let radius = (len as f64 / 3.0).clamp(3.0, 12.0);
    let rows = (radius * 2.0).round() as usize + 1;
    let cols = (radius * 4.0).round() as usize + 1;
    let mut canvas = vec![vec![' '; cols]; rows];

    for step in 0..len {
        let angle = step as f64 / len as f64 * std::f64::consts::TAU;
        // columns are doubled so the circle is not squashed in a terminal
        let col = (radius * 2.0 + radius * 2.0 * angle.sin()).round() as usize;
        let row = (radius - radius * angle.cos()).round() as usize;
        let glyph = match (pattern.get(step), accents.map_or(false, |a| a.get(step))) {
            (true, true) => 'X',
            (true, false) => 'x',
            (false, _) => '.',
        };
        if let Some(cell) = canvas.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = glyph;
        }
    }

    canvas
        .into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> StepPattern {
        StepPattern::from_binary_str(s).unwrap()
    }

    #[test]
    fn test_hex_and_octal_strings() {
        assert_eq!(to_hex_string(&p("10010010")), "0x94");
        assert_eq!(to_octal_string(&p("100010")), "o12");
        assert_eq!(to_hex_string(&p("111111")), "0xF3:6");
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(to_decimal_string(&p("10010010")), "d73");
        assert_eq!(to_decimal_string(&p("1")), "d1:1");
    }

    #[test]
    fn test_circle_marks_downbeat_on_top() {
        let circle = render_circle(&p("10000000"), Some(&p("10000000")));
        let first_line = circle.lines().next().unwrap();
        assert!(first_line.contains('X'));
        assert_eq!(circle.matches('.').count(), 7);
    }
}
