//! UPI evaluation
//!
//! Turns text into a `ParseResult`. Parsing is a pure function of the
//! trimmed, lower-cased input and the parser seed: progressive suffixes and
//! quantization are reported, never advanced here.

use crate::codec::{decode_array, decode_literal, decode_morse};
use crate::combiner::combine;
use crate::error_diagnostics::UpiError;
use crate::generators::{bell_random, euclidean_rotated, polygon, random, Algorithm};
use crate::nom_parser::{
    parse_upi, Atom, Expr, NamedRhythm, Prefix, ProgressiveSuffix, QuantizeSuffix, RandomOnsets,
    Term,
};
use crate::pattern::{check_steps, StepPattern, MAX_STEPS};
use crate::quantize::{quantize_with_meta, QuantizationMeta};
use serde::Serialize;
use tracing::debug;

/// A successfully parsed pattern with its unapplied suffixes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPattern {
    /// Expression result before any suffix
    pub base: StepPattern,
    /// `base` with quantization applied
    pub pattern: StepPattern,
    pub display_name: String,
    pub accent: Option<StepPattern>,
    pub progressive: Option<ProgressiveSuffix>,
    pub quantize: Option<QuantizeSuffix>,
    pub quantization: Option<QuantizationMeta>,
}

impl ParsedPattern {
    /// Apply this pattern's quantization to a resolved pattern
    pub fn finish(&self, pattern: StepPattern) -> StepPattern {
        match self.quantize {
            Some(q) => quantize_with_meta(&pattern, q.steps, q.clockwise)
                .map(|(p, _)| p)
                .unwrap_or(pattern),
            None => pattern,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParseResult {
    Valid(ParsedPattern),
    Invalid { message: String },
}

impl ParseResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParseResult::Valid(_))
    }

    pub fn pattern(&self) -> Option<&StepPattern> {
        match self {
            ParseResult::Valid(parsed) => Some(&parsed.pattern),
            ParseResult::Invalid { .. } => None,
        }
    }
}

impl From<Result<ParsedPattern, UpiError>> for ParseResult {
    fn from(result: Result<ParsedPattern, UpiError>) -> Self {
        match result {
            Ok(parsed) => ParseResult::Valid(parsed),
            Err(e) => ParseResult::Invalid {
                message: e.to_string(),
            },
        }
    }
}

/// Normalize text into the key used for parsing and state lookup
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Split a scene list on top-level `|`
///
/// Separators inside `()`, `[]` or `{}` do not split. Every slot must be
/// non-empty.
pub fn split_scenes(text: &str) -> Result<Vec<String>, UpiError> {
    let mut slots = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if c == '|' && depth == 0 {
            slots.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    slots.push(current);

    let slots: Vec<String> = slots.iter().map(|s| normalize(s)).collect();
    if slots.iter().any(|s| s.is_empty()) {
        return Err(UpiError::Empty);
    }
    Ok(slots)
}

/// Whether `text` is a scene list
pub fn is_scene_list(text: &str) -> bool {
    split_scenes(text).map_or(false, |slots| slots.len() > 1)
}

/// UPI parser with an optional fixed seed for the random generators
#[derive(Debug, Clone, Default)]
pub struct UpiParser {
    seed: Option<u64>,
}

struct Evaluator {
    seed: u64,
    random_index: u64,
    accent: Option<StepPattern>,
}

impl UpiParser {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Parse one pattern into a `ParseResult`
    pub fn parse(&self, text: &str) -> ParseResult {
        self.try_parse(text).into()
    }

    pub fn try_parse(&self, text: &str) -> Result<ParsedPattern, UpiError> {
        let input = normalize(text);
        if input.is_empty() {
            return Err(UpiError::Empty);
        }
        if split_scenes(&input).map_or(true, |slots| slots.len() > 1) {
            return Err(UpiError::SceneSeparator);
        }

        let ast = parse_upi(&input)?;
        let mut eval = Evaluator {
            seed: self.seed.unwrap_or_else(rand::random),
            random_index: 0,
            accent: None,
        };
        let base = eval.expr(&ast.expr)?;

        if let Some(progressive) = &ast.progressive {
            validate_progressive(progressive, &base)?;
        }

        let (pattern, quantization) = match ast.quantize {
            Some(q) => {
                let (quantized, meta) = quantize_with_meta(&base, q.steps, q.clockwise)?;
                (quantized, Some(meta))
            }
            None => (base, None),
        };

        debug!(upi = %input, pattern = %pattern, "parsed pattern");
        Ok(ParsedPattern {
            base,
            pattern,
            display_name: ast.to_string(),
            accent: eval.accent,
            progressive: ast.progressive,
            quantize: ast.quantize,
            quantization,
        })
    }
}

/// Parse with a fresh unseeded parser
pub fn parse(text: &str) -> ParseResult {
    UpiParser::new().parse(text)
}

fn validate_progressive(suffix: &ProgressiveSuffix, base: &StepPattern) -> Result<(), UpiError> {
    match *suffix {
        ProgressiveSuffix::Offset(n) if n.unsigned_abs() > MAX_STEPS as u64 => Err(
            UpiError::Suffix(format!("offset {} is outside -128..=128", n)),
        ),
        ProgressiveSuffix::Offset(_) => Ok(()),
        ProgressiveSuffix::Lengthening(0) => {
            Err(UpiError::Suffix("lengthening needs at least one step".to_string()))
        }
        ProgressiveSuffix::Lengthening(n) => check_steps(n)
            .map(|_| ())
            .map_err(|_| UpiError::Suffix(format!("cannot lengthen by {} steps", n))),
        ProgressiveSuffix::Transformation { target, .. } if target > base.len() => {
            Err(UpiError::Suffix(format!(
                "target of {} onsets exceeds {} steps",
                target,
                base.len()
            )))
        }
        ProgressiveSuffix::Transformation { .. } => Ok(()),
    }
}

impl Evaluator {
    fn expr(&mut self, expr: &Expr) -> Result<StepPattern, UpiError> {
        match expr {
            Expr::Sequence(terms) => {
                let mut result: Option<StepPattern> = None;
                for term in terms {
                    let next = self.term(term)?;
                    result = Some(match result {
                        Some(acc) => acc.concat(&next)?,
                        None => next,
                    });
                }
                result.ok_or(UpiError::Empty)
            }
            Expr::Combine { left, op, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                combine(&left, *op, &right)
            }
        }
    }

    fn term(&mut self, term: &Term) -> Result<StepPattern, UpiError> {
        if let Some(accent) = &term.accent {
            if self.accent.is_some() {
                return Err(UpiError::MultipleAccents);
            }
            let cycle = self.expr(accent)?;
            self.accent = Some(cycle);
        }

        let mut pattern = self.atom(&term.atom)?;
        // prefixes bind right to left: ~rev x inverts the reversed x
        for prefix in term.prefixes.iter().rev() {
            pattern = match prefix {
                Prefix::Invert => pattern.invert(),
                Prefix::Reverse => pattern.reverse(),
            };
        }
        if let Some(rotation) = term.rotation {
            pattern = pattern.rotate(rotation);
        }
        Ok(pattern)
    }

    fn next_seed(&mut self) -> u64 {
        let seed = self.seed.wrapping_add(self.random_index);
        self.random_index += 1;
        seed
    }

    fn atom(&mut self, atom: &Atom) -> Result<StepPattern, UpiError> {
        match atom {
            Atom::Euclidean {
                onsets,
                steps,
                rotation,
            } => euclidean_rotated(*onsets, *steps, *rotation),
            Atom::Indispensability {
                algorithm,
                onsets,
                steps,
            } => algorithm.generate(*onsets, *steps),
            Atom::Polygon {
                sides,
                offset,
                steps,
            } => polygon(*sides, *offset, steps.unwrap_or(*sides)),
            Atom::Random { onsets, steps } => {
                let seed = self.next_seed();
                match onsets {
                    RandomOnsets::Count(k) => random(*k, *steps, seed),
                    RandomOnsets::Bell => bell_random(*steps, seed),
                }
            }
            Atom::Literal {
                radix,
                digits,
                steps,
            } => decode_literal(*radix, digits, *steps),
            Atom::Array { onsets, steps } => decode_array(onsets, *steps),
            Atom::Morse(code) => decode_morse(code),
            Atom::Named(name) => named(*name),
            Atom::Group(inner) => self.expr(inner),
        }
    }
}

fn named(name: NamedRhythm) -> Result<StepPattern, UpiError> {
    match name {
        NamedRhythm::Triangle => polygon(3, 0, 3),
        NamedRhythm::Pentagon => polygon(5, 0, 5),
        NamedRhythm::Hexagon => polygon(6, 0, 6),
        NamedRhythm::Heptagon => polygon(7, 0, 7),
        NamedRhythm::Octagon => polygon(8, 0, 8),
        NamedRhythm::Tresillo => Algorithm::Euclidean.generate(3, 8),
        NamedRhythm::Cinquillo => Algorithm::Euclidean.generate(5, 8),
    }
}
