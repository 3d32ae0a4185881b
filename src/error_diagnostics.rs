//! Errors and diagnostics for UPI input
//!
//! `UpiError` is the single error type of the engine. Syntax failures carry
//! a `DiagnosticError` with the column where parsing stopped and, when the
//! mistake is a common one, a hint.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpiError {
    #[error("empty pattern")]
    Empty,

    #[error("step count {0} is outside 1..=128")]
    StepCount(usize),

    #[error("invalid digit '{digit}' in {base} literal")]
    InvalidDigit { digit: char, base: &'static str },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("unbalanced combinator at column {column}")]
    UnbalancedCombinator { column: usize },

    #[error("unknown token '{token}' at column {column}")]
    UnknownToken { token: String, column: usize },

    #[error("{0}")]
    Syntax(DiagnosticError),

    #[error("invalid suffix: {0}")]
    Suffix(String),

    #[error("'|' separates scenes and is not allowed in a single pattern")]
    SceneSeparator,

    #[error("only one accent annotation is allowed per pattern")]
    MultipleAccents,

    #[error("step {step} is outside the pattern (length {len})")]
    StepOutOfRange { step: usize, len: usize },

    #[error("no pattern is loaded")]
    NoPattern,
}

/// Parse failure location with an optional hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticError {
    pub column: usize,
    pub message: String,
    pub hint: Option<String>,
    pub source_line: String,
}

impl DiagnosticError {
    /// Multi-line rendering with a caret under the failing column
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Parse error at column {}\n\n", self.column));
        out.push_str(&format!("  {}\n", self.source_line));
        out.push_str(&format!(
            "  {}^\n\n",
            " ".repeat(self.column.saturating_sub(1))
        ));
        out.push_str(&format!("Error: {}\n", self.message));
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\nHint: {}\n", hint));
        }
        out
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at column {}", self.message, self.column)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

fn is_combinator(c: char) -> bool {
    matches!(c, '+' | '&' | '^' | '-')
}

/// Classify the unparsed tail of `original` into a `UpiError`
pub fn diagnose_parse_failure(original: &str, remaining: &str) -> UpiError {
    let parsed_len = original.len().saturating_sub(remaining.len());
    let leading_ws = remaining.len() - remaining.trim_start().len();
    let column = parsed_len + leading_ws + 1;
    let problem = remaining.trim();

    if original.trim().is_empty() {
        return UpiError::Empty;
    }

    let mut chars = problem.chars();
    if let Some(first) = chars.next() {
        if is_combinator(first) {
            let after = chars.as_str().trim_start();
            let dangling = after.is_empty() || after.starts_with(is_combinator);
            let leading = original.trim_start().starts_with(first);
            if dangling || leading {
                return UpiError::UnbalancedCombinator { column };
            }
        }
    }

    let (message, hint) = detect_common_error(problem);
    if let Some(message) = message {
        return UpiError::Syntax(DiagnosticError {
            column,
            message,
            hint,
            source_line: original.to_string(),
        });
    }

    let token: String = problem
        .chars()
        .take_while(|c| !c.is_whitespace() && !is_combinator(*c))
        .take(24)
        .collect();
    let token = if token.is_empty() {
        problem.chars().take(1).collect()
    } else {
        token
    };
    UpiError::UnknownToken { token, column }
}

/// Detect frequent mistakes and suggest a fix
fn detect_common_error(text: &str) -> (Option<String>, Option<String>) {
    if text.starts_with('|') {
        return (
            Some("scene separator in a single pattern".to_string()),
            Some("load scenes as a scene list, e.g. E(3,8)|E(5,8)".to_string()),
        );
    }

    let opens = text.matches('(').count();
    let closes = text.matches(')').count();
    if opens != closes {
        return (
            Some("unbalanced parentheses".to_string()),
            Some("generators take the form E(3,8) or P(5,0,12)".to_string()),
        );
    }

    if let Some(paren) = text.find('(') {
        let args = &text[paren..];
        if args.contains(' ') && !args.contains(',') {
            return (
                Some("generator arguments must be separated by commas".to_string()),
                Some("write E(3,8), not E(3 8)".to_string()),
            );
        }
        let name = &text[..paren];
        if !name.is_empty() && !matches!(name, "e" | "b" | "w" | "d" | "p" | "r") {
            return (
                Some(format!("unknown generator '{}'", name)),
                Some("known generators: E, B, W, D, P, R".to_string()),
            );
        }
    }

    if text.starts_with(';') {
        return (
            Some("malformed quantization".to_string()),
            Some("quantization takes a step count, e.g. ;12 or ;-12".to_string()),
        );
    }

    if text.starts_with('>') {
        return (
            Some("transformation needs an algorithm letter".to_string()),
            Some("use B>, W>, E> or D> followed by a target onset count".to_string()),
        );
    }

    (None, None)
}
