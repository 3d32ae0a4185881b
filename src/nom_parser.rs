//! nom grammar for UPI rhythm notation
//!
//! ```text
//! upi       := expr progressive? quantize?
//! expr      := sequence (op sequence)*          op: + & ^ -
//! sequence  := term (whitespace term)*          concatenation
//! term      := accent? prefix* atom ('@' int)?
//! accent    := '{' expr '}'
//! prefix    := '~' | 'inv ' | 'comp ' | 'rev '
//! atom      := E(k,n[,r]) | B(k,n) | W(k,n) | D(k,n) | P(s,o[,n])
//!            | R(k,n) | R(r,n) | literal | [i,j,..][:n] | m:text
//!            | named | '(' expr ')'
//! progressive := '+' int | '*' int | [bewd] '>' int
//! quantize  := ';' '-'? int
//! ```
//!
//! Input is expected trimmed and lower-cased. A trailing `+N` is always the
//! progressive offset, never a union with a plain literal.

use crate::codec::Radix;
use crate::combiner::CombineOp;
use crate::error_diagnostics::{diagnose_parse_failure, UpiError};
use crate::generators::Algorithm;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alphanumeric1, char, digit1, multispace0, multispace1, one_of},
    combinator::{eof, map, map_opt, map_res, not, opt, recognize, value},
    multi::{fold_many0, many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use serde::Serialize;
use std::fmt;

/// AST for a single pattern with its suffixes
#[derive(Debug, Clone, PartialEq)]
pub struct Upi {
    pub expr: Expr,
    pub progressive: Option<ProgressiveSuffix>,
    pub quantize: Option<QuantizeSuffix>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Terms written side by side, concatenated
    Sequence(Vec<Term>),
    Combine {
        left: Box<Expr>,
        op: CombineOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub accent: Option<Box<Expr>>,
    pub prefixes: Vec<Prefix>,
    pub atom: Atom,
    pub rotation: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Invert,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomOnsets {
    Count(usize),
    Bell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedRhythm {
    Triangle,
    Pentagon,
    Hexagon,
    Heptagon,
    Octagon,
    Tresillo,
    Cinquillo,
}

impl NamedRhythm {
    pub fn name(&self) -> &'static str {
        match self {
            NamedRhythm::Triangle => "tri",
            NamedRhythm::Pentagon => "pent",
            NamedRhythm::Hexagon => "hex",
            NamedRhythm::Heptagon => "hept",
            NamedRhythm::Octagon => "oct",
            NamedRhythm::Tresillo => "tresillo",
            NamedRhythm::Cinquillo => "cinquillo",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Euclidean {
        onsets: usize,
        steps: usize,
        rotation: i64,
    },
    Indispensability {
        algorithm: Algorithm,
        onsets: usize,
        steps: usize,
    },
    Polygon {
        sides: usize,
        offset: i64,
        steps: Option<usize>,
    },
    Random {
        onsets: RandomOnsets,
        steps: usize,
    },
    Literal {
        radix: Radix,
        digits: String,
        steps: Option<usize>,
    },
    Array {
        onsets: Vec<usize>,
        steps: Option<usize>,
    },
    Morse(String),
    Named(NamedRhythm),
    Group(Box<Expr>),
}

/// Progressive behaviour attached to a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressiveSuffix {
    /// `+N`: rotate by N more steps per trigger
    Offset(i64),
    /// `*N`: append N steps per trigger
    Lengthening(usize),
    /// `X>N`: walk the onset count toward N with generator X
    Transformation { algorithm: Algorithm, target: usize },
}

/// `;N` or `;-N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuantizeSuffix {
    pub steps: usize,
    pub clockwise: bool,
}

fn unsigned(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn signed(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

fn open(input: &str) -> IResult<&str, char> {
    terminated(char('('), multispace0)(input)
}

fn close(input: &str) -> IResult<&str, char> {
    preceded(multispace0, char(')'))(input)
}

fn explicit_steps(input: &str) -> IResult<&str, usize> {
    preceded(char(':'), unsigned)(input)
}

/// E(k,n) or E(k,n,r)
fn euclidean(input: &str) -> IResult<&str, Atom> {
    map(
        preceded(
            char('e'),
            delimited(
                open,
                tuple((unsigned, comma, unsigned, opt(preceded(comma, signed)))),
                close,
            ),
        ),
        |(onsets, _, steps, rotation)| Atom::Euclidean {
            onsets,
            steps,
            rotation: rotation.unwrap_or(0),
        },
    )(input)
}

/// B(k,n), W(k,n), D(k,n)
fn ranked(input: &str) -> IResult<&str, Atom> {
    map_opt(
        pair(
            one_of("bwd"),
            delimited(open, tuple((unsigned, comma, unsigned)), close),
        ),
        |(letter, (onsets, _, steps))| {
            Algorithm::from_letter(letter).map(|algorithm| Atom::Indispensability {
                algorithm,
                onsets,
                steps,
            })
        },
    )(input)
}

/// P(sides,offset) or P(sides,offset,steps)
fn polygon(input: &str) -> IResult<&str, Atom> {
    map(
        preceded(
            char('p'),
            delimited(
                open,
                tuple((unsigned, comma, signed, opt(preceded(comma, unsigned)))),
                close,
            ),
        ),
        |(sides, _, offset, steps)| Atom::Polygon {
            sides,
            offset,
            steps,
        },
    )(input)
}

/// R(k,n) or bell-curve R(r,n)
fn random(input: &str) -> IResult<&str, Atom> {
    map(
        preceded(
            char('r'),
            delimited(
                open,
                tuple((
                    alt((
                        value(RandomOnsets::Bell, char('r')),
                        map(unsigned, RandomOnsets::Count),
                    )),
                    comma,
                    unsigned,
                )),
                close,
            ),
        ),
        |(onsets, _, steps)| Atom::Random { onsets, steps },
    )(input)
}

fn make_literal(radix: Radix, (digits, steps): (&str, Option<usize>)) -> Atom {
    Atom::Literal {
        radix,
        digits: digits.to_string(),
        steps,
    }
}

/// Prefixed and plain numeric literals
///
/// Plain digits made only of 0 and 1 are binary, anything else decimal.
fn literal(input: &str) -> IResult<&str, Atom> {
    alt((
        map(
            preceded(tag("0x"), pair(alphanumeric1, opt(explicit_steps))),
            |parts| make_literal(Radix::Hex, parts),
        ),
        map(
            preceded(
                alt((tag("0o"), tag("o"))),
                pair(digit1, opt(explicit_steps)),
            ),
            |parts| make_literal(Radix::Octal, parts),
        ),
        map(
            preceded(char('d'), pair(digit1, opt(explicit_steps))),
            |parts| make_literal(Radix::Decimal, parts),
        ),
        map(
            preceded(char('b'), pair(digit1, opt(explicit_steps))),
            |parts| make_literal(Radix::Binary, parts),
        ),
        map(pair(digit1, opt(explicit_steps)), |(digits, steps)| {
            let radix = if digits.chars().all(|c| c == '0' || c == '1') {
                Radix::Binary
            } else {
                Radix::Decimal
            };
            make_literal(radix, (digits, steps))
        }),
    ))(input)
}

/// [0,3,6] or [0,3,6]:8
fn array(input: &str) -> IResult<&str, Atom> {
    map(
        pair(
            delimited(
                terminated(char('['), multispace0),
                separated_list1(comma, unsigned),
                preceded(multispace0, char(']')),
            ),
            opt(explicit_steps),
        ),
        |(onsets, steps)| Atom::Array { onsets, steps },
    )(input)
}

fn morse(input: &str) -> IResult<&str, Atom> {
    map(
        preceded(
            tag("m:"),
            take_while1(|c: char| c.is_ascii_alphabetic() || c == '.' || c == '-'),
        ),
        |code: &str| Atom::Morse(code.to_string()),
    )(input)
}

fn named(input: &str) -> IResult<&str, Atom> {
    map(
        alt((
            value(NamedRhythm::Tresillo, tag("tresillo")),
            value(NamedRhythm::Cinquillo, tag("cinquillo")),
            value(NamedRhythm::Triangle, tag("tri")),
            value(NamedRhythm::Pentagon, tag("pent")),
            value(NamedRhythm::Heptagon, tag("hept")),
            value(NamedRhythm::Hexagon, tag("hex")),
            value(NamedRhythm::Octagon, tag("oct")),
        )),
        Atom::Named,
    )(input)
}

fn group(input: &str) -> IResult<&str, Atom> {
    map(delimited(open, expr, close), |e| Atom::Group(Box::new(e)))(input)
}

fn atom(input: &str) -> IResult<&str, Atom> {
    alt((
        euclidean, ranked, polygon, random, morse, named, array, literal, group,
    ))(input)
}

fn prefix(input: &str) -> IResult<&str, Prefix> {
    alt((
        value(Prefix::Invert, terminated(char('~'), multispace0)),
        value(
            Prefix::Invert,
            terminated(alt((tag("inv"), tag("comp"))), multispace1),
        ),
        value(Prefix::Reverse, terminated(tag("rev"), multispace1)),
    ))(input)
}

fn accent(input: &str) -> IResult<&str, Expr> {
    terminated(
        delimited(
            pair(char('{'), multispace0),
            expr,
            pair(multispace0, char('}')),
        ),
        multispace0,
    )(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    map(
        tuple((
            opt(accent),
            many0(prefix),
            atom,
            opt(preceded(char('@'), signed)),
        )),
        |(accent, prefixes, atom, rotation)| Term {
            accent: accent.map(Box::new),
            prefixes,
            atom,
            rotation,
        },
    )(input)
}

fn sequence(input: &str) -> IResult<&str, Expr> {
    map(
        pair(term, many0(preceded(multispace1, term))),
        |(first, rest)| {
            let mut terms = vec![first];
            terms.extend(rest);
            Expr::Sequence(terms)
        },
    )(input)
}

fn combine_op(input: &str) -> IResult<&str, CombineOp> {
    map_opt(one_of("+&^-"), CombineOp::from_symbol)(input)
}

fn offset_suffix(input: &str) -> IResult<&str, ProgressiveSuffix> {
    map(
        preceded(pair(char('+'), multispace0), signed),
        ProgressiveSuffix::Offset,
    )(input)
}

fn lengthening_suffix(input: &str) -> IResult<&str, ProgressiveSuffix> {
    map(
        preceded(pair(char('*'), multispace0), unsigned),
        ProgressiveSuffix::Lengthening,
    )(input)
}

fn transformation_suffix(input: &str) -> IResult<&str, ProgressiveSuffix> {
    map_opt(
        pair(one_of("bewd"), preceded(char('>'), unsigned)),
        |(letter, target)| {
            Algorithm::from_letter(letter)
                .map(|algorithm| ProgressiveSuffix::Transformation { algorithm, target })
        },
    )(input)
}

fn progressive_suffix(input: &str) -> IResult<&str, ProgressiveSuffix> {
    alt((offset_suffix, lengthening_suffix, transformation_suffix))(input)
}

fn quantize_suffix(input: &str) -> IResult<&str, QuantizeSuffix> {
    map(
        preceded(pair(char(';'), multispace0), pair(opt(char('-')), unsigned)),
        |(minus, steps)| QuantizeSuffix {
            steps,
            clockwise: minus.is_none(),
        },
    )(input)
}

/// `+N` that ends the input (optionally before a quantization)
fn offset_tail(input: &str) -> IResult<&str, ()> {
    value(
        (),
        tuple((
            multispace0,
            offset_suffix,
            opt(preceded(multispace0, quantize_suffix)),
            multispace0,
            eof,
        )),
    )(input)
}

fn combine_step(input: &str) -> IResult<&str, (CombineOp, Expr)> {
    preceded(
        not(offset_tail),
        pair(delimited(multispace0, combine_op, multispace0), sequence),
    )(input)
}

/// Left-associative chain of combinator operations
pub fn expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = sequence(input)?;
    fold_many0(
        combine_step,
        move || first.clone(),
        |left, (op, right)| Expr::Combine {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
    )(input)
}

pub fn upi(input: &str) -> IResult<&str, Upi> {
    map(
        tuple((
            multispace0,
            expr,
            opt(preceded(multispace0, progressive_suffix)),
            opt(preceded(multispace0, quantize_suffix)),
            multispace0,
        )),
        |(_, expr, progressive, quantize, _)| Upi {
            expr,
            progressive,
            quantize,
        },
    )(input)
}

/// Parse a whole pattern, reporting where parsing stopped
pub fn parse_upi(input: &str) -> Result<Upi, UpiError> {
    if input.trim().is_empty() {
        return Err(UpiError::Empty);
    }
    match upi(input) {
        Ok(("", ast)) => Ok(ast),
        Ok((rest, _)) => Err(diagnose_parse_failure(input, rest)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(diagnose_parse_failure(input, e.input))
        }
        Err(nom::Err::Incomplete(_)) => Err(diagnose_parse_failure(input, "")),
    }
}

impl fmt::Display for Upi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(progressive) = &self.progressive {
            write!(f, "{}", progressive)?;
        }
        if let Some(q) = &self.quantize {
            write!(f, ";{}{}", if q.clockwise { "" } else { "-" }, q.steps)?;
        }
        Ok(())
    }
}

impl fmt::Display for ProgressiveSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressiveSuffix::Offset(n) => write!(f, "+{}", n),
            ProgressiveSuffix::Lengthening(n) => write!(f, "*{}", n),
            ProgressiveSuffix::Transformation { algorithm, target } => {
                write!(f, "{}>{}", algorithm, target)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Sequence(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
            Expr::Combine { left, op, right } => write!(f, "{}{}{}", left, op, right),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(accent) = &self.accent {
            write!(f, "{{{}}}", accent)?;
        }
        for prefix in &self.prefixes {
            match prefix {
                Prefix::Invert => write!(f, "~")?,
                Prefix::Reverse => write!(f, "rev ")?,
            }
        }
        write!(f, "{}", self.atom)?;
        if let Some(rotation) = self.rotation {
            write!(f, "@{}", rotation)?;
        }
        Ok(())
    }
}

fn write_steps(f: &mut fmt::Formatter<'_>, steps: &Option<usize>) -> fmt::Result {
    match steps {
        Some(n) => write!(f, ":{}", n),
        None => Ok(()),
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Euclidean {
                onsets,
                steps,
                rotation: 0,
            } => write!(f, "E({},{})", onsets, steps),
            Atom::Euclidean {
                onsets,
                steps,
                rotation,
            } => write!(f, "E({},{},{})", onsets, steps, rotation),
            Atom::Indispensability {
                algorithm,
                onsets,
                steps,
            } => write!(f, "{}({},{})", algorithm, onsets, steps),
            Atom::Polygon {
                sides,
                offset,
                steps: Some(steps),
            } => write!(f, "P({},{},{})", sides, offset, steps),
            Atom::Polygon { sides, offset, .. } => write!(f, "P({},{})", sides, offset),
            Atom::Random {
                onsets: RandomOnsets::Bell,
                steps,
            } => write!(f, "R(r,{})", steps),
            Atom::Random {
                onsets: RandomOnsets::Count(k),
                steps,
            } => write!(f, "R({},{})", k, steps),
            Atom::Literal {
                radix,
                digits,
                steps,
            } => {
                let prefix = match radix {
                    Radix::Hex => "0x",
                    Radix::Octal => "o",
                    Radix::Decimal => "d",
                    Radix::Binary => "",
                };
                write!(f, "{}{}", prefix, digits)?;
                write_steps(f, steps)
            }
            Atom::Array { onsets, steps } => {
                let list: Vec<String> = onsets.iter().map(|o| o.to_string()).collect();
                write!(f, "[{}]", list.join(","))?;
                write_steps(f, steps)
            }
            Atom::Morse(code) => write!(f, "M:{}", code),
            Atom::Named(name) => write!(f, "{}", name.name()),
            Atom::Group(inner) => write!(f, "({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_atom(upi: &Upi) -> &Atom {
        match &upi.expr {
            Expr::Sequence(terms) if terms.len() == 1 => &terms[0].atom,
            other => panic!("expected a single term, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_euclidean_with_rotation() {
        let ast = parse_upi("e(3,8,2)").unwrap();
        assert_eq!(
            single_atom(&ast),
            &Atom::Euclidean {
                onsets: 3,
                steps: 8,
                rotation: 2
            }
        );
    }

    #[test]
    fn test_trailing_plus_is_offset() {
        let ast = parse_upi("e(3,8)+2").unwrap();
        assert_eq!(ast.progressive, Some(ProgressiveSuffix::Offset(2)));
        let ast = parse_upi("e(3,8)+-3;12").unwrap();
        assert_eq!(ast.progressive, Some(ProgressiveSuffix::Offset(-3)));
        assert_eq!(
            ast.quantize,
            Some(QuantizeSuffix {
                steps: 12,
                clockwise: true
            })
        );
    }

    #[test]
    fn test_plus_between_patterns_is_union() {
        let ast = parse_upi("e(3,8) + e(2,5)").unwrap();
        assert!(matches!(
            ast.expr,
            Expr::Combine {
                op: CombineOp::Union,
                ..
            }
        ));
        assert_eq!(ast.progressive, None);
    }

    #[test]
    fn test_transformation_suffix() {
        let ast = parse_upi("e(1,8)b>5").unwrap();
        assert_eq!(
            ast.progressive,
            Some(ProgressiveSuffix::Transformation {
                algorithm: Algorithm::Barlow,
                target: 5
            })
        );
    }

    #[test]
    fn test_whitespace_concatenates() {
        let ast = parse_upi("e(3,8) 1010").unwrap();
        match ast.expr {
            Expr::Sequence(terms) => assert_eq!(terms.len(), 2),
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_accent_prefix() {
        let ast = parse_upi("{100}e(5,8)").unwrap();
        match &ast.expr {
            Expr::Sequence(terms) => assert!(terms[0].accent.is_some()),
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_radix_detection() {
        let ast = parse_upi("0x94:8").unwrap();
        assert_eq!(
            single_atom(&ast),
            &Atom::Literal {
                radix: Radix::Hex,
                digits: "94".to_string(),
                steps: Some(8)
            }
        );
        let ast = parse_upi("73").unwrap();
        assert!(matches!(
            single_atom(&ast),
            Atom::Literal {
                radix: Radix::Decimal,
                ..
            }
        ));
    }

    #[test]
    fn test_display_round_trip() {
        let ast = parse_upi("e(3,8)+p(5,0,12)*2;-16").unwrap();
        assert_eq!(ast.to_string(), "E(3,8)+P(5,0,12)*2;-16");
    }

    #[test]
    fn test_dangling_operator_is_error() {
        assert!(matches!(
            parse_upi("e(3,8)&"),
            Err(UpiError::UnbalancedCombinator { .. })
        ));
    }
}
